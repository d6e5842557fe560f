//! Error types for the orchestration API and step execution

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Errors returned by the orchestration service
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Workflow {0} not found")]
    WorkflowNotFound(Uuid),

    #[error("Workflow {0} is not active")]
    WorkflowInactive(Uuid),

    #[error("Invalid workflow: {}", .0.join("; "))]
    InvalidWorkflow(Vec<String>),

    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("Execution {0} is not running")]
    ExecutionNotRunning(Uuid),

    #[error("Execution {0} is driven by another running process")]
    ExecutionOwnedElsewhere(Uuid),

    #[error("Business process {0} not found")]
    ProcessNotFound(Uuid),

    #[error("Business process {0} is not active")]
    ProcessInactive(Uuid),

    #[error("Inquiry {0} not found")]
    InquiryNotFound(Uuid),

    #[error("Message {0} not found")]
    MessageNotFound(Uuid),

    #[error("Approval request {0} not found")]
    ApprovalNotFound(Uuid),

    #[error("Approval request {0} is not pending")]
    ApprovalNotPending(Uuid),

    /// Persistence or runtime failure
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Reasons a single step attempt fails
///
/// These never abort an execution: the engine records the message on the
/// step and applies the step's retry policy.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("No agent available for step {0}")]
    NoAgentAvailable(String),

    #[error("External API configuration missing")]
    MissingApiConfig,

    #[error("Approval denied by {0}")]
    ApprovalDenied(String),

    #[error("Approval timed out after {0} seconds")]
    ApprovalTimeout(u32),

    #[error("Step timed out after {0} seconds")]
    Timeout(u32),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StepError {
    pub fn failed(msg: impl Into<String>) -> Self {
        StepError::Failed(msg.into())
    }
}
