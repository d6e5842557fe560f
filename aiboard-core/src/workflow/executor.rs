//! Step executor trait and types

use crate::error::StepError;
use crate::models::workflow::WorkflowStep;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Everything an executor sees of one step attempt
#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub step: &'a WorkflowStep,
    /// Execution context as of the start of the attempt
    pub context: &'a Map<String, Value>,
    /// 0 for the first attempt, incremented per retry
    pub attempt: u32,
}

/// Result of a successful step attempt
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// Recorded as the step execution's output
    pub output: Value,
    /// Entries merged into the execution context
    pub context_updates: Map<String, Value>,
    /// Agent the step was dispatched to
    pub assigned_agent_id: Option<String>,
}

impl StepOutcome {
    pub fn with_output(output: Value) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }
}

/// Trait for executing workflow steps
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute a single attempt of a step
    ///
    /// Errors are recorded on the step and go through its retry policy; they
    /// never abort the execution.
    async fn execute(&self, request: StepRequest<'_>) -> Result<StepOutcome, StepError>;
}
