//! Workflow definition and execution data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of business workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    CustomerService,
    ContentCreation,
    DataAnalysis,
    #[default]
    Custom,
}

/// Business area a workflow belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCategory {
    Sales,
    Marketing,
    Support,
    Operations,
    Finance,
    Hr,
    #[default]
    General,
}

/// Reusable workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow identifier
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// What the workflow does
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub category: WorkflowCategory,
    /// Ordered steps; declaration order is the scan order of the engine
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub triggers: Vec<WorkflowTrigger>,
    /// Inactive workflows cannot be executed
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Agent ID, `user` or `system`
    pub created_by: String,
}

fn default_true() -> bool {
    true
}

impl WorkflowDefinition {
    /// Look up a step by ID
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

/// Input for creating a workflow; the service assigns ID and timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub category: WorkflowCategory,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub triggers: Vec<WorkflowTrigger>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default = "default_creator")]
    pub created_by: String,
}

fn default_creator() -> String {
    "user".to_string()
}

impl From<NewWorkflow> for WorkflowDefinition {
    fn from(workflow: NewWorkflow) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: workflow.name,
            description: workflow.description,
            workflow_type: workflow.workflow_type,
            category: workflow.category,
            steps: workflow.steps,
            triggers: workflow.triggers,
            is_active: workflow.is_active,
            is_template: workflow.is_template,
            metadata: workflow.metadata,
            created_at: now,
            updated_at: now,
            created_by: workflow.created_by,
        }
    }
}

/// Administrative update to a workflow; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<WorkflowCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WorkflowStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<WorkflowTrigger>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Step variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Dispatch a task to an agent
    AgentTask,
    /// Evaluate conditions against the execution context
    Condition,
    /// Resolve templates and merge them into the context
    DataTransform,
    /// Wait for (or auto-grant) a human approval
    HumanApproval,
    /// Call an external API
    ExternalApi,
}

/// One unit of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step identifier, unique within the workflow
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub description: String,
    /// Specific agent assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Capability an assignee must hold when no agent is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<String>,
    #[serde(default)]
    pub config: StepConfig,
    /// Step IDs that must complete first
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StepCondition>,
    /// Per-attempt time limit in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl WorkflowStep {
    /// Create a step with no dependencies and default configuration
    pub fn new(id: impl Into<String>, name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            step_type,
            description: String::new(),
            agent_id: None,
            agent_role: None,
            config: StepConfig::default(),
            dependencies: Vec::new(),
            conditions: Vec::new(),
            timeout_seconds: None,
            retry_policy: None,
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_agent_role(mut self, role: impl Into<String>) -> Self {
        self.agent_role = Some(role.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<StepCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = config;
        self
    }
}

/// Step-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    /// Values (or `{{name}}` templates) consumed by data transforms
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_capabilities: Vec<String>,
    /// Approver identities for human approval steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_api_config: Option<ExternalApiConfig>,
}

/// Target of an external API step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalApiConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Comparison applied by a condition step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
}

/// `field operator value` triple evaluated against the execution context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCondition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
    /// Step hinted when the condition holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
}

/// Retry configuration for a step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (0-10)
    pub max_retries: u32,
    /// Delay before each retry in seconds (0-300)
    #[serde(default)]
    pub retry_delay: u32,
    /// Whether to grow the delay between retries
    #[serde(default)]
    pub exponential_backoff: bool,
    /// Multiplier for exponential backoff (>= 1.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl RetryPolicy {
    /// Fixed-delay policy
    pub fn fixed(max_retries: u32, retry_delay: u32) -> Self {
        Self {
            max_retries,
            retry_delay,
            exponential_backoff: false,
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// What starts a workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Schedule,
    Event,
    Webhook,
    FileUpload,
    Message,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Cron expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StepCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    pub id: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub config: TriggerConfig,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Overall execution status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created, engine not started yet
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

/// Per-step status within an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Runtime record of one step within one execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepExecution {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl WorkflowStepExecution {
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            assigned_agent_id: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            input: None,
            output: None,
            error_message: None,
            retry_count: 0,
        }
    }
}

/// Step counters for an execution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionMetrics {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
}

/// One invocation of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// Set when started through a business process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_process_id: Option<Uuid>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    /// Key/value data threaded through the steps
    #[serde(default)]
    pub execution_context: Map<String, Value>,
    pub steps: Vec<WorkflowStepExecution>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Agent ID, `system`, `user` or `business_process`
    pub triggered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub metrics: ExecutionMetrics,
    /// Lease id of the service instance driving the execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
}

impl WorkflowExecution {
    /// Fresh pending execution of `workflow` with every step pending
    pub fn new(
        workflow: &WorkflowDefinition,
        context: Map<String, Value>,
        triggered_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow.id,
            business_process_id: None,
            status: ExecutionStatus::Pending,
            current_step_id: None,
            execution_context: context,
            steps: workflow
                .steps
                .iter()
                .map(|s| WorkflowStepExecution::pending(s.id.clone()))
                .collect(),
            started_at: Utc::now(),
            completed_at: None,
            triggered_by: triggered_by.into(),
            error_message: None,
            metrics: ExecutionMetrics {
                total_steps: workflow.steps.len(),
                ..ExecutionMetrics::default()
            },
            owner_id: None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&WorkflowStepExecution> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut WorkflowStepExecution> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.completed_at
            .map(|completed| (completed - self.started_at).num_milliseconds().max(0) as u64)
    }
}

/// Approval request record for a human approval step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub step_id: String,
    /// Human-readable action description
    pub action_description: String,
    /// Who may respond; empty means anyone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvers: Vec<String>,
    pub status: ApprovalStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responder: Option<String>,
    /// How long to wait for a response (seconds)
    pub timeout_seconds: u32,
}

/// Approval request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_status_serialization() {
        let json = serde_json::to_string(&ExecutionStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
    }

    #[test]
    fn test_step_deserializes_with_defaults() {
        let step: WorkflowStep = serde_json::from_value(serde_json::json!({
            "id": "route",
            "name": "Route",
            "type": "condition",
            "conditions": [
                {"field": "category", "operator": "equals", "value": "billing", "next_step_id": "bill"}
            ]
        }))
        .unwrap();

        assert_eq!(step.step_type, StepType::Condition);
        assert!(step.dependencies.is_empty());
        assert_eq!(step.conditions[0].operator, ConditionOperator::Equals);
        assert_eq!(step.conditions[0].next_step_id.as_deref(), Some("bill"));
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_retries": 3}"#).unwrap();
        assert_eq!(policy.retry_delay, 0);
        assert!(!policy.exponential_backoff);
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_new_execution_has_pending_steps() {
        let now = Utc::now();
        let workflow = WorkflowDefinition {
            id: Uuid::new_v4(),
            name: "two-step".to_string(),
            description: String::new(),
            workflow_type: WorkflowType::Custom,
            category: WorkflowCategory::General,
            steps: vec![
                WorkflowStep::new("a", "A", StepType::HumanApproval),
                WorkflowStep::new("b", "B", StepType::HumanApproval).with_dependencies(["a"]),
            ],
            triggers: vec![],
            is_active: true,
            is_template: false,
            metadata: None,
            created_at: now,
            updated_at: now,
            created_by: "user".to_string(),
        };

        let mut context = Map::new();
        context.insert("topic".to_string(), Value::from("rust"));
        let execution = WorkflowExecution::new(&workflow, context, "tester");

        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert_eq!(execution.metrics.total_steps, 2);
        assert!(execution
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending && s.retry_count == 0));
        assert_eq!(execution.execution_context["topic"], "rust");
    }
}
