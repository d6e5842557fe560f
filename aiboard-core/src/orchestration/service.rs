//! Orchestration service: workflows, executions, messaging and business processes

use crate::error::{OrchestrationError, Result};
use crate::models::{
    AgentMessage, ApprovalRequest, ApprovalStatus, BusinessProcess, BusinessProcessUpdate,
    CapabilityEntry, CommunicationChannel, Configuration, CustomerInquiry, ExecutionStatus,
    InquiryResponse, InquiryUpdate, NewBusinessProcess, NewChannel, NewInquiry,
    NewInquiryResponse, NewWorkflow, OrchestrationMetrics, OutgoingMessage, ProcessMetrics,
    StepStatus, WorkflowDefinition, WorkflowExecution, WorkflowType, WorkflowUpdate,
};
use crate::orchestration::capability::CapabilityRegistry;
use crate::orchestration::inquiry::InquiryDesk;
use crate::orchestration::messaging::MessageBus;
use crate::orchestration::metrics::{orchestration_metrics, process_metrics};
use crate::workflow::approval_manager::{ApprovalManager, ApprovalResponse};
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::executor::StepExecutor;
use crate::workflow::lease::InstanceLease;
use crate::workflow::persistence::{BoardPersistence, WorkflowMetrics};
use crate::workflow::simulated_executor::SimulatedStepExecutor;
use crate::workflow::templates::{instantiate_template, workflow_templates};
use crate::workflow::validator::WorkflowValidator;
use anyhow::Context;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// `triggered_by` of executions started through a business process
pub const BUSINESS_PROCESS_TRIGGER: &str = "business_process";

/// `triggered_by` of executions the board starts on its own
pub const SYSTEM_TRIGGER: &str = "system";

/// Signals of a running execution task; any number of callers may hold them
#[derive(Clone)]
struct ActiveExecution {
    cancel: CancellationToken,
    /// Cancelled once the task has written its final record
    finished: CancellationToken,
}

/// Orchestration service managing workflows and their executions
pub struct OrchestrationService {
    /// Persistence layer
    persistence: Arc<BoardPersistence>,
    messages: Arc<MessageBus>,
    registry: Arc<CapabilityRegistry>,
    inquiries: InquiryDesk,
    /// Approval manager
    approvals: Arc<ApprovalManager>,
    /// Step executor shared by all executions
    executor: Arc<dyn StepExecutor>,
    /// Active execution handles
    active: Arc<DashMap<Uuid, ActiveExecution>>,
    /// Marks executions started here as owned by a live process
    lease: Arc<InstanceLease>,
}

impl OrchestrationService {
    /// Create a service over an opened store
    ///
    /// Executions left unfinished by a process that no longer runs are marked
    /// failed; those driven by another live instance are left alone.
    pub fn new(persistence: Arc<BoardPersistence>, config: &Configuration) -> Result<Self> {
        let lease = Arc::new(
            InstanceLease::acquire(persistence.store_path())
                .context("Failed to acquire instance lease")?,
        );
        let messages = Arc::new(MessageBus::new(
            persistence.clone(),
            Duration::from_millis(config.message_delivery_delay_ms),
        ));
        let registry = Arc::new(CapabilityRegistry::new(persistence.clone()));
        let inquiries = InquiryDesk::new(persistence.clone());
        let approvals = Arc::new(ApprovalManager::new(persistence.clone()));

        let mut executor =
            SimulatedStepExecutor::new(registry.clone(), messages.clone(), approvals.clone());
        if !config.auto_approve {
            executor = executor.with_manual_approval(config.approval_timeout_seconds);
        }

        let service = Self {
            persistence,
            messages,
            registry,
            inquiries,
            approvals,
            executor: Arc::new(executor),
            active: Arc::new(DashMap::new()),
            lease,
        };
        service.recover_interrupted()?;
        Ok(service)
    }

    /// Open the store named by the configuration
    pub fn open(config: &Configuration) -> Result<Self> {
        let persistence = BoardPersistence::new(config.store_path())
            .context("Failed to open board store")?;
        Self::new(Arc::new(persistence), config)
    }

    /// Replace the step executor used by new executions
    pub fn with_executor(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn approval_manager(&self) -> Arc<ApprovalManager> {
        self.approvals.clone()
    }

    pub fn persistence(&self) -> Arc<BoardPersistence> {
        self.persistence.clone()
    }

    /// Whether another live instance is driving the execution
    fn owned_elsewhere(&self, execution: &WorkflowExecution) -> bool {
        execution.owner_id.is_some_and(|owner| {
            owner != self.lease.id()
                && InstanceLease::is_held(self.persistence.store_path(), owner)
        })
    }

    fn recover_interrupted(&self) -> Result<()> {
        for mut execution in self.persistence.find_incomplete_executions() {
            if self.owned_elsewhere(&execution) {
                continue;
            }
            tracing::warn!(
                "Execution {} was interrupted before completion; marking failed",
                execution.id
            );
            fail_unfinished(&mut execution, "Interrupted", "Interrupted before completion");
            self.persistence.save_execution(&execution)?;
        }
        Ok(())
    }

    /// Wait for background message deliveries before the process exits
    pub async fn shutdown(&self) {
        self.messages.flush().await;
    }

    // --- messaging ---

    pub async fn send_message(&self, message: OutgoingMessage) -> Result<AgentMessage> {
        Ok(self.messages.send(message).await?)
    }

    /// Messages the agent sent or received
    pub fn get_messages_for_agent(&self, agent_id: &str) -> Vec<AgentMessage> {
        self.messages.messages_for_agent(agent_id)
    }

    pub fn mark_message_read(&self, message_id: Uuid) -> Result<AgentMessage> {
        self.messages
            .mark_read(message_id)?
            .ok_or(OrchestrationError::MessageNotFound(message_id))
    }

    pub fn create_communication_channel(&self, channel: NewChannel) -> Result<CommunicationChannel> {
        Ok(self.messages.create_channel(channel)?)
    }

    pub fn list_messages(&self) -> Vec<AgentMessage> {
        self.messages.list_messages()
    }

    pub fn list_channels(&self) -> Vec<CommunicationChannel> {
        self.messages.list_channels()
    }

    // --- agent discovery ---

    pub fn register_agent_capability(
        &self,
        agent_id: &str,
        capability: &str,
        description: &str,
    ) -> Result<()> {
        Ok(self.registry.register(agent_id, capability, description)?)
    }

    pub fn find_agents_by_capability(&self, capability: &str) -> Vec<String> {
        self.registry.find_agents(capability)
    }

    pub fn get_available_agents(&self, required_capabilities: &[String]) -> Vec<String> {
        self.registry.available_agents(required_capabilities)
    }

    pub fn capability_registry(&self) -> Vec<CapabilityEntry> {
        self.registry.entries()
    }

    // --- workflows ---

    fn ensure_valid(workflow: &WorkflowDefinition) -> Result<()> {
        let validation = WorkflowValidator::validate_workflow(workflow);
        for warning in &validation.warnings {
            tracing::warn!("Workflow '{}': {}", workflow.name, warning);
        }
        if validation.is_valid() {
            Ok(())
        } else {
            Err(OrchestrationError::InvalidWorkflow(
                validation.error_messages(),
            ))
        }
    }

    /// Validate and store a new workflow
    pub fn create_workflow(&self, workflow: NewWorkflow) -> Result<WorkflowDefinition> {
        let definition = WorkflowDefinition::from(workflow);
        Self::ensure_valid(&definition)?;
        self.persistence.insert_workflow(definition.clone())?;

        tracing::info!("Created workflow '{}' ({})", definition.name, definition.id);
        Ok(definition)
    }

    /// Apply an administrative update; the result must still validate
    pub fn update_workflow(
        &self,
        workflow_id: Uuid,
        update: WorkflowUpdate,
    ) -> Result<WorkflowDefinition> {
        let mut workflow = self
            .persistence
            .get_workflow(workflow_id)
            .ok_or(OrchestrationError::WorkflowNotFound(workflow_id))?;

        if let Some(name) = update.name {
            workflow.name = name;
        }
        if let Some(description) = update.description {
            workflow.description = description;
        }
        if let Some(category) = update.category {
            workflow.category = category;
        }
        if let Some(steps) = update.steps {
            workflow.steps = steps;
        }
        if let Some(triggers) = update.triggers {
            workflow.triggers = triggers;
        }
        if let Some(is_active) = update.is_active {
            workflow.is_active = is_active;
        }
        if update.metadata.is_some() {
            workflow.metadata = update.metadata;
        }
        workflow.updated_at = Utc::now();

        Self::ensure_valid(&workflow)?;
        let updated = workflow.clone();
        self.persistence
            .update_workflow(workflow_id, move |stored| *stored = workflow)?
            .ok_or(OrchestrationError::WorkflowNotFound(workflow_id))?;

        Ok(updated)
    }

    pub fn delete_workflow(&self, workflow_id: Uuid) -> Result<()> {
        if self.persistence.remove_workflow(workflow_id)? {
            tracing::info!("Deleted workflow {}", workflow_id);
            Ok(())
        } else {
            Err(OrchestrationError::WorkflowNotFound(workflow_id))
        }
    }

    pub fn get_workflow(&self, workflow_id: Uuid) -> Option<WorkflowDefinition> {
        self.persistence.get_workflow(workflow_id)
    }

    pub fn list_workflows(&self) -> Vec<WorkflowDefinition> {
        self.persistence.list_workflows()
    }

    pub fn active_workflows(&self) -> Vec<WorkflowDefinition> {
        self.list_workflows()
            .into_iter()
            .filter(|w| w.is_active)
            .collect()
    }

    pub fn get_workflow_templates(&self) -> Vec<NewWorkflow> {
        workflow_templates()
    }

    /// Store a workflow built from a template plus top-level customizations
    pub fn create_workflow_from_template(
        &self,
        template_name: &str,
        customizations: &Map<String, Value>,
    ) -> Result<WorkflowDefinition> {
        let workflow = instantiate_template(template_name, customizations)
            .map_err(|e| OrchestrationError::InvalidWorkflow(vec![format!("customizations: {}", e)]))?
            .ok_or_else(|| OrchestrationError::TemplateNotFound(template_name.to_string()))?;

        self.create_workflow(workflow)
    }

    // --- executions ---

    /// Start an execution in the background and return its initial snapshot
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        context: Map<String, Value>,
        triggered_by: &str,
    ) -> Result<WorkflowExecution> {
        self.start_execution(workflow_id, context, triggered_by, None)
    }

    fn start_execution(
        &self,
        workflow_id: Uuid,
        context: Map<String, Value>,
        triggered_by: &str,
        business_process_id: Option<Uuid>,
    ) -> Result<WorkflowExecution> {
        let workflow = self
            .persistence
            .get_workflow(workflow_id)
            .ok_or(OrchestrationError::WorkflowNotFound(workflow_id))?;

        if !workflow.is_active {
            return Err(OrchestrationError::WorkflowInactive(workflow_id));
        }

        let mut execution = WorkflowExecution::new(&workflow, context, triggered_by);
        execution.business_process_id = business_process_id;
        execution.owner_id = Some(self.lease.id());

        self.persistence
            .create_execution(execution.clone())
            .context("Failed to create execution")?;

        self.active.retain(|_, active| !active.finished.is_cancelled());

        let signals = ActiveExecution {
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
        };
        let engine = WorkflowEngine::new(
            workflow,
            self.executor.clone(),
            self.persistence.clone(),
            signals.cancel.clone(),
        );

        let persistence = self.persistence.clone();
        let lease = self.lease.clone();
        let execution_id = execution.id;
        let initial = execution.clone();
        self.active.insert(execution_id, signals.clone());

        let finished = signals.finished;
        tokio::spawn(async move {
            // Fires on every exit path, so waiters never hang
            let _finished = finished.drop_guard();
            let _lease = lease;

            let run = tokio::spawn(async move { engine.run(execution).await }).await;
            let failure = match run {
                Ok(Ok(_)) => None,
                Ok(Err(e)) => Some(format!("{:#}", e)),
                Err(e) => Some(format!("Execution task panicked: {}", e)),
            };
            if let Some(reason) = failure {
                tracing::error!("Execution {} aborted: {}", execution_id, reason);
                mark_aborted(&persistence, execution_id, &reason);
            }

            if let Some(process_id) = business_process_id {
                if let Err(e) = refresh_process_metrics(&persistence, process_id) {
                    tracing::warn!("Failed to refresh metrics of process {}: {:#}", process_id, e);
                }
            }
        });

        tracing::info!(
            "Started workflow {} with execution ID {}",
            initial.workflow_id,
            execution_id
        );

        Ok(initial)
    }

    pub fn get_execution(&self, execution_id: Uuid) -> Option<WorkflowExecution> {
        self.persistence.get_execution(execution_id)
    }

    /// Executions, optionally of one workflow
    pub fn list_executions(&self, workflow_id: Option<Uuid>) -> Vec<WorkflowExecution> {
        self.persistence.list_executions(workflow_id)
    }

    pub fn running_executions(&self) -> Vec<WorkflowExecution> {
        self.persistence
            .list_executions(None)
            .into_iter()
            .filter(|e| e.status == ExecutionStatus::Running)
            .collect()
    }

    fn active_execution(&self, execution_id: Uuid) -> Option<ActiveExecution> {
        self.active
            .get(&execution_id)
            .map(|active| active.value().clone())
            .filter(|active| !active.finished.is_cancelled())
    }

    /// Check if an execution task of this instance is still running
    pub fn is_running(&self, execution_id: Uuid) -> bool {
        self.active_execution(execution_id).is_some()
    }

    /// Wait for an execution to finish and return its final record
    ///
    /// Executions not driven by this instance are returned as stored.
    pub async fn wait_for_completion(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        if let Some(active) = self.active_execution(execution_id) {
            active.finished.cancelled().await;
        }

        self.persistence
            .get_execution(execution_id)
            .ok_or(OrchestrationError::ExecutionNotFound(execution_id))
    }

    /// Cancel a running execution and wait for it to settle
    pub async fn cancel_execution(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        let execution = self
            .persistence
            .get_execution(execution_id)
            .ok_or(OrchestrationError::ExecutionNotFound(execution_id))?;

        if execution.status.is_terminal() {
            return Err(OrchestrationError::ExecutionNotRunning(execution_id));
        }

        match self.active_execution(execution_id) {
            Some(active) => {
                active.cancel.cancel();
                active.finished.cancelled().await;
            }
            None if self.owned_elsewhere(&execution) => {
                return Err(OrchestrationError::ExecutionOwnedElsewhere(execution_id));
            }
            None => {
                // No live task drives it; settle the record directly
                let mut execution = execution;
                for record in &mut execution.steps {
                    if matches!(record.status, StepStatus::Pending | StepStatus::Running) {
                        record.status = StepStatus::Skipped;
                    }
                }
                execution.status = ExecutionStatus::Cancelled;
                execution.error_message = Some("Execution cancelled".to_string());
                execution.completed_at = Some(Utc::now());
                self.persistence.save_execution(&execution)?;
            }
        }

        tracing::info!("Cancelled workflow execution {}", execution_id);

        self.persistence
            .get_execution(execution_id)
            .ok_or(OrchestrationError::ExecutionNotFound(execution_id))
    }

    /// Execution counts and durations, optionally for one workflow
    pub fn workflow_metrics(&self, workflow_id: Option<Uuid>) -> WorkflowMetrics {
        self.persistence.query_metrics(workflow_id)
    }

    // --- approvals ---

    pub fn pending_approvals(&self) -> Vec<ApprovalRequest> {
        self.approvals.list_all_pending()
    }

    /// Approve or deny a pending request
    pub async fn respond_to_approval(
        &self,
        approval_id: Uuid,
        approved: bool,
        responder: &str,
    ) -> Result<ApprovalRequest> {
        let request = self
            .approvals
            .get_approval_request(approval_id)
            .ok_or(OrchestrationError::ApprovalNotFound(approval_id))?;

        if request.status != ApprovalStatus::Pending {
            return Err(OrchestrationError::ApprovalNotPending(approval_id));
        }

        let responder = responder.to_string();
        let response = if approved {
            ApprovalResponse::Approved { responder }
        } else {
            ApprovalResponse::Denied { responder }
        };
        self.approvals.respond_approval(approval_id, response).await?;

        self.approvals
            .get_approval_request(approval_id)
            .ok_or(OrchestrationError::ApprovalNotFound(approval_id))
    }

    // --- business processes ---

    pub fn create_business_process(&self, process: NewBusinessProcess) -> Result<BusinessProcess> {
        if self.persistence.get_workflow(process.workflow_id).is_none() {
            return Err(OrchestrationError::WorkflowNotFound(process.workflow_id));
        }

        let now = Utc::now();
        let process = BusinessProcess {
            id: Uuid::new_v4(),
            name: process.name,
            description: process.description,
            category: process.category,
            workflow_id: process.workflow_id,
            is_active: process.is_active,
            metrics: ProcessMetrics::default(),
            configuration: process.configuration,
            created_at: now,
            updated_at: now,
        };

        self.persistence.insert_process(process.clone())?;
        tracing::info!("Created business process '{}' ({})", process.name, process.id);
        Ok(process)
    }

    pub fn update_business_process(
        &self,
        process_id: Uuid,
        update: BusinessProcessUpdate,
    ) -> Result<BusinessProcess> {
        if let Some(workflow_id) = update.workflow_id {
            if self.persistence.get_workflow(workflow_id).is_none() {
                return Err(OrchestrationError::WorkflowNotFound(workflow_id));
            }
        }

        self.persistence
            .update_process(process_id, move |process| {
                if let Some(name) = update.name {
                    process.name = name;
                }
                if let Some(description) = update.description {
                    process.description = description;
                }
                if let Some(workflow_id) = update.workflow_id {
                    process.workflow_id = workflow_id;
                }
                if let Some(is_active) = update.is_active {
                    process.is_active = is_active;
                }
                if let Some(configuration) = update.configuration {
                    process.configuration = configuration;
                }
                process.updated_at = Utc::now();
            })?
            .ok_or(OrchestrationError::ProcessNotFound(process_id))
    }

    pub fn get_business_process(&self, process_id: Uuid) -> Option<BusinessProcess> {
        self.persistence.get_process(process_id)
    }

    pub fn list_business_processes(&self) -> Vec<BusinessProcess> {
        self.persistence.list_processes()
    }

    pub fn active_business_processes(&self) -> Vec<BusinessProcess> {
        self.list_business_processes()
            .into_iter()
            .filter(|p| p.is_active)
            .collect()
    }

    /// Run the process's workflow with its configuration overlaid by `context`
    pub async fn execute_business_process(
        &self,
        process_id: Uuid,
        context: Map<String, Value>,
    ) -> Result<WorkflowExecution> {
        let process = self
            .persistence
            .get_process(process_id)
            .ok_or(OrchestrationError::ProcessNotFound(process_id))?;

        if !process.is_active {
            return Err(OrchestrationError::ProcessInactive(process_id));
        }

        let mut merged = process.configuration;
        merged.extend(context);

        self.start_execution(
            process.workflow_id,
            merged,
            BUSINESS_PROCESS_TRIGGER,
            Some(process_id),
        )
    }

    // --- customer inquiries ---

    /// Take in an inquiry and hand it to the customer service workflow
    ///
    /// The inquiry is stored even when no such workflow is active.
    pub async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<CustomerInquiry> {
        let inquiry = self.inquiries.create(inquiry)?;

        if let Err(e) = self.trigger_inquiry_workflow(inquiry.id).await {
            tracing::warn!("Failed to start workflow for inquiry {}: {}", inquiry.id, e);
        }

        self.inquiries
            .get(inquiry.id)
            .ok_or(OrchestrationError::InquiryNotFound(inquiry.id))
    }

    /// Start the first active customer service workflow for an inquiry
    ///
    /// Returns `None` when no such workflow exists. The execution context
    /// carries the inquiry's id and triage so condition steps can route on
    /// `category`.
    pub async fn trigger_inquiry_workflow(
        &self,
        inquiry_id: Uuid,
    ) -> Result<Option<WorkflowExecution>> {
        let inquiry = self
            .inquiries
            .get(inquiry_id)
            .ok_or(OrchestrationError::InquiryNotFound(inquiry_id))?;

        let Some(workflow) = self.persistence.list_workflows().into_iter().find(|w| {
            w.is_active && !w.is_template && w.workflow_type == WorkflowType::CustomerService
        }) else {
            tracing::debug!("No active customer service workflow for inquiry {}", inquiry_id);
            return Ok(None);
        };

        let mut context = Map::new();
        context.insert("inquiryId".to_string(), Value::String(inquiry.id.to_string()));
        for (key, value) in [
            ("category", serde_json::to_value(inquiry.category)),
            ("priority", serde_json::to_value(inquiry.priority)),
            ("source", serde_json::to_value(inquiry.source)),
        ] {
            context.insert(key.to_string(), value.map_err(anyhow::Error::from)?);
        }
        context.insert("subject".to_string(), Value::String(inquiry.subject));

        let execution = self.start_execution(workflow.id, context, SYSTEM_TRIGGER, None)?;
        self.inquiries.attach_execution(inquiry_id, execution.id)?;

        tracing::info!(
            "Inquiry {} routed to workflow '{}' (execution {})",
            inquiry_id,
            workflow.name,
            execution.id
        );
        Ok(Some(execution))
    }

    pub fn update_inquiry(&self, inquiry_id: Uuid, update: InquiryUpdate) -> Result<CustomerInquiry> {
        self.inquiries
            .update(inquiry_id, update)?
            .ok_or(OrchestrationError::InquiryNotFound(inquiry_id))
    }

    pub fn add_inquiry_response(
        &self,
        inquiry_id: Uuid,
        response: NewInquiryResponse,
    ) -> Result<InquiryResponse> {
        self.inquiries
            .add_response(inquiry_id, response)?
            .ok_or(OrchestrationError::InquiryNotFound(inquiry_id))
    }

    pub fn get_inquiry(&self, inquiry_id: Uuid) -> Option<CustomerInquiry> {
        self.inquiries.get(inquiry_id)
    }

    pub fn list_inquiries(&self) -> Vec<CustomerInquiry> {
        self.inquiries.list()
    }

    pub fn open_inquiries(&self) -> Vec<CustomerInquiry> {
        self.inquiries.open()
    }

    pub fn urgent_inquiries(&self) -> Vec<CustomerInquiry> {
        self.inquiries.urgent()
    }

    // --- metrics ---

    pub fn get_orchestration_metrics(&self) -> OrchestrationMetrics {
        orchestration_metrics(
            self.persistence.list_messages().len(),
            &self.persistence.list_executions(None),
            &self.persistence.list_processes(),
        )
    }
}

/// Fail an execution that stopped without settling, along with its running steps
fn fail_unfinished(execution: &mut WorkflowExecution, step_error: &str, error: &str) {
    let now = Utc::now();
    for record in &mut execution.steps {
        if record.status == StepStatus::Running {
            record.status = StepStatus::Failed;
            record.error_message = Some(step_error.to_string());
            record.completed_at = Some(now);
            execution.metrics.failed_steps += 1;
        }
    }
    execution.status = ExecutionStatus::Failed;
    execution.error_message = Some(error.to_string());
    execution.completed_at = Some(now);
    execution.metrics.total_duration_ms = execution.duration_ms();
}

/// Record an engine failure on the execution so it never stays running
fn mark_aborted(persistence: &BoardPersistence, execution_id: Uuid, reason: &str) {
    let Some(mut execution) = persistence.get_execution(execution_id) else {
        return;
    };
    if execution.status.is_terminal() {
        return;
    }
    fail_unfinished(&mut execution, "Aborted", reason);
    if let Err(e) = persistence.save_execution(&execution) {
        tracing::error!("Failed to record abort of execution {}: {:#}", execution_id, e);
    }
}

fn refresh_process_metrics(persistence: &BoardPersistence, process_id: Uuid) -> anyhow::Result<()> {
    let executions: Vec<_> = persistence
        .list_executions(None)
        .into_iter()
        .filter(|e| e.business_process_id == Some(process_id))
        .collect();
    let metrics = process_metrics(&executions);

    persistence.update_process(process_id, move |process| process.metrics = metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepType, WorkflowStep};
    use tempfile::tempdir;

    #[test]
    fn test_mark_aborted_fails_running_steps() {
        let dir = tempdir().unwrap();
        let persistence = BoardPersistence::new(dir.path().join("board.json")).unwrap();

        let workflow = WorkflowDefinition::from(NewWorkflow {
            name: "Aborted".to_string(),
            description: String::new(),
            workflow_type: Default::default(),
            category: Default::default(),
            steps: vec![
                WorkflowStep::new("prepare", "Prepare", StepType::DataTransform),
                WorkflowStep::new("send", "Send", StepType::DataTransform)
                    .with_dependencies(["prepare"]),
            ],
            triggers: vec![],
            is_active: true,
            is_template: false,
            metadata: None,
            created_by: "user".to_string(),
        });
        let mut execution = WorkflowExecution::new(&workflow, Map::new(), "user");
        execution.status = ExecutionStatus::Running;
        execution.step_mut("prepare").unwrap().status = StepStatus::Running;
        persistence.create_execution(execution.clone()).unwrap();

        mark_aborted(&persistence, execution.id, "Failed to persist execution");

        let stored = persistence.get_execution(execution.id).unwrap();
        assert_eq!(stored.status, ExecutionStatus::Failed);
        assert_eq!(
            stored.error_message.as_deref(),
            Some("Failed to persist execution")
        );
        let prepare = stored.step("prepare").unwrap();
        assert_eq!(prepare.status, StepStatus::Failed);
        assert_eq!(prepare.error_message.as_deref(), Some("Aborted"));
        assert_eq!(stored.step("send").unwrap().status, StepStatus::Pending);
        assert_eq!(stored.metrics.failed_steps, 1);
        assert!(stored.completed_at.is_some());

        // A settled execution is left as it is
        mark_aborted(&persistence, execution.id, "again");
        assert_eq!(
            persistence.get_execution(execution.id).unwrap().error_message.as_deref(),
            Some("Failed to persist execution")
        );
    }
}
