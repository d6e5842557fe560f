//! Default step executor simulating agent work

use crate::error::StepError;
use crate::models::{MessageType, OutgoingMessage, Priority, StepType, ORCHESTRATOR_ID};
use crate::orchestration::capability::CapabilityRegistry;
use crate::orchestration::messaging::MessageBus;
use crate::workflow::approval_manager::{ApprovalManager, ApprovalResponse};
use crate::workflow::condition::{select_next_step, NEXT_STEP_KEY};
use crate::workflow::executor::{StepExecutor, StepOutcome, StepRequest};
use crate::workflow::template::resolve_templates;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identity recorded on automatically granted approvals
pub const SYSTEM_APPROVER: &str = "system";

/// Executes steps against the board's message bus, registry and approvals
///
/// Agent tasks are dispatched as messages and complete immediately; external
/// API calls are not performed.
pub struct SimulatedStepExecutor {
    registry: Arc<CapabilityRegistry>,
    messages: Arc<MessageBus>,
    approvals: Arc<ApprovalManager>,
    auto_approve: bool,
    approval_timeout_seconds: u32,
}

impl SimulatedStepExecutor {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        messages: Arc<MessageBus>,
        approvals: Arc<ApprovalManager>,
    ) -> Self {
        Self {
            registry,
            messages,
            approvals,
            auto_approve: true,
            approval_timeout_seconds: 300,
        }
    }

    /// Require an operator decision for approval steps
    pub fn with_manual_approval(mut self, timeout_seconds: u32) -> Self {
        self.auto_approve = false;
        self.approval_timeout_seconds = timeout_seconds;
        self
    }

    async fn agent_task(&self, request: StepRequest<'_>) -> Result<StepOutcome, StepError> {
        let step = request.step;
        let agent_id = match &step.agent_id {
            Some(agent_id) => Some(agent_id.clone()),
            None => step.agent_role.as_ref().and_then(|role| {
                self.registry
                    .available_agents(std::slice::from_ref(role))
                    .into_iter()
                    .next()
            }),
        }
        .ok_or_else(|| StepError::NoAgentAvailable(step.name.clone()))?;

        let config = serde_json::to_value(&step.config).map_err(anyhow::Error::from)?;
        let message = self
            .messages
            .send(OutgoingMessage {
                from_agent_id: ORCHESTRATOR_ID.to_string(),
                to_agent_id: agent_id.clone(),
                message_type: MessageType::TaskRequest,
                subject: format!("Workflow Task: {}", step.name),
                content: step.description.clone(),
                data: Some(json!({
                    "workflow_execution_id": request.execution_id,
                    "step_id": step.id,
                    "context": request.context,
                    "config": config,
                })),
                priority: Priority::Medium,
            })
            .await?;

        Ok(StepOutcome {
            output: json!({
                "result": "Task completed successfully",
                "message_id": message.id,
            }),
            context_updates: Map::new(),
            assigned_agent_id: Some(agent_id),
        })
    }

    fn condition(&self, request: StepRequest<'_>) -> StepOutcome {
        let mut context_updates = Map::new();
        let result = match select_next_step(&request.step.conditions, request.context) {
            Some(next) => {
                context_updates.insert(NEXT_STEP_KEY.to_string(), Value::String(next.clone()));
                Value::String(next)
            }
            None => request
                .context
                .get(NEXT_STEP_KEY)
                .cloned()
                .unwrap_or(Value::Null),
        };

        StepOutcome {
            output: json!({ "conditionResult": result }),
            context_updates,
            assigned_agent_id: None,
        }
    }

    fn data_transform(&self, request: StepRequest<'_>) -> StepOutcome {
        let transformed = resolve_templates(&request.step.config.input, request.context);
        StepOutcome {
            output: Value::Object(transformed.clone()),
            context_updates: transformed,
            assigned_agent_id: None,
        }
    }

    async fn human_approval(&self, request: StepRequest<'_>) -> Result<StepOutcome, StepError> {
        let step = request.step;
        let description = if step.description.is_empty() {
            format!("Approve step: {}", step.name)
        } else {
            step.description.clone()
        };

        let (approval_id, rx) = self
            .approvals
            .request_approval(
                request.execution_id,
                step.id.clone(),
                description,
                step.config.approvers.clone(),
                self.approval_timeout_seconds,
            )
            .await?;

        if self.auto_approve {
            self.approvals
                .respond_approval(
                    approval_id,
                    ApprovalResponse::Approved {
                        responder: SYSTEM_APPROVER.to_string(),
                    },
                )
                .await?;
        } else {
            tracing::info!(
                "Step '{}' waiting for approval {} ({}s)",
                step.id,
                approval_id,
                self.approval_timeout_seconds
            );
        }

        // Expires the request however this future ends, including being dropped
        // by cancellation or the step timeout
        let _expiry = ApprovalExpiry {
            approvals: &self.approvals,
            approval_id,
        };

        let wait = Duration::from_secs(self.approval_timeout_seconds as u64);
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(ApprovalResponse::Approved { responder })) => Ok(StepOutcome::with_output(
                json!({ "approved": true, "approver": responder }),
            )),
            Ok(Ok(ApprovalResponse::Denied { responder })) => {
                Err(StepError::ApprovalDenied(responder))
            }
            Ok(Ok(ApprovalResponse::Timeout)) | Ok(Err(_)) | Err(_) => {
                Err(StepError::ApprovalTimeout(self.approval_timeout_seconds))
            }
        }
    }

    fn external_api(&self, request: StepRequest<'_>) -> Result<StepOutcome, StepError> {
        let api = request
            .step
            .config
            .external_api_config
            .as_ref()
            .ok_or(StepError::MissingApiConfig)?;

        tracing::debug!("Simulating {} {}", api.method, api.url);

        Ok(StepOutcome::with_output(json!({
            "status": "success",
            "data": { "message": "API call completed" },
            "url": api.url,
        })))
    }
}

struct ApprovalExpiry<'a> {
    approvals: &'a ApprovalManager,
    approval_id: Uuid,
}

impl Drop for ApprovalExpiry<'_> {
    fn drop(&mut self) {
        self.approvals.expire(self.approval_id);
    }
}

#[async_trait]
impl StepExecutor for SimulatedStepExecutor {
    async fn execute(&self, request: StepRequest<'_>) -> Result<StepOutcome, StepError> {
        match request.step.step_type {
            StepType::AgentTask => self.agent_task(request).await,
            StepType::Condition => Ok(self.condition(request)),
            StepType::DataTransform => Ok(self.data_transform(request)),
            StepType::HumanApproval => self.human_approval(request).await,
            StepType::ExternalApi => self.external_api(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ApprovalStatus, ConditionOperator, ExternalApiConfig, StepCondition,
        StepConfig, WorkflowStep,
    };
    use crate::workflow::persistence::BoardPersistence;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        registry: Arc<CapabilityRegistry>,
        messages: Arc<MessageBus>,
        approvals: Arc<ApprovalManager>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(BoardPersistence::new(dir.path().join("board.json")).unwrap());
        Fixture {
            _dir: dir,
            registry: Arc::new(CapabilityRegistry::new(persistence.clone())),
            messages: Arc::new(MessageBus::new(
                persistence.clone(),
                Duration::from_millis(100),
            )),
            approvals: Arc::new(ApprovalManager::new(persistence)),
        }
    }

    impl Fixture {
        fn executor(&self) -> SimulatedStepExecutor {
            SimulatedStepExecutor::new(
                self.registry.clone(),
                self.messages.clone(),
                self.approvals.clone(),
            )
        }
    }

    fn request<'a>(step: &'a WorkflowStep, context: &'a Map<String, Value>) -> StepRequest<'a> {
        StepRequest {
            execution_id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            step,
            context,
            attempt: 0,
        }
    }

    #[tokio::test]
    async fn test_agent_task_dispatches_message_to_role_holder() {
        let fx = fixture();
        fx.registry.register("support-bot", "customer_support", "").unwrap();

        let step = WorkflowStep::new("analyze", "Analyze Ticket", StepType::AgentTask)
            .with_agent_role("customer_support");
        let context = Map::new();

        let outcome = fx.executor().execute(request(&step, &context)).await.unwrap();

        assert_eq!(outcome.assigned_agent_id.as_deref(), Some("support-bot"));
        assert_eq!(outcome.output["result"], "Task completed successfully");

        let inbox = fx.messages.messages_for_agent("support-bot");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].from_agent_id, ORCHESTRATOR_ID);
        assert_eq!(inbox[0].subject, "Workflow Task: Analyze Ticket");
        assert_eq!(inbox[0].message_type, MessageType::TaskRequest);
        assert_eq!(
            outcome.output["message_id"],
            Value::String(inbox[0].id.to_string())
        );
    }

    #[tokio::test]
    async fn test_agent_task_without_agent_fails() {
        let fx = fixture();
        let step = WorkflowStep::new("analyze", "Analyze Ticket", StepType::AgentTask)
            .with_agent_role("customer_support");
        let context = Map::new();

        let err = fx
            .executor()
            .execute(request(&step, &context))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No agent available for step Analyze Ticket");
    }

    #[tokio::test]
    async fn test_condition_sets_next_step_hint() {
        let fx = fixture();
        let step = WorkflowStep::new("route", "Route", StepType::Condition).with_conditions(vec![
            StepCondition {
                field: "category".to_string(),
                operator: ConditionOperator::Equals,
                value: json!("technical"),
                next_step_id: Some("tech".to_string()),
            },
        ]);

        let mut context = Map::new();
        context.insert("category".to_string(), json!("technical"));
        let outcome = fx.executor().execute(request(&step, &context)).await.unwrap();
        assert_eq!(outcome.output, json!({"conditionResult": "tech"}));
        assert_eq!(outcome.context_updates[NEXT_STEP_KEY], "tech");

        let context = Map::new();
        let outcome = fx.executor().execute(request(&step, &context)).await.unwrap();
        assert_eq!(outcome.output, json!({"conditionResult": null}));
        assert!(outcome.context_updates.is_empty());
    }

    #[tokio::test]
    async fn test_data_transform_resolves_placeholders() {
        let fx = fixture();
        let mut input = Map::new();
        input.insert("subject".to_string(), json!("{{topic}}"));
        input.insert("format".to_string(), json!("blog"));
        let step = WorkflowStep::new("prep", "Prepare", StepType::DataTransform).with_config(
            StepConfig {
                input,
                ..StepConfig::default()
            },
        );
        let mut context = Map::new();
        context.insert("topic".to_string(), json!("async rust"));

        let outcome = fx.executor().execute(request(&step, &context)).await.unwrap();
        assert_eq!(outcome.output, json!({"subject": "async rust", "format": "blog"}));
        assert_eq!(outcome.context_updates["subject"], "async rust");
    }

    #[tokio::test]
    async fn test_human_approval_auto_approves() {
        let fx = fixture();
        let step = WorkflowStep::new("review", "Review", StepType::HumanApproval);
        let context = Map::new();
        let req = request(&step, &context);

        let outcome = fx.executor().execute(req).await.unwrap();
        assert_eq!(outcome.output, json!({"approved": true, "approver": "system"}));

        assert!(fx.approvals.list_all_pending().is_empty());
    }

    #[tokio::test]
    async fn test_manual_approval_times_out() {
        let fx = fixture();
        let executor = fx.executor().with_manual_approval(1);
        let step = WorkflowStep::new("review", "Review", StepType::HumanApproval);
        let context = Map::new();
        let req = request(&step, &context);
        let execution_id = req.execution_id;

        let err = executor.execute(req).await.unwrap_err();
        assert!(matches!(err, StepError::ApprovalTimeout(1)));

        assert!(fx.approvals.get_pending_approvals(execution_id).is_empty());
    }

    #[tokio::test]
    async fn test_dropped_approval_wait_expires_request() {
        let fx = fixture();
        let executor = fx.executor().with_manual_approval(30);
        let step = WorkflowStep::new("review", "Review", StepType::HumanApproval);
        let context = Map::new();
        let req = request(&step, &context);
        let execution_id = req.execution_id;

        // The step's own timeout gives up long before the approval window
        let result = tokio::time::timeout(Duration::from_millis(50), executor.execute(req)).await;
        assert!(result.is_err());

        assert!(fx.approvals.get_pending_approvals(execution_id).is_empty());
        assert_eq!(fx.approvals.waiting_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_approval_denied() {
        let fx = fixture();
        let executor = fx.executor().with_manual_approval(30);
        let step = WorkflowStep::new("review", "Review", StepType::HumanApproval);
        let context = Map::new();
        let req = request(&step, &context);
        let execution_id = req.execution_id;

        let approvals = fx.approvals.clone();
        let responder = tokio::spawn(async move {
            loop {
                if let Some(pending) = approvals.get_pending_approvals(execution_id).pop() {
                    approvals
                        .respond_approval(
                            pending.id,
                            ApprovalResponse::Denied {
                                responder: "legal".to_string(),
                            },
                        )
                        .await
                        .unwrap();
                    return pending.id;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let err = executor.execute(req).await.unwrap_err();
        assert_eq!(err.to_string(), "Approval denied by legal");

        let approval_id = responder.await.unwrap();
        let approval = fx.approvals.get_approval_request(approval_id).unwrap();
        assert_eq!(approval.status, ApprovalStatus::Denied);
    }

    #[tokio::test]
    async fn test_external_api_requires_config() {
        let fx = fixture();
        let step = WorkflowStep::new("call", "Call", StepType::ExternalApi);
        let context = Map::new();

        let err = fx
            .executor()
            .execute(request(&step, &context))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::MissingApiConfig));

        let step = step.with_config(StepConfig {
            external_api_config: Some(ExternalApiConfig {
                url: "https://crm.example.com/tickets".to_string(),
                method: "POST".to_string(),
                headers: Map::new(),
                payload: None,
            }),
            ..StepConfig::default()
        });
        let outcome = fx.executor().execute(request(&step, &context)).await.unwrap();
        assert_eq!(outcome.output["status"], "success");
        assert_eq!(outcome.output["url"], "https://crm.example.com/tickets");
    }
}
