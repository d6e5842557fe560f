//! End-to-end tests of the orchestration service over a temporary store

use aiboard_core::models::{
    ApprovalStatus, Configuration, ExecutionStatus, InquiryCategory, InquiryPriority,
    InquiryStatus, InquiryUpdate, NewBusinessProcess, NewInquiry, NewInquiryResponse,
    NewWorkflow, ProcessCategory, ResponseSender, SenderType, StepConfig, StepStatus, StepType,
    WorkflowExecution, WorkflowStep,
};
use aiboard_core::workflow::persistence::BoardPersistence;
use aiboard_core::workflow::templates::{CONTENT_CREATION_PIPELINE, CUSTOMER_SUPPORT_TICKET};
use aiboard_core::{OrchestrationError, OrchestrationService};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

fn config(dir: &TempDir) -> Configuration {
    Configuration {
        store_path: Some(dir.path().join("board_store.json")),
        message_delivery_delay_ms: 10,
        ..Configuration::default()
    }
}

fn service(dir: &TempDir) -> OrchestrationService {
    OrchestrationService::open(&config(dir)).unwrap()
}

fn manual_approval_service(dir: &TempDir) -> OrchestrationService {
    let config = Configuration {
        auto_approve: false,
        approval_timeout_seconds: 30,
        ..config(dir)
    };
    OrchestrationService::open(&config).unwrap()
}

fn register_board_agents(service: &OrchestrationService) {
    for (agent, capability) in [
        ("analyst", "analysis"),
        ("writer", "content_creation"),
        ("coder", "code_generation"),
    ] {
        service
            .register_agent_capability(agent, capability, "test agent")
            .unwrap();
    }
}

fn context(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn approval_workflow() -> NewWorkflow {
    NewWorkflow {
        name: "Review".to_string(),
        description: String::new(),
        workflow_type: Default::default(),
        category: Default::default(),
        steps: vec![
            WorkflowStep::new("review", "Review", StepType::HumanApproval).with_config(
                StepConfig {
                    approvers: vec!["alice".to_string()],
                    ..StepConfig::default()
                },
            ),
            WorkflowStep::new("publish", "Publish", StepType::AgentTask)
                .with_agent("writer")
                .with_dependencies(["review"]),
        ],
        triggers: vec![],
        is_active: true,
        is_template: false,
        metadata: None,
        created_by: "user".to_string(),
    }
}

async fn wait_for_pending_approval(service: &OrchestrationService) -> Uuid {
    for _ in 0..200 {
        if let Some(request) = service.pending_approvals().into_iter().next() {
            return request.id;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no approval request appeared");
}

#[tokio::test]
async fn test_content_pipeline_runs_to_completion() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    register_board_agents(&service);

    let workflow = service
        .create_workflow_from_template(CONTENT_CREATION_PIPELINE, &Map::new())
        .unwrap();
    assert!(!workflow.is_template);

    let started = service
        .execute_workflow(workflow.id, context(&[("topic", json!("rust"))]), "user")
        .await
        .unwrap();
    assert_eq!(started.status, ExecutionStatus::Pending);
    assert_eq!(started.steps.len(), 5);
    assert_eq!(started.metrics.total_steps, 5);

    let finished = service.wait_for_completion(started.id).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert!(finished
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed));
    assert_eq!(finished.metrics.completed_steps, 5);
    assert_eq!(finished.execution_context["topic"], json!("rust"));
    assert_eq!(
        finished.step("research_topic").unwrap().assigned_agent_id.as_deref(),
        Some("analyst")
    );
    assert_eq!(
        finished.step("write_content").unwrap().assigned_agent_id.as_deref(),
        Some("writer")
    );
    assert_eq!(
        finished.step("review_content").unwrap().output.as_ref().unwrap()["approver"],
        json!("system")
    );

    // Agent tasks are dispatched as task requests
    assert_eq!(service.get_messages_for_agent("writer").len(), 2);
    assert!(service.pending_approvals().is_empty());
}

#[tokio::test]
async fn test_support_ticket_routes_and_completes() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    register_board_agents(&service);

    let workflow = service
        .create_workflow_from_template(CUSTOMER_SUPPORT_TICKET, &Map::new())
        .unwrap();
    let started = service
        .execute_workflow(
            workflow.id,
            context(&[("category", json!("billing"))]),
            "user",
        )
        .await
        .unwrap();
    let finished = service.wait_for_completion(started.id).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(
        finished.execution_context["_nextStepId"],
        json!("billing_response")
    );
    assert_eq!(
        finished.step("route_ticket").unwrap().output.as_ref().unwrap()["conditionResult"],
        json!("billing_response")
    );
}

#[tokio::test]
async fn test_missing_agent_fails_and_leaves_dependents_pending() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    // No agents registered: the first agent task cannot be assigned
    let workflow = service
        .create_workflow_from_template(CONTENT_CREATION_PIPELINE, &Map::new())
        .unwrap();
    let started = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();
    let finished = service.wait_for_completion(started.id).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Failed);
    let research = finished.step("research_topic").unwrap();
    assert_eq!(research.status, StepStatus::Failed);
    assert_eq!(
        research.error_message.as_deref(),
        Some("No agent available for step Research Topic")
    );
    assert_eq!(
        finished.step("create_outline").unwrap().status,
        StepStatus::Pending
    );
    assert_eq!(finished.metrics.failed_steps, 1);
    assert!(finished
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Step 'research_topic' failed"));
}

#[tokio::test]
async fn test_execute_rejects_missing_and_inactive_workflows() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let missing = Uuid::new_v4();
    let err = service
        .execute_workflow(missing, Map::new(), "user")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("Workflow {} not found", missing));

    let mut inactive = approval_workflow();
    inactive.is_active = false;
    let workflow = service.create_workflow(inactive).unwrap();
    let err = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Workflow {} is not active", workflow.id)
    );
}

#[tokio::test]
async fn test_invalid_workflow_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let mut workflow = approval_workflow();
    workflow.steps[0] = workflow.steps[0].clone().with_dependencies(["publish"]);

    let err = service.create_workflow(workflow).unwrap_err();
    match err {
        OrchestrationError::InvalidWorkflow(errors) => {
            assert!(errors.iter().any(|e| e.contains("Circular dependency")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_workflows().is_empty());
}

#[tokio::test]
async fn test_manual_approval_granted() {
    let dir = TempDir::new().unwrap();
    let service = manual_approval_service(&dir);
    let workflow = service.create_workflow(approval_workflow()).unwrap();

    let started = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();

    let approval_id = wait_for_pending_approval(&service).await;
    let response = service
        .respond_to_approval(approval_id, true, "alice")
        .await
        .unwrap();
    assert_eq!(response.status, ApprovalStatus::Approved);
    assert_eq!(response.responder.as_deref(), Some("alice"));

    let finished = service.wait_for_completion(started.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);

    // A settled request cannot be answered again
    assert!(matches!(
        service.respond_to_approval(approval_id, false, "bob").await,
        Err(OrchestrationError::ApprovalNotPending(_))
    ));
}

#[tokio::test]
async fn test_manual_approval_denied_fails_execution() {
    let dir = TempDir::new().unwrap();
    let service = manual_approval_service(&dir);
    let workflow = service.create_workflow(approval_workflow()).unwrap();

    let started = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();
    let approval_id = wait_for_pending_approval(&service).await;
    service
        .respond_to_approval(approval_id, false, "alice")
        .await
        .unwrap();

    let finished = service.wait_for_completion(started.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Failed);
    assert_eq!(
        finished.step("review").unwrap().error_message.as_deref(),
        Some("Approval denied by alice")
    );
    assert_eq!(finished.step("publish").unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn test_cancel_running_execution() {
    let dir = TempDir::new().unwrap();
    let service = manual_approval_service(&dir);
    let workflow = service.create_workflow(approval_workflow()).unwrap();

    let started = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();
    wait_for_pending_approval(&service).await;
    assert!(service.is_running(started.id));

    let cancelled = service.cancel_execution(started.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert!(cancelled
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Skipped));
    assert!(!service.is_running(started.id));

    assert!(matches!(
        service.cancel_execution(started.id).await,
        Err(OrchestrationError::ExecutionNotRunning(_))
    ));
}

#[tokio::test]
async fn test_cancel_reaches_execution_someone_is_waiting_on() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(manual_approval_service(&dir));
    let workflow = service.create_workflow(approval_workflow()).unwrap();

    let started = service
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();
    let approval_id = wait_for_pending_approval(&service).await;

    let waiter = {
        let service = service.clone();
        tokio::spawn(async move { service.wait_for_completion(started.id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(service.is_running(started.id));

    let cancelled = service.cancel_execution(started.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);

    let waited = waiter.await.unwrap().unwrap();
    assert_eq!(waited.status, ExecutionStatus::Cancelled);

    // Nothing rewrites the record afterwards
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stored = service.get_execution(started.id).unwrap();
    assert_eq!(stored.status, ExecutionStatus::Cancelled);

    // The abandoned approval is settled rather than left pending
    assert!(service.pending_approvals().is_empty());
    assert_eq!(
        service
            .approval_manager()
            .get_approval_request(approval_id)
            .unwrap()
            .status,
        ApprovalStatus::Timeout
    );
    assert_eq!(service.approval_manager().waiting_count(), 0);
}

#[tokio::test]
async fn test_second_instance_leaves_live_execution_alone() {
    let dir = TempDir::new().unwrap();
    let owner = manual_approval_service(&dir);
    let workflow = owner.create_workflow(approval_workflow()).unwrap();

    let started = owner
        .execute_workflow(workflow.id, Map::new(), "user")
        .await
        .unwrap();
    let approval_id = wait_for_pending_approval(&owner).await;

    let observer = service(&dir);
    let seen = observer.get_execution(started.id).unwrap();
    assert_eq!(seen.status, ExecutionStatus::Running);
    assert_eq!(seen.error_message, None);
    assert_eq!(observer.pending_approvals().len(), 1);
    assert!(matches!(
        observer.cancel_execution(started.id).await,
        Err(OrchestrationError::ExecutionOwnedElsewhere(_))
    ));
    drop(observer);

    owner
        .respond_to_approval(approval_id, true, "alice")
        .await
        .unwrap();
    let finished = owner.wait_for_completion(started.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_execution_of_dead_instance_is_recovered() {
    let dir = TempDir::new().unwrap();
    let workflow = service(&dir).create_workflow(approval_workflow()).unwrap();

    let mut orphan = WorkflowExecution::new(&workflow, Map::new(), "user");
    orphan.status = ExecutionStatus::Running;
    orphan.owner_id = Some(Uuid::new_v4());
    orphan.step_mut("review").unwrap().status = StepStatus::Running;
    {
        let persistence = BoardPersistence::new(config(&dir).store_path()).unwrap();
        persistence.create_execution(orphan.clone()).unwrap();
    }

    let service = service(&dir);
    let recovered = service.get_execution(orphan.id).unwrap();
    assert_eq!(recovered.status, ExecutionStatus::Failed);
    assert_eq!(
        recovered.error_message.as_deref(),
        Some("Interrupted before completion")
    );
    assert_eq!(recovered.step("review").unwrap().status, StepStatus::Failed);
    assert_eq!(recovered.step("publish").unwrap().status, StepStatus::Pending);
    assert_eq!(recovered.metrics.failed_steps, 1);
}

#[tokio::test]
async fn test_business_process_execution_updates_metrics() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    register_board_agents(&service);

    let workflow = service
        .create_workflow_from_template(CONTENT_CREATION_PIPELINE, &Map::new())
        .unwrap();
    let process = service
        .create_business_process(NewBusinessProcess {
            name: "Weekly blog".to_string(),
            description: String::new(),
            category: ProcessCategory::ContentPipeline,
            workflow_id: workflow.id,
            is_active: true,
            configuration: context(&[("topic", json!("default")), ("tone", json!("casual"))]),
        })
        .unwrap();
    assert_eq!(process.metrics.total_executions, 0);

    let started = service
        .execute_business_process(process.id, context(&[("topic", json!("async rust"))]))
        .await
        .unwrap();
    assert_eq!(started.triggered_by, "business_process");
    assert_eq!(started.business_process_id, Some(process.id));
    assert_eq!(started.execution_context["topic"], json!("async rust"));
    assert_eq!(started.execution_context["tone"], json!("casual"));

    let finished = service.wait_for_completion(started.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);

    let process = service.get_business_process(process.id).unwrap();
    assert_eq!(process.metrics.total_executions, 1);
    assert_eq!(process.metrics.success_rate, 100.0);
    assert!(process.metrics.last_execution.is_some());

    let metrics = service.get_orchestration_metrics();
    assert_eq!(metrics.completed_workflows, 1);
    assert_eq!(metrics.active_workflows, 0);
    assert!(metrics.business_process_metrics.contains_key(&process.id));
    assert!(metrics.agent_utilization.contains_key("writer"));
}

#[tokio::test]
async fn test_business_process_requires_workflow_and_active_process() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let missing = Uuid::new_v4();
    assert!(matches!(
        service.create_business_process(NewBusinessProcess {
            name: "Orphan".to_string(),
            description: String::new(),
            category: ProcessCategory::Custom,
            workflow_id: missing,
            is_active: true,
            configuration: Map::new(),
        }),
        Err(OrchestrationError::WorkflowNotFound(id)) if id == missing
    ));

    let workflow = service.create_workflow(approval_workflow()).unwrap();
    let process = service
        .create_business_process(NewBusinessProcess {
            name: "Paused".to_string(),
            description: String::new(),
            category: ProcessCategory::Custom,
            workflow_id: workflow.id,
            is_active: false,
            configuration: Map::new(),
        })
        .unwrap();

    assert!(matches!(
        service.execute_business_process(process.id, Map::new()).await,
        Err(OrchestrationError::ProcessInactive(_))
    ));
    assert!(service.active_business_processes().is_empty());
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let workflow_id = {
        let service = service(&dir);
        register_board_agents(&service);
        service
            .create_workflow_from_template(CONTENT_CREATION_PIPELINE, &Map::new())
            .unwrap()
            .id
    };

    let reopened = service(&dir);
    assert!(reopened.get_workflow(workflow_id).is_some());
    assert_eq!(
        reopened.find_agents_by_capability("analysis"),
        vec!["analyst".to_string()]
    );
    assert_eq!(
        reopened.get_available_agents(&[]),
        vec![
            "analyst".to_string(),
            "writer".to_string(),
            "coder".to_string()
        ]
    );
}

#[tokio::test]
async fn test_inquiry_is_routed_through_support_workflow() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    register_board_agents(&service);
    service
        .create_workflow_from_template(CUSTOMER_SUPPORT_TICKET, &Map::new())
        .unwrap();

    let inquiry = service
        .create_inquiry(NewInquiry {
            subject: "Invoice is wrong".to_string(),
            content: "We were billed for the wrong plan, please fix asap".to_string(),
            ..NewInquiry::default()
        })
        .await
        .unwrap();
    assert_eq!(inquiry.category, InquiryCategory::Billing);
    assert_eq!(inquiry.priority, InquiryPriority::High);

    let execution_id = inquiry.execution_id.expect("workflow started");
    let finished = service.wait_for_completion(execution_id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.triggered_by, "system");
    assert_eq!(
        finished.execution_context["inquiryId"],
        json!(inquiry.id.to_string())
    );
    assert_eq!(
        finished.execution_context["_nextStepId"],
        json!("billing_response")
    );

    let response = service
        .add_inquiry_response(
            inquiry.id,
            NewInquiryResponse {
                content: "We have corrected the invoice".to_string(),
                sender: ResponseSender {
                    sender_type: SenderType::Agent,
                    id: "writer".to_string(),
                    name: "Writer".to_string(),
                },
                is_public: true,
                attachments: vec![],
            },
        )
        .unwrap();
    assert_eq!(response.inquiry_id, inquiry.id);

    let resolved = service
        .update_inquiry(
            inquiry.id,
            InquiryUpdate {
                status: Some(InquiryStatus::Resolved),
                ..InquiryUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(resolved.responses.len(), 1);
    assert!(resolved.response_time_minutes.is_some());
    assert!(resolved.resolved_at.is_some());
    assert!(service.open_inquiries().is_empty());
}

#[tokio::test]
async fn test_inquiry_without_support_workflow_is_still_recorded() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let inquiry = service
        .create_inquiry(NewInquiry {
            subject: "Site down".to_string(),
            content: "Nothing loads".to_string(),
            ..NewInquiry::default()
        })
        .await
        .unwrap();
    assert_eq!(inquiry.priority, InquiryPriority::Urgent);
    assert_eq!(inquiry.execution_id, None);
    assert_eq!(service.urgent_inquiries().len(), 1);
    assert!(service.list_executions(None).is_empty());

    let missing = Uuid::new_v4();
    assert!(matches!(
        service.trigger_inquiry_workflow(missing).await,
        Err(OrchestrationError::InquiryNotFound(id)) if id == missing
    ));
}
