//! Built-in workflow templates

use crate::models::workflow::{
    ConditionOperator, ExternalApiConfig, NewWorkflow, StepCondition, StepConfig, StepType,
    TriggerConfig, TriggerType, WorkflowCategory, WorkflowStep, WorkflowTrigger, WorkflowType,
};
use serde_json::{json, Map, Value};

pub const CUSTOMER_SUPPORT_TICKET: &str = "Customer Support Ticket";
pub const CONTENT_CREATION_PIPELINE: &str = "Content Creation Pipeline";
pub const DATA_ANALYSIS_REPORTING: &str = "Data Analysis & Reporting";

fn capabilities(required: &[&str]) -> StepConfig {
    StepConfig {
        required_capabilities: required.iter().map(|c| c.to_string()).collect(),
        ..StepConfig::default()
    }
}

fn api(url: &str, method: &str) -> StepConfig {
    StepConfig {
        external_api_config: Some(ExternalApiConfig {
            url: url.to_string(),
            method: method.to_string(),
            headers: Map::new(),
            payload: None,
        }),
        ..StepConfig::default()
    }
}

fn described(step: WorkflowStep, description: &str) -> WorkflowStep {
    WorkflowStep {
        description: description.to_string(),
        ..step
    }
}

fn category_route(value: &str, next: &str) -> StepCondition {
    StepCondition {
        field: "category".to_string(),
        operator: ConditionOperator::Equals,
        value: json!(value),
        next_step_id: Some(next.to_string()),
    }
}

fn trigger(id: &str, trigger_type: TriggerType, config: TriggerConfig) -> WorkflowTrigger {
    WorkflowTrigger {
        id: id.to_string(),
        trigger_type,
        config,
        is_active: true,
    }
}

fn scheduled(cron: &str) -> TriggerConfig {
    TriggerConfig {
        schedule: Some(cron.to_string()),
        ..TriggerConfig::default()
    }
}

fn template(
    name: &str,
    description: &str,
    workflow_type: WorkflowType,
    category: WorkflowCategory,
    steps: Vec<WorkflowStep>,
    triggers: Vec<WorkflowTrigger>,
) -> NewWorkflow {
    NewWorkflow {
        name: name.to_string(),
        description: description.to_string(),
        workflow_type,
        category,
        steps,
        triggers,
        is_active: true,
        is_template: true,
        metadata: None,
        created_by: "system".to_string(),
    }
}

fn customer_support_ticket() -> NewWorkflow {
    template(
        CUSTOMER_SUPPORT_TICKET,
        "Automated customer support ticket processing workflow",
        WorkflowType::CustomerService,
        WorkflowCategory::Support,
        vec![
            described(
                WorkflowStep::new("analyze_ticket", "Analyze Ticket", StepType::AgentTask),
                "Analyze customer ticket content and categorize the issue",
            )
            .with_agent_role("analysis")
            .with_config(capabilities(&["content_analysis", "ai_generation"])),
            described(
                WorkflowStep::new("route_ticket", "Route Ticket", StepType::Condition),
                "Route ticket based on analysis results",
            )
            .with_dependencies(["analyze_ticket"])
            .with_conditions(vec![
                category_route("technical", "technical_response"),
                category_route("billing", "billing_response"),
            ]),
            described(
                WorkflowStep::new(
                    "technical_response",
                    "Generate Technical Response",
                    StepType::AgentTask,
                ),
                "Generate technical solution for customer",
            )
            .with_agent_role("code_generation")
            .with_config(capabilities(&["code_generation", "content_creation"]))
            .with_dependencies(["route_ticket"]),
            described(
                WorkflowStep::new(
                    "billing_response",
                    "Generate Billing Response",
                    StepType::AgentTask,
                ),
                "Generate billing-related response for customer",
            )
            .with_agent_role("content_creation")
            .with_config(capabilities(&["content_creation"]))
            .with_dependencies(["route_ticket"]),
            described(
                WorkflowStep::new("send_response", "Send Response", StepType::ExternalApi),
                "Send response to customer via email/chat",
            )
            .with_config(api("/api/send-customer-response", "POST"))
            .with_dependencies(["technical_response", "billing_response"]),
        ],
        vec![trigger(
            "new_ticket",
            TriggerType::Webhook,
            TriggerConfig {
                webhook_url: Some("/webhooks/support-ticket".to_string()),
                ..TriggerConfig::default()
            },
        )],
    )
}

fn content_creation_pipeline() -> NewWorkflow {
    template(
        CONTENT_CREATION_PIPELINE,
        "Automated content creation and publishing workflow",
        WorkflowType::ContentCreation,
        WorkflowCategory::Marketing,
        vec![
            described(
                WorkflowStep::new("research_topic", "Research Topic", StepType::AgentTask),
                "Research the given topic and gather relevant information",
            )
            .with_agent_role("analysis")
            .with_config(capabilities(&["analysis", "api_integration"])),
            described(
                WorkflowStep::new(
                    "create_outline",
                    "Create Content Outline",
                    StepType::AgentTask,
                ),
                "Create a structured outline for the content",
            )
            .with_agent_role("content_creation")
            .with_config(capabilities(&["content_creation", "ai_generation"]))
            .with_dependencies(["research_topic"]),
            described(
                WorkflowStep::new("write_content", "Write Content", StepType::AgentTask),
                "Write the full content based on outline and research",
            )
            .with_agent_role("content_creation")
            .with_config(capabilities(&["content_creation", "ai_generation"]))
            .with_dependencies(["create_outline"]),
            described(
                WorkflowStep::new("review_content", "Review Content", StepType::HumanApproval),
                "Human review and approval of generated content",
            )
            .with_config(StepConfig {
                approvers: vec!["content_manager".to_string()],
                ..StepConfig::default()
            })
            .with_dependencies(["write_content"]),
            described(
                WorkflowStep::new("publish_content", "Publish Content", StepType::ExternalApi),
                "Publish approved content to website/blog",
            )
            .with_config(api("/api/publish-content", "POST"))
            .with_dependencies(["review_content"]),
        ],
        // Mondays at 9 AM
        vec![trigger(
            "content_schedule",
            TriggerType::Schedule,
            scheduled("0 9 * * MON"),
        )],
    )
}

fn data_analysis_reporting() -> NewWorkflow {
    template(
        DATA_ANALYSIS_REPORTING,
        "Automated data analysis and report generation workflow",
        WorkflowType::DataAnalysis,
        WorkflowCategory::Operations,
        vec![
            described(
                WorkflowStep::new("collect_data", "Collect Data", StepType::ExternalApi),
                "Collect data from various sources",
            )
            .with_config(api("/api/collect-analytics-data", "GET")),
            described(
                WorkflowStep::new("analyze_data", "Analyze Data", StepType::AgentTask),
                "Perform statistical analysis and identify trends",
            )
            .with_agent_role("analysis")
            .with_config(capabilities(&["analysis", "ai_generation"]))
            .with_dependencies(["collect_data"]),
            described(
                WorkflowStep::new("generate_insights", "Generate Insights", StepType::AgentTask),
                "Generate actionable insights from analysis",
            )
            .with_agent_role("analysis")
            .with_config(capabilities(&["analysis", "content_creation"]))
            .with_dependencies(["analyze_data"]),
            described(
                WorkflowStep::new("create_report", "Create Report", StepType::AgentTask),
                "Create formatted report with charts and recommendations",
            )
            .with_agent_role("content_creation")
            .with_config(capabilities(&["content_creation", "file_management"]))
            .with_dependencies(["generate_insights"]),
            described(
                WorkflowStep::new("distribute_report", "Distribute Report", StepType::ExternalApi),
                "Send report to stakeholders",
            )
            .with_config(api("/api/send-report", "POST"))
            .with_dependencies(["create_report"]),
        ],
        // Fridays at 8 AM
        vec![trigger(
            "weekly_report",
            TriggerType::Schedule,
            scheduled("0 8 * * FRI"),
        )],
    )
}

/// All built-in templates
pub fn workflow_templates() -> Vec<NewWorkflow> {
    vec![
        customer_support_ticket(),
        content_creation_pipeline(),
        data_analysis_reporting(),
    ]
}

/// Instantiate a template by name, overlaying top-level customizations
///
/// Returns `Ok(None)` for an unknown template and an error when the
/// customizations do not fit the workflow shape.
pub fn instantiate_template(
    name: &str,
    customizations: &Map<String, Value>,
) -> Result<Option<NewWorkflow>, serde_json::Error> {
    let Some(template) = workflow_templates().into_iter().find(|t| t.name == name) else {
        return Ok(None);
    };

    let mut value = serde_json::to_value(template)?;
    if let Value::Object(fields) = &mut value {
        for (key, custom) in customizations {
            fields.insert(key.clone(), custom.clone());
        }
        fields.insert("is_template".to_string(), Value::Bool(false));
        fields.insert("created_by".to_string(), Value::String("user".to_string()));
    }

    serde_json::from_value(value).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_templates() {
        let names: Vec<_> = workflow_templates().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                CUSTOMER_SUPPORT_TICKET,
                CONTENT_CREATION_PIPELINE,
                DATA_ANALYSIS_REPORTING
            ]
        );
        assert!(workflow_templates()
            .iter()
            .all(|t| t.is_template && t.steps.len() == 5 && t.triggers.len() == 1));
    }

    #[test]
    fn test_support_template_shape() {
        let support = customer_support_ticket();
        let send = support.steps.last().unwrap();
        assert_eq!(send.id, "send_response");
        assert_eq!(send.dependencies, ["technical_response", "billing_response"]);
        assert_eq!(support.steps[1].conditions.len(), 2);
        assert_eq!(
            support.triggers[0].config.webhook_url.as_deref(),
            Some("/webhooks/support-ticket")
        );
    }

    #[test]
    fn test_instantiate_with_customizations() {
        let mut customizations = Map::new();
        customizations.insert("name".to_string(), json!("Weekly KPIs"));
        customizations.insert("category".to_string(), json!("finance"));

        let workflow = instantiate_template(DATA_ANALYSIS_REPORTING, &customizations)
            .unwrap()
            .unwrap();

        assert_eq!(workflow.name, "Weekly KPIs");
        assert_eq!(workflow.category, WorkflowCategory::Finance);
        assert_eq!(workflow.workflow_type, WorkflowType::DataAnalysis);
        assert!(!workflow.is_template);
        assert_eq!(workflow.created_by, "user");
    }

    #[test]
    fn test_instantiate_unknown_or_malformed() {
        assert!(instantiate_template("Nope", &Map::new()).unwrap().is_none());

        let mut bad = Map::new();
        bad.insert("steps".to_string(), json!("not a list"));
        assert!(instantiate_template(CUSTOMER_SUPPORT_TICKET, &bad).is_err());
    }
}
