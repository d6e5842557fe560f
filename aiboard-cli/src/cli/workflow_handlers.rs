//! Workflow command handlers

use crate::cli::context::{
    label, load_workflow_file, parse_pairs, print_json, timestamp, AppContext,
};
use crate::cli::workflow::WorkflowCommands;
use aiboard_core::models::{WorkflowDefinition, WorkflowExecution, WorkflowUpdate};
use aiboard_core::workflow::WorkflowValidator;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use uuid::Uuid;

pub async fn handle_workflow_commands(app: &AppContext, command: WorkflowCommands) -> Result<()> {
    match command {
        WorkflowCommands::List { active, json } => handle_workflow_list(app, active, json),
        WorkflowCommands::Templates { json } => handle_workflow_templates(app, json),
        WorkflowCommands::Create {
            workflow_file,
            json,
        } => handle_workflow_create(app, &workflow_file, json),
        WorkflowCommands::FromTemplate {
            template,
            customizations,
            json,
        } => handle_workflow_from_template(app, &template, &customizations, json),
        WorkflowCommands::Show { workflow_id, json } => {
            handle_workflow_show(app, workflow_id, json)
        }
        WorkflowCommands::Run {
            workflow_id,
            context,
            triggered_by,
            json,
        } => handle_workflow_run(app, workflow_id, &context, &triggered_by, json).await,
        WorkflowCommands::Status { execution_id, json } => {
            handle_workflow_status(app, execution_id, json)
        }
        WorkflowCommands::History { workflow, json } => {
            handle_workflow_history(app, workflow, json)
        }
        WorkflowCommands::Validate {
            workflow_file,
            json,
        } => handle_workflow_validate(&workflow_file, json),
        WorkflowCommands::Delete { workflow_id } => {
            app.service()?
                .delete_workflow(workflow_id)
                .context("Failed to delete workflow")?;
            println!("🗑️  Deleted workflow {}", workflow_id);
            Ok(())
        }
        WorkflowCommands::Enable { workflow_id } => set_active(app, workflow_id, true),
        WorkflowCommands::Disable { workflow_id } => set_active(app, workflow_id, false),
    }
}

fn print_workflow_summary(workflow: &WorkflowDefinition) {
    let state = if workflow.is_active { "active" } else { "inactive" };
    println!("  • {} ({})", workflow.name, state);
    println!("    ID: {}", workflow.id);
    if !workflow.description.is_empty() {
        println!("    {}", workflow.description);
    }
    println!(
        "    Type: {}, Category: {}, Steps: {}",
        label(&workflow.workflow_type),
        label(&workflow.category),
        workflow.steps.len()
    );
}

fn handle_workflow_list(app: &AppContext, active: bool, json: bool) -> Result<()> {
    let service = app.service()?;
    let workflows = if active {
        service.active_workflows()
    } else {
        service.list_workflows()
    };

    if json {
        print_json(&serde_json::json!({
            "workflows": workflows,
            "count": workflows.len(),
        }))?;
    } else if workflows.is_empty() {
        println!("No workflows registered.");
        println!();
        println!("Create one with 'aiboard workflow create <file>' or 'aiboard workflow from-template <name>'.");
    } else {
        println!("Workflows:");
        println!("==========");
        for workflow in &workflows {
            print_workflow_summary(workflow);
        }
    }

    Ok(())
}

fn handle_workflow_templates(app: &AppContext, json: bool) -> Result<()> {
    let templates = app.service()?.get_workflow_templates();

    if json {
        print_json(&templates)?;
    } else {
        println!("Workflow Templates:");
        println!("===================");
        for template in &templates {
            println!("  • {}", template.name);
            println!("    {}", template.description);
            let steps: Vec<_> = template.steps.iter().map(|s| s.id.as_str()).collect();
            println!("    Steps: {}", steps.join(" → "));
        }
    }

    Ok(())
}

fn report_created(workflow: &WorkflowDefinition, json: bool) -> Result<()> {
    if json {
        print_json(workflow)?;
    } else {
        println!("✅ Created workflow '{}'", workflow.name);
        println!("   Workflow ID: {}", workflow.id);
        println!();
        println!("Use 'aiboard workflow run {}' to execute it", workflow.id);
    }
    Ok(())
}

fn handle_workflow_create(app: &AppContext, workflow_file: &Path, json: bool) -> Result<()> {
    let workflow = load_workflow_file(workflow_file)?;
    let created = app
        .service()?
        .create_workflow(workflow)
        .context("Failed to create workflow")?;
    report_created(&created, json)
}

fn handle_workflow_from_template(
    app: &AppContext,
    template: &str,
    customizations: &[String],
    json: bool,
) -> Result<()> {
    let customizations = parse_pairs(customizations)?;
    let created = app
        .service()?
        .create_workflow_from_template(template, &customizations)
        .context("Failed to create workflow from template")?;
    report_created(&created, json)
}

fn handle_workflow_show(app: &AppContext, workflow_id: Uuid, json: bool) -> Result<()> {
    let workflow = app
        .service()?
        .get_workflow(workflow_id)
        .ok_or_else(|| anyhow!("Workflow '{}' not found", workflow_id))?;

    if json {
        return print_json(&workflow);
    }

    println!("Workflow: {}", workflow.name);
    println!("==========");
    print_workflow_summary(&workflow);
    println!("    Created: {} by {}", timestamp(&workflow.created_at), workflow.created_by);
    println!();
    println!("Steps:");
    for step in &workflow.steps {
        print!("  {} [{}]", step.id, label(&step.step_type));
        if !step.dependencies.is_empty() {
            print!(" after {}", step.dependencies.join(", "));
        }
        println!();
        if let Some(agent) = step.agent_id.as_ref().or(step.agent_role.as_ref()) {
            println!("    Agent: {}", agent);
        }
    }
    if !workflow.triggers.is_empty() {
        println!();
        println!("Triggers:");
        for trigger in &workflow.triggers {
            println!("  {} [{}]", trigger.id, label(&trigger.trigger_type));
        }
    }

    Ok(())
}

pub(crate) fn print_execution(execution: &WorkflowExecution) {
    println!("Execution ID:   {}", execution.id);
    println!("Workflow ID:    {}", execution.workflow_id);
    println!("Status:         {}", label(&execution.status));
    println!("Triggered By:   {}", execution.triggered_by);
    println!("Started At:     {}", timestamp(&execution.started_at));
    if let Some(completed_at) = &execution.completed_at {
        println!("Completed At:   {}", timestamp(completed_at));
    }
    if let Some(duration) = execution.duration_ms() {
        println!("Duration:       {} ms", duration);
    }
    if let Some(error) = &execution.error_message {
        println!("Error:          {}", error);
    }
    println!(
        "Steps:          {}/{} completed, {} failed",
        execution.metrics.completed_steps,
        execution.metrics.total_steps,
        execution.metrics.failed_steps
    );
    println!();
    for record in &execution.steps {
        print!("  {:<24} {}", record.step_id, label(&record.status));
        if let Some(agent) = &record.assigned_agent_id {
            print!(" ({})", agent);
        }
        if record.retry_count > 0 {
            print!(" retries: {}", record.retry_count);
        }
        println!();
        if let Some(error) = &record.error_message {
            println!("    ✗ {}", error);
        }
    }
}

async fn handle_workflow_run(
    app: &AppContext,
    workflow_id: Uuid,
    context: &[String],
    triggered_by: &str,
    json: bool,
) -> Result<()> {
    let context = parse_pairs(context)?;
    let service = app.service()?;

    let started = service
        .execute_workflow(workflow_id, context, triggered_by)
        .await
        .context("Failed to start workflow")?;
    if !json {
        println!("▶️  Started execution {}", started.id);
    }

    let execution = service.wait_for_completion(started.id).await?;
    service.shutdown().await;

    if json {
        print_json(&execution)?;
    } else {
        println!();
        print_execution(&execution);
    }

    Ok(())
}

fn handle_workflow_status(app: &AppContext, execution_id: Uuid, json: bool) -> Result<()> {
    let execution = app
        .service()?
        .get_execution(execution_id)
        .ok_or_else(|| anyhow!("Execution '{}' not found", execution_id))?;

    if json {
        print_json(&execution)?;
    } else {
        println!("Workflow Execution Status");
        println!("========================");
        print_execution(&execution);
    }

    Ok(())
}

fn handle_workflow_history(app: &AppContext, workflow: Option<Uuid>, json: bool) -> Result<()> {
    let service = app.service()?;
    let executions = service.list_executions(workflow);
    let metrics = service.workflow_metrics(workflow);

    if json {
        return print_json(&serde_json::json!({
            "workflow": workflow.map(|id| id.to_string()).unwrap_or_else(|| "all".to_string()),
            "execution_count": metrics.execution_count,
            "success_count": metrics.success_count,
            "failure_count": metrics.failure_count,
            "avg_duration_ms": metrics.avg_duration_ms,
            "executions": executions,
        }));
    }

    let scope = workflow
        .map(|id| id.to_string())
        .unwrap_or_else(|| "All Workflows".to_string());
    println!("Workflow History: {}", scope);
    println!("==================");
    println!("Total Executions:   {}", metrics.execution_count);
    println!("Successful:         {}", metrics.success_count);
    println!("Failed:             {}", metrics.failure_count);
    if metrics.execution_count > 0 {
        println!("Success Rate:       {:.1}%", metrics.success_rate());
        println!(
            "Avg Duration:       {:.2}s",
            metrics.avg_duration_ms as f64 / 1000.0
        );
        if metrics.failure_rate() > 10.0 {
            println!("  ⚠️  High failure rate detected");
        }
    }

    if !executions.is_empty() {
        println!();
        for execution in &executions {
            println!(
                "  {} {:<10} {}",
                timestamp(&execution.started_at),
                label(&execution.status),
                execution.id
            );
        }
    }

    Ok(())
}

fn handle_workflow_validate(workflow_file: &Path, json: bool) -> Result<()> {
    let workflow = WorkflowDefinition::from(load_workflow_file(workflow_file)?);
    let validation = WorkflowValidator::validate_workflow(&workflow);

    if json {
        print_json(&serde_json::json!({
            "valid": validation.is_valid(),
            "errors": validation.errors.iter().map(|e| serde_json::json!({
                "field": e.field,
                "message": e.message,
            })).collect::<Vec<_>>(),
            "warnings": validation.warnings,
        }))?;
    } else {
        println!("Validating workflow: {}", workflow.name);
        println!("File: {}", workflow_file.display());
        println!();

        if validation.is_valid() {
            println!("✓ Workflow is valid");
            println!("  Steps:    {}", workflow.steps.len());
            println!("  Triggers: {}", workflow.triggers.len());
        } else {
            println!("✗ Workflow validation failed");
            println!();
            println!("Errors:");
            for error in &validation.errors {
                println!("  ✗ {}", error);
            }
        }

        if !validation.warnings.is_empty() {
            println!();
            println!("Warnings:");
            for warning in &validation.warnings {
                println!("  ⚠  {}", warning);
            }
        }
    }

    if !validation.is_valid() {
        return Err(anyhow!("Workflow validation failed"));
    }

    Ok(())
}

fn set_active(app: &AppContext, workflow_id: Uuid, is_active: bool) -> Result<()> {
    let workflow = app
        .service()?
        .update_workflow(
            workflow_id,
            WorkflowUpdate {
                is_active: Some(is_active),
                ..WorkflowUpdate::default()
            },
        )
        .context("Failed to update workflow")?;

    let state = if is_active { "Enabled" } else { "Disabled" };
    println!("✅ {} workflow '{}'", state, workflow.name);
    Ok(())
}
