//! Handlers for approvals, metrics, configuration and generation

use crate::cli::approval::ApprovalCommands;
use crate::cli::context::{print_json, timestamp, AppContext};
use aiboard_core::models::Configuration;
use aiboard_core::services::openai::{GenerationOptions, OpenAiClient};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

pub async fn handle_approval_commands(app: &AppContext, command: ApprovalCommands) -> Result<()> {
    match command {
        ApprovalCommands::List { json } => {
            let approvals = app.service()?.pending_approvals();

            if json {
                print_json(&serde_json::json!({
                    "approvals": approvals,
                    "count": approvals.len(),
                }))?;
            } else if approvals.is_empty() {
                println!("No pending approval requests.");
            } else {
                println!("Pending Approvals:");
                println!("==================");
                for approval in &approvals {
                    println!("  • {}", approval.action_description);
                    println!("    ID: {}", approval.id);
                    println!(
                        "    Execution: {}  Step: {}",
                        approval.execution_id, approval.step_id
                    );
                    if !approval.approvers.is_empty() {
                        println!("    Approvers: {}", approval.approvers.join(", "));
                    }
                    println!(
                        "    Requested: {} (timeout {}s)",
                        timestamp(&approval.requested_at),
                        approval.timeout_seconds
                    );
                }
            }
        }
    }

    Ok(())
}

pub async fn handle_metrics(app: &AppContext, json: bool) -> Result<()> {
    let metrics = app.service()?.get_orchestration_metrics();

    if json {
        return print_json(&metrics);
    }

    println!("Orchestration Metrics");
    println!("=====================");
    println!("Messages:             {}", metrics.total_messages);
    println!("Running Workflows:    {}", metrics.active_workflows);
    println!("Completed Workflows:  {}", metrics.completed_workflows);
    println!(
        "Avg Duration:         {:.2}s",
        metrics.average_workflow_duration_ms as f64 / 1000.0
    );

    if !metrics.agent_utilization.is_empty() {
        println!();
        println!("Agent Utilization:");
        for (agent, share) in &metrics.agent_utilization {
            println!("  {:<20} {:>5.1}%", agent, share);
        }
    }

    if !metrics.top_performing_agents.is_empty() {
        println!();
        println!("Top Agents:");
        for (rank, agent) in metrics.top_performing_agents.iter().enumerate() {
            println!(
                "  {}. {} ({} tasks, {:.1}%)",
                rank + 1,
                agent.agent_id,
                agent.completed_tasks,
                agent.score
            );
        }
    }

    if !metrics.business_process_metrics.is_empty() {
        println!();
        println!("Business Processes:");
        for (id, process) in &metrics.business_process_metrics {
            println!(
                "  {} executions: {}, success: {:.1}%",
                id, process.total_executions, process.success_rate
            );
        }
    }

    Ok(())
}

/// Write a default configuration file
pub async fn handle_config(config_file: Option<PathBuf>, init: bool, force: bool) -> Result<()> {
    if !init {
        println!("Config command requires --init flag");
        println!("Usage: aiboard config --init [--force] [--config PATH]");
        return Ok(());
    }

    let config_path = match config_file {
        Some(path) => path,
        None => Configuration::default_config_path()
            .map_err(|e| anyhow!("Failed to get default config path: {}", e))?,
    };

    if config_path.exists() && !force {
        return Err(anyhow!(
            "Configuration file {} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }

    let config = Configuration::default();
    config
        .save_to_file(&config_path)
        .map_err(|e| anyhow!("Failed to save configuration: {}", e))?;

    println!("✅ Configuration written to {}", config_path.display());
    println!("   Store: {}", config.store_path().display());
    println!("   Set OPENAI_API_KEY or edit [openai] to enable generation.");

    Ok(())
}

pub async fn handle_generate(
    app: &AppContext,
    task: String,
    agent: String,
    context: String,
    model: Option<String>,
    max_tokens: Option<u32>,
    json: bool,
) -> Result<()> {
    let client = OpenAiClient::new(app.config.openai.clone());
    let options = GenerationOptions {
        model,
        max_tokens,
        ..GenerationOptions::default()
    };

    let response = client
        .generate_for_agent(&agent, &context, &task, &options)
        .await
        .context("Generation failed")?;

    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.content);
        if let Some(usage) = &response.usage {
            eprintln!(
                "[{}: {} prompt + {} completion tokens]",
                response.model, usage.prompt_tokens, usage.completion_tokens
            );
        }
    }

    Ok(())
}
