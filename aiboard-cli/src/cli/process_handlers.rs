//! Business process command handlers

use crate::cli::context::{label, parse_pairs, print_json, timestamp, AppContext};
use crate::cli::process::{CategoryArg, ProcessCommands};
use crate::cli::workflow_handlers::print_execution;
use aiboard_core::models::{NewBusinessProcess, ProcessCategory};
use anyhow::{Context, Result};

impl From<CategoryArg> for ProcessCategory {
    fn from(category: CategoryArg) -> Self {
        match category {
            CategoryArg::CustomerOnboarding => ProcessCategory::CustomerOnboarding,
            CategoryArg::SupportTicket => ProcessCategory::SupportTicket,
            CategoryArg::ContentPipeline => ProcessCategory::ContentPipeline,
            CategoryArg::DataAnalysis => ProcessCategory::DataAnalysis,
            CategoryArg::Custom => ProcessCategory::Custom,
        }
    }
}

pub async fn handle_process_commands(app: &AppContext, command: ProcessCommands) -> Result<()> {
    let service = app.service()?;

    match command {
        ProcessCommands::Create {
            name,
            workflow,
            description,
            category,
            configuration,
            json,
        } => {
            let process = service
                .create_business_process(NewBusinessProcess {
                    name,
                    description,
                    category: category.into(),
                    workflow_id: workflow,
                    is_active: true,
                    configuration: parse_pairs(&configuration)?,
                })
                .context("Failed to create business process")?;

            if json {
                print_json(&process)?;
            } else {
                println!("✅ Created business process '{}'", process.name);
                println!("   Process ID: {}", process.id);
            }
        }
        ProcessCommands::Run {
            process_id,
            context,
            json,
        } => {
            let started = service
                .execute_business_process(process_id, parse_pairs(&context)?)
                .await
                .context("Failed to start business process")?;
            let execution = service.wait_for_completion(started.id).await?;
            service.shutdown().await;

            if json {
                print_json(&execution)?;
            } else {
                print_execution(&execution);
            }
        }
        ProcessCommands::List { active, json } => {
            let processes = if active {
                service.active_business_processes()
            } else {
                service.list_business_processes()
            };

            if json {
                print_json(&processes)?;
            } else if processes.is_empty() {
                println!("No business processes.");
            } else {
                println!("Business Processes:");
                println!("===================");
                for process in &processes {
                    let state = if process.is_active { "active" } else { "inactive" };
                    println!("  • {} ({}, {})", process.name, label(&process.category), state);
                    println!("    ID: {}  Workflow: {}", process.id, process.workflow_id);
                    let metrics = &process.metrics;
                    print!(
                        "    Executions: {}, Success: {:.1}%, Avg: {} ms",
                        metrics.total_executions, metrics.success_rate, metrics.average_duration_ms
                    );
                    if let Some(last) = &metrics.last_execution {
                        print!(", Last: {}", timestamp(last));
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}
