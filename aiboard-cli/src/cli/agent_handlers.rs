//! Agent command handlers

use crate::cli::agent::AgentCommands;
use crate::cli::context::{label, print_json, timestamp, AppContext};
use anyhow::{Context, Result};

pub async fn handle_agent_commands(app: &AppContext, command: AgentCommands) -> Result<()> {
    let service = app.service()?;

    match command {
        AgentCommands::Register {
            agent_id,
            capability,
            description,
        } => {
            service
                .register_agent_capability(&agent_id, &capability, &description)
                .context("Failed to register capability")?;
            println!("✅ Agent '{}' can now handle '{}'", agent_id, capability);
        }
        AgentCommands::Find { capability, json } => {
            let agents = service.find_agents_by_capability(&capability);
            if json {
                print_json(&serde_json::json!({
                    "capability": capability,
                    "agents": agents,
                }))?;
            } else if agents.is_empty() {
                println!("No agents have capability '{}'.", capability);
            } else {
                println!("Agents with '{}':", capability);
                for agent in &agents {
                    println!("  • {}", agent);
                }
            }
        }
        AgentCommands::Available { required, json } => {
            let agents = service.get_available_agents(&required);
            if json {
                print_json(&serde_json::json!({
                    "required": required,
                    "agents": agents,
                }))?;
            } else if agents.is_empty() {
                println!("No matching agents.");
            } else {
                for agent in &agents {
                    println!("  • {}", agent);
                }
            }
        }
        AgentCommands::Capabilities { json } => {
            let entries = service.capability_registry();
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No capabilities registered.");
                println!();
                println!("Register one with 'aiboard agent register <agent> <capability>'.");
            } else {
                println!("Capability Registry:");
                println!("====================");
                for entry in &entries {
                    let kind = if entry.is_core { "core" } else { "custom" };
                    println!("  • {} ({})", entry.capability, kind);
                    if !entry.description.is_empty() {
                        println!("    {}", entry.description);
                    }
                    println!("    Agents: {}", entry.agent_ids.join(", "));
                }
            }
        }
        AgentCommands::Messages { agent_id, json } => {
            let messages = service.get_messages_for_agent(&agent_id);
            if json {
                print_json(&messages)?;
            } else if messages.is_empty() {
                println!("No messages for agent '{}'.", agent_id);
            } else {
                for message in &messages {
                    println!(
                        "{} [{}] {} → {}: {}",
                        timestamp(&message.created_at),
                        label(&message.status),
                        message.from_agent_id,
                        message.to_agent_id,
                        message.subject
                    );
                }
            }
        }
    }

    Ok(())
}
