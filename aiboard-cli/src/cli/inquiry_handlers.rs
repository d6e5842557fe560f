//! Customer inquiry command handlers

use crate::cli::context::{label, print_json, timestamp, AppContext};
use crate::cli::inquiry::InquiryCommands;
use aiboard_core::models::{
    CustomerInfo, CustomerInquiry, InquiryUpdate, NewInquiry, NewInquiryResponse,
    ResponseSender,
};
use anyhow::{anyhow, Context, Result};

pub async fn handle_inquiry_commands(app: &AppContext, command: InquiryCommands) -> Result<()> {
    let service = app.service()?;

    match command {
        InquiryCommands::Create {
            subject,
            content,
            source,
            category,
            priority,
            name,
            email,
            tags,
            json,
        } => {
            let inquiry = service
                .create_inquiry(NewInquiry {
                    source,
                    subject,
                    content,
                    customer_info: CustomerInfo {
                        name,
                        email,
                        ..CustomerInfo::default()
                    },
                    category,
                    priority,
                    tags,
                })
                .await
                .context("Failed to create inquiry")?;

            // The workflow runs in this process; see it through before exiting
            let execution = match inquiry.execution_id {
                Some(execution_id) => Some(service.wait_for_completion(execution_id).await?),
                None => None,
            };
            service.shutdown().await;

            if json {
                print_json(&serde_json::json!({
                    "inquiry": inquiry,
                    "execution": execution,
                }))?;
            } else {
                println!("✅ Recorded inquiry {}", inquiry.id);
                println!(
                    "   Category: {}  Priority: {}",
                    label(&inquiry.category),
                    label(&inquiry.priority)
                );
                match &execution {
                    Some(execution) => println!(
                        "   Workflow execution {}: {}",
                        execution.id,
                        label(&execution.status)
                    ),
                    None => println!("   No active customer service workflow."),
                }
            }
        }
        InquiryCommands::List { open, urgent, json } => {
            let inquiries = if open {
                service.open_inquiries()
            } else if urgent {
                service.urgent_inquiries()
            } else {
                service.list_inquiries()
            };

            if json {
                print_json(&inquiries)?;
            } else if inquiries.is_empty() {
                println!("No inquiries.");
            } else {
                println!("Customer Inquiries:");
                println!("===================");
                for inquiry in &inquiries {
                    println!(
                        "  • [{}] {} ({}, {})",
                        label(&inquiry.priority),
                        inquiry.subject,
                        label(&inquiry.category),
                        label(&inquiry.status)
                    );
                    println!("    ID: {}  Received: {}", inquiry.id, timestamp(&inquiry.created_at));
                }
            }
        }
        InquiryCommands::Show { inquiry_id, json } => {
            let inquiry = service
                .get_inquiry(inquiry_id)
                .ok_or_else(|| anyhow!("Inquiry '{}' not found", inquiry_id))?;

            if json {
                print_json(&inquiry)?;
            } else {
                print_inquiry(&inquiry);
            }
        }
        InquiryCommands::Respond {
            inquiry_id,
            content,
            sender_type,
            sender,
            internal,
            json,
        } => {
            let response = service
                .add_inquiry_response(
                    inquiry_id,
                    NewInquiryResponse {
                        content,
                        sender: ResponseSender {
                            sender_type,
                            name: sender.clone(),
                            id: sender,
                        },
                        is_public: !internal,
                        attachments: Vec::new(),
                    },
                )
                .context("Failed to add response")?;

            if json {
                print_json(&response)?;
            } else {
                println!("✅ Response {} added", response.id);
            }
        }
        InquiryCommands::Update {
            inquiry_id,
            status,
            agent,
            json,
        } => {
            let inquiry = service
                .update_inquiry(
                    inquiry_id,
                    InquiryUpdate {
                        status,
                        assigned_agent_id: agent,
                        ..InquiryUpdate::default()
                    },
                )
                .context("Failed to update inquiry")?;

            if json {
                print_json(&inquiry)?;
            } else {
                print_inquiry(&inquiry);
            }
        }
    }

    Ok(())
}

fn print_inquiry(inquiry: &CustomerInquiry) {
    println!("{}", inquiry.subject);
    println!("  ID:        {}", inquiry.id);
    println!("  Source:    {}", label(&inquiry.source));
    println!("  Category:  {}", label(&inquiry.category));
    println!("  Priority:  {}", label(&inquiry.priority));
    println!("  Status:    {}", label(&inquiry.status));
    if let Some(email) = &inquiry.customer_info.email {
        println!("  Customer:  {}", email);
    }
    if let Some(agent) = &inquiry.assigned_agent_id {
        println!("  Assigned:  {}", agent);
    }
    if let Some(minutes) = inquiry.response_time_minutes {
        println!("  First response after {} min", minutes);
    }
    println!();
    println!("{}", inquiry.content);

    for response in &inquiry.responses {
        let visibility = if response.is_public { "" } else { " (internal)" };
        println!();
        println!(
            "--- {} [{}] {}{}",
            response.sender.name,
            label(&response.sender.sender_type),
            timestamp(&response.created_at),
            visibility
        );
        println!("{}", response.content);
    }
}
