mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::context::AppContext;
use cli::handlers;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aiboard")]
#[command(version)]
#[command(about = "AI-Board workflow orchestration for autonomous agents")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Path to configuration file (default: <config dir>/aiboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Board store file, overriding the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Workflow definitions and executions
    Workflow {
        #[command(subcommand)]
        command: cli::workflow::WorkflowCommands,
    },

    /// Agent capabilities and messages
    Agent {
        #[command(subcommand)]
        command: cli::agent::AgentCommands,
    },

    /// Business processes bound to workflows
    Process {
        #[command(subcommand)]
        command: cli::process::ProcessCommands,
    },

    /// Customer inquiries and their responses
    Inquiry {
        #[command(subcommand)]
        command: cli::inquiry::InquiryCommands,
    },

    /// Human approval requests
    Approval {
        #[command(subcommand)]
        command: cli::approval::ApprovalCommands,
    },

    /// Display orchestration metrics
    Metrics {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write the configuration file
    Config {
        /// Create the configuration file with default values
        #[arg(long)]
        init: bool,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Generate content for an agent task with OpenAI
    ///
    /// Examples:
    ///   aiboard generate "Write a product announcement" --agent writer-1
    ///   aiboard generate "Summarize the sprint" --context "Sprint 14 notes" --json
    Generate {
        /// Task to complete
        task: String,

        /// Agent ID the content is generated for
        #[arg(short, long, default_value = "cli-agent")]
        agent: String,

        /// Project context passed to the model
        #[arg(short, long, default_value = "")]
        context: String,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { init, force } = cli.command {
        return handlers::handle_config(cli.config, init, force).await;
    }

    let app = AppContext::load(cli.config, cli.store)?;
    if let Err(e) = aiboard_core::services::init_logging(app.config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Workflow { command } => {
            cli::workflow_handlers::handle_workflow_commands(&app, command).await?;
        }
        Commands::Agent { command } => {
            cli::agent_handlers::handle_agent_commands(&app, command).await?;
        }
        Commands::Process { command } => {
            cli::process_handlers::handle_process_commands(&app, command).await?;
        }
        Commands::Inquiry { command } => {
            cli::inquiry_handlers::handle_inquiry_commands(&app, command).await?;
        }
        Commands::Approval { command } => {
            handlers::handle_approval_commands(&app, command).await?;
        }
        Commands::Metrics { json } => {
            handlers::handle_metrics(&app, json).await?;
        }
        Commands::Generate {
            task,
            agent,
            context,
            model,
            max_tokens,
            json,
        } => {
            handlers::handle_generate(&app, task, agent, context, model, max_tokens, json).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
