//! Business process CLI commands

use clap::{Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    CustomerOnboarding,
    SupportTicket,
    ContentPipeline,
    DataAnalysis,
    Custom,
}

#[derive(Subcommand)]
pub enum ProcessCommands {
    /// Create a business process bound to a workflow
    Create {
        /// Process name
        name: String,

        /// Workflow the process executes (UUID)
        #[arg(short, long)]
        workflow: Uuid,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(long, value_enum, default_value = "custom")]
        category: CategoryArg,

        /// Base execution context entry (key=value, repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        configuration: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Execute a business process and wait for it to finish
    Run {
        /// Process ID (UUID)
        process_id: Uuid,

        /// Execution context entry overriding the process configuration
        #[arg(short, long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List business processes
    List {
        /// Only show active processes
        #[arg(long)]
        active: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
