//! Workflow CLI commands

use clap::Subcommand;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum WorkflowCommands {
    /// List stored workflow definitions
    List {
        /// Only show active workflows
        #[arg(long)]
        active: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List built-in workflow templates
    Templates {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create a workflow from a YAML or JSON file
    Create {
        /// Path to the workflow file
        workflow_file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create a workflow from a built-in template
    ///
    /// Examples:
    ///   aiboard workflow from-template "Content Creation Pipeline"
    ///   aiboard workflow from-template "Data Analysis & Reporting" --set name="Weekly KPIs"
    FromTemplate {
        /// Template name
        template: String,

        /// Top-level field override (key=value, repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        customizations: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a workflow definition
    Show {
        /// Workflow ID (UUID)
        workflow_id: Uuid,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Execute a workflow and wait for it to finish
    Run {
        /// Workflow ID (UUID)
        workflow_id: Uuid,

        /// Execution context entry (key=value, repeatable)
        #[arg(short, long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Identity recorded as the trigger
        #[arg(long, default_value = "user")]
        triggered_by: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Get workflow execution status
    Status {
        /// Execution ID (UUID)
        execution_id: Uuid,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show execution history and metrics
    History {
        /// Restrict to one workflow (UUID)
        #[arg(short, long)]
        workflow: Option<Uuid>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate a workflow definition file
    Validate {
        /// Path to the workflow file
        workflow_file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete a workflow definition
    Delete {
        /// Workflow ID (UUID)
        workflow_id: Uuid,
    },

    /// Allow a workflow to be executed
    Enable {
        /// Workflow ID (UUID)
        workflow_id: Uuid,
    },

    /// Prevent a workflow from being executed
    Disable {
        /// Workflow ID (UUID)
        workflow_id: Uuid,
    },
}
