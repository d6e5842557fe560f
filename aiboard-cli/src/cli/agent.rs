//! Agent CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Grant a capability to an agent
    Register {
        /// Agent ID
        agent_id: String,

        /// Capability name
        capability: String,

        /// Capability description, used when the capability is new
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Find agents holding a capability
    Find {
        /// Capability name
        capability: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List agents holding every required capability
    Available {
        /// Required capability (repeatable)
        #[arg(short, long = "require", value_name = "CAPABILITY")]
        required: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the capability registry
    Capabilities {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show messages an agent sent or received
    Messages {
        /// Agent ID
        agent_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
