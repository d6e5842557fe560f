//! Approval CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ApprovalCommands {
    /// List pending approval requests
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
