//! CLI command handling

pub mod agent;
pub mod agent_handlers;
pub mod approval;
pub mod context;
pub mod handlers;
pub mod inquiry;
pub mod inquiry_handlers;
pub mod process;
pub mod process_handlers;
pub mod workflow;
pub mod workflow_handlers;
