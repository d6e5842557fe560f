//! Workflow execution module

pub mod approval_manager;
pub mod condition;
pub mod engine;
pub mod executor;
pub mod lease;
pub mod persistence;
pub mod resolver;
pub mod retry;
pub mod simulated_executor;
pub mod template;
pub mod templates;
pub mod validator;

pub use approval_manager::*;
pub use engine::*;
pub use executor::*;
pub use persistence::*;
pub use simulated_executor::*;
pub use validator::*;
