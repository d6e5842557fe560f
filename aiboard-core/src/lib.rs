//! # AI-Board Core Library
//!
//! Workflow engine, agent orchestration service, persistence and the OpenAI
//! client shared by the `aiboard` CLI.

pub mod error;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod workflow;

pub use error::{OrchestrationError, Result, StepError};
pub use orchestration::OrchestrationService;
