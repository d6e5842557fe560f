//! Data models for aiboard

pub mod business;
pub mod configuration;
pub mod inquiry;
pub mod message;
pub mod workflow;

pub use business::*;
pub use configuration::*;
pub use inquiry::*;
pub use message::*;
pub use workflow::*;
