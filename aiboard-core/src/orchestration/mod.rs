//! Agent orchestration: messaging, discovery, inquiries, metrics and the service facade

pub mod capability;
pub mod inquiry;
pub mod messaging;
pub mod metrics;
pub mod service;

pub use capability::CapabilityRegistry;
pub use inquiry::InquiryDesk;
pub use messaging::MessageBus;
pub use service::*;
