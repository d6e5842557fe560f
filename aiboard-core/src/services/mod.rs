//! Supporting services

pub mod logging;
pub mod openai;

pub use logging::init_logging;
pub use openai::OpenAiClient;
