//! Logging service

use crate::models::LogLevel;

/// Filter directive covering the library and the CLI at one level
pub fn filter_directive(level: LogLevel) -> String {
    let level = level.as_str();
    format!("aiboard_core={level},aiboard={level}")
}

/// Initialize logging with the specified level
///
/// `RUST_LOG` takes precedence when set.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            filter_directive(LogLevel::Debug),
            "aiboard_core=debug,aiboard=debug"
        );
    }

    #[test]
    fn test_logging_initialization() {
        // A second call reports the global subscriber already being set
        let _ = init_logging(LogLevel::Info);
        let err = init_logging(LogLevel::Info).unwrap_err();

        // Converts into anyhow at the CLI boundary
        let err = anyhow::anyhow!(err);
        assert!(!err.to_string().is_empty());
    }
}
