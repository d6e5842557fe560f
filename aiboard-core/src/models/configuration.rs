//! Configuration data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured OpenAI key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// OpenAI client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub default_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// API root, overridable for proxies and tests
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            organization: None,
            default_model: "gpt-4".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// JSON store file; defaults to `~/.aiboard/board_store.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    /// Delay before a sent message is marked delivered
    pub message_delivery_delay_ms: u64,
    /// Grant human approval steps automatically
    pub auto_approve: bool,
    /// How long a manual approval may stay pending
    pub approval_timeout_seconds: u32,
    pub openai: OpenAiSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            store_path: None,
            message_delivery_delay_ms: 100,
            auto_approve: true,
            approval_timeout_seconds: 300,
            openai: OpenAiSettings::default(),
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::load_from_file(&Self::default_config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_dir = dirs::config_dir().ok_or("Could not determine config directory")?;
        Ok(config_dir.join("aiboard").join("config.toml"))
    }

    /// Resolved store file location
    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(".aiboard").join("board_store.json")
        })
    }

    /// Apply environment overrides such as `OPENAI_API_KEY`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.openai.api_key = Some(key);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.message_delivery_delay_ms > 60_000 {
            errors.push("message_delivery_delay_ms cannot exceed 60000".to_string());
        }

        if self.approval_timeout_seconds == 0 {
            errors.push("approval_timeout_seconds must be at least 1".to_string());
        }
        if self.approval_timeout_seconds > 86_400 {
            errors.push("approval_timeout_seconds cannot exceed 86400 (1 day)".to_string());
        }

        if self.openai.default_model.trim().is_empty() {
            errors.push("openai.default_model cannot be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.openai.temperature) {
            errors.push("openai.temperature must be between 0.0 and 2.0".to_string());
        }

        if self.openai.max_tokens == 0 {
            errors.push("openai.max_tokens must be at least 1".to_string());
        }

        if url::Url::parse(&self.openai.base_url).is_err() {
            errors.push("openai.base_url must be a valid URL".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
