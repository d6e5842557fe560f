//! Shared state and parsing helpers for command handlers

use aiboard_core::models::{Configuration, NewWorkflow};
use aiboard_core::OrchestrationService;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration resolved from the command line
pub struct AppContext {
    pub config: Configuration,
}

impl AppContext {
    pub fn load(config_file: Option<PathBuf>, store: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                let mut config = Configuration::load_from_file(&path).map_err(|e| {
                    anyhow!("Failed to load config file {}: {}", path.display(), e)
                })?;
                config.apply_env_overrides();
                config
            }
            None => Configuration::load().map_err(|e| anyhow!("Failed to load config: {}", e))?,
        };

        if let Some(store) = store {
            config.store_path = Some(store);
        }

        if let Err(errors) = config.validate() {
            return Err(anyhow!("Invalid configuration: {}", errors.join("; ")));
        }

        Ok(Self { config })
    }

    /// Open the orchestration service over the configured store
    pub fn service(&self) -> Result<OrchestrationService> {
        OrchestrationService::open(&self.config).context("Failed to open the board store")
    }
}

/// Parse `key=value` pairs; values that parse as JSON keep their type
pub fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Empty key in '{}'", pair));
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Read a workflow from a YAML or JSON file
pub fn load_workflow_file(path: &Path) -> Result<NewWorkflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).context("Failed to parse workflow JSON")
    } else {
        serde_yaml::from_str(&content).context("Failed to parse workflow YAML")
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an enum from its serialized (snake_case) name
pub fn parse_label<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, String> {
    serde_json::from_value(Value::String(raw.trim().to_lowercase().replace('-', "_")))
        .map_err(|_| format!("unknown value '{}'", raw))
}

/// Serialized (snake_case) name of an enum value
pub fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::from("unknown"),
    }
}

pub fn timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
