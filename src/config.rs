//! In-memory engine configuration (spec.md §6, recognized keys).
//!
//! Grounded in `lightflow/config.py` (`Config`). Reading this from a YAML
//! file on disk is explicitly out of scope (spec.md §1); parsing an
//! already-read YAML *string*, or a pre-built [`serde_json::Value`], is
//! the full extent of what this module does — the caller owns the file
//! I/O.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse configuration: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub host: String,
    pub port: u16,
    pub database: u32,
    #[serde(with = "duration_secs")]
    pub polling_time: Duration,
    pub password: Option<String>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            polling_time: Duration::from_millis(500),
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Any backend-specific knob not itemised above (spec.md §6's "...").
    pub extra: Value,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 27017,
            database: "lightflow".to_string(),
            username: None,
            password: None,
            extra: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    #[serde(with = "duration_secs")]
    pub workflow_polling_time: Duration,
    #[serde(with = "duration_secs")]
    pub dag_polling_time: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            workflow_polling_time: Duration::from_secs(0),
            dag_polling_time: Duration::from_secs(0),
        }
    }
}

/// The engine's recognized configuration keys. No global/ambient state —
/// this is threaded explicitly through driver/executor/runner
/// constructors (Design Note §9, "Process-wide state").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workflows: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub signal: SignalConfig,
    pub store: StoreConfig,
    pub graph: GraphConfig,
    /// Opaque queue-framework options (spec.md §6, `celery.*`).
    pub celery: Value,
    /// Free-form extension configuration (spec.md §6, `extensions`).
    pub extensions: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflows: Vec::new(),
            libraries: Vec::new(),
            signal: SignalConfig::default(),
            store: StoreConfig::default(),
            graph: GraphConfig::default(),
            celery: Value::Object(Default::default()),
            extensions: Value::Object(Default::default()),
        }
    }
}

impl Config {
    /// Builds a `Config` from an already-parsed value (e.g. one the
    /// caller assembled programmatically, or read from any source).
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Parses a YAML document already in memory. The caller is
    /// responsible for getting the bytes off disk; this module does not
    /// itself read files (spec.md §1, Non-goals/OUT of scope).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
