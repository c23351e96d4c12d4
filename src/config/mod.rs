//! Configuration for capflow
//!
//! This module handles:
//! - Settings (`capflow.toml`): logging and capture output preferences
//! - Invocation files: a node name plus its kwargs, in TOML or JSON
//!
//! # Settings Location
//!
//! When no path is given, settings are read from the platform config
//! directory:
//! - **Linux**: `~/.config/capflow/capflow.toml`
//! - **macOS**: `~/Library/Application Support/capflow/capflow.toml`
//! - **Windows**: `%APPDATA%\capflow\capflow.toml`
//!
//! # Example
//!
//! ```ignore
//! use capflow::config::{InvocationFile, Settings};
//!
//! let settings = Settings::load_or_default("capflow.toml");
//! capflow::entry::init_tracing(&settings.logging)?;
//!
//! let invocation = InvocationFile::load("train.toml")?;
//! registry.require(&invocation.node)?.run_config(&invocation.kwargs)?;
//! ```

use crate::error::{CapflowError, Result};
use crate::schema::ConfigMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "capflow";

/// Settings filename
pub const SETTINGS_FILE: &str = "capflow.toml";

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Path of the settings file in the platform config directory
pub fn default_settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(SETTINGS_FILE))
}

// ==================== Settings ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Version for future migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

fn default_settings_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            logging: LoggingConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CapflowError::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            CapflowError::Config(format!("Failed to parse settings {:?}: {}", path, e))
        })
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load from [`default_settings_path`], falling back to defaults
    pub fn load_default_location() -> Self {
        match default_settings_path() {
            Some(path) => Self::load_or_default(path),
            None => Self::default(),
        }
    }

    /// Save settings as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CapflowError::Config(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CapflowError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            CapflowError::Config(format!("Failed to write settings {:?}: {}", path, e))
        })
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Pretty-print captured graphs
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { pretty_json: true }
    }
}

// ==================== Invocation File ====================

/// One node invocation: the node's registered name and its text-config kwargs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationFile {
    pub node: String,

    #[serde(default)]
    pub kwargs: ConfigMap,
}

impl InvocationFile {
    pub fn new(node: impl Into<String>, kwargs: ConfigMap) -> Self {
        Self {
            node: node.into(),
            kwargs,
        }
    }

    /// Load from `.toml` or `.json`, chosen by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            CapflowError::Config(format!("Failed to read invocation {:?}: {}", path, e))
        })?;
        let parse_err =
            |e: String| CapflowError::Config(format!("Failed to parse invocation {:?}: {}", path, e));

        match format {
            FileFormat::Json => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
            FileFormat::Toml => {
                let table: toml::Table =
                    toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
                serde_json::from_value(toml_to_json(toml::Value::Table(table)))
                    .map_err(|e| parse_err(e.to_string()))
            }
        }
    }

    /// Save as `.toml` or `.json`, chosen by extension
    ///
    /// TOML has no null, so kwargs holding a null can only be saved as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match FileFormat::of(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| CapflowError::Serialization(e.to_string()))?,
            FileFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| CapflowError::Serialization(e.to_string()))?,
        };
        std::fs::write(path, content).map_err(|e| {
            CapflowError::Config(format!("Failed to write invocation {:?}: {}", path, e))
        })
    }
}

enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(FileFormat::Toml),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(CapflowError::Config(format!(
                "{:?}: expected a .toml or .json file",
                path
            ))),
        }
    }
}

/// Convert a TOML value into its JSON counterpart. Datetimes become strings.
pub fn toml_to_json(value: toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s),
        toml::Value::Integer(i) => Json::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        toml::Value::Boolean(b) => Json::Bool(b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
