use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Command used to invoke the external metrics engine when nothing else is
/// configured.
pub const DEFAULT_ENGINE: &str = "core3d-metrics";

/// Environment variable overriding the engine command.
pub const ENGINE_ENV_VAR: &str = "RASTERPREP_ENGINE";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered tool configuration: defaults < file < environment < CLI.
///
/// This covers tool-level settings only; per-run inputs (files, prefix,
/// output directory) always come from the caller.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub engine: ConfigValue<String>,
}

impl ToolConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            engine: ConfigValue::new(DEFAULT_ENGINE.to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| PrepError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| PrepError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(engine) = file_config.engine {
            self.engine.update(engine, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(engine) = env::var(ENGINE_ENV_VAR) {
            if engine.trim().is_empty() {
                tracing::warn!("Ignoring empty {} value", ENGINE_ENV_VAR);
            } else {
                self.engine.update(engine, ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, engine: Option<String>) {
        if let Some(engine) = engine {
            self.engine.update(engine, ConfigSource::Cli);
        }
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    engine: Option<String>,
}
