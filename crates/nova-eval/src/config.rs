use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Settings shared by every evaluation an [`Evaluator`](crate::Evaluator) runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Wall-clock budget for one evaluation, checked between instructions.
    /// `None` disables the deadline.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Upper bound on the operand stack of one evaluation.
    #[serde(default = "EvalConfig::default_max_operand_stack")]
    pub max_operand_stack: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EvalConfig {
    fn default_max_operand_stack() -> usize {
        1024
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_operand_stack: Self::default_max_operand_stack(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a plain level (`info`, `debug`, ...) or a full `EnvFilter`
    /// directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// `level` as `EnvFilter` directives. Bare level names are accepted in
    /// any case, and `warning` is an alias of `warn`.
    fn directives(&self) -> String {
        let level = self.level.trim();
        if level.is_empty() {
            return Self::default_level();
        }
        match level.to_ascii_lowercase().as_str() {
            bare @ ("trace" | "debug" | "info" | "warn" | "error") => bare.to_owned(),
            "warning" => "warn".to_owned(),
            _ => level.to_owned(),
        }
    }

    /// Effective filter: the configured directives followed by `RUST_LOG`,
    /// so environment directives win where both name the same target.
    /// Unparsable directives fall back to the configured level alone, then
    /// to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = self.directives();
        let combined = match std::env::var("RUST_LOG") {
            Ok(env) if !env.trim().is_empty() => format!("{configured},{}", env.trim()),
            _ => configured.clone(),
        };
        EnvFilter::try_new(combined)
            .or_else(|_| EnvFilter::try_new(&configured))
            .unwrap_or_else(|_| EnvFilter::new(Self::default_level()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` quotes the offending source line.
        ConfigError::Toml(err.message().to_owned())
    }
}
