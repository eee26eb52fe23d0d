//! Declarative registry configuration
//!
//! A [`LoggingConfig`] describes a whole registry as data, typically loaded
//! from JSON:
//!
//! ```json
//! {
//!   "min_level": "debug",
//!   "default_target": null,
//!   "backends": [
//!     { "kind": "console", "config": { "pattern": "[%l] %^%v%$" } },
//!     { "kind": "rotating_file", "config": { "directory": "logs", "retention_days": 7,
//!       "max_queue_size": 4096, "overflow_policy": "drop_newest" } },
//!     { "kind": "unique_file", "exclusive": true, "config": { "hash_length": 12 } }
//!   ]
//! }
//! ```

use super::backend::Backend;
use super::color::TextColor;
use super::error::{LoggerError, Result};
use super::formatter::PatternFormatter;
use super::log_level::LogLevel;
use super::output_format::OutputFormat;
use super::overflow_policy::OverflowPolicy;
use super::pattern::{compile, DEFAULT_PATTERN};
use super::registry::Registry;
use crate::backends::{
    ConsoleBackend, ConsoleConfig, RotatingFileBackend, RotatingFileConfig, UniqueFileBackend,
    UniqueFileConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Console,
    RotatingFile,
    UniqueFile,
}

impl BackendKind {
    fn default_directory(self) -> PathBuf {
        match self {
            BackendKind::UniqueFile => UniqueFileConfig::default().directory,
            _ => RotatingFileConfig::default().directory,
        }
    }
}

/// Settings shared by every backend kind; each kind reads what applies to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub is_asynchronous: bool,
    /// Log directory; `logs` for rotating and `unique_logs` for unique backends when unset
    pub directory: Option<PathBuf>,
    pub retention_days: u32,
    pub hash_length: usize,
    pub default_color: TextColor,
    pub pattern: String,
    /// Render records as JSON objects instead of through the pattern
    pub json: bool,
    /// Drop color output; defaults to on for file backends and off for the console
    pub strip_colors: Option<bool>,
    pub compress_rotated: bool,
    pub timestamp_offset_ms: i64,
    /// Prefix removed from source paths by `%r`
    pub base_path: Option<String>,
    /// Cap on queued asynchronous writes; unbounded when unset
    pub max_queue_size: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            is_asynchronous: true,
            directory: None,
            retention_days: 30,
            hash_length: 8,
            default_color: TextColor::White,
            pattern: DEFAULT_PATTERN.to_string(),
            json: false,
            strip_colors: None,
            compress_rotated: false,
            timestamp_offset_ms: 0,
            base_path: None,
            max_queue_size: None,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    pub kind: BackendKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Skipped by broadcast, reached only by explicit or default target
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub config: BackendConfig,
}

impl BackendSpec {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            enabled: true,
            exclusive: false,
            config: BackendConfig::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    fn formatter(&self) -> Result<PatternFormatter> {
        let config = &self.config;
        let strip = config
            .strip_colors
            .unwrap_or(self.kind != BackendKind::Console);
        let output = if config.json {
            OutputFormat::Json
        } else {
            OutputFormat::Pattern
        };
        let mut builder = PatternFormatter::builder(&config.pattern)
            .strip_colors(strip)
            .timestamp_offset_ms(config.timestamp_offset_ms)
            .default_color(config.default_color)
            .output_format(output);
        if let Some(base_path) = &config.base_path {
            builder = builder.base_path(base_path.clone());
        }
        builder.build()
    }

    fn directory(&self) -> PathBuf {
        self.config
            .directory
            .clone()
            .unwrap_or_else(|| self.kind.default_directory())
    }

    fn console_config(&self) -> ConsoleConfig {
        let config = &self.config;
        ConsoleConfig {
            is_asynchronous: config.is_asynchronous,
            default_color: config.default_color,
            max_queue_size: config.max_queue_size,
            overflow_policy: config.overflow_policy,
        }
    }

    fn rotating_config(&self) -> RotatingFileConfig {
        let config = &self.config;
        RotatingFileConfig {
            directory: self.directory(),
            is_asynchronous: config.is_asynchronous,
            retention_days: config.retention_days,
            compress_rotated: config.compress_rotated,
            max_queue_size: config.max_queue_size,
            overflow_policy: config.overflow_policy,
        }
    }

    fn unique_config(&self) -> UniqueFileConfig {
        let config = &self.config;
        UniqueFileConfig {
            directory: self.directory(),
            is_asynchronous: config.is_asynchronous,
            retention_days: config.retention_days,
            hash_length: config.hash_length,
            max_queue_size: config.max_queue_size,
            overflow_policy: config.overflow_policy,
        }
    }

    /// Instantiate the formatter and backend this entry describes.
    fn instantiate(&self) -> Result<(Arc<PatternFormatter>, Arc<dyn Backend>)> {
        let formatter = Arc::new(self.formatter()?);
        let backend: Arc<dyn Backend> = match self.kind {
            BackendKind::Console => Arc::new(ConsoleBackend::new(self.console_config())?),
            BackendKind::RotatingFile => {
                Arc::new(RotatingFileBackend::new(self.rotating_config())?)
            }
            BackendKind::UniqueFile => Arc::new(UniqueFileBackend::new(self.unique_config())?),
        };
        Ok((formatter, backend))
    }
}

fn trace_by_default() -> LogLevel {
    LogLevel::Trace
}

/// Whole-registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub default_target: Option<usize>,
    #[serde(default = "trace_by_default")]
    pub min_level: LogLevel,
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_target: None,
            min_level: trace_by_default(),
            backends: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input or a configuration error from
    /// [`validate`](Self::validate)
    pub fn from_json(text: &str) -> Result<Self> {
        let config: LoggingConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the configuration without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a zero hash length on a unique
    /// backend, a zero queue limit, a pattern that does not compile, or a
    /// default target outside the backend list
    pub fn validate(&self) -> Result<()> {
        for (index, spec) in self.backends.iter().enumerate() {
            let component = format!("backends[{}]", index);
            if spec.kind == BackendKind::UniqueFile && spec.config.hash_length == 0 {
                return Err(LoggerError::config(component, "hash_length must be at least 1"));
            }
            if spec.config.max_queue_size == Some(0) {
                return Err(LoggerError::config(component, "max_queue_size must be at least 1"));
            }
            if let Err(e) = compile(&spec.config.pattern) {
                return Err(LoggerError::config(component, e.to_string()));
            }
        }
        if let Some(target) = self.default_target {
            if target >= self.backends.len() {
                return Err(LoggerError::config(
                    "default_target",
                    format!(
                        "index {} is out of range for {} backends",
                        target,
                        self.backends.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl Registry {
    /// Build a registry from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error from [`LoggingConfig::validate`] or the
    /// first backend construction failure
    pub fn from_config(config: &LoggingConfig) -> Result<Registry> {
        config.validate()?;
        let registry = Registry::new();
        registry.set_min_level(config.min_level);
        for spec in &config.backends {
            let (formatter, backend) = spec.instantiate()?;
            let index = registry.add_entry(formatter, backend, spec.exclusive);
            registry.enable(index, spec.enabled)?;
        }
        registry.set_default_target(config.default_target)?;
        Ok(registry)
    }
}
