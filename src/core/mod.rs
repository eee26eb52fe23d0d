//! Core logging types and traits

pub mod backend;
pub mod color;
pub mod config;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod fs;
pub mod log_level;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod pattern;
pub mod record;
pub mod registry;
pub mod value;

pub use backend::{Backend, BackendParam, LastActivity, ParamValue};
pub use color::TextColor;
pub use config::{BackendConfig, BackendKind, BackendSpec, LoggingConfig};
pub use error::{ErrorKind, LoggerError, Result};
pub use executor::TaskExecutor;
pub use formatter::{LogFormatter, PatternFormatter, PatternFormatterBuilder};
pub use fs::{FileSystem, LocalFileSystem};
pub use log_level::LogLevel;
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use overflow_policy::OverflowPolicy;
pub use pattern::{compile, compile_with, CompiledPlan, RenderOptions, DEFAULT_PATTERN};
pub use record::{LogRecord, SourceContext, Target, ThreadTag};
pub use registry::{Registry, RegistryBuilder};
pub use value::{EnumValue, ErrorCodeValue, FormatSpec, Value, VariableValue};
