//! # rust_logit
//!
//! A structured, multi-backend logging runtime.
//!
//! ## Features
//!
//! - **Compiled patterns**: printf-style layouts compiled once and rendered
//!   without failing; missing fields render empty
//! - **Per-backend workers**: each asynchronous backend owns one FIFO worker
//!   thread that drains its queue on shutdown
//! - **File lifecycle**: a daily rotating file and a per-thread unique file,
//!   both with age-based retention
//! - **Routing**: broadcast, explicit or default targets with per-entry enable
//!   switches
//!
//! ## Example
//!
//! ```
//! use rust_logit::prelude::*;
//! use rust_logit::backends::{RotatingFileBackend, RotatingFileConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let registry = Registry::builder()
//!     .backend(
//!         PatternFormatter::builder("%F %T [%l] %v").strip_colors(true).build().unwrap(),
//!         RotatingFileBackend::new(RotatingFileConfig::new(dir.path())).unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let disk = "sda1";
//! rust_logit::error!(registry, "disk {} is full", disk);
//! registry.wait();
//! ```

pub mod backends;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::backends::{
        ConsoleBackend, ConsoleConfig, RotatingFileBackend, RotatingFileConfig,
        UniqueFileBackend, UniqueFileConfig,
    };
    pub use crate::core::{
        Backend, BackendParam, LogFormatter, LogLevel, LogRecord, LoggerError, LoggingConfig,
        OverflowPolicy, ParamValue, PatternFormatter, Registry, Result, SourceContext, Target, TextColor,
        Value, VariableValue,
    };
}

pub use core::{
    compile, compile_with, Backend, BackendConfig, BackendKind, BackendParam, BackendSpec,
    CompiledPlan, EnumValue, ErrorCodeValue, ErrorKind, FileSystem, FormatSpec, LastActivity,
    LocalFileSystem, LogFormatter, LogLevel, LogRecord, LoggerError, LoggerMetrics,
    LoggingConfig, OutputFormat, OverflowPolicy, ParamValue, PatternFormatter, PatternFormatterBuilder,
    Registry, RegistryBuilder, RenderOptions, Result, SourceContext, Target, TaskExecutor,
    TextColor, ThreadTag, Value, VariableValue, DEFAULT_PATTERN,
};
