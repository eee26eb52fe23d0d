//! Error types for the logging runtime

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Coarse classification of a [`LoggerError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Pattern,
    Filesystem,
    RetentionCleanup,
    Configuration,
    BackendIndex,
    BackendFailed,
    ExecutorStopped,
    QueueFull,
    Io,
    Json,
}

impl ErrorKind {
    /// Human readable description of the error class.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Pattern => "malformed pattern directive",
            ErrorKind::Filesystem => "log directory or file is not usable",
            ErrorKind::RetentionCleanup => "stale log file could not be removed",
            ErrorKind::Configuration => "invalid logging configuration",
            ErrorKind::BackendIndex => "no backend registered at this index",
            ErrorKind::BackendFailed => "backend stopped accepting entries",
            ErrorKind::ExecutorStopped => "task executor is shut down",
            ErrorKind::QueueFull => "executor queue is full",
            ErrorKind::Io => "I/O failure",
            ErrorKind::Json => "JSON failure",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Pattern string rejected by the compiler
    #[error("Invalid pattern at byte {position}: {message}")]
    Pattern { position: usize, message: String },

    /// Directory could not be created or a log file could not be opened/written
    #[error("Filesystem error while {operation} '{}': {source}", .path.display())]
    Filesystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stale log file survived a retention pass
    #[error("Retention cleanup failed for '{}': {source}", .path.display())]
    RetentionCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    #[error("No backend registered at index {index} (registry holds {len})")]
    BackendIndex { index: usize, len: usize },

    /// Backend hit a fatal write/open error earlier and rejects entries
    #[error("Backend '{name}' is no longer accepting entries")]
    BackendFailed { name: String },

    #[error("Task executor already stopped")]
    ExecutorStopped,

    /// Bounded queue was full and the overflow policy rejected the entry
    #[error("Queue of executor '{executor}' is full")]
    QueueFull { executor: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoggerError {
    /// Create a pattern compilation error
    pub fn pattern(position: usize, message: impl Into<String>) -> Self {
        LoggerError::Pattern {
            position,
            message: message.into(),
        }
    }

    /// Create a filesystem error with the failing operation and path
    pub fn filesystem(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::Filesystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn retention_cleanup(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        LoggerError::RetentionCleanup {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn backend_index(index: usize, len: usize) -> Self {
        LoggerError::BackendIndex { index, len }
    }

    pub fn backend_failed(name: impl Into<String>) -> Self {
        LoggerError::BackendFailed { name: name.into() }
    }

    pub fn queue_full(executor: impl Into<String>) -> Self {
        LoggerError::QueueFull {
            executor: executor.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::Pattern { .. } => ErrorKind::Pattern,
            LoggerError::Filesystem { .. } => ErrorKind::Filesystem,
            LoggerError::RetentionCleanup { .. } => ErrorKind::RetentionCleanup,
            LoggerError::InvalidConfiguration { .. } => ErrorKind::Configuration,
            LoggerError::BackendIndex { .. } => ErrorKind::BackendIndex,
            LoggerError::BackendFailed { .. } => ErrorKind::BackendFailed,
            LoggerError::ExecutorStopped => ErrorKind::ExecutorStopped,
            LoggerError::QueueFull { .. } => ErrorKind::QueueFull,
            LoggerError::Io(_) => ErrorKind::Io,
            LoggerError::Json(_) => ErrorKind::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::pattern(3, "directive cut off");
        assert!(matches!(err, LoggerError::Pattern { position: 3, .. }));

        let err = LoggerError::config("UniqueFileBackend", "hash_length must be at least 1");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::backend_index(4, 2);
        assert_eq!(err.kind(), ErrorKind::BackendIndex);
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::pattern(7, "width exceeds 1024");
        assert_eq!(err.to_string(), "Invalid pattern at byte 7: width exceeds 1024");

        let err = LoggerError::backend_index(4, 2);
        assert_eq!(
            err.to_string(),
            "No backend registered at index 4 (registry holds 2)"
        );

        let err = LoggerError::backend_failed("rotating_file");
        assert_eq!(
            err.to_string(),
            "Backend 'rotating_file' is no longer accepting entries"
        );
    }

    #[test]
    fn test_filesystem_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::filesystem("creating log directory", "/var/log/app", io_err);

        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(err.to_string().contains("creating log directory"));
        assert!(err.to_string().contains("/var/log/app"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_kind_messages_are_distinct() {
        let kinds = [
            ErrorKind::Pattern,
            ErrorKind::Filesystem,
            ErrorKind::RetentionCleanup,
            ErrorKind::Configuration,
            ErrorKind::BackendIndex,
            ErrorKind::BackendFailed,
            ErrorKind::ExecutorStopped,
            ErrorKind::QueueFull,
            ErrorKind::Io,
            ErrorKind::Json,
        ];
        let messages: std::collections::HashSet<_> = kinds.iter().map(|k| k.message()).collect();
        assert_eq!(messages.len(), kinds.len());
    }
}
