//! Backend trait for log output destinations

use super::{error::Result, record::LogRecord};
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Runtime facts a backend can report about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendParam {
    /// File name of the file most recently written
    LastFileName,
    /// Full path of the file most recently written
    LastFilePath,
    /// Millisecond timestamp of the most recent entry
    LastLogTimestamp,
    /// Seconds elapsed since the most recent entry
    TimeSinceLastLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) => Some(*f as i64),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Text(_) => None,
        }
    }
}

/// A sink for rendered records.
///
/// Methods take `&self`; implementations guard their own state so the registry
/// can call them without holding its lock.
pub trait Backend: Send + Sync {
    /// Persist `text` (already rendered from `record`), inline or queued.
    fn log(&self, record: &LogRecord, text: &str) -> Result<()>;

    /// Block until everything accepted so far has been written.
    fn wait(&self);

    fn name(&self) -> &str;

    fn param(&self, _param: BackendParam) -> Option<ParamValue> {
        None
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn log(&self, record: &LogRecord, text: &str) -> Result<()> {
        (**self).log(record, text)
    }

    fn wait(&self) {
        (**self).wait()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn param(&self, param: BackendParam) -> Option<ParamValue> {
        (**self).param(param)
    }
}

/// Timestamp of the newest entry a backend has written
#[derive(Debug)]
pub struct LastActivity {
    last_ms: AtomicI64,
}

impl LastActivity {
    const NEVER: i64 = i64::MIN;

    pub const fn new() -> Self {
        Self {
            last_ms: AtomicI64::new(Self::NEVER),
        }
    }

    pub fn record(&self, timestamp_ms: i64) {
        self.last_ms.fetch_max(timestamp_ms, Ordering::Relaxed);
    }

    pub fn last_ms(&self) -> Option<i64> {
        match self.last_ms.load(Ordering::Relaxed) {
            Self::NEVER => None,
            ms => Some(ms),
        }
    }

    /// Answers [`BackendParam::LastLogTimestamp`] and [`BackendParam::TimeSinceLastLog`]
    pub fn param(&self, param: BackendParam) -> Option<ParamValue> {
        let last = self.last_ms()?;
        match param {
            BackendParam::LastLogTimestamp => Some(ParamValue::Int(last)),
            BackendParam::TimeSinceLastLog => {
                let elapsed_ms = Utc::now().timestamp_millis().saturating_sub(last).max(0);
                Some(ParamValue::Float(elapsed_ms as f64 / 1000.0))
            }
            _ => None,
        }
    }
}

impl Default for LastActivity {
    fn default() -> Self {
        Self::new()
    }
}
