//! Daily rotating file backend
//!
//! All entries dated the same UTC day share one `YYYY-MM-DD.log` file in the
//! configured directory. When a record arrives dated after the open file, the
//! backend switches to the new day's file, optionally gzips the previous one and
//! then removes files older than the retention window.
//!
//! Compression and the retention pass that follows it run on a separate
//! `logit-compress` worker, so the first entry of a new day is written without
//! waiting for the previous file to be gzipped.

use super::lifecycle::{
    cleanup_expired, compress_file, daily_file_name, ensure_directory, open_append,
    parse_daily_file_name, retention_cutoff, utc_date,
};
use crate::core::backend::{Backend, BackendParam, LastActivity, ParamValue};
use crate::core::error::{LoggerError, Result};
use crate::core::executor::TaskExecutor;
use crate::core::fs::{FileSystem, LocalFileSystem};
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::record::LogRecord;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for [`RotatingFileBackend`]
///
/// # Examples
///
/// ```
/// use rust_logit::backends::RotatingFileConfig;
///
/// let config = RotatingFileConfig::new("/var/log/app")
///     .with_asynchronous(false)
///     .with_retention_days(7)
///     .with_compression(true);
/// assert_eq!(config.retention_days, 7);
/// assert_eq!(config.max_queue_size, None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RotatingFileConfig {
    pub directory: PathBuf,
    /// Write on a dedicated worker thread instead of the caller's
    pub is_asynchronous: bool,
    /// Files dated more than this many days before the current file are deleted
    pub retention_days: u32,
    /// Gzip the previous day's file after rotating away from it
    pub compress_rotated: bool,
    /// Cap on queued asynchronous writes; unbounded when `None`
    pub max_queue_size: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

impl Default for RotatingFileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            is_asynchronous: true,
            retention_days: 30,
            compress_rotated: false,
            max_queue_size: None,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl RotatingFileConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_asynchronous(mut self, asynchronous: bool) -> Self {
        self.is_asynchronous = asynchronous;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress_rotated = compress;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_queue_limit(mut self, max_queue_size: usize, policy: OverflowPolicy) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self.overflow_policy = policy;
        self
    }
}

#[derive(Default)]
struct DailyFile {
    writer: Option<BufWriter<File>>,
    date: Option<NaiveDate>,
    path: Option<PathBuf>,
}

struct RotatingShared {
    config: RotatingFileConfig,
    fs: Arc<dyn FileSystem>,
    current: Mutex<DailyFile>,
    /// Present when `compress_rotated` is set
    compressor: Option<TaskExecutor>,
    failed: AtomicBool,
    activity: LastActivity,
}

impl RotatingShared {
    fn write_entry(&self, timestamp_ms: i64, text: &str) -> Result<()> {
        let date = utc_date(timestamp_ms);
        let mut current = self.current.lock();

        // Rotation only moves forward; late records go to the open file
        let needs_rotation = match current.date {
            Some(open_date) => current.writer.is_none() || date > open_date,
            None => true,
        };
        if needs_rotation {
            self.rotate(&mut current, date)?;
        }

        let DailyFile { writer, path, .. } = &mut *current;
        let (Some(writer), Some(path)) = (writer.as_mut(), path.as_deref()) else {
            return Err(LoggerError::backend_failed(RotatingFileBackend::NAME));
        };
        writer
            .write_all(text.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(|e| LoggerError::filesystem("writing log entry", &path, e))?;

        self.activity.record(timestamp_ms);
        Ok(())
    }

    fn rotate(&self, current: &mut DailyFile, date: NaiveDate) -> Result<()> {
        if let Some(mut old) = current.writer.take() {
            if let Err(e) = old.flush() {
                eprintln!("[WARN] Failed to flush log file before rotation: {}", e);
            }
        }

        ensure_directory(self.fs.as_ref(), &self.config.directory)?;
        let path = self.config.directory.join(daily_file_name(date));
        let writer = open_append(&path)?;

        let previous = current.path.replace(path.clone());
        current.writer = Some(writer);
        current.date = Some(date);

        let previous = previous.filter(|p| *p != path && self.fs.is_file(p));
        let housekeeping = Housekeeping {
            fs: Arc::clone(&self.fs),
            directory: self.config.directory.clone(),
            cutoff: retention_cutoff(date, self.config.retention_days),
            current: path,
            compress: previous.filter(|_| self.config.compress_rotated),
        };
        match &self.compressor {
            Some(compressor) => {
                let task = housekeeping.clone();
                if compressor.submit(move || task.run()).is_err() {
                    housekeeping.run();
                }
            }
            None => housekeeping.run(),
        }
        Ok(())
    }

    fn mark_failed(&self, error: &LoggerError) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            eprintln!(
                "[LOGGER ERROR] Rotating file backend in {} stopped accepting entries: {}",
                self.config.directory.display(),
                error
            );
        }
    }
}

/// Work that follows a rotation: gzip the previous file, then apply retention
#[derive(Clone)]
struct Housekeeping {
    fs: Arc<dyn FileSystem>,
    directory: PathBuf,
    cutoff: NaiveDate,
    current: PathBuf,
    compress: Option<PathBuf>,
}

impl Housekeeping {
    fn run(&self) {
        if let Some(previous) = &self.compress {
            if let Err(e) = compress_file(previous) {
                eprintln!(
                    "[WARN] Failed to compress rotated log {}: {}",
                    previous.display(),
                    e
                );
            }
        }
        cleanup_expired(
            self.fs.as_ref(),
            &self.directory,
            self.cutoff,
            parse_daily_file_name,
            |candidate| candidate == self.current,
        );
    }
}

/// Backend writing one file per UTC calendar day
///
/// # Examples
///
/// ```
/// use rust_logit::backends::{RotatingFileBackend, RotatingFileConfig};
/// use rust_logit::{Backend, BackendParam, LogLevel, LogRecord};
///
/// let dir = tempfile::tempdir().unwrap();
/// let backend = RotatingFileBackend::new(
///     RotatingFileConfig::new(dir.path()).with_asynchronous(false),
/// ).unwrap();
///
/// let record = LogRecord::new(LogLevel::Info, "ready").with_timestamp_ms(1_704_450_030_000);
/// backend.log(&record, "ready").unwrap();
///
/// let name = backend.param(BackendParam::LastFileName).unwrap();
/// assert_eq!(name.as_text(), Some("2024-01-05.log"));
/// ```
pub struct RotatingFileBackend {
    shared: Arc<RotatingShared>,
    executor: Option<TaskExecutor>,
}

impl RotatingFileBackend {
    pub const NAME: &'static str = "rotating_file";

    /// Create the backend, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a filesystem error if the directory cannot be created, a
    /// configuration error for a zero queue limit, or an IO error if a worker
    /// thread cannot be started
    pub fn new(config: RotatingFileConfig) -> Result<Self> {
        Self::with_file_system(config, Arc::new(LocalFileSystem))
    }

    /// Same as [`new`](Self::new) with an injected filesystem capability
    pub fn with_file_system(config: RotatingFileConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        ensure_directory(fs.as_ref(), &config.directory)?;
        let executor = if config.is_asynchronous {
            Some(TaskExecutor::with_queue_limit(
                "logit-rotating-file",
                config.max_queue_size,
                config.overflow_policy,
            )?)
        } else {
            None
        };
        let compressor = if config.compress_rotated {
            Some(TaskExecutor::new("logit-compress")?)
        } else {
            None
        };
        Ok(Self {
            shared: Arc::new(RotatingShared {
                config,
                fs,
                current: Mutex::new(DailyFile::default()),
                compressor,
                failed: AtomicBool::new(false),
                activity: LastActivity::new(),
            }),
            executor,
        })
    }

    pub fn config(&self) -> &RotatingFileConfig {
        &self.shared.config
    }

    pub fn directory(&self) -> &Path {
        &self.shared.config.directory
    }

    /// Path of the file currently open, once something has been written
    pub fn current_path(&self) -> Option<PathBuf> {
        self.wait();
        self.shared.current.lock().path.clone()
    }

    /// Whether a write or open failure has stopped this backend
    pub fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Entries rejected by a full queue under [`OverflowPolicy::DropNewest`]
    pub fn dropped_entries(&self) -> u64 {
        self.executor.as_ref().map_or(0, TaskExecutor::dropped_tasks)
    }
}

impl Backend for RotatingFileBackend {
    fn log(&self, record: &LogRecord, text: &str) -> Result<()> {
        if self.has_failed() {
            return Err(LoggerError::backend_failed(Self::NAME));
        }

        let timestamp_ms = record.timestamp_ms;
        match &self.executor {
            Some(executor) => {
                let shared = Arc::clone(&self.shared);
                let text = text.to_string();
                executor.submit(move || {
                    if shared.failed.load(Ordering::Acquire) {
                        return;
                    }
                    if let Err(e) = shared.write_entry(timestamp_ms, &text) {
                        shared.mark_failed(&e);
                    }
                })
            }
            None => self.shared.write_entry(timestamp_ms, text).inspect_err(|e| {
                self.shared.mark_failed(e);
            }),
        }
    }

    /// Block until queued writes and any compression they triggered are done.
    fn wait(&self) {
        if let Some(executor) = &self.executor {
            executor.wait();
        }
        if let Some(compressor) = &self.shared.compressor {
            compressor.wait();
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn param(&self, param: BackendParam) -> Option<ParamValue> {
        match param {
            BackendParam::LastFileName => {
                let path = self.current_path()?;
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(ParamValue::Text(name))
            }
            BackendParam::LastFilePath => self
                .current_path()
                .map(|p| ParamValue::Text(p.display().to_string())),
            _ => {
                self.wait();
                self.shared.activity.param(param)
            }
        }
    }
}

impl Drop for RotatingFileBackend {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            executor.shutdown();
        }
        if let Some(writer) = self.shared.current.lock().writer.as_mut() {
            if let Err(e) = writer.flush() {
                eprintln!("[WARN] Failed to flush log file on drop: {}", e);
            }
        }
        if let Some(compressor) = &self.shared.compressor {
            compressor.shutdown();
        }
    }
}
