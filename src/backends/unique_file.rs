//! Per-thread unique file backend
//!
//! The first record from each thread creates a new file named after that
//! record's UTC timestamp plus a random alphanumeric hash, e.g.
//! `2024-01-05_10-20-30-042-k3J9aQ1z.log`. Later records from the same thread
//! append to it. Files are created with `create_new`, so two writers never
//! share a file even within the same millisecond.
//!
//! A thread keeps its file name for the backend's lifetime, but the handle is
//! closed once the thread has no queued writes left, so threads that exit
//! do not hold descriptors.

use super::lifecycle::{
    cleanup_expired, create_new, ensure_directory, open_append, parse_unique_file_name,
    retention_cutoff, unique_file_name, utc_date,
};
use crate::core::backend::{Backend, BackendParam, LastActivity, ParamValue};
use crate::core::error::{LoggerError, Result};
use crate::core::executor::TaskExecutor;
use crate::core::fs::{FileSystem, LocalFileSystem};
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::record::LogRecord;
use parking_lot::{Condvar, Mutex};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Attempts at finding an unused file name before giving up
const MAX_NAME_ATTEMPTS: usize = 16;

/// Configuration for [`UniqueFileBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueFileConfig {
    pub directory: PathBuf,
    pub is_asynchronous: bool,
    /// Files whose embedded date is more than this many days old are deleted
    pub retention_days: u32,
    /// Length of the random hash segment, at least 1
    pub hash_length: usize,
    /// Cap on queued asynchronous writes; unbounded when `None`
    pub max_queue_size: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

impl Default for UniqueFileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("unique_logs"),
            is_asynchronous: true,
            retention_days: 30,
            hash_length: 8,
            max_queue_size: None,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl UniqueFileConfig {
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
    pub fn with_hash_length(mut self, length: usize) -> Self {
        self.hash_length = length;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_queue_limit(mut self, max_queue_size: usize, policy: OverflowPolicy) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self.overflow_policy = policy;
        self
    }
}

struct ThreadFile {
    name: String,
    path: PathBuf,
    /// Open only while the thread has more writes queued
    writer: Option<BufWriter<File>>,
}

struct UniqueShared {
    config: UniqueFileConfig,
    fs: Arc<dyn FileSystem>,
    files: Mutex<HashMap<ThreadId, Arc<Mutex<ThreadFile>>>>,
    pending: Mutex<HashMap<ThreadId, usize>>,
    drained: Condvar,
    failed: AtomicBool,
    activity: LastActivity,
}

fn random_hash(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

impl UniqueShared {
    fn write_entry(&self, thread: ThreadId, timestamp_ms: i64, text: &str) -> Result<()> {
        // More writes from this thread are queued behind this one
        let keep_open = self.pending.lock().get(&thread).is_some_and(|count| *count > 1);

        let file = self.file_for(thread, timestamp_ms)?;
        let mut file = file.lock();
        let ThreadFile { path, writer, .. } = &mut *file;
        let mut current = match writer.take() {
            Some(current) => current,
            None => open_append(path)?,
        };
        current
            .write_all(text.as_bytes())
            .and_then(|()| current.write_all(b"\n"))
            .and_then(|()| current.flush())
            .map_err(|e| LoggerError::filesystem("writing log entry", path.as_path(), e))?;
        if keep_open {
            *writer = Some(current);
        }
        drop(file);

        self.activity.record(timestamp_ms);
        Ok(())
    }

    fn file_for(&self, thread: ThreadId, timestamp_ms: i64) -> Result<Arc<Mutex<ThreadFile>>> {
        let mut files = self.files.lock();
        if let Some(file) = files.get(&thread) {
            return Ok(Arc::clone(file));
        }

        let file = Arc::new(Mutex::new(self.create_file(timestamp_ms)?));
        files.insert(thread, Arc::clone(&file));
        let live: HashSet<PathBuf> = files.values().map(|f| f.lock().path.clone()).collect();
        drop(files);

        let cutoff = retention_cutoff(utc_date(timestamp_ms), self.config.retention_days);
        cleanup_expired(
            self.fs.as_ref(),
            &self.config.directory,
            cutoff,
            |name| parse_unique_file_name(name).map(|stamp| stamp.date()),
            |path| live.contains(path),
        );
        Ok(file)
    }

    fn create_file(&self, timestamp_ms: i64) -> Result<ThreadFile> {
        ensure_directory(self.fs.as_ref(), &self.config.directory)?;

        let mut last_path = self.config.directory.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = unique_file_name(timestamp_ms, &random_hash(self.config.hash_length));
            let path = self.config.directory.join(&name);
            if self.fs.exists(&path) {
                last_path = path;
                continue;
            }
            match create_new(&path) {
                Ok(writer) => {
                    return Ok(ThreadFile {
                        name,
                        path,
                        writer: Some(writer),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_path = path,
                Err(e) => return Err(LoggerError::filesystem("creating unique log file", &path, e)),
            }
        }
        Err(LoggerError::filesystem(
            "choosing an unused log file name",
            &last_path,
            io::Error::new(io::ErrorKind::AlreadyExists, "every generated name was taken"),
        ))
    }

    fn finish_pending(&self, thread: ThreadId) {
        let mut pending = self.pending.lock();
        if let Some(count) = pending.get_mut(&thread) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                pending.remove(&thread);
            }
        }
        self.drained.notify_all();
    }

    fn mark_failed(&self, error: &LoggerError) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            eprintln!(
                "[LOGGER ERROR] Unique file backend in {} stopped accepting entries: {}",
                self.config.directory.display(),
                error
            );
        }
    }
}

/// Backend giving every logging thread a file of its own
///
/// # Examples
///
/// ```
/// use rust_logit::backends::{UniqueFileBackend, UniqueFileConfig};
/// use rust_logit::{Backend, BackendParam, LogLevel, LogRecord};
///
/// let dir = tempfile::tempdir().unwrap();
/// let backend = UniqueFileBackend::new(UniqueFileConfig::new(dir.path())).unwrap();
///
/// backend.log(&LogRecord::new(LogLevel::Info, "hello"), "hello").unwrap();
/// let name = backend.param(BackendParam::LastFileName).unwrap();
/// assert!(name.as_text().unwrap().ends_with(".log"));
/// ```
pub struct UniqueFileBackend {
    shared: Arc<UniqueShared>,
    executor: Option<TaskExecutor>,
}

impl UniqueFileBackend {
    pub const NAME: &'static str = "unique_file";

    /// Create the backend, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero `hash_length` or queue limit, a filesystem
    /// error if the directory cannot be created, or an IO error if the writer
    /// thread cannot be started
    pub fn new(config: UniqueFileConfig) -> Result<Self> {
        Self::with_file_system(config, Arc::new(LocalFileSystem))
    }

    pub fn with_file_system(config: UniqueFileConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        if config.hash_length == 0 {
            return Err(LoggerError::config(
                "UniqueFileBackend",
                "hash_length must be at least 1",
            ));
        }
        ensure_directory(fs.as_ref(), &config.directory)?;
        let executor = if config.is_asynchronous {
            Some(TaskExecutor::with_queue_limit(
                "logit-unique-file",
                config.max_queue_size,
                config.overflow_policy,
            )?)
        } else {
            None
        };
        Ok(Self {
            shared: Arc::new(UniqueShared {
                config,
                fs,
                files: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                drained: Condvar::new(),
                failed: AtomicBool::new(false),
                activity: LastActivity::new(),
            }),
            executor,
        })
    }

    pub fn config(&self) -> &UniqueFileConfig {
        &self.shared.config
    }

    pub fn directory(&self) -> &Path {
        &self.shared.config.directory
    }

    pub fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Block until every queued write from `thread` has completed.
    pub fn wait_thread(&self, thread: ThreadId) {
        let mut pending = self.shared.pending.lock();
        while pending.get(&thread).is_some_and(|count| *count > 0) {
            self.shared.drained.wait(&mut pending);
        }
    }

    /// Path of the file assigned to `thread`, after its queued writes finish
    pub fn file_for_thread(&self, thread: ThreadId) -> Option<PathBuf> {
        self.wait_thread(thread);
        let files = self.shared.files.lock();
        let file = files.get(&thread)?;
        let path = file.lock().path.clone();
        Some(path)
    }

    /// Entries rejected by a full queue under [`OverflowPolicy::DropNewest`]
    pub fn dropped_entries(&self) -> u64 {
        self.executor.as_ref().map_or(0, TaskExecutor::dropped_tasks)
    }

    /// Number of threads that have been assigned a file
    pub fn thread_count(&self) -> usize {
        self.shared.files.lock().len()
    }

    fn current_thread_file(&self) -> Option<(String, PathBuf)> {
        let thread = thread::current().id();
        self.wait_thread(thread);
        let files = self.shared.files.lock();
        let file = files.get(&thread)?.lock();
        Some((file.name.clone(), file.path.clone()))
    }
}

impl Backend for UniqueFileBackend {
    fn log(&self, record: &LogRecord, text: &str) -> Result<()> {
        if self.has_failed() {
            return Err(LoggerError::backend_failed(Self::NAME));
        }

        let thread = record.thread.id;
        let timestamp_ms = record.timestamp_ms;
        let Some(executor) = &self.executor else {
            return self
                .shared
                .write_entry(thread, timestamp_ms, text)
                .inspect_err(|e| self.shared.mark_failed(e));
        };

        *self.shared.pending.lock().entry(thread).or_insert(0) += 1;
        let shared = Arc::clone(&self.shared);
        let text = text.to_string();
        let submitted = executor.submit(move || {
            if !shared.failed.load(Ordering::Acquire) {
                if let Err(e) = shared.write_entry(thread, timestamp_ms, &text) {
                    shared.mark_failed(&e);
                }
            }
            shared.finish_pending(thread);
        });
        if submitted.is_err() {
            self.shared.finish_pending(thread);
        }
        submitted
    }

    /// Block until every thread's queued writes have completed.
    fn wait(&self) {
        let mut pending = self.shared.pending.lock();
        while !pending.is_empty() {
            self.shared.drained.wait(&mut pending);
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn param(&self, param: BackendParam) -> Option<ParamValue> {
        match param {
            BackendParam::LastFileName => self
                .current_thread_file()
                .map(|(name, _)| ParamValue::Text(name)),
            BackendParam::LastFilePath => self
                .current_thread_file()
                .map(|(_, path)| ParamValue::Text(path.display().to_string())),
            _ => {
                Backend::wait(self);
                self.shared.activity.param(param)
            }
        }
    }
}

impl Drop for UniqueFileBackend {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            executor.shutdown();
        }
        for file in self.shared.files.lock().values() {
            if let Some(writer) = file.lock().writer.as_mut() {
                if let Err(e) = writer.flush() {
                    eprintln!("[WARN] Failed to flush unique log file on drop: {}", e);
                }
            }
        }
    }
}
