//! Backend registry and record dispatch
//!
//! The registry holds an ordered list of (formatter, backend) entries. Each
//! record is rendered once per matching entry and handed to that entry's
//! backend. The entry list lock only guards lookup and mutation; rendering and
//! backend calls happen after it has been released.

use super::{
    backend::{Backend, BackendParam, ParamValue},
    error::{ErrorKind, LoggerError, Result},
    executor::panic_message,
    formatter::LogFormatter,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    record::{LogRecord, Target},
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Entry {
    formatter: Arc<dyn LogFormatter>,
    backend: Arc<dyn Backend>,
    enabled: AtomicBool,
    /// Reached only by explicit or default target, never by broadcast
    exclusive: bool,
}

/// Ordered collection of formatter/backend pairs
///
/// # Examples
///
/// ```
/// use rust_logit::backends::{ConsoleBackend, ConsoleConfig};
/// use rust_logit::{LogLevel, LogRecord, PatternFormatter, Registry};
///
/// let registry = Registry::builder()
///     .min_level(LogLevel::Debug)
///     .backend(
///         PatternFormatter::new("[%l] %v").unwrap(),
///         ConsoleBackend::new(ConsoleConfig::default()).unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// registry.log(&LogRecord::new(LogLevel::Info, "service started"));
/// registry.wait();
/// assert_eq!(registry.metrics().total_logged(), 1);
/// ```
pub struct Registry {
    entries: RwLock<Vec<Arc<Entry>>>,
    default_target: RwLock<Option<usize>>,
    min_level: RwLock<LogLevel>,
    metrics: Arc<LoggerMetrics>,
}

impl Registry {
    /// Empty registry accepting every level
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            default_target: RwLock::new(None),
            min_level: RwLock::new(LogLevel::Trace),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Append an entry reachable by broadcast; returns its stable index.
    pub fn add<F, B>(&self, formatter: F, backend: B) -> usize
    where
        F: LogFormatter + 'static,
        B: Backend + 'static,
    {
        self.add_entry(Arc::new(formatter), Arc::new(backend), false)
    }

    /// Append an entry that broadcasts skip; returns its stable index.
    pub fn add_exclusive<F, B>(&self, formatter: F, backend: B) -> usize
    where
        F: LogFormatter + 'static,
        B: Backend + 'static,
    {
        self.add_entry(Arc::new(formatter), Arc::new(backend), true)
    }

    pub fn add_entry(
        &self,
        formatter: Arc<dyn LogFormatter>,
        backend: Arc<dyn Backend>,
        exclusive: bool,
    ) -> usize {
        let mut entries = self.entries.write();
        entries.push(Arc::new(Entry {
            formatter,
            backend,
            enabled: AtomicBool::new(true),
            exclusive,
        }));
        entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn default_target(&self) -> Option<usize> {
        *self.default_target.read()
    }

    /// Route records with [`Target::Default`] to `index`, or broadcast them
    /// when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::BackendIndex`] if `index` is not registered
    pub fn set_default_target(&self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            self.entry(index)?;
        }
        *self.default_target.write() = index;
        Ok(())
    }

    /// Toggle participation of one entry without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::BackendIndex`] if `index` is not registered
    pub fn enable(&self, index: usize, enabled: bool) -> Result<()> {
        self.entry(index)?.enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::BackendIndex`] if `index` is not registered
    pub fn is_enabled(&self, index: usize) -> Result<bool> {
        Ok(self.entry(index)?.enabled.load(Ordering::Acquire))
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    fn entry(&self, index: usize) -> Result<Arc<Entry>> {
        let entries = self.entries.read();
        entries
            .get(index)
            .cloned()
            .ok_or_else(|| LoggerError::backend_index(index, entries.len()))
    }

    /// Entries a record should reach, or `None` when its explicit target is
    /// unusable.
    fn resolve(&self, target: Target) -> Option<Vec<(usize, Arc<Entry>)>> {
        let target = match target {
            Target::Default => self.default_target().map_or(Target::All, Target::Backend),
            other => other,
        };

        let entries = self.entries.read();
        match target {
            Target::Backend(index) => {
                let entry = entries.get(index)?;
                entry
                    .enabled
                    .load(Ordering::Acquire)
                    .then(|| vec![(index, Arc::clone(entry))])
            }
            _ => Some(
                entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.exclusive && e.enabled.load(Ordering::Acquire))
                    .map(|(i, e)| (i, Arc::clone(e)))
                    .collect(),
            ),
        }
    }

    /// Render `record` for every matching entry and hand it to the backend.
    ///
    /// Returns how many backends accepted the record. Backend errors and panics
    /// are reported on stderr and never reach the caller.
    pub fn log(&self, record: &LogRecord) -> usize {
        if record.level < self.min_level() {
            self.metrics.record_filtered();
            return 0;
        }

        let Some(targets) = self.resolve(record.target) else {
            self.metrics.record_dropped();
            return 0;
        };

        let mut accepted = 0;
        for (index, entry) in &targets {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let text = entry.formatter.format(record);
                entry.backend.log(record, &text)
            }));

            match result {
                Ok(Ok(())) => accepted += 1,
                Ok(Err(e)) if e.kind() == ErrorKind::QueueFull => {
                    // The executor already warned when its queue first filled
                    self.metrics.record_queue_overflow();
                }
                Ok(Err(e)) => {
                    self.metrics.record_backend_failure();
                    // A failed backend already reported its cause once
                    if e.kind() != ErrorKind::BackendFailed {
                        eprintln!(
                            "[LOGGER ERROR] Backend #{} ('{}') failed: {}",
                            index,
                            entry.backend.name(),
                            e
                        );
                    }
                }
                Err(panic_info) => {
                    self.metrics.record_backend_failure();
                    eprintln!(
                        "[LOGGER CRITICAL] Backend #{} ('{}') panicked: {}. \
                         Other backends continue to function.",
                        index,
                        entry.backend.name(),
                        panic_message(panic_info.as_ref())
                    );
                }
            }
        }

        if accepted > 0 {
            self.metrics.record_logged();
        } else {
            self.metrics.record_dropped();
        }
        accepted
    }

    /// Block until every backend has written what it accepted so far.
    pub fn wait(&self) {
        let backends: Vec<Arc<dyn Backend>> = self
            .entries
            .read()
            .iter()
            .map(|e| Arc::clone(&e.backend))
            .collect();
        for backend in backends {
            backend.wait();
        }
    }

    /// Runtime parameter reported by the backend at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::BackendIndex`] if `index` is not registered
    pub fn param(&self, index: usize, param: BackendParam) -> Result<Option<ParamValue>> {
        let entry = self.entry(index)?;
        Ok(entry.backend.param(param))
    }

    /// Text form of a parameter; empty when the backend cannot answer.
    pub fn string_param(&self, index: usize, param: BackendParam) -> Result<String> {
        Ok(match self.param(index, param)? {
            Some(ParamValue::Text(text)) => text,
            Some(ParamValue::Int(i)) => i.to_string(),
            Some(ParamValue::Float(f)) => f.to_string(),
            None => String::new(),
        })
    }

    /// Integer form of a parameter; 0 when the backend cannot answer.
    pub fn int_param(&self, index: usize, param: BackendParam) -> Result<i64> {
        Ok(self
            .param(index, param)?
            .and_then(|v| v.as_int())
            .unwrap_or(0))
    }

    /// Float form of a parameter; 0.0 when the backend cannot answer.
    pub fn float_param(&self, index: usize, param: BackendParam) -> Result<f64> {
        Ok(self
            .param(index, param)?
            .and_then(|v| v.as_float())
            .unwrap_or(0.0))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(|e| e.backend.name().to_string())
            .collect();
        f.debug_struct("Registry")
            .field("backends", &names)
            .field("default_target", &self.default_target())
            .field("min_level", &self.min_level())
            .finish()
    }
}

/// Builder for [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    min_level: Option<LogLevel>,
    entries: Vec<(Arc<dyn LogFormatter>, Arc<dyn Backend>, bool)>,
    default_target: Option<usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn backend<F, B>(mut self, formatter: F, backend: B) -> Self
    where
        F: LogFormatter + 'static,
        B: Backend + 'static,
    {
        self.entries.push((Arc::new(formatter), Arc::new(backend), false));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exclusive_backend<F, B>(mut self, formatter: F, backend: B) -> Self
    where
        F: LogFormatter + 'static,
        B: Backend + 'static,
    {
        self.entries.push((Arc::new(formatter), Arc::new(backend), true));
        self
    }

    /// Index (in registration order) that untargeted records go to
    #[must_use = "builder methods return a new value"]
    pub fn default_target(mut self, index: usize) -> Self {
        self.default_target = Some(index);
        self
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::BackendIndex`] if the default target is not a
    /// registered index
    pub fn build(self) -> Result<Registry> {
        let registry = Registry::new();
        if let Some(level) = self.min_level {
            registry.set_min_level(level);
        }
        for (formatter, backend, exclusive) in self.entries {
            registry.add_entry(formatter, backend, exclusive);
        }
        registry.set_default_target(self.default_target)?;
        Ok(registry)
    }
}
