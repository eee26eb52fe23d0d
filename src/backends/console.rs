//! Console backend
//!
//! ERROR and FATAL entries go to stderr, everything else to stdout, one line
//! per entry. When the terminal does not support color, escape codes that the
//! pattern produced are stripped before writing.
//!
//! A write error on either stream stops the backend: the cause is reported
//! once and later entries are rejected with `BackendFailed`.

use crate::core::backend::{Backend, BackendParam, LastActivity, ParamValue};
use crate::core::color::{strip_ansi, TextColor};
use crate::core::error::{LoggerError, Result};
use crate::core::executor::TaskExecutor;
use crate::core::log_level::LogLevel;
use crate::core::overflow_policy::OverflowPolicy;
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub is_asynchronous: bool,
    /// Color restored by `%$` and written once when the backend starts
    pub default_color: TextColor,
    /// Cap on queued asynchronous writes; unbounded when `None`
    pub max_queue_size: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            is_asynchronous: true,
            default_color: TextColor::White,
            max_queue_size: None,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl ConsoleConfig {
    #[must_use = "builder methods return a new value"]
    pub fn with_asynchronous(mut self, asynchronous: bool) -> Self {
        self.is_asynchronous = asynchronous;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_default_color(mut self, color: TextColor) -> Self {
        self.default_color = color;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_queue_limit(mut self, max_queue_size: usize, policy: OverflowPolicy) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self.overflow_policy = policy;
        self
    }
}

type Stream = Box<dyn Write + Send>;

struct Streams {
    out: Stream,
    err: Stream,
}

struct ConsoleShared {
    streams: Mutex<Streams>,
    colorize: bool,
    failed: AtomicBool,
    activity: LastActivity,
}

impl ConsoleShared {
    fn write_line(&self, level: LogLevel, timestamp_ms: i64, text: &str) -> io::Result<()> {
        let plain;
        let text = if self.colorize {
            text
        } else {
            plain = strip_ansi(text);
            &plain
        };

        let mut streams = self.streams.lock();
        let stream = match level {
            LogLevel::Error | LogLevel::Fatal => &mut streams.err,
            _ => &mut streams.out,
        };
        stream.write_all(text.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        drop(streams);

        self.activity.record(timestamp_ms);
        Ok(())
    }

    fn mark_failed(&self, error: &io::Error) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            eprintln!(
                "[LOGGER ERROR] Console backend stopped accepting entries: {}",
                error
            );
        }
    }
}

/// Backend writing to the process's standard streams
///
/// # Examples
///
/// ```
/// use rust_logit::backends::{ConsoleBackend, ConsoleConfig};
/// use rust_logit::{Backend, LogLevel, LogRecord};
///
/// let console = ConsoleBackend::new(ConsoleConfig::default().with_asynchronous(false)).unwrap();
/// console.log(&LogRecord::new(LogLevel::Info, "hi"), "hi").unwrap();
/// ```
pub struct ConsoleBackend {
    shared: Arc<ConsoleShared>,
    executor: Option<TaskExecutor>,
}

impl ConsoleBackend {
    pub const NAME: &'static str = "console";

    /// Console backend on stdout/stderr, colorizing when the terminal allows it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero queue limit, or an IO error if
    /// the writer thread cannot be started
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let colorize = colored::control::SHOULD_COLORIZE.should_colorize();
        Self::with_streams(config, colorize, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Console backend over arbitrary streams
    pub fn with_streams(
        config: ConsoleConfig,
        colorize: bool,
        mut out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Result<Self> {
        if colorize {
            out.write_all(config.default_color.ansi().as_bytes())?;
            out.flush()?;
        }
        let executor = if config.is_asynchronous {
            Some(TaskExecutor::with_queue_limit(
                "logit-console",
                config.max_queue_size,
                config.overflow_policy,
            )?)
        } else {
            None
        };
        Ok(Self {
            shared: Arc::new(ConsoleShared {
                streams: Mutex::new(Streams { out, err }),
                colorize,
                failed: AtomicBool::new(false),
                activity: LastActivity::new(),
            }),
            executor,
        })
    }

    pub fn is_colorizing(&self) -> bool {
        self.shared.colorize
    }

    /// Whether a stream write failure has stopped this backend
    pub fn has_failed(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Entries rejected by a full queue under [`OverflowPolicy::DropNewest`]
    pub fn dropped_entries(&self) -> u64 {
        self.executor.as_ref().map_or(0, TaskExecutor::dropped_tasks)
    }
}

impl Backend for ConsoleBackend {
    fn log(&self, record: &LogRecord, text: &str) -> Result<()> {
        if self.has_failed() {
            return Err(LoggerError::backend_failed(Self::NAME));
        }

        let level = record.level;
        let timestamp_ms = record.timestamp_ms;
        match &self.executor {
            Some(executor) => {
                let shared = Arc::clone(&self.shared);
                let text = text.to_string();
                executor.submit(move || {
                    if shared.failed.load(Ordering::Acquire) {
                        return;
                    }
                    if let Err(e) = shared.write_line(level, timestamp_ms, &text) {
                        shared.mark_failed(&e);
                    }
                })
            }
            None => self
                .shared
                .write_line(level, timestamp_ms, text)
                .map_err(|e| {
                    self.shared.mark_failed(&e);
                    LoggerError::from(e)
                }),
        }
    }

    fn wait(&self) {
        if let Some(executor) = &self.executor {
            executor.wait();
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn param(&self, param: BackendParam) -> Option<ParamValue> {
        self.wait();
        self.shared.activity.param(param)
    }
}

impl Drop for ConsoleBackend {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            executor.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cloneable in-memory stream
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn console(config: ConsoleConfig, colorize: bool) -> (ConsoleBackend, Capture, Capture) {
        let out = Capture::default();
        let err = Capture::default();
        let backend =
            ConsoleBackend::with_streams(config, colorize, Box::new(out.clone()), Box::new(err.clone()))
                .unwrap();
        (backend, out, err)
    }

    #[test]
    fn test_routes_errors_to_stderr() {
        let (backend, out, err) = console(ConsoleConfig::default().with_asynchronous(false), false);
        for level in LogLevel::ALL {
            let record = LogRecord::new(level, "x");
            backend.log(&record, level.to_str()).unwrap();
        }
        assert_eq!(out.text(), "TRACE\nDEBUG\nINFO\nWARN\n");
        assert_eq!(err.text(), "ERROR\nFATAL\n");
    }

    #[test]
    fn test_strips_escapes_without_color() {
        let (backend, out, _) = console(ConsoleConfig::default().with_asynchronous(false), false);
        let record = LogRecord::new(LogLevel::Info, "x");
        backend.log(&record, "\x1b[92mgreen\x1b[97m text").unwrap();
        assert_eq!(out.text(), "green text\n");
    }

    #[test]
    fn test_writes_default_color_when_colorizing() {
        let config = ConsoleConfig::default()
            .with_asynchronous(false)
            .with_default_color(TextColor::Cyan);
        let (backend, out, _) = console(config, true);
        assert!(backend.is_colorizing());
        assert_eq!(out.text(), TextColor::Cyan.ansi());

        let record = LogRecord::new(LogLevel::Info, "x");
        backend.log(&record, "\x1b[92mok").unwrap();
        assert!(out.text().ends_with("\x1b[92mok\n"));
    }

    /// Stream whose reader has gone away
    struct ClosedPipe(Arc<std::sync::atomic::AtomicUsize>);

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_closed_stream_stops_backend() {
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let backend = ConsoleBackend::with_streams(
            ConsoleConfig::default().with_asynchronous(false),
            false,
            Box::new(ClosedPipe(Arc::clone(&attempts))),
            Box::new(Capture::default()),
        )
        .unwrap();

        let record = LogRecord::new(LogLevel::Info, "x");
        let err = backend.log(&record, "first").unwrap_err();
        assert!(matches!(err, LoggerError::Io(_)));
        assert!(backend.has_failed());

        for _ in 0..3 {
            let err = backend.log(&record, "again").unwrap_err();
            assert!(matches!(err, LoggerError::BackendFailed { .. }));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_closed_stream_stops_backend() {
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let backend = ConsoleBackend::with_streams(
            ConsoleConfig::default(),
            false,
            Box::new(ClosedPipe(Arc::clone(&attempts))),
            Box::new(Capture::default()),
        )
        .unwrap();

        let record = LogRecord::new(LogLevel::Info, "x");
        backend.log(&record, "first").unwrap();
        backend.wait();
        assert!(backend.has_failed());
        assert!(matches!(
            backend.log(&record, "later"),
            Err(LoggerError::BackendFailed { .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_console_keeps_order() {
        let (backend, out, _) = console(ConsoleConfig::default(), false);
        for i in 0..50 {
            let record = LogRecord::new(LogLevel::Debug, "x");
            backend.log(&record, &i.to_string()).unwrap();
        }
        backend.wait();
        let expected: String = (0..50).map(|i| format!("{}\n", i)).collect();
        assert_eq!(out.text(), expected);
        assert!(backend.param(BackendParam::LastLogTimestamp).is_some());
        assert_eq!(backend.param(BackendParam::LastFileName), None);
    }
}
