//! Log record structure

use super::log_level::LogLevel;
use super::value::VariableValue;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::sync::Arc;
use std::thread::ThreadId;

// Thread-local cache for the current thread's tag to avoid repeated allocations
thread_local! {
    static THREAD_TAG_CACHE: RefCell<Option<ThreadTag>> = const { RefCell::new(None) };
}

/// Identity of the thread that produced a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadTag {
    pub id: ThreadId,
    /// Numeric form of the id, e.g. `"7"` for `ThreadId(7)`
    pub label: Arc<str>,
}

impl ThreadTag {
    /// Tag of the calling thread, computed once per thread
    pub fn current() -> Self {
        THREAD_TAG_CACHE.with(|cache| {
            cache
                .borrow_mut()
                .get_or_insert_with(|| ThreadTag::from_id(std::thread::current().id()))
                .clone()
        })
    }

    pub fn from_id(id: ThreadId) -> Self {
        let debug = format!("{:?}", id);
        let label = debug
            .strip_prefix("ThreadId(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(&debug);
        Self {
            id,
            label: Arc::from(label),
        }
    }
}

/// Source location captured at the call site. Empty fields mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl SourceContext {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }

    /// Final path component of `file`, accepting both separators
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file)
    }
}

/// Which registry entries a record is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// The registry's default target, or a broadcast when it has none
    #[default]
    Default,
    /// Every enabled, non-exclusive entry
    All,
    /// One entry by index
    Backend(usize),
}

/// Immutable snapshot of one logging event
///
/// All payload data is owned, so a record can outlive the call that created it
/// and be rendered on another thread.
///
/// # Examples
///
/// ```
/// use rust_logit::{LogLevel, LogRecord, SourceContext, Target, VariableValue};
///
/// let record = LogRecord::new(LogLevel::Warn, "queue at {}%")
///     .with_source(SourceContext::new("src/queue.rs", "drain", 42))
///     .with_arg(VariableValue::new("fill", 93))
///     .with_target(Target::Backend(0));
///
/// assert_eq!(record.source.file_name(), "queue.rs");
/// assert_eq!(record.args.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    /// Milliseconds since the Unix epoch (UTC)
    pub timestamp_ms: i64,
    pub source: SourceContext,
    pub thread: ThreadTag,
    pub target: Target,
    pub message: String,
    pub args: Vec<VariableValue>,
}

impl LogRecord {
    /// Record stamped with the current time and calling thread
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp_ms: Utc::now().timestamp_millis(),
            source: SourceContext::default(),
            thread: ThreadTag::current(),
            target: Target::Default,
            message: message.into(),
            args: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = source;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_thread(mut self, thread: ThreadTag) -> Self {
        self.thread = thread;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_arg(mut self, arg: VariableValue) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_args(mut self, args: impl IntoIterator<Item = VariableValue>) -> Self {
        self.args.extend(args);
        self
    }

    /// Timestamp as a UTC date-time; out-of-range values clamp to the epoch
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms).unwrap_or_default()
    }

    /// True when there is neither a message nor any argument to render
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.args.is_empty()
    }
}
