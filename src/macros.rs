//! Logging macros that capture the call site.
//!
//! Each macro builds a [`LogRecord`](crate::LogRecord) stamped with the
//! caller's file, line and enclosing function, attaches every argument as a
//! [`VariableValue`](crate::VariableValue) named after its expression text and
//! hands the record to a [`Registry`](crate::Registry).
//!
//! # Examples
//!
//! ```
//! use rust_logit::prelude::*;
//! use rust_logit::info;
//!
//! let registry = Registry::new();
//!
//! // Basic logging
//! info!(registry, "Server started");
//!
//! // Arguments fill `{}` placeholders in order
//! let port = 8080;
//! info!(registry, "Server listening on port {}", port);
//!
//! // Arguments without a placeholder are appended as `name: value`
//! let user_id = 42;
//! info!(registry, "User logged in", user_id);
//! ```

/// [`SourceContext`](crate::SourceContext) of the macro call site.
///
/// The function is reported as its full path, e.g. `my_crate::net::connect`.
///
/// # Examples
///
/// ```
/// use rust_logit::source_context;
///
/// fn handler() -> rust_logit::SourceContext {
///     source_context!()
/// }
///
/// let source = handler();
/// assert!(source.function.ends_with("handler"));
/// assert!(source.line > 0);
/// ```
#[macro_export]
macro_rules! source_context {
    () => {{
        fn __logit_marker() {}
        fn __logit_type_name<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __logit_type_name(__logit_marker);
        let function = name.strip_suffix("::__logit_marker").unwrap_or(name);
        $crate::SourceContext::new(file!(), function, line!())
    }};
}

/// Log a message at an explicit level.
///
/// Returns how many backends accepted the record.
///
/// # Examples
///
/// ```
/// use rust_logit::prelude::*;
/// use rust_logit::log;
///
/// let registry = Registry::new();
/// log!(registry, LogLevel::Info, "Simple message");
/// log!(registry, LogLevel::Error, "Error code: {}", 500);
/// log!(registry, target = Target::Backend(0), LogLevel::Warn, "Only the first backend");
/// ```
#[macro_export]
macro_rules! log {
    ($registry:expr, target = $target:expr, $level:expr, $msg:expr $(, $arg:expr)* $(,)?) => {{
        let record = $crate::LogRecord::new($level, $msg)
            .with_source($crate::source_context!())
            .with_target($target)
            $(.with_arg($crate::VariableValue::new(stringify!($arg), $arg)))*;
        $registry.log(&record)
    }};
    ($registry:expr, $level:expr, $msg:expr $(, $arg:expr)* $(,)?) => {{
        let record = $crate::LogRecord::new($level, $msg)
            .with_source($crate::source_context!())
            $(.with_arg($crate::VariableValue::new(stringify!($arg), $arg)))*;
        $registry.log(&record)
    }};
}

/// Log a trace-level message.
///
/// ```
/// # use rust_logit::prelude::*;
/// # let registry = Registry::new();
/// use rust_logit::trace;
/// trace!(registry, "Entering function: calculate()");
/// trace!(registry, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// ```
/// # use rust_logit::prelude::*;
/// # let registry = Registry::new();
/// use rust_logit::warn;
/// warn!(registry, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($registry:expr, $($arg:tt)+) => {
        $crate::log!($registry, $crate::LogLevel::Fatal, $($arg)+)
    };
}
