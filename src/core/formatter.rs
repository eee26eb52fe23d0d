//! Formatter: owns a compiled pattern and renders records through it

use super::color::TextColor;
use super::error::Result;
use super::output_format::{render_json, OutputFormat};
use super::pattern::{compile_with, CompiledPlan, RenderOptions, DEFAULT_PATTERN};
use super::record::LogRecord;

/// Turns a record into the text handed to a backend.
///
/// Implementations must not fail or panic; fields that cannot be produced
/// render as empty text.
pub trait LogFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

/// Formatter backed by a pattern compiled once at construction
///
/// # Examples
///
/// ```
/// use rust_logit::{LogFormatter, LogLevel, LogRecord, PatternFormatter};
///
/// let formatter = PatternFormatter::new("%Y-%m-%d %H:%M:%S [%l] %v").unwrap();
/// let record = LogRecord::new(LogLevel::Error, "disk full").with_timestamp_ms(1_704_450_030_000);
/// assert_eq!(formatter.format(&record), "2024-01-05 10:20:30 [ERROR] disk full");
/// ```
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    plan: CompiledPlan,
    options: RenderOptions,
    output: OutputFormat,
}

impl PatternFormatter {
    /// Compile `pattern` with default options
    ///
    /// # Errors
    ///
    /// Returns a pattern error if the pattern is malformed
    pub fn new(pattern: &str) -> Result<Self> {
        Self::builder(pattern).build()
    }

    pub fn builder(pattern: &str) -> PatternFormatterBuilder {
        PatternFormatterBuilder::new(pattern)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn plan(&self) -> &CompiledPlan {
        &self.plan
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    /// Structured rendering of the same record, ignoring the pattern
    pub fn render_json(&self, record: &LogRecord) -> String {
        render_json(record, &self.options)
    }
}

impl LogFormatter for PatternFormatter {
    fn format(&self, record: &LogRecord) -> String {
        match self.output {
            OutputFormat::Pattern => self.plan.render(record, &self.options),
            OutputFormat::Json => self.render_json(record),
        }
    }
}

/// Builder for [`PatternFormatter`]; the default uses [`DEFAULT_PATTERN`]
#[derive(Debug, Clone)]
pub struct PatternFormatterBuilder {
    pattern: String,
    strip_colors: bool,
    options: RenderOptions,
    output: OutputFormat,
}

impl PatternFormatterBuilder {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            strip_colors: false,
            options: RenderOptions::default(),
            output: OutputFormat::Pattern,
        }
    }

    /// Drop color directives and escape codes from the whole pattern
    #[must_use = "builder methods return a new value"]
    pub fn strip_colors(mut self, strip: bool) -> Self {
        self.strip_colors = strip;
        self
    }

    /// Shift calendar and clock fields, e.g. to render local time
    #[must_use = "builder methods return a new value"]
    pub fn timestamp_offset_ms(mut self, offset_ms: i64) -> Self {
        self.options.timestamp_offset_ms = offset_ms;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.options.base_path = Some(base_path.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn default_color(mut self, color: TextColor) -> Self {
        self.options.default_color = color;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output_format(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// # Errors
    ///
    /// Returns a pattern error if the pattern is malformed
    pub fn build(self) -> Result<PatternFormatter> {
        let plan = compile_with(&self.pattern, self.strip_colors)?;
        Ok(PatternFormatter {
            pattern: self.pattern,
            plan,
            options: self.options,
            output: self.output,
        })
    }
}

impl Default for PatternFormatterBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}
