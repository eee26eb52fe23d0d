//! Output format selection for rendered records
//!
//! - Pattern: text produced by a compiled pattern (default)
//! - Json: one machine-readable object per record, bypassing the pattern

use super::pattern::RenderOptions;
use super::record::LogRecord;
use super::value::write_message;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Output format for rendered records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Text produced by the formatter's pattern
    ///
    /// Example: `[2024-01-05 10:20:30.000] [src/disk.rs:88] [check] [thread:1] [ERROR] disk full`
    #[default]
    Pattern,

    /// JSON object for machine processing
    ///
    /// Example: `{"timestamp":"2024-01-05T10:20:30.000Z","level":"ERROR","message":"disk full",...}`
    Json,
}

/// Render a record as a single-line JSON object.
///
/// Keys: `timestamp`, `timestamp_ms`, `level`, `level_num`, `file`, `line`,
/// `function`, `thread`, `message` (rendered body), `format` (raw message)
/// and `args` (array of `{"name", "value"}`, values keep their JSON type).
pub fn render_json(record: &LogRecord, options: &RenderOptions) -> String {
    let mut json_obj = serde_json::Map::new();

    let shifted = record.timestamp_ms.saturating_add(options.timestamp_offset_ms);
    let timestamp = chrono::DateTime::from_timestamp_millis(shifted).unwrap_or_default();
    json_obj.insert(
        "timestamp".to_string(),
        serde_json::Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    json_obj.insert(
        "timestamp_ms".to_string(),
        serde_json::Value::Number(record.timestamp_ms.into()),
    );

    json_obj.insert(
        "level".to_string(),
        serde_json::Value::String(record.level.to_str().to_string()),
    );
    json_obj.insert(
        "level_num".to_string(),
        serde_json::Value::Number(record.level.as_u8().into()),
    );

    // Location info
    json_obj.insert(
        "file".to_string(),
        serde_json::Value::String(record.source.file.clone()),
    );
    json_obj.insert(
        "line".to_string(),
        serde_json::Value::Number(record.source.line.into()),
    );
    json_obj.insert(
        "function".to_string(),
        serde_json::Value::String(record.source.function.clone()),
    );
    json_obj.insert(
        "thread".to_string(),
        serde_json::Value::String(record.thread.label.to_string()),
    );

    let mut message = String::with_capacity(record.message.len());
    write_message(&record.message, &record.args, &mut message);
    json_obj.insert("message".to_string(), serde_json::Value::String(message));
    json_obj.insert(
        "format".to_string(),
        serde_json::Value::String(record.message.clone()),
    );

    let args = record
        .args
        .iter()
        .map(|arg| {
            serde_json::json!({
                "name": arg.name,
                "value": arg.value.to_json_value(),
            })
        })
        .collect();
    json_obj.insert("args".to_string(), serde_json::Value::Array(args));

    serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::core::record::SourceContext;
    use crate::core::value::VariableValue;

    #[test]
    fn test_render_json_fields() {
        let record = LogRecord::new(LogLevel::Error, "disk {} full")
            .with_timestamp_ms(1_704_450_030_000)
            .with_source(SourceContext::new("src/disk.rs", "check", 88))
            .with_arg(VariableValue::new("disk", "sda1"))
            .with_arg(VariableValue::new("pct", 97));

        let text = render_json(&record, &RenderOptions::default());
        assert!(!text.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed["timestamp"], "2024-01-05T10:20:30.000Z");
        assert_eq!(parsed["timestamp_ms"], 1_704_450_030_000i64);
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["level_num"], 4);
        assert_eq!(parsed["file"], "src/disk.rs");
        assert_eq!(parsed["line"], 88);
        assert_eq!(parsed["function"], "check");
        assert_eq!(parsed["message"], "disk sda1 full pct: 97");
        assert_eq!(parsed["format"], "disk {} full");
        assert_eq!(parsed["args"][1]["name"], "pct");
        assert_eq!(parsed["args"][1]["value"], 97);
    }

    #[test]
    fn test_json_escapes_control_characters() {
        let record = LogRecord::new(LogLevel::Info, "line1\nline2\t\"quoted\"");
        let text = render_json(&record, &RenderOptions::default());
        assert!(!text.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["message"], "line1\nline2\t\"quoted\"");
    }

    #[test]
    fn test_output_format_config_names() {
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(OutputFormat::default(), OutputFormat::Pattern);
    }
}
