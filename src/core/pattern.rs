//! Pattern compiler and renderer
//!
//! A pattern such as `"%Y-%m-%d %H:%M:%S [%l] %v"` is compiled once into a
//! [`CompiledPlan`], an immutable list of [`FormatInstruction`]s that is then
//! walked for every record. Compilation is the only step that can fail;
//! rendering always produces a string.
//!
//! Directive syntax is `%` followed by optional modifiers and a field code.
//! Modifiers: `-` left align, `=` center, digits for the width and `!` (only
//! after a width) to truncate fields longer than the width. Unknown codes
//! are kept verbatim as literal text.

use super::color::{strip_ansi_into, TextColor};
use super::error::{LoggerError, Result};
use super::record::LogRecord;
use super::value::write_message;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fmt::Write;
use std::sync::Arc;

/// Largest width accepted by a directive
pub const MAX_FIELD_WIDTH: usize = 1024;

pub const DEFAULT_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%ffn:%#] [%!] [thread:%t] [%l] %^%v%$";

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    Center,
    #[default]
    Right,
}

/// Record field a directive resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    ShortYear,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    EpochMillis,
    EpochSeconds,
    Iso8601,
    IsoDate,
    ClockTime,
    ShortDate,
    CTime,
    MonthAbbrev,
    MonthName,
    WeekdayAbbrev,
    WeekdayName,
    LevelWord,
    LevelLetter,
    LevelNumber,
    FileName,
    FilePath,
    RelativePath,
    FileLine,
    Line,
    Function,
    Thread,
    ColorStart,
    ColorEnd,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSpec {
    pub width: usize,
    pub align: Align,
    pub truncate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatInstruction {
    Literal {
        text: String,
        strip_ansi: bool,
    },
    Field {
        field: Field,
        spec: FieldSpec,
        strip_ansi: bool,
    },
    /// Rendered only for records with neither message nor arguments
    Fallback(Vec<FormatInstruction>),
}

/// Values a plan needs besides the record itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Added to the record timestamp for calendar and clock fields
    pub timestamp_offset_ms: i64,
    /// Prefix removed from source paths by `%r`
    pub base_path: Option<String>,
    /// Color restored by `%$`
    pub default_color: TextColor,
}

/// Compiled, immutable rendering plan. Cloning shares the instruction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPlan {
    instructions: Arc<[FormatInstruction]>,
}

/// Compile a pattern, keeping color directives.
pub fn compile(pattern: &str) -> Result<CompiledPlan> {
    compile_with(pattern, false)
}

/// Compile a pattern; with `strip_colors` the whole plan is produced as if it
/// were wrapped in a strip region.
///
/// # Errors
///
/// Returns [`LoggerError::Pattern`] when a directive is cut off by the end of
/// the pattern, a width exceeds [`MAX_FIELD_WIDTH`], or a `%N(` group is
/// unterminated or nested.
pub fn compile_with(pattern: &str, strip_colors: bool) -> Result<CompiledPlan> {
    let mut parser = Parser {
        pattern,
        chars: pattern.char_indices().collect(),
        pos: 0,
        strip: strip_colors,
        force_strip: strip_colors,
    };
    let instructions = parser.parse_sequence(false)?;
    Ok(CompiledPlan {
        instructions: instructions.into(),
    })
}

struct Parser<'a> {
    pattern: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    strip: bool,
    force_strip: bool,
}

impl Parser<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn byte_pos(&self, index: usize) -> usize {
        self.chars
            .get(index)
            .map(|(b, _)| *b)
            .unwrap_or(self.pattern.len())
    }

    fn flush(&self, literal: &mut String, out: &mut Vec<FormatInstruction>) {
        if !literal.is_empty() {
            out.push(FormatInstruction::Literal {
                text: std::mem::take(literal),
                strip_ansi: self.strip,
            });
        }
    }

    fn parse_sequence(&mut self, nested: bool) -> Result<Vec<FormatInstruction>> {
        let group_start = self.pos;
        let mut out = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek(0) {
            if nested && c == ')' {
                self.pos += 1;
                self.flush(&mut literal, &mut out);
                return Ok(out);
            }
            if c != '%' {
                literal.push(c);
                self.pos += 1;
                continue;
            }
            self.parse_directive(nested, &mut literal, &mut out)?;
        }

        if nested {
            return Err(LoggerError::pattern(
                self.byte_pos(group_start.saturating_sub(3)),
                "unterminated %N( group",
            ));
        }
        self.flush(&mut literal, &mut out);
        Ok(out)
    }

    fn parse_directive(
        &mut self,
        nested: bool,
        literal: &mut String,
        out: &mut Vec<FormatInstruction>,
    ) -> Result<()> {
        let start = self.pos;
        self.pos += 1;

        let mut spec = FieldSpec::default();
        let mut has_width = false;
        while let Some(c) = self.peek(0) {
            match c {
                '-' => spec.align = Align::Left,
                '=' => spec.align = Align::Center,
                '!' if has_width => {
                    spec.truncate = true;
                    self.pos += 1;
                    break;
                }
                d if d.is_ascii_digit() => {
                    has_width = true;
                    spec.width = spec.width * 10 + (d as usize - '0' as usize);
                    if spec.width > MAX_FIELD_WIDTH {
                        return Err(LoggerError::pattern(
                            self.byte_pos(start),
                            format!("width exceeds {}", MAX_FIELD_WIDTH),
                        ));
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        let Some(code) = self.peek(0) else {
            return Err(LoggerError::pattern(
                self.byte_pos(start),
                "directive cut off by end of pattern",
            ));
        };
        let next = self.peek(1);
        let (field, consumed) = match code {
            '%' => {
                literal.push('%');
                self.pos += 1;
                return Ok(());
            }
            'S' if next == Some('C') => return self.set_strip(true, literal, out),
            's' if next == Some('c') => return self.set_strip(true, literal, out),
            'E' if next == Some('C') => return self.set_strip(false, literal, out),
            'e' if next == Some('c') => return self.set_strip(false, literal, out),
            'N' if next == Some('(') => {
                if nested {
                    return Err(LoggerError::pattern(
                        self.byte_pos(start),
                        "%N( groups cannot be nested",
                    ));
                }
                self.pos += 2;
                self.flush(literal, out);
                let group = self.parse_sequence(true)?;
                out.push(FormatInstruction::Fallback(group));
                return Ok(());
            }
            'm' if next == Some('s') => (Some(Field::EpochMillis), 2),
            'b' if next == Some('s') => (Some(Field::FileName), 2),
            'f' if next == Some('f') && self.peek(2) == Some('n') => (Some(Field::FilePath), 3),
            'f' if next == Some('n') => (Some(Field::FileName), 2),
            _ => (field_for_code(code), 1),
        };
        self.pos += consumed;

        match field {
            Some(Field::ColorStart | Field::ColorEnd) if self.strip => {}
            Some(field) => {
                self.flush(literal, out);
                out.push(FormatInstruction::Field {
                    field,
                    spec,
                    strip_ansi: self.strip,
                });
            }
            None => {
                let begin = self.byte_pos(start);
                let end = self.byte_pos(self.pos);
                literal.push_str(&self.pattern[begin..end]);
            }
        }
        Ok(())
    }

    fn set_strip(
        &mut self,
        strip: bool,
        literal: &mut String,
        out: &mut Vec<FormatInstruction>,
    ) -> Result<()> {
        self.pos += 2;
        let strip = strip || self.force_strip;
        if strip != self.strip {
            self.flush(literal, out);
            self.strip = strip;
        }
        Ok(())
    }
}

fn field_for_code(code: char) -> Option<Field> {
    let field = match code {
        'Y' => Field::Year,
        'C' => Field::ShortYear,
        'm' => Field::Month,
        'd' => Field::Day,
        'H' => Field::Hour,
        'M' => Field::Minute,
        'S' => Field::Second,
        'e' => Field::Millisecond,
        's' | 'E' => Field::EpochSeconds,
        'i' => Field::Iso8601,
        'F' => Field::IsoDate,
        'T' | 'X' => Field::ClockTime,
        'D' => Field::ShortDate,
        'c' => Field::CTime,
        'b' => Field::MonthAbbrev,
        'B' => Field::MonthName,
        'a' => Field::WeekdayAbbrev,
        'A' => Field::WeekdayName,
        'l' => Field::LevelWord,
        'L' => Field::LevelLetter,
        'n' => Field::LevelNumber,
        'f' => Field::FileName,
        'g' => Field::FilePath,
        'r' => Field::RelativePath,
        '@' => Field::FileLine,
        '#' => Field::Line,
        '!' => Field::Function,
        't' => Field::Thread,
        '^' => Field::ColorStart,
        '$' => Field::ColorEnd,
        'v' => Field::Message,
        _ => return None,
    };
    Some(field)
}

impl CompiledPlan {
    pub fn instructions(&self) -> &[FormatInstruction] {
        &self.instructions
    }

    /// Render `record` through this plan.
    pub fn render(&self, record: &LogRecord, options: &RenderOptions) -> String {
        let mut out = String::with_capacity(128);
        self.render_into(record, options, &mut out);
        out
    }

    /// Render `record`, appending to `out`.
    pub fn render_into(&self, record: &LogRecord, options: &RenderOptions, out: &mut String) {
        let shifted = record.timestamp_ms.saturating_add(options.timestamp_offset_ms);
        let ctx = RenderContext {
            record,
            options,
            time: DateTime::from_timestamp_millis(shifted).unwrap_or_default(),
        };
        let mut scratch = String::new();
        render_instructions(&self.instructions, &ctx, out, &mut scratch);
    }
}

struct RenderContext<'a> {
    record: &'a LogRecord,
    options: &'a RenderOptions,
    time: DateTime<Utc>,
}

fn render_instructions(
    instructions: &[FormatInstruction],
    ctx: &RenderContext<'_>,
    out: &mut String,
    scratch: &mut String,
) {
    for instruction in instructions {
        match instruction {
            FormatInstruction::Literal { text, strip_ansi } => {
                if *strip_ansi {
                    strip_ansi_into(text, out);
                } else {
                    out.push_str(text);
                }
            }
            FormatInstruction::Fallback(group) => {
                if ctx.record.is_empty() {
                    render_instructions(group, ctx, out, scratch);
                }
            }
            FormatInstruction::Field {
                field,
                spec,
                strip_ansi,
            } => {
                if spec.width == 0 && !strip_ansi {
                    write_field(*field, ctx, out);
                    continue;
                }
                scratch.clear();
                write_field(*field, ctx, scratch);
                if *strip_ansi {
                    let raw = std::mem::take(scratch);
                    strip_ansi_into(&raw, scratch);
                }
                apply_spec(scratch, spec, out);
            }
        }
    }
}

/// Truncate then pad `text` to the field's width, counting `char`s.
fn apply_spec(text: &str, spec: &FieldSpec, out: &mut String) {
    let len = text.chars().count();
    if spec.truncate && len > spec.width {
        let cut = text
            .char_indices()
            .nth(spec.width)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        out.push_str(&text[..cut]);
        return;
    }
    let padding = spec.width.saturating_sub(len);
    let (left, right) = match spec.align {
        Align::Left => (0, padding),
        Align::Center => (padding / 2, padding - padding / 2),
        Align::Right => (padding, 0),
    };
    out.extend(std::iter::repeat(' ').take(left));
    out.push_str(text);
    out.extend(std::iter::repeat(' ').take(right));
}

fn write_field(field: Field, ctx: &RenderContext<'_>, out: &mut String) {
    let t = &ctx.time;
    let record = ctx.record;
    let _ = match field {
        Field::Year => write!(out, "{:04}", t.year()),
        Field::ShortYear => write!(out, "{:02}", t.year().rem_euclid(100)),
        Field::Month => write!(out, "{:02}", t.month()),
        Field::Day => write!(out, "{:02}", t.day()),
        Field::Hour => write!(out, "{:02}", t.hour()),
        Field::Minute => write!(out, "{:02}", t.minute()),
        Field::Second => write!(out, "{:02}", t.second()),
        Field::Millisecond => write!(out, "{:03}", t.timestamp_subsec_millis()),
        Field::EpochMillis => write!(out, "{}", record.timestamp_ms),
        Field::EpochSeconds => write!(out, "{}", record.timestamp_ms.div_euclid(1000)),
        Field::Iso8601 => write_iso8601(t, ctx.options.timestamp_offset_ms, out),
        Field::IsoDate => write!(out, "{:04}-{:02}-{:02}", t.year(), t.month(), t.day()),
        Field::ClockTime => write!(out, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()),
        Field::ShortDate => write!(
            out,
            "{:02}/{:02}/{:02}",
            t.month(),
            t.day(),
            t.year().rem_euclid(100)
        ),
        Field::CTime => write!(
            out,
            "{} {} {:>2} {:02}:{:02}:{:02} {}",
            &weekday_name(t)[..3],
            &month_name(t)[..3],
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
            t.year()
        ),
        Field::MonthAbbrev => write!(out, "{}", &month_name(t)[..3]),
        Field::MonthName => write!(out, "{}", month_name(t)),
        Field::WeekdayAbbrev => write!(out, "{}", &weekday_name(t)[..3]),
        Field::WeekdayName => write!(out, "{}", weekday_name(t)),
        Field::LevelWord => write!(out, "{}", record.level.to_str()),
        Field::LevelLetter => write!(out, "{}", record.level.letter()),
        Field::LevelNumber => write!(out, "{}", record.level.as_u8()),
        Field::FileName => write!(out, "{}", record.source.file_name()),
        Field::FilePath => write!(out, "{}", record.source.file),
        Field::RelativePath => write!(
            out,
            "{}",
            make_relative(&record.source.file, ctx.options.base_path.as_deref())
        ),
        Field::FileLine => {
            if record.source.file.is_empty() {
                Ok(())
            } else {
                write!(out, "{}:{}", record.source.file_name(), record.source.line)
            }
        }
        Field::Line => {
            if record.source.line == 0 {
                Ok(())
            } else {
                write!(out, "{}", record.source.line)
            }
        }
        Field::Function => write!(out, "{}", record.source.function),
        Field::Thread => write!(out, "{}", record.thread.label),
        Field::ColorStart => {
            record.level.color().write_ansi(out);
            Ok(())
        }
        Field::ColorEnd => {
            ctx.options.default_color.write_ansi(out);
            Ok(())
        }
        Field::Message => {
            write_message(&record.message, &record.args, out);
            Ok(())
        }
    };
}

fn month_name(t: &DateTime<Utc>) -> &'static str {
    MONTH_NAMES[t.month0() as usize]
}

fn weekday_name(t: &DateTime<Utc>) -> &'static str {
    WEEKDAY_NAMES[t.weekday().num_days_from_sunday() as usize]
}

fn write_iso8601(t: &DateTime<Utc>, offset_ms: i64, out: &mut String) -> std::fmt::Result {
    write!(
        out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}",
        t.year(),
        t.month(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.timestamp_subsec_millis()
    )?;
    if offset_ms == 0 {
        return out.write_char('Z');
    }
    let minutes = offset_ms / 60_000;
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    write!(out, "{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// `file` relative to `base`, or `file` unchanged when it is not under `base`.
pub fn make_relative<'a>(file: &'a str, base: Option<&str>) -> &'a str {
    let Some(base) = base.filter(|b| !b.is_empty()) else {
        return file;
    };
    let base = base.trim_end_matches(['/', '\\']);
    match file.strip_prefix(base) {
        Some(rest) if rest.starts_with(['/', '\\']) => &rest[1..],
        _ => file,
    }
}
