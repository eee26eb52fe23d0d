//! Typed values attached to a log record
//!
//! A [`VariableValue`] pairs an argument name with an owned [`Value`]. Values
//! never borrow from the caller, so a record can be rendered on a worker thread
//! after the logging call has returned.

use super::pattern::MAX_FIELD_WIDTH;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::time::{Duration, SystemTime};

/// Enumerator rendered through a static name table.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub value: i64,
    pub names: &'static [(i64, &'static str)],
}

impl EnumValue {
    pub fn name(&self) -> Option<&'static str> {
        self.names
            .iter()
            .find(|(value, _)| *value == self.value)
            .map(|(_, name)| *name)
    }
}

/// Error code captured by value: category name, numeric code and message.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCodeValue {
    pub category: String,
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Enum(EnumValue),
    Duration(Duration),
    TimePoint(DateTime<Utc>),
    /// Address only, never dereferenced
    Pointer(usize),
    Exception(String),
    ErrorCode(ErrorCodeValue),
}

impl Value {
    /// Whether this value renders bare (without `name: `) when appended.
    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Exception(_))
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    /// Append the default text form of the value.
    pub fn write_default(&self, out: &mut String) {
        let _ = match self {
            Value::Bool(b) => write!(out, "{}", b),
            Value::Char(c) => write!(out, "{}", c),
            Value::Int(i) => write!(out, "{}", i),
            Value::UInt(u) => write!(out, "{}", u),
            Value::Float(f) => write!(out, "{}", f),
            Value::Str(s) | Value::Exception(s) => write!(out, "{}", s),
            Value::Enum(e) => match e.name() {
                Some(name) => write!(out, "{}", name),
                None => write!(out, "{}", e.value),
            },
            Value::Duration(d) => write!(out, "{:?}", d),
            Value::TimePoint(t) => write!(out, "{}", t.format("%Y-%m-%d %H:%M:%S%.3f")),
            Value::Pointer(p) => write!(out, "{:#x}", p),
            Value::ErrorCode(e) => write!(out, "{} ({}:{})", e.message, e.category, e.code),
        };
    }

    /// Append the value rendered through `spec`.
    pub fn write_with_spec(&self, spec: &FormatSpec, out: &mut String) {
        let mut body = String::new();
        match (self, spec.ty) {
            (Value::Int(i), SpecType::LowerHex) => radix(&mut body, spec, "0x", format_args!("{:x}", i)),
            (Value::Int(i), SpecType::UpperHex) => radix(&mut body, spec, "0x", format_args!("{:X}", i)),
            (Value::Int(i), SpecType::Octal) => radix(&mut body, spec, "0o", format_args!("{:o}", i)),
            (Value::Int(i), SpecType::Binary) => radix(&mut body, spec, "0b", format_args!("{:b}", i)),
            (Value::UInt(u), SpecType::LowerHex) => radix(&mut body, spec, "0x", format_args!("{:x}", u)),
            (Value::UInt(u), SpecType::UpperHex) => radix(&mut body, spec, "0x", format_args!("{:X}", u)),
            (Value::UInt(u), SpecType::Octal) => radix(&mut body, spec, "0o", format_args!("{:o}", u)),
            (Value::UInt(u), SpecType::Binary) => radix(&mut body, spec, "0b", format_args!("{:b}", u)),
            (Value::Pointer(p), SpecType::UpperHex) => radix(&mut body, spec, "0x", format_args!("{:X}", p)),
            (Value::Float(f), SpecType::LowerExp) => match spec.precision {
                Some(p) => signed(&mut body, spec, *f >= 0.0, format_args!("{:.*e}", p, f)),
                None => signed(&mut body, spec, *f >= 0.0, format_args!("{:e}", f)),
            },
            (Value::Float(f), SpecType::UpperExp) => match spec.precision {
                Some(p) => signed(&mut body, spec, *f >= 0.0, format_args!("{:.*E}", p, f)),
                None => signed(&mut body, spec, *f >= 0.0, format_args!("{:E}", f)),
            },
            (Value::Float(f), _) => match spec.precision {
                Some(p) => signed(&mut body, spec, *f >= 0.0, format_args!("{:.*}", p, f)),
                None => signed(&mut body, spec, *f >= 0.0, format_args!("{}", f)),
            },
            (Value::Int(i), _) => signed(&mut body, spec, *i >= 0, format_args!("{}", i)),
            (Value::UInt(u), _) => signed(&mut body, spec, true, format_args!("{}", u)),
            (Value::Str(s), SpecType::Debug) => {
                let _ = write!(body, "{:?}", s);
            }
            (Value::Char(c), SpecType::Debug) => {
                let _ = write!(body, "{:?}", c);
            }
            _ => {
                self.write_default(&mut body);
                if let Some(p) = spec.precision {
                    if let Some((idx, _)) = body.char_indices().nth(p) {
                        body.truncate(idx);
                    }
                }
            }
        }
        spec.pad_into(&body, self.is_numeric(), out);
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Int(i) => Json::Number((*i).into()),
            Value::UInt(u) => Json::Number((*u).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) | Value::Exception(s) => Json::String(s.clone()),
            Value::Enum(e) => match e.name() {
                Some(name) => Json::String(name.to_string()),
                None => Json::Number(e.value.into()),
            },
            Value::Duration(d) => serde_json::Number::from_f64(d.as_secs_f64())
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::TimePoint(t) => Json::String(t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            Value::Pointer(p) => Json::String(format!("{:#x}", p)),
            Value::ErrorCode(e) => serde_json::json!({
                "category": e.category,
                "code": e.code,
                "message": e.message,
            }),
        }
    }
}

fn signed(body: &mut String, spec: &FormatSpec, non_negative: bool, digits: std::fmt::Arguments<'_>) {
    if spec.plus && non_negative {
        body.push('+');
    }
    let _ = body.write_fmt(digits);
}

fn radix(body: &mut String, spec: &FormatSpec, prefix: &str, digits: std::fmt::Arguments<'_>) {
    if spec.alternate {
        body.push_str(prefix);
    }
    let _ = body.write_fmt(digits);
}

macro_rules! impl_from_value {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )+
    };
}

impl_from_value!(Int as i64: i8, i16, i32, i64, isize);
impl_from_value!(UInt as u64: u8, u16, u32, u64, usize);
impl_from_value!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::TimePoint(t)
    }
}

impl From<SystemTime> for Value {
    fn from(t: SystemTime) -> Self {
        Value::TimePoint(t.into())
    }
}

impl From<&std::io::Error> for Value {
    fn from(err: &std::io::Error) -> Self {
        Value::ErrorCode(ErrorCodeValue {
            category: "io".to_string(),
            code: err.raw_os_error().unwrap_or(0),
            message: err.to_string(),
        })
    }
}

/// Named argument of a log record
#[derive(Debug, Clone, PartialEq)]
pub struct VariableValue {
    pub name: String,
    pub value: Value,
}

impl VariableValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Argument without a name
    pub fn unnamed(value: impl Into<Value>) -> Self {
        Self::new(String::new(), value)
    }

    pub fn pointer<T: ?Sized>(name: impl Into<String>, ptr: *const T) -> Self {
        Self::new(name, Value::Pointer(ptr as *const () as usize))
    }

    pub fn exception(name: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Self::new(name, Value::Exception(err.to_string()))
    }

    pub fn enumerator(
        name: impl Into<String>,
        value: i64,
        names: &'static [(i64, &'static str)],
    ) -> Self {
        Self::new(name, Value::Enum(EnumValue { value, names }))
    }

    pub fn error_code(
        name: impl Into<String>,
        category: impl Into<String>,
        code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Value::ErrorCode(ErrorCodeValue {
                category: category.into(),
                code,
                message: message.into(),
            }),
        )
    }

    /// True when the name looks like an identifier rather than a literal
    /// expression such as `42` or `"text"`.
    pub fn has_literal_name(&self) -> bool {
        self.name
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
    }

    /// Append `name: value` or just `value`, as used when arguments are
    /// listed after the message.
    pub fn write_listed(&self, out: &mut String) {
        if self.has_literal_name() && !self.value.is_textual() {
            out.push_str(&self.name);
            out.push_str(": ");
        }
        self.value.write_default(out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecType {
    Display,
    LowerHex,
    UpperHex,
    Octal,
    Binary,
    LowerExp,
    UpperExp,
    Debug,
}

/// Per-argument format spec: `[[fill]align][+][#][0][width][.precision][type]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<SpecAlign>,
    pub plus: bool,
    pub alternate: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub ty: SpecType,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            plus: false,
            alternate: false,
            zero: false,
            width: None,
            precision: None,
            ty: SpecType::Display,
        }
    }
}

fn align_of(c: char) -> Option<SpecAlign> {
    match c {
        '<' => Some(SpecAlign::Left),
        '^' => Some(SpecAlign::Center),
        '>' => Some(SpecAlign::Right),
        _ => None,
    }
}

impl FormatSpec {
    /// Parse the text after `:` in a `{:spec}` placeholder.
    ///
    /// Returns `None` for anything outside the supported grammar, including
    /// a width or precision above [`MAX_FIELD_WIDTH`].
    pub fn parse(spec: &str) -> Option<Self> {
        let mut result = FormatSpec::default();
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;

        if chars.len() >= 2 {
            if let Some(align) = align_of(chars[1]) {
                result.fill = chars[0];
                result.align = Some(align);
                i = 2;
            }
        }
        if result.align.is_none() {
            if let Some(align) = chars.first().copied().and_then(align_of) {
                result.align = Some(align);
                i = 1;
            }
        }
        if chars.get(i) == Some(&'+') {
            result.plus = true;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            result.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            result.zero = true;
            i += 1;
        }
        let (width, next) = parse_number(&chars, i)?;
        result.width = width;
        i = next;
        if chars.get(i) == Some(&'.') {
            let (precision, next) = parse_number(&chars, i + 1)?;
            result.precision = Some(precision?);
            i = next;
        }
        if let Some(&c) = chars.get(i) {
            result.ty = match c {
                'x' => SpecType::LowerHex,
                'X' => SpecType::UpperHex,
                'o' => SpecType::Octal,
                'b' => SpecType::Binary,
                'e' => SpecType::LowerExp,
                'E' => SpecType::UpperExp,
                '?' => SpecType::Debug,
                _ => return None,
            };
            i += 1;
        }
        let within_limit = |n: Option<usize>| n.map_or(true, |n| n <= MAX_FIELD_WIDTH);
        if !within_limit(result.width) || !within_limit(result.precision) {
            return None;
        }
        (i == chars.len()).then_some(result)
    }

    fn pad_into(&self, body: &str, numeric: bool, out: &mut String) {
        let len = body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            out.push_str(body);
            return;
        }
        let padding = width - len;

        if self.zero && numeric && self.align.is_none() {
            let split = body.find(|c: char| c.is_ascii_digit()).unwrap_or(0);
            let (sign, digits) = body.split_at(split);
            let radix_prefixed = self.alternate
                && matches!(self.ty, SpecType::LowerHex | SpecType::UpperHex | SpecType::Octal | SpecType::Binary);
            let (prefix, digits) = if radix_prefixed && digits.len() > 2 {
                digits.split_at(2)
            } else {
                ("", digits)
            };
            out.push_str(sign);
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(padding));
            out.push_str(digits);
            return;
        }

        let align = self
            .align
            .unwrap_or(if numeric { SpecAlign::Right } else { SpecAlign::Left });
        let (left, right) = match align {
            SpecAlign::Left => (0, padding),
            SpecAlign::Right => (padding, 0),
            SpecAlign::Center => (padding / 2, padding - padding / 2),
        };
        out.extend(std::iter::repeat(self.fill).take(left));
        out.push_str(body);
        out.extend(std::iter::repeat(self.fill).take(right));
    }
}

/// Returns the parsed number (if any digits were present) and the next index.
/// `None` when the number overflows.
fn parse_number(chars: &[char], start: usize) -> Option<(Option<usize>, usize)> {
    let mut i = start;
    let mut value: Option<usize> = None;
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        let current = value.unwrap_or(0);
        value = Some(current.checked_mul(10)?.checked_add(d as usize)?);
        i += 1;
    }
    Some((value, i))
}

/// Render a record's message body with its arguments.
///
/// `{}` and `{:spec}` placeholders consume arguments in order; arguments left
/// over are listed after the text, joined by `", "`.
pub fn write_message(message: &str, args: &[VariableValue], out: &mut String) {
    let mut next_arg = 0;
    let mut rest = message;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else if let Some(end) = tail.find('}') {
            let inner = &tail[1..end];
            let spec = if inner.is_empty() {
                Some(None)
            } else {
                inner.strip_prefix(':').map(Some)
            };
            match spec {
                Some(spec) => {
                    if let Some(arg) = args.get(next_arg) {
                        match spec.and_then(FormatSpec::parse) {
                            Some(spec) => arg.value.write_with_spec(&spec, out),
                            None => arg.value.write_default(out),
                        }
                    }
                    next_arg += 1;
                }
                None => out.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
        } else {
            out.push_str(tail);
            rest = "";
        }
    }
    out.push_str(rest);

    let mut leftover = args.iter().skip(next_arg).peekable();
    if leftover.peek().is_some() && !message.is_empty() {
        out.push(' ');
    }
    let mut first = true;
    for arg in leftover {
        if !first {
            out.push_str(", ");
        }
        first = false;
        arg.write_listed(out);
    }
}
