//! Log level definitions

use super::color::TextColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Single-letter form used by the `%L` directive
    pub fn letter(&self) -> char {
        match self {
            LogLevel::Trace => 'T',
            LogLevel::Debug => 'D',
            LogLevel::Info => 'I',
            LogLevel::Warn => 'W',
            LogLevel::Error => 'E',
            LogLevel::Fatal => 'F',
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn color(&self) -> TextColor {
        match self {
            LogLevel::Trace => TextColor::DarkGray,
            LogLevel::Debug => TextColor::Blue,
            LogLevel::Info => TextColor::Green,
            LogLevel::Warn => TextColor::Yellow,
            LogLevel::Error => TextColor::Red,
            LogLevel::Fatal => TextColor::Magenta,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" | "T" | "0" => Ok(LogLevel::Trace),
            "DEBUG" | "D" | "1" => Ok(LogLevel::Debug),
            "INFO" | "I" | "2" => Ok(LogLevel::Info),
            "WARN" | "WARNING" | "W" | "3" => Ok(LogLevel::Warn),
            "ERROR" | "E" | "4" => Ok(LogLevel::Error),
            "FATAL" | "F" | "5" => Ok(LogLevel::Fatal),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
