//! Terminal color table and escape-sequence helpers

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// The sixteen console colors understood by pattern color directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextColor {
    Black,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    LightGray,
    DarkGray,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    #[default]
    White,
}

impl TextColor {
    pub fn to_colored(self) -> colored::Color {
        use colored::Color::*;
        match self {
            TextColor::Black => Black,
            TextColor::DarkRed => Red,
            TextColor::DarkGreen => Green,
            TextColor::DarkYellow => Yellow,
            TextColor::DarkBlue => Blue,
            TextColor::DarkMagenta => Magenta,
            TextColor::DarkCyan => Cyan,
            TextColor::LightGray => White,
            TextColor::DarkGray => BrightBlack,
            TextColor::Red => BrightRed,
            TextColor::Green => BrightGreen,
            TextColor::Yellow => BrightYellow,
            TextColor::Blue => BrightBlue,
            TextColor::Magenta => BrightMagenta,
            TextColor::Cyan => BrightCyan,
            TextColor::White => BrightWhite,
        }
    }

    /// Append the foreground escape sequence for this color to `out`.
    pub fn write_ansi(self, out: &mut String) {
        let _ = write!(out, "\x1b[{}m", self.to_colored().to_fg_str());
    }

    /// Escape sequence for this color as an owned string.
    pub fn ansi(self) -> String {
        let mut out = String::with_capacity(5);
        self.write_ansi(&mut out);
        out
    }
}

/// Remove every `ESC [ ... <letter>` sequence from `text`.
///
/// An unterminated sequence at the end of the input is dropped entirely.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    strip_ansi_into(text, &mut out);
    out
}

/// Like [`strip_ansi`], appending into an existing buffer.
pub fn strip_ansi_into(text: &str, out: &mut String) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
}
