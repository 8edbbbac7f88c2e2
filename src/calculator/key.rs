//! Keys on the manual entry surface

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::operator::Operator;

/// A single key press, mapped 1:1 to a calculator operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    /// Digit 0-9 or the decimal point
    Digit(char),
    Operator(Operator),
    Equals,
    Clear,
    Delete,
    Percent,
}

/// Error returned for an unrecognized key label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0:?}")]
pub struct KeyParseError(pub String);

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let mut chars = label.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_digit() || c == '.' {
                return Ok(Key::Digit(c));
            }
        }

        match label.to_ascii_uppercase().as_str() {
            "=" | "ENTER" => Ok(Key::Equals),
            "C" | "AC" | "CLEAR" => Ok(Key::Clear),
            "DEL" | "BACKSPACE" => Ok(Key::Delete),
            "%" => Ok(Key::Percent),
            _ => label
                .parse::<Operator>()
                .map(Key::Operator)
                .map_err(|_| KeyParseError(label.to_string())),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Digit(c) => write!(f, "{}", c),
            Key::Operator(op) => write!(f, "{}", op.glyph()),
            Key::Equals => write!(f, "="),
            Key::Clear => write!(f, "C"),
            Key::Delete => write!(f, "DEL"),
            Key::Percent => write!(f, "%"),
        }
    }
}
