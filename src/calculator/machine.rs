//! Calculator state machine
//!
//! Holds the operand being entered, an optional pending operation, and the
//! fresh-entry flag. Manual key presses and interpreted voice commands both
//! go through the same entry points, so a spoken "five plus two" and the key
//! sequence `5 + 2 =` leave the calculator in the same state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interpreter::ParsedCommand;

use super::key::Key;
use super::operator::Operator;

/// Text shown in place of a quotient when the divisor is zero
pub const DIVISION_SENTINEL: &str = "Error";

/// Value line shown on a fresh calculator
const INITIAL_VALUE: &str = "0";

/// A finished calculation with a numeric result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub left: f64,
    pub right: f64,
    pub operator: Operator,
    pub result: f64,
}

impl Calculation {
    /// Render as `l op r = result`
    pub fn equation(&self) -> String {
        format!(
            "{} {} {} = {}",
            format_number(self.left),
            self.operator.glyph(),
            format_number(self.right),
            format_number(self.result)
        )
    }
}

/// Outcome of applying a pending operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComputeOutcome {
    /// Numeric result, rounded to 8 decimal places
    Value(Calculation),
    /// Divisor was exactly zero; the value line shows the sentinel
    DivisionByZero { left: f64 },
}

/// Calculator state owned by a single controller
#[derive(Debug, Clone, PartialEq)]
pub struct Calculator {
    /// Operand being entered, as displayed
    current: String,
    /// Left operand and operator awaiting a right operand
    pending: Option<(f64, Operator)>,
    /// Next digit replaces `current` instead of extending it
    awaiting_fresh_entry: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    /// Create a calculator showing "0" with nothing pending
    pub fn new() -> Self {
        Self {
            current: INITIAL_VALUE.to_string(),
            pending: None,
            awaiting_fresh_entry: false,
        }
    }

    /// Operand text currently on the value line
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Numeric value of the current operand (NaN if it is not a number)
    pub fn current_value(&self) -> f64 {
        parse_number(&self.current)
    }

    #[cfg(test)]
    pub fn pending_operand(&self) -> Option<f64> {
        self.pending.map(|(operand, _)| operand)
    }

    #[cfg(test)]
    pub fn pending_operator(&self) -> Option<Operator> {
        self.pending.map(|(_, op)| op)
    }

    #[cfg(test)]
    pub fn awaiting_fresh_entry(&self) -> bool {
        self.awaiting_fresh_entry
    }

    /// Enter a digit or decimal point
    pub fn append_digit(&mut self, digit: char) {
        if self.awaiting_fresh_entry {
            self.current = if digit == '.' {
                "0.".to_string()
            } else {
                digit.to_string()
            };
            self.awaiting_fresh_entry = false;
            return;
        }

        if digit == '.' {
            if !self.current.contains('.') {
                self.current.push('.');
            }
        } else if self.current == INITIAL_VALUE {
            self.current = digit.to_string();
        } else {
            self.current.push(digit);
        }
    }

    /// Select an operator, applying any pending operation first
    ///
    /// Returns the outcome of the implicit compute when operations are
    /// chained (`5 + 3 ×` computes `8` before storing `×`).
    pub fn set_operator(&mut self, op: Operator) -> Option<ComputeOutcome> {
        let chained = if self.pending.is_some() && !self.awaiting_fresh_entry {
            self.compute()
        } else {
            None
        };

        self.pending = Some((self.current_value(), op));
        self.awaiting_fresh_entry = true;
        chained
    }

    /// Apply the pending operation to the current operand
    ///
    /// Returns `None` without touching state when nothing is pending.
    pub fn compute(&mut self) -> Option<ComputeOutcome> {
        let (left, operator) = self.pending.take()?;
        let right = self.current_value();

        let outcome = match operator.apply(left, right) {
            Some(raw) => {
                let result = round_to_precision(raw);
                self.current = format_number(result);
                ComputeOutcome::Value(Calculation {
                    left,
                    right,
                    operator,
                    result,
                })
            }
            None => {
                self.current = DIVISION_SENTINEL.to_string();
                ComputeOutcome::DivisionByZero { left }
            }
        };

        self.awaiting_fresh_entry = true;
        debug!(?outcome, "computed");
        Some(outcome)
    }

    /// Reset to the initial state
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Remove the last character of the current operand
    pub fn delete_last_digit(&mut self) {
        let mut chars = self.current.chars();
        chars.next_back();
        if chars.as_str().is_empty() {
            self.current = INITIAL_VALUE.to_string();
        } else {
            self.current = chars.as_str().to_string();
        }
    }

    /// Replace the current operand with one hundredth of its value
    pub fn percent(&mut self) {
        self.current = format_number(self.current_value() / 100.0);
    }

    /// Dispatch a manual key press to its operation
    pub fn press(&mut self, key: Key) -> Option<ComputeOutcome> {
        match key {
            Key::Digit(d) => {
                self.append_digit(d);
                None
            }
            Key::Operator(op) => self.set_operator(op),
            Key::Equals => self.compute(),
            Key::Clear => {
                self.clear();
                None
            }
            Key::Delete => {
                self.delete_last_digit();
                None
            }
            Key::Percent => {
                self.percent();
                None
            }
        }
    }

    /// Put a value on the value line as if it had been typed
    pub fn load_operand(&mut self, value: f64) {
        self.current = format_number(value);
        self.awaiting_fresh_entry = false;
    }

    /// Drive an interpreted command through the manual entry points
    ///
    /// Any operation left pending from manual entry is discarded first, so
    /// the spoken command is evaluated on its own.
    pub fn apply_command(&mut self, command: &ParsedCommand) -> Option<ComputeOutcome> {
        self.pending = None;
        self.load_operand(command.left);
        self.set_operator(command.operator);
        self.load_operand(command.right);
        self.compute()
    }

    /// Pending expression preview
    ///
    /// `"prev op current"` while an operator is pending (current left blank
    /// until it is entered), otherwise the operand being typed. A default "0"
    /// renders as nothing.
    pub fn expression(&self) -> String {
        match self.pending {
            Some((operand, op)) => {
                let right = if self.awaiting_fresh_entry {
                    ""
                } else {
                    self.current.as_str()
                };
                format!("{} {} {}", format_number(operand), op.glyph(), right)
                    .trim_end()
                    .to_string()
            }
            None if !self.awaiting_fresh_entry && self.current != INITIAL_VALUE => {
                self.current.clone()
            }
            None => String::new(),
        }
    }
}

/// Round half-up to 8 decimal places
pub fn round_to_precision(value: f64) -> f64 {
    const SCALE: f64 = 1e8;
    if !value.is_finite() {
        return value;
    }
    let scaled = value * SCALE;
    let floor = scaled.floor();
    // scaled - floor is exact, unlike scaled + 0.5 near 2^52
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / SCALE
}

/// Parse operand text, yielding NaN for anything that is not a number
pub fn parse_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a value the way the value line shows it
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}
