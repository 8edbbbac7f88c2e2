//! Arithmetic operators and their display vocabulary

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four binary operations the calculator supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// Glyph shown in the expression preview
    pub fn glyph(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }

    /// Name of the operation, e.g. "addition"
    pub fn noun(&self) -> &'static str {
        match self {
            Operator::Add => "addition",
            Operator::Subtract => "subtraction",
            Operator::Multiply => "multiplication",
            Operator::Divide => "division",
        }
    }

    /// Past-tense verb used in calculation summaries
    pub fn verb(&self) -> &'static str {
        match self {
            Operator::Add => "added",
            Operator::Subtract => "subtracted",
            Operator::Multiply => "multiplied",
            Operator::Divide => "divided",
        }
    }

    /// Preposition joining the two operands in a summary sentence
    pub fn preposition(&self) -> &'static str {
        match self {
            Operator::Subtract => "by",
            _ => "to",
        }
    }

    /// Apply the operator, returning `None` for division by exactly zero
    pub fn apply(&self, left: f64, right: f64) -> Option<f64> {
        match self {
            Operator::Add => Some(left + right),
            Operator::Subtract => Some(left - right),
            Operator::Multiply => Some(left * right),
            Operator::Divide if right == 0.0 => None,
            Operator::Divide => Some(left / right),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Error returned when a token is not an operator glyph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operator: {0:?}")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "-" | "−" => Ok(Operator::Subtract),
            "*" | "×" | "x" => Ok(Operator::Multiply),
            "/" | "÷" => Ok(Operator::Divide),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}
