//! Calculator module
//!
//! Provides the calculator state machine driven by both manual key presses
//! and interpreted voice commands:
//! - Operator: the four binary operations and their wording
//! - Key: the manual entry surface
//! - Calculator: operand entry, chaining, compute, clear, delete, percent

mod key;
mod machine;
mod operator;

pub use key::Key;
pub use machine::{format_number, Calculation, Calculator, ComputeOutcome};
pub use operator::Operator;
