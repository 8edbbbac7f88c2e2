//! Human-readable summaries of finished calculations
//!
//! Both functions take a [`Calculation`], which only exists for numeric
//! results, so no summary can be produced for a division by zero.

use crate::calculator::{format_number, Calculation};

/// Summary for a calculation triggered by voice input
pub fn voice_summary(calc: &Calculation, utterance: &str) -> String {
    format!(
        "Voice Input Detected: \"{}\"\n\nI understood you wanted to perform {}: {}.",
        utterance,
        calc.operator.noun(),
        calc.equation()
    )
}

/// Summary shown after any compute, manual or voice-driven
pub fn calculation_summary(calc: &Calculation) -> String {
    format!(
        "Calculation Summary:\n\nYou {} {} {} {} using {}.\nResult: {}.",
        calc.operator.verb(),
        format_number(calc.left),
        calc.operator.preposition(),
        format_number(calc.right),
        calc.operator.noun(),
        format_number(calc.result)
    )
}
