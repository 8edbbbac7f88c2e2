//! Transcript interpreter
//!
//! Turns a free-text utterance such as "five plus two" or "12 divided by 4"
//! into a [`ParsedCommand`]. Interpretation never fails hard: anything that
//! cannot be read as "number operator number" comes back as [`NoCommand`].

mod words;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calculator::Operator;

use words::word_value;

/// Hint shown when an utterance could not be interpreted
pub const USAGE_HINT: &str = "Say: 5 plus 2";

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(\.[0-9]+)?").expect("invalid decimal regex"));

static DECIMAL_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("invalid decimal token regex")
});

/// How an operator keyword is matched against the utterance
#[derive(Debug, Clone, Copy)]
enum Keyword {
    /// Anywhere in the text ("added" also matches "add")
    Contains(&'static str),
    /// As a whole whitespace-separated token
    Token(&'static str),
}

/// Operator keyword categories, in priority order.
///
/// The first category with any match wins, regardless of where in the
/// utterance the keyword appears.
const OPERATOR_KEYWORDS: &[(Operator, &[Keyword])] = &[
    (
        Operator::Add,
        &[
            Keyword::Contains("plus"),
            Keyword::Contains("add"),
            Keyword::Contains("added"),
        ],
    ),
    (
        Operator::Subtract,
        &[
            Keyword::Contains("minus"),
            Keyword::Contains("subtract"),
            Keyword::Contains("subtracted"),
        ],
    ),
    (
        Operator::Multiply,
        &[
            Keyword::Contains("times"),
            Keyword::Contains("multiply"),
            Keyword::Contains("multiplied"),
            Keyword::Token("x"),
        ],
    ),
    (
        Operator::Divide,
        &[
            Keyword::Contains("divide"),
            Keyword::Contains("divided"),
            Keyword::Contains("over"),
        ],
    ),
];

/// A successfully interpreted arithmetic command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub left: f64,
    pub right: f64,
    pub operator: Operator,
    /// The utterance the command was read from
    pub raw_text: String,
}

/// Why an utterance did not yield a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoCommand {
    #[error("no operator keyword in utterance")]
    MissingOperator,

    #[error("expected two numbers, found {found}")]
    MissingOperands { found: usize },
}

/// Interpret an utterance as `left operator right`
pub fn interpret(utterance: &str) -> Result<ParsedCommand, NoCommand> {
    let text = utterance.trim().to_lowercase();

    let operator = find_operator(&text).ok_or(NoCommand::MissingOperator)?;

    let numbers = extract_numbers(&text);
    match numbers.as_slice() {
        [left, right, ..] => Ok(ParsedCommand {
            left: *left,
            right: *right,
            operator,
            raw_text: utterance.trim().to_string(),
        }),
        _ => Err(NoCommand::MissingOperands {
            found: numbers.len(),
        }),
    }
}

/// Select the operator by fixed category priority
fn find_operator(text: &str) -> Option<Operator> {
    OPERATOR_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| keyword_matches(text, *k)))
        .map(|(op, _)| *op)
}

fn keyword_matches(text: &str, keyword: Keyword) -> bool {
    match keyword {
        Keyword::Contains(word) => text.contains(word),
        Keyword::Token(word) => text.split_whitespace().any(|t| t == word),
    }
}

/// Numbers in order of appearance
///
/// Digit sequences are preferred. With fewer than two of them the utterance
/// is re-read token by token so spoken number words count too.
fn extract_numbers(text: &str) -> Vec<f64> {
    let digits: Vec<f64> = DECIMAL_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if digits.len() >= 2 {
        return digits;
    }

    let words: Vec<f64> = text
        .split_whitespace()
        .filter_map(token_value)
        .take(2)
        .collect();
    if words.len() >= 2 {
        words
    } else {
        digits
    }
}

/// Value of a single token: a number word or a plain decimal literal
fn token_value(token: &str) -> Option<f64> {
    let cleaned = token.replace([',', '?'], "");
    let cleaned = cleaned.trim().trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    if DECIMAL_TOKEN_RE.is_match(cleaned) {
        return cleaned.parse().ok();
    }
    word_value(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> ParsedCommand {
        interpret(text).unwrap()
    }

    #[test]
    fn test_digits() {
        let cmd = parsed("12 divided by 4");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (12.0, 4.0, Operator::Divide));
        assert_eq!(cmd.raw_text, "12 divided by 4");
    }

    #[test]
    fn test_decimals() {
        let cmd = parsed("what is 2.5 times 4");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (2.5, 4.0, Operator::Multiply));
    }

    #[test]
    fn test_number_words() {
        let cmd = parsed("five plus two");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (5.0, 2.0, Operator::Add));

        let cmd = parsed("Fifty Minus Twenty");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (50.0, 20.0, Operator::Subtract));
    }

    #[test]
    fn test_mixed_digits_and_words() {
        let cmd = parsed("5 times three");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (5.0, 3.0, Operator::Multiply));
    }

    #[test]
    fn test_punctuation_in_tokens() {
        let cmd = parsed("what is ten, over two?");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (10.0, 2.0, Operator::Divide));

        let cmd = parsed("add one and two.");
        assert_eq!((cmd.left, cmd.right), (1.0, 2.0));
    }

    #[test]
    fn test_first_two_numbers_win() {
        let cmd = parsed("3 plus 4 plus 5");
        assert_eq!((cmd.left, cmd.right), (3.0, 4.0));
    }

    #[test]
    fn test_category_priority_not_text_order() {
        // "minus" is spoken first but Add is checked first
        let cmd = parsed("8 minus 2 plus");
        assert_eq!(cmd.operator, Operator::Add);

        let cmd = parsed("9 divided by 3 times");
        assert_eq!(cmd.operator, Operator::Multiply);
    }

    #[test]
    fn test_x_keyword_is_a_standalone_token() {
        let cmd = parsed("7 x 6");
        assert_eq!(cmd.operator, Operator::Multiply);

        // "six" contains an x but does not mean multiply
        let cmd = parsed("ten divided by six");
        assert_eq!((cmd.left, cmd.right, cmd.operator), (10.0, 6.0, Operator::Divide));
    }

    #[test]
    fn test_non_ascii_digits_are_not_numbers() {
        // Arabic-Indic three is skipped, so the ASCII operands still pair up
        let cmd = parsed("\u{0663} 4 plus 5");
        assert_eq!((cmd.left, cmd.right), (4.0, 5.0));

        assert_eq!(
            interpret("\u{0663} plus \u{0664}"),
            Err(NoCommand::MissingOperands { found: 0 })
        );
    }

    #[test]
    fn test_missing_operator() {
        assert_eq!(interpret("5 and 2"), Err(NoCommand::MissingOperator));
        assert_eq!(interpret(""), Err(NoCommand::MissingOperator));
    }

    #[test]
    fn test_missing_operands() {
        assert_eq!(
            interpret("5 plus"),
            Err(NoCommand::MissingOperands { found: 1 })
        );
        assert_eq!(
            interpret("plus minus"),
            Err(NoCommand::MissingOperands { found: 0 })
        );
        assert_eq!(
            interpret("sixteen plus seventeen"),
            Err(NoCommand::MissingOperands { found: 0 })
        );
    }

    #[test]
    fn test_no_command_messages() {
        assert_eq!(
            NoCommand::MissingOperands { found: 1 }.to_string(),
            "expected two numbers, found 1"
        );
        assert_eq!(
            NoCommand::MissingOperator.to_string(),
            "no operator keyword in utterance"
        );
    }
}
