//! Number-word vocabulary

/// Closed vocabulary of spoken numbers the interpreter understands
const NUMBER_WORDS: &[(&str, f64)] = &[
    ("zero", 0.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
    ("thirteen", 13.0),
    ("fourteen", 14.0),
    ("fifteen", 15.0),
    ("twenty", 20.0),
    ("thirty", 30.0),
    ("forty", 40.0),
    ("fifty", 50.0),
    ("hundred", 100.0),
    ("thousand", 1000.0),
];

/// Look up a single lowercase word
pub fn word_value(word: &str) -> Option<f64> {
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary() {
        assert_eq!(word_value("zero"), Some(0.0));
        assert_eq!(word_value("fifteen"), Some(15.0));
        assert_eq!(word_value("forty"), Some(40.0));
        assert_eq!(word_value("thousand"), Some(1000.0));
        // Compound and unlisted words are not understood
        assert_eq!(word_value("sixteen"), None);
        assert_eq!(word_value("sixty"), None);
        assert_eq!(word_value("twenty-one"), None);
    }
}
