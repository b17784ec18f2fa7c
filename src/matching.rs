//! Lookup and completion results.

/// One result of a lookup or completion.
///
/// Matches own their strings and carry no reference back to the dictionary
/// that produced them. An empty Match stands for "no key matched"; all of its
/// accessors return defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match {
    found: bool,
    start: usize,
    end: usize,
    matched: String,
    score: f64,
    value: String,
}

impl Match {
    pub fn new(matched: String, start: usize, end: usize, score: f64, value: String) -> Self {
        Self {
            found: true,
            start,
            end,
            matched,
            score,
            value,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.found
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Decoded payload of the matched key.
    pub fn value_as_string(&self) -> &str {
        &self.value
    }

    /// The full matched key (for completions: prefix plus completed suffix).
    pub fn matched_string(&self) -> &str {
        &self.matched
    }

    /// Byte offset where the match starts in the queried string.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the end of the match.
    pub fn end(&self) -> usize {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_match_defaults() {
        let m = Match::empty();
        assert!(m.is_empty());
        assert_eq!(m.score(), 0.0);
        assert_eq!(m.value_as_string(), "");
        assert_eq!(m.matched_string(), "");
        assert_eq!((m.start(), m.end()), (0, 0));
    }

    #[test]
    fn found_match_accessors() {
        let m = Match::new("car".to_string(), 0, 3, 3.0, "v2".to_string());
        assert!(!m.is_empty());
        assert_eq!(m.matched_string(), "car");
        assert_eq!(m.value_as_string(), "v2");
        assert_eq!(m.score(), 3.0);
        assert_eq!(m.end() - m.start(), 3);
    }

    #[test]
    fn empty_key_is_not_an_empty_match() {
        let m = Match::new(String::new(), 0, 0, 1.0, String::new());
        assert!(!m.is_empty());
        assert_ne!(m, Match::empty());
    }
}
