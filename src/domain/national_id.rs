//! National identity (CNIC) numbers in `NNNNN-NNNNNNN-N` form.

use super::{PatternMatcher, PiiKind};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct NationalIdMatcher;

impl NationalIdMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\d{5}-\d{7}-\d").expect("Valid national id regex"));
        &PATTERN
    }
}

impl Default for NationalIdMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher for NationalIdMatcher {
    fn kind(&self) -> PiiKind {
        PiiKind::NationalId
    }

    fn pattern(&self) -> &Regex {
        Self::regex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping() {
        let matcher = NationalIdMatcher::new();
        assert!(matcher.contains("CNIC: 35202-1234567-1"));
        assert!(!matcher.contains("3520212345671"));
        assert!(!matcher.contains("35202-123456-1"));
    }
}
