//! Email address matching.

use super::{PatternMatcher, PiiKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Email matcher with an optional dotted suffix.
///
/// Bare `user@host` is accepted so that malformed entries on a resume are
/// still caught; occasional over-matching is the accepted cost.
#[derive(Debug, Clone)]
pub struct EmailMatcher;

impl EmailMatcher {
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+(?:\.[A-Za-z]{2,})?")
                .expect("Valid email regex")
        });
        &PATTERN
    }
}

impl Default for EmailMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher for EmailMatcher {
    fn kind(&self) -> PiiKind {
        PiiKind::Email
    }

    fn pattern(&self) -> &Regex {
        Self::regex()
    }
}
