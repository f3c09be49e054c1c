//! Phone number domain logic.
//!
//! Pakistani mobile numbering plan: an optional `+92`/`92` country code or a
//! trunk `0`, an optional extra zero, the `3XX` operator code and a seven
//! digit subscriber number. Separators (whitespace, hyphens, parentheses) may
//! appear after each digit group.

use super::{PatternMatcher, PiiKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Pakistani mobile number pattern matcher.
///
/// Supports the forms seen on real resumes:
/// - 03005714594
/// - +923005714594
/// - 92-03005714594
/// - +92-300-5714594
/// - +92 300 5714594
/// - (0300)-5714594
#[derive(Debug, Clone)]
pub struct PhoneNumberMatcher;

impl PhoneNumberMatcher {
    /// Creates a new phone number matcher.
    pub fn new() -> Self {
        Self
    }

    fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?x)
                \(?
                (?:\+92|92|0)       # country code or trunk zero
                [\s\-()]*
                0?                  # +92-0300 style
                [\s\-()]*
                3\d{2}              # operator code
                [\s\-()]*
                \d{7}               # subscriber
                ",
            )
            .expect("Valid phone number regex")
        });
        &PATTERN
    }
}

impl Default for PhoneNumberMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher for PhoneNumberMatcher {
    fn kind(&self) -> PiiKind {
        PiiKind::Phone
    }

    fn pattern(&self) -> &Regex {
        Self::regex()
    }
}
