//! Domain models and business logic for PII pattern matching.
//!
//! Detection is purely pattern based over a fixed locale: Pakistani mobile
//! numbers, a deliberately permissive email grammar, and CNIC national
//! identity numbers. Recall is preferred over precision throughout.

pub mod catalog;
pub mod email;
pub mod national_id;
pub mod phone;

pub use catalog::{MatchCounts, PatternCatalog, PiiMatch, Placeholders};
pub use email::EmailMatcher;
pub use national_id::NationalIdMatcher;
pub use phone::PhoneNumberMatcher;

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Category of a detected PII instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PiiKind {
    Phone,
    Email,
    NationalId,
}

impl PiiKind {
    pub const ALL: [PiiKind; 3] = [PiiKind::NationalId, PiiKind::Phone, PiiKind::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiKind::Phone => "phone",
            PiiKind::Email => "email",
            PiiKind::NationalId => "national-id",
        }
    }
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for pattern matching strategies.
pub trait PatternMatcher: Send + Sync {
    fn kind(&self) -> PiiKind;

    fn pattern(&self) -> &Regex;

    /// All non-overlapping matches in text order.
    fn find_all<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.pattern().find_iter(text).map(|m| m.as_str()).collect()
    }

    fn contains(&self, text: &str) -> bool {
        self.pattern().is_match(text)
    }

    /// Replaces every match with `replacement`, returning the new text and
    /// the number of substitutions.
    fn substitute<'a>(&self, text: &'a str, replacement: &str) -> (Cow<'a, str>, usize) {
        let count = self.pattern().find_iter(text).count();
        if count == 0 {
            return (Cow::Borrowed(text), 0);
        }
        let replaced = self
            .pattern()
            .replace_all(text, regex::NoExpand(replacement));
        (replaced, count)
    }
}
