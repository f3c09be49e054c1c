//! Process-wide catalog of compiled PII matchers.
//!
//! The catalog is built once on first use and is read-only afterwards, so it
//! is shared freely between concurrent redaction calls.

use super::{EmailMatcher, NationalIdMatcher, PatternMatcher, PhoneNumberMatcher, PiiKind};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::borrow::Cow;

/// A detected PII instance in a text projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PiiMatch {
    pub kind: PiiKind,
    pub text: String,
}

/// Substitute strings inserted in place of redacted PII.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholders {
    pub phone: String,
    pub email: String,
    pub national_id: String,
}

impl Placeholders {
    pub fn for_kind(&self, kind: PiiKind) -> &str {
        match kind {
            PiiKind::Phone => &self.phone,
            PiiKind::Email => &self.email,
            PiiKind::NationalId => &self.national_id,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        [self.phone.as_str(), self.email.as_str(), self.national_id.as_str()].into_iter()
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            phone: "+92-300-0000000".to_string(),
            email: "hidden@email.com".to_string(),
            national_id: "00000-0000000-0".to_string(),
        }
    }
}

/// Per-kind match counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub phone: usize,
    pub email: usize,
    pub national_id: usize,
}

impl MatchCounts {
    pub fn add(&mut self, kind: PiiKind, n: usize) {
        match kind {
            PiiKind::Phone => self.phone += n,
            PiiKind::Email => self.email += n,
            PiiKind::NationalId => self.national_id += n,
        }
    }

    pub fn get(&self, kind: PiiKind) -> usize {
        match kind {
            PiiKind::Phone => self.phone,
            PiiKind::Email => self.email,
            PiiKind::NationalId => self.national_id,
        }
    }

    pub fn total(&self) -> usize {
        self.phone + self.email + self.national_id
    }

    pub fn merge(&mut self, other: &MatchCounts) {
        self.phone += other.phone;
        self.email += other.email;
        self.national_id += other.national_id;
    }
}

/// The three matchers, applied in a fixed order: national id, phone, email.
///
/// National ids run first so a phone-shaped digit run inside an id cannot
/// be half-substituted before the id itself is.
#[derive(Debug)]
pub struct PatternCatalog {
    national_id: NationalIdMatcher,
    phone: PhoneNumberMatcher,
    email: EmailMatcher,
}

impl PatternCatalog {
    /// Returns the shared, lazily compiled catalog.
    pub fn global() -> &'static PatternCatalog {
        static CATALOG: Lazy<PatternCatalog> = Lazy::new(|| PatternCatalog {
            national_id: NationalIdMatcher::new(),
            phone: PhoneNumberMatcher::new(),
            email: EmailMatcher::new(),
        });
        &CATALOG
    }

    pub fn matchers(&self) -> [&dyn PatternMatcher; 3] {
        [&self.national_id, &self.phone, &self.email]
    }

    pub fn matcher(&self, kind: PiiKind) -> &dyn PatternMatcher {
        match kind {
            PiiKind::Phone => &self.phone,
            PiiKind::Email => &self.email,
            PiiKind::NationalId => &self.national_id,
        }
    }

    /// All matches of all kinds, grouped by kind in catalog order and in text
    /// order within a kind.
    pub fn find_all(&self, text: &str) -> Vec<PiiMatch> {
        self.matchers()
            .iter()
            .flat_map(|m| {
                let kind = m.kind();
                m.find_all(text).into_iter().map(move |s| PiiMatch {
                    kind,
                    text: s.to_string(),
                })
            })
            .collect()
    }

    /// First kind (in catalog order) whose pattern occurs in `token`.
    pub fn classify(&self, token: &str) -> Option<PiiKind> {
        self.matchers()
            .iter()
            .find(|m| m.contains(token))
            .map(|m| m.kind())
    }

    /// Replaces every match with the placeholder for its kind.
    pub fn substitute<'a>(
        &self,
        text: &'a str,
        placeholders: &Placeholders,
    ) -> (Cow<'a, str>, MatchCounts) {
        let mut counts = MatchCounts::default();
        let mut current: Cow<'a, str> = Cow::Borrowed(text);
        for matcher in self.matchers() {
            let kind = matcher.kind();
            let (replaced, n) = matcher.substitute(&current, placeholders.for_kind(kind));
            if n > 0 {
                counts.add(kind, n);
                current = Cow::Owned(replaced.into_owned());
            }
        }
        (current, counts)
    }

    /// Matches that survive once the inserted placeholders are discounted.
    pub fn residual(&self, text: &str, placeholders: &Placeholders) -> Vec<PiiMatch> {
        let mut scrubbed = text.to_string();
        for placeholder in placeholders.iter().filter(|p| !p.is_empty()) {
            scrubbed = scrubbed.replace(placeholder, " ");
        }
        self.find_all(&scrubbed)
            .into_iter()
            .filter(|m| m.text.trim() != placeholders.for_kind(m.kind))
            .collect()
    }
}
