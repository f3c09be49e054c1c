//! Redaction report returned to callers.

use super::compress::RecompressionOutcome;
use super::format::DocumentFormat;
use super::strategy::{StrategyOutcome, StrategyUsed, UnmaskedMatch};
use crate::domain::{MatchCounts, PiiKind, PiiMatch};
use serde::Serialize;
use std::fmt;

/// Reasons the output may still need a human look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartialRedactionWarning {
    /// A match was found in the text but could not be located on its page.
    Unmasked { page: usize, kind: PiiKind },
    /// Rasterized output was blanked by fixed regions instead of located matches.
    LowConfidence { reason: String },
    /// PII still matches in the output's text projection.
    Leakage { kind: PiiKind, count: usize },
    /// The output could not be read back for verification.
    VerificationFailed { reason: String },
}

impl fmt::Display for PartialRedactionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmasked { page, kind } => {
                write!(f, "{} match on page {} could not be located", kind, page)
            }
            Self::LowConfidence { reason } => write!(f, "low confidence: {}", reason),
            Self::Leakage { kind, count } => {
                write!(f, "{} {} match(es) remain in output", count, kind)
            }
            Self::VerificationFailed { reason } => write!(f, "verification failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedactionReport {
    pub format: DocumentFormat,
    pub strategy: StrategyUsed,
    pub found: MatchCounts,
    pub redacted: MatchCounts,
    pub regions_redacted: usize,
    pub unmasked: Vec<UnmaskedMatch>,
    pub pages_processed: usize,
    pub pages_modified: usize,
    pub low_confidence: bool,
    pub output_bytes: u64,
    /// Present when the output exceeded the size threshold.
    pub recompression: Option<RecompressionOutcome>,
    pub leakage: Vec<PiiMatch>,
    pub leakage_warning: bool,
    pub warnings: Vec<PartialRedactionWarning>,
}

impl RedactionReport {
    pub(crate) fn from_outcome(format: DocumentFormat, outcome: StrategyOutcome) -> Self {
        let mut warnings: Vec<PartialRedactionWarning> = outcome
            .unmasked
            .iter()
            .map(|u| PartialRedactionWarning::Unmasked {
                page: u.page,
                kind: u.kind,
            })
            .collect();
        if outcome.low_confidence {
            let reason = match &outcome.ocr_fallback_reason {
                Some(why) => format!("baseline regions used ({})", why),
                None => "baseline regions used".to_string(),
            };
            warnings.push(PartialRedactionWarning::LowConfidence { reason });
        }

        Self {
            format,
            strategy: outcome.strategy,
            found: outcome.found,
            redacted: outcome.redacted,
            regions_redacted: outcome.regions_redacted,
            unmasked: outcome.unmasked,
            pages_processed: outcome.pages_processed,
            pages_modified: outcome.pages_modified,
            low_confidence: outcome.low_confidence,
            output_bytes: 0,
            recompression: None,
            leakage: Vec::new(),
            leakage_warning: false,
            warnings,
        }
    }

    /// Records residual matches found by verification.
    pub(crate) fn set_leakage(&mut self, leakage: Vec<PiiMatch>) {
        for kind in PiiKind::ALL {
            let count = leakage.iter().filter(|m| m.kind == kind).count();
            if count > 0 {
                self.warnings
                    .push(PartialRedactionWarning::Leakage { kind, count });
            }
        }
        self.leakage_warning = !leakage.is_empty();
        self.leakage = leakage;
    }

    pub(crate) fn verification_failed(&mut self, reason: impl Into<String>) {
        self.leakage_warning = true;
        self.warnings.push(PartialRedactionWarning::VerificationFailed {
            reason: reason.into(),
        });
    }

    /// Total matches found across kinds.
    pub fn total_found(&self) -> usize {
        self.found.total()
    }

    pub fn total_redacted(&self) -> usize {
        self.redacted.total()
    }

    pub fn recompressed(&self) -> bool {
        self.recompression.as_ref().map_or(false, |r| r.applied)
    }

    /// True when the output should not be shared without a manual check.
    pub fn requires_review(&self) -> bool {
        self.leakage_warning || self.low_confidence || !self.unmasked.is_empty()
    }
}

/// One distinct match on a page and how many times the page can locate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchLocation {
    pub kind: PiiKind,
    pub text: String,
    pub occurrences: usize,
    pub located: usize,
}

impl MatchLocation {
    pub fn is_located(&self) -> bool {
        self.located > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageAnalysis {
    pub page: usize,
    pub text_chars: usize,
    pub images: usize,
    pub matches: Vec<MatchLocation>,
}

/// Dry-run view of a document: what would be found, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentAnalysis {
    pub format: DocumentFormat,
    pub image_based: bool,
    pub pages: Vec<PageAnalysis>,
}

impl DocumentAnalysis {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            image_based: false,
            pages: Vec::new(),
        }
    }

    pub fn total_matches(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| &p.matches)
            .map(|m| m.occurrences)
            .sum()
    }

    /// Matches whose text cannot be found on their page.
    pub fn unlocatable(&self) -> impl Iterator<Item = (usize, &MatchLocation)> {
        self.pages
            .iter()
            .flat_map(|p| p.matches.iter().map(move |m| (p.page, m)))
            .filter(|(_, m)| !m.is_located())
    }
}
