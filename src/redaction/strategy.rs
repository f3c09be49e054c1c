//! Per-format redactor trait and the outcome it reports back to the router.

use crate::domain::{MatchCounts, PiiKind};
use crate::error::RedactorResult;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Which strategy actually produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyUsed {
    /// Native text layer: search, remove, restamp.
    Text,
    /// Rasterized pages, fixed regions blanked.
    ImageBaseline,
    /// Rasterized pages, OCR-located matches blanked.
    ImageOcr,
    /// Word-processing XML rewritten in place.
    StructuredXml,
}

impl StrategyUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyUsed::Text => "text",
            StrategyUsed::ImageBaseline => "image-baseline",
            StrategyUsed::ImageOcr => "image-ocr",
            StrategyUsed::StructuredXml => "structured-xml",
        }
    }
}

impl fmt::Display for StrategyUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A match that was found in the text projection but could not be located
/// on the page, so it is still present in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmaskedMatch {
    /// 1-based page number.
    pub page: usize,
    pub kind: PiiKind,
    pub text: String,
}

/// What a single format redactor did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: StrategyUsed,
    pub found: MatchCounts,
    pub redacted: MatchCounts,
    pub regions_redacted: usize,
    pub unmasked: Vec<UnmaskedMatch>,
    pub pages_processed: usize,
    pub pages_modified: usize,
    /// Set when the output was produced by heuristics rather than by
    /// locating every match.
    pub low_confidence: bool,
    /// Why OCR was skipped, when the image path fell back to the baseline.
    pub ocr_fallback_reason: Option<String>,
}

impl StrategyOutcome {
    pub fn new(strategy: StrategyUsed) -> Self {
        Self {
            strategy,
            found: MatchCounts::default(),
            redacted: MatchCounts::default(),
            regions_redacted: 0,
            unmasked: Vec::new(),
            pages_processed: 0,
            pages_modified: 0,
            low_confidence: false,
            ocr_fallback_reason: None,
        }
    }

    pub fn has_redactions(&self) -> bool {
        self.regions_redacted > 0 || self.redacted.total() > 0
    }
}

/// Redacts one document format end to end.
///
/// Implementations write a complete, valid document of the same format to
/// `output`, using `scratch` for any intermediate files.
pub trait DocumentRedactor: Send + Sync {
    fn redact(&self, input: &Path, output: &Path, scratch: &Path) -> RedactorResult<StrategyOutcome>;

    /// Text projection used for detection and post-redaction verification.
    fn extract_text(&self, input: &Path) -> RedactorResult<String>;

    fn name(&self) -> &str;
}
