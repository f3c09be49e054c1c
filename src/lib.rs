//! Destructive PII redaction for résumé documents.
//!
//! Phone numbers, email addresses and national identity numbers are removed
//! from PDF and DOCX résumés and replaced with fixed placeholders. Removal is
//! destructive: PDF text under a match is deleted from the content stream by
//! MuPDF, not merely covered, and DOCX runs are rewritten in the XML itself.
//!
//! # Features
//!
//! - **Text-layer PDFs**: located matches are removed and restamped with a placeholder
//! - **Scanned PDFs**: OCR-located matches are blanked, with a fixed-region
//!   baseline when Tesseract is unavailable
//! - **DOCX**: split runs are merged per paragraph before matching
//! - **Verification**: every output is re-extracted and checked for leakage
//! - **Size control**: oversized PDF outputs have their images recompressed
//!
//! # Architecture
//!
//! - [`domain`]: PII pattern matchers and the shared catalog
//! - [`redaction`]: format routing, per-format redactors, and the service layer
//! - [`config`]: tunables with environment overrides
//! - [`error`]: error taxonomy
//!
//! # Quick Start
//!
//! ```no_run
//! use resume_redactor::RedactionService;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RedactionService::with_defaults();
//! let report = service.redact(Path::new("cv.pdf"), Path::new("cv.redacted.pdf"))?;
//!
//! println!("{} of {} matches redacted", report.total_redacted(), report.total_found());
//! if report.requires_review() {
//!     for warning in &report.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pattern Matching
//!
//! ```
//! use resume_redactor::domain::{PatternMatcher, PhoneNumberMatcher};
//!
//! let matcher = PhoneNumberMatcher::new();
//! let phones = matcher.find_all("Call 0300-1234567 or +92 321 7654321");
//! assert_eq!(phones.len(), 2);
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod redaction;

pub use config::{OcrConfig, RedactionConfig, RelativeRegion};
pub use domain::{
    EmailMatcher, MatchCounts, NationalIdMatcher, PatternCatalog, PatternMatcher, PhoneNumberMatcher,
    PiiKind, PiiMatch, Placeholders,
};
pub use error::{RedactorError, RedactorResult};
pub use redaction::{
    detect_format, DocumentAnalysis, DocumentFormat, PartialRedactionWarning, RedactionReport,
    RedactionService, StrategyUsed,
};
