//! Format routing and the redaction service.
//!
//! [`RedactionService`] detects the input format, hands the document to the
//! matching [`DocumentRedactor`], and then runs the shared post-processing
//! every output gets: size reduction for oversized PDFs and a verification
//! pass over the output's text projection.

pub mod compress;
pub mod docx;
pub mod format;
pub mod image_fallback;
pub mod inspect;
pub mod ocr;
pub mod ops;
pub mod pdf;
pub mod report;
pub mod secure;
pub mod stamp;
pub mod strategy;
pub mod text_layer;
pub mod verify;

pub use compress::RecompressionOutcome;
pub use docx::DocxRedactor;
pub use format::{detect_format, DocumentFormat};
pub use ops::{RedactionOp, Rect};
pub use pdf::PdfRedactor;
pub use report::{DocumentAnalysis, MatchLocation, PageAnalysis, PartialRedactionWarning, RedactionReport};
pub use strategy::{DocumentRedactor, StrategyOutcome, StrategyUsed, UnmaskedMatch};

use crate::config::RedactionConfig;
use crate::domain::PatternCatalog;
use crate::error::{RedactorError, RedactorResult};
use compress::recompress_pdf;
use std::fs;
use std::path::Path;
use tracing::{debug, info, info_span, warn};
use verify::residual_matches;

/// Redaction service coordinating format routing and post-processing.
///
/// The service holds only read-only state, so one instance can serve
/// concurrent calls; every call gets its own scratch directory.
#[derive(Debug, Clone)]
pub struct RedactionService {
    config: RedactionConfig,
    catalog: &'static PatternCatalog,
}

impl RedactionService {
    /// Creates a service after validating `config`.
    pub fn new(config: RedactionConfig) -> RedactorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: PatternCatalog::global(),
        })
    }

    /// Creates a service with the built-in defaults.
    pub fn with_defaults() -> Self {
        Self {
            config: RedactionConfig::default(),
            catalog: PatternCatalog::global(),
        }
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    fn redactor(&self, format: DocumentFormat) -> Box<dyn DocumentRedactor> {
        match format {
            DocumentFormat::Pdf => Box::new(PdfRedactor::new(self.catalog, self.config.clone())),
            DocumentFormat::Docx => Box::new(DocxRedactor::new(
                self.catalog,
                self.config.placeholders.clone(),
            )),
        }
    }

    /// Redacts `input` into `output` and reports what happened.
    ///
    /// Errors mean no trustworthy output was produced. Anything short of
    /// that, including matches that could not be removed, is reported in
    /// the returned [`RedactionReport`].
    pub fn redact(&self, input: &Path, output: &Path) -> RedactorResult<RedactionReport> {
        let span = info_span!("redact", input = %input.display());
        let _enter = span.enter();

        check_paths(input, output)?;
        let format = detect_format(input)?;
        let scratch = tempfile::Builder::new()
            .prefix("resume-redactor-")
            .tempdir()
            .map_err(|e| RedactorError::io(std::env::temp_dir(), e))?;

        let redactor = self.redactor(format);
        debug!(redactor = redactor.name(), %format, "dispatching");
        let outcome = redactor.redact(input, output, scratch.path())?;
        info!(
            strategy = %outcome.strategy,
            found = outcome.found.total(),
            redacted = outcome.redacted.total(),
            regions = outcome.regions_redacted,
            "redaction applied"
        );

        let mut report = RedactionReport::from_outcome(format, outcome);
        let mut size = file_len(output)?;

        if size > self.config.size_threshold_bytes {
            if format == DocumentFormat::Pdf {
                match recompress_pdf(output, scratch.path(), self.config.jpeg_quality) {
                    Ok(outcome) => {
                        size = outcome.bytes_after;
                        report.recompression = Some(outcome);
                    }
                    Err(e) => {
                        warn!(error = %e, "recompression failed, keeping output as is");
                        report.recompression = Some(RecompressionOutcome {
                            bytes_before: size,
                            bytes_after: size,
                            images_reencoded: 0,
                            applied: false,
                        });
                    }
                }
            } else {
                debug!(bytes = size, "over size threshold, DOCX outputs are not recompressed");
            }
        }
        report.output_bytes = size;

        match residual_matches(format, output, self.catalog, &self.config.placeholders) {
            Ok(leakage) => {
                if !leakage.is_empty() {
                    warn!(count = leakage.len(), "PII still present in output");
                }
                report.set_leakage(leakage);
            }
            Err(e) => {
                warn!(error = %e, "could not verify output");
                report.verification_failed(e.to_string());
            }
        }

        if report.requires_review() {
            warn!(output = %output.display(), "output requires manual review");
        }
        Ok(report)
    }

    /// Reports matches per page without writing anything.
    pub fn analyze(&self, input: &Path) -> RedactorResult<DocumentAnalysis> {
        ensure_exists(input)?;
        match detect_format(input)? {
            DocumentFormat::Pdf => PdfRedactor::new(self.catalog, self.config.clone()).analyze(input),
            DocumentFormat::Docx => {
                DocxRedactor::new(self.catalog, self.config.placeholders.clone()).analyze(input)
            }
        }
    }

    /// Extracts the text projection used for matching and verification.
    pub fn extract_text(&self, input: &Path) -> RedactorResult<String> {
        ensure_exists(input)?;
        let format = detect_format(input)?;
        self.redactor(format).extract_text(input)
    }
}

impl Default for RedactionService {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn ensure_exists(input: &Path) -> RedactorResult<()> {
    if !input.exists() {
        return Err(RedactorError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "Input file does not exist"),
        });
    }
    Ok(())
}

fn check_paths(input: &Path, output: &Path) -> RedactorResult<()> {
    ensure_exists(input)?;
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Err(RedactorError::InvalidInput {
            parameter: "output".to_string(),
            reason: "Output must not overwrite the input".to_string(),
        });
    }
    Ok(())
}

fn file_len(path: &Path) -> RedactorResult<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| RedactorError::io(path, e))
}
