//! Post-redaction verification: re-extract the output and look for PII that
//! survived, discounting the placeholders themselves.

use super::docx::docx_text;
use super::format::DocumentFormat;
use super::inspect::document_text;
use crate::domain::{PatternCatalog, PiiMatch, Placeholders};
use crate::error::RedactorResult;
use std::path::Path;

/// Residual matches in `output`.
pub fn residual_matches(
    format: DocumentFormat,
    output: &Path,
    catalog: &PatternCatalog,
    placeholders: &Placeholders,
) -> RedactorResult<Vec<PiiMatch>> {
    let text = match format {
        DocumentFormat::Pdf => document_text(output)?,
        DocumentFormat::Docx => docx_text(output)?,
    };
    Ok(catalog.residual(&text, placeholders))
}
