//! Text projection helpers shared by the integration tests.

use anyhow::Result;
use resume_redactor::{PatternCatalog, PiiMatch, RedactionService};
use std::path::Path;

/// Text projection of a PDF or DOCX, as the redactor sees it.
pub fn extract_text(path: &Path) -> Result<String> {
    RedactionService::with_defaults()
        .extract_text(path)
        .map_err(|e| anyhow::anyhow!("Failed to extract text: {}", e))
}

/// Every PII match in the document's text projection.
pub fn pii_in(path: &Path) -> Result<Vec<PiiMatch>> {
    Ok(PatternCatalog::global().find_all(&extract_text(path)?))
}

pub fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Validates that a PDF is loadable and has at least one page.
pub fn is_valid_pdf(path: &Path) -> bool {
    lopdf::Document::load(path)
        .map(|doc| !doc.get_pages().is_empty())
        .unwrap_or(false)
}
