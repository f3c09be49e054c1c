//! Input format detection.

use crate::error::{RedactorError, RedactorResult};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_LEN: usize = 1024;

/// Document families the router knows how to redact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Page-oriented (PDF).
    Pdf,
    /// Word-processing XML package (DOCX).
    Docx,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the format from the extension, falling back to content sniffing.
pub fn detect_format(path: &Path) -> RedactorResult<DocumentFormat> {
    match extension(path).as_deref() {
        Some("pdf") => return Ok(DocumentFormat::Pdf),
        Some("docx") => return Ok(DocumentFormat::Docx),
        _ => {}
    }

    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)
        .and_then(|f| f.take(SNIFF_LEN as u64).read_to_end(&mut head))
        .map_err(|e| RedactorError::io(path, e))?;

    if head.windows(5).any(|w| w == b"%PDF-") {
        return Ok(DocumentFormat::Pdf);
    }
    if head.starts_with(b"PK\x03\x04") && is_word_package(path) {
        return Ok(DocumentFormat::Docx);
    }

    Err(RedactorError::UnsupportedFormat {
        path: path.to_path_buf(),
        detected: extension(path).unwrap_or_else(|| "unknown".to_string()),
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_word_package(path: &Path) -> bool {
    File::open(path)
        .ok()
        .and_then(|f| zip::ZipArchive::new(f).ok())
        .map(|archive| archive.file_names().any(|n| n == "word/document.xml"))
        .unwrap_or(false)
}
