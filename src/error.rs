//! Error types for the resume redaction library.
//!
//! Format and parse failures are terminal for a call and propagate to the
//! caller. Partial redaction is never an error: it is carried in the
//! [`RedactionReport`](crate::redaction::RedactionReport) instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for redaction operations.
pub type RedactorResult<T> = Result<T, RedactorError>;

/// Error type for all redaction operations.
#[derive(Debug, Error)]
pub enum RedactorError {
    /// Input is neither a page-oriented (PDF) nor a word-processing (DOCX) document.
    #[error("Unsupported format for '{}': {detected}", path.display())]
    UnsupportedFormat { path: PathBuf, detected: String },

    /// Container could not be opened or parsed.
    #[error("Corrupt document '{}': {reason}", path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    /// OCR could not run (missing binary, timeout, crash). Soft: the router
    /// falls back to the baseline image strategy.
    #[error("OCR unavailable: {reason}")]
    OcrUnavailable { reason: String },

    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error occurred during PDF page processing
    #[error("PDF processing error{}: {message}", page.map(|p| format!(" on page {}", p)).unwrap_or_default())]
    PdfProcessing {
        message: String,
        page: Option<usize>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Text extraction failed
    #[error("Text extraction failed for '{}': {reason}", path.display())]
    TextExtraction { path: PathBuf, reason: String },

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Backend-specific error (MuPDF, lopdf, zip, image)
    #[error("{backend} backend error: {message}")]
    BackendError {
        backend: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RedactorError {
    /// Returns true when the error aborts the call. Only OCR unavailability is soft.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::OcrUnavailable { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn backend<E>(backend: &str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendError {
            backend: backend.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<io::Error> for RedactorError {
    fn from(err: io::Error) -> Self {
        Self::BackendError {
            backend: "std::io".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<lopdf::Error> for RedactorError {
    fn from(err: lopdf::Error) -> Self {
        Self::backend("lopdf", err.to_string(), err)
    }
}

impl From<zip::result::ZipError> for RedactorError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::backend("zip", err.to_string(), err)
    }
}

impl From<image::ImageError> for RedactorError {
    fn from(err: image::ImageError) -> Self {
        Self::backend("image", err.to_string(), err)
    }
}
