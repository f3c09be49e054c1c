//! Custom assertions for redaction testing.

use super::pdf_helpers::extract_text;
use std::path::Path;

fn extract_text_or_panic(path: &Path) -> String {
    extract_text(path).unwrap_or_else(|e| panic!("Failed to extract text from '{}': {}", path.display(), e))
}

/// Asserts that `needle` no longer appears in the document's text.
pub fn assert_redacted(path: &Path, needle: &str) {
    let text = extract_text_or_panic(path);
    assert!(
        !text.contains(needle),
        "'{}' should be redacted but was found in '{}'.\nExtracted text length: {} chars",
        needle,
        path.display(),
        text.len()
    );
}

/// Asserts that `needle` is still present in the document's text.
pub fn assert_preserved(path: &Path, needle: &str) {
    let text = extract_text_or_panic(path);
    assert!(
        text.contains(needle),
        "'{}' should be preserved but was not found in '{}'",
        needle,
        path.display()
    );
}

/// Asserts that the document exists, is non-empty and can be read back.
pub fn assert_valid_output(path: &Path) {
    assert!(path.exists(), "Output should exist at '{}'", path.display());
    let len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    assert!(len > 0, "Output should not be empty at '{}'", path.display());
    extract_text_or_panic(path);
}
