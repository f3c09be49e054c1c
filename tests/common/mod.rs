//! Common test utilities and helpers.
//!
//! - Custom assertions
//! - Document builders (PDF and DOCX)
//! - Text projection helpers

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod fixtures;
pub mod pdf_helpers;

pub use assertions::*;
pub use fixtures::*;
pub use pdf_helpers::*;

use std::sync::{Mutex, MutexGuard};

// MuPDF font loading is not thread safe; tests that touch it take this lock.
pub static MUPDF_LOCK: Mutex<()> = Mutex::new(());

/// Serializes MuPDF access for the rest of the calling test.
pub fn mupdf_guard() -> MutexGuard<'static, ()> {
    MUPDF_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
