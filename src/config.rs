//! Redaction configuration.
//!
//! Every knob has a working default; `from_env` layers `REDACTOR_*`
//! environment overrides on top of those defaults.

use crate::domain::Placeholders;
use crate::error::{RedactorError, RedactorResult};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Output size above which the recompression pass runs (5 MiB).
pub const DEFAULT_SIZE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// A rectangle expressed as fractions of the page width and height, origin
/// at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RelativeRegion {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// External OCR settings (Tesseract CLI).
#[derive(Debug, Clone, Serialize)]
pub struct OcrConfig {
    pub enabled: bool,
    pub binary: PathBuf,
    pub language: String,
    pub dpi: u32,
    /// Upper bound for one OCR invocation; exceeding it forces the baseline strategy.
    pub timeout: Duration,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            dpi: 300,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactionConfig {
    pub placeholders: Placeholders,
    /// Marker stamped by the baseline image strategy.
    pub contact_hidden_marker: String,
    /// Documents with less trimmed text than this (and at least one image)
    /// are treated as rasterized.
    pub min_text_chars: usize,
    pub size_threshold_bytes: u64,
    pub jpeg_quality: u8,
    pub stamp_font_size: f32,
    /// Maximum search hits per needle on one page.
    pub max_hits: u32,
    pub ocr: OcrConfig,
    /// Zones blanked by the baseline image strategy: the top band and the
    /// right-hand column where contact details usually sit.
    pub baseline_regions: Vec<RelativeRegion>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            placeholders: Placeholders::default(),
            contact_hidden_marker: "[contact hidden]".to_string(),
            min_text_chars: 50,
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD,
            jpeg_quality: 60,
            stamp_font_size: 9.0,
            max_hits: 100,
            ocr: OcrConfig::default(),
            baseline_regions: vec![
                RelativeRegion::new(0.0, 0.0, 1.0, 0.15),
                RelativeRegion::new(0.62, 0.15, 0.38, 0.25),
            ],
        }
    }
}

impl RedactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `REDACTOR_*` environment variables.
    pub fn from_env() -> RedactorResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("REDACTOR_PLACEHOLDER_PHONE") {
            config.placeholders.phone = v;
        }
        if let Ok(v) = env::var("REDACTOR_PLACEHOLDER_EMAIL") {
            config.placeholders.email = v;
        }
        if let Ok(v) = env::var("REDACTOR_PLACEHOLDER_NATIONAL_ID") {
            config.placeholders.national_id = v;
        }
        if let Some(v) = parse_var("REDACTOR_MIN_TEXT_CHARS")? {
            config.min_text_chars = v;
        }
        if let Some(v) = parse_var("REDACTOR_SIZE_THRESHOLD")? {
            config.size_threshold_bytes = v;
        }
        if let Some(v) = parse_var::<u8>("REDACTOR_JPEG_QUALITY")? {
            config = config.with_jpeg_quality(v);
        }
        if let Some(v) = parse_var("REDACTOR_OCR")? {
            config.ocr.enabled = v;
        }
        if let Ok(v) = env::var("REDACTOR_TESSERACT") {
            config.ocr.binary = PathBuf::from(v);
        }
        if let Ok(v) = env::var("REDACTOR_OCR_LANG") {
            config.ocr.language = v;
        }
        if let Some(v) = parse_var("REDACTOR_OCR_DPI")? {
            config.ocr.dpi = v;
        }
        if let Some(v) = parse_var("REDACTOR_OCR_TIMEOUT_SECS")? {
            config.ocr.timeout = Duration::from_secs(v);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_size_threshold(mut self, bytes: u64) -> Self {
        self.size_threshold_bytes = bytes;
        self
    }

    pub fn with_min_text_chars(mut self, chars: usize) -> Self {
        self.min_text_chars = chars;
        self
    }

    /// Quality is clamped to the 1..=100 range JPEG accepts.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_hits(mut self, max_hits: u32) -> Self {
        self.max_hits = max_hits;
        self
    }

    pub fn with_ocr(mut self, ocr: OcrConfig) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn without_ocr(mut self) -> Self {
        self.ocr.enabled = false;
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr.timeout = timeout;
        self
    }

    pub fn with_baseline_regions(mut self, regions: Vec<RelativeRegion>) -> Self {
        self.baseline_regions = regions;
        self
    }

    pub fn validate(&self) -> RedactorResult<()> {
        if self.ocr.dpi < 72 || self.ocr.dpi > 1200 {
            return Err(RedactorError::InvalidInput {
                parameter: "ocr.dpi".to_string(),
                reason: format!("{} is outside 72..=1200", self.ocr.dpi),
            });
        }
        if self.max_hits == 0 {
            return Err(RedactorError::InvalidInput {
                parameter: "max_hits".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        for region in &self.baseline_regions {
            let in_unit = |v: f32| (-1e-4..=1.0 + 1e-4).contains(&v);
            if !(in_unit(region.x)
                && in_unit(region.y)
                && in_unit(region.x + region.width)
                && in_unit(region.y + region.height))
            {
                return Err(RedactorError::InvalidInput {
                    parameter: "baseline_regions".to_string(),
                    reason: format!("{:?} leaves the unit square", region),
                });
            }
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str) -> RedactorResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| RedactorError::InvalidInput {
                parameter: name.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
