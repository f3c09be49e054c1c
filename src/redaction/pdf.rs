//! Page-oriented redaction (PDF).
//!
//! The text projection and image inventory are taken once, before any
//! mutation. Documents with almost no text but with images are treated as
//! scans and go through OCR (or the fixed-region baseline when OCR is not
//! available); everything else goes through the native text layer.

use super::format::DocumentFormat;
use super::image_fallback::{baseline_ops, ocr_ops};
use super::inspect::{document_text, inventory, PageInventory};
use super::ocr::Tesseract;
use super::ops::{apply_ops, TextLocator};
use super::report::{DocumentAnalysis, MatchLocation, PageAnalysis};
use super::secure::MupdfDocument;
use super::stamp::{stamp_document, PageStamps};
use super::strategy::{DocumentRedactor, StrategyOutcome, StrategyUsed};
use super::text_layer::{distinct_matches, plan_page, search_needle};
use crate::config::RedactionConfig;
use crate::domain::PatternCatalog;
use crate::error::{RedactorError, RedactorResult};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A redacted document still held by MuPDF, with the stamps to paint once saved.
struct Edited {
    outcome: StrategyOutcome,
    doc: MupdfDocument,
    stamps: Vec<PageStamps>,
}

#[derive(Debug, Clone)]
pub struct PdfRedactor {
    catalog: &'static PatternCatalog,
    config: RedactionConfig,
}

impl PdfRedactor {
    pub fn new(catalog: &'static PatternCatalog, config: RedactionConfig) -> Self {
        Self { catalog, config }
    }

    /// True when the document looks rasterized: too little text overall and
    /// at least one page carrying an image.
    pub fn is_image_based(&self, pages: &[PageInventory]) -> bool {
        let text_chars: usize = pages.iter().map(PageInventory::text_len).sum();
        text_chars < self.config.min_text_chars && pages.iter().any(|p| p.images > 0)
    }

    fn redact_text_layer(&self, input: &Path, pages: &[PageInventory]) -> RedactorResult<Edited> {
        let doc = MupdfDocument::open(input)?;
        let page_count = doc.page_count()?;
        let mut outcome = StrategyOutcome::new(StrategyUsed::Text);
        outcome.pages_processed = page_count;
        let mut stamps = Vec::new();

        for index in 0..page_count {
            let text = pages.get(index).map(|p| p.text.as_str()).unwrap_or_default();
            if distinct_matches(self.catalog, text).is_empty() {
                continue;
            }

            let mut page = doc.load_page(index, self.config.max_hits)?;
            let plan = plan_page(
                index + 1,
                text,
                &page,
                self.catalog,
                &self.config.placeholders,
                self.config.stamp_font_size,
            )?;
            let applied = apply_ops(&mut page, &plan.ops)?;
            debug!(page = index + 1, matches = plan.found.total(), regions = applied, "text layer page");

            outcome.found.merge(&plan.found);
            outcome.redacted.merge(&plan.redacted);
            outcome.unmasked.extend(plan.unmasked);
            outcome.regions_redacted += applied;
            if applied > 0 {
                outcome.pages_modified += 1;
                stamps.push(PageStamps {
                    page_index: index,
                    ops: page.take_stamps(),
                });
            }
        }

        Ok(Edited {
            outcome,
            doc,
            stamps,
        })
    }

    fn redact_baseline(&self, input: &Path, pages: &[PageInventory]) -> RedactorResult<Edited> {
        let doc = MupdfDocument::open(input)?;
        let page_count = doc.page_count()?;
        let mut outcome = StrategyOutcome::new(StrategyUsed::ImageBaseline);
        outcome.pages_processed = page_count;
        outcome.low_confidence = true;
        let mut stamps = Vec::new();

        for index in 0..page_count {
            if pages.get(index).map_or(true, |p| p.images == 0) {
                continue;
            }
            let mut page = doc.load_page(index, self.config.max_hits)?;
            let ops = baseline_ops(
                page.bounds(),
                &self.config.baseline_regions,
                &self.config.contact_hidden_marker,
                self.config.stamp_font_size,
            );
            let applied = apply_ops(&mut page, &ops)?;
            outcome.regions_redacted += applied;
            if applied > 0 {
                outcome.pages_modified += 1;
                stamps.push(PageStamps {
                    page_index: index,
                    ops: page.take_stamps(),
                });
            }
        }

        warn!(pages = outcome.pages_modified, "baseline regions blanked, output needs review");
        Ok(Edited {
            outcome,
            doc,
            stamps,
        })
    }

    fn redact_ocr(&self, input: &Path, pages: &[PageInventory], scratch: &Path) -> RedactorResult<Edited> {
        let ocr = &self.config.ocr;
        let engine = Tesseract::from_config(ocr);
        let deadline = Instant::now() + ocr.timeout;
        engine.check_available(remaining(deadline)?)?;

        let doc = MupdfDocument::open(input)?;
        let page_count = doc.page_count()?;
        let mut outcome = StrategyOutcome::new(StrategyUsed::ImageOcr);
        outcome.pages_processed = page_count;
        let mut stamps = Vec::new();

        for index in 0..page_count {
            if pages.get(index).map_or(true, |p| p.images == 0) {
                continue;
            }
            let mut page = doc.load_page(index, self.config.max_hits)?;
            let image = page.render(ocr.dpi).map_err(|e| RedactorError::OcrUnavailable {
                reason: format!("could not render page {}: {}", index + 1, e),
            })?;
            let png = scratch.join(format!("page-{:03}.png", index + 1));
            image.save(&png).map_err(|e| RedactorError::OcrUnavailable {
                reason: format!("could not write page image: {}", e),
            })?;

            let words = engine.recognize(
                &png,
                &scratch.join(format!("page-{:03}", index + 1)),
                remaining(deadline)?,
            )?;
            let (ops, counts) = ocr_ops(
                &words,
                image.width(),
                image.height(),
                page.bounds(),
                self.catalog,
                &self.config.placeholders,
                self.config.stamp_font_size,
            );
            let applied = apply_ops(&mut page, &ops)?;
            debug!(page = index + 1, words = words.len(), matches = counts.total(), "ocr page");

            outcome.found.merge(&counts);
            outcome.redacted.merge(&counts);
            outcome.regions_redacted += applied;
            if applied > 0 {
                outcome.pages_modified += 1;
                stamps.push(PageStamps {
                    page_index: index,
                    ops: page.take_stamps(),
                });
            }
        }

        Ok(Edited {
            outcome,
            doc,
            stamps,
        })
    }

    fn redact_image_based(&self, input: &Path, pages: &[PageInventory], scratch: &Path) -> RedactorResult<Edited> {
        if !self.config.ocr.enabled {
            let mut edited = self.redact_baseline(input, pages)?;
            edited.outcome.ocr_fallback_reason = Some("OCR disabled".to_string());
            return Ok(edited);
        }

        match self.redact_ocr(input, pages, scratch) {
            Ok(edited) => Ok(edited),
            Err(RedactorError::OcrUnavailable { reason }) => {
                warn!(%reason, "OCR unavailable, using baseline regions");
                let mut edited = self.redact_baseline(input, pages)?;
                edited.outcome.ocr_fallback_reason = Some(reason);
                Ok(edited)
            }
            Err(e) => Err(e),
        }
    }

    /// Per-page diagnostic: text size, images, and whether each match can be located.
    pub fn analyze(&self, input: &Path) -> RedactorResult<DocumentAnalysis> {
        let bytes = fs::read(input).map_err(|e| RedactorError::io(input, e))?;
        let pages = inventory(input, &bytes)?;
        let doc = MupdfDocument::open(input)?;
        let page_count = doc.page_count()?.min(pages.len());

        let mut analysis = DocumentAnalysis::new(DocumentFormat::Pdf);
        analysis.image_based = self.is_image_based(&pages);
        for (index, inv) in pages.iter().enumerate() {
            let mut matches = Vec::new();
            let distinct = distinct_matches(self.catalog, &inv.text);
            if !distinct.is_empty() && index < page_count {
                let page = doc.load_page(index, self.config.max_hits)?;
                for (kind, text, occurrences) in distinct {
                    let located = page.search(&search_needle(&text))?.len();
                    matches.push(MatchLocation {
                        kind,
                        text,
                        occurrences,
                        located,
                    });
                }
            }
            analysis.pages.push(PageAnalysis {
                page: index + 1,
                text_chars: inv.text_len(),
                images: inv.images,
                matches,
            });
        }
        Ok(analysis)
    }
}

impl DocumentRedactor for PdfRedactor {
    fn redact(&self, input: &Path, output: &Path, scratch: &Path) -> RedactorResult<StrategyOutcome> {
        let bytes = fs::read(input).map_err(|e| RedactorError::io(input, e))?;
        let pages = inventory(input, &bytes)?;
        let image_based = self.is_image_based(&pages);
        info!(
            pages = pages.len(),
            text_chars = pages.iter().map(PageInventory::text_len).sum::<usize>(),
            image_based,
            "selected page strategy"
        );

        let edited = if image_based {
            self.redact_image_based(input, &pages, scratch)?
        } else {
            self.redact_text_layer(input, &pages)?
        };

        if edited.outcome.regions_redacted == 0 {
            // nothing removed: the input is already clean
            fs::copy(input, output).map_err(|e| RedactorError::io(output, e))?;
        } else {
            edited.doc.save(output)?;
            stamp_document(output, &edited.stamps)?;
        }
        Ok(edited.outcome)
    }

    fn extract_text(&self, input: &Path) -> RedactorResult<String> {
        document_text(input)
    }

    fn name(&self) -> &str {
        "SecureRedaction"
    }
}

fn remaining(deadline: Instant) -> RedactorResult<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
        .ok_or_else(|| RedactorError::OcrUnavailable {
            reason: "OCR time budget exhausted".to_string(),
        })
}
