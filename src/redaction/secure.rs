//! MuPDF backend.
//!
//! Physically removes content under redaction annotations (`pdf_redact_page`),
//! so removed glyphs and image pixels cannot be recovered from the output.
//! Also provides page search and rasterization for OCR.

use super::ops::{ContentEditor, RedactionOp, Rect, TextLocator};
use crate::error::{RedactorError, RedactorResult};
use image::RgbImage;
use std::path::Path;

use mupdf::pdf::{PdfAnnotationType, PdfDocument, PdfPage};
use mupdf::{Colorspace, Matrix, Page, Rect as MuRect};

const BACKEND: &str = "MuPDF";

/// An open PDF document held by MuPDF.
pub struct MupdfDocument {
    doc: PdfDocument,
}

impl MupdfDocument {
    pub fn open(path: &Path) -> RedactorResult<Self> {
        let path_str = utf8_path(path, "input")?;
        let doc = PdfDocument::open(path_str)
            .map_err(|e| RedactorError::corrupt(path, format!("MuPDF could not open document: {}", e)))?;
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> RedactorResult<usize> {
        self.doc
            .page_count()
            .map(|n| n.max(0) as usize)
            .map_err(|e| RedactorError::backend(BACKEND, format!("Failed to get page count: {}", e), e))
    }

    /// Loads page `index` (0-based) for searching and editing.
    pub fn load_page(&self, index: usize, max_hits: u32) -> RedactorResult<MupdfPage> {
        let page = self
            .doc
            .load_page(index as i32)
            .map_err(|e| RedactorError::PdfProcessing {
                message: format!("Failed to load page {}", index + 1),
                page: Some(index + 1),
                source: Some(Box::new(e)),
            })?;

        let pdf_page = PdfPage::try_from(page.clone()).map_err(|_| RedactorError::PdfProcessing {
            message: "Page does not support annotations".to_string(),
            page: Some(index + 1),
            source: None,
        })?;

        let bounds = page.bounds().map_err(|e| {
            RedactorError::backend(BACKEND, format!("Failed to get bounds for page {}", index + 1), e)
        })?;

        Ok(MupdfPage {
            page,
            pdf_page,
            index,
            bounds: Rect::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1),
            max_hits,
            pending: 0,
            stamps: Vec::new(),
        })
    }

    /// Plain text of every page in page order, from MuPDF's structured text.
    pub fn page_texts(&self) -> RedactorResult<Vec<String>> {
        (0..self.page_count()?)
            .map(|index| {
                let page = self.doc.load_page(index as i32).map_err(|e| {
                    RedactorError::backend(BACKEND, format!("Failed to load page {}", index + 1), e)
                })?;
                page.to_text().map_err(|e| {
                    RedactorError::backend(BACKEND, format!("Failed to extract text of page {}", index + 1), e)
                })
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> RedactorResult<()> {
        let path_str = utf8_path(path, "output")?;
        self.doc
            .save(path_str)
            .map_err(|e| RedactorError::PdfProcessing {
                message: "Failed to save redacted PDF".to_string(),
                page: None,
                source: Some(Box::new(e)),
            })
    }
}

/// One loaded page. Stamps are collected rather than drawn: MuPDF removes,
/// the stamping pass paints the fill and replacement text afterwards.
pub struct MupdfPage {
    page: Page,
    pdf_page: PdfPage,
    index: usize,
    bounds: Rect,
    max_hits: u32,
    pending: usize,
    stamps: Vec<RedactionOp>,
}

impl MupdfPage {
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn take_stamps(&mut self) -> Vec<RedactionOp> {
        std::mem::take(&mut self.stamps)
    }

    /// Renders the page to RGB at `dpi`.
    pub fn render(&self, dpi: u32) -> RedactorResult<RgbImage> {
        let scale = dpi as f32 / 72.0;
        let matrix = Matrix::new_scale(scale, scale);
        let pixmap = self
            .page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)
            .map_err(|e| RedactorError::PdfProcessing {
                message: format!("Failed to render page at {} dpi", dpi),
                page: Some(self.index + 1),
                source: Some(Box::new(e)),
            })?;

        let width = pixmap.width();
        let height = pixmap.height();
        let channels = pixmap.n() as usize;
        let samples = pixmap.samples();
        if width == 0 || height == 0 || channels < 3 {
            return Err(RedactorError::PdfProcessing {
                message: format!("Unexpected pixmap {}x{}x{}", width, height, channels),
                page: Some(self.index + 1),
                source: None,
            });
        }

        let stride = samples.len() / height as usize;
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for row in samples.chunks(stride).take(height as usize) {
            for px in row[..width as usize * channels].chunks(channels) {
                rgb.extend_from_slice(&px[..3]);
            }
        }

        RgbImage::from_raw(width, height, rgb).ok_or_else(|| RedactorError::PdfProcessing {
            message: "Rendered pixmap has an unexpected size".to_string(),
            page: Some(self.index + 1),
            source: None,
        })
    }
}

impl TextLocator for MupdfPage {
    fn search(&self, needle: &str) -> RedactorResult<Vec<Rect>> {
        let hits = self.page.search(needle, self.max_hits).map_err(|e| {
            RedactorError::backend(BACKEND, format!("Search failed on page {}", self.index + 1), e)
        })?;

        let mut rects = Vec::new();
        for quad in hits {
            let rect = Rect {
                x0: quad.ul.x.min(quad.ll.x).min(quad.ur.x).min(quad.lr.x),
                y0: quad.ul.y.min(quad.ll.y).min(quad.ur.y).min(quad.lr.y),
                x1: quad.ul.x.max(quad.ll.x).max(quad.ur.x).max(quad.lr.x),
                y1: quad.ul.y.max(quad.ll.y).max(quad.ur.y).max(quad.lr.y),
            };
            if !rect.is_empty() {
                rects.push(rect);
            }
        }
        Ok(rects)
    }
}

impl ContentEditor for MupdfPage {
    fn mark_for_removal(&mut self, rect: Rect) -> RedactorResult<()> {
        let annot = self
            .pdf_page
            .create_annotation(PdfAnnotationType::Redact)
            .map_err(|e| RedactorError::PdfProcessing {
                message: "Failed to create redaction annotation".to_string(),
                page: Some(self.index + 1),
                source: Some(Box::new(e)),
            })?;

        unsafe {
            ffi::set_annotation_rect(
                &annot,
                MuRect {
                    x0: rect.x0,
                    y0: rect.y0,
                    x1: rect.x1,
                    y1: rect.y1,
                },
            );
        }
        self.pending += 1;
        Ok(())
    }

    fn commit_removals(&mut self) -> RedactorResult<()> {
        if self.pending == 0 {
            return Ok(());
        }
        self.pdf_page
            .redact()
            .map_err(|e| RedactorError::PdfProcessing {
                message: format!("Failed to apply redactions on page {}", self.index + 1),
                page: Some(self.index + 1),
                source: Some(Box::new(e)),
            })?;
        self.pending = 0;
        Ok(())
    }

    fn stamp(&mut self, op: &RedactionOp) -> RedactorResult<()> {
        self.stamps.push(op.clone());
        Ok(())
    }
}

fn utf8_path<'a>(path: &'a Path, parameter: &str) -> RedactorResult<&'a str> {
    path.to_str().ok_or_else(|| RedactorError::InvalidInput {
        parameter: parameter.to_string(),
        reason: "Path contains invalid UTF-8".to_string(),
    })
}

/// FFI helpers for MuPDF annotation operations.
mod ffi {
    use mupdf::pdf::PdfAnnotation;
    use mupdf::Rect;

    /// Sets the rectangle for a PDF annotation via FFI.
    ///
    /// # Safety
    /// The annotation must be valid; a base context is created for the call.
    pub unsafe fn set_annotation_rect(annot: &PdfAnnotation, rect: Rect) {
        #[repr(C)]
        struct PdfAnnotRaw {
            inner: *mut mupdf_sys::pdf_annot,
        }

        let annot_raw = std::mem::transmute::<&PdfAnnotation, &PdfAnnotRaw>(annot);
        let ctx = mupdf_sys::mupdf_new_base_context();

        if !ctx.is_null() {
            let fz_rect = mupdf_sys::fz_rect {
                x0: rect.x0,
                y0: rect.y0,
                x1: rect.x1,
                y1: rect.y1,
            };

            mupdf_sys::pdf_set_annot_rect(ctx, annot_raw.inner, fz_rect);
            mupdf_sys::mupdf_drop_base_context(ctx);
        }
    }
}
