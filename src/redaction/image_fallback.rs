//! Image-fallback strategy for rasterized pages.
//!
//! With OCR the recognized words are matched and their boxes blanked; without
//! it a fixed set of page regions where contact details usually sit is
//! blanked instead.

use super::ocr::{find_hits, scale_to_page, OcrWord};
use super::ops::{RedactionOp, Rect};
use crate::config::RelativeRegion;
use crate::domain::{MatchCounts, PatternCatalog, Placeholders};

/// Baseline ops for one page: every region blanked, the marker stamped in the first.
pub fn baseline_ops(page: Rect, regions: &[RelativeRegion], marker: &str, font_size: f32) -> Vec<RedactionOp> {
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let rect = Rect::new(
                page.x0 + region.x * page.width(),
                page.y0 + region.y * page.height(),
                page.x0 + (region.x + region.width) * page.width(),
                page.y0 + (region.y + region.height) * page.height(),
            )
            .clamp_to(&page);
            if i == 0 && !marker.is_empty() {
                RedactionOp::new(rect, marker, font_size)
            } else {
                RedactionOp::blank(rect)
            }
        })
        .filter(|op| !op.rect.is_empty())
        .collect()
}

/// Ops for the OCR-located matches on one page rendered at `image_width` x `image_height`.
pub fn ocr_ops(
    words: &[OcrWord],
    image_width: u32,
    image_height: u32,
    page: Rect,
    catalog: &PatternCatalog,
    placeholders: &Placeholders,
    font_size: f32,
) -> (Vec<RedactionOp>, MatchCounts) {
    let mut counts = MatchCounts::default();
    let mut ops = Vec::new();

    for hit in find_hits(words, catalog) {
        counts.add(hit.kind, 1);
        let rect = scale_to_page(hit.bbox, image_width, image_height, page);
        if rect.is_empty() {
            continue;
        }
        ops.push(RedactionOp::new(rect, placeholders.for_kind(hit.kind), font_size));
    }

    (ops, counts)
}
