//! Redaction operations and the page capabilities they are applied through.
//!
//! Native text search and OCR both end up as a list of [`RedactionOp`]s that
//! are applied by [`apply_ops`], so the destructive-remove-then-stamp sequence
//! exists exactly once.

use crate::error::RedactorResult;
use serde::Serialize;

/// Axis-aligned rectangle in page space: origin at the top-left corner of the
/// page, y growing downward, units of 1/72 inch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Intersection with `bounds`; may be empty.
    pub fn clamp_to(&self, bounds: &Rect) -> Rect {
        Rect {
            x0: self.x0.clamp(bounds.x0, bounds.x1),
            y0: self.y0.clamp(bounds.y0, bounds.y1),
            x1: self.x1.clamp(bounds.x0, bounds.x1),
            y1: self.y1.clamp(bounds.y0, bounds.y1),
        }
    }
}

/// RGB fill in the 0..=1 range.
pub type Fill = [f32; 3];

pub const WHITE: Fill = [1.0, 1.0, 1.0];

/// One rectangle to destroy, fill, and optionally restamp with text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedactionOp {
    pub rect: Rect,
    pub fill: Fill,
    pub replacement: Option<String>,
    pub font_size: f32,
}

impl RedactionOp {
    pub fn new(rect: Rect, replacement: impl Into<String>, font_size: f32) -> Self {
        Self {
            rect,
            fill: WHITE,
            replacement: Some(replacement.into()),
            font_size,
        }
    }

    /// Opaque fill without replacement text.
    pub fn blank(rect: Rect) -> Self {
        Self {
            rect,
            fill: WHITE,
            replacement: None,
            font_size: 0.0,
        }
    }

    /// Baseline origin of the replacement text, just inside the lower-left
    /// corner of the rectangle.
    pub fn stamp_origin(&self) -> (f32, f32) {
        (self.rect.x0 + 1.0, self.rect.y1 - 2.0)
    }
}

/// "Search by string" over a page's text layer.
pub trait TextLocator {
    /// Every visual occurrence of `needle` on the page.
    fn search(&self, needle: &str) -> RedactorResult<Vec<Rect>>;
}

/// Destructive page editing.
pub trait ContentEditor {
    /// Queues `rect` for physical removal of the glyphs and image pixels under it.
    fn mark_for_removal(&mut self, rect: Rect) -> RedactorResult<()>;

    /// Applies every queued removal in one pass.
    fn commit_removals(&mut self) -> RedactorResult<()>;

    /// Paints the op's fill and replacement text onto the already cleared area.
    fn stamp(&mut self, op: &RedactionOp) -> RedactorResult<()>;
}

/// Applies a page's ops as one batch: mark all, commit once, then stamp.
///
/// Returns the number of ops applied. An empty batch leaves the page untouched.
pub fn apply_ops(editor: &mut dyn ContentEditor, ops: &[RedactionOp]) -> RedactorResult<usize> {
    if ops.is_empty() {
        return Ok(0);
    }
    for op in ops {
        editor.mark_for_removal(op.rect)?;
    }
    editor.commit_removals()?;
    for op in ops {
        editor.stamp(op)?;
    }
    Ok(ops.len())
}
