//! Paints fills and replacement text over removed areas with lopdf.
//!
//! Stamps go into a content stream appended after the page's own content;
//! the original content is wrapped in `q`/`Q` so its graphics state cannot
//! leak into the stamp.

use super::inspect::{effective_resources, inherited_attr};
use super::ops::RedactionOp;
use crate::error::{RedactorError, RedactorResult};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, warn};

const FONT_RESOURCE: &str = "RdxHelv";

/// Stamps collected for one page (0-based index).
#[derive(Debug, Clone, PartialEq)]
pub struct PageStamps {
    pub page_index: usize,
    pub ops: Vec<RedactionOp>,
}

/// Applies every page's stamps to the PDF at `path`, rewriting it in place.
pub fn stamp_document(path: &Path, pages: &[PageStamps]) -> RedactorResult<()> {
    if pages.iter().all(|p| p.ops.is_empty()) {
        return Ok(());
    }

    let mut doc = Document::load(path).map_err(|e| RedactorError::corrupt(path, e))?;
    let page_ids = doc.get_pages();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    for page in pages.iter().filter(|p| !p.ops.is_empty()) {
        let page_id = page_ids
            .get(&(page.page_index as u32 + 1))
            .copied()
            .ok_or_else(|| RedactorError::PdfProcessing {
                message: "Page disappeared before stamping".to_string(),
                page: Some(page.page_index + 1),
                source: None,
            })?;

        if let Some(rotate) = inherited_attr(&doc, page_id, b"Rotate").and_then(|o| o.as_i64().ok()) {
            if rotate % 360 != 0 {
                warn!(page = page.page_index + 1, rotate, "rotated page, stamps use unrotated placement");
            }
        }

        let content = stamp_content(&page.ops, page_box(&doc, page_id));
        add_font_resource(&mut doc, page_id, font_id)?;
        append_isolated_content(&mut doc, page_id, content.into_bytes())?;
        debug!(page = page.page_index + 1, stamps = page.ops.len(), "stamped page");
    }

    doc.save(path).map_err(|e| RedactorError::PdfProcessing {
        message: format!("Failed to save stamped PDF: {}", e),
        page: None,
        source: Some(Box::new(e)),
    })?;
    Ok(())
}

/// Visible page box as `[llx, lly, urx, ury]`: CropBox, else MediaBox, else US Letter.
fn page_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    for key in [&b"CropBox"[..], &b"MediaBox"[..]] {
        let values = inherited_attr(doc, page_id, key)
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_array().ok())
            .map(|arr| arr.iter().filter_map(|v| v.as_float().ok()).collect::<Vec<f32>>());
        if let Some([a, b, c, d]) = values.as_deref() {
            return [a.min(*c), b.min(*d), a.max(*c), b.max(*d)];
        }
    }
    [0.0, 0.0, 612.0, 792.0]
}

/// Content stream painting each op. Op rectangles use a top-left origin
/// relative to the page box; PDF user space has its origin bottom-left.
pub fn stamp_content(ops: &[RedactionOp], page_box: [f32; 4]) -> String {
    let [llx, _, _, ury] = page_box;
    let mut out = String::from("Q\nq\n");

    for op in ops {
        let [r, g, b] = op.fill;
        out.push_str(&format!(
            "{:.3} {:.3} {:.3} rg {:.2} {:.2} {:.2} {:.2} re f\n",
            r,
            g,
            b,
            llx + op.rect.x0,
            ury - op.rect.y1,
            op.rect.width(),
            op.rect.height()
        ));

        if let Some(text) = op.replacement.as_deref().filter(|t| !t.is_empty()) {
            let (x, y) = op.stamp_origin();
            out.push_str(&format!(
                "0 0 0 rg BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
                FONT_RESOURCE,
                op.font_size,
                llx + x,
                ury - y,
                escape_text(text)
            ));
        }
    }

    out.push_str("Q\n");
    out
}

/// PDF literal string body in WinAnsi; characters outside Latin-1 become `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

enum ResourcesAt {
    Indirect(ObjectId),
    Inline,
}

/// Registers the stamp font in the page's resources, materializing
/// inherited resources onto the page first.
fn add_font_resource(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> RedactorResult<()> {
    let own = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(ResourcesAt::Indirect(*id)),
        Ok(Object::Dictionary(_)) => Some(ResourcesAt::Inline),
        _ => None,
    };
    let location = match own {
        Some(location) => location,
        None => {
            let inherited = effective_resources(doc, page_id).cloned().unwrap_or_default();
            doc.get_dictionary_mut(page_id)?.set("Resources", inherited);
            ResourcesAt::Inline
        }
    };

    let font_dict_id = resources_mut(doc, page_id, &location)?
        .get(b"Font")
        .and_then(Object::as_reference)
        .ok();

    match font_dict_id {
        Some(id) => doc.get_dictionary_mut(id)?.set(FONT_RESOURCE, font_id),
        None => {
            let resources = resources_mut(doc, page_id, &location)?;
            if !matches!(resources.get(b"Font"), Ok(Object::Dictionary(_))) {
                resources.set("Font", Dictionary::new());
            }
            resources
                .get_mut(b"Font")
                .and_then(Object::as_dict_mut)?
                .set(FONT_RESOURCE, font_id);
        }
    }
    Ok(())
}

fn resources_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    location: &ResourcesAt,
) -> RedactorResult<&'a mut Dictionary> {
    let dict = match location {
        ResourcesAt::Indirect(id) => doc.get_dictionary_mut(*id)?,
        ResourcesAt::Inline => doc
            .get_dictionary_mut(page_id)?
            .get_mut(b"Resources")
            .and_then(Object::as_dict_mut)?,
    };
    Ok(dict)
}

/// Contents becomes `[q, <original streams...>, stamp]`; `stamp` starts with `Q`.
fn append_isolated_content(doc: &mut Document, page_id: ObjectId, stamp: Vec<u8>) -> RedactorResult<()> {
    let existing = doc.get_page_contents(page_id);
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), stamp));

    let mut contents: Vec<Object> = Vec::with_capacity(existing.len() + 2);
    contents.push(open_id.into());
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(stamp_id.into());

    doc.get_dictionary_mut(page_id)?.set("Contents", contents);
    Ok(())
}
