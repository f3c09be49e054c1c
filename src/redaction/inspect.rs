//! Read-only PDF inspection: per-page text projection and image inventory.

use super::secure::MupdfDocument;
use crate::error::{RedactorError, RedactorResult};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;
use std::panic;
use std::path::Path;
use tracing::warn;

/// Form XObjects nested deeper than this are not searched for images.
const MAX_FORM_DEPTH: usize = 4;

/// What a page carries before any mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInventory {
    pub text: String,
    pub images: usize,
}

impl PageInventory {
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// Text projection and image count for every page of the PDF in `bytes`.
pub fn inventory(path: &Path, bytes: &[u8]) -> RedactorResult<Vec<PageInventory>> {
    let doc = Document::load_mem(bytes).map_err(|e| RedactorError::corrupt(path, e))?;
    let images = page_image_counts(&doc);
    let mut texts = page_texts(path, bytes)?;
    texts.resize(images.len(), String::new());

    Ok(texts
        .into_iter()
        .zip(images)
        .map(|(text, images)| PageInventory { text, images })
        .collect())
}

/// Per-page text. pdf-extract is tried first; it is not panic-free on
/// malformed content (undeclared fonts, broken encodings), so any failure
/// falls back to MuPDF's text for the same file. Only a document neither
/// reader can handle is an extraction error.
pub fn page_texts(path: &Path, bytes: &[u8]) -> RedactorResult<Vec<String>> {
    let reason = match panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => return Ok(pages),
        Ok(Err(e)) => e.to_string(),
        Err(_) => "text extractor panicked".to_string(),
    };

    warn!(path = %path.display(), %reason, "pdf-extract failed, reading text with MuPDF");
    MupdfDocument::open(path)
        .and_then(|doc| doc.page_texts())
        .map_err(|e| RedactorError::TextExtraction {
            path: path.to_path_buf(),
            reason: format!("{}; MuPDF: {}", reason, e),
        })
}

/// Whole-document text projection.
pub fn document_text(path: &Path) -> RedactorResult<String> {
    let bytes = std::fs::read(path).map_err(|e| RedactorError::io(path, e))?;
    Ok(page_texts(path, &bytes)?.join("\n"))
}

/// Image XObjects reachable from each page, in page order.
pub fn page_image_counts(doc: &Document) -> Vec<usize> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            effective_resources(doc, page_id)
                .map(|res| count_images(doc, res, 0, &mut BTreeSet::new()))
                .unwrap_or(0)
        })
        .collect()
}

fn count_images(doc: &Document, resources: &Dictionary, depth: usize, seen: &mut BTreeSet<ObjectId>) -> usize {
    let Some(xobjects) = resolve_dict(doc, resources.get(b"XObject").ok()) else {
        return 0;
    };

    let mut count = 0;
    for (_, value) in xobjects.iter() {
        if let Ok(id) = value.as_reference() {
            if !seen.insert(id) {
                continue;
            }
        }
        let stream = match doc.dereference(value) {
            Ok((_, Object::Stream(stream))) => stream,
            _ => continue,
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => count += 1,
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(inner) = resolve_dict(doc, stream.dict.get(b"Resources").ok()) {
                    count += count_images(doc, inner, depth + 1, seen);
                }
            }
            _ => {}
        }
    }
    count
}

/// Dereferences an optional dictionary-valued entry.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: Option<&'a Object>) -> Option<&'a Dictionary> {
    match doc.dereference(object?) {
        Ok((_, Object::Dictionary(dict))) => Some(dict),
        _ => None,
    }
}

/// Page attribute, inherited through the page tree when absent on the page.
pub(crate) fn inherited_attr<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

pub(crate) fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    resolve_dict(doc, inherited_attr(doc, page_id, b"Resources"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn image_stream() -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        )
    }

    /// Two pages: the first draws an image through a form XObject, the
    /// second inherits empty resources from the page tree.
    fn two_page_doc() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(image_stream());
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
            },
            b"/Im0 Do".to_vec(),
        ));
        let content = doc.add_object(Stream::new(dictionary! {}, b"/Fm0 Do".to_vec()));
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
            "Resources" => dictionary! { "XObject" => dictionary! { "Fm0" => form_id } },
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {},
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc
    }

    #[test]
    fn test_images_through_forms() {
        let doc = two_page_doc();
        assert_eq!(page_image_counts(&doc), vec![1, 0]);
    }

    #[test]
    fn test_inherited_media_box() {
        let doc = two_page_doc();
        let second = *doc.get_pages().get(&2).unwrap();
        let media = inherited_attr(&doc, second, b"MediaBox").unwrap();
        assert_eq!(media.as_array().unwrap().len(), 4);
        assert!(effective_resources(&doc, second).is_some());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let err = inventory(Path::new("cv.pdf"), b"%PDF-1.4 truncated").unwrap_err();
        assert!(matches!(err, RedactorError::CorruptDocument { .. }));
    }
}
