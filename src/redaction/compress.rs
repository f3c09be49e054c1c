//! Size-reduction pass for oversized PDF outputs.
//!
//! Raster images are re-encoded as JPEG, every other stream is Flate
//! compressed, and unreferenced objects are dropped. The result only
//! replaces the output when it is strictly smaller.

use crate::error::{RedactorError, RedactorResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecompressionOutcome {
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub images_reencoded: usize,
    /// Whether the smaller file replaced the output.
    pub applied: bool,
}

/// Recompresses the PDF at `path`, using `scratch` for the candidate file.
pub fn recompress_pdf(path: &Path, scratch: &Path, jpeg_quality: u8) -> RedactorResult<RecompressionOutcome> {
    let bytes_before = file_len(path)?;
    let mut doc = Document::load(path).map_err(|e| RedactorError::corrupt(path, e))?;

    let images: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, obj)| is_image(obj))
        .map(|(id, _)| *id)
        .collect();

    let mut images_reencoded = 0;
    for id in images {
        let stream = match doc.get_object(id).and_then(Object::as_stream) {
            Ok(stream) => stream.clone(),
            Err(_) => continue,
        };
        let components = color_components(&doc, &stream.dict);
        match reencode_image(&stream, components, jpeg_quality) {
            Ok(Some(smaller)) => {
                doc.objects.insert(id, Object::Stream(smaller));
                images_reencoded += 1;
            }
            Ok(None) => {}
            Err(e) => debug!(object = ?id, error = %e, "image left as is"),
        }
    }

    doc.compress();
    doc.prune_objects();

    let candidate = scratch.join("recompressed.pdf");
    doc.save(&candidate).map_err(|e| RedactorError::PdfProcessing {
        message: format!("Failed to write recompressed PDF: {}", e),
        page: None,
        source: Some(Box::new(e)),
    })?;
    let bytes_after = file_len(&candidate)?;

    let applied = bytes_after < bytes_before;
    if applied {
        fs::copy(&candidate, path).map_err(|e| RedactorError::io(path, e))?;
    }
    info!(bytes_before, bytes_after, images_reencoded, applied, "recompression finished");

    Ok(RecompressionOutcome {
        bytes_before,
        bytes_after: if applied { bytes_after } else { bytes_before },
        images_reencoded,
        applied,
    })
}

fn file_len(path: &Path) -> RedactorResult<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| RedactorError::io(path, e))
}

fn is_image(obj: &Object) -> bool {
    matches!(obj, Object::Stream(s)
        if matches!(s.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image")))
}

/// Channel count of the image colour space, when it is one we can rebuild.
fn color_components(doc: &Document, dict: &Dictionary) -> Option<usize> {
    let (_, space) = doc.dereference(dict.get(b"ColorSpace").ok()?).ok()?;
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        Object::Array(parts) => match parts.first().and_then(|p| p.as_name().ok()) {
            Some(b"ICCBased") => {
                let (_, profile) = doc.dereference(parts.get(1)?).ok()?;
                let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                matches!(n, 1 | 3 | 4).then_some(n as usize)
            }
            Some(b"CalGray") => Some(1),
            Some(b"CalRGB") => Some(3),
            _ => None,
        },
        _ => None,
    }
}

/// Re-encodes one image XObject as JPEG. `Ok(None)` means the image is
/// unsupported or the re-encode would not be smaller.
fn reencode_image(stream: &Stream, components: Option<usize>, quality: u8) -> RedactorResult<Option<Stream>> {
    let dict = &stream.dict;
    let flag = |key: &[u8]| dict.get(key).and_then(Object::as_bool).unwrap_or(false);
    if flag(b"ImageMask") || dict.has(b"Decode") || dict.has(b"SMaskInData") {
        return Ok(None);
    }
    let int = |key: &[u8]| dict.get(key).and_then(Object::as_i64).ok();
    let (Some(width), Some(height)) = (int(b"Width"), int(b"Height")) else {
        return Ok(None);
    };
    if width <= 0 || height <= 0 {
        return Ok(None);
    }
    let (width, height) = (width as u32, height as u32);

    let filters = stream.filters().unwrap_or_default();
    let decoded = if filters.iter().any(|f| f == "DCTDecode") {
        if filters.len() != 1 {
            return Ok(None);
        }
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?;
        match components {
            Some(1) => DynamicImage::ImageLuma8(img.to_luma8()),
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        }
    } else if filters.iter().all(|f| f == "FlateDecode" || f == "LZWDecode") {
        if int(b"BitsPerComponent") != Some(8) {
            return Ok(None);
        }
        let Some(components) = components else {
            return Ok(None);
        };
        let raw = if filters.is_empty() {
            stream.content.clone()
        } else {
            // lopdf refuses to decode streams flagged as images
            let mut plain = stream.clone();
            plain.dict.remove(b"Subtype");
            plain.decompressed_content()?
        };
        match raw_to_image(raw, width, height, components) {
            Some(img) => img,
            None => return Ok(None),
        }
    } else {
        return Ok(None);
    };

    let (pixels, color, space) = match &decoded {
        DynamicImage::ImageLuma8(img) => (img.as_raw(), ExtendedColorType::L8, "DeviceGray"),
        DynamicImage::ImageRgb8(img) => (img.as_raw(), ExtendedColorType::Rgb8, "DeviceRGB"),
        _ => return Ok(None),
    };
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality).encode(
        pixels,
        decoded.width(),
        decoded.height(),
        color,
    )?;
    if encoded.len() >= stream.content.len() {
        return Ok(None);
    }

    let mut new_dict = dict.clone();
    new_dict.set("Filter", "DCTDecode");
    new_dict.remove(b"DecodeParms");
    new_dict.set("BitsPerComponent", 8);
    new_dict.set("Width", decoded.width());
    new_dict.set("Height", decoded.height());
    new_dict.set("ColorSpace", space);
    Ok(Some(Stream::new(new_dict, encoded)))
}

fn raw_to_image(raw: Vec<u8>, width: u32, height: u32, components: usize) -> Option<DynamicImage> {
    let expected = width as usize * height as usize * components;
    if raw.len() < expected {
        return None;
    }
    let mut raw = raw;
    raw.truncate(expected);

    match components {
        1 => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb = raw.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}

fn cmyk_to_rgb(px: &[u8]) -> [u8; 3] {
    let k = 255 - px[3] as u32;
    let channel = |c: u8| ((255 - c as u32) * k / 255) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2])]
}
