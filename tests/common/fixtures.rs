//! Test fixtures and document builders.
//!
//! Text résumés are built with printpdf; scanned-looking and image-heavy
//! PDFs are assembled object by object with lopdf; DOCX packages are
//! zipped by hand so run splitting is under the test's control.

#![allow(dead_code)]

use anyhow::{Context, Result};
use lopdf::{dictionary, Document, Object, Stream};
use printpdf::*;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builder for text-layer résumé PDFs, one `use_text` call per line.
#[derive(Debug, Clone)]
pub struct TestResumeBuilder {
    title: String,
    lines: Vec<String>,
    page_width: Mm,
    page_height: Mm,
}

impl TestResumeBuilder {
    pub fn new() -> Self {
        Self {
            title: "Curriculum Vitae".to_string(),
            lines: Vec::new(),
            page_width: Mm(210.0),
            page_height: Mm(297.0),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    /// Adds the usual filler so the text layer is clearly above the scan threshold.
    pub fn with_experience(self) -> Self {
        self.with_line("Experience")
            .with_line("Senior Backend Engineer, Lahore, 2019 to present")
            .with_line("Designed billing services handling two million requests a day")
            .with_line("Education: BS Computer Science")
    }

    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let (doc, page1, layer1) = PdfDocument::new(&self.title, self.page_width, self.page_height, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        layer.use_text(&self.title, 16.0, Mm(20.0), Mm(270.0), &font);
        for (i, line) in self.lines.iter().enumerate() {
            let y = 255.0 - 8.0 * i as f32;
            layer.use_text(line, 11.0, Mm(20.0), Mm(y), &font);
        }

        doc.save(&mut BufWriter::new(fs::File::create(output_path)?))?;
        Ok(output_path.to_path_buf())
    }
}

impl Default for TestResumeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Résumé with one phone, one email and one national id.
pub fn create_contact_resume(path: &Path) -> Result<PathBuf> {
    TestResumeBuilder::new()
        .with_title("Ali Khan")
        .with_line("Phone: 0300-1234567")
        .with_line("Email: ali.khan@example.com")
        .with_line("CNIC: 35202-1234567-1")
        .with_experience()
        .build(path)
}

/// Résumé without any PII.
pub fn create_clean_resume(path: &Path) -> Result<PathBuf> {
    TestResumeBuilder::new()
        .with_title("Candidate Profile")
        .with_experience()
        .build(path)
}

/// Gradient with texture; Flate does poorly on it, JPEG does well.
pub fn noisy_rgb(width: u32, height: u32) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| {
            let x = i % width;
            let y = i / width;
            let n = (x.wrapping_mul(7919) ^ y.wrapping_mul(104729)) as u8;
            [(x as u8) ^ n, y as u8, n]
        })
        .collect()
}

/// Single page PDF assembled with lopdf. `text` lines are drawn in
/// Helvetica at the top of the page; the image, when given, fills the
/// rectangle `[x, y, w, h]` in user space.
pub fn build_lopdf_page(
    path: &Path,
    text: &[&str],
    image: Option<(u32, u32, Vec<u8>, &str)>,
    placement: [i64; 4],
) -> Result<PathBuf> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut content = String::new();
    for (i, line) in text.iter().enumerate() {
        content.push_str(&format!("BT /F1 12 Tf 72 {} Td ({}) Tj ET\n", 740 - 18 * i as i64, line));
    }

    let mut xobjects = lopdf::Dictionary::new();
    if let Some((width, height, pixels, color_space)) = image {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
            },
            pixels,
        ));
        xobjects.set("Im0", image_id);
        let [x, y, w, h] = placement;
        content.push_str(&format!("q {} 0 0 {} {} {} cm /Im0 Do Q\n", w, h, x, y));
    }

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(path.to_path_buf())
}

/// A "scanned" résumé: one full-page grayscale image and no text layer.
pub fn create_scanned_resume(path: &Path) -> Result<PathBuf> {
    let (w, h) = (120u32, 160u32);
    let pixels: Vec<u8> = (0..w * h).map(|i| if (i / w) % 16 < 2 { 0 } else { 255 }).collect();
    build_lopdf_page(path, &[], Some((w, h, pixels, "DeviceGray")), [0, 0, 612, 792])
}

/// Text résumé whose content stream first selects a font the page never
/// declares. pdf-extract cannot read it; MuPDF skips the stray operator.
pub fn create_stray_font_resume(path: &Path) -> Result<PathBuf> {
    build_lopdf_page(
        path,
        &["Ali Khan", "Phone: 0300-1234567", "Backend engineer"],
        None,
        [0, 0, 0, 0],
    )?;
    let mut doc = Document::load(path)?;
    let page_id = *doc.get_pages().get(&1).context("fixture has one page")?;
    let content_id = *doc.get_page_contents(page_id).first().context("page has content")?;
    let stream = doc.get_object_mut(content_id)?.as_stream_mut()?;
    let mut content = b"BT /F9 11 Tf 72 770 Td (Curriculum vitae) Tj ET\n".to_vec();
    content.extend_from_slice(&stream.content);
    stream.set_content(content);
    doc.save(path)?;
    Ok(path.to_path_buf())
}

/// Stand-in for the tesseract binary: answers `--version` and writes a
/// canned TSV with one email word to `<base>.tsv`.
#[cfg(unix)]
pub fn write_fake_tesseract(dir: &Path, word: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-tesseract");
    let body = format!(
        concat!(
            "#!/bin/sh\n",
            "if [ \"$1\" = \"--version\" ]; then echo \"tesseract 5.3.0\"; exit 0; fi\n",
            "printf 'level\\tpage_num\\tblock_num\\tpar_num\\tline_num\\tword_num\\tleft\\ttop\\twidth\\theight\\tconf\\ttext\\n' > \"$2.tsv\"\n",
            "printf '5\\t1\\t1\\t1\\t1\\t1\\t100\\t100\\t200\\t20\\t96.0\\t{}\\n' >> \"$2.tsv\"\n",
        ),
        word
    );
    fs::write(&script, body)?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;
    Ok(script)
}

/// A text résumé carrying a large uncompressed photo, well over a megabyte.
pub fn create_heavy_resume(path: &Path) -> Result<PathBuf> {
    let (w, h) = (700u32, 700u32);
    build_lopdf_page(
        path,
        &[
            "Ali Khan",
            "Phone: 0300-1234567",
            "Email: ali.khan@example.com",
            "Senior Backend Engineer with ten years of experience",
        ],
        Some((w, h, noisy_rgb(w, h), "DeviceRGB")),
        [100, 80, 400, 400],
    )
}

/// One DOCX entry: name, body, and whether to store it uncompressed.
pub struct DocxEntry {
    pub name: String,
    pub body: Vec<u8>,
    pub stored: bool,
}

impl DocxEntry {
    pub fn xml(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            body: body.as_bytes().to_vec(),
            stored: false,
        }
    }

    pub fn media(name: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            body: body.to_vec(),
            stored: true,
        }
    }
}

/// Wraps paragraphs in a minimal `word/document.xml` body.
pub fn document_xml(paragraphs: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        paragraphs
    )
}

pub fn write_docx(path: &Path, entries: &[DocxEntry]) -> Result<PathBuf> {
    let mut zip = ZipWriter::new(fs::File::create(path)?);
    for entry in entries {
        let method = if entry.stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        zip.start_file(entry.name.as_str(), SimpleFileOptions::default().compression_method(method))?;
        zip.write_all(&entry.body)?;
    }
    zip.finish()?;
    Ok(path.to_path_buf())
}

/// Résumé package with PII split across runs, in a header, and in a hyperlink target.
pub fn create_resume_docx(path: &Path) -> Result<PathBuf> {
    let body = document_xml(concat!(
        "<w:p><w:r><w:t>Ali Khan</w:t></w:r></w:p>",
        "<w:p><w:r><w:t xml:space=\"preserve\">Phone: 0300-</w:t></w:r><w:r><w:t>1234567</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>Email: ali.khan@</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>example.com</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>Backend engineer</w:t></w:r></w:p>",
    ));
    let header = document_xml("<w:p><w:r><w:t>CNIC 35202-1234567-1</w:t></w:r></w:p>");
    let rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="mailto:ali.khan@example.com" TargetMode="External"/>"#,
        "</Relationships>"
    );

    write_docx(
        path,
        &[
            DocxEntry::xml("[Content_Types].xml", r#"<?xml version="1.0"?><Types/>"#),
            DocxEntry::xml("word/document.xml", &body),
            DocxEntry::xml("word/header1.xml", &header),
            DocxEntry::xml("word/_rels/document.xml.rels", rels),
            DocxEntry::media("word/media/image1.png", b"\x89PNG\r\n\x1a\nnot really a png"),
        ],
    )
}

/// Package with no PII at all.
pub fn create_clean_docx(path: &Path) -> Result<PathBuf> {
    write_docx(
        path,
        &[
            DocxEntry::xml("[Content_Types].xml", r#"<?xml version="1.0"?><Types/>"#),
            DocxEntry::xml(
                "word/document.xml",
                &document_xml("<w:p><w:r><w:t>Backend engineer, Lahore</w:t></w:r></w:p>"),
            ),
        ],
    )
}

/// Entry names of a zip archive, in archive order.
pub fn zip_entry_names(path: &Path) -> Result<Vec<String>> {
    let archive = zip::ZipArchive::new(fs::File::open(path)?)?;
    Ok(archive.file_names().map(str::to_string).collect::<Vec<_>>())
}
