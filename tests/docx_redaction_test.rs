//! End-to-end redaction of DOCX résumés.

mod common;

use anyhow::Result;
use common::*;
use resume_redactor::{DocumentFormat, RedactionService, StrategyUsed};
use std::fs;
use std::io::Read;
use tempfile::TempDir;

fn read_entry(path: &std::path::Path, name: &str) -> Result<String> {
    let mut archive = zip::ZipArchive::new(fs::File::open(path)?)?;
    let mut entry = archive.by_name(name)?;
    let mut out = String::new();
    entry.read_to_string(&mut out)?;
    Ok(out)
}

#[test]
fn test_split_runs_redacted() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;
    let output = temp_dir.path().join("cv.out.docx");

    let report = RedactionService::with_defaults().redact(&input, &output)?;

    assert_eq!(report.format, DocumentFormat::Docx);
    assert_eq!(report.strategy, StrategyUsed::StructuredXml);
    assert_eq!(report.found.phone, 1);
    assert_eq!(report.found.national_id, 1);
    // body paragraph plus hyperlink target
    assert_eq!(report.found.email, 2);
    assert_eq!(report.total_redacted(), report.total_found());
    assert!(!report.leakage_warning, "unexpected leakage: {:?}", report.leakage);
    assert!(!report.requires_review());

    let body = read_entry(&output, "word/document.xml")?;
    assert!(body.contains("+92-300-0000000"));
    assert!(body.contains("hidden@email.com"));
    assert!(!body.contains("1234567"));
    assert!(!body.contains("example.com"));
    assert!(body.contains("Backend engineer"));

    let header = read_entry(&output, "word/header1.xml")?;
    assert!(header.contains("00000-0000000-0"));

    let rels = read_entry(&output, "word/_rels/document.xml.rels")?;
    assert!(rels.contains(r#"Target="mailto:hidden@email.com""#));
    Ok(())
}

#[test]
fn test_image_relationship_survives() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("logo.docx");
    let body = document_xml("<w:p><w:r><w:t>Mail ali.khan@example.com</w:t></w:r></w:p>");
    let rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/logo@2x.png"/>"#,
        r#"<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="mailto:ali.khan@example.com" TargetMode="External"/>"#,
        "</Relationships>"
    );
    write_docx(
        &input,
        &[
            DocxEntry::xml("[Content_Types].xml", r#"<?xml version="1.0"?><Types/>"#),
            DocxEntry::xml("word/document.xml", &body),
            DocxEntry::xml("word/_rels/document.xml.rels", rels),
            DocxEntry::media("word/media/logo@2x.png", b"\x89PNG\r\n\x1a\nlogo"),
        ],
    )?;
    let output = temp_dir.path().join("logo.out.docx");

    let report = RedactionService::with_defaults().redact(&input, &output)?;

    assert_eq!(report.found.email, 2);
    assert!(!report.leakage_warning, "unexpected leakage: {:?}", report.leakage);
    let rels = read_entry(&output, "word/_rels/document.xml.rels")?;
    assert!(rels.contains(r#"Target="media/logo@2x.png""#));
    assert!(rels.contains(r#"Target="mailto:hidden@email.com""#));
    assert!(zip_entry_names(&output)?.contains(&"word/media/logo@2x.png".to_string()));
    Ok(())
}

#[test]
fn test_package_layout_preserved() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;
    let output = temp_dir.path().join("cv.out.docx");

    RedactionService::with_defaults().redact(&input, &output)?;

    assert_eq!(zip_entry_names(&input)?, zip_entry_names(&output)?);

    let mut archive = zip::ZipArchive::new(fs::File::open(&output)?)?;
    let media = archive.by_name("word/media/image1.png")?;
    assert_eq!(media.compression(), zip::CompressionMethod::Stored);
    Ok(())
}

#[test]
fn test_clean_docx_copied_unchanged() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_clean_docx(&temp_dir.path().join("clean.docx"))?;
    let output = temp_dir.path().join("clean.out.docx");

    let report = RedactionService::with_defaults().redact(&input, &output)?;

    assert_eq!(report.total_found(), 0);
    assert!(!report.requires_review());
    assert_eq!(fs::read(&input)?, fs::read(&output)?);
    Ok(())
}

#[test]
fn test_docx_redaction_is_deterministic() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;
    let service = RedactionService::with_defaults();

    let a = temp_dir.path().join("a.docx");
    let b = temp_dir.path().join("b.docx");
    let first = service.redact(&input, &a)?;
    let second = service.redact(&input, &b)?;

    assert_eq!(first, second);
    for name in zip_entry_names(&input)? {
        if name.ends_with(".xml") || name.ends_with(".rels") {
            assert_eq!(read_entry(&a, &name)?, read_entry(&b, &name)?, "{} differs", name);
        }
    }
    Ok(())
}

#[test]
fn test_concurrent_calls_share_one_service() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;
    let service = RedactionService::with_defaults();

    let reports: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let output = temp_dir.path().join(format!("out-{}.docx", i));
                let service = &service;
                let input = &input;
                scope.spawn(move || service.redact(input, &output))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    let reports = reports.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert!(reports.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(reports[0].total_found(), 4);
    Ok(())
}

#[test]
fn test_extract_text_merges_runs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;

    let text = extract_text(&input)?;
    assert!(text.contains("Phone: 0300-1234567"));
    assert!(text.contains("Email: ali.khan@example.com"));
    assert!(text.contains("mailto:ali.khan@example.com"));
    Ok(())
}

#[test]
fn test_analyze_docx() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_resume_docx(&temp_dir.path().join("cv.docx"))?;

    let analysis = RedactionService::with_defaults().analyze(&input)?;
    assert_eq!(analysis.format, DocumentFormat::Docx);
    assert!(!analysis.image_based);
    assert_eq!(analysis.total_matches(), 4);
    assert_eq!(analysis.unlocatable().count(), 0);
    Ok(())
}
