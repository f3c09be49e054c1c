//! Structured-XML strategy for word-processing packages (DOCX).
//!
//! The archive is unpacked into the call's scratch directory, every XML part
//! under `word/` is rewritten paragraph by paragraph, and the archive is
//! repacked with the original entry order. Word splits text into runs
//! arbitrarily, so each paragraph's runs are merged before matching; the
//! substituted text goes into the first run and the others are emptied.
//!
//! Parts are scanned lexically rather than parsed, so a malformed region is
//! left as it is instead of failing the whole document.

use super::format::DocumentFormat;
use super::report::{DocumentAnalysis, MatchLocation, PageAnalysis};
use super::strategy::{DocumentRedactor, StrategyOutcome, StrategyUsed};
use super::text_layer::distinct_matches;
use crate::domain::{MatchCounts, PatternCatalog, Placeholders};
use crate::error::{RedactorError, RedactorResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

static PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:p(?:\s[^>]*)?>|</w:p\s*>").expect("Valid paragraph tag regex"));

static TEXT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(<w:t(?:\s[^>/]*)?>)([^<]*)</w:t>").expect("Valid text run regex")
});

static RELATIONSHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Relationship\s[^>]*>").expect("Valid relationship regex"));

static REL_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sTarget="([^"]*)""#).expect("Valid relationship target regex"));

static EXTERNAL_MODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sTargetMode="External""#).expect("Valid target mode regex"));

/// Schemes of link targets that may carry contact details.
const LINK_SCHEMES: [&str; 4] = ["mailto:", "tel:", "http://", "https://"];

/// Redactor for DOCX packages.
#[derive(Debug, Clone)]
pub struct DocxRedactor {
    catalog: &'static PatternCatalog,
    placeholders: Placeholders,
}

impl DocxRedactor {
    pub fn new(catalog: &'static PatternCatalog, placeholders: Placeholders) -> Self {
        Self {
            catalog,
            placeholders,
        }
    }

    /// Matches in the package's text projection. Every match in a DOCX is
    /// addressable, so `located` equals `occurrences`.
    pub fn analyze(&self, input: &Path) -> RedactorResult<DocumentAnalysis> {
        let text = docx_text(input)?;
        let matches = distinct_matches(self.catalog, &text)
            .into_iter()
            .map(|(kind, text, occurrences)| MatchLocation {
                kind,
                text,
                occurrences,
                located: occurrences,
            })
            .collect();

        let mut analysis = DocumentAnalysis::new(DocumentFormat::Docx);
        analysis.pages.push(PageAnalysis {
            page: 1,
            text_chars: text.trim().chars().count(),
            images: 0,
            matches,
        });
        Ok(analysis)
    }
}

impl DocumentRedactor for DocxRedactor {
    fn redact(&self, input: &Path, output: &Path, scratch: &Path) -> RedactorResult<StrategyOutcome> {
        let root = scratch.join("docx");
        let entries = unpack(input, &root)?;
        let mut outcome = StrategyOutcome::new(StrategyUsed::StructuredXml);

        for entry in entries.iter().filter(|e| !e.is_dir && e.name.starts_with("word/")) {
            let rewrite: fn(&str, &PatternCatalog, &Placeholders) -> (Option<String>, MatchCounts, usize) =
                if entry.name.ends_with(".xml") {
                    redact_part
                } else if entry.name.ends_with(".rels") {
                    redact_relationships
                } else {
                    continue;
                };

            let path = root.join(&entry.local);
            let bytes = fs::read(&path).map_err(|e| RedactorError::io(&path, e))?;
            let Ok(xml) = String::from_utf8(bytes) else {
                warn!(part = %entry.name, "part is not UTF-8, copied unchanged");
                continue;
            };

            outcome.pages_processed += 1;
            let (rewritten, counts, regions) = rewrite(&xml, self.catalog, &self.placeholders);
            if let Some(rewritten) = rewritten {
                fs::write(&path, rewritten).map_err(|e| RedactorError::io(&path, e))?;
                outcome.pages_modified += 1;
                debug!(part = %entry.name, matches = counts.total(), "rewrote part");
            }
            outcome.found.merge(&counts);
            outcome.redacted.merge(&counts);
            outcome.regions_redacted += regions;
        }

        if outcome.regions_redacted == 0 {
            // nothing rewritten: the input is already clean
            fs::copy(input, output).map_err(|e| RedactorError::io(output, e))?;
        } else {
            repack(&entries, &root, output)?;
        }
        Ok(outcome)
    }

    fn extract_text(&self, input: &Path) -> RedactorResult<String> {
        docx_text(input)
    }

    fn name(&self) -> &str {
        "StructuredXml"
    }
}

/// Text projection of a package: merged paragraph text of every XML part
/// under `word/`, plus relationship targets.
pub fn docx_text(input: &Path) -> RedactorResult<String> {
    let file = File::open(input).map_err(|e| RedactorError::io(input, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| RedactorError::corrupt(input, e))?;

    let mut lines = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| RedactorError::corrupt(input, e))?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.starts_with("word/") {
            continue;
        }
        let is_xml = name.ends_with(".xml");
        if !is_xml && !name.ends_with(".rels") {
            continue;
        }
        let mut xml = String::new();
        if entry.read_to_string(&mut xml).is_err() {
            continue;
        }
        if is_xml {
            lines.extend(paragraph_texts(&xml));
        } else {
            lines.extend(
                external_targets(&xml)
                    .into_iter()
                    .map(|range| decode_entities(&xml[range]).into_owned()),
            );
        }
    }
    Ok(lines.join("\n"))
}

#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    local: PathBuf,
    is_dir: bool,
    compression: CompressionMethod,
}

fn unpack(input: &Path, root: &Path) -> RedactorResult<Vec<ArchiveEntry>> {
    let file = File::open(input).map_err(|e| RedactorError::io(input, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| RedactorError::corrupt(input, e))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| RedactorError::corrupt(input, e))?;
        let name = entry.name().to_string();
        let local = entry
            .enclosed_name()
            .ok_or_else(|| RedactorError::corrupt(input, format!("unsafe entry name '{}'", name)))?;
        let dest = root.join(&local);

        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| RedactorError::io(&dest, e))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| RedactorError::io(parent, e))?;
            }
            let mut out = File::create(&dest).map_err(|e| RedactorError::io(&dest, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| RedactorError::corrupt(input, e))?;
        }

        entries.push(ArchiveEntry {
            name,
            local,
            is_dir: entry.is_dir(),
            compression: entry.compression(),
        });
    }
    Ok(entries)
}

fn repack(entries: &[ArchiveEntry], root: &Path, output: &Path) -> RedactorResult<()> {
    let file = File::create(output).map_err(|e| RedactorError::io(output, e))?;
    let mut writer = ZipWriter::new(file);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        if entry.is_dir {
            writer.add_directory(entry.name.as_str(), deflated)?;
            continue;
        }
        // already-compressed media keeps its stored layout
        let options = if entry.compression == CompressionMethod::Stored && entry.name.starts_with("word/media/") {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            deflated
        };
        writer.start_file(entry.name.as_str(), options)?;
        let path = root.join(&entry.local);
        let mut part = File::open(&path).map_err(|e| RedactorError::io(&path, e))?;
        io::copy(&mut part, &mut writer).map_err(|e| RedactorError::io(output, e))?;
    }

    writer.finish()?;
    Ok(())
}

#[derive(Debug, Clone)]
struct TextRun {
    tag: Range<usize>,
    content: Range<usize>,
}

/// Byte ranges of well-formed `<w:p>` elements. Unbalanced tags are ignored.
fn paragraph_spans(xml: &str) -> Vec<Range<usize>> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    for tag in PARAGRAPH_TAG.find_iter(xml) {
        if tag.as_str().starts_with("</") {
            if let Some(start) = open.pop() {
                spans.push(start..tag.end());
            }
        } else if !tag.as_str().ends_with("/>") {
            open.push(tag.start());
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

/// Text runs grouped by the innermost paragraph containing them, in
/// paragraph order.
fn paragraph_runs(xml: &str) -> Vec<Vec<TextRun>> {
    let spans = paragraph_spans(xml);
    let mut groups: Vec<Vec<TextRun>> = vec![Vec::new(); spans.len()];

    for caps in TEXT_RUN.captures_iter(xml) {
        let (Some(tag), Some(content)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let owner = spans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start <= tag.start() && content.end() <= s.end)
            .max_by_key(|(_, s)| s.start)
            .map(|(i, _)| i);
        if let Some(owner) = owner {
            groups[owner].push(TextRun {
                tag: tag.range(),
                content: content.range(),
            });
        }
    }

    groups.retain(|g| !g.is_empty());
    groups
}

fn paragraph_texts(xml: &str) -> Vec<String> {
    paragraph_runs(xml)
        .iter()
        .map(|runs| {
            runs.iter()
                .map(|r| decode_entities(&xml[r.content.clone()]))
                .collect::<String>()
        })
        .collect()
}

/// Rewrites one XML part. Returns the new text when anything changed, the
/// per-kind substitution counts, and the number of paragraphs touched.
fn redact_part(
    xml: &str,
    catalog: &PatternCatalog,
    placeholders: &Placeholders,
) -> (Option<String>, MatchCounts, usize) {
    let mut counts = MatchCounts::default();
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut paragraphs = 0;

    for runs in paragraph_runs(xml) {
        let merged: String = runs
            .iter()
            .map(|r| decode_entities(&xml[r.content.clone()]))
            .collect();
        let (replaced, found) = catalog.substitute(&merged, placeholders);
        if found.total() == 0 {
            continue;
        }
        counts.merge(&found);
        paragraphs += 1;

        let first = &runs[0];
        let tag = &xml[first.tag.clone()];
        let padded = replaced.starts_with(char::is_whitespace) || replaced.ends_with(char::is_whitespace);
        if padded && !tag.contains("xml:space") {
            edits.push((first.tag.clone(), format!("<w:t xml:space=\"preserve\"{}", &tag[4..])));
        }
        edits.push((first.content.clone(), encode_text(&replaced)));
        for run in &runs[1..] {
            if !run.content.is_empty() {
                edits.push((run.content.clone(), String::new()));
            }
        }
    }

    if edits.is_empty() {
        return (None, counts, 0);
    }
    (Some(apply_edits(xml, edits)), counts, paragraphs)
}

/// Scrubs external `Target` attributes of relationship parts (`mailto:` and
/// `tel:` links). Internal targets name package parts and are never touched.
fn redact_relationships(
    xml: &str,
    catalog: &PatternCatalog,
    placeholders: &Placeholders,
) -> (Option<String>, MatchCounts, usize) {
    let mut counts = MatchCounts::default();
    let mut edits = Vec::new();

    for range in external_targets(xml) {
        let decoded = decode_entities(&xml[range.clone()]);
        let (replaced, found) = catalog.substitute(&decoded, placeholders);
        if found.total() > 0 {
            counts.merge(&found);
            edits.push((range, encode_attr(&replaced)));
        }
    }

    if edits.is_empty() {
        return (None, counts, 0);
    }
    let targets = edits.len();
    (Some(apply_edits(xml, edits)), counts, targets)
}

/// Byte ranges of `Target` values pointing outside the package: either the
/// relationship is `TargetMode="External"` or the target is a link URI.
fn external_targets(xml: &str) -> Vec<Range<usize>> {
    RELATIONSHIP
        .find_iter(xml)
        .filter_map(|element| {
            let tag = element.as_str();
            let target = REL_TARGET.captures(tag)?.get(1)?;
            let external = EXTERNAL_MODE.is_match(tag) || is_link(target.as_str());
            external.then(|| element.start() + target.start()..element.start() + target.end())
        })
        .collect()
}

fn is_link(target: &str) -> bool {
    let target = target.trim_start().to_ascii_lowercase();
    LINK_SCHEMES.iter().any(|scheme| target.starts_with(scheme))
}

/// Applies non-overlapping byte-range replacements.
fn apply_edits(xml: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&xml[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = rest
            .find(';')
            .filter(|&end| end <= 12)
            .and_then(|end| entity_char(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn entity_char(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn encode_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn encode_attr(text: &str) -> String {
    encode_text(text).replace('"', "&quot;")
}
