//! Tesseract OCR wrapper and word-box handling.
//!
//! Tesseract runs as an external process writing TSV; word boxes are grouped
//! into lines, matched against the catalog, and scaled back into page space.

use super::ops::Rect;
use crate::config::OcrConfig;
use crate::domain::{PatternCatalog, PiiKind};
use crate::error::{RedactorError, RedactorResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One recognized word (TSV level 5) in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub block: u32,
    pub par: u32,
    pub line: u32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub conf: f32,
    pub text: String,
}

/// Inclusive-exclusive pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelBox {
    fn of(word: &OcrWord) -> Self {
        Self {
            left: word.left,
            top: word.top,
            right: word.left.saturating_add(word.width),
            bottom: word.top.saturating_add(word.height),
        }
    }

    fn union(&self, other: &PixelBox) -> PixelBox {
        PixelBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A catalog match located in OCR output.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrHit {
    pub kind: PiiKind,
    pub text: String,
    pub bbox: PixelBox,
}

/// Parses Tesseract TSV, keeping non-empty word rows.
///
/// Columns: level, page, block, par, line, word, left, top, width, height, conf, text.
pub fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].trim() != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);

        words.push(OcrWord {
            block: num(2),
            par: num(3),
            line: num(4),
            left: num(6),
            top: num(7),
            width: num(8),
            height: num(9),
            conf: cols[10].trim().parse().unwrap_or(-1.0),
            text: text.to_string(),
        });
    }

    words
}

/// Finds catalog matches across each OCR line and within single words.
///
/// Line text is the words joined by one space, so a phone number split
/// into several words is still found; its box is the union of every word
/// the match overlaps.
pub fn find_hits(words: &[OcrWord], catalog: &PatternCatalog) -> Vec<OcrHit> {
    let mut hits = Vec::new();
    let mut covered: BTreeSet<usize> = BTreeSet::new();

    for line in group_lines(words) {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(line.len());
        for &idx in &line {
            if !text.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(&words[idx].text);
            spans.push((idx, start, text.len()));
        }

        for matcher in catalog.matchers() {
            for m in matcher.pattern().find_iter(&text) {
                let overlapping: Vec<usize> = spans
                    .iter()
                    .filter(|(_, s, e)| *s < m.end() && m.start() < *e)
                    .map(|(idx, _, _)| *idx)
                    .collect();
                if let Some(bbox) = union_box(words, &overlapping) {
                    covered.extend(overlapping.iter().copied());
                    hits.push(OcrHit {
                        kind: matcher.kind(),
                        text: m.as_str().to_string(),
                        bbox,
                    });
                }
            }
        }
    }

    for (idx, word) in words.iter().enumerate() {
        if covered.contains(&idx) {
            continue;
        }
        if let Some(kind) = catalog.classify(&word.text) {
            hits.push(OcrHit {
                kind,
                text: word.text.clone(),
                bbox: PixelBox::of(word),
            });
        }
    }

    hits
}

/// Word indices grouped by (block, paragraph, line), in reading order.
fn group_lines(words: &[OcrWord]) -> Vec<Vec<usize>> {
    let mut lines: Vec<((u32, u32, u32), Vec<usize>)> = Vec::new();
    for (idx, word) in words.iter().enumerate() {
        let key = (word.block, word.par, word.line);
        match lines.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(idx),
            None => lines.push((key, vec![idx])),
        }
    }
    lines.into_iter().map(|(_, members)| members).collect()
}

fn union_box(words: &[OcrWord], indices: &[usize]) -> Option<PixelBox> {
    indices
        .iter()
        .map(|&i| PixelBox::of(&words[i]))
        .reduce(|a, b| a.union(&b))
}

/// Maps a pixel box from a `image_width` x `image_height` render back into
/// `page` coordinates, clamped to the page.
pub fn scale_to_page(bbox: PixelBox, image_width: u32, image_height: u32, page: Rect) -> Rect {
    let (iw, ih) = (image_width.max(1) as f64, image_height.max(1) as f64);
    let (pw, ph) = (page.width() as f64, page.height() as f64);
    let sx = |px: u32| (page.x0 as f64 + px as f64 * pw / iw) as f32;
    let sy = |px: u32| (page.y0 as f64 + px as f64 * ph / ih) as f32;

    Rect::new(sx(bbox.left), sy(bbox.top), sx(bbox.right), sy(bbox.bottom)).clamp_to(&page)
}

/// Tesseract command-line engine.
#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: PathBuf,
    language: String,
}

impl Tesseract {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.binary, &config.language)
    }

    /// Checks that the binary starts and exits cleanly.
    pub fn check_available(&self, timeout: Duration) -> RedactorResult<()> {
        let mut child = self.spawn(Command::new(&self.binary).arg("--version"))?;
        let status = wait_with_deadline(&mut child, timeout)?;
        if !status.success() {
            return Err(RedactorError::OcrUnavailable {
                reason: format!("{} --version exited with {}", self.binary.display(), status),
            });
        }
        Ok(())
    }

    /// Runs OCR on `image`, writing `<out_base>.tsv`, and returns its words.
    pub fn recognize(&self, image: &Path, out_base: &Path, timeout: Duration) -> RedactorResult<Vec<OcrWord>> {
        let started = Instant::now();
        let mut command = Command::new(&self.binary);
        command
            .arg(image)
            .arg(out_base)
            .arg("-l")
            .arg(&self.language)
            .arg("tsv");

        let mut child = self.spawn(&mut command)?;
        let status = wait_with_deadline(&mut child, timeout)?;
        if !status.success() {
            return Err(RedactorError::OcrUnavailable {
                reason: format!("tesseract exited with {}", status),
            });
        }

        let tsv_path = out_base.with_extension("tsv");
        let tsv = std::fs::read_to_string(&tsv_path).map_err(|e| RedactorError::OcrUnavailable {
            reason: format!("no OCR output at {}: {}", tsv_path.display(), e),
        })?;
        let words = parse_tsv(&tsv);
        debug!(
            words = words.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tesseract finished"
        );
        Ok(words)
    }

    fn spawn(&self, command: &mut Command) -> RedactorResult<Child> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RedactorError::OcrUnavailable {
                reason: format!("failed to start {}: {}", self.binary.display(), e),
            })
    }
}

/// Waits for `child`, killing it once `timeout` has elapsed.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> RedactorResult<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                return Err(RedactorError::OcrUnavailable {
                    reason: format!("failed to wait for OCR process: {}", e),
                })
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RedactorError::OcrUnavailable {
                reason: format!("timed out after {:?}", timeout),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_keeps_words_only() {
        let words = parse_tsv(&tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t",
            "4\t1\t1\t1\t1\t0\t100\t40\t900\t50\t-1\t",
            "5\t1\t1\t1\t1\t1\t100\t40\t200\t50\t96.5\tPhone:",
            "5\t1\t1\t1\t1\t2\t320\t40\t120\t50\t95\t ",
        ]));
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Phone:");
        assert_eq!(words[0].left, 100);
        assert_eq!(words[0].conf, 96.5);
    }

    #[test]
    fn test_phone_split_across_words() {
        let words = parse_tsv(&tsv(&[
            "5\t1\t1\t1\t1\t1\t100\t40\t150\t50\t96\tCell",
            "5\t1\t1\t1\t1\t2\t270\t42\t120\t48\t92\t0300",
            "5\t1\t1\t1\t1\t3\t400\t40\t220\t52\t90\t5714594",
            "5\t1\t1\t1\t2\t1\t100\t120\t500\t50\t91\tali.khan@gmail.com",
        ]));
        let hits = find_hits(&words, PatternCatalog::global());

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].kind, PiiKind::Phone);
        assert_eq!(hits[0].text, "0300 5714594");
        assert_eq!(
            hits[0].bbox,
            PixelBox {
                left: 270,
                top: 40,
                right: 620,
                bottom: 92
            }
        );
        assert_eq!(hits[1].kind, PiiKind::Email);
    }

    #[test]
    fn test_scale_edge_of_page() {
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        // 300 dpi render of US Letter
        let (w, h) = (2550, 3300);
        let bottom_right = PixelBox {
            left: 2400,
            top: 3200,
            right: 2550,
            bottom: 3300,
        };
        let rect = scale_to_page(bottom_right, w, h, page);
        assert_eq!(rect.x1, 612.0);
        assert_eq!(rect.y1, 792.0);
        assert_eq!(rect.x0, 576.0);
        assert_eq!(rect.y0, 768.0);

        let overflow = PixelBox {
            left: 2500,
            top: 3250,
            right: 2700,
            bottom: 3400,
        };
        let rect = scale_to_page(overflow, w, h, page);
        assert_eq!(rect.x1, 612.0);
        assert_eq!(rect.y1, 792.0);
    }

    #[test]
    fn test_scale_offset_page_origin() {
        let page = Rect::new(10.0, 20.0, 110.0, 220.0);
        let rect = scale_to_page(
            PixelBox {
                left: 0,
                top: 0,
                right: 50,
                bottom: 100,
            },
            100,
            200,
            page,
        );
        assert_eq!(rect, Rect::new(10.0, 20.0, 60.0, 120.0));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let engine = Tesseract::new("/nonexistent/tesseract-binary", "eng");
        assert!(matches!(
            engine.check_available(Duration::from_secs(1)),
            Err(RedactorError::OcrUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow.sh");
        std::fs::write(&script, "sleep 5\n").unwrap();

        // `sh <script> <base> -l eng tsv` runs the script as the "image".
        let engine = Tesseract::new("sh", "eng");
        let started = Instant::now();
        let err = engine
            .recognize(&script, &dir.path().join("out"), Duration::from_millis(200))
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            RedactorError::OcrUnavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected OcrUnavailable, got {:?}", other),
        }
    }
}
