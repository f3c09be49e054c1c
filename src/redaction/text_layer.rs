//! Text-layer strategy: find matches in a page's text projection, locate
//! them visually, and turn every located hit into a [`RedactionOp`].

use super::ops::{RedactionOp, TextLocator};
use super::strategy::UnmaskedMatch;
use crate::domain::{MatchCounts, PatternCatalog, PiiKind, Placeholders};
use crate::error::RedactorResult;
use tracing::{debug, warn};

/// Everything decided for one page before it is edited.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PagePlan {
    pub ops: Vec<RedactionOp>,
    pub found: MatchCounts,
    pub redacted: MatchCounts,
    pub unmasked: Vec<UnmaskedMatch>,
}

/// Distinct (kind, substring) pairs in first-seen order, with occurrence counts.
pub fn distinct_matches(catalog: &PatternCatalog, text: &str) -> Vec<(PiiKind, String, usize)> {
    let mut distinct: Vec<(PiiKind, String, usize)> = Vec::new();
    for m in catalog.find_all(text) {
        match distinct
            .iter_mut()
            .find(|(kind, needle, _)| *kind == m.kind && *needle == m.text)
        {
            Some(entry) => entry.2 += 1,
            None => distinct.push((m.kind, m.text, 1)),
        }
    }
    distinct
}

/// Search needle for a matched substring. Line breaks picked up by the
/// text projection are folded to single spaces.
pub fn search_needle(matched: &str) -> String {
    matched.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plans the redaction of one page (`page_number` is 1-based).
pub fn plan_page(
    page_number: usize,
    text: &str,
    locator: &dyn TextLocator,
    catalog: &PatternCatalog,
    placeholders: &Placeholders,
    font_size: f32,
) -> RedactorResult<PagePlan> {
    let mut plan = PagePlan::default();

    for (kind, matched, occurrences) in distinct_matches(catalog, text) {
        plan.found.add(kind, occurrences);

        let needle = search_needle(&matched);
        let rects = locator.search(&needle)?;
        if rects.is_empty() {
            warn!(page = page_number, %kind, "match found in text but not on page");
            debug!(page = page_number, needle = %needle, "unlocated match");
            plan.unmasked.push(UnmaskedMatch {
                page: page_number,
                kind,
                text: matched,
            });
            continue;
        }

        debug!(page = page_number, %kind, hits = rects.len(), needle = %needle, "located match");
        // a hit can only cover one occurrence of the text
        plan.redacted.add(kind, rects.len().min(occurrences));
        let replacement = placeholders.for_kind(kind);
        plan.ops.extend(
            rects
                .into_iter()
                .map(|rect| RedactionOp::new(rect, replacement, font_size)),
        );
    }

    Ok(plan)
}
