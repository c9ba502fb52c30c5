//! Building a minimal valid patch from a subset of a file's hunks.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::diff::{Hunk, HunkRange};
use crate::error::PatchError;

use super::document::{PatchDocument, PatchHunk};

/// Header line prefixes kept in a synthesized patch.
const HEADER_PREFIXES: &[&str] = &["diff --git ", "index ", "--- ", "+++ "];

fn spacing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@\s*(-\d+(?:,\d+)?)\s*(\+\d+(?:,\d+)?)\s*@@")
            .unwrap_or_else(|e| panic!("invalid header spacing regex: {e}"))
    })
}

/// Build a patch containing exactly `hunks` from `full_diff`.
///
/// Hunks are emitted in source order regardless of the order given. An
/// empty selection yields an empty document, which callers must treat as a
/// synthesis failure.
pub fn synthesize(full_diff: &str, hunks: &[&Hunk]) -> Result<PatchDocument, PatchError> {
    if hunks.is_empty() {
        return Ok(PatchDocument::empty());
    }

    let header_lines = extract_header(full_diff);
    if header_lines.is_empty() {
        return Err(PatchError::HeaderMissing);
    }

    let mut selected: Vec<&Hunk> = hunks.to_vec();
    selected.sort_by_key(|h| h.index());
    selected.dedup_by_key(|h| h.index());

    let mut patch_hunks = Vec::with_capacity(selected.len());
    for hunk in selected {
        let range = hunk
            .range()
            .ok_or(PatchError::UnaddressableHunk(hunk.index()))?;

        let lines: Vec<String> = hunk
            .body_lines()
            .into_iter()
            .flat_map(normalize_line)
            .collect();
        let section = lines
            .first()
            .and_then(|l| HunkRange::parse(l))
            .map(|(_, s)| s)
            .unwrap_or_default();

        patch_hunks.push(PatchHunk {
            index: hunk.index(),
            range,
            section,
            lines,
            partial: hunk.is_partial(),
        });
    }

    Ok(PatchDocument {
        header_lines,
        hunks: patch_hunks,
    })
}

/// File header lines: everything before the first `@@` that looks like a
/// `diff --git`, `index`, `---` or `+++` line.
pub fn extract_header(full_diff: &str) -> Vec<String> {
    full_diff
        .lines()
        .take_while(|l| !l.starts_with("@@"))
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| HEADER_PREFIXES.iter().any(|p| l.starts_with(p)))
        .map(String::from)
        .collect()
}

/// Normalize one stored line: line endings to LF (a stray CR becomes a
/// line break) and `@@` headers re-spaced.
fn normalize_line(line: &str) -> Vec<String> {
    let unified = line.replace("\r\n", "\n").replace('\r', "\n");
    let unified = unified.strip_suffix('\n').unwrap_or(&unified);
    unified
        .split('\n')
        .map(|l| {
            if l.starts_with("@@") {
                spacing_regex().replace(l, "@@ $1 $2 @@").into_owned()
            } else {
                l.to_string()
            }
        })
        .collect()
}

/// Normalize a complete patch text the same way [`synthesize`] does.
pub fn normalize_patch_text(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines().flat_map(normalize_line) {
        out.push_str(&line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}
