//! Patch documents: file header plus a subset of hunks.

use crate::diff::{HunkRange, LineKind};

/// One hunk inside a [`PatchDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHunk {
    pub(crate) index: usize,
    pub(crate) range: HunkRange,
    pub(crate) section: String,
    /// Header line followed by the body, already normalized.
    pub(crate) lines: Vec<String>,
    pub(crate) partial: bool,
}

impl PatchHunk {
    /// Source index of the hunk in its file's split.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> HunkRange {
        self.range
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn body(&self) -> impl Iterator<Item = LineKind> + '_ {
        self.lines.iter().skip(1).map(|l| LineKind::of(l))
    }

    /// Pre-image and post-image line counts, recomputed from the body.
    pub fn counts(&self) -> (u32, u32) {
        self.body().fold((0, 0), |(old, new), kind| {
            (old + u32::from(kind.in_old()), new + u32::from(kind.in_new()))
        })
    }

    /// Net number of lines this hunk adds to the file.
    pub fn line_delta(&self) -> i64 {
        let (old, new) = self.counts();
        i64::from(new) - i64::from(old)
    }
}

/// A hunk that is already part of a commit made earlier in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedHunk {
    pub index: usize,
    pub line_delta: i64,
}

/// A minimal patch for one file: header lines plus selected hunks in
/// original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchDocument {
    pub(crate) header_lines: Vec<String>,
    pub(crate) hunks: Vec<PatchHunk>,
}

impl PatchDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }

    pub fn hunks(&self) -> &[PatchHunk] {
        &self.hunks
    }

    pub fn hunk_indices(&self) -> Vec<usize> {
        self.hunks.iter().map(|h| h.index).collect()
    }

    /// Whether any hunk was cut from a larger one and may lack context.
    pub fn needs_zero_context(&self) -> bool {
        self.hunks.iter().any(|h| h.partial)
    }

    /// The hunks of this document as they will look once committed.
    pub fn applied_hunks(&self) -> Vec<AppliedHunk> {
        self.hunks
            .iter()
            .map(|h| AppliedHunk {
                index: h.index,
                line_delta: h.line_delta(),
            })
            .collect()
    }

    /// Render the patch text. Empty documents render as an empty string;
    /// otherwise the text ends with exactly one newline.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        for line in self
            .header_lines
            .iter()
            .chain(self.hunks.iter().flat_map(|h| h.lines.iter()))
        {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Re-target the hunk headers at an index that already contains the
    /// `applied` hunks of the same file.
    ///
    /// Old starts move by the net delta of applied hunks that come earlier
    /// in the file; new starts are recomputed from the hunks of this
    /// document. Headers are rewritten only when their numbers change.
    pub fn rebase(&self, applied: &[AppliedHunk]) -> PatchDocument {
        let mut doc = self.clone();
        let mut carried: i64 = 0;

        for hunk in &mut doc.hunks {
            let shift: i64 = applied
                .iter()
                .filter(|a| a.index < hunk.index)
                .map(|a| a.line_delta)
                .sum();

            let (old_count, new_count) = hunk.counts();
            let old_start = (i64::from(hunk.range.old_start) + shift).max(0);
            let first_old = if old_count == 0 { old_start + 1 } else { old_start };
            let first_new = first_old + carried;
            let new_start = if new_count == 0 { first_new - 1 } else { first_new };

            let rebased = HunkRange {
                old_start: to_line(old_start),
                old_count,
                new_start: to_line(new_start),
                new_count,
            };
            carried += i64::from(new_count) - i64::from(old_count);

            let current = hunk
                .lines
                .first()
                .and_then(|l| HunkRange::parse(l))
                .map(|(r, _)| r);
            if current != Some(rebased) {
                let header = rebased.header(&hunk.section);
                match hunk.lines.first_mut() {
                    Some(first) => *first = header,
                    None => hunk.lines.push(header),
                }
            }
            hunk.range = rebased;
        }

        doc
    }
}

fn to_line(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}
