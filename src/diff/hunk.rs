//! Hunk value types and `@@` range header parsing.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Line ranges from a `@@ -a,b +c,d @@` header.
///
/// A count of zero follows the unified diff convention: the start names the
/// line *after which* the change happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@\s*-(\d+)(?:,(\d+))?\s*\+(\d+)(?:,(\d+))?\s*@@(.*)$")
            .unwrap_or_else(|e| panic!("invalid hunk header regex: {e}"))
    })
}

impl HunkRange {
    /// Parse a hunk header line, returning the range and the trailing
    /// section text (e.g. ` fn main() {`).
    ///
    /// Omitted counts default to 1. Tolerates missing spaces around the
    /// ranges. Returns `None` when the line is not a recognisable header.
    pub fn parse(line: &str) -> Option<(HunkRange, String)> {
        let caps = header_regex().captures(line.trim_end_matches('\r'))?;
        let num = |i: usize, default: u32| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(default),
            }
        };

        let range = HunkRange {
            old_start: num(1, 0)?,
            old_count: num(2, 1)?,
            new_start: num(3, 0)?,
            new_count: num(4, 1)?,
        };
        let section = caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default();
        Some((range, section))
    }

    /// First pre-image line touched by this range.
    pub fn first_old_line(&self) -> u32 {
        if self.old_count == 0 {
            self.old_start + 1
        } else {
            self.old_start
        }
    }

    /// First post-image line touched by this range.
    pub fn first_new_line(&self) -> u32 {
        if self.new_count == 0 {
            self.new_start + 1
        } else {
            self.new_start
        }
    }

    /// Render as a header line with the given section suffix.
    pub fn header(&self, section: &str) -> String {
        format!("{self}{section}")
    }
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Kind of a diff body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
    /// `\ No newline at end of file`
    NoNewline,
}

impl LineKind {
    /// Classify a body line. Empty lines are context (some tools strip the
    /// leading space of blank context lines).
    pub fn of(line: &str) -> LineKind {
        match line.as_bytes().first() {
            Some(b'+') => LineKind::Added,
            Some(b'-') => LineKind::Removed,
            Some(b'\\') => LineKind::NoNewline,
            _ => LineKind::Context,
        }
    }

    pub fn in_old(self) -> bool {
        matches!(self, LineKind::Context | LineKind::Removed)
    }

    pub fn in_new(self) -> bool {
        matches!(self, LineKind::Context | LineKind::Added)
    }
}

/// One independently addressable piece of a file diff.
///
/// A hunk is either a *range hunk* (it carries a parsed `@@` range and its
/// body starts with a header line) or a *whole-diff chunk* (level 0, an
/// empty diff, or a diff without markers) which has no range.
///
/// The first chunk of a diff also owns the diff preamble so that
/// concatenating [`Hunk::text`] over all chunks reproduces the input.
/// Pieces cut out of a larger hunk get a synthetic header that is used when
/// building patches but is not part of the round-trip text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    index: usize,
    preamble: Vec<String>,
    header: Option<String>,
    synthetic_header: Option<String>,
    content: Vec<String>,
    range: Option<HunkRange>,
    label: Option<String>,
    partial: bool,
}

impl Hunk {
    /// A chunk holding the whole diff verbatim.
    pub(crate) fn whole(lines: Vec<String>) -> Self {
        Self {
            index: 0,
            preamble: Vec::new(),
            header: None,
            synthetic_header: None,
            content: lines,
            range: None,
            label: None,
            partial: false,
        }
    }

    /// A marker-delimited hunk as it appears in the diff.
    pub(crate) fn from_marker(
        preamble: Vec<String>,
        header: String,
        content: Vec<String>,
    ) -> Self {
        let range = HunkRange::parse(&header).map(|(r, _)| r);
        Self {
            index: 0,
            preamble,
            header: Some(header),
            synthetic_header: None,
            content,
            range,
            label: None,
            partial: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> Option<HunkRange> {
        self.range
    }

    /// Pre-image line where this hunk starts, if it has a range.
    pub fn start_line(&self) -> Option<u32> {
        self.range.map(|r| r.old_start)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// True for pieces cut out of a larger hunk. Such pieces may lack
    /// surrounding context and must be applied with `--unidiff-zero`.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Body lines excluding any header.
    pub fn content(&self) -> &[String] {
        &self.content
    }

    /// Lines that go into a patch: the `@@` header (real or synthetic)
    /// followed by the body. Whole-diff chunks return their content.
    pub fn body_lines(&self) -> Vec<&str> {
        let header = self.header.as_deref().or(self.synthetic_header.as_deref());
        header
            .into_iter()
            .chain(self.content.iter().map(String::as_str))
            .collect()
    }

    /// The exact input text this chunk covers, newline terminated.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in self
            .preamble
            .iter()
            .chain(self.header.iter())
            .chain(self.content.iter())
        {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Number of input lines covered by [`Hunk::text`].
    pub fn line_count(&self) -> usize {
        self.preamble.len() + usize::from(self.header.is_some()) + self.content.len()
    }

    /// Size in bytes of the round-trip text.
    pub fn byte_len(&self) -> usize {
        self.preamble
            .iter()
            .chain(self.header.iter())
            .chain(self.content.iter())
            .map(|l| l.len() + 1)
            .sum()
    }

    /// Body text including the synthetic header, used for prompts.
    pub fn display_text(&self) -> String {
        let mut out = self.body_lines().join("\n");
        out.push('\n');
        out
    }

    pub(crate) fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Split a range hunk at the given content offsets.
    ///
    /// `cuts` are strictly increasing positions in `content()`, each greater
    /// than zero. Every piece gets a range computed from the parent's; the
    /// first keeps the preamble and the original header line, the rest get
    /// synthetic headers. Returns `None` for hunks without a range.
    pub(crate) fn split_at(&self, cuts: &[usize], labels: &[Option<String>]) -> Option<Vec<Hunk>> {
        let range = self.range?;
        if cuts.is_empty() {
            return Some(vec![self.clone()]);
        }

        let section = self
            .header
            .as_deref()
            .or(self.synthetic_header.as_deref())
            .and_then(HunkRange::parse)
            .map(|(_, s)| s)
            .unwrap_or_default();

        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push(0);
        bounds.extend(cuts.iter().copied().filter(|&c| c > 0 && c < self.content.len()));
        bounds.push(self.content.len());
        bounds.dedup();
        if bounds.len() < 3 {
            return Some(vec![self.clone()]);
        }

        let mut pieces = Vec::with_capacity(bounds.len() - 1);
        let mut consumed_old = 0u32;
        let mut consumed_new = 0u32;

        for (i, window) in bounds.windows(2).enumerate() {
            let lines = &self.content[window[0]..window[1]];
            let old_count = lines.iter().filter(|l| LineKind::of(l).in_old()).count() as u32;
            let new_count = lines.iter().filter(|l| LineKind::of(l).in_new()).count() as u32;

            let piece_range = HunkRange {
                old_start: segment_start(range.first_old_line(), consumed_old, old_count),
                old_count,
                new_start: segment_start(range.first_new_line(), consumed_new, new_count),
                new_count,
            };
            consumed_old += old_count;
            consumed_new += new_count;

            let first = i == 0;
            let label = labels.get(i).cloned().flatten().or_else(|| self.label.clone());
            pieces.push(Hunk {
                index: self.index,
                preamble: if first { self.preamble.clone() } else { Vec::new() },
                header: if first { self.header.clone() } else { None },
                synthetic_header: if first && self.header.is_some() {
                    None
                } else {
                    Some(piece_range.header(&section))
                },
                content: lines.to_vec(),
                range: Some(piece_range),
                label,
                partial: true,
            });
        }

        Some(pieces)
    }
}

/// Start line for a piece beginning `consumed` lines into its parent.
fn segment_start(first_line: u32, consumed: u32, count: u32) -> u32 {
    let start = first_line + consumed;
    if count == 0 { start.saturating_sub(1) } else { start }
}
