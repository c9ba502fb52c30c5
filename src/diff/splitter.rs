//! Splitting a unified diff into addressable hunks at four granularities.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::boundary::{BoundaryDetector, DeclarationDetector};
use super::hunk::{Hunk, LineKind};

/// Diffs at or below this size are not split at the standard level.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 8_000;

/// Hunks larger than this are force-split at the standard level.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 32_000;

/// How finely a file's diff is cut before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ChunkLevel {
    /// The whole file diff is one chunk.
    File,
    /// One chunk per `@@` hunk.
    Hunk,
    /// Hunks are further cut at declaration boundaries.
    #[default]
    LogicalUnit,
    /// Logical units are further cut at documentation and signature changes.
    Atomic,
}

impl ChunkLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            ChunkLevel::File => 0,
            ChunkLevel::Hunk => 1,
            ChunkLevel::LogicalUnit => 2,
            ChunkLevel::Atomic => 3,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChunkLevel::File => "file",
            ChunkLevel::Hunk => "standard",
            ChunkLevel::LogicalUnit => "logical units",
            ChunkLevel::Atomic => "atomic",
        }
    }
}

impl TryFrom<u8> for ChunkLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChunkLevel::File),
            1 => Ok(ChunkLevel::Hunk),
            2 => Ok(ChunkLevel::LogicalUnit),
            3 => Ok(ChunkLevel::Atomic),
            other => Err(format!("chunk level must be 0-3, got {other}")),
        }
    }
}

impl fmt::Display for ChunkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u8(), self.description())
    }
}

/// Size limits for the standard level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    pub split_threshold: usize,
    pub max_chunk_bytes: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }
}

/// Turns a file diff into an ordered list of hunks.
///
/// Splitting never drops a line: concatenating [`Hunk::text`] over the
/// result reproduces a newline-terminated input exactly.
#[derive(Clone)]
pub struct HunkSplitter {
    level: ChunkLevel,
    options: SplitOptions,
    detector: Arc<dyn BoundaryDetector>,
}

impl HunkSplitter {
    pub fn new(level: ChunkLevel) -> Self {
        Self {
            level,
            options: SplitOptions::default(),
            detector: Arc::new(DeclarationDetector::new()),
        }
    }

    pub fn with_options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn BoundaryDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn level(&self) -> ChunkLevel {
        self.level
    }

    /// Split `diff` at the configured level.
    pub fn split(&self, diff: &str) -> Vec<Hunk> {
        let lines = diff_lines(diff);
        if lines.is_empty() {
            return vec![Hunk::whole(Vec::new())];
        }

        let chunks = match self.level {
            ChunkLevel::File => vec![Hunk::whole(lines)],
            ChunkLevel::Hunk => {
                if diff.len() <= self.options.split_threshold {
                    vec![Hunk::whole(lines)]
                } else {
                    match marker_hunks(&lines) {
                        Some(hunks) => self.limit_size(hunks),
                        None => vec![Hunk::whole(lines)],
                    }
                }
            }
            ChunkLevel::LogicalUnit => match marker_hunks(&lines) {
                Some(hunks) => self.split_units(hunks),
                None => vec![Hunk::whole(lines)],
            },
            ChunkLevel::Atomic => match marker_hunks(&lines) {
                Some(hunks) => self.split_atomic(self.split_units(hunks)),
                None => vec![Hunk::whole(lines)],
            },
        };

        debug!(level = %self.level, chunks = chunks.len(), "split diff");

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, h)| h.with_index(i))
            .collect()
    }

    /// Force-split hunks that exceed the chunk size limit.
    fn limit_size(&self, hunks: Vec<Hunk>) -> Vec<Hunk> {
        let max = self.options.max_chunk_bytes.max(1);
        let mut out = Vec::with_capacity(hunks.len());

        for hunk in hunks {
            if hunk.byte_len() <= max {
                out.push(hunk);
                continue;
            }

            let mut cuts = Vec::new();
            let mut size = 0usize;
            for (i, line) in hunk.content().iter().enumerate() {
                let len = line.len() + 1;
                if size > 0 && size + len > max && LineKind::of(line) != LineKind::NoNewline {
                    cuts.push(i);
                    size = 0;
                }
                size += len;
            }

            match hunk.split_at(&cuts, &[]) {
                Some(pieces) => out.extend(pieces),
                None => out.push(hunk),
            }
        }

        out
    }

    /// Cut hunks that start more than one named unit.
    fn split_units(&self, hunks: Vec<Hunk>) -> Vec<Hunk> {
        let mut out = Vec::with_capacity(hunks.len());

        for hunk in hunks {
            let boundaries: Vec<(usize, String)> = hunk
                .content()
                .iter()
                .enumerate()
                .filter(|(_, line)| LineKind::of(line) == LineKind::Added)
                .filter_map(|(i, line)| self.detector.unit_start(&line[1..]).map(|name| (i, name)))
                .collect();

            if boundaries.len() <= 1 || hunk.range().is_none() {
                let label = boundaries
                    .into_iter()
                    .next()
                    .map(|(_, name)| name)
                    .unwrap_or_else(|| "hunk".to_string());
                out.push(hunk.with_label(label));
                continue;
            }

            // Lines before the first boundary stay with the first unit.
            let cuts: Vec<usize> = boundaries[1..].iter().map(|(i, _)| *i).collect();
            let labels: Vec<Option<String>> =
                boundaries.into_iter().map(|(_, name)| Some(name)).collect();

            match hunk.split_at(&cuts, &labels) {
                Some(pieces) => out.extend(pieces),
                None => out.push(hunk),
            }
        }

        out
    }

    /// Cut logical units where a documentation or signature change begins.
    fn split_atomic(&self, units: Vec<Hunk>) -> Vec<Hunk> {
        let mut out = Vec::with_capacity(units.len());

        for unit in units {
            if unit.range().is_none() || unit.content().is_empty() {
                out.push(unit);
                continue;
            }

            let base = unit.label().unwrap_or("hunk").to_string();
            let kinds: Vec<_> = unit
                .content()
                .iter()
                .map(|line| match LineKind::of(line) {
                    LineKind::Added => self.detector.change_kind(&line[1..]),
                    _ => None,
                })
                .collect();

            // A piece is only closed once it holds a change of its own.
            let content = unit.content();
            let mut cuts = Vec::new();
            let mut labels = vec![Some(base.clone())];
            let mut has_change = is_change(&content[0]);
            for i in 1..kinds.len() {
                if let Some(kind) = kinds[i]
                    && kinds[i - 1] != Some(kind)
                    && has_change
                {
                    cuts.push(i);
                    labels.push(Some(format!("{base} ({kind})")));
                    has_change = false;
                }
                has_change |= is_change(&content[i]);
            }

            match unit.split_at(&cuts, &labels) {
                Some(pieces) => out.extend(pieces),
                None => out.push(unit),
            }
        }

        out
    }
}

/// Split `diff` at `level` with default limits and detector.
pub fn split(diff: &str, level: ChunkLevel) -> Vec<Hunk> {
    HunkSplitter::new(level).split(diff)
}

fn is_change(line: &str) -> bool {
    matches!(LineKind::of(line), LineKind::Added | LineKind::Removed)
}

/// Lines of `diff` without the empty piece after a final newline.
fn diff_lines(diff: &str) -> Vec<String> {
    if diff.is_empty() {
        return Vec::new();
    }
    let body = diff.strip_suffix('\n').unwrap_or(diff);
    body.split('\n').map(String::from).collect()
}

/// Cut at every line starting with `@@`. `None` when there are no markers.
fn marker_hunks(lines: &[String]) -> Option<Vec<Hunk>> {
    let first = lines.iter().position(|l| l.starts_with("@@"))?;
    let mut preamble = lines[..first].to_vec();

    let mut hunks = Vec::new();
    let mut header = lines[first].clone();
    let mut content = Vec::new();

    for line in &lines[first + 1..] {
        if line.starts_with("@@") {
            let done = std::mem::replace(&mut header, line.clone());
            hunks.push(Hunk::from_marker(
                std::mem::take(&mut preamble),
                done,
                std::mem::take(&mut content),
            ));
        } else {
            content.push(line.clone());
        }
    }
    hunks.push(Hunk::from_marker(preamble, header, content));

    Some(hunks)
}
