//! Per-file change descriptions produced by the status collector.

use std::fmt;

/// Diff placeholder for binary files.
pub const BINARY_SENTINEL: &str = "Binary file";

/// Diff placeholder for deleted files.
pub const DELETED_SENTINEL: &str = "File was deleted";

/// Status of a changed path, mirroring `git status --porcelain` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
}

impl ChangeStatus {
    /// Porcelain code: `M`, `A`, `D`, `R`, `C`, `U` or `??`.
    pub fn code(&self) -> &'static str {
        match self {
            ChangeStatus::Modified => "M",
            ChangeStatus::Added => "A",
            ChangeStatus::Deleted => "D",
            ChangeStatus::Renamed => "R",
            ChangeStatus::Copied => "C",
            ChangeStatus::Unmerged => "U",
            ChangeStatus::Untracked => "??",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "M" => ChangeStatus::Modified,
            "A" => ChangeStatus::Added,
            "D" => ChangeStatus::Deleted,
            "R" => ChangeStatus::Renamed,
            "C" => ChangeStatus::Copied,
            "U" => ChangeStatus::Unmerged,
            "??" => ChangeStatus::Untracked,
            _ => return None,
        })
    }

    /// Statuses whose changes are always committed as a whole file.
    pub fn is_whole_file(&self) -> bool {
        !matches!(self, ChangeStatus::Modified)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeStatus::Modified => "Modified",
            ChangeStatus::Added => "Added",
            ChangeStatus::Deleted => "Deleted",
            ChangeStatus::Renamed => "Renamed",
            ChangeStatus::Copied => "Copied",
            ChangeStatus::Unmerged => "Unmerged",
            ChangeStatus::Untracked => "Untracked",
        };
        f.write_str(name)
    }
}

/// One changed file, read-only once collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeSet {
    pub path: String,
    /// Previous path for renames and copies.
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    /// Full unified diff, or a sentinel for binary and deleted files.
    pub diff: String,
    pub is_binary: bool,
    pub additions: usize,
    pub deletions: usize,
}

impl FileChangeSet {
    /// A change set whose line counts are taken from `diff`.
    pub fn new(path: impl Into<String>, status: ChangeStatus, diff: impl Into<String>) -> Self {
        let diff = diff.into();
        let (additions, deletions) = count_changes(&diff);
        Self {
            path: path.into(),
            old_path: None,
            status,
            diff,
            is_binary: false,
            additions,
            deletions,
        }
    }

    pub fn with_old_path(mut self, old_path: impl Into<String>) -> Self {
        self.old_path = Some(old_path.into());
        self
    }

    pub fn binary(mut self) -> Self {
        self.is_binary = true;
        self.diff = BINARY_SENTINEL.to_string();
        self.additions = 0;
        self.deletions = 0;
        self
    }

    /// Paths the index must be touched at for this file.
    pub fn index_paths(&self) -> Vec<String> {
        let mut paths = vec![self.path.clone()];
        if let Some(old) = &self.old_path
            && old != &self.path
        {
            paths.push(old.clone());
        }
        paths
    }

    /// Whether the file must go through the whole-file commit path.
    pub fn requires_whole_file(&self) -> bool {
        self.is_binary || self.status.is_whole_file()
    }
}

/// Count added and removed lines, ignoring `+++`/`---` file headers.
pub fn count_changes(diff: &str) -> (usize, usize) {
    let mut in_hunk = false;
    let mut additions = 0;
    let mut deletions = 0;
    for line in diff.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
        } else if !in_hunk {
            continue;
        } else if line.starts_with('+') {
            additions += 1;
        } else if line.starts_with('-') {
            deletions += 1;
        }
    }
    (additions, deletions)
}
