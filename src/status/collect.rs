//! Working tree change collection using git2.

use std::path::{Path, PathBuf};

use git2::{
    DiffFormat, DiffOptions, ErrorCode, Repository, Status, StatusEntry, StatusOptions, Tree,
};
use tracing::{debug, warn};

use crate::error::GitError;

use super::change::{ChangeStatus, DELETED_SENTINEL, FileChangeSet};

/// Bytes inspected when sniffing for binary content.
const BINARY_SNIFF_LEN: usize = 8_000;

/// Share of non-text bytes above which content counts as binary.
const BINARY_NON_TEXT_RATIO: f64 = 0.30;

/// Open the repository containing `path`, searching parent directories.
pub fn open_repository(path: &Path) -> Result<Repository, GitError> {
    let repo = Repository::discover(path).map_err(GitError::OpenRepository)?;
    if repo.workdir().is_none() {
        return Err(GitError::BareRepository);
    }
    Ok(repo)
}

/// The repository's working directory.
pub fn repo_root(repo: &Repository) -> Result<PathBuf, GitError> {
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or(GitError::BareRepository)
}

/// Resolve the HEAD tree. `Ok(None)` for repositories without commits.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::HeadFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::HeadFailed)?;
    Ok(Some(tree))
}

/// Collect every changed path in the working tree, sorted by path.
///
/// Each entry's diff runs from HEAD to the working tree (staged and
/// unstaged changes combined), including the content of untracked files.
pub fn collect(repo: &Repository) -> Result<Vec<FileChangeSet>, GitError> {
    let root = repo_root(repo)?;
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts)).map_err(GitError::StatusFailed)?;

    let mut changes = Vec::new();
    for entry in statuses.iter() {
        let Some((path, old_path, status)) = classify(&entry) else {
            continue;
        };

        let change = match status {
            ChangeStatus::Deleted => FileChangeSet::new(path, status, DELETED_SENTINEL),
            ChangeStatus::Unmerged => FileChangeSet::new(path, status, String::new()),
            _ if is_binary_file(&root.join(&path)) => {
                FileChangeSet::new(path, status, String::new()).binary()
            }
            _ => {
                let diff = file_diff(repo, head_tree.as_ref(), &path)?;
                FileChangeSet::new(path, status, diff)
            }
        };

        let change = match old_path {
            Some(old) => change.with_old_path(old),
            None => change,
        };
        debug!(
            "{} {} (+{} -{})",
            change.status.code(),
            change.path,
            change.additions,
            change.deletions
        );
        changes.push(change);
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes.dedup_by(|a, b| a.path == b.path);
    Ok(changes)
}

/// Map a status entry to `(path, old path, status)`. Ignored and clean
/// entries yield `None`.
fn classify(entry: &StatusEntry<'_>) -> Option<(String, Option<String>, ChangeStatus)> {
    let flags = entry.status();
    if flags.is_ignored() || flags == Status::CURRENT {
        return None;
    }

    let rename = entry.head_to_index().or_else(|| entry.index_to_workdir());
    let new_path = rename
        .as_ref()
        .and_then(|d| d.new_file().path())
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| entry.path().map(str::to_string))?;

    let status = if flags.is_conflicted() {
        ChangeStatus::Unmerged
    } else if flags.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        ChangeStatus::Renamed
    } else if flags.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        ChangeStatus::Deleted
    } else if flags.is_index_new() {
        ChangeStatus::Added
    } else if flags.is_wt_new() {
        ChangeStatus::Untracked
    } else {
        ChangeStatus::Modified
    };

    let old_path = match status {
        ChangeStatus::Renamed => rename
            .and_then(|d| d.old_file().path().map(|p| p.to_string_lossy().to_string()))
            .filter(|old| old != &new_path),
        _ => None,
    };

    Some((new_path, old_path, status))
}

/// Unified diff for one path, HEAD against the working tree.
fn file_diff(repo: &Repository, head_tree: Option<&Tree<'_>>, path: &str) -> Result<String, GitError> {
    let mut opts = DiffOptions::new();
    opts.pathspec(path)
        .disable_pathspec_match(true)
        .include_untracked(true)
        .show_untracked_content(true)
        .recurse_untracked_dirs(true);

    let diff = repo
        .diff_tree_to_workdir_with_index(head_tree, Some(&mut opts))
        .map_err(|source| GitError::DiffFailed {
            path: path.to_string(),
            source,
        })?;

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if matches!(origin, '+' | '-' | ' ') {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(|source| GitError::DiffFailed {
        path: path.to_string(),
        source,
    })?;

    Ok(text)
}

/// Sniff a working tree file for binary content.
fn is_binary_file(path: &Path) -> bool {
    match std::fs::read(path) {
        Ok(bytes) => is_binary_content(&bytes),
        Err(e) => {
            warn!("Could not read {} for binary detection: {e}", path.display());
            false
        }
    }
}

/// Content is binary when its first 8000 bytes contain a NUL byte or more
/// than 30% non-text bytes.
pub fn is_binary_content(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }

    let non_text = sample.iter().filter(|&&b| !is_text_byte(b)).count();
    non_text as f64 / sample.len() as f64 > BINARY_NON_TEXT_RATIO
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 7..=10 | 12 | 13 | 27) || (b >= 0x20 && b != 0x7f)
}
