//! Interactive decisions about untracked files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use dialoguer::Select;
use tracing::debug;

use crate::error::GitError;

use super::change::{ChangeStatus, FileChangeSet};

/// What to do with one untracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageChoice {
    Add,
    /// Append the path to `.gitignore` and leave it out of the run.
    Ignore,
    Skip,
    /// Add this file and every later untracked file without asking.
    AddAll,
}

impl TriageChoice {
    const ALL: [TriageChoice; 4] = [
        TriageChoice::Add,
        TriageChoice::Ignore,
        TriageChoice::Skip,
        TriageChoice::AddAll,
    ];

    fn label(&self) -> &'static str {
        match self {
            TriageChoice::Add => "Add",
            TriageChoice::Ignore => "Ignore (add to .gitignore)",
            TriageChoice::Skip => "Skip",
            TriageChoice::AddAll => "Add all remaining",
        }
    }
}

/// Source of triage decisions.
pub trait TriagePrompt {
    fn choose(&mut self, path: &str) -> Result<TriageChoice, String>;
}

/// Terminal prompt backed by `dialoguer`.
pub struct TerminalPrompt;

impl TriagePrompt for TerminalPrompt {
    fn choose(&mut self, path: &str) -> Result<TriageChoice, String> {
        let labels: Vec<&str> = TriageChoice::ALL.iter().map(TriageChoice::label).collect();
        let selection = Select::new()
            .with_prompt(format!("Untracked file {path}"))
            .items(&labels)
            .default(0)
            .interact()
            .map_err(|e| e.to_string())?;
        Ok(TriageChoice::ALL[selection])
    }
}

/// Filter untracked files through `prompt`. Tracked changes pass unchanged.
///
/// With `auto_track` every untracked file is added without asking. A prompt
/// failure skips the file with a warning.
pub fn triage_untracked(
    changes: Vec<FileChangeSet>,
    root: &Path,
    auto_track: bool,
    prompt: &mut dyn TriagePrompt,
) -> Result<Vec<FileChangeSet>, GitError> {
    let mut add_all = auto_track;
    let mut kept = Vec::with_capacity(changes.len());

    for change in changes {
        if change.status != ChangeStatus::Untracked || add_all {
            kept.push(change);
            continue;
        }

        let choice = match prompt.choose(&change.path) {
            Ok(choice) => choice,
            Err(e) => {
                eprintln!(
                    "\x1b[33m⚠ Could not prompt for {} ({e}), skipping\x1b[0m",
                    change.path
                );
                continue;
            }
        };
        debug!("Triage {}: {choice:?}", change.path);

        match choice {
            TriageChoice::Add => kept.push(change),
            TriageChoice::AddAll => {
                add_all = true;
                kept.push(change);
            }
            TriageChoice::Ignore => {
                if append_to_gitignore(root, &change.path)? {
                    println!("  Added {} to .gitignore", change.path);
                }
            }
            TriageChoice::Skip => {}
        }
    }

    Ok(kept)
}

/// Append `path` to the repository's `.gitignore`. Returns `false` when the
/// path was already listed.
pub fn append_to_gitignore(root: &Path, path: &str) -> Result<bool, GitError> {
    let gitignore = root.join(".gitignore");
    let existing = match std::fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(GitError::IgnoreWriteFailed(e)),
    };

    if existing.lines().any(|line| line.trim() == path) {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)
        .map_err(GitError::IgnoreWriteFailed)?;

    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{path}").map_err(GitError::IgnoreWriteFailed)?;
    Ok(true)
}
