//! The version-control command surface used by the commit phase.
//!
//! Every method takes `&mut self`: the index is one shared mutable resource
//! and only the holder of the `Vcs` value may touch it.

pub mod git_cli;

pub use git_cli::GitCli;

use crate::error::VcsError;

/// How a patch is applied to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Accept hunks without surrounding context (`--unidiff-zero`).
    pub zero_context: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Applied, possibly with offset or whitespace warnings from git.
    Applied { warnings: Vec<String> },
    /// The index already contains the patch's changes.
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Created a commit. `hash` is `None` if it could not be read back.
    Committed { hash: Option<String> },
    NothingToCommit,
}

pub trait Vcs {
    /// Stage the full working-tree state of `paths`.
    fn stage_paths(&mut self, paths: &[String]) -> Result<(), VcsError>;

    /// Reset the index entries of `paths` to HEAD. Never touches other paths.
    fn reset_paths(&mut self, paths: &[String]) -> Result<(), VcsError>;

    /// Apply a patch to the index only, leaving the working tree alone.
    fn apply_to_index(
        &mut self,
        patch: &str,
        options: ApplyOptions,
    ) -> Result<ApplyOutcome, VcsError>;

    fn commit(&mut self, message: &str) -> Result<CommitOutcome, VcsError>;

    fn push(&mut self, remote: &str, branch: &str) -> Result<(), VcsError>;

    fn current_branch(&self) -> Result<String, VcsError>;
}
