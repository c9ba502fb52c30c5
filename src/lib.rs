//! hunkcommit - A CLI tool that splits uncommitted changes into small, grouped commits.
//!
//! # Overview
//!
//! hunkcommit cuts each changed file's diff into hunks, asks an LLM (Claude
//! Code or Codex CLI) which hunks belong together, builds a minimal patch
//! per group and commits the groups one at a time against the shared index,
//! each with a drafted message.

pub mod claude;
pub mod codex;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod llm;
pub mod message;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod status;
pub mod vcs;

// Re-export commonly used types
pub use diff::{ChunkLevel, Hunk, HunkSplitter, split};
pub use dispatch::{Analyzer, ParallelDispatcher, resolve_workers, run_commit_phase};
pub use error::{ClaudeError, CodexError, ConfigError, DraftError, GitError, PatchError, VcsError};
pub use group::{GroupingCoordinator, GroupingOutcome, HunkGroup};
pub use llm::{LlmRouter, Provider, ProviderSelection, TextGenerator};
pub use patch::{PatchDocument, synthesize};
pub use pipeline::{CommitPipeline, CommitRecord, CommitStatus, FileDraft, RunSummary};
pub use report::{ConsoleReporter, Reporter};
pub use status::{ChangeStatus, FileChangeSet};
pub use vcs::{GitCli, Vcs};
