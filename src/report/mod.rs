//! Progress and result rendering.

pub mod console;

pub use console::ConsoleReporter;

use crate::pipeline::{CommitRecord, FileDraft, RunSummary};

/// Receives the plan and record updates as the run progresses.
pub trait Reporter: Send + Sync {
    /// The analysed plan, before anything is committed.
    fn plan(&self, drafts: &[FileDraft]);

    fn file_started(&self, draft: &FileDraft);

    /// A record reached its final status.
    fn record_updated(&self, record: &CommitRecord);

    fn summary(&self, summary: &RunSummary);

    fn warn(&self, message: &str);
}

/// Reporter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn plan(&self, _drafts: &[FileDraft]) {}
    fn file_started(&self, _draft: &FileDraft) {}
    fn record_updated(&self, _record: &CommitRecord) {}
    fn summary(&self, _summary: &RunSummary) {}
    fn warn(&self, _message: &str) {}
}
