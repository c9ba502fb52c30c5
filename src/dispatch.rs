//! Parallel per-file analysis followed by a single serialized commit phase.
//!
//! Analysis (split, group, synthesize, draft) runs on a bounded pool of
//! tokio tasks and never sees the repository. The finished drafts are then
//! handed to one [`CommitPipeline`] on a blocking thread.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::diff::{ChunkLevel, Hunk, HunkSplitter};
use crate::group::GroupingCoordinator;
use crate::llm::TextGenerator;
use crate::message::{DraftRequest, MessageDrafter};
use crate::patch::{PatchDocument, synthesize};
use crate::pipeline::{CommitPipeline, CommitRecord, CommitStatus, FileDraft};
use crate::status::{ChangeStatus, FileChangeSet};
use crate::vcs::Vcs;

pub const UNMERGED_REASON: &str = "unmerged path";
pub const TASK_FAILED_REASON: &str = "analysis task failed";

/// Worker count: `configured`, or twice the CPU count when 0, capped at the
/// number of files and never below 1.
pub fn resolve_workers(configured: usize, files: usize) -> usize {
    let wanted = if configured == 0 {
        std::thread::available_parallelism().map_or(1, |n| n.get()) * 2
    } else {
        configured
    };
    wanted.min(files).max(1)
}

/// Turns one file's changes into a draft of planned commits.
#[derive(Clone)]
pub struct Analyzer {
    splitter: HunkSplitter,
    grouper: GroupingCoordinator,
    drafter: MessageDrafter,
}

impl Analyzer {
    /// One generator serves both classification and drafting.
    pub fn new(splitter: HunkSplitter, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            splitter,
            grouper: GroupingCoordinator::new(generator.clone()),
            drafter: MessageDrafter::new(generator),
        }
    }

    fn level(&self) -> ChunkLevel {
        self.splitter.level()
    }

    pub async fn analyze(&self, file_index: usize, change: &FileChangeSet) -> FileDraft {
        if change.status == ChangeStatus::Unmerged {
            let record = CommitRecord::settled(
                file_index,
                change,
                CommitStatus::Skipped(UNMERGED_REASON.to_string()),
            );
            return FileDraft::new(file_index, change, vec![record]);
        }

        if change.requires_whole_file() {
            return self.whole_file(file_index, change).await;
        }

        let hunks = self.splitter.split(&change.diff);
        if hunks.len() <= 1 {
            debug!("{}: single chunk, committing whole file", change.path);
            return self.whole_file(file_index, change).await;
        }

        let outcome = self.grouper.group(&change.path, &hunks).await;
        if outcome.groups.len() <= 1 {
            let mut draft = self.whole_file(file_index, change).await;
            draft.degraded = outcome.degraded;
            draft.diagnostics = outcome.diagnostics;
            return draft;
        }

        let mut patches = Vec::with_capacity(outcome.groups.len());
        for group in &outcome.groups {
            let selected: Vec<&Hunk> = group.indices().iter().map(|&i| &hunks[i]).collect();
            match synthesize(&change.diff, &selected) {
                Ok(patch) if !patch.is_empty() => patches.push((group.ordinal(), selected, patch)),
                Ok(_) => {
                    warn!("{}: group {} produced an empty patch", change.path, group.ordinal());
                    return self.whole_file(file_index, change).await;
                }
                Err(e) => {
                    warn!("{}: {e}, committing whole file", change.path);
                    return self.whole_file(file_index, change).await;
                }
            }
        }

        let mut records = Vec::with_capacity(patches.len());
        for (ordinal, selected, patch) in patches {
            records.push(self.partial(file_index, change, ordinal, &selected, patch).await);
        }

        let mut draft = FileDraft::new(file_index, change, records);
        draft.diagnostics = outcome.diagnostics;
        draft
    }

    async fn whole_file(&self, file_index: usize, change: &FileChangeSet) -> FileDraft {
        let request = DraftRequest {
            path: &change.path,
            status: change.status,
            diff: &change.diff,
            context: None,
            level: self.level(),
            is_binary: change.is_binary,
        };
        let message = self.drafter.draft(&request).await;
        let record = CommitRecord::whole_file(file_index, change, message);
        FileDraft::new(file_index, change, vec![record])
    }

    async fn partial(
        &self,
        file_index: usize,
        change: &FileChangeSet,
        ordinal: usize,
        hunks: &[&Hunk],
        patch: PatchDocument,
    ) -> CommitRecord {
        let labels: Vec<String> = hunks
            .iter()
            .filter_map(|h| h.label())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let context = (!labels.is_empty()).then(|| labels.join(", "));

        let diff = patch.render();
        let request = DraftRequest {
            path: &change.path,
            status: change.status,
            diff: &diff,
            context: context.as_deref(),
            level: self.level(),
            is_binary: false,
        };
        let message = self.drafter.draft(&request).await;
        CommitRecord::partial(file_index, change, ordinal, message, patch, labels)
    }
}

/// Runs analysis for many files on a bounded worker pool.
pub struct ParallelDispatcher {
    analyzer: Arc<Analyzer>,
    workers: usize,
}

impl ParallelDispatcher {
    /// `workers` of 0 picks a size from the CPU count.
    pub fn new(analyzer: Analyzer, workers: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            workers,
        }
    }

    /// Analyse `files`, returning one draft per file in input order. A task
    /// that panics yields a draft whose record failed.
    pub async fn run_analysis(&self, files: &[FileChangeSet]) -> Vec<FileDraft> {
        if files.is_empty() {
            return Vec::new();
        }

        let workers = resolve_workers(self.workers, files.len());
        debug!("Analysing {} files with {workers} workers", files.len());
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut set = JoinSet::new();
        for (index, change) in files.iter().cloned().enumerate() {
            let analyzer = self.analyzer.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, analyzer.analyze(index, &change).await)
            });
        }

        let mut slots: Vec<Option<FileDraft>> = vec![None; files.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, draft)) => slots[index] = Some(draft),
                Err(e) => warn!("Analysis task failed: {e}"),
            }
        }

        slots
            .into_iter()
            .zip(files)
            .enumerate()
            .map(|(index, (slot, change))| {
                slot.unwrap_or_else(|| {
                    let record = CommitRecord::settled(
                        index,
                        change,
                        CommitStatus::Failed(TASK_FAILED_REASON.to_string()),
                    );
                    FileDraft::new(index, change, vec![record])
                })
            })
            .collect()
    }
}

/// Run the commit phase on a blocking thread. The pipeline is handed back
/// so the caller can keep using its repository handle.
pub async fn run_commit_phase<V>(
    mut pipeline: CommitPipeline<V>,
    mut drafts: Vec<FileDraft>,
) -> Result<(CommitPipeline<V>, Vec<FileDraft>), JoinError>
where
    V: Vcs + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        pipeline.run(&mut drafts);
        (pipeline, drafts)
    })
    .await
}
