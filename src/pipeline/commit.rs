//! The serialized commit phase: stage, apply, commit and reset, one group
//! at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::message::is_valid_message;
use crate::patch::{AppliedHunk, PatchDocument};
use crate::report::Reporter;
use crate::vcs::{ApplyOptions, ApplyOutcome, CommitOutcome, Vcs};

use super::record::{CommitRecord, CommitStatus, FileDraft};

pub const SKIP_INVALID_MESSAGE: &str = "invalid message";
pub const SKIP_NOTHING_TO_COMMIT: &str = "nothing to commit";
pub const SKIP_ABORTED: &str = "aborted after earlier failure";
pub const SKIP_ALREADY_COMMITTED: &str = "file already committed";

/// Index state of the file being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    NotStaged,
    IndexReset,
    Staged,
}

/// Progress through one file's records.
struct FileRun {
    state: FileState,
    applied: Vec<AppliedHunk>,
    aborted: bool,
    whole_file_done: bool,
}

impl FileRun {
    fn new() -> Self {
        Self {
            state: FileState::NotStaged,
            applied: Vec::new(),
            aborted: false,
            whole_file_done: false,
        }
    }
}

/// Owns the repository handle for the whole commit phase. Files are
/// processed in the given order and groups in ordinal order.
pub struct CommitPipeline<V: Vcs> {
    vcs: V,
    reporter: Arc<dyn Reporter>,
    dump_dir: Option<PathBuf>,
    reset_paths: Vec<String>,
}

impl<V: Vcs> CommitPipeline<V> {
    pub fn new(vcs: V, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            vcs,
            reporter,
            dump_dir: None,
            reset_paths: Vec::new(),
        }
    }

    /// Also unstage `paths` before the first commit. Used for changed paths
    /// that were left out of the run but may already be staged.
    pub fn with_reset_paths(mut self, paths: Vec<String>) -> Self {
        self.reset_paths = paths;
        self
    }

    /// Write every patch to `dir` before it is applied.
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    pub fn vcs_mut(&mut self) -> &mut V {
        &mut self.vcs
    }

    pub fn into_vcs(self) -> V {
        self.vcs
    }

    /// Commit every pending record of `drafts`.
    pub fn run(&mut self, drafts: &mut [FileDraft]) {
        self.reset_run_paths(drafts);
        for draft in drafts.iter_mut() {
            self.reporter.file_started(draft);
            self.process_file(draft);
        }
    }

    /// Unstage whatever the user had staged for the run's paths so it cannot
    /// end up in an unrelated commit.
    fn reset_run_paths(&mut self, drafts: &[FileDraft]) {
        let mut paths: Vec<String> = drafts
            .iter()
            .flat_map(FileDraft::pending_paths)
            .chain(self.reset_paths.iter().cloned())
            .collect();
        paths.sort();
        paths.dedup();
        if paths.is_empty() {
            return;
        }
        if let Err(e) = self.vcs.reset_paths(&paths) {
            warn!("Initial index reset failed: {e}");
            self.reporter
                .warn(&format!("Could not reset the index before committing: {e}"));
        }
    }

    fn process_file(&mut self, draft: &mut FileDraft) {
        let mut run = FileRun::new();

        for record in draft.records.iter_mut() {
            if !record.status().is_pending() {
                self.reporter.record_updated(record);
                continue;
            }

            let status = self.process_record(record, &mut run);
            debug!("{} [{}]: {status}", record.path, record.ordinal);
            record.set_status(status);
            self.reporter.record_updated(record);
        }

        if run.aborted {
            let paths = draft
                .records
                .first()
                .map(|r| r.index_paths.clone())
                .unwrap_or_default();
            self.best_effort_reset(&paths);
        }
    }

    fn process_record(&mut self, record: &CommitRecord, run: &mut FileRun) -> CommitStatus {
        if run.aborted {
            return CommitStatus::Skipped(SKIP_ABORTED.to_string());
        }
        if !is_valid_message(&record.message) {
            return CommitStatus::Skipped(SKIP_INVALID_MESSAGE.to_string());
        }

        let result = match &record.patch {
            Some(patch) if !record.is_whole_file => self.commit_partial(record, patch, run),
            _ => self.commit_whole_file(record, run),
        };

        if result.is_failed() {
            run.aborted = true;
        }
        result
    }

    fn commit_whole_file(&mut self, record: &CommitRecord, run: &mut FileRun) -> CommitStatus {
        if run.whole_file_done {
            return CommitStatus::Skipped(SKIP_ALREADY_COMMITTED.to_string());
        }

        if let Err(e) = self.vcs.stage_paths(&record.index_paths) {
            return CommitStatus::Failed(format!("staging failed: {e}"));
        }
        run.state = FileState::Staged;

        let status = self.commit(record);
        if status.is_committed() {
            run.whole_file_done = true;
        } else {
            self.best_effort_reset(&record.index_paths);
        }
        run.state = FileState::NotStaged;
        status
    }

    fn commit_partial(
        &mut self,
        record: &CommitRecord,
        patch: &PatchDocument,
        run: &mut FileRun,
    ) -> CommitStatus {
        if run.state == FileState::NotStaged {
            if let Err(e) = self.vcs.reset_paths(&record.index_paths) {
                return CommitStatus::Failed(format!("index reset failed: {e}"));
            }
            run.state = FileState::IndexReset;
        }

        let rebased = patch.rebase(&run.applied);
        if rebased.is_empty() {
            return CommitStatus::Failed("empty patch".to_string());
        }

        let text = rebased.render();
        if let Some(dir) = &self.dump_dir {
            dump_patch(dir, &record.path, record.ordinal, &text);
        }

        let options = ApplyOptions {
            zero_context: rebased.needs_zero_context(),
        };
        match self.vcs.apply_to_index(&text, options) {
            Ok(ApplyOutcome::Applied { warnings }) => {
                for warning in warnings {
                    debug!("git apply {}: {warning}", record.path);
                }
            }
            Ok(ApplyOutcome::AlreadyApplied) => {
                debug!("{} [{}] already in index", record.path, record.ordinal);
            }
            Err(e) => {
                warn!("Patch for {} group {} rejected: {e}", record.path, record.ordinal);
                return CommitStatus::Failed(e.to_string());
            }
        }
        run.state = FileState::Staged;

        let status = self.commit(record);
        if status.is_committed() {
            run.applied.extend(patch.applied_hunks());
        }

        match self.vcs.reset_paths(&record.index_paths) {
            Ok(()) => run.state = FileState::IndexReset,
            Err(e) if status.is_committed() => {
                warn!("Index reset after commit failed for {}: {e}", record.path);
                run.aborted = true;
            }
            Err(e) => warn!("Index reset failed for {}: {e}", record.path),
        }

        status
    }

    fn commit(&mut self, record: &CommitRecord) -> CommitStatus {
        match self.vcs.commit(&record.message) {
            Ok(CommitOutcome::Committed { hash }) => {
                let hash = hash.unwrap_or_else(|| "unknown".to_string());
                info!("Committed {} [{}] as {hash}", record.path, record.ordinal);
                CommitStatus::Committed(hash)
            }
            Ok(CommitOutcome::NothingToCommit) => {
                CommitStatus::Skipped(SKIP_NOTHING_TO_COMMIT.to_string())
            }
            Err(e) => CommitStatus::Failed(e.to_string()),
        }
    }

    fn best_effort_reset(&mut self, paths: &[String]) {
        if let Err(e) = self.vcs.reset_paths(paths) {
            warn!("Cleanup reset failed for {paths:?}: {e}");
        }
    }
}

/// File name for a dumped patch: `patch_<path>_group<N>.diff`, with path
/// separators flattened.
pub fn dump_file_name(path: &str, ordinal: usize) -> String {
    let flat: String = path
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("patch_{flat}_group{ordinal}.diff")
}

fn dump_patch(dir: &Path, path: &str, ordinal: usize, text: &str) {
    let target = dir.join(dump_file_name(path, ordinal));
    let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&target, text));
    if let Err(e) = result {
        warn!("Could not write {}: {e}", target.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChunkLevel, split};
    use crate::error::VcsError;
    use crate::patch::synthesize;
    use crate::report::NullReporter;
    use crate::status::{ChangeStatus, FileChangeSet};

    /// Records calls; fails the operations it is told to.
    #[derive(Default)]
    struct FakeVcs {
        calls: Vec<String>,
        patches: Vec<String>,
        reject_apply: bool,
        nothing_to_commit: bool,
        fail_commit_for: Option<String>,
        fail_reset_after_commit: bool,
        next_hash: usize,
    }

    impl Vcs for FakeVcs {
        fn stage_paths(&mut self, paths: &[String]) -> Result<(), VcsError> {
            self.calls.push(format!("add {}", paths.join(" ")));
            Ok(())
        }

        fn reset_paths(&mut self, paths: &[String]) -> Result<(), VcsError> {
            let after_commit = self.calls.last().is_some_and(|c| c.starts_with("commit "));
            self.calls.push(format!("reset {}", paths.join(" ")));
            if self.fail_reset_after_commit && after_commit {
                return Err(VcsError::CommandFailed {
                    operation: "reset index".to_string(),
                    stderr: "index.lock exists".to_string(),
                });
            }
            Ok(())
        }

        fn apply_to_index(
            &mut self,
            patch: &str,
            _options: ApplyOptions,
        ) -> Result<ApplyOutcome, VcsError> {
            self.calls.push("apply".to_string());
            self.patches.push(patch.to_string());
            if self.reject_apply {
                return Err(VcsError::PatchRejected("patch does not apply".to_string()));
            }
            Ok(ApplyOutcome::Applied { warnings: vec![] })
        }

        fn commit(&mut self, message: &str) -> Result<CommitOutcome, VcsError> {
            self.calls.push(format!("commit {message}"));
            if self.fail_commit_for.as_deref() == Some(message) {
                return Err(VcsError::CommandFailed {
                    operation: "commit".to_string(),
                    stderr: "hook rejected".to_string(),
                });
            }
            if self.nothing_to_commit {
                return Ok(CommitOutcome::NothingToCommit);
            }
            self.next_hash += 1;
            Ok(CommitOutcome::Committed {
                hash: Some(format!("h{}", self.next_hash)),
            })
        }

        fn push(&mut self, _remote: &str, _branch: &str) -> Result<(), VcsError> {
            Ok(())
        }

        fn current_branch(&self) -> Result<String, VcsError> {
            Ok("main".to_string())
        }
    }

    const TWO_HUNKS: &str = "\
diff --git a/f.txt b/f.txt
--- a/f.txt
+++ b/f.txt
@@ -1,3 +1,4 @@
 a
+inserted
 b
 c
@@ -10,3 +11,3 @@
 j
-k
+K
 l
";

    fn pipeline(vcs: FakeVcs) -> CommitPipeline<FakeVcs> {
        CommitPipeline::new(vcs, Arc::new(NullReporter))
    }

    fn whole_file_draft(index: usize, path: &str, message: &str) -> FileDraft {
        let change = FileChangeSet::new(path, ChangeStatus::Untracked, "");
        let record = CommitRecord::whole_file(index, &change, message.to_string());
        FileDraft::new(index, &change, vec![record])
    }

    fn partial_draft(messages: [&str; 2]) -> FileDraft {
        let change = FileChangeSet::new("f.txt", ChangeStatus::Modified, TWO_HUNKS);
        let hunks = split(TWO_HUNKS, ChunkLevel::LogicalUnit);
        let records = hunks
            .iter()
            .zip(messages)
            .enumerate()
            .map(|(i, (hunk, message))| {
                let patch = synthesize(TWO_HUNKS, &[hunk]).unwrap();
                CommitRecord::partial(0, &change, i + 1, message.to_string(), patch, vec![])
            })
            .collect();
        FileDraft::new(0, &change, records)
    }

    fn statuses(draft: &FileDraft) -> Vec<CommitStatus> {
        draft.records.iter().map(|r| r.status().clone()).collect()
    }

    #[test]
    fn test_whole_file_commit() {
        let mut drafts = vec![whole_file_draft(0, "new.txt", "[Feature] add new")];
        let mut p = pipeline(FakeVcs::default());
        p.run(&mut drafts);

        assert_eq!(statuses(&drafts[0]), vec![CommitStatus::Committed("h1".into())]);
        assert_eq!(
            p.into_vcs().calls,
            vec!["reset new.txt", "add new.txt", "commit [Feature] add new"]
        );
    }

    #[test]
    fn test_invalid_message_is_skipped_without_staging() {
        let mut drafts = vec![whole_file_draft(
            0,
            "new.txt",
            "[Chore] Commit changes (AI Error)",
        )];
        let mut p = pipeline(FakeVcs::default());
        p.run(&mut drafts);

        assert_eq!(
            statuses(&drafts[0]),
            vec![CommitStatus::Skipped(SKIP_INVALID_MESSAGE.into())]
        );
        assert_eq!(p.into_vcs().calls, vec!["reset new.txt"]);
    }

    #[test]
    fn test_partial_groups_are_rebased() {
        let mut drafts = vec![partial_draft(["[Feature] insert line", "[Fix] uppercase k"])];
        let mut p = pipeline(FakeVcs::default());
        p.run(&mut drafts);

        assert_eq!(
            statuses(&drafts[0]),
            vec![
                CommitStatus::Committed("h1".into()),
                CommitStatus::Committed("h2".into())
            ]
        );
        let vcs = p.into_vcs();
        assert!(vcs.patches[0].contains("@@ -1,3 +1,4 @@"));
        // The first group added a line, so the second now starts at line 11.
        assert!(vcs.patches[1].contains("@@ -11,3 +11,3 @@"));
        assert_eq!(
            vcs.calls,
            vec![
                "reset f.txt",
                "reset f.txt",
                "apply",
                "commit [Feature] insert line",
                "reset f.txt",
                "apply",
                "commit [Fix] uppercase k",
                "reset f.txt",
            ]
        );
    }

    #[test]
    fn test_apply_failure_aborts_rest_of_file_only() {
        let mut drafts = vec![
            partial_draft(["[Feature] insert line", "[Fix] uppercase k"]),
            whole_file_draft(1, "other.txt", "[Feature] add other"),
        ];
        let mut p = pipeline(FakeVcs {
            reject_apply: true,
            ..Default::default()
        });
        p.run(&mut drafts);

        let first = statuses(&drafts[0]);
        assert!(first[0].is_failed());
        assert_eq!(first[1], CommitStatus::Skipped(SKIP_ABORTED.into()));
        assert_eq!(statuses(&drafts[1]), vec![CommitStatus::Committed("h1".into())]);

        let calls = p.into_vcs().calls;
        let cleanup = calls.iter().position(|c| c == "add other.txt").unwrap();
        assert_eq!(calls[cleanup - 1], "reset f.txt");
    }

    #[test]
    fn test_reset_failure_after_commit_aborts_rest_of_file() {
        let mut drafts = vec![
            partial_draft(["[Feature] insert line", "[Fix] uppercase k"]),
            whole_file_draft(1, "other.txt", "[Feature] add other"),
        ];
        let mut p = pipeline(FakeVcs {
            fail_reset_after_commit: true,
            ..Default::default()
        });
        p.run(&mut drafts);

        assert_eq!(
            statuses(&drafts[0]),
            vec![
                CommitStatus::Committed("h1".into()),
                CommitStatus::Skipped(SKIP_ABORTED.into())
            ]
        );
        assert_eq!(statuses(&drafts[1]), vec![CommitStatus::Committed("h2".into())]);
        assert_eq!(p.into_vcs().patches.len(), 1);
    }

    #[test]
    fn test_extra_reset_paths_join_initial_reset() {
        let mut drafts = vec![whole_file_draft(0, "new.txt", "[Feature] add new")];
        let mut p = pipeline(FakeVcs::default())
            .with_reset_paths(vec!["staged.txt".to_string(), "new.txt".to_string()]);
        p.run(&mut drafts);

        assert_eq!(p.into_vcs().calls[0], "reset new.txt staged.txt");
    }

    #[test]
    fn test_nothing_to_commit_is_skipped() {
        let mut drafts = vec![whole_file_draft(0, "new.txt", "[Feature] add new")];
        let mut p = pipeline(FakeVcs {
            nothing_to_commit: true,
            ..Default::default()
        });
        p.run(&mut drafts);

        assert_eq!(
            statuses(&drafts[0]),
            vec![CommitStatus::Skipped(SKIP_NOTHING_TO_COMMIT.into())]
        );
    }

    #[test]
    fn test_commit_failure_contained_to_file() {
        let mut drafts = vec![
            whole_file_draft(0, "a.txt", "[Feature] a"),
            whole_file_draft(1, "b.txt", "[Feature] b"),
        ];
        let mut p = pipeline(FakeVcs {
            fail_commit_for: Some("[Feature] a".to_string()),
            ..Default::default()
        });
        p.run(&mut drafts);

        assert!(statuses(&drafts[0])[0].is_failed());
        assert_eq!(statuses(&drafts[1]), vec![CommitStatus::Committed("h1".into())]);
    }

    #[test]
    fn test_settled_records_are_left_alone() {
        let change = FileChangeSet::new("conflict.rs", ChangeStatus::Unmerged, "");
        let record =
            CommitRecord::settled(0, &change, CommitStatus::Skipped("unmerged path".into()));
        let mut drafts = vec![FileDraft::new(0, &change, vec![record])];

        let mut p = pipeline(FakeVcs::default());
        p.run(&mut drafts);

        assert!(p.into_vcs().calls.is_empty());
        assert_eq!(
            statuses(&drafts[0]),
            vec![CommitStatus::Skipped("unmerged path".into())]
        );
    }

    #[test]
    fn test_dump_patches() {
        let dir = tempfile::tempdir().unwrap();
        let mut drafts = vec![partial_draft(["[Feature] insert line", "[Fix] uppercase k"])];
        let mut p = pipeline(FakeVcs::default()).with_dump_dir(Some(dir.path().to_path_buf()));
        p.run(&mut drafts);

        let dumped = std::fs::read_to_string(dir.path().join("patch_f.txt_group2.diff")).unwrap();
        assert!(dumped.starts_with("diff --git a/f.txt b/f.txt\n"));
        assert_eq!(dump_file_name("src/a/b.rs", 3), "patch_src_a_b.rs_group3.diff");
    }
}
