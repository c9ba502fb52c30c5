//! Commit records and per-file drafts passed from analysis to the commit
//! phase.

use std::fmt;

use crate::patch::PatchDocument;
use crate::status::{ChangeStatus, FileChangeSet};

/// Outcome of one planned commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Pending,
    /// Short hash of the created commit.
    Committed(String),
    Skipped(String),
    Failed(String),
}

impl CommitStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, CommitStatus::Pending)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, CommitStatus::Committed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CommitStatus::Failed(_))
    }
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStatus::Pending => write!(f, "pending"),
            CommitStatus::Committed(hash) => write!(f, "committed {hash}"),
            CommitStatus::Skipped(reason) => write!(f, "skipped: {reason}"),
            CommitStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One planned commit: a group of hunks, or a whole file.
///
/// Created pending by the analysis phase; only the commit pipeline moves it
/// to a final status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub file_index: usize,
    /// 1-based position of the group within its file.
    pub ordinal: usize,
    pub path: String,
    /// Index paths touched by this commit (the path plus a rename source).
    pub index_paths: Vec<String>,
    pub message: String,
    /// `None` for whole-file commits.
    pub patch: Option<PatchDocument>,
    pub is_whole_file: bool,
    pub labels: Vec<String>,
    status: CommitStatus,
}

impl CommitRecord {
    /// A commit of the entire file.
    pub fn whole_file(file_index: usize, change: &FileChangeSet, message: String) -> Self {
        Self {
            file_index,
            ordinal: 1,
            path: change.path.clone(),
            index_paths: change.index_paths(),
            message,
            patch: None,
            is_whole_file: true,
            labels: Vec::new(),
            status: CommitStatus::Pending,
        }
    }

    /// A commit of one group's synthesized patch.
    pub fn partial(
        file_index: usize,
        change: &FileChangeSet,
        ordinal: usize,
        message: String,
        patch: PatchDocument,
        labels: Vec<String>,
    ) -> Self {
        Self {
            file_index,
            ordinal,
            path: change.path.clone(),
            index_paths: change.index_paths(),
            message,
            patch: Some(patch),
            is_whole_file: false,
            labels,
            status: CommitStatus::Pending,
        }
    }

    /// A whole-file record settled before the commit phase.
    pub fn settled(file_index: usize, change: &FileChangeSet, status: CommitStatus) -> Self {
        let mut record = Self::whole_file(file_index, change, String::new());
        record.status = status;
        record
    }

    pub fn status(&self) -> &CommitStatus {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: CommitStatus) {
        self.status = status;
    }
}

/// Analysis result for one file: its planned commits in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDraft {
    pub file_index: usize,
    pub path: String,
    pub change_status: ChangeStatus,
    pub records: Vec<CommitRecord>,
    /// The grouping fell back to a single group.
    pub degraded: bool,
    pub diagnostics: Vec<String>,
}

impl FileDraft {
    pub fn new(file_index: usize, change: &FileChangeSet, records: Vec<CommitRecord>) -> Self {
        Self {
            file_index,
            path: change.path.clone(),
            change_status: change.status,
            records,
            degraded: false,
            diagnostics: Vec::new(),
        }
    }

    /// Index paths of every record still waiting to be committed.
    pub fn pending_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.status().is_pending())
            .flat_map(|r| r.index_paths.iter().cloned())
            .collect();
        paths.dedup();
        paths
    }

    pub fn committed_count(&self) -> usize {
        self.records.iter().filter(|r| r.status().is_committed()).count()
    }

    pub fn has_failure(&self) -> bool {
        self.records.iter().any(|r| r.status().is_failed())
    }

    /// At least one commit and no failed group.
    pub fn is_fully_processed(&self) -> bool {
        self.committed_count() > 0 && !self.has_failure()
    }
}

/// Totals over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub files_processed: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_drafts(drafts: &[FileDraft]) -> Self {
        let mut summary = RunSummary {
            files: drafts.len(),
            ..Default::default()
        };
        for draft in drafts {
            if draft.is_fully_processed() {
                summary.files_processed += 1;
            }
            for record in &draft.records {
                match record.status() {
                    CommitStatus::Committed(_) => summary.committed += 1,
                    CommitStatus::Skipped(_) | CommitStatus::Pending => summary.skipped += 1,
                    CommitStatus::Failed(_) => summary.failed += 1,
                }
            }
        }
        summary
    }

    /// Success when nothing needed doing or at least one file went through
    /// completely.
    pub fn is_success(&self) -> bool {
        self.files == 0 || self.files_processed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str) -> FileChangeSet {
        FileChangeSet::new(path, ChangeStatus::Modified, "")
    }

    fn draft(index: usize, statuses: Vec<CommitStatus>) -> FileDraft {
        let c = change(&format!("f{index}"));
        let records = statuses
            .into_iter()
            .map(|s| CommitRecord::settled(index, &c, s))
            .collect();
        FileDraft::new(index, &c, records)
    }

    #[test]
    fn test_summary_counts_and_success() {
        let drafts = vec![
            draft(0, vec![CommitStatus::Committed("abc1234".into())]),
            draft(
                1,
                vec![
                    CommitStatus::Committed("def5678".into()),
                    CommitStatus::Failed("conflict".into()),
                ],
            ),
            draft(2, vec![CommitStatus::Skipped("invalid message".into())]),
        ];

        let summary = RunSummary::from_drafts(&drafts);
        assert_eq!(summary.committed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.files_processed, 1);
        assert!(summary.is_success());
    }

    #[test]
    fn test_summary_without_full_file_is_failure() {
        let drafts = vec![draft(0, vec![CommitStatus::Skipped("nothing to commit".into())])];
        assert!(!RunSummary::from_drafts(&drafts).is_success());
    }

    #[test]
    fn test_empty_run_is_success() {
        assert!(RunSummary::from_drafts(&[]).is_success());
    }

    #[test]
    fn test_pending_paths_skip_settled_records() {
        let mut d = draft(0, vec![CommitStatus::Skipped("unmerged path".into())]);
        assert!(d.pending_paths().is_empty());

        d.records.push(CommitRecord::whole_file(0, &change("f0"), "msg".into()));
        assert_eq!(d.pending_paths(), vec!["f0"]);
    }
}
