//! Terminal rendering of the commit plan and its progress.

use crate::pipeline::{CommitRecord, CommitStatus, FileDraft, RunSummary};

use super::Reporter;

/// Longest subject shown in the plan tree.
const MAX_SUBJECT_WIDTH: usize = 72;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn subject(message: &str) -> String {
    let first = message.lines().next().unwrap_or("").trim();
    if first.chars().count() <= MAX_SUBJECT_WIDTH {
        return first.to_string();
    }
    let cut: String = first.chars().take(MAX_SUBJECT_WIDTH - 3).collect();
    format!("{cut}...")
}

/// One plan line per record: `├─ [1] message (labels)`.
pub fn render_plan(drafts: &[FileDraft]) -> String {
    let mut out = String::new();
    for draft in drafts {
        let groups = draft.records.len();
        let noun = if groups == 1 { "commit" } else { "commits" };
        out.push_str(&format!(
            "{} ({}) - {groups} {noun}\n",
            draft.path,
            draft.change_status.code()
        ));

        for (i, record) in draft.records.iter().enumerate() {
            let branch = if i + 1 == groups { "└─" } else { "├─" };
            let scope = if record.is_whole_file {
                "whole file".to_string()
            } else if record.labels.is_empty() {
                "hunks".to_string()
            } else {
                record.labels.join(", ")
            };
            let line = match record.status() {
                CommitStatus::Pending => subject(&record.message),
                other => other.to_string(),
            };
            out.push_str(&format!("  {branch} [{}] {line} ({scope})\n", record.ordinal));
        }
    }
    out
}

/// Final status line for one record.
pub fn render_record(record: &CommitRecord) -> String {
    match record.status() {
        CommitStatus::Committed(hash) => format!(
            "\x1b[32m✓\x1b[0m {hash} {} [{}] {}",
            record.path,
            record.ordinal,
            subject(&record.message)
        ),
        CommitStatus::Skipped(reason) => {
            format!("- {} [{}] skipped: {reason}", record.path, record.ordinal)
        }
        CommitStatus::Failed(reason) => format!(
            "\x1b[31m✗\x1b[0m {} [{}] failed: {reason}",
            record.path, record.ordinal
        ),
        CommitStatus::Pending => format!("  {} [{}] pending", record.path, record.ordinal),
    }
}

pub fn render_summary(summary: &RunSummary) -> String {
    format!(
        "{} commits created, {} skipped, {} failed ({} of {} files fully committed)",
        summary.committed, summary.skipped, summary.failed, summary.files_processed, summary.files
    )
}

impl Reporter for ConsoleReporter {
    fn plan(&self, drafts: &[FileDraft]) {
        println!("Commit plan:");
        print!("{}", render_plan(drafts));
        if self.verbose {
            for draft in drafts {
                if draft.degraded {
                    eprintln!("  {}: grouped as a single commit", draft.path);
                }
                for diagnostic in &draft.diagnostics {
                    eprintln!("  {}: {diagnostic}", draft.path);
                }
            }
        }
        println!();
    }

    fn file_started(&self, draft: &FileDraft) {
        if self.verbose {
            println!("{}", draft.path);
        }
    }

    fn record_updated(&self, record: &CommitRecord) {
        println!("{}", render_record(record));
    }

    fn summary(&self, summary: &RunSummary) {
        println!();
        println!("{}", render_summary(summary));
    }

    fn warn(&self, message: &str) {
        eprintln!("\x1b[33m⚠ {message}\x1b[0m");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ChangeStatus, FileChangeSet};

    #[test]
    fn test_render_plan_tree() {
        let change = FileChangeSet::new("src/lib.rs", ChangeStatus::Modified, "");
        let records = vec![
            CommitRecord::partial(
                0,
                &change,
                1,
                "[Feature] add parser\n\n- details".into(),
                Default::default(),
                vec!["fn parse".into()],
            ),
            CommitRecord::partial(0, &change, 2, "[Docs] fix typo".into(), Default::default(), vec![]),
        ];
        let plan = render_plan(&[FileDraft::new(0, &change, records)]);

        assert_eq!(
            plan,
            "src/lib.rs (M) - 2 commits\n  ├─ [1] [Feature] add parser (fn parse)\n  └─ [2] [Docs] fix typo (hunks)\n"
        );
    }

    #[test]
    fn test_render_settled_record_in_plan() {
        let change = FileChangeSet::new("conflict.rs", ChangeStatus::Unmerged, "");
        let records = vec![CommitRecord::settled(
            0,
            &change,
            CommitStatus::Skipped("unmerged path".into()),
        )];
        let plan = render_plan(&[FileDraft::new(0, &change, records)]);
        assert!(plan.contains("└─ [1] skipped: unmerged path (whole file)"));
    }

    #[test]
    fn test_subject_is_truncated() {
        let long = "x".repeat(100);
        assert_eq!(subject(&long).chars().count(), MAX_SUBJECT_WIDTH);
    }

    #[test]
    fn test_render_summary() {
        let summary = RunSummary {
            files: 3,
            files_processed: 2,
            committed: 4,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(
            render_summary(&summary),
            "4 commits created, 1 skipped, 0 failed (2 of 3 files fully committed)"
        );
    }
}
