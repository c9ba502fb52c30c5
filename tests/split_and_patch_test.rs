//! Splitting real `git` diffs and checking synthesized patches with
//! `git apply --check`.

mod common;

use std::sync::Arc;

use common::{ScriptedGenerator, TestRepo, numbered_lines};
use hunkcommit::diff::{ChunkLevel, Hunk, HunkSplitter, SplitOptions, split};
use hunkcommit::group::GroupingCoordinator;
use hunkcommit::patch::synthesize;
use hunkcommit::status::{FileChangeSet, collect};

fn only_change(repo: &TestRepo) -> FileChangeSet {
    let mut changes = collect(&repo.repo).unwrap();
    assert_eq!(changes.len(), 1, "{changes:?}");
    changes.remove(0)
}

/// Run `git apply --cached --check` on `patch` in `repo`.
fn check_applies(repo: &TestRepo, patch: &str, zero_context: bool) -> bool {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("group.patch");
    std::fs::write(&file, patch).unwrap();

    let mut args = vec!["apply", "--cached", "--check", "--recount"];
    if zero_context {
        args.push("--unidiff-zero");
    }
    let file = file.to_string_lossy().into_owned();
    args.push(&file);

    std::process::Command::new("git")
        .args(&args)
        .current_dir(repo.path())
        .status()
        .unwrap()
        .success()
}

fn source_repo() -> TestRepo {
    let repo = TestRepo::new();
    let mut source = String::from("// top\n");
    source.push_str(&numbered_lines("// filler ", 20));
    source.push_str("// middle\n");
    source.push_str(&numbered_lines("// more ", 20));
    source.push_str("// bottom\n");
    repo.write("src/lib.rs", &source);
    repo.commit_all("init");

    let edited = source
        .replace("// top\n", "// top\nfn alpha() {}\nfn beta() {}\n")
        .replace("// middle\n", "// middle\n/// Docs.\npub fn gamma(x: u32) {}\n")
        .replace("// bottom\n", "// the end\n");
    repo.write("src/lib.rs", &edited);
    repo
}

#[test]
fn test_levels_cover_the_same_lines() {
    let repo = source_repo();
    let change = only_change(&repo);

    let body = |hunks: &[Hunk]| -> Vec<String> {
        hunks
            .iter()
            .flat_map(|h| h.body_lines())
            .filter(|l| !l.starts_with("@@"))
            .map(str::to_string)
            .collect()
    };

    let standard = split(&change.diff, ChunkLevel::LogicalUnit);
    let atomic = split(&change.diff, ChunkLevel::Atomic);
    assert!(atomic.len() >= standard.len());
    assert!(standard.len() > 3);

    let added = |lines: Vec<String>| lines.into_iter().filter(|l| l.starts_with('+')).count();
    assert_eq!(added(body(&standard)), added(body(&atomic)));
    assert_eq!(added(body(&standard)), change.additions);
}

#[test]
fn test_file_level_is_one_chunk() {
    let repo = source_repo();
    let change = only_change(&repo);

    let hunks = split(&change.diff, ChunkLevel::File);
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].text(), change.diff);
}

#[test]
fn test_standard_level_respects_threshold() {
    let repo = source_repo();
    let change = only_change(&repo);

    assert_eq!(split(&change.diff, ChunkLevel::Hunk).len(), 1);

    let splitter = HunkSplitter::new(ChunkLevel::Hunk).with_options(SplitOptions {
        split_threshold: 10,
        ..SplitOptions::default()
    });
    let hunks = splitter.split(&change.diff);
    assert_eq!(hunks.len(), 3);
    let joined: String = hunks.iter().map(Hunk::text).collect();
    assert_eq!(joined, change.diff);
}

#[test]
fn test_every_single_unit_patch_applies() {
    let repo = source_repo();
    let change = only_change(&repo);

    for level in [ChunkLevel::Hunk, ChunkLevel::LogicalUnit, ChunkLevel::Atomic] {
        let splitter = HunkSplitter::new(level).with_options(SplitOptions {
            split_threshold: 0,
            ..SplitOptions::default()
        });
        let hunks = splitter.split(&change.diff);
        for hunk in &hunks {
            let patch = synthesize(&change.diff, &[hunk]).unwrap();
            assert!(
                check_applies(&repo, &patch.render(), patch.needs_zero_context()),
                "level {level}, hunk {}:\n{}",
                hunk.index(),
                patch.render()
            );
        }
    }
}

#[test]
fn test_full_selection_applies_like_original() {
    let repo = source_repo();
    let change = only_change(&repo);

    let hunks = split(&change.diff, ChunkLevel::Atomic);
    let all: Vec<&Hunk> = hunks.iter().rev().collect();
    let patch = synthesize(&change.diff, &all).unwrap();

    assert_eq!(patch.hunk_indices(), (0..hunks.len()).collect::<Vec<_>>());
    assert!(check_applies(&repo, &patch.render(), true));
}

#[tokio::test]
async fn test_grouping_real_diff_is_total() {
    let repo = source_repo();
    let change = only_change(&repo);
    let hunks = split(&change.diff, ChunkLevel::LogicalUnit);

    let coordinator =
        GroupingCoordinator::new(Arc::new(ScriptedGenerator::new("GROUP: [1, 3]\nGROUP: [3, 99]")));
    let outcome = coordinator.group(&change.path, &hunks).await;

    let mut seen: Vec<usize> = outcome
        .groups
        .iter()
        .flat_map(|g| g.indices().to_vec())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..hunks.len()).collect::<Vec<_>>());
    assert_eq!(outcome.groups[0].indices(), &[0, 2]);
    assert!(!outcome.degraded);
}

#[tokio::test]
async fn test_grouping_without_group_lines_degrades() {
    let repo = source_repo();
    let change = only_change(&repo);
    let hunks = split(&change.diff, ChunkLevel::LogicalUnit);

    let coordinator = GroupingCoordinator::new(Arc::new(ScriptedGenerator::new("I cannot help")));
    let outcome = coordinator.group(&change.path, &hunks).await;

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].len(), hunks.len());
    assert!(outcome.degraded);
}
