//! [`Vcs`] implementation that shells out to the system `git` binary.
//!
//! Running the real binary inherits the user's git config, hooks, SSH agent
//! and credential store.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::VcsError;

use super::{ApplyOptions, ApplyOutcome, CommitOutcome, Vcs};

/// Output phrases git uses when a commit would be empty.
const NOTHING_TO_COMMIT: &[&str] = &["nothing to commit", "no changes added to commit"];

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// `git` subprocess runner rooted at a repository's working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn exec(&self, args: &[&str], operation: &str) -> Result<GitOutput, VcsError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| VcsError::SpawnFailed {
                operation: operation.to_string(),
                source,
            })?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run a git command, returning stdout or a descriptive error.
    fn run_git(&self, args: &[&str], operation: &str) -> Result<String, VcsError> {
        let output = self.exec(args, operation)?;
        if !output.success {
            return Err(VcsError::CommandFailed {
                operation: operation.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn path_args<'a>(command: &[&'a str], paths: &'a [String]) -> Vec<&'a str> {
        let mut args = command.to_vec();
        args.push("--");
        args.extend(paths.iter().map(String::as_str));
        args
    }

    fn head_hash(&self) -> Option<String> {
        match self.run_git(&["rev-parse", "--short", "HEAD"], "read commit hash") {
            Ok(hash) => Some(hash.trim().to_string()),
            Err(e) => {
                warn!("Commit created but its hash could not be read: {e}");
                None
            }
        }
    }
}

impl Vcs for GitCli {
    fn stage_paths(&mut self, paths: &[String]) -> Result<(), VcsError> {
        if paths.is_empty() {
            return Ok(());
        }
        self.run_git(&Self::path_args(&["add", "-A"], paths), "stage files")?;
        Ok(())
    }

    fn reset_paths(&mut self, paths: &[String]) -> Result<(), VcsError> {
        if paths.is_empty() {
            return Ok(());
        }
        self.run_git(&Self::path_args(&["reset", "-q"], paths), "reset index")?;
        Ok(())
    }

    fn apply_to_index(
        &mut self,
        patch: &str,
        options: ApplyOptions,
    ) -> Result<ApplyOutcome, VcsError> {
        let mut file = tempfile::Builder::new()
            .prefix("hunkcommit-")
            .suffix(".patch")
            .tempfile()
            .map_err(VcsError::PatchFileFailed)?;
        file.write_all(patch.as_bytes())
            .and_then(|()| file.flush())
            .map_err(VcsError::PatchFileFailed)?;
        let patch_path = file.path().to_string_lossy().to_string();

        let mut args = vec!["apply", "--cached", "--ignore-whitespace", "--recount"];
        if options.zero_context {
            args.push("--unidiff-zero");
        }

        let mut apply = args.clone();
        apply.push(&patch_path);
        let output = self.exec(&apply, "apply patch")?;

        if output.success {
            let warnings = output
                .stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(ApplyOutcome::Applied { warnings });
        }

        // A patch whose reverse applies cleanly is already in the index.
        let mut reverse = args;
        reverse.extend(["--reverse", "--check", patch_path.as_str()]);
        if self.exec(&reverse, "check applied patch")?.success {
            debug!("Patch already present in index");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        Err(VcsError::PatchRejected(output.stderr.trim().to_string()))
    }

    fn commit(&mut self, message: &str) -> Result<CommitOutcome, VcsError> {
        let output = self.exec(&["commit", "-q", "-m", message], "commit")?;
        if output.success {
            return Ok(CommitOutcome::Committed {
                hash: self.head_hash(),
            });
        }

        let combined = format!("{}\n{}", output.stdout, output.stderr);
        if NOTHING_TO_COMMIT.iter().any(|p| combined.contains(p)) {
            return Ok(CommitOutcome::NothingToCommit);
        }

        Err(VcsError::CommandFailed {
            operation: "commit".to_string(),
            stderr: combined.trim().to_string(),
        })
    }

    fn push(&mut self, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run_git(&["push", remote, branch], "push")?;
        Ok(())
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        let branch = self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"], "read branch")?;
        Ok(branch.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?} failed");
    }

    fn init_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["config", "user.name", "Test User"]);
        git(dir.path(), &["config", "user.email", "test@example.com"]);
        git(dir.path(), &["config", "commit.gpgsign", "false"]);
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        git(dir.path(), &["add", "-A"]);
        git(dir.path(), &["commit", "-q", "-m", "init"]);
        dir
    }

    fn staged(dir: &Path) -> String {
        let output = Command::new("git")
            .args(["diff", "--cached", "--name-only"])
            .current_dir(dir)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    const PATCH: &str = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,3 +1,3 @@
 one
-two
+TWO
 three
";

    #[test]
    fn test_commit_with_clean_index_is_nothing_to_commit() {
        let dir = init_repo(&[("a.txt", "a\n")]);
        let mut cli = GitCli::new(dir.path());
        assert_eq!(cli.commit("[Chore] empty").unwrap(), CommitOutcome::NothingToCommit);
    }

    #[test]
    fn test_stage_and_commit_returns_hash() {
        let dir = init_repo(&[("a.txt", "a\n")]);
        std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();

        let mut cli = GitCli::new(dir.path());
        cli.stage_paths(&["b.txt".to_string()]).unwrap();
        match cli.commit("[Feature] add b").unwrap() {
            CommitOutcome::Committed { hash } => assert!(hash.is_some_and(|h| h.len() >= 7)),
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_paths_is_scoped() {
        let dir = init_repo(&[("a.txt", "a\n"), ("b.txt", "b\n")]);
        std::fs::write(dir.path().join("a.txt"), "A\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "B\n").unwrap();
        git(dir.path(), &["add", "-A"]);

        let mut cli = GitCli::new(dir.path());
        cli.reset_paths(&["a.txt".to_string()]).unwrap();
        assert_eq!(staged(dir.path()), "b.txt");
    }

    #[test]
    fn test_apply_to_index_leaves_worktree() {
        let dir = init_repo(&[("a.txt", "one\ntwo\nthree\n")]);
        let mut cli = GitCli::new(dir.path());

        let outcome = cli.apply_to_index(PATCH, ApplyOptions::default()).unwrap();
        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));
        assert_eq!(staged(dir.path()), "a.txt");
        let worktree = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(worktree, "one\ntwo\nthree\n");
    }

    #[test]
    fn test_apply_twice_reports_already_applied() {
        let dir = init_repo(&[("a.txt", "one\ntwo\nthree\n")]);
        let mut cli = GitCli::new(dir.path());

        cli.apply_to_index(PATCH, ApplyOptions::default()).unwrap();
        let outcome = cli.apply_to_index(PATCH, ApplyOptions::default()).unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);
    }

    #[test]
    fn test_conflicting_patch_is_rejected() {
        let dir = init_repo(&[("a.txt", "completely\ndifferent\ncontent\n")]);
        let mut cli = GitCli::new(dir.path());

        let result = cli.apply_to_index(PATCH, ApplyOptions::default());
        assert!(matches!(result, Err(VcsError::PatchRejected(_))));
    }

    #[test]
    fn test_current_branch() {
        let dir = init_repo(&[("a.txt", "a\n")]);
        git(dir.path(), &["checkout", "-q", "-b", "feature/split"]);
        let cli = GitCli::new(dir.path());
        assert_eq!(cli.current_branch().unwrap(), "feature/split");
    }
}
