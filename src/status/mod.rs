//! Working tree status collection and untracked-file triage.

pub mod change;
pub mod collect;
pub mod triage;

pub use change::{BINARY_SENTINEL, ChangeStatus, DELETED_SENTINEL, FileChangeSet, count_changes};
pub use collect::{collect, is_binary_content, open_repository, repo_root};
pub use triage::{TerminalPrompt, TriageChoice, TriagePrompt, append_to_gitignore, triage_untracked};
