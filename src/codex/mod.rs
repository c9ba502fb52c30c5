//! Codex CLI integration.

pub mod retry;
pub mod subprocess;

pub use retry::{CodexExecutor, DefaultExecutor, generate_with_retry};
pub use subprocess::{check_codex_installed, run_codex};
