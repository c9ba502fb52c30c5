//! Codex CLI spawning.

use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::CodexError;
use crate::llm::retry::timeout_from_env;

/// Environment variable to override the default timeout (seconds).
pub const TIMEOUT_ENV_VAR: &str = "HUNKCOMMIT_CODEX_TIMEOUT";

/// Check if Codex CLI is installed and runs.
pub async fn check_codex_installed() -> Result<(), CodexError> {
    if which::which("codex").is_err() {
        return Err(CodexError::NotInstalled);
    }

    let version_check = Command::new("codex")
        .arg("--version")
        .output()
        .await
        .map_err(CodexError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(CodexError::NotInstalled);
    }

    Ok(())
}

/// Run `codex exec <prompt>` and return the free-form text answer.
///
/// Times out after `HUNKCOMMIT_CODEX_TIMEOUT` seconds (default 300).
pub async fn run_codex(prompt: &str) -> Result<String, CodexError> {
    let timeout_duration = timeout_from_env(TIMEOUT_ENV_VAR);
    let timeout_secs = timeout_duration.as_secs();

    let mut cmd = Command::new("codex");
    cmd.arg("exec")
        .arg(prompt)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = timeout(timeout_duration, cmd.output())
        .await
        .map_err(|_| CodexError::Timeout(timeout_secs))?
        .map_err(CodexError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(CodexError::NonZeroExit { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
