//! Claude CLI spawning.

use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::ClaudeError;
use crate::llm::retry::timeout_from_env;

/// Environment variable to override the default timeout (seconds).
pub const TIMEOUT_ENV_VAR: &str = "HUNKCOMMIT_CLAUDE_TIMEOUT";

/// Check if Claude Code CLI is installed and runs.
pub async fn check_claude_installed() -> Result<(), ClaudeError> {
    if which::which("claude").is_err() {
        return Err(ClaudeError::NotInstalled);
    }

    let version_check = Command::new("claude")
        .arg("--version")
        .output()
        .await
        .map_err(ClaudeError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(ClaudeError::NotInstalled);
    }

    Ok(())
}

/// Run `claude -p <prompt> --output-format json` and return stdout.
///
/// Times out after `HUNKCOMMIT_CLAUDE_TIMEOUT` seconds (default 300).
pub async fn run_claude(prompt: &str) -> Result<String, ClaudeError> {
    let timeout_duration = timeout_from_env(TIMEOUT_ENV_VAR);
    let timeout_secs = timeout_duration.as_secs();

    let output = timeout(
        timeout_duration,
        Command::new("claude")
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| ClaudeError::Timeout(timeout_secs))?
    .map_err(ClaudeError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(ClaudeError::NonZeroExit { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
