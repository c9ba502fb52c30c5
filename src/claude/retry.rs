//! Retrying Claude calls and unwrapping the CLI's JSON envelope.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ClaudeError;
use crate::llm::retry::{RetryPolicy, retry_with_backoff};

use super::subprocess::run_claude;

/// Trait for executing Claude CLI commands.
///
/// This abstraction allows mocking the Claude subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClaudeExecutor: Send + Sync {
    /// Run Claude with the given prompt and return raw stdout.
    async fn run(&self, prompt: &str) -> Result<String, ClaudeError>;
}

/// Default executor that calls the real Claude CLI.
pub struct DefaultExecutor;

#[async_trait]
impl ClaudeExecutor for DefaultExecutor {
    async fn run(&self, prompt: &str) -> Result<String, ClaudeError> {
        run_claude(prompt).await
    }
}

/// Generate text with retry, returning the model's answer.
pub async fn generate_with_retry(prompt: &str) -> Result<String, ClaudeError> {
    generate_with_retry_impl(prompt, &DefaultExecutor, RetryPolicy::default()).await
}

pub(crate) async fn generate_with_retry_impl<E: ClaudeExecutor>(
    prompt: &str,
    executor: &E,
    policy: RetryPolicy,
) -> Result<String, ClaudeError> {
    retry_with_backoff(
        policy,
        "Claude",
        || async { parse_envelope(&executor.run(prompt).await?) },
        |e| ClaudeError::RetriesExhausted(Box::new(e)),
    )
    .await
}

/// `--output-format json` envelope.
#[derive(Deserialize)]
struct Envelope {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Unwrap the envelope; output that isn't an envelope is used as-is.
fn parse_envelope(stdout: &str) -> Result<String, ClaudeError> {
    let text = match serde_json::from_str::<Envelope>(stdout) {
        Ok(envelope) if envelope.is_error => {
            return Err(ClaudeError::ExecutionFailed(envelope.result));
        }
        Ok(envelope) => envelope.result,
        Err(_) => stdout.to_string(),
    };

    if text.trim().is_empty() {
        return Err(ClaudeError::InvalidResponse("empty result".to_string()));
    }
    Ok(text)
}
