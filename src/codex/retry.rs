//! Exponential backoff retry logic for Codex CLI.

use async_trait::async_trait;

use crate::error::CodexError;
use crate::llm::retry::{RetryPolicy, retry_with_backoff};

use super::subprocess::run_codex;

/// Trait for executing Codex CLI commands.
///
/// This abstraction allows mocking the Codex subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodexExecutor: Send + Sync {
    /// Run Codex with the given prompt and return the raw response.
    async fn run(&self, prompt: &str) -> Result<String, CodexError>;
}

/// Default executor that calls the real Codex CLI.
pub struct DefaultExecutor;

#[async_trait]
impl CodexExecutor for DefaultExecutor {
    async fn run(&self, prompt: &str) -> Result<String, CodexError> {
        run_codex(prompt).await
    }
}

/// Generate a free-form text response with retry logic.
pub async fn generate_with_retry(prompt: &str) -> Result<String, CodexError> {
    generate_with_retry_impl(prompt, &DefaultExecutor, RetryPolicy::default()).await
}

pub(crate) async fn generate_with_retry_impl<E: CodexExecutor>(
    prompt: &str,
    executor: &E,
    policy: RetryPolicy,
) -> Result<String, CodexError> {
    retry_with_backoff(
        policy,
        "Codex",
        || async {
            let output = executor.run(prompt).await?;
            if output.trim().is_empty() {
                return Err(CodexError::InvalidResponse("empty output".to_string()));
            }
            Ok(output)
        },
        |e| CodexError::RetriesExhausted(Box::new(e)),
    )
    .await
}
