//! Provider selection and fallback orchestration.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::claude;
use crate::codex;
use crate::error::{ClaudeError, CodexError};

/// Something that turns a prompt into text.
///
/// The analysis phase only ever talks to this trait, so tests can swap in
/// canned responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Claude,
    Codex,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::Codex => "Codex",
        }
    }

    pub fn other(self) -> Provider {
        match self {
            Provider::Claude => Provider::Codex,
            Provider::Codex => Provider::Claude,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(Provider::Claude),
            "codex" => Ok(Provider::Codex),
            other => Err(format!("unknown provider '{other}' (expected claude or codex)")),
        }
    }
}

/// Primary + fallback selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSelection {
    pub primary: Provider,
    pub fallback: Provider,
}

impl ProviderSelection {
    pub fn from_primary(primary: Provider) -> Self {
        Self {
            primary,
            fallback: primary.other(),
        }
    }

    fn swapped(self) -> Self {
        Self {
            primary: self.fallback,
            fallback: self.primary,
        }
    }
}

impl Default for ProviderSelection {
    fn default() -> Self {
        ProviderSelection::from_primary(Provider::Claude)
    }
}

/// Provider-specific error wrapper.
#[derive(Debug)]
pub enum LlmProviderError {
    Claude(ClaudeError),
    Codex(CodexError),
}

impl LlmProviderError {
    pub fn provider(&self) -> Provider {
        match self {
            LlmProviderError::Claude(_) => Provider::Claude,
            LlmProviderError::Codex(_) => Provider::Codex,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            LlmProviderError::Claude(err) => summarize_claude_error(err),
            LlmProviderError::Codex(err) => summarize_codex_error(err),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            LlmProviderError::Claude(err) => err.to_string(),
            LlmProviderError::Codex(err) => err.to_string(),
        }
    }
}

impl fmt::Display for LlmProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for LlmProviderError {}

impl From<ClaudeError> for LlmProviderError {
    fn from(err: ClaudeError) -> Self {
        LlmProviderError::Claude(err)
    }
}

impl From<CodexError> for LlmProviderError {
    fn from(err: CodexError) -> Self {
        LlmProviderError::Codex(err)
    }
}

/// LLM orchestration error.
#[derive(Debug)]
pub enum LlmError {
    AllProvidersFailed {
        primary: Provider,
        primary_error: LlmProviderError,
        fallback: Provider,
        fallback_error: LlmProviderError,
    },
    /// The provider answered, but with nothing usable.
    EmptyResponse { provider: Provider },
}

impl LlmError {
    pub fn summary(&self) -> String {
        match self {
            LlmError::AllProvidersFailed {
                primary,
                primary_error,
                fallback,
                fallback_error,
            } => format!(
                "Both LLM providers failed. {} error: {}. {} error: {}.",
                primary,
                primary_error.summary(),
                fallback,
                fallback_error.summary()
            ),
            LlmError::EmptyResponse { provider } => format!("{provider} returned an empty response"),
        }
    }

    pub fn detailed(&self) -> String {
        match self {
            LlmError::AllProvidersFailed {
                primary,
                primary_error,
                fallback,
                fallback_error,
            } => format!(
                "Both LLM providers failed. {} error: {}. {} error: {}.",
                primary,
                primary_error.detail(),
                fallback,
                fallback_error.detail()
            ),
            LlmError::EmptyResponse { .. } => self.summary(),
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for LlmError {}

/// Successful generation with metadata.
#[derive(Debug)]
pub struct LlmCompletion {
    pub output: String,
    pub provider: Provider,
    pub primary_error: Option<LlmProviderError>,
}

#[async_trait]
trait ProviderRunner: Send + Sync {
    async fn run(&self, provider: Provider, prompt: &str) -> Result<String, LlmProviderError>;
}

struct DefaultRunner;

#[async_trait]
impl ProviderRunner for DefaultRunner {
    async fn run(&self, provider: Provider, prompt: &str) -> Result<String, LlmProviderError> {
        match provider {
            Provider::Claude => claude::generate_with_retry(prompt)
                .await
                .map_err(LlmProviderError::from),
            Provider::Codex => codex::generate_with_retry(prompt)
                .await
                .map_err(LlmProviderError::from),
        }
    }
}

/// Provider router with fallback and stickiness.
///
/// Shared by all analysis tasks. When the fallback succeeds after the
/// primary failed, the two swap for every later call.
pub struct LlmRouter {
    selection: Mutex<ProviderSelection>,
    runner: Box<dyn ProviderRunner>,
}

impl LlmRouter {
    pub fn new(selection: ProviderSelection) -> Self {
        Self {
            selection: Mutex::new(selection),
            runner: Box::new(DefaultRunner),
        }
    }

    #[cfg(test)]
    fn with_runner(selection: ProviderSelection, runner: impl ProviderRunner + 'static) -> Self {
        Self {
            selection: Mutex::new(selection),
            runner: Box::new(runner),
        }
    }

    fn current(&self) -> ProviderSelection {
        *self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn primary(&self) -> Provider {
        self.current().primary
    }

    pub fn fallback(&self) -> Provider {
        self.current().fallback
    }

    /// Run the prompt on the primary, then on the fallback if that fails.
    pub async fn complete(&self, prompt: &str) -> Result<LlmCompletion, LlmError> {
        let selection = self.current();
        let ProviderSelection { primary, fallback } = selection;

        let primary_error = match self.runner.run(primary, prompt).await {
            Ok(output) => return finish(output, primary, None),
            Err(e) => e,
        };
        debug!("{primary} failed: {}", primary_error.detail());

        match self.runner.run(fallback, prompt).await {
            Ok(output) => {
                let mut current = self.selection.lock().unwrap_or_else(|e| e.into_inner());
                if *current == selection {
                    warn!("{primary} failed ({primary_error}); using {fallback} from now on");
                    *current = selection.swapped();
                }
                drop(current);
                finish(output, fallback, Some(primary_error))
            }
            Err(fallback_error) => Err(LlmError::AllProvidersFailed {
                primary,
                primary_error,
                fallback,
                fallback_error,
            }),
        }
    }
}

fn finish(
    output: String,
    provider: Provider,
    primary_error: Option<LlmProviderError>,
) -> Result<LlmCompletion, LlmError> {
    if output.trim().is_empty() {
        return Err(LlmError::EmptyResponse { provider });
    }
    Ok(LlmCompletion {
        output,
        provider,
        primary_error,
    })
}

#[async_trait]
impl TextGenerator for LlmRouter {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(prompt).await.map(|c| c.output)
    }
}

fn summarize_claude_error(err: &ClaudeError) -> String {
    match err {
        ClaudeError::NotInstalled => "Claude CLI not found".to_string(),
        ClaudeError::ExecutionFailed(_) => "Claude CLI reported an error".to_string(),
        ClaudeError::SpawnFailed(_) => "Failed to start Claude CLI".to_string(),
        ClaudeError::InvalidResponse(_) => "Claude returned an unusable response".to_string(),
        ClaudeError::Timeout(secs) => format!("Claude timed out after {}s", secs),
        ClaudeError::NonZeroExit { code, .. } => format!("Claude CLI exited with code {}", code),
        ClaudeError::RetriesExhausted(_) => "Claude failed after retries".to_string(),
    }
}

fn summarize_codex_error(err: &CodexError) -> String {
    match err {
        CodexError::NotInstalled => "Codex CLI not found".to_string(),
        CodexError::ExecutionFailed(_) => "Codex CLI reported an error".to_string(),
        CodexError::SpawnFailed(_) => "Failed to start Codex CLI".to_string(),
        CodexError::InvalidResponse(_) => "Codex returned an unusable response".to_string(),
        CodexError::Timeout(secs) => format!("Codex timed out after {}s", secs),
        CodexError::NonZeroExit { code, .. } => format!("Codex CLI exited with code {}", code),
        CodexError::RetriesExhausted(_) => "Codex failed after retries".to_string(),
    }
}
