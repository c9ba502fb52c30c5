//! Commit message drafting through a text generator.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DraftError;
use crate::llm::{TextGenerator, extract_json};

use super::prompt::{DraftRequest, build_message_prompt};

/// Placeholder used when the generator itself failed.
pub const AI_ERROR_MESSAGE: &str = "[Chore] Commit changes (AI Error)";

/// Placeholder used when the generator answered with nothing usable.
pub const SYSTEM_ERROR_MESSAGE: &str = "[Chore] Commit changes (System Error)";

/// Markers that make a message a placeholder rather than a real message.
const PLACEHOLDER_MARKERS: &[&str] = &["(AI Error)", "(System Error)"];

/// Whether `message` may be committed: non-blank and not a placeholder.
pub fn is_valid_message(message: &str) -> bool {
    !message.trim().is_empty() && !PLACEHOLDER_MARKERS.iter().any(|m| message.contains(m))
}

/// A commit message as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitMessage {
    pub subject: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl CommitMessage {
    /// Subject, then a blank line and the body when there is one.
    pub fn format(&self) -> String {
        let subject = self.subject.trim();
        match self.body.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{subject}\n\n{body}"),
            _ => subject.to_string(),
        }
    }
}

/// Parse a model response into a message.
///
/// JSON `{"subject", "body"}` is preferred; any other non-blank answer is
/// used verbatim with its first line as the subject.
pub fn parse_message(response: &str) -> Result<CommitMessage, DraftError> {
    if let Some(json) = extract_json(response)
        && let Ok(message) = serde_json::from_str::<CommitMessage>(json)
        && !message.subject.trim().is_empty()
    {
        return Ok(message);
    }

    let text = response.trim();
    if text.is_empty() {
        return Err(DraftError::EmptyMessage);
    }

    let (subject, body) = match text.split_once('\n') {
        Some((subject, body)) => (subject, Some(body.trim().to_string())),
        None => (text, None),
    };
    Ok(CommitMessage {
        subject: subject.trim().to_string(),
        body: body.filter(|b| !b.is_empty()),
    })
}

/// Drafts one message per commit.
#[derive(Clone)]
pub struct MessageDrafter {
    generator: Arc<dyn TextGenerator>,
}

impl MessageDrafter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Ask the generator for a message and parse it.
    pub async fn try_draft(&self, request: &DraftRequest<'_>) -> Result<CommitMessage, DraftError> {
        let prompt = build_message_prompt(request);
        debug!("Drafting prompt for {}: {} chars", request.path, prompt.len());

        let response = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| DraftError::Generation(e.summary()))?;

        parse_message(&response)
    }

    /// Draft a message, substituting a placeholder on failure. The
    /// placeholder fails [`is_valid_message`], so the commit is skipped.
    pub async fn draft(&self, request: &DraftRequest<'_>) -> String {
        match self.try_draft(request).await {
            Ok(message) => message.format(),
            Err(DraftError::Generation(e)) => {
                warn!("Message generation failed for {}: {e}", request.path);
                AI_ERROR_MESSAGE.to_string()
            }
            Err(e) => {
                warn!("Unusable message for {}: {e}", request.path);
                SYSTEM_ERROR_MESSAGE.to_string()
            }
        }
    }
}
