//! LLM provider routing, retry and response helpers.

pub mod json;
pub mod retry;
pub mod router;
pub mod sanitize;

pub use json::extract_json;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use router::{
    LlmCompletion, LlmError, LlmProviderError, LlmRouter, Provider, ProviderSelection,
    TextGenerator,
};
pub use sanitize::sanitize_diff;
