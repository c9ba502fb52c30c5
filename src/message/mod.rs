//! Commit message drafting.

pub mod draft;
pub mod prompt;

pub use draft::{
    AI_ERROR_MESSAGE, CommitMessage, MessageDrafter, SYSTEM_ERROR_MESSAGE, is_valid_message,
    parse_message,
};
pub use prompt::{DraftRequest, build_message_prompt};
