//! Sub-patch synthesis from hunk subsets.

pub mod document;
pub mod synthesize;

pub use document::{AppliedHunk, PatchDocument, PatchHunk};
pub use synthesize::{extract_header, normalize_patch_text, synthesize};
