//! Unified diff parsing and hunk splitting.

pub mod boundary;
pub mod hunk;
pub mod splitter;

pub use boundary::{BoundaryDetector, ChangeKind, DeclarationDetector};
pub use hunk::{Hunk, HunkRange, LineKind};
pub use splitter::{ChunkLevel, HunkSplitter, SplitOptions, split};
