//! Grouping hunks into related commits.

pub mod coordinator;
pub mod parser;
pub mod prompt;

pub use coordinator::{GroupingCoordinator, GroupingOutcome};
pub use parser::{HunkGroup, ParsedGroups, assign_residual, parse_groups};
pub use prompt::build_grouping_prompt;
