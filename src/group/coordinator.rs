//! Grouping a file's hunks via the text classifier.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::diff::Hunk;
use crate::llm::TextGenerator;

use super::parser::{HunkGroup, assign_residual, parse_groups};
use super::prompt::build_grouping_prompt;

/// Result of grouping one file's hunks.
///
/// `groups` always covers every hunk index exactly once. `degraded` is set
/// when the classifier failed or gave nothing usable and all hunks were put
/// in one group; downstream code treats that like any single-group result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingOutcome {
    pub groups: Vec<HunkGroup>,
    pub diagnostics: Vec<String>,
    pub degraded: bool,
}

impl GroupingOutcome {
    fn single(hunk_count: usize, degraded: bool, diagnostics: Vec<String>) -> Self {
        Self {
            groups: assign_residual(Vec::new(), hunk_count),
            diagnostics,
            degraded,
        }
    }
}

/// Asks the classifier once per file how hunks relate.
#[derive(Clone)]
pub struct GroupingCoordinator {
    classifier: Arc<dyn TextGenerator>,
}

impl GroupingCoordinator {
    pub fn new(classifier: Arc<dyn TextGenerator>) -> Self {
        Self { classifier }
    }

    /// Group `hunks` of the file at `path`. Never fails: classifier errors
    /// and unusable responses degrade to a single group.
    pub async fn group(&self, path: &str, hunks: &[Hunk]) -> GroupingOutcome {
        if hunks.len() <= 1 {
            return GroupingOutcome::single(hunks.len(), false, Vec::new());
        }

        let prompt = build_grouping_prompt(path, hunks);
        debug!("Grouping prompt for {path}: {} chars", prompt.len());

        let response = match self.classifier.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Classification failed for {path}, treating as single group: {e}");
                return GroupingOutcome::single(
                    hunks.len(),
                    true,
                    vec![format!("classifier error: {e}")],
                );
            }
        };

        let parsed = parse_groups(&response, hunks.len());
        for diagnostic in &parsed.diagnostics {
            debug!("{path}: {diagnostic}");
        }

        if parsed.lines_found == 0 {
            warn!("No GROUP lines in classifier response for {path}, treating as single group");
            let mut diagnostics = parsed.diagnostics;
            diagnostics.push("no GROUP lines in response".to_string());
            return GroupingOutcome::single(hunks.len(), true, diagnostics);
        }

        let groups = assign_residual(parsed.groups, hunks.len());
        debug!("Classified {} hunks into {} groups for {path}", hunks.len(), groups.len());

        GroupingOutcome {
            groups,
            diagnostics: parsed.diagnostics,
            degraded: false,
        }
    }
}
