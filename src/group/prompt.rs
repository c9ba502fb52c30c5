//! Prompt construction for hunk classification.

use crate::diff::Hunk;
use crate::llm::sanitize_diff;

/// Cap on each hunk's text inside the prompt.
const MAX_HUNK_PROMPT_LENGTH: usize = 4_000;

/// Build the classification prompt listing every hunk with its 1-based
/// number.
pub fn build_grouping_prompt(path: &str, hunks: &[Hunk]) -> String {
    let count = hunks.len();

    let listing: String = hunks
        .iter()
        .enumerate()
        .map(|(i, hunk)| {
            let label = hunk
                .label()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default();
            let text = sanitize_diff(&hunk.display_text(), MAX_HUNK_PROMPT_LENGTH);
            format!("### Hunk {}{label}\n```diff\n{}\n```\n", i + 1, text.trim_end())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are splitting the uncommitted changes of one file into small, logically related commits.

## File
{path}

## Hunks ({count} total, numbered 1 to {count})
{listing}
## Rules
1. Hunks that implement the same feature, fix or refactor belong in the same group
2. Unrelated changes (formatting, unrelated fixes, docs) go in separate groups
3. Order groups so that foundational changes come first
4. Use each hunk number at most once
5. If unsure, prefer fewer groups

## Output Format
Respond with ONLY one line per group, nothing else:
GROUP: [1, 3]
GROUP: [2]"#
    )
}
