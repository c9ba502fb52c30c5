//! Lenient parsing of `GROUP: [...]` classifier responses.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Related hunks that are committed together.
///
/// `indices` are 0-based hunk indices in first-appearance order;
/// `ordinal` is the 1-based commit order within the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkGroup {
    indices: Vec<usize>,
    ordinal: usize,
}

impl HunkGroup {
    pub fn new(indices: Vec<usize>, ordinal: usize) -> Self {
        Self { indices, ordinal }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Groups recovered from a response, before residual assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedGroups {
    pub groups: Vec<Vec<usize>>,
    pub diagnostics: Vec<String>,
    /// Number of `GROUP:` lines seen, valid or not.
    pub lines_found: usize,
}

fn group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?:[-*][ \t]+)?GROUP[ \t]*:[ \t]*\[([^\]]*)\]")
            .unwrap_or_else(|e| panic!("invalid GROUP regex: {e}"))
    })
}

/// Extract groups of 1-based hunk numbers from `response`, converting them
/// to 0-based indices below `hunk_count`.
///
/// Out-of-range, unparseable and already-claimed entries are dropped with a
/// diagnostic. Groups left empty are dropped.
pub fn parse_groups(response: &str, hunk_count: usize) -> ParsedGroups {
    let mut parsed = ParsedGroups::default();
    let mut claimed = HashSet::new();

    for caps in group_regex().captures_iter(response) {
        parsed.lines_found += 1;
        let Some(list) = caps.get(1) else { continue };

        let mut group = Vec::new();
        for entry in list.as_str().split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let number = match entry.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    parsed.diagnostics.push(format!("ignored non-numeric hunk '{entry}'"));
                    continue;
                }
            };
            if number == 0 || number > hunk_count {
                parsed.diagnostics.push(format!(
                    "ignored hunk {number}: out of range 1..={hunk_count}"
                ));
                continue;
            }
            let index = number - 1;
            if !claimed.insert(index) {
                parsed.diagnostics.push(format!("ignored hunk {number}: already grouped"));
                continue;
            }
            group.push(index);
        }

        if !group.is_empty() {
            parsed.groups.push(group);
        }
    }

    parsed
}

/// Number the parsed groups and append one residual group holding every
/// unclaimed index in original order. The result covers `0..hunk_count`
/// exactly once.
pub fn assign_residual(groups: Vec<Vec<usize>>, hunk_count: usize) -> Vec<HunkGroup> {
    let claimed: HashSet<usize> = groups.iter().flatten().copied().collect();
    let residual: Vec<usize> = (0..hunk_count).filter(|i| !claimed.contains(i)).collect();

    groups
        .into_iter()
        .chain((!residual.is_empty()).then_some(residual))
        .enumerate()
        .map(|(i, indices)| HunkGroup::new(indices, i + 1))
        .collect()
}
