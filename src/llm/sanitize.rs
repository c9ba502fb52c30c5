//! Cleaning untrusted diff text before it goes into a prompt.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Phrases that try to steer the model away from its task.
const INJECTION_PATTERNS: &[&str] = &[
    r"ignore\s+(?:all\s+)?previous\s+instructions",
    r"disregard\s+(?:all\s+)?(?:previous|prior|above)\s+(?:instructions|context)",
    r"forget\s+(?:all\s+)?(?:previous|prior)\s+instructions",
    r"you\s+are\s+now\s+",
    r"new\s+instructions\s*:",
    r"system\s*prompt\s*:",
];

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]")
            .unwrap_or_else(|e| panic!("invalid ANSI regex: {e}"))
    })
}

fn injection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!("(?i)(?:{})", INJECTION_PATTERNS.join("|"));
        Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid injection regex: {e}"))
    })
}

/// Drop control characters other than newline and tab.
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || c == '\x1b' || !c.is_control())
        .collect()
}

/// Strip ANSI colour and cursor escape sequences, then any stray ESC.
pub fn remove_ansi_escapes(text: &str) -> String {
    ansi_regex().replace_all(text, "").replace('\x1b', "")
}

pub fn filter_injection_patterns(text: &str) -> String {
    injection_regex().replace_all(text, "[filtered]").into_owned()
}

/// Collapse runs of more than two blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.split('\n') {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.pop();
    out
}

/// Sanitize diff text for a prompt and cap it at `max_len` bytes.
///
/// Unlike prose sanitizing this keeps every diff line (and `##` context)
/// intact apart from the filtered content.
pub fn sanitize_diff(text: &str, max_len: usize) -> String {
    let mut result = remove_control_chars(text);
    result = remove_ansi_escapes(&result);
    result = filter_injection_patterns(&result);
    result = normalize_whitespace(&result);

    if result.len() > max_len {
        let mut end = max_len;
        while end > 0 && !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    result
}
