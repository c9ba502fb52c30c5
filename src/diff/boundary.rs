//! Semantic boundary detection in added diff lines.
//!
//! Used by the finer chunk levels to find where a logical unit (a function,
//! type or class) starts, and to tell documentation-only and signature
//! changes apart from ordinary code. The heuristics are language specific
//! and deliberately shallow.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Kind of change an added line represents at the atomic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Documentation,
    Signature,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Documentation => "documentation",
            ChangeKind::Signature => "signature",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects semantic boundaries in added lines (without the leading `+`).
pub trait BoundaryDetector: Send + Sync {
    /// Name of the unit this line starts, e.g. `fn parse`.
    fn unit_start(&self, added: &str) -> Option<String>;

    /// Whether this line is a documentation or signature change.
    fn change_kind(&self, added: &str) -> Option<ChangeKind>;
}

const FUNCTION_KEYWORDS: &[&str] = &["fn", "def", "function", "func"];

const DECLARATION_PATTERNS: &[&str] = &[
    // Rust
    r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:async|const|unsafe|extern\s+"[^"]*")\s+)*(?P<kw>fn|struct|enum|trait|impl|mod|union)\b\s*(?P<name>[A-Za-z_][A-Za-z0-9_]*)?"#,
    // Python
    r"^\s*(?:async\s+)?(?P<kw>def|class)\s+(?P<name>[A-Za-z_]\w*)",
    // JavaScript / TypeScript
    r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:async\s+)?(?P<kw>function|class|interface)\b\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)?",
    // Go
    r"^(?P<kw>func)\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)",
];

fn declaration_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        DECLARATION_PATTERNS
            .iter()
            .map(|p| {
                Regex::new(p).unwrap_or_else(|e| panic!("invalid declaration regex {p}: {e}"))
            })
            .collect()
    })
}

fn documentation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*(?:///|//!|/\*\*|"""|'''|#(?:\s|$)|//\s)"#)
            .unwrap_or_else(|e| panic!("invalid documentation regex: {e}"))
    })
}

/// Regex-based detector for Rust, Python, JavaScript/TypeScript and Go.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationDetector;

impl DeclarationDetector {
    pub fn new() -> Self {
        Self
    }

    /// Match a declaration, returning `(keyword, name)`.
    fn declaration<'a>(&self, line: &'a str) -> Option<(&'a str, Option<&'a str>)> {
        declaration_regexes().iter().find_map(|re| {
            let caps = re.captures(line)?;
            let kw = caps.name("kw")?.as_str();
            let name = caps.name("name").map(|m| m.as_str());
            Some((kw, name))
        })
    }
}

impl BoundaryDetector for DeclarationDetector {
    fn unit_start(&self, added: &str) -> Option<String> {
        let (kw, name) = self.declaration(added)?;
        Some(match name {
            Some(name) => format!("{kw} {name}"),
            None => kw.to_string(),
        })
    }

    fn change_kind(&self, added: &str) -> Option<ChangeKind> {
        if documentation_regex().is_match(added) {
            return Some(ChangeKind::Documentation);
        }
        match self.declaration(added) {
            Some((kw, _)) if FUNCTION_KEYWORDS.contains(&kw) && added.contains('(') => {
                Some(ChangeKind::Signature)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_declarations() {
        let d = DeclarationDetector::new();
        assert_eq!(d.unit_start("pub fn parse(input: &str) {").as_deref(), Some("fn parse"));
        assert_eq!(d.unit_start("    pub(crate) async fn run() {").as_deref(), Some("fn run"));
        assert_eq!(d.unit_start("struct Config {").as_deref(), Some("struct Config"));
        assert_eq!(d.unit_start("impl<T> Foo for T {").as_deref(), Some("impl"));
        assert_eq!(d.unit_start("let fnord = 1;"), None);
    }

    #[test]
    fn test_python_declarations() {
        let d = DeclarationDetector::new();
        assert_eq!(d.unit_start("class Parser:").as_deref(), Some("class Parser"));
        assert_eq!(d.unit_start("    async def fetch(self):").as_deref(), Some("def fetch"));
    }

    #[test]
    fn test_js_and_go_declarations() {
        let d = DeclarationDetector::new();
        assert_eq!(
            d.unit_start("export async function load(url) {").as_deref(),
            Some("function load")
        );
        assert_eq!(d.unit_start("func (s *Server) Start() error {").as_deref(), Some("func Start"));
    }

    #[test]
    fn test_change_kind_documentation() {
        let d = DeclarationDetector::new();
        assert_eq!(d.change_kind("/// Parses input."), Some(ChangeKind::Documentation));
        assert_eq!(d.change_kind("    \"\"\"Docstring.\"\"\""), Some(ChangeKind::Documentation));
        assert_eq!(d.change_kind("# comment"), Some(ChangeKind::Documentation));
        assert_eq!(d.change_kind("#[derive(Debug)]"), None);
    }

    #[test]
    fn test_every_declaration_pattern_compiles() {
        assert_eq!(declaration_regexes().len(), DECLARATION_PATTERNS.len());
    }

    #[test]
    fn test_change_kind_signature() {
        let d = DeclarationDetector::new();
        assert_eq!(d.change_kind("fn parse(input: &str) -> Ast {"), Some(ChangeKind::Signature));
        assert_eq!(d.change_kind("struct Config {"), None);
        assert_eq!(d.change_kind("x += 1;"), None);
    }
}
