//! Line classification: should the cursor line trigger a run at all?
//!
//! Syntactic heuristic, not a parser. A line qualifies when it starts with a
//! print-like call or is exactly one call expression `name(...)`. Lines whose
//! first identifier is a block-opening keyword never qualify, even when they
//! also match the call shape (`while(x)`, `if(ready())`).
//!
//! The pipeline only sees the `LineClassifier` trait, so a stricter parser can
//! replace `CallShapeClassifier` without touching anything else.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CALL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\s*\(.*\)$").expect("call shape pattern"));
static LEADING_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+").expect("leading word pattern"));

/// Keywords that open a block and are never evaluated.
pub const BLOCK_KEYWORDS: &[&str] = &[
    "def", "class", "for", "while", "if", "elif", "else", "with", "try", "except", "finally",
];

pub trait LineClassifier: Send + Sync + 'static {
    fn should_evaluate(&self, line: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct CallShapeClassifier {
    print_prefixes: Vec<String>,
    excluded: HashSet<String>,
}

impl Default for CallShapeClassifier {
    fn default() -> Self {
        Self {
            print_prefixes: vec!["print(".to_string()],
            excluded: BLOCK_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl CallShapeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `name(` at line start as print-like.
    pub fn with_print_call(mut self, name: &str) -> Self {
        self.print_prefixes.push(format!("{name}("));
        self
    }

    pub fn with_excluded<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(keywords.into_iter().map(Into::into));
        self
    }

    fn is_excluded(&self, trimmed: &str) -> bool {
        LEADING_WORD
            .find(trimmed)
            .is_some_and(|word| self.excluded.contains(word.as_str()))
    }
}

impl LineClassifier for CallShapeClassifier {
    fn should_evaluate(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() || self.is_excluded(trimmed) {
            return false;
        }
        self.print_prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
            || CALL_SHAPE.is_match(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_and_bare_calls_qualify() {
        let c = CallShapeClassifier::new();
        assert!(c.should_evaluate("print(x)"));
        assert!(c.should_evaluate("    print(1/0)   "));
        assert!(c.should_evaluate("print(x)  # trailing comment"));
        assert!(c.should_evaluate("show(a, b)"));
        assert!(c.should_evaluate("compute (1)"));
    }

    #[test]
    fn non_calls_are_rejected() {
        let c = CallShapeClassifier::new();
        assert!(!c.should_evaluate("x = 1"));
        assert!(!c.should_evaluate("foo(1) + 2"));
        assert!(!c.should_evaluate("obj.method()"));
        assert!(!c.should_evaluate(""));
        assert!(!c.should_evaluate("   \t "));
    }

    #[test]
    fn block_keywords_win_over_call_shape() {
        let c = CallShapeClassifier::new();
        assert!(!c.should_evaluate("while(running())"));
        assert!(!c.should_evaluate("if(ready)"));
        assert!(!c.should_evaluate("def f():"));
        assert!(!c.should_evaluate("else:"));
        // Keyword prefix inside a longer identifier is not a keyword.
        assert!(c.should_evaluate("iffy(3)"));
        assert!(c.should_evaluate("format_for(x)"));
    }

    #[test]
    fn builder_extends_policy() {
        let c = CallShapeClassifier::new()
            .with_print_call("pprint")
            .with_excluded(["assert"]);
        assert!(c.should_evaluate("pprint(data) or fallback"));
        assert!(!c.should_evaluate("assert(x)"));
    }
}
