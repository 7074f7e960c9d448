//! Kotlin hard keywords recognized by the lexer
//!
//! The keyword set is closed. Soft keywords (`when`, `import`, `is`, `catch`,
//! `finally`, modifiers) stay identifiers and are interpreted by the parser
//! from context.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // === DECLARATIONS ===
    Fun,
    Val,
    Var,
    Class,
    Interface,
    Package,

    // === CONTROL FLOW ===
    If,
    Else,
    For,
    While,
    Do,
    Return,
    Throw,
    Try,
    Break,
    Continue,
    In,

    // === EXPRESSIONS ===
    Super,
    Typeof,
    Null,
}

impl Keyword {
    /// Exact spelling in Kotlin source
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fun => "fun",
            Self::Val => "val",
            Self::Var => "var",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Package => "package",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::While => "while",
            Self::Do => "do",
            Self::Return => "return",
            Self::Throw => "throw",
            Self::Try => "try",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::In => "in",
            Self::Super => "super",
            Self::Typeof => "typeof",
            Self::Null => "null",
        }
    }

    /// Look up a word in the keyword table (case-sensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        keyword_table().get(s).copied()
    }

    pub const fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::Fun | Self::Val | Self::Var | Self::Class | Self::Interface | Self::Package
        )
    }

    /// Keywords that can only begin a statement, never an expression
    pub const fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::Fun
                | Self::Val
                | Self::Var
                | Self::Class
                | Self::Interface
                | Self::For
                | Self::While
                | Self::Do
                | Self::Return
                | Self::Throw
                | Self::Break
                | Self::Continue
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every keyword in declaration order
pub const ALL_KEYWORDS: [Keyword; 20] = [
    Keyword::Fun,
    Keyword::Val,
    Keyword::Var,
    Keyword::Class,
    Keyword::Interface,
    Keyword::Package,
    Keyword::If,
    Keyword::Else,
    Keyword::For,
    Keyword::While,
    Keyword::Do,
    Keyword::Return,
    Keyword::Throw,
    Keyword::Try,
    Keyword::Break,
    Keyword::Continue,
    Keyword::In,
    Keyword::Super,
    Keyword::Typeof,
    Keyword::Null,
];

static KEYWORD_TABLE: OnceLock<HashMap<&'static str, Keyword>> = OnceLock::new();

/// Process-wide keyword table, built on first use and read-only afterwards
fn keyword_table() -> &'static HashMap<&'static str, Keyword> {
    KEYWORD_TABLE.get_or_init(|| ALL_KEYWORDS.iter().map(|kw| (kw.as_str(), *kw)).collect())
}

/// Check if a string is a reserved keyword
pub fn is_reserved_keyword(s: &str) -> bool {
    Keyword::from_str(s).is_some()
}

/// Soft keywords the parser interprets from context
pub fn soft_keywords() -> &'static [&'static str] {
    &["when", "import", "is", "as", "catch", "finally", "true", "false"]
}

/// Declaration modifiers accepted and dropped by the parser
pub fn modifier_keywords() -> &'static [&'static str] {
    &[
        "public", "private", "protected", "internal", "open", "abstract", "final", "override",
        "data", "enum", "inline", "const", "lateinit", "sealed",
    ]
}

pub fn is_modifier(s: &str) -> bool {
    modifier_keywords().contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for kw in ALL_KEYWORDS {
            assert_eq!(Keyword::from_str(kw.as_str()), Some(kw));
        }
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(Keyword::from_str("fun"), Some(Keyword::Fun));
        assert_eq!(Keyword::from_str("Fun"), None);
        assert_eq!(Keyword::from_str("funny"), None);
    }

    #[test]
    fn test_soft_keywords_are_not_reserved() {
        for word in soft_keywords() {
            assert!(!is_reserved_keyword(word), "{} should not be reserved", word);
        }
        assert!(is_modifier("private"));
        assert!(!is_modifier("fun"));
    }

    #[test]
    fn test_concurrent_table_access() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| is_reserved_keyword("while")))
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
