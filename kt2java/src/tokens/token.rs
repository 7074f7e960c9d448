//! Token model
//!
//! A token is an immutable slice of the source with a kind and position.
//! Trivia (whitespace, newlines, comments) are real tokens so the token
//! texts concatenate back to the exact input.
use crate::grammar::keywords::Keyword;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal flavors recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    Integer,
    Float,
    Boolean,
    Char,
    String,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    Literal(LiteralKind),
    /// Operators, including multi-character ones (`==`, `?.`, `->`)
    Operator,
    /// Braces, parentheses, brackets and the `,` `;` separators
    Delimiter,
    Comment,
    Whitespace,
    Newline,
    Eof,
    /// Unrecognized input; always the last token produced
    Error,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(self, Self::Whitespace | Self::Newline | Self::Comment)
    }

    pub fn is_significant(&self) -> bool {
        !self.is_trivia()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Eof | Self::Error)
    }
}

/// A lexeme with its exact source text, byte offset and 1-based line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
            line,
        }
    }

    pub fn eof(offset: usize, line: u32) -> Self {
        Self::new(TokenKind::Eof, "", offset, line)
    }

    /// Byte offset one past the token's last byte
    pub fn end_offset(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    pub fn is_delimiter(&self, delim: &str) -> bool {
        self.kind == TokenKind::Delimiter && self.text == delim
    }

    /// Operator or delimiter with the given text
    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Operator | TokenKind::Delimiter) && self.text == text
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Identifier with exact name, used for soft keywords like `when`
    pub fn is_identifier_with_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == name
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Literal(_))
    }

    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    /// Short human description used in diagnostics
    ///
    /// `EOF` for end of input, the raw text for errors, `<kw>` for keywords
    /// and the quoted text otherwise, truncated after 10 characters.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "EOF".to_string(),
            TokenKind::Error => self.text.clone(),
            TokenKind::Keyword(kw) => format!("<{}>", kw),
            TokenKind::Newline => "newline".to_string(),
            _ => {
                if self.text.chars().count() > 10 {
                    let prefix: String = self.text.chars().take(10).collect();
                    format!("{:?}...", prefix)
                } else {
                    format!("{:?}", self.text)
                }
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Multi-character operators, longest first for maximal munch
pub const MULTI_CHAR_OPERATORS: [&str; 19] = [
    "!==", "===", "==", "!=", "!!", "<=", ">=", "&&", "||", "?.", "?:", "->", "++", "--", "+=", "-=",
    "*=", "/=", "..",
];

/// Characters that start a single-character operator
pub fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' | '?' | ':' | '.'
    )
}

pub fn is_delimiter_char(c: char) -> bool {
    matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ',' | ';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_variants() {
        assert_eq!(Token::eof(0, 1).describe(), "EOF");
        assert_eq!(
            Token::new(TokenKind::Keyword(Keyword::Fun), "fun", 0, 1).describe(),
            "<fun>"
        );
        assert_eq!(
            Token::new(TokenKind::Identifier, "name", 0, 1).describe(),
            "\"name\""
        );
        assert_eq!(
            Token::new(TokenKind::Error, "#", 3, 1).describe(),
            "#"
        );
    }

    #[test]
    fn test_describe_truncates_long_text() {
        let token = Token::new(TokenKind::Identifier, "averyveryverylongname", 0, 1);
        assert_eq!(token.describe(), "\"averyveryv\"...");
    }

    #[test]
    fn test_trivia_classification() {
        assert!(TokenKind::Whitespace.is_trivia());
        assert!(TokenKind::Comment.is_trivia());
        assert!(TokenKind::Newline.is_trivia());
        assert!(TokenKind::Eof.is_significant());
        assert!(TokenKind::Error.is_terminal());
    }

    #[test]
    fn test_punct_helpers() {
        let op = Token::new(TokenKind::Operator, "?.", 4, 1);
        assert!(op.is_operator("?."));
        assert!(op.is_punct("?."));
        assert!(!op.is_delimiter("?."));
        assert_eq!(op.end_offset(), 6);
    }
}
