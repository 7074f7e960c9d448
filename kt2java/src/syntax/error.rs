//! Syntax errors with diagnostic code mapping
//!
//! Recoverable errors are collected per malformed statement while parsing
//! continues; fatal ones (unbalanced blocks, depth limit, lexical error
//! tokens) abort the parse with no AST.

use crate::logging::{codes, Code};
use crate::utils::Span;

pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEndOfInput { expected: String, span: Span },

    #[error("Grammar violation: {message}")]
    GrammarViolation { message: String, span: Span },

    #[error("Unmatched block delimiter '{delimiter}'")]
    UnmatchedBlockDelimiter { delimiter: String, span: Span },

    #[error("Maximum nesting depth exceeded")]
    MaxRecursionDepth { span: Span },

    #[error("Too many syntax errors ({count}); parsing stopped")]
    TooManyErrors { count: usize, span: Span },

    #[error("Lexical error token '{text}' reached the parser")]
    LexicalErrorToken { text: String, span: Span },

    #[error("Internal parser error: {message}")]
    InternalParserError { message: String, span: Span },
}

impl SyntaxError {
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, span: Span) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.to_string(),
            span,
        }
    }

    pub fn grammar_violation(message: &str, span: Span) -> Self {
        Self::GrammarViolation {
            message: message.to_string(),
            span,
        }
    }

    pub fn unmatched_delimiter(delimiter: &str, span: Span) -> Self {
        Self::UnmatchedBlockDelimiter {
            delimiter: delimiter.to_string(),
            span,
        }
    }

    pub fn max_recursion_depth(span: Span) -> Self {
        Self::MaxRecursionDepth { span }
    }

    pub fn internal_parser_error(message: &str, span: Span) -> Self {
        Self::InternalParserError {
            message: message.to_string(),
            span,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END_OF_INPUT,
            Self::GrammarViolation { .. } | Self::TooManyErrors { .. } => {
                codes::syntax::GRAMMAR_VIOLATION
            }
            Self::UnmatchedBlockDelimiter { .. } => codes::syntax::UNMATCHED_BLOCK_DELIMITER,
            Self::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
            Self::LexicalErrorToken { .. } => codes::lexical::INVALID_CHARACTER,
            Self::InternalParserError { .. } => codes::syntax::INTERNAL_PARSER_ERROR,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::GrammarViolation { span, .. }
            | Self::UnmatchedBlockDelimiter { span, .. }
            | Self::MaxRecursionDepth { span }
            | Self::TooManyErrors { span, .. }
            | Self::LexicalErrorToken { span, .. }
            | Self::InternalParserError { span, .. } => *span,
        }
    }

    /// Fatal errors leave no usable Program
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnmatchedBlockDelimiter { .. }
                | Self::MaxRecursionDepth { .. }
                | Self::TooManyErrors { .. }
                | Self::LexicalErrorToken { .. }
                | Self::InternalParserError { .. }
        )
    }

    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    #[test]
    fn test_error_code_mapping() {
        let span = Span::dummy();

        let unexpected_token = SyntaxError::unexpected_token("identifier", "<fun>", span);
        assert_eq!(unexpected_token.error_code().as_str(), "E050");

        let end = SyntaxError::unexpected_end_of_input("')'", span);
        assert_eq!(end.error_code().as_str(), "E051");

        let grammar_violation = SyntaxError::grammar_violation("Invalid syntax", span);
        assert_eq!(grammar_violation.error_code().as_str(), "E043");

        let unmatched = SyntaxError::unmatched_delimiter("{", span);
        assert_eq!(unmatched.error_code().as_str(), "E042");

        let max_recursion = SyntaxError::max_recursion_depth(span);
        assert_eq!(max_recursion.error_code().as_str(), "E087");
    }

    #[test]
    fn test_fatality() {
        let span = Span::dummy();
        assert!(SyntaxError::unmatched_delimiter("{", span).is_fatal());
        assert!(SyntaxError::max_recursion_depth(span).is_fatal());
        assert!(SyntaxError::unexpected_token("expression", "\";\"", span).is_recoverable());
        assert!(SyntaxError::grammar_violation("x", span).is_recoverable());
    }

    #[test]
    fn test_span_extraction() {
        let span = Span::new(Position::new(10, 1, 11), Position::new(15, 1, 16));
        let error = SyntaxError::unexpected_token("identifier", "<if>", span);

        assert_eq!(error.span(), span);
        assert_eq!(error.span().start().column, 11);
        assert!(error.to_string().contains("expected identifier, found <if>"));
    }
}
