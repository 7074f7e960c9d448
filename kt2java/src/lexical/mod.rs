//! Lexical analysis
//!
//! [`Lexer`] is the lazy, pull-based token source. [`LexicalAnalyzer`]
//! drives it over a whole file for the pipeline and records metrics.

pub mod analyzer;
pub mod lexer;

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::tokens::Token;

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics};
pub use lexer::{tokenize, Lexer};

/// Tokenize with default preferences
pub fn tokenize_source(source: &str) -> Result<Vec<Token>, LexerError> {
    LexicalAnalyzer::new().tokenize(source)
}

/// Tokenize with custom runtime preferences (limits remain compile-time)
pub fn tokenize_source_with_preferences(
    source: &str,
    preferences: LexicalPreferences,
) -> Result<Vec<Token>, LexerError> {
    LexicalAnalyzer::with_preferences(preferences).tokenize(source)
}

/// Validate lexical error codes and compile-time limits at startup
pub fn init_lexical_analysis_logging() -> Result<(), String> {
    crate::logging::codes::ensure_registered(&[
        crate::logging::codes::lexical::INVALID_CHARACTER,
        crate::logging::codes::lexical::UNTERMINATED_STRING,
        crate::logging::codes::lexical::UNTERMINATED_COMMENT,
        crate::logging::codes::lexical::UNTERMINATED_CHAR,
        crate::logging::codes::lexical::INVALID_ESCAPE,
        crate::logging::codes::lexical::IDENTIFIER_TOO_LONG,
        crate::logging::codes::lexical::STRING_TOO_LARGE,
        crate::logging::codes::lexical::COMMENT_TOO_LONG,
        crate::logging::codes::lexical::TOO_MANY_TOKENS,
        crate::logging::codes::lexical::TEMPLATE_NESTING_TOO_DEEP,
        crate::logging::codes::success::TOKENIZATION_COMPLETE,
    ])?;

    crate::log_debug!("Lexical limits initialized",
        "max_string_size" => MAX_STRING_SIZE,
        "max_identifier_length" => MAX_IDENTIFIER_LENGTH,
        "max_comment_length" => MAX_COMMENT_LENGTH,
        "max_token_count" => MAX_TOKEN_COUNT
    );

    Ok(())
}

/// Snapshot of the compile-time lexical limits
#[derive(Debug, Clone)]
pub struct LexicalLimits {
    pub max_string_size: usize,
    pub max_identifier_length: usize,
    pub max_comment_length: usize,
    pub max_token_count: usize,
}

pub fn get_lexical_limits() -> LexicalLimits {
    LexicalLimits {
        max_string_size: MAX_STRING_SIZE,
        max_identifier_length: MAX_IDENTIFIER_LENGTH,
        max_comment_length: MAX_COMMENT_LENGTH,
        max_token_count: MAX_TOKEN_COUNT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging() {
        assert!(init_lexical_analysis_logging().is_ok());
    }

    #[test]
    fn test_limits_are_nonzero() {
        let limits = get_lexical_limits();
        assert!(limits.max_string_size > 0);
        assert!(limits.max_identifier_length > 0);
        assert!(limits.max_comment_length > 0);
        assert!(limits.max_token_count > 0);
    }

    #[test]
    fn test_tokenize_source_round_trip() {
        let source = "val greeting = \"hi\"\n";
        let tokens = tokenize_source(source).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, source);
    }
}
