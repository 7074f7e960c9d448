//! Instrumented tokenization
//!
//! Wraps the pull-based [`Lexer`] to collect a whole file's tokens, record
//! token metrics and convert a trailing error token into a [`LexerError`].

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::lexical::lexer::Lexer;
use crate::logging::codes;
use crate::tokens::{LiteralKind, Token, TokenKind};
use crate::utils::Position;
use crate::{log_debug, log_success};
use std::collections::HashMap;

/// Lexical errors; each one ends the token sequence for its file
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Invalid character '{character}' at {position}")]
    InvalidCharacter { character: char, position: Position },

    #[error("Unterminated string literal starting at {position}")]
    UnterminatedString { position: Position },

    #[error("Unterminated block comment starting at {position}")]
    UnterminatedComment { position: Position },

    #[error("Unterminated character literal at {position}")]
    UnterminatedChar { position: Position },

    #[error("Invalid escape sequence '{sequence}' at {position}")]
    InvalidEscape { sequence: String, position: Position },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH})")]
    IdentifierTooLong { length: usize, position: Position },

    #[error("String literal too large: {size} bytes (max {MAX_STRING_SIZE})")]
    StringTooLarge { size: usize, position: Position },

    #[error("Comment too long: {length} bytes (max {MAX_COMMENT_LENGTH})")]
    CommentTooLong { length: usize, position: Position },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize, position: Position },

    #[error("String template nesting too deep: {depth}")]
    TemplateNestingTooDeep { depth: usize, position: Position },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::InvalidCharacter { .. } => codes::lexical::INVALID_CHARACTER,
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::UnterminatedComment { .. } => codes::lexical::UNTERMINATED_COMMENT,
            LexerError::UnterminatedChar { .. } => codes::lexical::UNTERMINATED_CHAR,
            LexerError::InvalidEscape { .. } => codes::lexical::INVALID_ESCAPE,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::CommentTooLong { .. } => codes::lexical::COMMENT_TOO_LONG,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
            LexerError::TemplateNestingTooDeep { .. } => codes::lexical::TEMPLATE_NESTING_TOO_DEEP,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            LexerError::InvalidCharacter { position, .. }
            | LexerError::UnterminatedString { position }
            | LexerError::UnterminatedComment { position }
            | LexerError::UnterminatedChar { position }
            | LexerError::InvalidEscape { position, .. }
            | LexerError::IdentifierTooLong { position, .. }
            | LexerError::StringTooLarge { position, .. }
            | LexerError::CommentTooLong { position, .. }
            | LexerError::TooManyTokens { position, .. }
            | LexerError::TemplateNestingTooDeep { position, .. } => *position,
        }
    }
}

/// Token counts for one tokenization run
#[derive(Debug, Default, Clone)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub keyword_tokens: usize,
    pub identifier_tokens: usize,
    pub literal_tokens: usize,
    pub string_literals: usize,
    pub operator_tokens: usize,
    pub delimiter_tokens: usize,
    pub comment_count: usize,
    pub trivia_tokens: usize,
    pub max_string_length: usize,
    pub max_comment_length: usize,

    // Only filled when detailed metrics are enabled
    pub operator_usage: HashMap<String, usize>,
}

impl LexicalMetrics {
    pub(crate) fn record_token(&mut self, token: &Token, preferences: &LexicalPreferences) {
        if token.kind.is_trivia() && !preferences.include_trivia_in_counts {
            if token.kind == TokenKind::Comment {
                self.comment_count += 1;
                self.max_comment_length = self.max_comment_length.max(token.text.len());
            }
            return;
        }

        self.total_tokens += 1;

        match token.kind {
            TokenKind::Keyword(_) => self.keyword_tokens += 1,
            TokenKind::Identifier => self.identifier_tokens += 1,
            TokenKind::Literal(kind) => {
                self.literal_tokens += 1;
                if kind == LiteralKind::String {
                    self.string_literals += 1;
                    self.max_string_length = self.max_string_length.max(token.text.len());
                }
            }
            TokenKind::Operator => {
                self.operator_tokens += 1;
                if preferences.collect_detailed_metrics {
                    *self.operator_usage.entry(token.text.clone()).or_insert(0) += 1;
                }
            }
            TokenKind::Delimiter => self.delimiter_tokens += 1,
            TokenKind::Comment => {
                self.comment_count += 1;
                self.trivia_tokens += 1;
                self.max_comment_length = self.max_comment_length.max(token.text.len());
            }
            TokenKind::Whitespace | TokenKind::Newline => self.trivia_tokens += 1,
            TokenKind::Eof | TokenKind::Error => {}
        }
    }
}

/// Tokenizes whole sources and keeps metrics for the last run
pub struct LexicalAnalyzer {
    metrics: LexicalMetrics,
    preferences: LexicalPreferences,
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences: LexicalPreferences::default(),
        }
    }

    pub fn with_preferences(preferences: LexicalPreferences) -> Self {
        Self {
            metrics: LexicalMetrics::default(),
            preferences,
        }
    }

    /// Lex all of `source`
    ///
    /// Returns every token including trivia and the final `Eof`, or the
    /// error that stopped the lexer.
    pub fn tokenize(&mut self, source: &str) -> Result<Vec<Token>, LexerError> {
        self.metrics = LexicalMetrics::default();

        log_debug!("Starting lexical analysis",
            "bytes" => source.len(),
            "max_tokens_allowed" => MAX_TOKEN_COUNT
        );

        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();

        for token in lexer.by_ref() {
            self.metrics.record_token(&token, &self.preferences);
            tokens.push(token);
        }

        if let Some(error) = lexer.take_error() {
            if self.preferences.include_position_in_errors {
                log_debug!("Lexical analysis stopped",
                    "code" => error.error_code(),
                    "position" => error.position(),
                    "tokens_before_error" => tokens.len().saturating_sub(1)
                );
            } else {
                log_debug!("Lexical analysis stopped", "code" => error.error_code());
            }
            return Err(error);
        }

        log_success!(codes::success::TOKENIZATION_COMPLETE,
            "Lexical analysis completed successfully",
            "token_count" => self.metrics.total_tokens,
            "keywords" => self.metrics.keyword_tokens,
            "identifiers" => self.metrics.identifier_tokens,
            "operators" => self.metrics.operator_tokens,
            "comments" => self.metrics.comment_count
        );

        Ok(tokens)
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    pub fn preferences(&self) -> &LexicalPreferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: LexicalPreferences) {
        self.preferences = preferences;
    }
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn preferences(include_trivia: bool) -> LexicalPreferences {
        LexicalPreferences {
            collect_detailed_metrics: true,
            include_trivia_in_counts: include_trivia,
            include_position_in_errors: true,
        }
    }

    #[test]
    fn test_tokenize_counts_significant_tokens() {
        let mut analyzer = LexicalAnalyzer::with_preferences(preferences(false));
        let tokens = analyzer
            .tokenize("fun main() { val x = a && b } // done")
            .unwrap();

        assert!(tokens.last().is_some_and(|t| t.is_eof()));
        let metrics = analyzer.metrics();
        assert_eq!(metrics.keyword_tokens, 2);
        assert_eq!(metrics.identifier_tokens, 4);
        assert_eq!(metrics.operator_tokens, 2);
        assert_eq!(metrics.delimiter_tokens, 4);
        assert_eq!(metrics.comment_count, 1);
        assert_eq!(metrics.trivia_tokens, 0);
        assert_eq!(metrics.operator_usage.get("&&"), Some(&1));
    }

    #[test]
    fn test_trivia_counted_when_enabled() {
        let mut analyzer = LexicalAnalyzer::with_preferences(preferences(true));
        analyzer.tokenize("a b\n").unwrap();
        assert_eq!(analyzer.metrics().trivia_tokens, 2);
    }

    #[test]
    fn test_tokenize_reports_error_with_code() {
        let mut analyzer = LexicalAnalyzer::new();
        let error = analyzer.tokenize("val x = 1\nval y = @").unwrap_err();

        assert_matches!(error, LexerError::InvalidCharacter { character: '@', .. });
        assert_eq!(error.error_code(), codes::lexical::INVALID_CHARACTER);
        assert_eq!(error.position().line, 2);
        assert_eq!(error.position().column, 9);
        assert_eq!(error.position().offset, 18);
    }

    #[test]
    fn test_metrics_reset_between_runs() {
        let mut analyzer = LexicalAnalyzer::new();
        analyzer.tokenize("a b c").unwrap();
        analyzer.tokenize("a").unwrap();
        assert_eq!(analyzer.metrics().identifier_tokens, 1);
    }

    #[test]
    fn test_error_codes_are_registered() {
        let errors = [
            LexerError::UnterminatedString { position: Position::start() },
            LexerError::UnterminatedComment { position: Position::start() },
            LexerError::InvalidEscape { sequence: "\\q".into(), position: Position::start() },
        ];
        for error in errors {
            assert!(codes::get_error_metadata(error.error_code().as_str()).is_some());
        }
    }
}
