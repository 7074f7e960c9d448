//! Syntax analysis module - token sequence to AST
//!
//! Parsing never stops at the first malformed statement: recoverable errors
//! are collected alongside a partial [`Program`]. A fatal error ends the
//! parse and no program is produced.

mod error;
mod parser;

pub use error::{SyntaxError, SyntaxResult};
pub use parser::KotlinParser;

use crate::grammar::ast::nodes::Program;
use crate::logging::codes;
use crate::tokens::Token;
use crate::{log_debug, log_success};

/// Result of parsing one file
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// `None` only when a fatal error stopped the parse
    pub program: Option<Program>,
    /// Recovered errors in source order, followed by the fatal one if any
    pub errors: Vec<SyntaxError>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.program.is_some() && self.errors.is_empty()
    }

    pub fn fatal_error(&self) -> Option<&SyntaxError> {
        self.errors.last().filter(|e| e.is_fatal())
    }
}

/// Parse a token sequence produced by the lexer
pub fn parse_tokens<'a, I>(tokens: I) -> ParseOutcome
where
    I: IntoIterator<Item = Token>,
    I::IntoIter: 'a,
{
    log_debug!("Starting syntax analysis");

    let mut parser = KotlinParser::new(tokens);
    let result = parser.parse_program();
    let mut errors = parser.into_errors();

    let program = match result {
        Ok(program) => {
            log_success!(
                codes::success::AST_CONSTRUCTION_COMPLETE,
                "Syntax analysis completed",
                "declarations" => program.declarations.len(),
                "recovered_errors" => errors.len()
            );
            Some(program)
        }
        Err(fatal) => {
            log_debug!("Syntax analysis stopped",
                "code" => fatal.error_code(),
                "recovered_errors" => errors.len()
            );
            errors.push(fatal);
            None
        }
    };

    ParseOutcome { program, errors }
}

/// Lex and parse `source` in one pass
pub fn parse_source(source: &str) -> ParseOutcome {
    parse_tokens(crate::lexical::Lexer::new(source))
}

/// Check that every syntax error code is registered with metadata
pub fn init_syntax_logging() -> Result<(), String> {
    let syntax_codes = [
        codes::syntax::UNEXPECTED_TOKEN,
        codes::syntax::UNEXPECTED_END_OF_INPUT,
        codes::syntax::GRAMMAR_VIOLATION,
        codes::syntax::UNMATCHED_BLOCK_DELIMITER,
        codes::syntax::INTERNAL_PARSER_ERROR,
        codes::syntax::MAX_RECURSION_DEPTH,
    ];

    for code in &syntax_codes {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!(
                "Syntax error code {} not found in metadata registry",
                code.as_str()
            ));
        }
    }

    log_debug!("Syntax module logging validation completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_clean_parse() {
        let outcome = parse_source("fun main() { val x = 1 }");
        assert!(outcome.is_clean());
        assert!(outcome.fatal_error().is_none());
    }

    #[test]
    fn test_fatal_error_is_last() {
        let outcome = parse_source("fun a() { val = 1 }\nfun b() {");
        assert!(outcome.program.is_none());
        assert_eq!(outcome.errors.len(), 2);
        assert_matches!(outcome.errors[0], SyntaxError::UnexpectedToken { .. });
        assert_matches!(
            outcome.fatal_error(),
            Some(SyntaxError::UnmatchedBlockDelimiter { .. })
        );
    }

    #[test]
    fn test_empty_source_is_valid() {
        let outcome = parse_source("");
        assert!(outcome.is_clean());
        assert_eq!(outcome.program.map(|p| p.declarations.len()), Some(0));
    }

    #[test]
    fn test_syntax_codes_registered() {
        assert!(init_syntax_logging().is_ok());
    }
}
