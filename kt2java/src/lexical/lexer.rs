//! Pull-based Kotlin lexer
//!
//! [`Lexer`] is a read-once cursor over the source that yields tokens on
//! demand. Every scan step consumes at least one character, so the sequence
//! always ends: in exactly one `Eof` token, or in one `Error` token when the
//! input cannot be lexed further. Trivia are emitted as tokens, which keeps
//! lexing lossless.

use crate::config::compile_time::lexical::*;
use crate::config::compile_time::syntax::MAX_CONTEXT_STACK_DEPTH;
use crate::grammar::keywords::Keyword;
use crate::lexical::analyzer::LexerError;
use crate::tokens::token::{is_delimiter_char, is_operator_char, MULTI_CHAR_OPERATORS};
use crate::tokens::{LiteralKind, Token, TokenKind};
use crate::utils::Position;

/// Scanner state chosen from the lookahead at each token boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Text,
    Whitespace,
    Newline,
    Comment,
    IdentifierOrKeyword,
    Number,
    StringLiteral,
    CharLiteral,
    Operator,
    Separator,
    Done,
}

pub struct Lexer<'a> {
    source: &'a str,
    /// Byte index into `source`
    pos: usize,
    /// Position of `pos` relative to the enclosing file
    position: Position,
    state: LexState,
    emitted: usize,
    error: Option<LexerError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_origin(source, Position::start())
    }

    /// Lex a fragment that starts at `origin` in a larger file
    ///
    /// Used for `${...}` template expressions so that their tokens carry
    /// file-relative offsets and lines.
    pub fn with_origin(source: &'a str, origin: Position) -> Self {
        Self {
            source,
            pos: 0,
            position: origin,
            state: LexState::Text,
            emitted: 0,
            error: None,
        }
    }

    /// The error that ended the sequence, if any
    pub fn error(&self) -> Option<&LexerError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<LexerError> {
        self.error.take()
    }

    // === CHARACTER CURSOR ===

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        self.position = self.position.advance(ch);
        Some(ch)
    }

    fn bump_while<F: Fn(char) -> bool>(&mut self, predicate: F) {
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    // === STATE DISPATCH ===

    fn next_state(&self) -> LexState {
        let Some(ch) = self.peek_char() else {
            return LexState::Done;
        };
        match ch {
            ' ' | '\t' | '\u{0C}' => LexState::Whitespace,
            '\n' | '\r' => LexState::Newline,
            '/' if matches!(self.peek_nth(1), Some('/') | Some('*')) => LexState::Comment,
            c if c.is_alphabetic() || c == '_' || c == '`' => LexState::IdentifierOrKeyword,
            c if c.is_ascii_digit() => LexState::Number,
            '"' => LexState::StringLiteral,
            '\'' => LexState::CharLiteral,
            c if is_delimiter_char(c) => LexState::Separator,
            c if is_operator_char(c) => LexState::Operator,
            _ => LexState::Text,
        }
    }

    fn scan(&mut self, state: LexState) -> Result<TokenKind, LexerError> {
        match state {
            LexState::Whitespace => {
                self.bump_while(|c| matches!(c, ' ' | '\t' | '\u{0C}'));
                Ok(TokenKind::Whitespace)
            }
            LexState::Newline => {
                if self.bump() == Some('\r') && self.peek_char() == Some('\n') {
                    self.bump();
                }
                Ok(TokenKind::Newline)
            }
            LexState::Comment => self.scan_comment(),
            LexState::IdentifierOrKeyword => self.scan_word(),
            LexState::Number => Ok(self.scan_number()),
            LexState::StringLiteral => self.scan_string(0).map(|_| TokenKind::Literal(LiteralKind::String)),
            LexState::CharLiteral => self.scan_char().map(|_| TokenKind::Literal(LiteralKind::Char)),
            LexState::Operator => Ok(self.scan_operator()),
            LexState::Separator => {
                self.bump();
                Ok(TokenKind::Delimiter)
            }
            LexState::Text | LexState::Done => {
                let character = self.peek_char().unwrap_or('\0');
                Err(LexerError::InvalidCharacter {
                    character,
                    position: self.position,
                })
            }
        }
    }

    // === LEXEME SCANNERS ===

    fn scan_comment(&mut self) -> Result<TokenKind, LexerError> {
        let start = self.position;
        let start_pos = self.pos;
        self.bump();

        if self.bump() == Some('/') {
            self.bump_while(|c| c != '\n' && c != '\r');
        } else {
            // Block comments nest in Kotlin
            let mut depth = 1usize;
            while depth > 0 {
                if self.rest().starts_with("/*") {
                    self.bump();
                    self.bump();
                    depth += 1;
                } else if self.rest().starts_with("*/") {
                    self.bump();
                    self.bump();
                    depth -= 1;
                } else if self.bump().is_none() {
                    return Err(LexerError::UnterminatedComment { position: start });
                }
            }
        }

        let length = self.pos - start_pos;
        if length > MAX_COMMENT_LENGTH {
            return Err(LexerError::CommentTooLong {
                length,
                position: start,
            });
        }
        Ok(TokenKind::Comment)
    }

    fn scan_word(&mut self) -> Result<TokenKind, LexerError> {
        let start = self.position;
        let start_pos = self.pos;

        if self.peek_char() == Some('`') {
            // Backticked identifier: `is`, `when`
            self.bump();
            self.bump_while(|c| c != '`' && c != '\n' && c != '\r');
            if self.bump() != Some('`') {
                return Err(LexerError::InvalidCharacter {
                    character: '`',
                    position: start,
                });
            }
            return Ok(TokenKind::Identifier);
        }

        self.bump_while(|c| c.is_alphanumeric() || c == '_');
        let word = &self.source[start_pos..self.pos];

        let length = word.chars().count();
        if length > MAX_IDENTIFIER_LENGTH {
            return Err(LexerError::IdentifierTooLong {
                length,
                position: start,
            });
        }

        Ok(match word {
            "true" | "false" => TokenKind::Literal(LiteralKind::Boolean),
            _ => match Keyword::from_str(word) {
                Some(Keyword::Null) => TokenKind::Literal(LiteralKind::Null),
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier,
            },
        })
    }

    /// Integer or float; a sign is never part of the lexeme
    fn scan_number(&mut self) -> TokenKind {
        let mut kind = LiteralKind::Integer;

        if self.peek_char() == Some('0') && matches!(self.peek_nth(1), Some('x' | 'X' | 'b' | 'B')) {
            self.bump();
            self.bump();
            self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
        } else {
            self.bump_while(|c| c.is_ascii_digit() || c == '_');

            // `1..10` and `1.toString()` keep the dot out of the number
            if self.peek_char() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                kind = LiteralKind::Float;
                self.bump();
                self.bump_while(|c| c.is_ascii_digit() || c == '_');
            }

            if matches!(self.peek_char(), Some('e' | 'E')) {
                let exponent_follows = match self.peek_nth(1) {
                    Some(c) if c.is_ascii_digit() => true,
                    Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                    _ => false,
                };
                if exponent_follows {
                    kind = LiteralKind::Float;
                    self.bump();
                    if matches!(self.peek_char(), Some('+' | '-')) {
                        self.bump();
                    }
                    self.bump_while(|c| c.is_ascii_digit());
                }
            }
        }

        match self.peek_char() {
            Some('f' | 'F') => {
                self.bump();
                kind = LiteralKind::Float;
            }
            Some('L') if kind == LiteralKind::Integer => {
                self.bump();
            }
            _ => {}
        }

        TokenKind::Literal(kind)
    }

    /// Scan a string literal, including any nested template expressions
    fn scan_string(&mut self, nesting: usize) -> Result<(), LexerError> {
        let start = self.position;
        let start_pos = self.pos;

        if nesting > MAX_CONTEXT_STACK_DEPTH {
            return Err(LexerError::TemplateNestingTooDeep {
                depth: nesting,
                position: start,
            });
        }

        let raw = self.rest().starts_with("\"\"\"");
        if raw {
            self.bump();
            self.bump();
        }
        self.bump();

        loop {
            if self.pos - start_pos > MAX_STRING_SIZE {
                return Err(LexerError::StringTooLarge {
                    size: self.pos - start_pos,
                    position: start,
                });
            }

            match self.peek_char() {
                None => return Err(LexerError::UnterminatedString { position: start }),
                Some('\n' | '\r') if !raw => {
                    return Err(LexerError::UnterminatedString { position: start })
                }
                Some('"') if raw => {
                    if self.rest().starts_with("\"\"\"") {
                        self.bump();
                        self.bump();
                        self.bump();
                        // Extra quotes before the closer belong to the content
                        self.bump_while(|c| c == '"');
                        return Ok(());
                    }
                    self.bump();
                }
                Some('"') => {
                    self.bump();
                    return Ok(());
                }
                Some('\\') if !raw => self.scan_escape()?,
                Some('$') if self.peek_nth(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    self.skip_template_expression(start, nesting)?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Skip a `${...}` body up to and including its closing brace
    fn skip_template_expression(&mut self, string_start: Position, nesting: usize) -> Result<(), LexerError> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek_char() {
                None => return Err(LexerError::UnterminatedString { position: string_start }),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                }
                Some('"') => self.scan_string(nesting + 1)?,
                Some('\'') => self.scan_char()?,
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn scan_escape(&mut self) -> Result<(), LexerError> {
        let start = self.position;
        let start_pos = self.pos;
        self.bump();

        match self.bump() {
            Some('n' | 't' | '"' | '\\' | '$' | 'r' | '\'' | 'b') => Ok(()),
            Some('u') => {
                for _ in 0..4 {
                    match self.peek_char() {
                        Some(c) if c.is_ascii_hexdigit() => {
                            self.bump();
                        }
                        _ => {
                            return Err(LexerError::InvalidEscape {
                                sequence: self.source[start_pos..self.pos].to_string(),
                                position: start,
                            })
                        }
                    }
                }
                Ok(())
            }
            None => Err(LexerError::UnterminatedString { position: start }),
            Some(_) => Err(LexerError::InvalidEscape {
                sequence: self.source[start_pos..self.pos].to_string(),
                position: start,
            }),
        }
    }

    fn scan_char(&mut self) -> Result<(), LexerError> {
        let start = self.position;
        self.bump();

        match self.peek_char() {
            None | Some('\'' | '\n' | '\r') => {
                return Err(LexerError::UnterminatedChar { position: start })
            }
            Some('\\') => self.scan_escape()?,
            Some(_) => {
                self.bump();
            }
        }

        if self.bump() != Some('\'') {
            return Err(LexerError::UnterminatedChar { position: start });
        }
        Ok(())
    }

    /// Longest operator wins: `==` over `=`, `?.` over `?`
    fn scan_operator(&mut self) -> TokenKind {
        let longest = MULTI_CHAR_OPERATORS
            .iter()
            .filter(|op| self.rest().starts_with(*op))
            .map(|op| op.len())
            .max()
            .unwrap_or(1);

        for _ in 0..longest {
            self.bump();
        }
        TokenKind::Operator
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.state == LexState::Done {
            return None;
        }

        let start_pos = self.pos;
        let start = self.position;

        if self.emitted >= MAX_TOKEN_COUNT {
            self.state = LexState::Done;
            self.error = Some(LexerError::TooManyTokens {
                count: self.emitted,
                position: start,
            });
            return Some(Token::new(TokenKind::Error, self.rest(), start.offset, start.line));
        }

        self.state = self.next_state();
        if self.state == LexState::Done {
            return Some(Token::eof(start.offset, start.line));
        }

        let token = match self.scan(self.state) {
            Ok(kind) => Token::new(kind, &self.source[start_pos..self.pos], start.offset, start.line),
            Err(error) => {
                // The error token covers what was scanned, at least one char
                if self.pos == start_pos {
                    self.bump();
                }
                self.state = LexState::Done;
                self.error = Some(error);
                Token::new(TokenKind::Error, &self.source[start_pos..self.pos], start.offset, start.line)
            }
        };

        self.emitted += 1;
        Some(token)
    }
}

/// Lex `source` to completion
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn significant(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .filter(|t| t.kind.is_significant())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn texts(source: &str) -> Vec<String> {
        significant(source).into_iter().map(|(_, text)| text).collect()
    }

    #[test]
    fn test_lossless_lexing() {
        let sources = [
            "fun main() { val x = 1 }",
            "package a.b\n\nimport c.D\r\n/* block /* nested */ */ val s = \"hi $name ${a + b}\" // tail",
            "val r = \"\"\"raw\n$x\"\"\"\nval c = '\\n'",
            "\t x?.y ?: z && !w || 0x1F + 1.5e-3f - 10L",
        ];
        for source in sources {
            let rebuilt: String = tokenize(source).iter().map(|t| t.text.as_str()).collect();
            assert_eq!(rebuilt, source);
        }
    }

    #[test]
    fn test_lexing_is_deterministic() {
        let source = "fun f(a: Int?) = a?.plus(1) ?: 0";
        assert_eq!(tokenize(source), tokenize(source));
    }

    #[test]
    fn test_ends_with_single_eof() {
        let tokens = tokenize("val x = 1");
        assert_eq!(tokens.iter().filter(|t| t.is_eof()).count(), 1);
        assert!(tokens.last().is_some_and(|t| t.is_eof()));
        assert_eq!(tokens.last().map(|t| t.offset), Some(9));
    }

    #[test]
    fn test_operator_maximal_munch() {
        assert_eq!(
            significant("a&&b"),
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Operator, "&&".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
        assert_eq!(texts("a==b?.c?:d||e"), ["a", "==", "b", "?.", "c", "?:", "d", "||", "e", ""]);
        assert_eq!(texts("x->y != z"), ["x", "->", "y", "!=", "z", ""]);
    }

    #[test]
    fn test_minus_is_never_part_of_number() {
        assert_eq!(texts("a-1"), ["a", "-", "1", ""]);
        assert_eq!(texts("-1"), ["-", "1", ""]);
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        let tokens = significant("fun funny in inner null nullable true");
        assert_eq!(tokens[0].0, TokenKind::Keyword(Keyword::Fun));
        assert_eq!(tokens[1].0, TokenKind::Identifier);
        assert_eq!(tokens[2].0, TokenKind::Keyword(Keyword::In));
        assert_eq!(tokens[3].0, TokenKind::Identifier);
        assert_eq!(tokens[4].0, TokenKind::Literal(LiteralKind::Null));
        assert_eq!(tokens[5].0, TokenKind::Identifier);
        assert_eq!(tokens[6].0, TokenKind::Literal(LiteralKind::Boolean));
    }

    #[test]
    fn test_number_forms() {
        let kinds: Vec<_> = significant("1 1.5 1e10 2E-3 3f 10L 0xFF 1..2 1.e")
            .into_iter()
            .map(|(kind, text)| (kind, text))
            .collect();
        assert_eq!(kinds[0], (TokenKind::Literal(LiteralKind::Integer), "1".to_string()));
        assert_eq!(kinds[1], (TokenKind::Literal(LiteralKind::Float), "1.5".to_string()));
        assert_eq!(kinds[2], (TokenKind::Literal(LiteralKind::Float), "1e10".to_string()));
        assert_eq!(kinds[3], (TokenKind::Literal(LiteralKind::Float), "2E-3".to_string()));
        assert_eq!(kinds[4], (TokenKind::Literal(LiteralKind::Float), "3f".to_string()));
        assert_eq!(kinds[5], (TokenKind::Literal(LiteralKind::Integer), "10L".to_string()));
        assert_eq!(kinds[6], (TokenKind::Literal(LiteralKind::Integer), "0xFF".to_string()));
        // Range operator keeps both integers intact
        assert_eq!(kinds[7].1, "1");
        assert_eq!(kinds[8].1, "..");
        assert_eq!(kinds[9].1, "2");
        // Exponent marker without digits is not consumed
        assert_eq!(kinds[10].1, "1");
        assert_eq!(kinds[11].1, ".");
        assert_eq!(kinds[12].1, "e");
    }

    #[test]
    fn test_string_with_templates_is_one_token() {
        let tokens = significant(r#"val s = "a ${f("}")} $b""#);
        assert_eq!(tokens[3].0, TokenKind::Literal(LiteralKind::String));
        assert_eq!(tokens[3].1, r#""a ${f("}")} $b""#);
    }

    #[test]
    fn test_positions_and_lines() {
        let tokens = tokenize("val a\n  /* x\n */ b");
        let b = tokens.iter().find(|t| t.text == "b").cloned();
        assert_matches!(b, Some(Token { offset: 17, line: 3, .. }));
    }

    #[test]
    fn test_invalid_character_ends_sequence() {
        let mut lexer = Lexer::new("val x = #oops");
        let tokens: Vec<_> = lexer.by_ref().collect();
        let last = tokens.last().cloned();
        assert_matches!(last, Some(Token { kind: TokenKind::Error, offset: 8, .. }));
        assert_eq!(tokens.iter().filter(|t| t.is_error()).count(), 1);
        assert!(!tokens.iter().any(|t| t.is_eof()));
        assert_matches!(
            lexer.error(),
            Some(LexerError::InvalidCharacter { character: '#', .. })
        );
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_unterminated_string_and_comment() {
        let mut lexer = Lexer::new("val s = \"abc");
        let last = lexer.by_ref().last();
        assert_matches!(last, Some(Token { kind: TokenKind::Error, .. }));
        assert_matches!(lexer.error(), Some(LexerError::UnterminatedString { .. }));

        let mut lexer = Lexer::new("/* open /* nested */ still open");
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert_eq!(tokens.len(), 1);
        assert_matches!(lexer.error(), Some(LexerError::UnterminatedComment { .. }));
    }

    #[test]
    fn test_escape_sequences() {
        let mut lexer = Lexer::new(r#""a\n\t\"\\\$ A""#);
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert_eq!(tokens[0].kind, TokenKind::Literal(LiteralKind::String));
        assert!(lexer.error().is_none());

        let mut lexer = Lexer::new(r#""bad \q""#);
        lexer.by_ref().for_each(drop);
        assert_matches!(lexer.error(), Some(LexerError::InvalidEscape { sequence, .. }) if sequence == "\\q");
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(
            significant(r"'a' '\n'")[1].0,
            TokenKind::Literal(LiteralKind::Char)
        );
        let mut lexer = Lexer::new("'ab'");
        lexer.by_ref().for_each(drop);
        assert_matches!(lexer.error(), Some(LexerError::UnterminatedChar { .. }));
    }

    #[test]
    fn test_origin_offsets_fragments() {
        let tokens: Vec<_> = Lexer::with_origin("a + b", Position::new(40, 3, 7)).collect();
        assert_eq!(tokens[0].offset, 40);
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens.last().map(|t| t.offset), Some(45));
    }
}
