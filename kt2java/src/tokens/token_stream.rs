//! Parser cursor over significant tokens
//!
//! Pulls tokens lazily from any token iterator, drops trivia but remembers
//! whether a newline preceded each significant token so the parser can find
//! statement boundaries. Consumed tokens stay buffered for checkpoints.

use crate::config::compile_time::syntax::MAX_LOOKAHEAD_TOKENS;
use crate::tokens::token::{Token, TokenKind};
use crate::utils::{Position, Span};

/// A significant token plus the trivia facts the parser needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamToken {
    pub token: Token,
    /// A newline token appeared between the previous significant token and this one
    pub newline_before: bool,
    /// Column of the token's first character (1-based)
    pub column: u32,
}

impl StreamToken {
    pub fn span(&self) -> Span {
        let start = Position::new(self.token.offset, self.token.line, self.column);
        let end = start.advance_str(&self.token.text);
        Span::new(start, end)
    }
}

/// Saved cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

pub struct TokenStream<'a> {
    source: Box<dyn Iterator<Item = Token> + 'a>,
    buffer: Vec<StreamToken>,
    position: usize,
    exhausted: bool,
    /// Position just past the last token pulled, trivia included
    cursor: Position,
    pending_newline: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Token>,
        I::IntoIter: 'a,
    {
        Self {
            source: Box::new(tokens.into_iter()),
            buffer: Vec::new(),
            position: 0,
            exhausted: false,
            cursor: Position::start(),
            pending_newline: false,
        }
    }

    /// Pull from the source until `index` is buffered or input ends
    fn fill_to(&mut self, index: usize) {
        while self.buffer.len() <= index && !self.exhausted {
            match self.source.next() {
                Some(token) => self.accept(token),
                None => {
                    // Sources without an explicit EOF still end in one
                    let (offset, line) = self
                        .buffer
                        .last()
                        .map(|t| (t.token.end_offset(), t.token.line))
                        .unwrap_or((0, 1));
                    self.accept(Token::eof(offset, line));
                }
            }
        }
    }

    fn accept(&mut self, token: Token) {
        let start = self.cursor;
        self.cursor = start.advance_str(&token.text);

        match token.kind {
            TokenKind::Newline => self.pending_newline = true,
            TokenKind::Whitespace => {}
            // Block comments may span lines
            TokenKind::Comment => self.pending_newline |= token.text.contains('\n'),
            kind => {
                self.exhausted = kind.is_terminal();
                self.buffer.push(StreamToken {
                    token,
                    newline_before: self.pending_newline,
                    column: start.column,
                });
                self.pending_newline = false;
            }
        }
    }

    // === CORE NAVIGATION ===

    /// Current significant token; at end of input this is the terminal token
    pub fn current(&mut self) -> &StreamToken {
        self.peek_ahead(0)
    }

    pub fn current_token(&mut self) -> &Token {
        &self.current().token
    }

    pub fn current_span(&mut self) -> Span {
        self.current().span()
    }

    /// Peek `n` tokens past the current one, clamped to the lookahead limit
    pub fn peek_ahead(&mut self, n: usize) -> &StreamToken {
        let index = self.position + n.min(MAX_LOOKAHEAD_TOKENS);
        self.fill_to(index);
        let last = self.buffer.len() - 1;
        &self.buffer[index.min(last)]
    }

    pub fn peek(&mut self) -> &StreamToken {
        self.peek_ahead(1)
    }

    /// Consume and return the current token; never moves past the terminal token
    pub fn advance(&mut self) -> StreamToken {
        let current = self.current().clone();
        if !current.token.kind.is_terminal() {
            self.position += 1;
        }
        current
    }

    /// Consume the current token if `predicate` accepts it
    pub fn advance_if<F>(&mut self, predicate: F) -> Option<StreamToken>
    where
        F: FnOnce(&Token) -> bool,
    {
        if predicate(self.current_token()) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume the current token if it is the operator or delimiter `text`
    pub fn eat_punct(&mut self, text: &str) -> bool {
        self.advance_if(|t| t.is_punct(text)).is_some()
    }

    pub fn check_punct(&mut self, text: &str) -> bool {
        self.current_token().is_punct(text)
    }

    pub fn is_at_end(&mut self) -> bool {
        self.current_token().kind.is_terminal()
    }

    /// The current token starts a new source line
    pub fn at_line_start(&mut self) -> bool {
        self.current().newline_before
    }

    /// Span of the most recently consumed token
    pub fn previous_span(&mut self) -> Span {
        if self.position == 0 {
            return self.current_span();
        }
        self.buffer[self.position - 1].span()
    }

    // === CHECKPOINTS ===

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.position)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.0.min(self.buffer.len());
    }

    /// Number of significant tokens consumed so far
    pub fn position(&self) -> usize {
        self.position
    }
}

impl std::fmt::Debug for TokenStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStream")
            .field("buffered", &self.buffer.len())
            .field("position", &self.position)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::Lexer;

    #[test]
    fn test_trivia_is_skipped() {
        let mut stream = TokenStream::new(Lexer::new("val  x // c\n= 1"));
        assert_eq!(stream.advance().token.text, "val");
        assert_eq!(stream.advance().token.text, "x");
        let eq = stream.advance();
        assert_eq!(eq.token.text, "=");
        assert!(eq.newline_before);
        assert_eq!(eq.column, 1);
        assert_eq!(stream.advance().token.text, "1");
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let mut stream = TokenStream::new(Lexer::new("a"));
        stream.advance();
        assert!(stream.advance().token.is_eof());
        assert!(stream.advance().token.is_eof());
    }

    #[test]
    fn test_missing_eof_is_synthesized() {
        let tokens = vec![Token::new(TokenKind::Identifier, "x", 0, 1)];
        let mut stream = TokenStream::new(tokens);
        stream.advance();
        assert!(stream.current_token().is_eof());
        assert_eq!(stream.current_token().offset, 1);
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut stream = TokenStream::new(Lexer::new("a b c"));
        let saved = stream.checkpoint();
        stream.advance();
        stream.advance();
        assert_eq!(stream.current_token().text, "c");
        stream.restore(saved);
        assert_eq!(stream.current_token().text, "a");
    }

    #[test]
    fn test_peek_ahead_past_end() {
        let mut stream = TokenStream::new(Lexer::new("a"));
        assert!(stream.peek_ahead(5).token.is_eof());
        assert_eq!(stream.peek_ahead(0).token.text, "a");
    }

    #[test]
    fn test_columns_and_spans() {
        let mut stream = TokenStream::new(Lexer::new("fun  main"));
        stream.advance();
        let main = stream.current().clone();
        assert_eq!(main.column, 6);
        assert_eq!(main.span().start().offset, 5);
        assert_eq!(main.span().end().offset, 9);
    }
}
