//! Token model and the parser's token cursor
//!
//! - [`Token`] / [`TokenKind`] / [`LiteralKind`]: lexemes with exact source text
//! - [`TokenStream`]: lazy cursor over significant tokens with checkpoints

pub mod token;
pub mod token_stream;

pub use token::{LiteralKind, Token, TokenKind};
pub use token_stream::{Checkpoint, StreamToken, TokenStream};
