//! Grammar definitions: the keyword table and the AST

pub mod ast;
pub mod keywords;

// Re-export AST types
pub use ast::nodes::*;

// Re-export keywords
pub use keywords::{is_reserved_keyword, Keyword};
