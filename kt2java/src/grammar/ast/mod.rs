//! Abstract syntax tree

pub mod nodes;

pub use nodes::*;
