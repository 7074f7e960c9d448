//! Shared source-location types used by every pipeline stage

pub mod span;

pub use span::{Position, SourceMap, Span};
