//! Kotlin to Java source transpiler
//!
//! Each file goes through four stages: lexing, parsing, transformation of
//! Kotlin-only constructs and Java emission. `pipeline` drives the stages
//! over in-memory files and `batch` connects them to the filesystem.

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod file_processor;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod syntax;
pub mod tokens;
pub mod transform;
pub mod utils;

// Re-export key types for library consumers
pub use batch::{BatchConfig, BatchError, BatchResults};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
pub use pipeline::{transpile_batch, transpile_unit, DataFile, DataFiles, PipelineError, TranspilationUnit};
