//! Structured diagnostics
//!
//! Every stage error converts into a [`Diagnostic`] so callers can branch on
//! what went wrong and where without parsing message text.

use crate::emitter::EmitError;
use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::pipeline::PipelineError;
use crate::syntax::SyntaxError;
use crate::transform::TransformError;
use crate::utils::{Position, SourceMap, Span};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    Lexical,
    Syntactic,
    Semantic,
    /// The emitter met a node it cannot print
    Emission,
    /// The source file could not be read
    Input,
    /// A worker failed outside any stage
    Internal,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Syntactic => "syntactic",
            Self::Semantic => "semantic",
            Self::Emission => "emission",
            Self::Input => "input",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

impl DiagnosticSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub code: Code,
    pub message: String,
    /// Byte offset into the source
    pub offset: usize,
    /// 1-based; 0 when the problem has no source location
    pub line: u32,
    pub column: u32,
    /// End of the offending range, for underlining
    #[serde(skip)]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, severity: DiagnosticSeverity, code: Code, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            code,
            message: message.into(),
            offset: 0,
            line: 0,
            column: 0,
            span: None,
        }
    }

    pub fn at_position(mut self, position: Position) -> Self {
        self.offset = position.offset;
        self.line = position.line;
        self.column = position.column;
        self
    }

    pub fn at_span(self, span: Span) -> Self {
        let mut diagnostic = self.at_position(span.start);
        diagnostic.span = Some(span);
        diagnostic
    }

    /// Failure outside any stage, such as a panicking worker
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            DiagnosticKind::Internal,
            DiagnosticSeverity::Error,
            codes::system::INTERNAL_ERROR,
            message,
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    pub fn has_location(&self) -> bool {
        self.line > 0
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.code.as_str())
    }

    /// Report with the offending source line and a caret underline
    pub fn render(&self, file_name: &str, source: &str) -> String {
        let mut out = format!("{}[{}]: {}\n", self.severity.as_str(), self.code, self.message);
        if !self.has_location() {
            out.push_str(&format!("  --> {}\n", file_name));
            return out;
        }
        out.push_str(&format!("  --> {}:{}:{}\n", file_name, self.line, self.column));

        let map = SourceMap::new(source.to_string());
        if let Some(text) = map.get_line(self.line) {
            let number = self.line.to_string();
            let gutter = " ".repeat(number.len());
            let width = match self.span {
                Some(span) if span.start.line == span.end.line => {
                    span.end.column.saturating_sub(span.start.column) as usize
                }
                _ => 1,
            };
            out.push_str(&format!("{} |\n", gutter));
            out.push_str(&format!("{} | {}\n", number, text));
            out.push_str(&format!(
                "{} | {}{}\n",
                gutter,
                " ".repeat(self.column.saturating_sub(1) as usize),
                "^".repeat(width.max(1))
            ));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity.as_str(), self.code, self.message)?;
        if self.has_location() {
            write!(f, " (line {}, column {})", self.line, self.column)?;
        }
        Ok(())
    }
}

impl From<&LexerError> for Diagnostic {
    fn from(error: &LexerError) -> Self {
        Diagnostic::new(
            DiagnosticKind::Lexical,
            DiagnosticSeverity::Error,
            error.error_code(),
            error.to_string(),
        )
        .at_position(error.position())
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(error: &SyntaxError) -> Self {
        // A lexical error token surfacing in the parser is still a lexical problem
        let kind = match error {
            SyntaxError::LexicalErrorToken { .. } => DiagnosticKind::Lexical,
            _ => DiagnosticKind::Syntactic,
        };
        Diagnostic::new(kind, DiagnosticSeverity::Error, error.error_code(), error.to_string())
            .at_span(error.span())
    }
}

impl From<&TransformError> for Diagnostic {
    fn from(error: &TransformError) -> Self {
        let severity = if error.is_warning() {
            DiagnosticSeverity::Warning
        } else {
            DiagnosticSeverity::Error
        };
        Diagnostic::new(DiagnosticKind::Semantic, severity, error.error_code(), error.to_string())
            .at_span(error.span())
    }
}

impl From<&EmitError> for Diagnostic {
    fn from(error: &EmitError) -> Self {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::Emission,
            DiagnosticSeverity::Error,
            error.error_code(),
            error.to_string(),
        );
        match error.span() {
            Some(span) => diagnostic.at_span(span),
            None => diagnostic,
        }
    }
}

impl From<&FileProcessorError> for Diagnostic {
    fn from(error: &FileProcessorError) -> Self {
        Diagnostic::new(
            DiagnosticKind::Input,
            DiagnosticSeverity::Error,
            error.error_code(),
            error.to_string(),
        )
    }
}

impl From<&PipelineError> for Diagnostic {
    fn from(error: &PipelineError) -> Self {
        match error {
            PipelineError::FileProcessing(inner) => Diagnostic::from(inner),
            _ => Diagnostic::new(
                DiagnosticKind::Internal,
                DiagnosticSeverity::Error,
                error.error_code(),
                error.to_string(),
            ),
        }
    }
}

macro_rules! diagnostic_from_owned {
    ($($error:ty),+) => {
        $(
            impl From<$error> for Diagnostic {
                fn from(error: $error) -> Self {
                    Diagnostic::from(&error)
                }
            }
        )+
    };
}

diagnostic_from_owned!(LexerError, SyntaxError, TransformError, EmitError, FileProcessorError, PipelineError);

/// Error and warning counts over a diagnostic list
pub fn count_by_severity(diagnostics: &[Diagnostic]) -> (usize, usize) {
    diagnostics.iter().fold((0, 0), |(errors, warnings), d| match d.severity {
        DiagnosticSeverity::Error => (errors + 1, warnings),
        DiagnosticSeverity::Warning => (errors, warnings + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_source;
    use crate::syntax::parse_source;
    use assert_matches::assert_matches;

    #[test]
    fn test_lexer_error_becomes_lexical_diagnostic() {
        let error = tokenize_source("val x = 1\nval y = #").unwrap_err();
        let diagnostic = Diagnostic::from(&error);
        assert_eq!(diagnostic.kind, DiagnosticKind::Lexical);
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code.as_str(), "E020");
        assert_eq!(diagnostic.line, 2);
        assert_eq!(diagnostic.offset, 18);
    }

    #[test]
    fn test_syntax_error_keeps_position() {
        let outcome = parse_source("fun main() { val x = ; val y = 2 }");
        assert_eq!(outcome.errors.len(), 1);
        let diagnostic = Diagnostic::from(&outcome.errors[0]);
        assert_eq!(diagnostic.kind, DiagnosticKind::Syntactic);
        assert!(diagnostic.has_location());
        assert_eq!(diagnostic.line, 1);
        assert!(diagnostic.offset > 0);
    }

    #[test]
    fn test_transform_warning_severity() {
        let warning = TransformError::TypeFallback {
            name: "x".into(),
            span: Span::dummy(),
        };
        let diagnostic = Diagnostic::from(warning);
        assert_matches!(
            diagnostic,
            Diagnostic {
                kind: DiagnosticKind::Semantic,
                severity: DiagnosticSeverity::Warning,
                ..
            }
        );
    }

    #[test]
    fn test_output_limit_has_no_location() {
        let diagnostic = Diagnostic::from(EmitError::OutputTooLarge { size: 2, limit: 1 });
        assert_eq!(diagnostic.kind, DiagnosticKind::Emission);
        assert!(!diagnostic.has_location());
        assert_eq!(diagnostic.render("A.kt", ""), "error[E121]: Generated output is 2 bytes, over the 1 byte limit\n  --> A.kt\n");
    }

    #[test]
    fn test_render_underlines_source() {
        let source = "val x = 1\nval y = #";
        let error = tokenize_source(source).unwrap_err();
        let rendered = Diagnostic::from(&error).render("Bad.kt", source);
        assert!(rendered.starts_with("error[E020]: "));
        assert!(rendered.contains("  --> Bad.kt:2:9\n"));
        assert!(rendered.contains("2 | val y = #\n"));
        assert!(rendered.ends_with("  |         ^\n"));
    }

    #[test]
    fn test_count_and_display() {
        let diagnostics = vec![
            Diagnostic::internal("worker panicked"),
            Diagnostic::from(TransformError::TypeFallback {
                name: "x".into(),
                span: Span::dummy(),
            }),
        ];
        assert_eq!(count_by_severity(&diagnostics), (1, 1));
        assert_eq!(diagnostics[0].to_string(), "error[ERR001]: worker panicked");
    }

    #[test]
    fn test_worker_panic_is_internal() {
        let diagnostic = Diagnostic::from(PipelineError::WorkerPanic {
            file: "A.kt".into(),
            message: "boom".into(),
        });
        assert_eq!(diagnostic.kind, DiagnosticKind::Internal);
        assert_eq!(diagnostic.code.as_str(), "E143");
        assert_eq!(diagnostic.message, "Transpiling A.kt panicked: boom");
    }
}
