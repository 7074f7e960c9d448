use super::data::DataFile;
use crate::diagnostics::{count_by_severity, Diagnostic};
use crate::grammar::ast::nodes::Program;
use crate::lexical::LexicalMetrics;
use crate::logging::codes;
use crate::tokens::Token;
use std::path::Path;
use std::time::Duration;

/// How far a unit got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Java was generated and nothing went wrong
    Succeeded,
    /// Java was generated but contains placeholders for unsupported constructs
    Partial,
    /// No Java was generated
    Failed,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "ok",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// One input file's state across every stage
#[derive(Debug, Clone)]
pub struct TranspilationUnit {
    pub name: String,
    pub source: Vec<u8>,
    pub tokens: Vec<Token>,
    pub lexical_metrics: Option<LexicalMetrics>,
    /// Parsed tree; present after recovered syntax errors too
    pub ast: Option<Program>,
    pub transformed: Option<Program>,
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub holder_class: String,
    pub duration: Duration,
}

impl TranspilationUnit {
    pub fn new(name: impl Into<String>, source: Vec<u8>, holder_class: String) -> Self {
        Self {
            name: name.into(),
            source,
            tokens: Vec::new(),
            lexical_metrics: None,
            ast: None,
            transformed: None,
            output: None,
            diagnostics: Vec::new(),
            holder_class,
            duration: Duration::ZERO,
        }
    }

    /// A unit that never reached the lexer
    pub fn failed(name: impl Into<String>, diagnostic: Diagnostic) -> Self {
        let mut unit = Self::new(name, Vec::new(), String::new());
        unit.diagnostics.push(diagnostic);
        unit
    }

    pub fn source_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.source).ok()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        count_by_severity(&self.diagnostics).0
    }

    pub fn warning_count(&self) -> usize {
        count_by_severity(&self.diagnostics).1
    }

    pub fn status(&self) -> UnitStatus {
        match (&self.output, self.has_errors()) {
            (None, _) => UnitStatus::Failed,
            (Some(_), true) => UnitStatus::Partial,
            (Some(_), false) => UnitStatus::Succeeded,
        }
    }

    /// Relative name of the generated file: the input's directory plus
    /// `<HolderClass>.java`
    pub fn output_name(&self) -> String {
        let parent = Path::new(&self.name)
            .parent()
            .map(super::data::relative_name)
            .unwrap_or_default();
        if parent.is_empty() {
            format!("{}.java", self.holder_class)
        } else {
            format!("{}/{}.java", parent, self.holder_class)
        }
    }

    pub fn output_file(&self) -> Option<DataFile> {
        self.output
            .as_ref()
            .map(|text| DataFile::new(self.output_name(), text.as_bytes()))
    }

    /// Every diagnostic rendered against the unit's own source
    pub fn report(&self) -> String {
        let source = self.source_text().unwrap_or_default();
        self.diagnostics
            .iter()
            .map(|diagnostic| diagnostic.render(&self.name, source))
            .collect()
    }

    pub(crate) fn log_completion(&self) {
        crate::log_success!(
            codes::success::TRANSPILATION_COMPLETE,
            "Transpilation finished",
            "file" => &self.name,
            "status" => self.status().as_str(),
            "tokens" => self.tokens.len(),
            "errors" => self.error_count(),
            "warnings" => self.warning_count(),
            "duration_ms" => format!("{:.2}", self.duration.as_secs_f64() * 1000.0)
        );
    }
}
