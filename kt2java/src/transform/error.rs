//! Transform diagnostics
//!
//! None of these stop the transformation: the offending subtree is replaced
//! with a placeholder and the walk continues.

use crate::logging::{codes, Code};
use crate::utils::Span;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String, span: Span },

    #[error("Cannot infer a Java type for '{name}'; using Object")]
    TypeFallback { name: String, span: Span },

    #[error("Maximum transform depth exceeded")]
    MaxDepth { span: Span },

    #[error("Too many transform diagnostics (limit {limit}); further issues suppressed")]
    DiagnosticLimit { limit: usize, span: Span },
}

impl TransformError {
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        Self::UnsupportedConstruct {
            construct: construct.into(),
            span,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnsupportedConstruct { .. } => codes::transform::UNSUPPORTED_CONSTRUCT,
            Self::TypeFallback { .. } => codes::transform::TYPE_INFERENCE_FALLBACK,
            Self::MaxDepth { .. } => codes::transform::MAX_TRANSFORM_DEPTH,
            Self::DiagnosticLimit { .. } => codes::transform::DIAGNOSTIC_LIMIT_REACHED,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnsupportedConstruct { span, .. }
            | Self::TypeFallback { span, .. }
            | Self::MaxDepth { span }
            | Self::DiagnosticLimit { span, .. } => *span,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::TypeFallback { .. } | Self::DiagnosticLimit { .. })
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_severity() {
        let span = Span::dummy();
        let unsupported = TransformError::unsupported("scope function 'let'", span);
        assert_eq!(unsupported.error_code().as_str(), "E100");
        assert!(!unsupported.is_warning());
        assert!(unsupported.to_string().contains("'let'"));

        let fallback = TransformError::TypeFallback {
            name: "x".into(),
            span,
        };
        assert_eq!(fallback.error_code().as_str(), "W101");
        assert!(fallback.is_warning());

        assert_eq!(TransformError::MaxDepth { span }.error_code().as_str(), "E102");
    }

    #[test]
    fn test_codes_registered() {
        let span = Span::dummy();
        let issues = [
            TransformError::unsupported("x", span),
            TransformError::MaxDepth { span },
            TransformError::DiagnosticLimit { limit: 1, span },
        ];
        for issue in issues {
            assert!(codes::get_error_metadata(issue.error_code().as_str()).is_some());
        }
    }
}
