//! Emitter errors

use crate::logging::{codes, Code};
use crate::utils::Span;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmitError {
    /// A Kotlin-only node survived the transformer
    #[error("Cannot render {node} as Java")]
    UnrenderableNode { node: String, span: Span },

    #[error("Generated output is {size} bytes, over the {limit} byte limit")]
    OutputTooLarge { size: usize, limit: usize },
}

impl EmitError {
    pub fn unrenderable(node: impl Into<String>, span: Span) -> Self {
        Self::UnrenderableNode {
            node: node.into(),
            span,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnrenderableNode { .. } => codes::emitter::UNRENDERABLE_NODE,
            Self::OutputTooLarge { .. } => codes::emitter::OUTPUT_TOO_LARGE,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnrenderableNode { span, .. } => Some(*span),
            Self::OutputTooLarge { .. } => None,
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_error_codes() {
        let node = EmitError::unrenderable("safe call", Span::dummy());
        assert_eq!(node.error_code().as_str(), "E120");
        assert!(node.span().is_some());
        assert!(node.to_string().contains("safe call"));

        let large = EmitError::OutputTooLarge { size: 10, limit: 5 };
        assert_eq!(large.error_code().as_str(), "E121");
        assert!(large.span().is_none());
        assert!(codes::get_error_metadata("E121").is_some());
    }
}
