//! Consolidated diagnostic codes and classification system
//!
//! Single source of truth for every error and success code the transpiler
//! emits, together with the behavioral metadata attached to each code.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// File processing error codes
pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const EMPTY_FILE: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
    pub const TOO_MANY_LINES: Code = Code::new("E013");
}

/// Lexical analysis error codes
pub mod lexical {
    use super::Code;

    pub const INVALID_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const INVALID_ESCAPE: Code = Code::new("E025");
    pub const COMMENT_TOO_LONG: Code = Code::new("E026");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
    pub const UNTERMINATED_CHAR: Code = Code::new("E028");
    pub const TEMPLATE_NESTING_TOO_DEEP: Code = Code::new("E029");
}

/// Syntax analysis error codes
pub mod syntax {
    use super::Code;

    pub const UNMATCHED_BLOCK_DELIMITER: Code = Code::new("E042");
    pub const GRAMMAR_VIOLATION: Code = Code::new("E043");
    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const UNEXPECTED_END_OF_INPUT: Code = Code::new("E051");
    pub const INTERNAL_PARSER_ERROR: Code = Code::new("E086");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E087");
}

/// Semantic transformation codes
pub mod transform {
    use super::Code;

    pub const UNSUPPORTED_CONSTRUCT: Code = Code::new("E100");
    pub const TYPE_INFERENCE_FALLBACK: Code = Code::new("W101");
    pub const MAX_TRANSFORM_DEPTH: Code = Code::new("E102");
    pub const DIAGNOSTIC_LIMIT_REACHED: Code = Code::new("W103");
}

/// Java emission error codes
pub mod emitter {
    use super::Code;

    pub const UNRENDERABLE_NODE: Code = Code::new("E120");
    pub const OUTPUT_TOO_LARGE: Code = Code::new("E121");
}

/// Batch driver and output writing error codes
pub mod batch {
    use super::Code;

    pub const DIRECTORY_NOT_FOUND: Code = Code::new("E140");
    pub const OUTPUT_WRITE_FAILED: Code = Code::new("E141");
    pub const TOO_MANY_FILES: Code = Code::new("E142");
    pub const WORKER_FAILURE: Code = Code::new("E143");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    // General success codes
    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");

    // File processing success codes
    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const FILE_DISCOVERY_COMPLETE: Code = Code::new("I007");

    // Stage success codes
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const AST_CONSTRUCTION_COMPLETE: Code = Code::new("I040");
    pub const TRANSFORMATION_COMPLETE: Code = Code::new("I060");
    pub const EMISSION_COMPLETE: Code = Code::new("I070");

    // Driver success codes
    pub const TRANSPILATION_COMPLETE: Code = Code::new("I080");
    pub const OUTPUT_WRITTEN: Code = Code::new("I081");
    pub const BATCH_COMPLETE: Code = Code::new("I082");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

/// Code metadata registry using OnceLock for thread safety
static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn register(registry: &mut HashMap<&'static str, ErrorMetadata>, metadata: ErrorMetadata) {
    registry.insert(metadata.code, metadata);
}

/// Initialize and get the code registry
#[rustfmt::skip]
fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        use Severity::*;

        let mut registry = HashMap::new();
        let r = &mut registry;

        // System errors
        register(r, ErrorMetadata::new(
            "ERR001", "System", Critical, false, true,
            "Critical internal transpiler error",
            "File a bug report with the input that triggered it",
        ));
        register(r, ErrorMetadata::new(
            "ERR002", "System", Critical, false, true,
            "System initialization failure",
            "Check build configuration and environment variables",
        ));

        // File processing errors
        register(r, ErrorMetadata::new(
            "E005", "FileProcessing", High, false, false,
            "Source file not found",
            "Verify the file path exists and is accessible",
        ));
        register(r, ErrorMetadata::new(
            "E006", "FileProcessing", Medium, true, false,
            "Source file does not have a .kt extension",
            "Rename the file with a .kt extension or disable the extension check",
        ));
        register(r, ErrorMetadata::new(
            "E007", "FileProcessing", High, false, false,
            "Source file exceeds the configured size limit",
            "Split the file or raise max_file_size in the build profile",
        ));
        register(r, ErrorMetadata::new(
            "E008", "FileProcessing", Low, true, false,
            "Source file is empty",
            "Add Kotlin declarations or remove the file from the input folder",
        ));
        register(r, ErrorMetadata::new(
            "E009", "FileProcessing", High, false, false,
            "Permission denied reading source file",
            "Check file permissions",
        ));
        register(r, ErrorMetadata::new(
            "E010", "FileProcessing", High, false, false,
            "Source file is not valid UTF-8",
            "Re-encode the file as UTF-8",
        ));
        register(r, ErrorMetadata::new(
            "E011", "FileProcessing", High, false, false,
            "I/O error while reading source file",
            "Check disk health and file system state",
        ));
        register(r, ErrorMetadata::new(
            "E012", "FileProcessing", Medium, false, false,
            "Invalid source path",
            "Provide a path to a regular file",
        ));
        register(r, ErrorMetadata::new(
            "E013", "FileProcessing", Medium, false, false,
            "Source file exceeds the configured line count",
            "Split the file or raise max_line_count_for_analysis",
        ));

        // Lexical errors
        register(r, ErrorMetadata::new(
            "E020", "Lexical", High, false, false,
            "Character not valid in Kotlin source",
            "Remove or escape the offending character",
        ));
        register(r, ErrorMetadata::new(
            "E021", "Lexical", High, false, false,
            "String literal is not terminated",
            "Add the closing double quote",
        ));
        register(r, ErrorMetadata::new(
            "E022", "Lexical", High, false, false,
            "Block comment is not terminated",
            "Close every /* with a matching */",
        ));
        register(r, ErrorMetadata::new(
            "E023", "Lexical", Medium, false, false,
            "Identifier exceeds the configured length limit",
            "Shorten the identifier",
        ));
        register(r, ErrorMetadata::new(
            "E024", "Lexical", Medium, false, false,
            "String literal exceeds the configured size limit",
            "Move large text into a resource file",
        ));
        register(r, ErrorMetadata::new(
            "E025", "Lexical", High, false, false,
            "Unknown escape sequence in literal",
            "Use one of \\n \\t \\r \\b \\' \\\" \\\\ \\$ or \\uXXXX",
        ));
        register(r, ErrorMetadata::new(
            "E026", "Lexical", Medium, false, false,
            "Comment exceeds the configured length limit",
            "Shorten the comment",
        ));
        register(r, ErrorMetadata::new(
            "E027", "Lexical", High, false, false,
            "Token count exceeds the configured limit",
            "Split the file into smaller compilation units",
        ));
        register(r, ErrorMetadata::new(
            "E028", "Lexical", High, false, false,
            "Character literal is not terminated",
            "Add the closing single quote",
        ));
        register(r, ErrorMetadata::new(
            "E029", "Lexical", High, false, false,
            "String template expressions are nested too deeply",
            "Extract inner template expressions into local variables",
        ));

        // Syntax errors
        register(r, ErrorMetadata::new(
            "E042", "Syntax", High, false, false,
            "Unbalanced block delimiter",
            "Check that every { ( [ has a matching closer",
        ));
        register(r, ErrorMetadata::new(
            "E043", "Syntax", Medium, true, false,
            "Construct violates the supported grammar",
            "Rewrite the statement using supported syntax",
        ));
        register(r, ErrorMetadata::new(
            "E050", "Syntax", Medium, true, false,
            "Unexpected token",
            "Check the statement near the reported position",
        ));
        register(r, ErrorMetadata::new(
            "E051", "Syntax", High, false, false,
            "Unexpected end of input",
            "The file ends in the middle of a construct",
        ));
        register(r, ErrorMetadata::new(
            "E086", "Syntax", Critical, false, true,
            "Internal parser error",
            "File a bug report with the input that triggered it",
        ));
        register(r, ErrorMetadata::new(
            "E087", "Syntax", High, false, false,
            "Maximum nesting depth exceeded",
            "Reduce expression or block nesting",
        ));

        // Transform diagnostics
        register(r, ErrorMetadata::new(
            "E100", "Semantic", Medium, true, false,
            "Kotlin construct has no faithful Java equivalent",
            "Review the /* TODO */ marker in the generated Java",
        ));
        register(r, ErrorMetadata::new(
            "W101", "Semantic", Low, true, false,
            "Type could not be inferred and defaulted to Object",
            "Add an explicit type annotation",
        ));
        register(r, ErrorMetadata::new(
            "E102", "Semantic", High, false, false,
            "Maximum transformation depth exceeded",
            "Reduce nesting in the source file",
        ));
        register(r, ErrorMetadata::new(
            "W103", "Semantic", Low, true, false,
            "Diagnostic limit reached; further diagnostics suppressed",
            "Fix the reported problems and rerun",
        ));

        // Emitter errors
        register(r, ErrorMetadata::new(
            "E120", "Emitter", Critical, false, true,
            "Kotlin-only node reached the Java emitter",
            "File a bug report; the transformer missed a rewrite",
        ));
        register(r, ErrorMetadata::new(
            "E121", "Emitter", High, false, false,
            "Generated Java exceeds the configured output size",
            "Split the source file or raise max_output_size",
        ));

        // Batch errors
        register(r, ErrorMetadata::new(
            "E140", "Batch", High, false, true,
            "Input directory not found",
            "Pass an existing directory to -convert",
        ));
        register(r, ErrorMetadata::new(
            "E141", "Batch", High, false, false,
            "Failed to write generated Java file",
            "Check permissions and free space in the output directory",
        ));
        register(r, ErrorMetadata::new(
            "E142", "Batch", Medium, true, false,
            "Too many files in one batch",
            "Convert subdirectories separately or raise max_files_per_batch",
        ));
        register(r, ErrorMetadata::new(
            "E143", "Batch", Critical, false, false,
            "A transpilation worker terminated unexpectedly",
            "File a bug report with the input that triggered it",
        ));

        // Success codes
        register(r, ErrorMetadata::new(
            "I001", "General", Low, true, false,
            "Operation completed successfully", "None",
        ));
        register(r, ErrorMetadata::new(
            "I004", "System", Low, true, false,
            "System initialization completed", "None",
        ));
        register(r, ErrorMetadata::new(
            "I006", "FileProcessing", Low, true, false,
            "Source file read and validated", "Continue to lexical analysis",
        ));
        register(r, ErrorMetadata::new(
            "I007", "Batch", Low, true, false,
            "Source discovery completed", "Continue to transpilation",
        ));
        register(r, ErrorMetadata::new(
            "I020", "Lexical", Low, true, false,
            "Tokenization completed", "Continue to parsing",
        ));
        register(r, ErrorMetadata::new(
            "I040", "Syntax", Low, true, false,
            "AST construction completed", "Continue to transformation",
        ));
        register(r, ErrorMetadata::new(
            "I060", "Semantic", Low, true, false,
            "Transformation completed", "Continue to emission",
        ));
        register(r, ErrorMetadata::new(
            "I070", "Emitter", Low, true, false,
            "Java emission completed", "None",
        ));
        register(r, ErrorMetadata::new(
            "I080", "Pipeline", Low, true, false,
            "Transpilation unit completed", "None",
        ));
        register(r, ErrorMetadata::new(
            "I081", "Batch", Low, true, false,
            "Generated Java file written", "None",
        ));
        register(r, ErrorMetadata::new(
            "I082", "Batch", Low, true, false,
            "Batch conversion completed", "None",
        ));

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Get human-readable description for code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Get recommended action for code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Get category from code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

/// Verify that every code in `codes` has registered metadata
pub fn ensure_registered(codes: &[Code]) -> Result<(), String> {
    for code in codes {
        if get_error_metadata(code.as_str()).is_none() {
            return Err(format!("Code {} not found in metadata registry", code));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_stage_codes() {
        let all = [
            system::INTERNAL_ERROR,
            file_processing::FILE_NOT_FOUND,
            lexical::INVALID_CHARACTER,
            lexical::UNTERMINATED_COMMENT,
            syntax::UNEXPECTED_TOKEN,
            syntax::UNMATCHED_BLOCK_DELIMITER,
            transform::UNSUPPORTED_CONSTRUCT,
            emitter::UNRENDERABLE_NODE,
            batch::OUTPUT_WRITE_FAILED,
            success::TRANSPILATION_COMPLETE,
        ];
        assert!(ensure_registered(&all).is_ok());
    }

    #[test]
    fn test_unknown_code_defaults() {
        assert_eq!(get_description("X999"), "Unknown error");
        assert_eq!(get_category("X999"), "Unknown");
        assert_eq!(get_severity("X999"), Severity::Medium);
        assert!(is_recoverable("X999"));
        assert!(!requires_halt("X999"));
        assert!(ensure_registered(&[Code::new("X999")]).is_err());
    }

    #[test]
    fn test_classification() {
        assert_eq!(get_category("E020"), "Lexical");
        assert_eq!(get_category("E050"), "Syntax");
        assert_eq!(get_category("E100"), "Semantic");
        assert!(is_recoverable("E100"));
        assert!(requires_halt("ERR001"));
        assert_eq!(get_severity("W101"), Severity::Low);
    }
}
