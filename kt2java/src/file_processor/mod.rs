//! Source file intake
//!
//! Reads one file from disk and checks it against the compile-time limits
//! before any pipeline stage sees it.

mod processor;

use crate::config::compile_time::file_processing::{LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT_FOR_ANALYSIS};
use crate::config::runtime::FileProcessorPreferences;
use crate::log_debug;
use crate::logging::codes;
use std::path::Path;

pub use processor::{
    decode_source, human_readable_size, is_kotlin_source, FileMetadata, FileProcessingResult, FileProcessor,
    FileProcessorError, KOTLIN_EXTENSION,
};

/// Process a file with preferences from the environment
pub fn process_file(path: impl AsRef<Path>) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::from_preferences(&FileProcessorPreferences::default()).process_file(path.as_ref())
}

pub fn create_processor_from_preferences(prefs: &FileProcessorPreferences) -> FileProcessor {
    FileProcessor::from_preferences(prefs)
}

/// Check that every file processing code is registered
pub fn init_file_processor_logging() -> Result<(), String> {
    codes::ensure_registered(&[
        codes::file_processing::FILE_NOT_FOUND,
        codes::file_processing::INVALID_EXTENSION,
        codes::file_processing::FILE_TOO_LARGE,
        codes::file_processing::EMPTY_FILE,
        codes::file_processing::PERMISSION_DENIED,
        codes::file_processing::INVALID_ENCODING,
        codes::file_processing::IO_ERROR,
        codes::file_processing::INVALID_PATH,
        codes::file_processing::TOO_MANY_LINES,
    ])?;

    log_debug!("File processor limits loaded",
        "max_file_size" => MAX_FILE_SIZE,
        "large_file_threshold" => LARGE_FILE_THRESHOLD,
        "max_line_count" => MAX_LINE_COUNT_FOR_ANALYSIS
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_module_api() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Main.kt");
        fs::write(&path, "fun main() {}\n").unwrap();
        let result = process_file(&path).unwrap();
        assert_eq!(result.metadata.line_count, 1);
    }

    #[test]
    fn test_processor_from_preferences() {
        let prefs = FileProcessorPreferences {
            require_kt_extension: false,
            enable_performance_logging: false,
        };
        let processor = create_processor_from_preferences(&prefs);
        assert!(!processor.require_kt_extension);
        assert!(!processor.enable_performance_logging);
        assert_eq!(FileProcessor::max_file_size(), MAX_FILE_SIZE);
    }

    #[test]
    fn test_init_logging() {
        assert!(init_file_processor_logging().is_ok());
    }
}
