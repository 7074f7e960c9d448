//! Reading and validating one Kotlin source file

use crate::config::compile_time::file_processing::{
    LARGE_FILE_THRESHOLD, MAX_FILE_SIZE, MAX_LINE_COUNT_FOR_ANALYSIS,
};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

pub const KOTLIN_EXTENSION: &str = "kt";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file extension: expected .kt, found {extension:?}")]
    InvalidExtension { extension: Option<String> },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File is empty: {path}")]
    EmptyFile { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid UTF-8 encoding in {path} at byte {offset}")]
    InvalidEncoding { path: String, offset: usize },

    #[error("I/O error reading file: {message}")]
    IoError { message: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },

    #[error("File exceeds maximum line count: {lines} (max: {max_lines})")]
    TooManyLines { lines: usize, max_lines: usize },
}

impl FileProcessorError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            Self::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            Self::InvalidExtension { .. } => codes::file_processing::INVALID_EXTENSION,
            Self::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            Self::EmptyFile { .. } => codes::file_processing::EMPTY_FILE,
            Self::PermissionDenied { .. } => codes::file_processing::PERMISSION_DENIED,
            Self::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            Self::IoError { .. } => codes::file_processing::IO_ERROR,
            Self::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
            Self::TooManyLines { .. } => codes::file_processing::TOO_MANY_LINES,
        }
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }

    fn from_io(error: std::io::Error, path: &Path) -> Self {
        match error.kind() {
            ErrorKind::NotFound => Self::FileNotFound {
                path: path.display().to_string(),
            },
            ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => Self::IoError {
                message: format!("{}: {}", path.display(), error),
            },
        }
    }
}

/// Facts about a source file gathered while reading it
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub line_count: usize,
    pub is_kotlin_file: bool,
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size)
    }

    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }
}

/// Decoded source plus its metadata
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: Duration,
}

impl FileProcessingResult {
    pub fn char_count(&self) -> usize {
        self.source.chars().count()
    }

    pub fn is_effectively_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

pub fn human_readable_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut scaled = size as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit < UNITS.len() - 1 {
        scaled /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.2} {}", scaled, UNITS[unit])
    }
}

/// True for paths ending in `.kt`; the suffix match is case-sensitive
pub fn is_kotlin_source(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(KOTLIN_EXTENSION)
}

/// Checks bytes already in memory the way a file read from disk is checked:
/// size, emptiness, UTF-8 and line count
pub fn decode_source<'a>(name: &str, bytes: &'a [u8]) -> Result<&'a str, FileProcessorError> {
    let size = bytes.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(FileProcessorError::FileTooLarge {
            size,
            max_size: MAX_FILE_SIZE,
        });
    }
    if bytes.is_empty() {
        return Err(FileProcessorError::EmptyFile {
            path: name.to_string(),
        });
    }
    let source = std::str::from_utf8(bytes).map_err(|e| FileProcessorError::InvalidEncoding {
        path: name.to_string(),
        offset: e.valid_up_to(),
    })?;
    let lines = source.lines().count();
    if lines > MAX_LINE_COUNT_FOR_ANALYSIS {
        return Err(FileProcessorError::TooManyLines {
            lines,
            max_lines: MAX_LINE_COUNT_FOR_ANALYSIS,
        });
    }
    Ok(source)
}

pub struct FileProcessor {
    pub require_kt_extension: bool,
    pub enable_performance_logging: bool,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self {
            require_kt_extension: true,
            enable_performance_logging: true,
        }
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            require_kt_extension: prefs.require_kt_extension,
            enable_performance_logging: prefs.enable_performance_logging,
        }
    }

    pub fn with_kt_extension_required(mut self, required: bool) -> Self {
        self.require_kt_extension = required;
        self
    }

    pub fn with_performance_logging(mut self, enabled: bool) -> Self {
        self.enable_performance_logging = enabled;
        self
    }

    pub fn max_file_size() -> u64 {
        MAX_FILE_SIZE
    }

    /// Reads `path` and returns its decoded contents with metadata
    pub fn process_file(&self, path: &Path) -> Result<FileProcessingResult, FileProcessorError> {
        let start = Instant::now();
        let display = path.display().to_string();
        log_debug!("Starting file processing", "file" => &display);

        let result = self.read_and_validate(path, start);
        match &result {
            Ok(processed) => self.log_processing_success(processed, &display),
            Err(error) => {
                log_error!(error.error_code(), "Source file rejected",
                    "file" => &display,
                    "reason" => error
                );
            }
        }
        result
    }

    fn read_and_validate(&self, path: &Path, start: Instant) -> Result<FileProcessingResult, FileProcessorError> {
        if path.as_os_str().is_empty() {
            return Err(FileProcessorError::InvalidPath {
                path: String::new(),
            });
        }

        let metadata = fs::metadata(path).map_err(|e| FileProcessorError::from_io(e, path))?;
        if !metadata.is_file() {
            return Err(FileProcessorError::InvalidPath {
                path: path.display().to_string(),
            });
        }

        let is_kotlin_file = is_kotlin_source(path);
        if self.require_kt_extension && !is_kotlin_file {
            return Err(FileProcessorError::InvalidExtension {
                extension: path.extension().map(|ext| ext.to_string_lossy().into_owned()),
            });
        }

        // Checked before reading so oversized files are never loaded
        if metadata.len() > MAX_FILE_SIZE {
            return Err(FileProcessorError::FileTooLarge {
                size: metadata.len(),
                max_size: MAX_FILE_SIZE,
            });
        }

        let bytes = fs::read(path).map_err(|e| FileProcessorError::from_io(e, path))?;
        let source = decode_source(&path.display().to_string(), &bytes)?.to_string();
        let line_count = source.lines().count();

        Ok(FileProcessingResult {
            source,
            metadata: FileMetadata {
                path: path.to_path_buf(),
                size: bytes.len() as u64,
                line_count,
                is_kotlin_file,
                modified: metadata.modified().ok(),
            },
            processing_duration: start.elapsed(),
        })
    }

    fn log_processing_success(&self, result: &FileProcessingResult, file: &str) {
        if self.enable_performance_logging {
            let duration_ms = format!("{:.2}", result.processing_duration.as_secs_f64() * 1000.0);
            log_success!(
                codes::success::FILE_PROCESSING_SUCCESS,
                "File processed",
                "file" => file,
                "size" => result.metadata.human_readable_size(),
                "lines" => result.metadata.line_count,
                "large_file" => result.metadata.is_large_file(),
                "duration_ms" => duration_ms
            );
        } else {
            log_success!(
                codes::success::FILE_PROCESSING_SUCCESS,
                "File processed",
                "file" => file,
                "lines" => result.metadata.line_count
            );
        }
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_process_valid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Hello.kt");
        let content = "fun main() {\n    println(\"hi\")\n}\n";
        fs::write(&path, content).unwrap();

        let result = FileProcessor::new().process_file(&path).unwrap();
        assert_eq!(result.source, content);
        assert_eq!(result.metadata.line_count, 3);
        assert!(result.metadata.is_kotlin_file);
        assert!(result.metadata.modified.is_some());
        assert_eq!(result.char_count(), content.chars().count());
        assert!(!result.is_effectively_empty());
    }

    #[test]
    fn test_file_not_found() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(&dir.path().join("Missing.kt"));
        assert_matches!(result, Err(FileProcessorError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new()
            .with_kt_extension_required(false)
            .process_file(dir.path());
        assert_matches!(result, Err(FileProcessorError::InvalidPath { .. }));
    }

    #[test]
    fn test_extension_requirement() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "val x = 1").unwrap();

        let strict = FileProcessor::new().process_file(&path);
        assert_matches!(
            strict,
            Err(FileProcessorError::InvalidExtension { extension: Some(ext) }) if ext == "txt"
        );

        let relaxed = FileProcessor::new()
            .with_kt_extension_required(false)
            .process_file(&path)
            .unwrap();
        assert!(!relaxed.metadata.is_kotlin_file);
    }

    #[test]
    fn test_kotlin_suffix_is_case_sensitive() {
        assert!(is_kotlin_source(Path::new("a/b/Main.kt")));
        assert!(!is_kotlin_source(Path::new("Main.KT")));
        assert!(!is_kotlin_source(Path::new("build.gradle.kts")));
        assert!(!is_kotlin_source(Path::new("kt")));
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Empty.kt");
        fs::write(&path, "").unwrap();
        let result = FileProcessor::new().process_file(&path);
        assert_matches!(result, Err(FileProcessorError::EmptyFile { .. }));
    }

    #[test]
    fn test_oversized_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Large.kt");
        fs::write(&path, "a".repeat((MAX_FILE_SIZE + 1) as usize)).unwrap();
        let result = FileProcessor::new().process_file(&path);
        assert_matches!(
            result,
            Err(FileProcessorError::FileTooLarge { size, max_size }) if size > MAX_FILE_SIZE && max_size == MAX_FILE_SIZE
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Latin1.kt");
        fs::write(&path, [b'v', b'a', b'l', b' ', 0xE9, b'\n']).unwrap();
        let result = FileProcessor::new().process_file(&path);
        assert_matches!(result, Err(FileProcessorError::InvalidEncoding { offset: 4, .. }));
    }

    #[test]
    fn test_decode_source_checks_line_count() {
        let many = "\n".repeat(MAX_LINE_COUNT_FOR_ANALYSIS + 1);
        assert_matches!(
            decode_source("Many.kt", many.as_bytes()),
            Err(FileProcessorError::TooManyLines { .. })
        );
        assert_eq!(decode_source("Ok.kt", b"val x = 1").unwrap(), "val x = 1");
    }

    #[test]
    fn test_error_metadata() {
        let error = FileProcessorError::FileNotFound {
            path: "Main.kt".to_string(),
        };
        assert_eq!(error.error_code().as_str(), "E005");
        assert_eq!(error.category(), "FileProcessing");
        assert!(!error.is_recoverable());

        let empty = FileProcessorError::EmptyFile {
            path: "Empty.kt".to_string(),
        };
        assert_eq!(empty.error_code().as_str(), "E008");
        assert!(empty.is_recoverable());
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(512), "512 B");
        assert_eq!(human_readable_size(2048), "2.00 KB");
    }
}
