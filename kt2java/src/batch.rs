//! Directory conversion
//!
//! Finds `.kt` files under an input directory, runs them through the
//! pipeline and writes the generated Java under an output directory with the
//! same relative layout. Problems with individual files become diagnostics
//! on that file's unit; only problems with the directories themselves stop a
//! batch.

use crate::config::compile_time::batch_processing::MAX_FILES_PER_BATCH;
use crate::config::runtime::{BatchPreferences, FileProcessorPreferences};
use crate::diagnostics::Diagnostic;
use crate::file_processor::{is_kotlin_source, FileProcessor};
use crate::logging::{self, codes, Code};
use crate::pipeline::{self, DataFile, DataFiles, PipelineError, PipelineOptions, TranspilationUnit, UnitStatus};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ============================================================================
// BATCH PROCESSING TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 0 picks the available parallelism
    pub max_threads: usize,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    pub pipeline: PipelineOptions,
    pub file_processor: FileProcessorPreferences,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from_preferences(&BatchPreferences::default())
    }
}

impl BatchConfig {
    pub fn from_preferences(prefs: &BatchPreferences) -> Self {
        Self {
            max_threads: prefs.worker_threads,
            max_files: None,
            progress_reporting: prefs.progress_reporting,
            pipeline: PipelineOptions::default(),
            file_processor: FileProcessorPreferences::default(),
        }
    }

    pub fn sequential(mut self) -> Self {
        self.max_threads = 1;
        self
    }

    fn pipeline_options(&self) -> PipelineOptions {
        self.pipeline.clone().with_worker_threads(self.max_threads)
    }
}

/// Outcome of converting one directory
#[derive(Debug, Default)]
pub struct BatchResults {
    /// One unit per discovered file, in scan order
    pub units: Vec<TranspilationUnit>,
    pub written_files: Vec<PathBuf>,
    pub write_failures: Vec<BatchError>,
    pub files_discovered: usize,
    pub processing_duration: Duration,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_processed(&self) -> usize {
        self.units.len()
    }

    pub fn count_with_status(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|unit| unit.status() == status).count()
    }

    pub fn success_count(&self) -> usize {
        self.count_with_status(UnitStatus::Succeeded)
    }

    pub fn partial_count(&self) -> usize {
        self.count_with_status(UnitStatus::Partial)
    }

    pub fn failure_count(&self) -> usize {
        self.count_with_status(UnitStatus::Failed)
    }

    pub fn error_count(&self) -> usize {
        self.units.iter().map(TranspilationUnit::error_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.units.iter().map(TranspilationUnit::warning_count).sum()
    }

    /// True when any unit produced an error diagnostic or an output failed
    /// to be written
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0 || !self.write_failures.is_empty()
    }

    pub fn success_rate(&self) -> f64 {
        if self.units.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.units.len() as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Converted {} files: {} ok, {} partial, {} failed, {} written ({:.1}% clean), {:.2}s total",
            self.files_processed(),
            self.success_count(),
            self.partial_count(),
            self.failure_count(),
            self.written_files.len(),
            self.success_rate() * 100.0,
            self.processing_duration.as_secs_f64()
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Could not write {path}: {message}")]
    OutputWriteFailed { path: String, message: String },

    #[error("Too many files found: {count} (max: {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("IO error during directory traversal of {path}: {message}")]
    IoError { path: String, message: String },
}

impl BatchError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DirectoryNotFound { .. } => codes::batch::DIRECTORY_NOT_FOUND,
            Self::OutputWriteFailed { .. } => codes::batch::OUTPUT_WRITE_FAILED,
            Self::TooManyFiles { .. } => codes::batch::TOO_MANY_FILES,
            Self::IoError { .. } => codes::file_processing::IO_ERROR,
        }
    }

    fn io(path: &Path, error: std::io::Error) -> Self {
        if error.kind() == ErrorKind::NotFound {
            Self::DirectoryNotFound {
                path: path.display().to_string(),
            }
        } else {
            Self::IoError {
                path: path.display().to_string(),
                message: error.to_string(),
            }
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Every `.kt` file under `root`, sorted by path
///
/// Subdirectories are searched recursively; symlinked directories are not
/// followed. When `max_files` is given the sorted list is cut to that length.
pub fn scan_kotlin_files(root: &Path, max_files: Option<usize>) -> Result<Vec<PathBuf>, BatchError> {
    crate::log_info!("Starting file discovery", "directory" => root.display());

    if !root.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: root.display().to_string(),
        });
    }

    let mut files = Vec::new();
    visit_directory(root, &mut files)?;
    files.sort();

    if files.len() > MAX_FILES_PER_BATCH {
        return Err(BatchError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES_PER_BATCH,
        });
    }

    if let Some(max_files) = max_files {
        if files.len() > max_files {
            crate::log_warning!(
                "Reached maximum file limit",
                "files_found" => files.len(),
                "limit" => max_files
            );
            files.truncate(max_files);
        }
    }

    crate::log_success!(
        codes::success::FILE_DISCOVERY_COMPLETE,
        "File discovery completed",
        "files_found" => files.len(),
        "directory" => root.display()
    );

    Ok(files)
}

fn visit_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), BatchError> {
    let entries = fs::read_dir(dir).map_err(|e| BatchError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| BatchError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| BatchError::io(dir, e))?;
        let path = entry.path();

        if file_type.is_dir() {
            visit_directory(&path, files)?;
        } else if is_kotlin_source(&path) && (file_type.is_file() || path.is_file()) {
            files.push(path);
        }
    }

    Ok(())
}

/// Read scanned files into memory
///
/// Files that cannot be read become failed units instead of inputs, so one
/// unreadable file never stops the others.
pub fn load_kotlin_files(
    root: &Path,
    paths: &[PathBuf],
    prefs: &FileProcessorPreferences,
) -> (DataFiles, Vec<TranspilationUnit>) {
    let processor = FileProcessor::from_preferences(prefs);
    let mut inputs = DataFiles::new();
    let mut unreadable = Vec::new();

    for (file_id, path) in paths.iter().enumerate() {
        let name = DataFile::from_path(root, path, Vec::new()).name;
        let processed = logging::with_file_context(PathBuf::from(&name), file_id, || processor.process_file(path));
        match processed {
            Ok(processed) => inputs.push(DataFile::new(name, processed.source)),
            Err(error) => {
                let diagnostic = Diagnostic::from(PipelineError::from(error));
                unreadable.push(TranspilationUnit::failed(name, diagnostic));
            }
        }
    }

    (inputs, unreadable)
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Write each output under `out_root`, creating directories as needed
///
/// Returns the written paths and the failures; a failure on one file does
/// not stop the rest.
pub fn write_java_files(out_root: &Path, outputs: &DataFiles) -> (Vec<PathBuf>, Vec<BatchError>) {
    let mut written = Vec::new();
    let mut failures = Vec::new();

    for output in outputs {
        match write_one(out_root, output) {
            Ok(path) => {
                crate::log_success!(
                    codes::success::OUTPUT_WRITTEN,
                    "Java file written",
                    "file" => path.display(),
                    "bytes" => output.size()
                );
                written.push(path);
            }
            Err(error) => {
                crate::log_error!(error.error_code(), "Output not written",
                    "file" => &output.name,
                    "reason" => &error
                );
                failures.push(error);
            }
        }
    }

    (written, failures)
}

fn write_one(out_root: &Path, output: &DataFile) -> Result<PathBuf, BatchError> {
    let write_failed = |path: &Path, message: String| BatchError::OutputWriteFailed {
        path: path.display().to_string(),
        message,
    };

    let relative = output
        .relative_path()
        .ok_or_else(|| write_failed(Path::new(&output.name), "name escapes the output directory".to_string()))?;
    let path = out_root.join(relative);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_failed(parent, e.to_string()))?;
    }
    fs::write(&path, &output.content).map_err(|e| write_failed(&path, e.to_string()))?;
    Ok(path)
}

// ============================================================================
// CONVERSION
// ============================================================================

/// Scan `input`, transpile every Kotlin file and write the results under
/// `output`
pub fn convert_directory(input: &Path, output: &Path, config: &BatchConfig) -> Result<BatchResults, BatchError> {
    let start = Instant::now();
    crate::log_info!("Starting directory conversion",
        "input" => input.display(),
        "output" => output.display(),
        "threads" => config.max_threads
    );

    let paths = scan_kotlin_files(input, config.max_files)?;
    let (inputs, unreadable) = load_kotlin_files(input, &paths, &config.file_processor);

    let mut units = pipeline::transpile_batch(&inputs, &config.pipeline_options());
    units.extend(unreadable);
    units.sort_by(|a, b| a.name.cmp(&b.name));

    let outputs: DataFiles = units.iter().filter_map(TranspilationUnit::output_file).collect();
    if !outputs.is_empty() {
        fs::create_dir_all(output).map_err(|e| BatchError::OutputWriteFailed {
            path: output.display().to_string(),
            message: e.to_string(),
        })?;
    }
    let (written_files, write_failures) = write_java_files(output, &outputs);

    if config.progress_reporting {
        for unit in &units {
            println!("{:>8} {}", unit.status().as_str(), unit.name);
        }
    }

    let results = BatchResults {
        units,
        written_files,
        write_failures,
        files_discovered: paths.len(),
        processing_duration: start.elapsed(),
    };

    crate::log_success!(
        codes::success::BATCH_COMPLETE,
        "Directory conversion completed",
        "files_processed" => results.files_processed(),
        "successful" => results.success_count(),
        "failed" => results.failure_count(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

/// Output directory used when none is given: `<input>/<default_output_dir>`
pub fn default_output_dir(input: &Path, prefs: &BatchPreferences) -> PathBuf {
    input.join(&prefs.default_output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::tempdir;

    fn quiet_config() -> BatchConfig {
        BatchConfig {
            progress_reporting: false,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/model")).unwrap();
        fs::write(root.join("Main.kt"), "fun main() {}").unwrap();
        fs::write(root.join("app/model/User.kt"), "class User").unwrap();
        fs::write(root.join("app/Notes.txt"), "not kotlin").unwrap();
        fs::write(root.join("app/Script.kts"), "println(1)").unwrap();
        fs::write(root.join("app/Upper.KT"), "val x = 1").unwrap();

        let files = scan_kotlin_files(root, None).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("Main.kt"), PathBuf::from("app/model/User.kt")]
        );
    }

    #[test]
    fn test_scan_limit_is_deterministic() {
        let dir = tempdir().unwrap();
        for name in ["C.kt", "A.kt", "B.kt"] {
            fs::write(dir.path().join(name), "val x = 1").unwrap();
        }
        let files = scan_kotlin_files(dir.path(), Some(2)).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["A.kt", "B.kt"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempdir().unwrap();
        let result = scan_kotlin_files(&dir.path().join("absent"), None);
        assert_matches!(result, Err(BatchError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_write_preserves_structure() {
        let dir = tempdir().unwrap();
        let outputs: DataFiles = vec![
            DataFile::new("Main.java", "class Main {}"),
            DataFile::new("app/model/User.java", "class User {}"),
            DataFile::new("../Escape.java", "class Escape {}"),
        ]
        .into();

        let (written, failures) = write_java_files(dir.path(), &outputs);
        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("app/model/User.java")).unwrap(),
            "class User {}"
        );
        assert_matches!(failures.as_slice(), [BatchError::OutputWriteFailed { .. }]);
        assert!(!dir.path().parent().unwrap().join("Escape.java").exists());
    }

    #[test]
    fn test_convert_directory_isolates_bad_files() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::create_dir_all(input.path().join("pkg")).unwrap();
        fs::write(input.path().join("Bad.kt"), "val x = #\n").unwrap();
        fs::write(input.path().join("pkg/Hello.kt"), "fun greet(name: String) = \"Hello, $name\"\n").unwrap();
        fs::write(input.path().join("Empty.kt"), "").unwrap();

        let results = convert_directory(input.path(), output.path(), &quiet_config()).unwrap();

        assert_eq!(results.files_discovered, 3);
        let names: Vec<_> = results.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Bad.kt", "Empty.kt", "pkg/Hello.kt"]);
        assert_eq!(results.success_count(), 1);
        assert_eq!(results.failure_count(), 2);
        assert!(results.has_errors());
        assert_eq!(results.units[1].diagnostics[0].code.as_str(), "E008");

        let java = fs::read_to_string(output.path().join("pkg/Hello.java")).unwrap();
        assert!(java.contains("public static String greet(String name)"));
        assert!(!output.path().join("Bad.java").exists());
        assert_eq!(results.written_files.len(), 1);
    }

    #[test]
    fn test_convert_directory_sequential_matches_parallel() {
        let input = tempdir().unwrap();
        for i in 0..5 {
            fs::write(input.path().join(format!("F{}.kt", i)), format!("fun f() = {}\n", i)).unwrap();
        }
        let out_a = tempdir().unwrap();
        let out_b = tempdir().unwrap();

        let parallel = BatchConfig {
            max_threads: 3,
            ..quiet_config()
        };
        convert_directory(input.path(), out_a.path(), &parallel).unwrap();
        convert_directory(input.path(), out_b.path(), &quiet_config().sequential()).unwrap();

        for i in 0..5 {
            let name = format!("F{}.java", i);
            assert_eq!(
                fs::read(out_a.path().join(&name)).unwrap(),
                fs::read(out_b.path().join(&name)).unwrap()
            );
        }
    }

    #[test]
    fn test_batch_results_summary() {
        let results = BatchResults::new();
        assert_eq!(results.success_rate(), 0.0);
        assert!(!results.has_errors());
        assert!(results.summary().starts_with("Converted 0 files"));
    }

    #[test]
    fn test_default_output_dir() {
        let prefs = BatchPreferences {
            worker_threads: 0,
            default_output_dir: "java".to_string(),
            progress_reporting: false,
        };
        assert_eq!(default_output_dir(Path::new("src"), &prefs), PathBuf::from("src/java"));
    }
}
