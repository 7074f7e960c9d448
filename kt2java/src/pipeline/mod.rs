//! Per-file pipeline driver
//!
//! Runs lexer, parser, transformer and emitter over one in-memory source
//! and records every problem as a [`Diagnostic`]. Lexical and syntax errors
//! stop a unit at the stage that raised them; semantic errors do not, so the
//! emitter still renders the rest of the file with placeholders.
//!
//! [`transpile_batch`] runs independent units on a pool of scoped worker
//! threads. Units share nothing, and a panic in one is caught and reported
//! against that unit alone.

mod data;
mod error;
mod result;

pub use data::{DataFile, DataFiles};
pub use error::PipelineError;
pub use result::{TranspilationUnit, UnitStatus};

use crate::config::compile_time::batch_processing::MAX_WORKER_THREADS;
use crate::config::runtime::{EmitterPreferences, LexicalPreferences, RuntimeConfig, TransformPreferences};
use crate::diagnostics::Diagnostic;
use crate::emitter::JavaEmitter;
use crate::file_processor::{decode_source, FileProcessor};
use crate::lexical::LexicalAnalyzer;
use crate::logging::{self, codes};
use crate::syntax::parse_tokens;
use crate::transform::{holder_class_name, Transformer};
use crate::utils::{Position, Span};
use crate::{log_debug, log_error, log_info, log_success, log_warning};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

/// Parser recursion is bounded but deep inputs still need more than the
/// default spawned-thread stack
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Stage preferences shared by every unit of a run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub lexical: LexicalPreferences,
    pub transform: TransformPreferences,
    pub emitter: EmitterPreferences,
    /// 0 picks the available parallelism; 1 runs on the calling thread
    pub worker_threads: usize,
}

impl PipelineOptions {
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        Self {
            lexical: config.lexical.clone(),
            transform: config.transform.clone(),
            emitter: config.emitter.clone(),
            worker_threads: config.batch.worker_threads,
        }
    }

    pub fn sequential(mut self) -> Self {
        self.worker_threads = 1;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Thread count for `units` inputs, clamped to the compile-time ceiling
    pub fn effective_workers(&self, units: usize) -> usize {
        let requested = if self.worker_threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.worker_threads
        };
        requested.min(MAX_WORKER_THREADS).min(units).max(1)
    }
}

/// Transpile one in-memory file with preferences from the environment
pub fn transpile(file: &DataFile) -> TranspilationUnit {
    transpile_unit(file, 0, &PipelineOptions::default())
}

/// Transpile one in-memory file; events are attributed to `file.name`
pub fn transpile_unit(file: &DataFile, file_id: usize, options: &PipelineOptions) -> TranspilationUnit {
    logging::with_file_context(PathBuf::from(&file.name), file_id, || {
        let start = Instant::now();
        let mut unit = TranspilationUnit::new(
            file.name.clone(),
            file.content.clone(),
            holder_class_name(&file.name, &options.transform.holder_class_suffix),
        );
        run_stages(&mut unit, options);
        for diagnostic in &unit.diagnostics {
            log_diagnostic(diagnostic);
        }
        unit.duration = start.elapsed();
        unit.log_completion();
        unit
    })
}

fn run_stages(unit: &mut TranspilationUnit, options: &PipelineOptions) {
    let source = match decode_source(&unit.name, &unit.source) {
        Ok(source) => source.to_string(),
        Err(error) => {
            unit.diagnostics.push(Diagnostic::from(error));
            return;
        }
    };

    let mut analyzer = LexicalAnalyzer::with_preferences(options.lexical.clone());
    let tokens = analyzer.tokenize(&source);
    unit.lexical_metrics = Some(analyzer.metrics().clone());
    match tokens {
        Ok(tokens) => unit.tokens = tokens,
        Err(error) => {
            unit.diagnostics.push(Diagnostic::from(error));
            return;
        }
    }

    let outcome = parse_tokens(unit.tokens.iter().cloned());
    unit.diagnostics.extend(outcome.errors.iter().map(Diagnostic::from));
    unit.ast = outcome.program;
    let program = match &unit.ast {
        Some(program) if outcome.errors.is_empty() => program.clone(),
        _ => return,
    };

    let transformed = Transformer::new(&unit.holder_class, options.transform.clone()).transform(program);
    unit.diagnostics.extend(transformed.issues.iter().map(Diagnostic::from));

    match JavaEmitter::new(options.emitter.clone()).emit(&transformed.program) {
        Ok(text) => unit.output = Some(text),
        Err(error) => unit.diagnostics.push(Diagnostic::from(error)),
    }
    unit.transformed = Some(transformed.program);
}

fn log_diagnostic(diagnostic: &Diagnostic) {
    let span = diagnostic.span.or_else(|| {
        diagnostic.has_location().then(|| {
            let position = Position::new(diagnostic.offset, diagnostic.line, diagnostic.column);
            Span::new(position, position)
        })
    });
    match (diagnostic.is_error(), span) {
        (true, Some(span)) => log_error!(diagnostic.code, &diagnostic.message, span = span),
        (true, None) => log_error!(diagnostic.code, &diagnostic.message),
        (false, Some(span)) => log_warning!(code = diagnostic.code, &diagnostic.message, span = span),
        (false, None) => log_warning!(code = diagnostic.code, &diagnostic.message),
    }
}

/// Read `path` from disk and transpile it; the unit is named by the path
/// relative to `root`
pub fn transpile_file(root: &Path, path: &Path, file_id: usize, options: &PipelineOptions) -> TranspilationUnit {
    let name = DataFile::from_path(root, path, Vec::new()).name;
    match FileProcessor::new().process_file(path) {
        Ok(processed) => transpile_unit(&DataFile::new(name, processed.source), file_id, options),
        Err(error) => TranspilationUnit::failed(name, Diagnostic::from(PipelineError::from(error))),
    }
}

/// Transpile every file, returning units in input order
pub fn transpile_batch(files: &DataFiles, options: &PipelineOptions) -> Vec<TranspilationUnit> {
    let start = Instant::now();
    let workers = options.effective_workers(files.len());
    log_info!("Starting batch transpilation",
        "files" => files.len(),
        "workers" => workers
    );

    let units = if workers <= 1 {
        files
            .iter()
            .enumerate()
            .map(|(file_id, file)| transpile_isolated(file, file_id, options))
            .collect()
    } else {
        transpile_parallel(files.as_slice(), workers, options)
    };

    let failed = units.iter().filter(|unit| unit.status() == UnitStatus::Failed).count();
    log_success!(
        codes::success::BATCH_COMPLETE,
        "Batch transpilation finished",
        "files" => units.len(),
        "failed" => failed,
        "duration_ms" => format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0)
    );
    units
}

/// Runs one unit, turning a panic into an internal diagnostic for that unit
fn transpile_isolated(file: &DataFile, file_id: usize, options: &PipelineOptions) -> TranspilationUnit {
    match panic::catch_unwind(AssertUnwindSafe(|| transpile_unit(file, file_id, options))) {
        Ok(unit) => unit,
        Err(payload) => {
            logging::clear_file_context();
            let error = PipelineError::from_panic(&file.name, payload);
            log_error!(error.error_code(), "Worker panicked", "file" => &file.name, "reason" => &error);
            TranspilationUnit::failed(file.name.clone(), Diagnostic::from(error))
        }
    }
}

fn transpile_parallel(files: &[DataFile], workers: usize, options: &PipelineOptions) -> Vec<TranspilationUnit> {
    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<TranspilationUnit>> = vec![None; files.len()];

    let drain = || {
        let mut done = Vec::new();
        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(file) = files.get(index) else {
                break;
            };
            done.push((index, transpile_isolated(file, index, options)));
        }
        done
    };

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("kt2java-worker-{}", worker))
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(scope, drain);
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let error = PipelineError::WorkerSpawn { message: e.to_string() };
                    log_warning!("Continuing with fewer workers", "reason" => &error, "started" => handles.len());
                    break;
                }
            }
        }

        if handles.is_empty() {
            for (index, unit) in drain() {
                slots[index] = Some(unit);
            }
        }

        for handle in handles {
            // Workers catch unit panics, so a join error is unexpected; any
            // unit it claimed is reported below as missing
            if let Ok(done) = handle.join() {
                for (index, unit) in done {
                    slots[index] = Some(unit);
                }
            }
        }
    });

    log_debug!("Parallel transpilation joined", "workers" => workers);

    slots
        .into_iter()
        .zip(files)
        .map(|(slot, file)| {
            slot.unwrap_or_else(|| {
                let error = PipelineError::WorkerPanic {
                    file: file.name.clone(),
                    message: "worker exited without a result".to_string(),
                };
                TranspilationUnit::failed(file.name.clone(), Diagnostic::from(error))
            })
        })
        .collect()
}

/// Check that every pipeline-level code is registered
pub fn init_pipeline_logging() -> Result<(), String> {
    codes::ensure_registered(&[
        codes::system::INTERNAL_ERROR,
        codes::system::INITIALIZATION_FAILURE,
        codes::batch::WORKER_FAILURE,
        codes::success::TRANSPILATION_COMPLETE,
        codes::success::BATCH_COMPLETE,
    ])?;
    crate::file_processor::init_file_processor_logging()?;
    crate::lexical::init_lexical_analysis_logging()?;
    crate::syntax::init_syntax_logging()?;
    Ok(())
}
