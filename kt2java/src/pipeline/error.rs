use crate::file_processor::FileProcessorError;
use crate::logging::{codes, Code};

/// Failures of the pipeline driver itself, as opposed to problems in the
/// Kotlin being transpiled, which are reported as diagnostics
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Could not start worker thread: {message}")]
    WorkerSpawn { message: String },

    #[error("Transpiling {file} panicked: {message}")]
    WorkerPanic { file: String, message: String },
}

impl PipelineError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::FileProcessing(error) => error.error_code(),
            Self::WorkerSpawn { .. } => codes::system::INITIALIZATION_FAILURE,
            Self::WorkerPanic { .. } => codes::batch::WORKER_FAILURE,
        }
    }

    pub(crate) fn from_panic(file: &str, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::WorkerPanic {
            file: file.to_string(),
            message,
        }
    }
}
