// RUNTIME PREFERENCES (User Experience)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProcessorPreferences {
    /// Whether to reject files without a .kt extension
    pub require_kt_extension: bool,

    /// Whether to enable detailed performance logging
    pub enable_performance_logging: bool,
}

impl Default for FileProcessorPreferences {
    fn default() -> Self {
        Self {
            require_kt_extension: env::var("KT2J_REQUIRE_KT_EXTENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            enable_performance_logging: env::var("KT2J_ENABLE_PERFORMANCE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalPreferences {
    /// Whether to collect detailed token metrics
    pub collect_detailed_metrics: bool,

    /// Whether to include whitespace and comments in token counts
    pub include_trivia_in_counts: bool,

    /// Whether to show position information in error messages
    pub include_position_in_errors: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            collect_detailed_metrics: env::var("KT2J_LEXICAL_DETAILED_METRICS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_trivia_in_counts: env::var("KT2J_LEXICAL_INCLUDE_TRIVIA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            include_position_in_errors: env::var("KT2J_LEXICAL_INCLUDE_POSITIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformPreferences {
    /// Suffix appended to the file stem when naming the holder class
    pub holder_class_suffix: String,

    /// Whether falling back to `Object` for an uninferable type is reported
    pub warn_on_type_fallback: bool,
}

impl Default for TransformPreferences {
    fn default() -> Self {
        Self {
            holder_class_suffix: env::var("KT2J_HOLDER_CLASS_SUFFIX").unwrap_or_default(),
            warn_on_type_fallback: env::var("KT2J_WARN_ON_TYPE_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterPreferences {
    /// Whether to prefix output with a generated-from comment
    pub emit_header_comment: bool,
}

impl Default for EmitterPreferences {
    fn default() -> Self {
        Self {
            emit_header_comment: env::var("KT2J_EMIT_HEADER_COMMENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPreferences {
    /// Worker thread count; 0 means available parallelism
    pub worker_threads: usize,

    /// Output directory name used when no explicit output is given
    pub default_output_dir: String,

    /// Whether to print per-file progress
    pub progress_reporting: bool,
}

impl Default for BatchPreferences {
    fn default() -> Self {
        Self {
            worker_threads: env::var("KT2J_BATCH_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            default_output_dir: env::var("KT2J_OUTPUT_DIR")
                .unwrap_or_else(|_| "java".to_string()),
            progress_reporting: env::var("KT2J_BATCH_PROGRESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether to include performance metrics in logs
    pub log_performance_events: bool,

    /// Whether to enable cargo-style error reporting
    pub enable_cargo_style_output: bool,

    /// Whether to include file context in log messages
    pub include_file_context: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("KT2J_LOGGING_USE_STRUCTURED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var("KT2J_LOGGING_ENABLE_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var("KT2J_LOGGING_MIN_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            log_performance_events: env::var("KT2J_LOGGING_LOG_PERFORMANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            enable_cargo_style_output: env::var("KT2J_LOGGING_CARGO_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            include_file_context: env::var("KT2J_LOGGING_INCLUDE_FILE_CONTEXT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

/// Every runtime preference. Sections and keys missing from a TOML file keep
/// their environment-derived defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub file_processor: FileProcessorPreferences,
    pub lexical: LexicalPreferences,
    pub transform: TransformPreferences,
    pub emitter: EmitterPreferences,
    pub batch: BatchPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid runtime configuration: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&text)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    // File Processor
    pub const REQUIRE_KT_EXTENSION: &str = "KT2J_REQUIRE_KT_EXTENSION";
    pub const ENABLE_PERFORMANCE_LOGGING: &str = "KT2J_ENABLE_PERFORMANCE_LOGGING";

    // Lexical
    pub const LEXICAL_DETAILED_METRICS: &str = "KT2J_LEXICAL_DETAILED_METRICS";
    pub const LEXICAL_INCLUDE_TRIVIA: &str = "KT2J_LEXICAL_INCLUDE_TRIVIA";
    pub const LEXICAL_INCLUDE_POSITIONS: &str = "KT2J_LEXICAL_INCLUDE_POSITIONS";

    // Transform
    pub const HOLDER_CLASS_SUFFIX: &str = "KT2J_HOLDER_CLASS_SUFFIX";
    pub const WARN_ON_TYPE_FALLBACK: &str = "KT2J_WARN_ON_TYPE_FALLBACK";

    // Emitter
    pub const EMIT_HEADER_COMMENT: &str = "KT2J_EMIT_HEADER_COMMENT";

    // Batch
    pub const BATCH_THREADS: &str = "KT2J_BATCH_THREADS";
    pub const OUTPUT_DIR: &str = "KT2J_OUTPUT_DIR";
    pub const BATCH_PROGRESS: &str = "KT2J_BATCH_PROGRESS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "KT2J_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "KT2J_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "KT2J_LOGGING_MIN_LEVEL";
    pub const LOGGING_LOG_PERFORMANCE: &str = "KT2J_LOGGING_LOG_PERFORMANCE";
    pub const LOGGING_CARGO_STYLE: &str = "KT2J_LOGGING_CARGO_STYLE";
    pub const LOGGING_INCLUDE_FILE_CONTEXT: &str = "KT2J_LOGGING_INCLUDE_FILE_CONTEXT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("0"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("warning"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("info"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("3"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_env_var_names_share_prefix() {
        for name in [
            env_vars::REQUIRE_KT_EXTENSION,
            env_vars::HOLDER_CLASS_SUFFIX,
            env_vars::BATCH_THREADS,
            env_vars::LOGGING_MIN_LEVEL,
        ] {
            assert!(name.starts_with("KT2J_"));
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            "[transform]\nholder_class_suffix = \"Kt\"\n\n[batch]\nworker_threads = 2\n",
        )
        .unwrap();
        assert_eq!(config.transform.holder_class_suffix, "Kt");
        assert_eq!(config.batch.worker_threads, 2);
        assert!(!config.batch.default_output_dir.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let error = RuntimeConfig::from_toml_str("[batch]\nworker_threads = \"many\"").unwrap_err();
        assert!(error.starts_with("Invalid runtime configuration"));
    }

    #[test]
    fn test_runtime_config_serializes() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("holder_class_suffix"));
        assert!(json.contains("min_log_level"));
    }
}
