/// Structured logging for the seismic stacking pipeline
///
/// Provides context-rich logging tagged with the pipeline stage and the
/// dataset (seismic parameter) being processed, with timestamps and
/// severity levels. Supports console output and an optional append-only
/// log file for long batch runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::AnalysisError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(AnalysisError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Mask,
    Filter,
    StackTime,
    StackSpace,
    Statistics,
    Correlate,
    Export,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "INGEST"),
            Stage::Mask => write!(f, "MASK"),
            Stage::Filter => write!(f, "FILTER"),
            Stage::StackTime => write!(f, "STACK-TIME"),
            Stage::StackSpace => write!(f, "STACK-SPACE"),
            Stage::Statistics => write!(f, "STATS"),
            Stage::Correlate => write!(f, "CORR"),
            Stage::Export => write!(f, "EXPORT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the dataset cannot be stacked as-is (partial year,
    /// empty after filtering) and needs trimming rather than a code fix
    Expected,
    /// Unexpected failure - malformed input, bad configuration, or I/O trouble
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, stage: Stage, dataset: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let dataset_part = dataset.map(|d| format!(" [{}]", d)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, stage, dataset_part, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", log_entry),
                LogLevel::Debug => println!("   [DEBUG] {}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, dataset_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, dataset_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, stage: Stage, dataset: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, dataset, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, dataset: Option<&str>, message: &str) {
    emit(LogLevel::Info, stage, dataset, message);
}

/// Log a warning message
pub fn warn(stage: Stage, dataset: Option<&str>, message: &str) {
    emit(LogLevel::Warning, stage, dataset, message);
}

/// Log an error message
pub fn error(stage: Stage, dataset: Option<&str>, message: &str) {
    emit(LogLevel::Error, stage, dataset, message);
}

/// Log a debug message
pub fn debug(stage: Stage, dataset: Option<&str>, message: &str) {
    emit(LogLevel::Debug, stage, dataset, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a dataset failure by what went wrong.
pub fn classify_failure(err: &AnalysisError) -> FailureType {
    match err {
        // Data is well-formed but does not fit the stacking contract.
        AnalysisError::YearLengthMismatch { .. } | AnalysisError::EmptyInput(_) => FailureType::Expected,

        AnalysisError::Io { .. }
        | AnalysisError::Csv(_)
        | AnalysisError::Json(_)
        | AnalysisError::Config(_)
        | AnalysisError::MissingTimeColumn { .. }
        | AnalysisError::InvalidTimestamp { .. }
        | AnalysisError::NonNumericValue { .. }
        | AnalysisError::UnknownColumn(_)
        | AnalysisError::ColumnIndexOutOfRange { .. }
        | AnalysisError::InvalidColumnSelector(_)
        | AnalysisError::InvalidGrouping(_)
        | AnalysisError::InvalidFilter(_) => FailureType::Unexpected,

        AnalysisError::UnorderedIndex { .. }
        | AnalysisError::ColumnLengthMismatch { .. }
        | AnalysisError::NegativeValues(_) => FailureType::Unknown,
    }
}

/// Log a dataset failure with automatic classification
pub fn log_dataset_failure(dataset: &str, stage: Stage, err: &AnalysisError) {
    let failure_type = classify_failure(err);
    let message = format!("failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Expected => warn(stage, Some(dataset), &message),
        FailureType::Unexpected => error(stage, Some(dataset), &message),
        FailureType::Unknown => warn(stage, Some(dataset), &message),
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch run
pub fn log_batch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!("Batch complete: {}/{} successful, {} failed", successful, total, failed);

    if failed == 0 {
        info(Stage::System, None, &message);
    } else if successful == 0 {
        error(Stage::System, None, &message);
    } else {
        warn(Stage::System, None, &message);
    }
}
