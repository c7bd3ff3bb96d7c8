//! Structured logging for the air quality service
//!
//! Provides context-rich logging tagged with the subsystem that produced
//! the entry and an optional subject (a city, a route, a search radius).
//! Supports console output and an append-only log file.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Subsystems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Reference dataset loading
    Dataset,
    /// OpenAQ live feed
    OpenAq,
    /// HTTP boundary
    Api,
    /// Category predictor collaborator
    Predictor,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Dataset => write!(f, "DATA"),
            DataSource::OpenAq => write!(f, "OPENAQ"),
            DataSource::Api => write!(f, "API"),
            DataSource::Predictor => write!(f, "MODEL"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - no stations near the query, or the feed had nothing recent
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
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
    /// Initialize the global logger. Calling it again replaces the settings.
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

    fn log(&self, level: LogLevel, source: &DataSource, subject: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let entry = format_entry(level, source, subject, message);
        let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, subject_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, subject_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", source, subject_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// One log line: `<utc timestamp> <LEVEL> <SOURCE>[ [subject]]: <message>`.
pub fn format_entry(level: LogLevel, source: &DataSource, subject: Option<&str>, message: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, source, subject_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, source: DataSource, subject: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, subject, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, source, subject, message);
}

/// Log a warning message
pub fn warn(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, source, subject, message);
}

/// Log an error message
pub fn error(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, source, subject, message);
}

/// Log a debug message
pub fn debug(source: DataSource, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, source, subject, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a live-feed failure from its error text
pub fn classify_feed_failure(error_message: &str) -> FailureType {
    if error_message.contains("No results") {
        // Sparse regions legitimately have no monitors within the radius
        FailureType::Expected
    } else if error_message.contains("HTTP") || error_message.contains("timed out") {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        // Response shape changed under us
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a live-feed failure with automatic classification
pub fn log_feed_failure(subject: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_feed_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(DataSource::OpenAq, Some(subject), &message),
        FailureType::Unexpected => error(DataSource::OpenAq, Some(subject), &message),
        FailureType::Unknown => warn(DataSource::OpenAq, Some(subject), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a dataset load: how many rows were kept and dropped
pub fn log_load_summary(source: DataSource, total: usize, kept: usize, dropped: usize) {
    let message = format!(
        "Load complete: {}/{} rows kept, {} dropped",
        kept,
        total,
        dropped
    );

    if dropped == 0 {
        info(source, None, &message);
    } else if kept == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}
