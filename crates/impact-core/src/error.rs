use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the event-impact crates.
///
/// The analytics pipeline itself never fails; these only surface while
/// acquiring inputs or validating user-supplied parameters.
#[derive(Error, Debug)]
pub enum ImpactError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV export could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// The file extension does not map to a known table format.
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(PathBuf),

    /// No `.csv` or `.json` uploads were found under the given directory.
    #[error("No uploads found in {0}")]
    NoUploads(PathBuf),

    /// The table has no header row.
    #[error("Table has no header row")]
    EmptyTable,

    /// A date argument did not match `YYYY-MM-DD`.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The event window ends before it starts.
    #[error("Invalid event window: {start} is after {end}")]
    InvalidEventWindow { start: NaiveDate, end: NaiveDate },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the event-impact crates.
pub type Result<T> = std::result::Result<T, ImpactError>;
