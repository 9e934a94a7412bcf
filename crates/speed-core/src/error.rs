use std::path::PathBuf;
use thiserror::Error;

/// All errors produced across the DU speed pipeline.
///
/// Fatal kinds (missing input, no valid rows) abort the run with a non-zero
/// exit code; recoverable kinds (malformed row, unknown scenario, chart
/// render failure) are logged, counted in the run summary and never abort.
#[derive(Error, Debug)]
pub enum SpeedError {
    /// The input file or directory does not exist.
    #[error("Input not found: {0}")]
    MissingInput(PathBuf),

    /// No HTML report files were found under the given directory.
    #[error("No HTML reports found in {0}")]
    NoReports(PathBuf),

    /// Every row of an input was dropped during validation.
    #[error("No valid rows in {0}")]
    NoValidRows(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A date string did not match the expected format.
    #[error("Invalid date: {0}")]
    DateParse(String),

    /// A scenario label is not one of the recognised processing modes.
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// A delimited row failed field-level validation.
    #[error("Malformed row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A single chart failed to render; the remaining charts still run.
    #[error("Chart '{chart}' failed to render: {reason}")]
    ChartRender { chart: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for CSV-level errors from the table layer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpeedError {
    /// Whether the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SpeedError::MalformedRow { .. }
                | SpeedError::UnknownScenario(_)
                | SpeedError::DateParse(_)
                | SpeedError::ChartRender { .. }
        )
    }
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T> = std::result::Result<T, SpeedError>;
