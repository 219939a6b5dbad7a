use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures reported by the synchronizer.
///
/// `MalformedTimestamp` is raised per value; the table readers and the
/// frame filter treat it as a reason to skip the row. Every other
/// variant is fatal for the stream or run it occurs in.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed timestamp {text:?}")]
    MalformedTimestamp { text: String },

    #[error("required column `{column}` is missing from {stream}")]
    MissingRequiredColumn { stream: String, column: String },

    #[error("input stream not found: {}", path.display())]
    MissingInputStream { path: PathBuf },

    #[error("no valid playback ranges were extracted from the events")]
    NoValidRanges,

    #[error("configuration file not found: {}", path.display())]
    MissingConfig { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}

impl Error {
    pub(crate) fn malformed_timestamp(text: &str) -> Self {
        Error::MalformedTimestamp {
            text: text.to_string(),
        }
    }

    /// Reports whether the error only invalidates a single row.
    pub fn is_row_level(&self) -> bool {
        matches!(self, Error::MalformedTimestamp { .. })
    }
}
