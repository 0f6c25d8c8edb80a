use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for archive listing, extraction and compression
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archiver executable could not be started (missing binary, permissions)
    #[error("Failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archiver exited with a non-zero code
    #[error("Archiver exited with code {code}:\n{output}")]
    Backend { code: i32, output: String },

    /// Listing output could not be understood
    #[error("Malformed listing: {0}")]
    Format(String),

    #[error("Entry has no attribute {0:?}")]
    MissingAttribute(String),

    /// The archiver ran longer than the configured timeout and was killed
    #[error("{} did not finish within {after:?}", program.display())]
    Timeout { program: PathBuf, after: Duration },

    #[error("No such entry: {0}")]
    NoSuchEntry(String),

    /// Failure reported by one of the in-process archive libraries
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Exit code carried by a [`ArchiveError::Backend`] failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ArchiveError::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }
}
