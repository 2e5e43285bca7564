//! Error types for the OVF library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for OVF operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Output file could not be created or opened for writing
    #[error("Failed to open {path} for writing: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Append attempted on a scope that has already been finalized
    #[error("Cannot append to a finalized {0}")]
    UseAfterFinalize(&'static str),

    /// A second child scope was opened while another is still open,
    /// or a parent was finalized with an open child
    #[error("Scope exclusivity violated: {0}")]
    ExclusivityViolation(String),

    /// Malformed length-delimited record
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Data is truncated, or an offset points at/past the end of the stream
    #[error("Unexpected end of data at position {0}")]
    ShortRead(u64),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid OVF file: expected magic bytes")]
    InvalidMagic,

    /// Work plane index out of bounds
    #[error("Work plane index {index} out of bounds (count: {count})")]
    WorkPlaneOutOfBounds { index: usize, count: usize },

    /// Vector block index out of bounds
    #[error("Vector block index {index} out of bounds (count: {count})")]
    VectorBlockOutOfBounds { index: usize, count: usize },

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Model source could not be parsed
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Job configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// An earlier write failed; the file is incomplete.
    #[error("Writer failed earlier and cannot continue: {0}")]
    WriterFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupt record error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptRecord(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid model error.
    pub fn invalid_model(msg: impl Into<String>) -> Self {
        Self::InvalidModel(msg.into())
    }
}

/// Result type alias for OVF operations.
pub type Result<T> = std::result::Result<T, Error>;
