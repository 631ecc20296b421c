//! Error types for the split engine.
//!
//! The primary error type is `SplitError`, which represents a failure that
//! aborts a split. The best-effort archive-bit step never produces a
//! `SplitError`; its outcome is reported as data through the reporter.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a split.
///
/// Validation errors are raised before anything is written to disk.
/// I/O errors may leave a partially written output directory behind.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Input path does not refer to a regular file
    #[error("{} is not a file", .path.display())]
    InvalidInput { path: PathBuf },

    /// Output directory exists but is unusable
    #[error("{} {reason}", .path.display())]
    InvalidOutput { path: PathBuf, reason: String },

    /// The input's volume cannot hold the original plus all parts
    #[error(
        "Not enough free space to run. Will require twice the space as the input file \
         ({required} bytes required, {available} bytes available)"
    )]
    InsufficientSpace { required: u64, available: u64 },

    /// Input already fits within a single part
    #[error("This file is {size} bytes, under the {part_size} byte part size, and does not need to be split")]
    SplitNotNeeded { size: u64, part_size: u64 },

    /// Failed to read from the input file
    #[error("Failed to read file: {}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write or close a part file
    #[error("Failed to write file: {}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create the output directory
    #[error("Failed to create directory: {}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller's cancel token was triggered between chunks
    #[error("Split cancelled after {written} bytes")]
    Cancelled { written: u64 },

    /// Part or chunk size rejected
    #[error("Invalid split configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Coarse classification of a failed run, carried by terminal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    InvalidOutput,
    InsufficientSpace,
    SplitNotNeeded,
    #[serde(rename = "IOFailure")]
    Io,
    Cancelled,
    InvalidConfig,
    /// The worker thread panicked
    Panic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::InvalidOutput => "InvalidOutput",
            ErrorKind::InsufficientSpace => "InsufficientSpace",
            ErrorKind::SplitNotNeeded => "SplitNotNeeded",
            ErrorKind::Io => "IOFailure",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::Panic => "Panic",
        };
        f.write_str(name)
    }
}

impl SplitError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidOutput { .. } => ErrorKind::InvalidOutput,
            Self::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
            Self::SplitNotNeeded { .. } => ErrorKind::SplitNotNeeded,
            Self::ReadError { .. }
            | Self::WriteError { .. }
            | Self::DirectoryCreationFailed { .. } => ErrorKind::Io,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn invalid_output(path: impl Into<PathBuf>, reason: &str) -> Self {
        Self::InvalidOutput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
