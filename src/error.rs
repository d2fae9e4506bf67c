//! # Error Types
//!
//! Every fallible library operation returns [`Result`], whose error side is
//! [`RasterError`]. The binary wraps these in `anyhow` for context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or batch-loading rasters
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cannot read raster {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Cannot write raster {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Array shape {actual:?} does not match profile shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Array data type {actual} does not match profile data type {expected}")]
    DtypeMismatch { expected: String, actual: String },

    #[error("Invalid year pattern: {0}")]
    InvalidRegex(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RasterError::Read {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RasterError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for the not-found class of errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, RasterError::NotFound(_))
    }
}

/// Result type for raster operations
pub type Result<T> = std::result::Result<T, RasterError>;
