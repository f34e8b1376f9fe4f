//! Error types for SurtGeo

use thiserror::Error;

/// Main error type for SurtGeo operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A model parameter or token failed validation (non-positive range,
    /// contribution or anisotropy, unknown transform, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate point '{name}' has conflicting coordinates")]
    DuplicatePoint { name: String },

    #[error("Singular kriging system at target {index} ({x}, {y}): {reason}")]
    SingularSystem {
        index: usize,
        x: f64,
        y: f64,
        reason: String,
    },

    #[error("Grid irregularity: {0}")]
    GridIrregularity(String),

    #[error("File format error: {0}")]
    FileFormat(String),

    #[error("Invalid grid dimensions: {ncol}x{nrow}")]
    InvalidDimensions { ncol: usize, nrow: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// File format error pinned to a 1-based line number.
    pub fn format_at(line: usize, message: impl std::fmt::Display) -> Self {
        Error::FileFormat(format!("line {line}: {message}"))
    }
}

/// Result type alias for SurtGeo operations
pub type Result<T> = std::result::Result<T, Error>;
