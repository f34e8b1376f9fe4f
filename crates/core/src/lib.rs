//! # SurtGeo Core
//!
//! Core types shared by the SurtGeo geostatistics crates.
//!
//! This crate provides:
//! - `Error` / `Result`: the error taxonomy used across the workspace
//! - `Diagnostics`: non-fatal warnings returned to callers (and traced)
//! - `StructuredGrid` / `Raster`: grid geometry and dense cell arrays
//! - `LabeledMatrix`: symmetric matrix with named rows and columns
//! - Text formatting compatible with legacy PEST-style files

pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod io;
pub mod matrix;

pub use diagnostics::{Diagnostics, Warning};
pub use error::{Error, Result};
pub use grid::{Raster, StructuredGrid};
pub use matrix::LabeledMatrix;

/// Minimum resolvable separation distance between two locations.
///
/// Conditioning points closer than this make the kriging system singular,
/// and a target closer than this to a point is treated as an exact match.
pub const EPSILON: f64 = 1.0e-7;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::diagnostics::{Diagnostics, Warning};
    pub use crate::error::{Error, Result};
    pub use crate::grid::{Raster, StructuredGrid};
    pub use crate::matrix::LabeledMatrix;
    pub use crate::EPSILON;
}
