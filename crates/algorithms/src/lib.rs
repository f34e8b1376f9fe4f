//! # SurtGeo Algorithms
//!
//! Geostatistical modelling for parameter-field generation.
//!
//! ## Modules
//!
//! - **geostats**: variogram models, covariance structures, ordinary
//!   kriging (sequential, worker-pool and zoned), kriging factors files
//!   and FFT-based spectral simulation
//! - **io**: structure files, SGEMS variogram XML and GSLIB point files

pub mod geostats;
pub mod io;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::geostats::{
        fac2real, CovarianceStructure, FacToRealParams, FactorsRecord, GridKriging,
        KrigingBatch, KrigingParams, KrigingResult, MeanField, Neighbor, OrdinaryKrige,
        Point, PointCheck, SpecSim2d, Transform, Variogram, VariogramKind,
    };
    pub use crate::io::{
        read_gslib, read_sgems_variogram_xml, read_struct_file, write_struct_file, GslibData,
        GslibParams,
    };
    pub use surtgeo_core::prelude::*;
    pub use surtgeo_parallel::ProcessingMode;
}
