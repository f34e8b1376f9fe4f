//! Geostatistics: covariance models, ordinary kriging and spectral simulation
//!
//! - [`variogram`]: spherical, exponential and Gaussian models with
//!   anisotropic rotation
//! - [`structure`]: nugget plus nested variograms
//! - [`kriging`]: ordinary kriging factors over scattered points or grids
//! - [`factors`]: factors files and grid reconstruction
//! - [`specsim`]: FFT spectral simulation on regular grids
//! - [`ensemble`]: grouped grid-parameter ensembles

pub mod ensemble;
pub mod factors;
pub mod fft;
pub mod kriging;
pub mod points;
pub mod solve;
pub mod specsim;
pub mod structure;
pub mod variogram;

pub use ensemble::{grid_par_ensemble, CalibrationContext, EnsembleParams, GridParameter, ParameterEnsemble};
pub use factors::{fac2real, write_real_array, FacToRealParams, FactorNode, FactorsRecord, OutOfRange};
pub use kriging::{GridKriging, KrigingBatch, KrigingParams, KrigingResult, Neighbor, OrdinaryKrige};
pub use points::{Point, PointCheck, PointRegistry};
pub use specsim::{MeanField, SpecSim2d, VarianceScope};
pub use structure::{by_name, sort_structures, CovarianceStructure, Transform};
pub use variogram::{Variogram, VariogramKind};
