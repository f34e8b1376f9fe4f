//! Grid geometry and dense cell arrays

mod raster;
mod structured;

pub use raster::Raster;
pub use structured::StructuredGrid;
