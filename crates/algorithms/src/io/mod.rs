//! Readers and writers for geostatistical model and point files

mod gslib;
mod sgems;
mod structure_file;

pub use gslib::{parse_gslib, read_gslib, GslibData, GslibParams};
pub use sgems::{parse_sgems_variogram_xml, read_sgems_variogram_xml};
pub use structure_file::{parse_struct, read_struct_file, write_struct_file};
