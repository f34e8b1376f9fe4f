//! Text I/O shared by the legacy-compatible file formats

mod text;

pub use text::{format_exp, format_general, read_array, write_array, ArrayDelimiter};
