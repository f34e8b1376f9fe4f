//! # SurtGeo Parallel
//!
//! Parallel execution for CPU-bound geostatistics.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential / rayon-parallel selection
//! - `run_indexed`: a fixed-size worker pool draining a shared job queue
//!   into a pre-sized, index-addressed result slice

pub mod pool;
pub mod strategy;

pub use pool::run_indexed;
pub use strategy::{ParallelStrategy, ProcessingMode};
