//! Dense 2-D cell array

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// A dense `nrow x ncol` array of `f64` cell values in row-major order.
///
/// Used for kriging variance grids, fac2real reconstructions and
/// simulated realizations. Unestimated cells hold a caller-chosen fill
/// value (often `NaN` or the legacy `1.0e30`).
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array2<f64>,
}

impl Raster {
    /// Create a raster filled with zeros
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Self {
            data: Array2::zeros((nrow, ncol)),
        }
    }

    /// Create a raster filled with a specific value
    pub fn filled(nrow: usize, ncol: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((nrow, ncol), value),
        }
    }

    /// Create a raster from row-major values
    pub fn from_vec(values: Vec<f64>, nrow: usize, ncol: usize) -> Result<Self> {
        if values.len() != nrow * ncol {
            return Err(Error::InvalidDimensions { ncol, nrow });
        }
        let data = Array2::from_shape_vec((nrow, ncol), values)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn nrow(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncol(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (nrow, ncol)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col), zero-based
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::InvalidParameter {
                name: "cell",
                value: format!("({row}, {col})"),
                reason: format!("outside {}x{} raster", self.nrow(), self.ncol()),
            })
    }

    /// Set value at (row, col), zero-based
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let (nrow, ncol) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::InvalidParameter {
                name: "cell",
                value: format!("({row}, {col})"),
                reason: format!("outside {nrow}x{ncol} raster"),
            }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }

    /// Mean of the finite cells, `None` if there are none.
    pub fn finite_mean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}
