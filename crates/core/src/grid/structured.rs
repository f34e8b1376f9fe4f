//! Structured (row/column) grid geometry
//!
//! Cells are laid out row-major from the upper-left corner: columns run
//! east with widths `delx`, rows run south with heights `dely`. Spacing may
//! vary per row/column; spectral simulation requires a regular grid.

use crate::error::{Error, Result};

/// A rectilinear grid described by per-column and per-row cell sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredGrid {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Column widths (length = ncol)
    pub delx: Vec<f64>,
    /// Row heights (length = nrow)
    pub dely: Vec<f64>,
}

impl StructuredGrid {
    /// Create a grid from explicit spacing vectors.
    pub fn new(origin_x: f64, origin_y: f64, delx: Vec<f64>, dely: Vec<f64>) -> Result<Self> {
        if delx.is_empty() || dely.is_empty() {
            return Err(Error::InvalidDimensions {
                ncol: delx.len(),
                nrow: dely.len(),
            });
        }
        if let Some(d) = delx.iter().chain(dely.iter()).find(|d| !(**d > 0.0)) {
            return Err(Error::InvalidParameter {
                name: "cell size",
                value: d.to_string(),
                reason: "cell sizes must be positive".into(),
            });
        }
        Ok(Self {
            origin_x,
            origin_y,
            delx,
            dely,
        })
    }

    /// Create a uniform grid of square cells.
    pub fn uniform(origin_x: f64, origin_y: f64, ncol: usize, nrow: usize, cell_size: f64) -> Result<Self> {
        Self::new(origin_x, origin_y, vec![cell_size; ncol], vec![cell_size; nrow])
    }

    pub fn ncol(&self) -> usize {
        self.delx.len()
    }

    pub fn nrow(&self) -> usize {
        self.dely.len()
    }

    /// Dimensions as (nrow, ncol)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrow(), self.ncol())
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.nrow() * self.ncol()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// X coordinates of the column centers
    pub fn x_centers(&self) -> Vec<f64> {
        let mut edge = self.origin_x;
        self.delx
            .iter()
            .map(|d| {
                let c = edge + 0.5 * d;
                edge += d;
                c
            })
            .collect()
    }

    /// Y coordinates of the row centers (decreasing southward)
    pub fn y_centers(&self) -> Vec<f64> {
        let mut edge = self.origin_y;
        self.dely
            .iter()
            .map(|d| {
                let c = edge - 0.5 * d;
                edge -= d;
                c
            })
            .collect()
    }

    /// Cell-center coordinates of every cell in row-major order.
    pub fn cell_centers(&self) -> Vec<(f64, f64)> {
        let xc = self.x_centers();
        let yc = self.y_centers();
        let mut out = Vec::with_capacity(self.len());
        for &y in &yc {
            for &x in &xc {
                out.push((x, y));
            }
        }
        out
    }

    /// Check that spacing is uniform and equal in both directions.
    ///
    /// Mirrors the classic test: the mean spacing of each axis must equal
    /// its minimum, and both means must agree, all within `tol`.
    pub fn is_regular(&self, tol: f64) -> bool {
        let stats = |v: &[f64]| {
            let mean = v.iter().sum::<f64>() / v.len() as f64;
            let min = v.iter().copied().fold(f64::INFINITY, f64::min);
            (mean, min)
        };
        let (mx, nx) = stats(&self.delx);
        let (my, ny) = stats(&self.dely);
        (mx - nx).abs() <= tol && (my - ny).abs() <= tol && (mx - my).abs() <= tol
    }

    /// Cell size of a regular grid (first column width).
    pub fn cell_size(&self) -> f64 {
        self.delx[0]
    }
}
