//! Anisotropic 2-D variogram models
//!
//! Each model converts a (rotated, anisotropy-scaled) separation distance
//! into a covariance contribution. The covariance convention is used
//! throughout: at zero separation a model yields its full contribution `c`,
//! decaying toward zero with distance. The semivariogram is `c - C(h)`.
//!
//! ```text
//! Spherical:   C(h) = c·(1 - (h/a)·(1.5 - 0.5·(h/a)²))   h < a,   0 otherwise
//! Exponential: C(h) = c·exp(-h/a)
//! Gaussian:    C(h) = c·exp(-(h/a)²)
//! ```
//!
//! Anisotropy is expressed by a compass bearing (degrees east of north) of
//! the major axis and a ratio applied to the minor rotated axis:
//!
//! ```text
//! θ   = π/180·(90 - bearing)
//! dxx = dx·cosθ + dy·sinθ
//! dyy = (-dx·sinθ + dy·cosθ)·anisotropy
//! h   = sqrt(dxx² + dyy²)
//! ```
//!
//! Reference:
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB: Geostatistical Software
//! Library and User's Guide. Oxford University Press.

use std::fmt;
use std::io::Write;

use surtgeo_core::{Error, LabeledMatrix, Result};

use crate::maybe_rayon::*;

/// Variogram model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariogramKind {
    Spherical,
    Exponential,
    Gaussian,
}

impl VariogramKind {
    /// Parse the numeric `VARTYPE` code of a structure file (1, 2 or 3).
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(VariogramKind::Spherical),
            2 => Ok(VariogramKind::Exponential),
            3 => Ok(VariogramKind::Gaussian),
            other => Err(Error::Validation(format!(
                "unsupported variogram type code {other} (expected 1=spherical, 2=exponential, 3=gaussian)"
            ))),
        }
    }

    /// `VARTYPE` code written to structure files
    pub fn code(&self) -> u8 {
        match self {
            VariogramKind::Spherical => 1,
            VariogramKind::Exponential => 2,
            VariogramKind::Gaussian => 3,
        }
    }

    /// Parse an SGEMS type attribute by prefix (`sph*`, `exp*`, `gau*`).
    pub fn from_sgems(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.starts_with("sph") {
            Ok(VariogramKind::Spherical)
        } else if lower.starts_with("exp") {
            Ok(VariogramKind::Exponential)
        } else if lower.starts_with("gau") {
            Ok(VariogramKind::Gaussian)
        } else {
            Err(Error::Validation(format!("unrecognized variogram type: {name}")))
        }
    }

    /// Covariance at distance `h` for a model with contribution `c` and range `a`.
    #[inline]
    pub fn compute(&self, h: f64, a: f64, c: f64) -> f64 {
        match self {
            VariogramKind::Spherical => {
                let hr = h / a;
                if hr >= 1.0 {
                    0.0
                } else {
                    c * (1.0 - hr * (1.5 - 0.5 * hr * hr))
                }
            }
            VariogramKind::Exponential => c * (-h / a).exp(),
            VariogramKind::Gaussian => c * (-(h * h) / (a * a)).exp(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariogramKind::Spherical => "spherical",
            VariogramKind::Exponential => "exponential",
            VariogramKind::Gaussian => "gaussian",
        }
    }
}

/// One nested variogram of a covariance structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Variogram {
    name: String,
    kind: VariogramKind,
    contribution: f64,
    a: f64,
    anisotropy: f64,
    bearing: f64,
}

fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Validation(format!("{name} must be positive, got {value}")))
    }
}

impl Variogram {
    /// Isotropic variogram with bearing 0 and the default name `var1`.
    pub fn new(kind: VariogramKind, contribution: f64, a: f64) -> Result<Self> {
        Ok(Self {
            name: "var1".to_string(),
            kind,
            contribution: require_positive("contribution", contribution)?,
            a: require_positive("range", a)?,
            anisotropy: 1.0,
            bearing: 0.0,
        })
    }

    pub fn spherical(contribution: f64, a: f64) -> Result<Self> {
        Self::new(VariogramKind::Spherical, contribution, a)
    }

    pub fn exponential(contribution: f64, a: f64) -> Result<Self> {
        Self::new(VariogramKind::Exponential, contribution, a)
    }

    pub fn gaussian(contribution: f64, a: f64) -> Result<Self> {
        Self::new(VariogramKind::Gaussian, contribution, a)
    }

    pub fn with_anisotropy(mut self, ratio: f64) -> Result<Self> {
        self.anisotropy = require_positive("anisotropy", ratio)?;
        Ok(self)
    }

    pub fn with_bearing(mut self, degrees: f64) -> Self {
        self.bearing = degrees;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariogramKind {
        self.kind
    }

    pub fn contribution(&self) -> f64 {
        self.contribution
    }

    /// Range parameter `a`
    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn anisotropy(&self) -> f64 {
        self.anisotropy
    }

    /// Bearing of the major axis, degrees east of north
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    pub(crate) fn set_contribution(&mut self, contribution: f64) -> Result<()> {
        self.contribution = require_positive("contribution", contribution)?;
        Ok(())
    }

    /// Copy with the range expressed in units of `cell_size`.
    pub fn effective(&self, cell_size: f64) -> Self {
        Self {
            a: self.a / cell_size,
            ..self.clone()
        }
    }

    /// Whether the bearing is a multiple of 90 degrees.
    pub fn is_grid_aligned(&self) -> bool {
        self.bearing.rem_euclid(90.0) == 0.0
    }

    /// Bearing converted to a math angle, radians
    pub fn bearing_rads(&self) -> f64 {
        (std::f64::consts::PI / 180.0) * (90.0 - self.bearing)
    }

    /// `[cosθ, sinθ, -sinθ, cosθ]`
    pub fn rotation_coefs(&self) -> [f64; 4] {
        let (s, c) = self.bearing_rads().sin_cos();
        [c, s, -s, c]
    }

    /// Rotate raw offsets into the anisotropy frame.
    ///
    /// Isotropic variograms skip the rotation (it preserves distance).
    #[inline]
    pub fn rotate(&self, dx: f64, dy: f64) -> (f64, f64) {
        if self.anisotropy == 1.0 {
            return (dx, dy);
        }
        let r = self.rotation_coefs();
        let dxx = dx * r[0] + dy * r[1];
        let dyy = (dx * r[2] + dy * r[3]) * self.anisotropy;
        (dxx, dyy)
    }

    /// Effective (rotated, scaled) distance for raw offsets.
    #[inline]
    pub fn distance(&self, dx: f64, dy: f64) -> f64 {
        let (dxx, dyy) = self.rotate(dx, dy);
        (dxx * dxx + dyy * dyy).sqrt()
    }

    /// Covariance at effective distance `h`.
    #[inline]
    pub fn h_function(&self, h: f64) -> f64 {
        self.kind.compute(h, self.a, self.contribution)
    }

    /// Semivariance at effective distance `h`: `c - C(h)`.
    pub fn inv_h(&self, h: f64) -> f64 {
        self.contribution - self.h_function(h)
    }

    /// Covariance between two points.
    pub fn covariance(&self, p0: (f64, f64), p1: (f64, f64)) -> f64 {
        self.h_function(self.distance(p0.0 - p1.0, p0.1 - p1.1))
    }

    /// Covariance between `(x0, y0)` and each of the other points.
    pub fn covariance_points(&self, x0: f64, y0: f64, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; xs.len()];
        self.add_covariance_points(x0, y0, xs, ys, &mut out);
        out
    }

    /// Accumulate covariances to `(x0, y0)` into `out`.
    pub fn add_covariance_points(&self, x0: f64, y0: f64, xs: &[f64], ys: &[f64], out: &mut [f64]) {
        for ((o, x), y) in out.iter_mut().zip(xs).zip(ys) {
            *o += self.h_function(self.distance(x0 - x, y0 - y));
        }
    }

    /// Add this variogram's pairwise covariances into `cov`, whose rows are
    /// ordered like `xs`/`ys`. The upper triangle is computed and mirrored.
    pub fn add_to_matrix(&self, xs: &[f64], ys: &[f64], cov: &mut LabeledMatrix) -> Result<()> {
        let n = xs.len();
        if ys.len() != n || cov.len() != n {
            return Err(Error::Validation(format!(
                "coordinate count ({}, {}) does not match matrix size {}",
                n,
                ys.len(),
                cov.len()
            )));
        }

        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| self.h_function(self.distance(xs[i] - xs[j], ys[i] - ys[j])))
                    .collect()
            })
            .collect();

        for (i, row) in rows.iter().enumerate() {
            if let Some(pos) = row.iter().position(|v| v.is_nan()) {
                return Err(Error::Validation(format!(
                    "NaN covariance between points {} and {}",
                    i,
                    i + 1 + pos
                )));
            }
            cov.accumulate(i, i, self.contribution);
            for (k, v) in row.iter().enumerate() {
                cov.accumulate(i, i + 1 + k, *v);
            }
        }
        cov.mirror_upper();
        Ok(())
    }

    /// Write the `VARIOGRAM ... END VARIOGRAM` block of a structure file.
    pub fn to_struct_file<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "VARIOGRAM {}", self.name)?;
        writeln!(w, "  VARTYPE {}", self.kind.code())?;
        writeln!(w, "  A {}", self.a)?;
        writeln!(w, "  ANISOTROPY {}", self.anisotropy)?;
        writeln!(w, "  BEARING {}", self.bearing)?;
        writeln!(w, "END VARIOGRAM")?;
        writeln!(w)?;
        Ok(())
    }
}

impl fmt::Display for Variogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "name:{},type:{},contribution:{},a:{},anisotropy:{},bearing:{}",
            self.name,
            self.kind.as_str(),
            self.contribution,
            self.a,
            self.anisotropy,
            self.bearing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spherical_shape() {
        let v = Variogram::spherical(2.0, 100.0).unwrap();
        assert_relative_eq!(v.h_function(0.0), 2.0);
        assert_relative_eq!(v.h_function(100.0), 0.0, epsilon = 1e-12);
        assert_eq!(v.h_function(150.0), 0.0);

        let mut prev = f64::INFINITY;
        for i in 0..=100 {
            let c = v.h_function(i as f64);
            assert!(c <= prev + 1e-15, "not monotone at h={}: {} > {}", i, c, prev);
            prev = c;
        }
    }

    #[test]
    fn test_exponential_and_gaussian() {
        let e = Variogram::exponential(1.0, 10.0).unwrap();
        assert_relative_eq!(e.h_function(10.0), (-1.0f64).exp());
        let g = Variogram::gaussian(3.0, 10.0).unwrap();
        assert_relative_eq!(g.h_function(0.0), 3.0);
        assert_relative_eq!(g.h_function(20.0), 3.0 * (-4.0f64).exp());
        assert_relative_eq!(g.inv_h(0.0), 0.0);
    }

    #[test]
    fn test_validation() {
        assert!(Variogram::spherical(0.0, 1.0).is_err());
        assert!(Variogram::spherical(1.0, -1.0).is_err());
        assert!(Variogram::spherical(1.0, 1.0).unwrap().with_anisotropy(0.0).is_err());
        assert!(VariogramKind::from_code(4).is_err());
        assert_eq!(VariogramKind::from_code(2).unwrap(), VariogramKind::Exponential);
        assert_eq!(VariogramKind::from_sgems("Gaussian").unwrap(), VariogramKind::Gaussian);
    }

    #[test]
    fn test_anisotropy_stretches_minor_axis() {
        // Bearing 0: major axis runs north. θ = 90°, so a pure north offset
        // maps to dxx and an east offset is scaled by the ratio.
        let v = Variogram::exponential(1.0, 10.0)
            .unwrap()
            .with_anisotropy(3.0)
            .unwrap();
        assert_relative_eq!(v.distance(0.0, 5.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(v.distance(5.0, 0.0), 15.0, epsilon = 1e-12);

        let east = v.clone().with_bearing(90.0);
        assert_relative_eq!(east.distance(5.0, 0.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(east.distance(0.0, 5.0), 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_contribution_is_symmetric() {
        let v = Variogram::spherical(1.5, 50.0).unwrap();
        let xs = [0.0, 10.0, 30.0, 80.0];
        let ys = [0.0, 5.0, 20.0, 0.0];
        let names = (0..4).map(|i| format!("p{i}")).collect();
        let mut m = LabeledMatrix::zeros(names).unwrap();
        v.add_to_matrix(&xs, &ys, &mut m).unwrap();

        assert!(m.is_symmetric(0.0));
        for i in 0..4 {
            assert_relative_eq!(m.get(i, i), 1.5);
        }
        assert_relative_eq!(m.get(0, 1), v.covariance((0.0, 0.0), (10.0, 5.0)));
        assert_eq!(m.get(0, 3), 0.0);
    }

    #[test]
    fn test_effective_rescales_range() {
        let v = Variogram::gaussian(1.0, 500.0).unwrap().with_bearing(90.0);
        let e = v.effective(25.0);
        assert_relative_eq!(e.a(), 20.0);
        assert_eq!(e.bearing(), 90.0);
        assert!(e.is_grid_aligned());
        assert!(!v.clone().with_bearing(45.0).is_grid_aligned());
    }
}
