//! Covariance structures: nugget plus nested variograms

use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use surtgeo_core::{Error, LabeledMatrix, Result};

use super::variogram::Variogram;

/// Value-space transform applied by kriging consumers and simulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    None,
    /// Estimation happens in log10 space
    Log,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Log => "log",
        }
    }

    /// Factors-file flag: 0 for none, 1 for log
    pub fn flag(&self) -> u8 {
        match self {
            Transform::None => 0,
            Transform::Log => 1,
        }
    }

    pub fn from_flag(flag: i64) -> Result<Self> {
        match flag {
            0 => Ok(Transform::None),
            1 => Ok(Transform::Log),
            other => Err(Error::Validation(format!("unrecognized transform flag {other}"))),
        }
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Transform::None),
            "log" => Ok(Transform::Log),
            other => Err(Error::Validation(format!(
                "unrecognized transform '{other}' (expected 'none' or 'log')"
            ))),
        }
    }
}

/// A geostatistical structure: nugget plus an ordered list of variograms.
///
/// `sill = nugget + Σ contributions`. Covariances follow the covariance
/// convention, so `covariance(p, p) == sill`.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceStructure {
    name: String,
    nugget: f64,
    variograms: Vec<Variogram>,
    transform: Transform,
}

impl CovarianceStructure {
    pub fn new(nugget: f64, variograms: Vec<Variogram>) -> Result<Self> {
        if !(nugget >= 0.0 && nugget.is_finite()) {
            return Err(Error::Validation(format!("nugget must be non-negative, got {nugget}")));
        }
        Ok(Self {
            name: "struct1".to_string(),
            nugget,
            variograms,
            transform: Transform::None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nugget(&self) -> f64 {
        self.nugget
    }

    pub fn variograms(&self) -> &[Variogram] {
        &self.variograms
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Total variance
    pub fn sill(&self) -> f64 {
        self.nugget + self.variograms.iter().map(|v| v.contribution()).sum::<f64>()
    }

    /// Covariance between two points.
    ///
    /// The nugget is included unconditionally, so two distinct points at
    /// the same location share the full sill.
    pub fn covariance(&self, p0: (f64, f64), p1: (f64, f64)) -> f64 {
        self.nugget + self.variograms.iter().map(|v| v.covariance(p0, p1)).sum::<f64>()
    }

    /// Covariance between `(x0, y0)` and each point of `xs`/`ys`.
    pub fn covariance_points(&self, x0: f64, y0: f64, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let mut out = vec![self.nugget; xs.len()];
        for v in &self.variograms {
            v.add_covariance_points(x0, y0, xs, ys, &mut out);
        }
        out
    }

    /// Point-to-point covariance matrix labelled by `names`.
    pub fn covariance_matrix(&self, xs: &[f64], ys: &[f64], names: Vec<String>) -> Result<LabeledMatrix> {
        let mut cov = LabeledMatrix::zeros(names)?;
        self.add_to_matrix(xs, ys, &mut cov)?;
        Ok(cov)
    }

    /// Accumulate this structure into an existing matrix: nugget on the
    /// diagonal, then each variogram in order.
    pub fn add_to_matrix(&self, xs: &[f64], ys: &[f64], cov: &mut LabeledMatrix) -> Result<()> {
        if xs.len() != cov.len() {
            return Err(Error::Validation(format!(
                "{} coordinates supplied for a {}x{} matrix",
                xs.len(),
                cov.len(),
                cov.len()
            )));
        }
        cov.add_diagonal(self.nugget);
        for v in &self.variograms {
            v.add_to_matrix(xs, ys, cov)?;
        }
        Ok(())
    }

    /// Semivariance at effective distance `h`: nugget plus each
    /// variogram's `c - C(h)`.
    pub fn inv_h(&self, h: f64) -> f64 {
        self.nugget + self.variograms.iter().map(|v| v.inv_h(h)).sum::<f64>()
    }

    /// Replace nugget and per-variogram contributions in place.
    pub fn set_variance(&mut self, nugget: f64, contributions: &[f64]) -> Result<()> {
        if contributions.len() != self.variograms.len() {
            return Err(Error::Validation(format!(
                "{} contributions supplied for {} variograms",
                contributions.len(),
                self.variograms.len()
            )));
        }
        if !(nugget >= 0.0 && nugget.is_finite()) {
            return Err(Error::Validation(format!("nugget must be non-negative, got {nugget}")));
        }
        if let Some(c) = contributions.iter().find(|c| !(**c > 0.0 && c.is_finite())) {
            return Err(Error::Validation(format!("contribution must be positive, got {c}")));
        }
        for (v, c) in self.variograms.iter_mut().zip(contributions) {
            v.set_contribution(*c)?;
        }
        self.nugget = nugget;
        Ok(())
    }

    /// Variograms with ranges expressed in cells of `cell_size`.
    pub fn effective_variograms(&self, cell_size: f64) -> Vec<Variogram> {
        self.variograms.iter().map(|v| v.effective(cell_size)).collect()
    }

    /// Write the `STRUCTURE` block followed by each variogram block.
    pub fn to_struct_file<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "STRUCTURE {}", self.name)?;
        writeln!(w, "  NUGGET {}", self.nugget)?;
        writeln!(w, "  NUMVARIOGRAM {}", self.variograms.len())?;
        for v in &self.variograms {
            writeln!(w, "  VARIOGRAM {} {}", v.name(), v.contribution())?;
        }
        writeln!(w, "  TRANSFORM {}", self.transform.as_str())?;
        writeln!(w, "END STRUCTURE")?;
        writeln!(w)?;
        for v in &self.variograms {
            v.to_struct_file(&mut w)?;
        }
        Ok(())
    }
}

/// Order structures by name.
pub fn by_name(a: &CovarianceStructure, b: &CovarianceStructure) -> Ordering {
    a.name.cmp(&b.name)
}

/// Sort structures in place by name.
pub fn sort_structures(structures: &mut [CovarianceStructure]) {
    structures.sort_by(by_name);
}

impl fmt::Display for CovarianceStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "name:{},nugget:{},transform:{},structures:",
            self.name,
            self.nugget,
            self.transform.as_str()
        )?;
        for v in &self.variograms {
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_nested() -> CovarianceStructure {
        CovarianceStructure::new(
            0.1,
            vec![
                Variogram::spherical(1.0, 500.0).unwrap().with_name("short"),
                Variogram::exponential(0.5, 2000.0)
                    .unwrap()
                    .with_anisotropy(2.5)
                    .unwrap()
                    .with_bearing(30.0)
                    .with_name("long"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_self_covariance_equals_sill() {
        let gs = two_nested();
        assert_relative_eq!(gs.sill(), 1.6);
        for p in [(0.0, 0.0), (123.4, -98.7), (1e6, 2e6)] {
            assert_relative_eq!(gs.covariance(p, p), gs.sill(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_covariance_points_matches_pointwise() {
        let gs = two_nested();
        let xs = [10.0, 300.0, 900.0];
        let ys = [20.0, -40.0, 600.0];
        let cov = gs.covariance_points(5.0, 5.0, &xs, &ys);
        for i in 0..3 {
            assert_relative_eq!(cov[i], gs.covariance((5.0, 5.0), (xs[i], ys[i])), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_matrix_diagonal_is_sill() {
        let gs = two_nested();
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let m = gs.covariance_matrix(&[0.0, 100.0, 250.0], &[0.0, 50.0, 0.0], names).unwrap();
        for i in 0..3 {
            assert_relative_eq!(m.get(i, i), gs.sill(), epsilon = 1e-12);
        }
        assert!(m.is_symmetric(1e-15));
        assert_relative_eq!(
            m.get_by_name("a", "b").unwrap(),
            gs.covariance((0.0, 0.0), (100.0, 50.0)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inv_h_complements_covariance() {
        let gs = two_nested();
        assert_relative_eq!(gs.inv_h(0.0), gs.nugget(), epsilon = 1e-12);
        assert!(gs.inv_h(1e7) <= gs.sill() + 1e-12);
        assert!(gs.inv_h(1e7) > gs.sill() - 1e-6);
    }

    #[test]
    fn test_transform_parsing() {
        assert_eq!("LOG".parse::<Transform>().unwrap(), Transform::Log);
        assert_eq!(" none ".parse::<Transform>().unwrap(), Transform::None);
        assert!(matches!("ln".parse::<Transform>(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_set_variance_validates() {
        let mut gs = two_nested();
        gs.set_variance(0.0, &[2.0, 3.0]).unwrap();
        assert_relative_eq!(gs.sill(), 5.0);
        assert!(gs.set_variance(0.0, &[1.0]).is_err());
        assert!(gs.set_variance(-1.0, &[1.0, 1.0]).is_err());
        assert!(CovarianceStructure::new(-0.1, vec![]).is_err());
    }

    #[test]
    fn test_sort_by_name() {
        let mut v = vec![
            CovarianceStructure::new(0.0, vec![]).unwrap().with_name("zeta"),
            CovarianceStructure::new(0.0, vec![]).unwrap().with_name("alpha"),
        ];
        sort_structures(&mut v);
        assert_eq!(v[0].name(), "alpha");
        assert_eq!(by_name(&v[0], &v[1]), Ordering::Less);
    }
}
