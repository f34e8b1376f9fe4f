//! Grouped grid-parameter ensembles from spectral simulation
//!
//! Each parameter group gets its own variance, derived from the spread of
//! its calibration bounds, and its own per-cell mean from the current
//! parameter values. The simulator's structure is rescaled for each group
//! and restored afterwards, whatever the outcome.

use std::collections::HashMap;

use ndarray::Array2;
use rand::Rng;
use surtgeo_core::{Diagnostics, Error, Raster, Result, Warning};
use tracing::info;

use super::specsim::SpecSim2d;

/// Parameter values and bounds owned by a calibration setup.
pub trait CalibrationContext {
    /// Current value, in arithmetic space
    fn parameter_value(&self, name: &str) -> Option<f64>;

    /// `(lower, upper)` bounds in the parameter's transformed space
    fn transformed_bounds(&self, name: &str) -> Option<(f64, f64)>;
}

/// A parameter tied to one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridParameter {
    pub name: String,
    pub group: String,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EnsembleParams {
    pub num_reals: usize,
    /// Standard deviations spanned by the bounds
    pub sigma_range: f64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            num_reals: 100,
            sigma_range: 6.0,
        }
    }
}

/// Realizations (rows) by parameters (columns).
#[derive(Debug, Clone)]
pub struct ParameterEnsemble {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl ParameterEnsemble {
    pub fn num_reals(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.names.iter().position(|n| n == name)?;
        Some(self.values.column(j).to_vec())
    }
}

/// Draw an ensemble for grid parameters, one simulation pass per group.
///
/// Groups are processed in order of first appearance and their columns are
/// concatenated in that order.
pub fn grid_par_ensemble<C, R>(
    sim: &mut SpecSim2d,
    ctx: &C,
    pars: &[GridParameter],
    params: &EnsembleParams,
    rng: &mut R,
) -> Result<(ParameterEnsemble, Diagnostics)>
where
    C: CalibrationContext + ?Sized,
    R: Rng + ?Sized,
{
    if pars.is_empty() {
        return Err(Error::Validation("no grid parameters supplied".into()));
    }
    if !(params.sigma_range > 0.0) {
        return Err(Error::InvalidParameter {
            name: "sigma_range",
            value: params.sigma_range.to_string(),
            reason: "must be positive".into(),
        });
    }
    let (nrow, ncol) = sim.grid().shape();
    if let Some(p) = pars.iter().find(|p| p.row >= nrow || p.col >= ncol) {
        return Err(Error::Validation(format!(
            "parameter '{}' at ({}, {}) is outside the {nrow}x{ncol} grid",
            p.name, p.row, p.col
        )));
    }

    let mut diagnostics = Diagnostics::new();
    let sill = sim.structure().sill();
    if !(sill > 0.0) {
        return Err(Error::Validation(format!("structure sill must be positive, got {sill}")));
    }
    if sill != 1.0 {
        diagnostics.push(Warning::SillRescaled { from: sill });
    }
    let unit_nugget = sim.structure().nugget() / sill;
    let unit_contribs: Vec<f64> = sim
        .structure()
        .variograms()
        .iter()
        .map(|v| v.contribution() / sill)
        .collect();

    let mut groups: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&GridParameter>> = HashMap::new();
    for p in pars {
        let entry = members.entry(p.group.as_str()).or_default();
        if entry.is_empty() {
            groups.push(p.group.as_str());
        }
        entry.push(p);
    }

    let mut scope = sim.variance_scope();
    let mut names = Vec::with_capacity(pars.len());
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(pars.len());

    for group in groups {
        let gp = &members[group];
        let mut values = Vec::with_capacity(gp.len());
        let mut lower = f64::INFINITY;
        let mut upper = f64::NEG_INFINITY;
        for p in gp {
            let v = ctx
                .parameter_value(&p.name)
                .ok_or_else(|| Error::Validation(format!("no value for parameter '{}'", p.name)))?;
            let (lo, hi) = ctx
                .transformed_bounds(&p.name)
                .ok_or_else(|| Error::Validation(format!("no bounds for parameter '{}'", p.name)))?;
            values.push(v);
            lower = lower.min(lo);
            upper = upper.max(hi);
        }

        let fill = values.iter().sum::<f64>() / values.len() as f64;
        let mut mean = Raster::filled(nrow, ncol, fill);
        for (p, v) in gp.iter().zip(&values) {
            mean.set(p.row, p.col, *v)?;
        }

        let var = ((upper - lower) / params.sigma_range).powi(2);
        if !(var > 0.0) {
            // No spread: every realization is the current value
            info!("group {} has no bound spread, emitting the mean", group);
            for (p, v) in gp.iter().zip(&values) {
                names.push(p.name.clone());
                columns.push(vec![*v; params.num_reals]);
            }
            continue;
        }
        let contribs: Vec<f64> = unit_contribs.iter().map(|c| c * var).collect();
        scope.apply(unit_nugget * var, &contribs)?;
        info!(
            "drawing {} realizations for group {} with {} pars, variance {:.6}",
            params.num_reals,
            group,
            gp.len(),
            var
        );

        let reals = scope.draw(params.num_reals, mean, rng)?;
        for p in gp {
            names.push(p.name.clone());
            columns.push(reals.iter().map(|r| r.data()[(p.row, p.col)]).collect());
        }
    }
    scope.finish()?;

    let values = Array2::from_shape_fn((params.num_reals, columns.len()), |(i, j)| columns[j][i]);
    Ok((ParameterEnsemble { names, values }, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geostats::{CovarianceStructure, Variogram};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use surtgeo_core::StructuredGrid;

    struct Pars(HashMap<String, (f64, f64, f64)>);

    impl CalibrationContext for Pars {
        fn parameter_value(&self, name: &str) -> Option<f64> {
            self.0.get(name).map(|v| v.0)
        }

        fn transformed_bounds(&self, name: &str) -> Option<(f64, f64)> {
            self.0.get(name).map(|v| (v.1, v.2))
        }
    }

    fn setup() -> (SpecSim2d, Pars, Vec<GridParameter>) {
        let gs = CovarianceStructure::new(0.5, vec![Variogram::exponential(1.5, 3.0).unwrap()]).unwrap();
        let sim = SpecSim2d::new(StructuredGrid::uniform(0.0, 0.0, 6, 5, 1.0).unwrap(), gs).unwrap();
        let mut table = HashMap::new();
        let mut pars = Vec::new();
        for (i, (r, c)) in [(0, 0), (1, 2), (4, 5)].into_iter().enumerate() {
            let name = format!("hk{i}");
            table.insert(name.clone(), (10.0, 0.0, 1.2));
            pars.push(GridParameter {
                name,
                group: "hk".into(),
                row: r,
                col: c,
            });
        }
        table.insert("ss0".into(), (1.0e-5, -6.0, -4.0));
        pars.push(GridParameter {
            name: "ss0".into(),
            group: "ss".into(),
            row: 2,
            col: 2,
        });
        (sim, Pars(table), pars)
    }

    #[test]
    fn test_groups_and_restore() {
        let (mut sim, ctx, pars) = setup();
        let params = EnsembleParams {
            num_reals: 4,
            ..Default::default()
        };
        let (pe, diag) = grid_par_ensemble(&mut sim, &ctx, &pars, &params, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(pe.names, vec!["hk0", "hk1", "hk2", "ss0"]);
        assert_eq!(pe.values.dim(), (4, 4));
        assert!(pe.values.iter().all(|v| v.is_finite()));
        assert!(matches!(diag.warnings()[0], Warning::SillRescaled { from } if from == 2.0));

        assert_eq!(sim.structure().nugget(), 0.5);
        assert_eq!(sim.structure().variograms()[0].contribution(), 1.5);
    }

    #[test]
    fn test_restores_on_failure() {
        let (mut sim, mut ctx, pars) = setup();
        // the second group fails after the first has rescaled the structure
        ctx.0.remove("ss0");
        let params = EnsembleParams {
            num_reals: 2,
            ..Default::default()
        };
        assert!(grid_par_ensemble(&mut sim, &ctx, &pars, &params, &mut StdRng::seed_from_u64(1)).is_err());
        assert_eq!(sim.structure().sill(), 2.0);
    }

    #[test]
    fn test_zero_spread_group_emits_mean() {
        let (mut sim, mut ctx, pars) = setup();
        ctx.0.insert("ss0".into(), (1.0e-5, -5.0, -5.0));
        let params = EnsembleParams {
            num_reals: 3,
            ..Default::default()
        };
        let (pe, _) = grid_par_ensemble(&mut sim, &ctx, &pars, &params, &mut StdRng::seed_from_u64(1)).unwrap();
        let ss = pe.column("ss0").unwrap();
        assert_eq!(ss.len(), 3);
        assert!(ss.iter().all(|v| *v == 1.0e-5));
        assert!(pe.column("hk0").unwrap().iter().any(|v| *v != 10.0));
        assert_eq!(sim.structure().sill(), 2.0);
    }

    #[test]
    fn test_out_of_grid_parameter() {
        let (mut sim, ctx, mut pars) = setup();
        pars[0].row = 50;
        let params = EnsembleParams::default();
        assert!(grid_par_ensemble(&mut sim, &ctx, &pars, &params, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
