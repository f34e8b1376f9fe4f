//! Ordinary kriging factors
//!
//! Computes, for each target location, the weights that the best linear
//! unbiased estimator assigns to nearby conditioning points. Weights are
//! value-independent, so one batch can be applied to many parameter sets
//! (see [`super::factors`]).
//!
//! The system for k neighbours uses covariances:
//! ```text
//! [C(x₁,x₁) ... C(x₁,xₖ) 1] [w₁]   [C(x₁,x₀)]
//! [   ...     ...    ...  .] [. ] = [   ...   ]
//! [C(xₖ,x₁) ... C(xₖ,xₖ) 1] [wₖ]   [C(xₖ,x₀)]
//! [  1       ...    1     0] [λ ]   [    1    ]
//! ```
//! and the error variance is `σ² = sill + λ - Σ wᵢ·C(xᵢ,x₀)`.
//!
//! Neighbour search uses plain Euclidean distance; anisotropy only enters
//! through the covariances.
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use std::io::Write;
use std::time::Instant;

use ndarray::{Array1, Array2};
use surtgeo_core::io::{write_array, ArrayDelimiter};
use surtgeo_core::{Diagnostics, Error, LabeledMatrix, Raster, Result, StructuredGrid, Warning, EPSILON};
use surtgeo_parallel::{run_indexed, ProcessingMode};
use tracing::{debug, info};

use super::points::{Point, PointCheck, PointRegistry};
use super::solve::{solve, SingularMatrix};
use super::structure::{CovarianceStructure, Transform};

/// Search and execution parameters for a kriging batch
#[derive(Debug, Clone)]
pub struct KrigingParams {
    /// Targets with fewer candidates inside the radius are left unestimated
    pub min_points: usize,
    /// Nearest candidates kept per target
    pub max_points: usize,
    pub search_radius: f64,
    /// Record solve failures as unestimated targets instead of failing
    pub forgive: bool,
    pub mode: ProcessingMode,
}

impl Default for KrigingParams {
    fn default() -> Self {
        Self {
            min_points: 1,
            max_points: 20,
            search_radius: 1.0e10,
            forgive: false,
            mode: ProcessingMode::Sequential,
        }
    }
}

/// A conditioning point used for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub point: String,
    pub distance: f64,
    pub weight: f64,
}

/// Kriging outcome for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct KrigingResult {
    /// Position of the target in the caller's input (cell index for grids)
    pub index: usize,
    pub x: f64,
    pub y: f64,
    /// Neighbours sorted by ascending distance; empty when unestimated
    pub neighbors: Vec<Neighbor>,
    pub err_var: f64,
}

impl KrigingResult {
    pub fn is_estimated(&self) -> bool {
        !self.neighbors.is_empty()
    }

    /// Weighted sum of `value(point)` over the neighbours.
    pub fn estimate<F: Fn(&str) -> Option<f64>>(&self, value: F) -> Option<f64> {
        if self.neighbors.is_empty() {
            return None;
        }
        self.neighbors
            .iter()
            .map(|n| value(&n.point).map(|v| v * n.weight))
            .sum()
    }
}

/// Results of one `calc_factors*` call.
#[derive(Debug, Clone)]
pub struct KrigingBatch {
    pub results: Vec<KrigingResult>,
    /// Registry order of the conditioning points
    pub point_names: Vec<String>,
    pub transform: Transform,
    pub diagnostics: Diagnostics,
}

impl KrigingBatch {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn num_estimated(&self) -> usize {
        self.results.iter().filter(|r| r.is_estimated()).count()
    }
}

/// Kriging over the cells of a structured grid.
#[derive(Debug, Clone)]
pub struct GridKriging {
    /// Results indexed by row-major cell index
    pub batch: KrigingBatch,
    pub nrow: usize,
    pub ncol: usize,
    /// Error variance per cell, NaN where no target was evaluated
    pub variance: Raster,
}

impl GridKriging {
    /// Write the variance grid as a space-delimited `%15.6E` array.
    pub fn write_variance<W: Write>(&self, w: W) -> Result<()> {
        write_array(w, self.variance.data(), ArrayDelimiter::Space)
    }
}

type TargetOutcome = std::result::Result<(Vec<Neighbor>, f64), SingularMatrix>;

struct Job<'a> {
    index: usize,
    x: f64,
    y: f64,
    candidates: &'a [usize],
}

/// Ordinary kriging engine over a validated point set.
///
/// The point-to-point covariance matrix is built once and shared read-only
/// by every target of every batch.
#[derive(Debug, Clone)]
pub struct OrdinaryKrige {
    structure: CovarianceStructure,
    points: PointRegistry,
    point_cov: LabeledMatrix,
    diagnostics: Diagnostics,
}

impl OrdinaryKrige {
    /// Validate `points` and precompute their covariance matrix.
    ///
    /// # Errors
    /// - [`Error::DuplicatePoint`] for a name with conflicting coordinates
    /// - [`Error::Validation`] for an empty point set
    pub fn new(structure: CovarianceStructure, points: Vec<Point>, check: PointCheck) -> Result<Self> {
        let (points, diagnostics) = PointRegistry::new(points, check)?;
        if points.is_empty() {
            return Err(Error::Validation("kriging requires at least one point".into()));
        }
        let point_cov = structure.covariance_matrix(points.xs(), points.ys(), points.names().to_vec())?;
        debug!("point covariance matrix built for {} points", points.len());
        Ok(Self {
            structure,
            points,
            point_cov,
            diagnostics,
        })
    }

    pub fn structure(&self) -> &CovarianceStructure {
        &self.structure
    }

    pub fn points(&self) -> &PointRegistry {
        &self.points
    }

    pub fn point_cov(&self) -> &LabeledMatrix {
        &self.point_cov
    }

    /// Warnings raised while validating the point set
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Re-run the close-pair check. Rectifying drops the later point of each
    /// close pair and rebuilds the covariance matrix.
    pub fn check_point_data_dist(&mut self, rectify: bool) -> Result<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let dropped = self.points.check_point_data_dist(rectify, &mut diagnostics);
        if !dropped.is_empty() {
            diagnostics.push(Warning::PointsDropped { names: dropped });
            self.point_cov = self.structure.covariance_matrix(
                self.points.xs(),
                self.points.ys(),
                self.points.names().to_vec(),
            )?;
        }
        Ok(diagnostics)
    }

    /// Kriging factors for arbitrary targets using every point.
    ///
    /// NaN coordinates mark targets to skip: they yield no neighbours and a
    /// NaN error variance.
    pub fn calc_factors(&self, xs: &[f64], ys: &[f64], params: &KrigingParams) -> Result<KrigingBatch> {
        check_targets(xs, ys)?;
        let all: Vec<usize> = (0..self.points.len()).collect();
        let jobs: Vec<Job<'_>> = xs
            .iter()
            .zip(ys)
            .enumerate()
            .map(|(index, (&x, &y))| Job {
                index,
                x,
                y,
                candidates: &all,
            })
            .collect();

        let mut diagnostics = Diagnostics::new();
        let results = self.run_batch(&jobs, params, &mut diagnostics)?;
        Ok(self.batch(results, diagnostics))
    }

    /// Kriging factors with per-target zones: each target only sees points
    /// of its own zone (untagged points count as zone 1).
    ///
    /// Zones with no points are skipped with a warning. Passes run in
    /// order of first appearance and their results are concatenated.
    pub fn calc_factors_zoned(
        &self,
        xs: &[f64],
        ys: &[f64],
        zones: &[i32],
        params: &KrigingParams,
    ) -> Result<KrigingBatch> {
        check_targets(xs, ys)?;
        if zones.len() != xs.len() {
            return Err(Error::Validation(format!(
                "{} zones supplied for {} targets",
                zones.len(),
                xs.len()
            )));
        }

        let mut diagnostics = Diagnostics::new();
        let mut order: Vec<i32> = Vec::new();
        for z in zones {
            if !order.contains(z) {
                order.push(*z);
            }
        }

        let mut results = Vec::with_capacity(xs.len());
        for zone in order {
            let candidates = self.points.ids_in_zone(zone);
            let members: Vec<usize> = (0..xs.len()).filter(|&i| zones[i] == zone).collect();
            if candidates.is_empty() {
                diagnostics.push(Warning::ZoneWithoutPoints {
                    zone,
                    targets: members.len(),
                });
                continue;
            }
            let jobs: Vec<Job<'_>> = members
                .into_iter()
                .map(|i| Job {
                    index: i,
                    x: xs[i],
                    y: ys[i],
                    candidates: &candidates,
                })
                .collect();
            debug!("zone {zone}: {} targets, {} points", jobs.len(), candidates.len());
            results.extend(self.run_batch(&jobs, params, &mut diagnostics)?);
        }
        Ok(self.batch(results, diagnostics))
    }

    /// Kriging factors for every cell center of `grid`.
    ///
    /// With a zone array, each point zone is kriged over the cells carrying
    /// that zone value; points without zones are treated as zone 1. Point
    /// zones that never occur in the array are skipped with a warning.
    ///
    /// # Errors
    /// - [`Error::InvalidDimensions`] if the zone array does not match the grid
    /// - [`Error::Validation`] if no cell could be estimated
    pub fn calc_factors_grid(
        &self,
        grid: &StructuredGrid,
        zone_array: Option<&Array2<i32>>,
        params: &KrigingParams,
    ) -> Result<GridKriging> {
        let (nrow, ncol) = grid.shape();
        let centers = grid.cell_centers();
        let all: Vec<usize> = (0..self.points.len()).collect();
        let mut diagnostics = Diagnostics::new();
        let mut results = Vec::with_capacity(centers.len());

        match zone_array {
            None => {
                let jobs = cell_jobs(&centers, |_| true, &all);
                results = self.run_batch(&jobs, params, &mut diagnostics)?;
            }
            Some(zarr) => {
                if zarr.dim() != (nrow, ncol) {
                    return Err(Error::InvalidDimensions {
                        ncol: zarr.ncols(),
                        nrow: zarr.nrows(),
                    });
                }
                if !self.points.has_zones() {
                    diagnostics.push(Warning::MissingPointZones);
                }
                let flat: Vec<i32> = zarr.iter().copied().collect();
                for zone in self.points.distinct_zones() {
                    if !flat.contains(&zone) {
                        diagnostics.push(Warning::UnmatchedZone { zone });
                        continue;
                    }
                    let candidates = self.points.ids_in_zone(zone);
                    let jobs = cell_jobs(&centers, |i| flat[i] == zone, &candidates);
                    debug!("zone {zone}: {} cells, {} points", jobs.len(), candidates.len());
                    results.extend(self.run_batch(&jobs, params, &mut diagnostics)?);
                }
            }
        }

        if !results.iter().any(|r| r.is_estimated()) {
            return Err(Error::Validation(
                "no interpolation took place, check the search radius and zones".into(),
            ));
        }

        let mut variance = Raster::filled(nrow, ncol, f64::NAN);
        for r in &results {
            variance.set(r.index / ncol, r.index % ncol, r.err_var)?;
        }

        Ok(GridKriging {
            batch: self.batch(results, diagnostics),
            nrow,
            ncol,
            variance,
        })
    }

    fn batch(&self, results: Vec<KrigingResult>, diagnostics: Diagnostics) -> KrigingBatch {
        KrigingBatch {
            results,
            point_names: self.points.names().to_vec(),
            transform: self.structure.transform(),
            diagnostics,
        }
    }

    /// Evaluate every job, on the worker pool when the mode asks for it.
    fn run_batch(
        &self,
        jobs: &[Job<'_>],
        params: &KrigingParams,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<KrigingResult>> {
        let start = Instant::now();
        let threads = params.mode.threads();
        info!("starting kriging of {} targets on {} worker(s)", jobs.len(), threads);

        let mut slots: Vec<TargetOutcome> = (0..jobs.len()).map(|_| Ok((Vec::new(), f64::NAN))).collect();
        run_indexed(threads, jobs, &mut slots, |_, job| self.krige_target(job, params));

        let mut results = Vec::with_capacity(jobs.len());
        for (job, outcome) in jobs.iter().zip(slots) {
            let (neighbors, err_var) = match outcome {
                Ok(v) => v,
                Err(e) if params.forgive => {
                    diagnostics.push(Warning::SolveFailed {
                        index: job.index,
                        x: job.x,
                        y: job.y,
                        reason: e.to_string(),
                    });
                    (Vec::new(), f64::NAN)
                }
                Err(e) => {
                    return Err(Error::SingularSystem {
                        index: job.index,
                        x: job.x,
                        y: job.y,
                        reason: e.to_string(),
                    });
                }
            };
            results.push(KrigingResult {
                index: job.index,
                x: job.x,
                y: job.y,
                neighbors,
                err_var,
            });
        }

        info!(
            "kriged {} targets in {:.3}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    /// The per-target routine shared by the sequential and pooled paths.
    fn krige_target(&self, job: &Job<'_>, params: &KrigingParams) -> TargetOutcome {
        let (x, y) = (job.x, job.y);
        if x.is_nan() || y.is_nan() {
            return Ok((Vec::new(), f64::NAN));
        }

        let xs = self.points.xs();
        let ys = self.points.ys();
        let radius_sq = params.search_radius * params.search_radius;

        let mut near: Vec<(usize, f64)> = job
            .candidates
            .iter()
            .map(|&id| {
                let dx = xs[id] - x;
                let dy = ys[id] - y;
                (id, dx * dx + dy * dy)
            })
            .filter(|(_, d2)| *d2 <= radius_sq)
            .collect();
        near.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        if near.len() < params.min_points.max(1) {
            return Ok((Vec::new(), self.structure.sill()));
        }
        near.truncate(params.max_points.max(1));

        let names = self.points.names();
        let nearest = near[0];
        if nearest.1.sqrt() <= EPSILON {
            let exact = Neighbor {
                point: names[nearest.0].clone(),
                distance: EPSILON,
                weight: 1.0,
            };
            return Ok((vec![exact], self.structure.nugget()));
        }

        let ids: Vec<usize> = near.iter().map(|(id, _)| *id).collect();
        let k = ids.len();
        let nx: Vec<f64> = ids.iter().map(|&i| xs[i]).collect();
        let ny: Vec<f64> = ids.iter().map(|&i| ys[i]).collect();
        let rhs_cov = self.structure.covariance_points(x, y, &nx, &ny);

        // Solved in units of the sill; λ is rescaled after the solve
        let sill = self.structure.sill();
        let scale = if sill > 0.0 { sill } else { 1.0 };
        let sub = self.point_cov.submatrix(&ids);
        let mut a = Array2::<f64>::ones((k + 1, k + 1));
        a.slice_mut(ndarray::s![..k, ..k]).assign(&(sub / scale));
        a[(k, k)] = 0.0;
        let mut b = Array1::<f64>::ones(k + 1);
        for (i, c) in rhs_cov.iter().enumerate() {
            b[i] = *c / scale;
        }

        let w = solve(a, b)?;
        let lambda = w[k] * scale;
        let explained: f64 = (0..k).map(|i| w[i] * rhs_cov[i]).sum();
        let err_var = sill + lambda - explained;

        let neighbors = near
            .iter()
            .zip(w.iter())
            .map(|(&(id, d2), &weight)| Neighbor {
                point: names[id].clone(),
                distance: d2.sqrt(),
                weight,
            })
            .collect();
        Ok((neighbors, err_var))
    }
}

fn check_targets(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(Error::Validation(format!(
            "target x ({}) and y ({}) lengths differ",
            xs.len(),
            ys.len()
        )));
    }
    Ok(())
}

fn cell_jobs<'a, F: Fn(usize) -> bool>(centers: &[(f64, f64)], keep: F, candidates: &'a [usize]) -> Vec<Job<'a>> {
    centers
        .iter()
        .enumerate()
        .filter(|(i, _)| keep(*i))
        .map(|(index, &(x, y))| Job {
            index,
            x,
            y,
            candidates,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geostats::variogram::Variogram;
    use approx::assert_relative_eq;

    fn generate_points(n: usize, seed: u64) -> Vec<Point> {
        let mut points = Vec::with_capacity(n);
        let mut rng = seed;
        for i in 0..n {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = (rng >> 33) as f64 / (1u64 << 31) as f64 * 1000.0;
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let y = (rng >> 33) as f64 / (1u64 << 31) as f64 * 1000.0;
            points.push(Point::new(format!("pp{i}"), x, y));
        }
        points
    }

    fn structure(nugget: f64) -> CovarianceStructure {
        CovarianceStructure::new(
            nugget,
            vec![Variogram::exponential(1.0, 300.0)
                .unwrap()
                .with_anisotropy(2.0)
                .unwrap()
                .with_bearing(45.0)],
        )
        .unwrap()
    }

    fn targets(n: usize) -> (Vec<f64>, Vec<f64>) {
        let xs = (0..n).map(|i| 25.0 + (i % 10) as f64 * 95.0).collect();
        let ys = (0..n).map(|i| 40.0 + (i / 10) as f64 * 90.0).collect();
        (xs, ys)
    }

    #[test]
    fn test_weights_sum_to_one_and_sorted() {
        let ok = OrdinaryKrige::new(structure(0.1), generate_points(40, 7), PointCheck::default()).unwrap();
        let (xs, ys) = targets(30);
        let params = KrigingParams {
            max_points: 12,
            ..Default::default()
        };
        let batch = ok.calc_factors(&xs, &ys, &params).unwrap();
        assert_eq!(batch.len(), 30);
        for r in &batch.results {
            assert_eq!(r.neighbors.len(), 12);
            let total: f64 = r.neighbors.iter().map(|n| n.weight).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
            assert!(r.neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert!(r.err_var > 0.0 && r.err_var <= ok.structure().sill() * 2.0);
        }
    }

    #[test]
    fn test_weights_independent_of_sill_magnitude() {
        let square = || {
            vec![
                Point::new("a", 0.0, 0.0),
                Point::new("b", 100.0, 0.0),
                Point::new("c", 0.0, 100.0),
                Point::new("d", 100.0, 100.0),
            ]
        };
        let krige = |c: f64| {
            let gs = CovarianceStructure::new(0.0, vec![Variogram::exponential(c, 1000.0).unwrap()]).unwrap();
            let ok = OrdinaryKrige::new(gs, square(), PointCheck::default()).unwrap();
            ok.calc_factors(&[30.0], &[40.0], &KrigingParams::default())
                .unwrap()
                .results
                .remove(0)
        };

        let unit = krige(1.0);
        assert_eq!(unit.neighbors.len(), 4);
        for c in [1e-6, 1e-11, 1e-13] {
            let small = krige(c);
            assert_eq!(small.neighbors.len(), 4, "contribution {c}");
            for (u, s) in unit.neighbors.iter().zip(&small.neighbors) {
                assert_eq!(u.point, s.point);
                assert_relative_eq!(u.weight, s.weight, epsilon = 1e-9);
            }
            assert_relative_eq!(small.err_var, unit.err_var * c, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_exact_match_shortcut() {
        let ok = OrdinaryKrige::new(structure(0.25), generate_points(10, 3), PointCheck::default()).unwrap();
        let p = ok.points().point(4).unwrap();
        let batch = ok.calc_factors(&[p.x], &[p.y], &KrigingParams::default()).unwrap();
        let r = &batch.results[0];
        assert_eq!(r.neighbors.len(), 1);
        assert_eq!(r.neighbors[0].point, p.name);
        assert_eq!(r.neighbors[0].weight, 1.0);
        assert_eq!(r.err_var, 0.25);
    }

    #[test]
    fn test_deterministic() {
        let ok = OrdinaryKrige::new(structure(0.0), generate_points(25, 11), PointCheck::default()).unwrap();
        let (xs, ys) = targets(20);
        let params = KrigingParams::default();
        let a = ok.calc_factors(&xs, &ys, &params).unwrap();
        let b = ok.calc_factors(&xs, &ys, &params).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ok = OrdinaryKrige::new(structure(0.05), generate_points(60, 21), PointCheck::default()).unwrap();
        let (xs, ys) = targets(50);
        let seq = ok.calc_factors(&xs, &ys, &KrigingParams::default()).unwrap();
        let par = ok
            .calc_factors(
                &xs,
                &ys,
                &KrigingParams {
                    mode: ProcessingMode::ParallelWith(4),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(seq.len(), par.len());
        for (s, p) in seq.results.iter().zip(&par.results) {
            assert_eq!(s.index, p.index);
            assert_eq!(s.neighbors.len(), p.neighbors.len());
            for (a, b) in s.neighbors.iter().zip(&p.neighbors) {
                assert_eq!(a.point, b.point);
                assert_relative_eq!(a.weight, b.weight, epsilon = 1e-12);
            }
            assert_relative_eq!(s.err_var, p.err_var, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nan_targets_and_min_points() {
        let ok = OrdinaryKrige::new(structure(0.1), generate_points(10, 5), PointCheck::default()).unwrap();
        let params = KrigingParams {
            min_points: 3,
            search_radius: 50.0,
            ..Default::default()
        };
        let batch = ok
            .calc_factors(&[f64::NAN, -1.0e5], &[0.0, -1.0e5], &params)
            .unwrap();
        assert!(!batch.results[0].is_estimated());
        assert!(batch.results[0].err_var.is_nan());
        assert!(!batch.results[1].is_estimated());
        assert_relative_eq!(batch.results[1].err_var, ok.structure().sill());
    }

    #[test]
    fn test_coincident_points_fail_or_forgive() {
        // Same location under two names: singular unless the target is exact
        let pts = vec![
            Point::new("a", 0.0, 0.0),
            Point::new("b", 0.0, 0.0),
            Point::new("c", 100.0, 0.0),
        ];
        let ok = OrdinaryKrige::new(structure(0.0), pts, PointCheck::default()).unwrap();
        assert_eq!(ok.diagnostics().len(), 1);

        let err = ok.calc_factors(&[50.0], &[10.0], &KrigingParams::default()).unwrap_err();
        assert!(matches!(err, Error::SingularSystem { index: 0, .. }));

        let params = KrigingParams {
            forgive: true,
            ..Default::default()
        };
        let batch = ok.calc_factors(&[50.0, 100.0], &[10.0, 0.0], &params).unwrap();
        assert!(!batch.results[0].is_estimated());
        assert!(batch.results[0].err_var.is_nan());
        assert!(batch.results[1].is_estimated());
        assert_eq!(batch.diagnostics.len(), 1);
    }

    #[test]
    fn test_zoned_targets() {
        let pts = vec![
            Point::new("w1", 0.0, 0.0).with_zone(1),
            Point::new("w2", 0.0, 100.0).with_zone(1),
            Point::new("e1", 200.0, 0.0).with_zone(2),
            Point::new("e2", 200.0, 100.0).with_zone(2),
        ];
        let ok = OrdinaryKrige::new(structure(0.0), pts, PointCheck::default()).unwrap();
        let batch = ok
            .calc_factors_zoned(
                &[10.0, 190.0, 50.0, 60.0],
                &[50.0, 50.0, 50.0, 50.0],
                &[1, 2, 1, 7],
                &KrigingParams::default(),
            )
            .unwrap();
        let idx: Vec<usize> = batch.results.iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![0, 2, 1]);
        assert!(batch.results[0].neighbors.iter().all(|n| n.point.starts_with('w')));
        assert!(batch.results[2].neighbors.iter().all(|n| n.point.starts_with('e')));
        assert!(matches!(
            batch.diagnostics.warnings()[0],
            Warning::ZoneWithoutPoints { zone: 7, targets: 1 }
        ));
    }

    #[test]
    fn test_grid_with_zone_array() {
        let pts = vec![
            Point::new("a", 5.0, 35.0).with_zone(1),
            Point::new("b", 15.0, 25.0).with_zone(1),
            Point::new("c", 35.0, 5.0).with_zone(2),
            Point::new("d", 25.0, 15.0).with_zone(2),
            Point::new("z", 0.0, 0.0).with_zone(9),
        ];
        let ok = OrdinaryKrige::new(structure(0.0), pts, PointCheck::default()).unwrap();
        let grid = StructuredGrid::uniform(0.0, 40.0, 4, 4, 10.0).unwrap();
        let zones = Array2::from_shape_fn((4, 4), |(r, _)| if r < 2 { 1 } else { 2 });
        let gk = ok
            .calc_factors_grid(&grid, Some(&zones), &KrigingParams::default())
            .unwrap();

        assert_eq!(gk.batch.len(), 16);
        for r in &gk.batch.results {
            let zone = if r.index / 4 < 2 { 1 } else { 2 };
            let allowed: &[&str] = if zone == 1 { &["a", "b"] } else { &["c", "d"] };
            assert!(r.neighbors.iter().all(|n| allowed.contains(&n.point.as_str())));
        }
        assert!(gk
            .batch
            .diagnostics
            .iter()
            .any(|w| matches!(w, Warning::UnmatchedZone { zone: 9 })));
        assert!(gk.variance.data().iter().all(|v| v.is_finite()));
        // cell (0,0) center is point "a"
        assert_eq!(gk.variance.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_grid_fails_when_nothing_estimated() {
        let ok = OrdinaryKrige::new(structure(0.0), generate_points(5, 1), PointCheck::default()).unwrap();
        let grid = StructuredGrid::uniform(1.0e6, 1.0e6, 3, 3, 1.0).unwrap();
        let params = KrigingParams {
            search_radius: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            ok.calc_factors_grid(&grid, None, &params),
            Err(Error::Validation(_))
        ));
    }
}
