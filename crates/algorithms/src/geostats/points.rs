//! Conditioning point registry
//!
//! Points live in an arena addressed by a stable integer id (their position
//! after validation); a name→id map resolves labels. Coordinates are kept
//! in parallel vectors so covariance kernels can run on plain slices.

use std::collections::HashMap;

use surtgeo_core::{Diagnostics, Error, Result, Warning, EPSILON};

/// A named conditioning location.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub zone: Option<i32>,
}

impl Point {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            zone: None,
        }
    }

    pub fn with_zone(mut self, zone: i32) -> Self {
        self.zone = Some(zone);
        self
    }
}

/// Close-pair handling during registry construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCheck {
    /// Drop the later point of every pair closer than `EPSILON`
    pub rectify: bool,
}

/// Validated, immutable set of conditioning points.
#[derive(Debug, Clone)]
pub struct PointRegistry {
    names: Vec<String>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    zones: Vec<Option<i32>>,
    ids: HashMap<String, usize>,
}

impl PointRegistry {
    /// Build a registry, collapsing consistent duplicates and checking for
    /// near-coincident pairs.
    ///
    /// Entries sharing a name must share coordinates, otherwise the call
    /// fails with [`Error::DuplicatePoint`].
    pub fn new(points: Vec<Point>, check: PointCheck) -> Result<(Self, Diagnostics)> {
        let mut diagnostics = Diagnostics::new();
        let unique = collapse_duplicates(points, &mut diagnostics)?;

        let mut registry = Self::from_unique(unique);
        let dropped = registry.check_point_data_dist(check.rectify, &mut diagnostics);
        if !dropped.is_empty() {
            diagnostics.push(Warning::PointsDropped { names: dropped });
        }
        Ok((registry, diagnostics))
    }

    fn from_unique(points: Vec<Point>) -> Self {
        let mut names = Vec::with_capacity(points.len());
        let mut xs = Vec::with_capacity(points.len());
        let mut ys = Vec::with_capacity(points.len());
        let mut zones = Vec::with_capacity(points.len());
        let mut ids = HashMap::with_capacity(points.len());
        for (i, p) in points.into_iter().enumerate() {
            ids.insert(p.name.clone(), i);
            names.push(p.name);
            xs.push(p.x);
            ys.push(p.y);
            zones.push(p.zone);
        }
        Self {
            names,
            xs,
            ys,
            zones,
            ids,
        }
    }

    /// Warn about every pair of points closer than `EPSILON`. With
    /// `rectify`, the later point of each pair is removed and the removed
    /// names are returned.
    pub fn check_point_data_dist(&mut self, rectify: bool, diagnostics: &mut Diagnostics) -> Vec<String> {
        let n = self.len();
        let mut drop = vec![false; n];
        for i in 0..n {
            if drop[i] {
                continue;
            }
            for j in (i + 1)..n {
                if drop[j] {
                    continue;
                }
                let dx = self.xs[i] - self.xs[j];
                let dy = self.ys[i] - self.ys[j];
                let d = (dx * dx + dy * dy).sqrt();
                if d <= EPSILON {
                    diagnostics.push(Warning::PointsTooClose {
                        first: self.names[i].clone(),
                        second: self.names[j].clone(),
                        distance: d,
                    });
                    if rectify {
                        drop[j] = true;
                    }
                }
            }
        }
        if !drop.iter().any(|d| *d) {
            return Vec::new();
        }

        let mut kept = Vec::with_capacity(n);
        let mut dropped = Vec::new();
        for (i, gone) in drop.into_iter().enumerate() {
            let p = Point {
                name: std::mem::take(&mut self.names[i]),
                x: self.xs[i],
                y: self.ys[i],
                zone: self.zones[i],
            };
            if gone {
                dropped.push(p.name);
            } else {
                kept.push(p);
            }
        }
        *self = Self::from_unique(kept);
        dropped
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn zones(&self) -> &[Option<i32>] {
        &self.zones
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn has_zones(&self) -> bool {
        self.zones.iter().any(|z| z.is_some())
    }

    /// Distinct zone tags in order of first appearance (untagged points
    /// count as zone 1).
    pub fn distinct_zones(&self) -> Vec<i32> {
        let mut out: Vec<i32> = Vec::new();
        for z in &self.zones {
            let z = z.unwrap_or(1);
            if !out.contains(&z) {
                out.push(z);
            }
        }
        out
    }

    /// Ids of points in `zone` (untagged points count as zone 1).
    pub fn ids_in_zone(&self, zone: i32) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.zones[i].unwrap_or(1) == zone).collect()
    }

    pub fn point(&self, id: usize) -> Option<Point> {
        (id < self.len()).then(|| Point {
            name: self.names[id].clone(),
            x: self.xs[id],
            y: self.ys[id],
            zone: self.zones[id],
        })
    }
}

/// Group entries by name: identical coordinates collapse to the first
/// entry, anything else is fatal. First-appearance order is preserved.
fn collapse_duplicates(points: Vec<Point>, diagnostics: &mut Diagnostics) -> Result<Vec<Point>> {
    let mut first: HashMap<String, usize> = HashMap::with_capacity(points.len());
    let mut counts: Vec<usize> = Vec::with_capacity(points.len());
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());

    for p in points {
        match first.get(&p.name) {
            Some(&i) => {
                let kept = &unique[i];
                if kept.x != p.x || kept.y != p.y {
                    return Err(Error::DuplicatePoint { name: p.name });
                }
                counts[i] += 1;
            }
            None => {
                first.insert(p.name.clone(), unique.len());
                counts.push(1);
                unique.push(p);
            }
        }
    }

    for (p, &count) in unique.iter().zip(&counts) {
        if count > 1 {
            tracing::debug!("collapsing {count} entries for point '{}'", p.name);
            diagnostics.push(Warning::DuplicatePointsCollapsed {
                name: p.name.clone(),
                count,
            });
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_duplicates_collapse() {
        let pts = vec![
            Point::new("a", 0.0, 0.0),
            Point::new("b", 10.0, 0.0),
            Point::new("a", 0.0, 0.0),
        ];
        let (reg, diag) = PointRegistry::new(pts, PointCheck::default()).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(reg.id_of("b"), Some(1));
        assert!(matches!(
            diag.warnings()[0],
            Warning::DuplicatePointsCollapsed { count: 2, .. }
        ));
    }

    #[test]
    fn test_conflicting_duplicates_fail() {
        let pts = vec![Point::new("a", 0.0, 0.0), Point::new("a", 0.0, 1.0)];
        let err = PointRegistry::new(pts, PointCheck::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicatePoint { ref name } if name == "a"));
    }

    #[test]
    fn test_close_points_warn_and_rectify() {
        let pts = vec![
            Point::new("a", 0.0, 0.0),
            Point::new("b", 0.0, 1e-9),
            Point::new("c", 5.0, 5.0),
        ];
        let (reg, diag) = PointRegistry::new(pts.clone(), PointCheck::default()).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(diag.len(), 1);

        let (reg, diag) = PointRegistry::new(pts, PointCheck { rectify: true }).unwrap();
        assert_eq!(reg.names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(reg.id_of("c"), Some(1));
        assert!(diag
            .iter()
            .any(|w| matches!(w, Warning::PointsDropped { names } if names == &["b".to_string()])));
    }

    #[test]
    fn test_zones() {
        let pts = vec![
            Point::new("a", 0.0, 0.0).with_zone(3),
            Point::new("b", 1.0, 0.0),
            Point::new("c", 2.0, 0.0).with_zone(3),
        ];
        let (reg, _) = PointRegistry::new(pts, PointCheck::default()).unwrap();
        assert!(reg.has_zones());
        assert_eq!(reg.distinct_zones(), vec![3, 1]);
        assert_eq!(reg.ids_in_zone(3), vec![0, 2]);
        assert_eq!(reg.ids_in_zone(1), vec![1]);
    }
}
