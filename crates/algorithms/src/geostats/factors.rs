//! Kriging factors files and grid reconstruction (`fac2real`)
//!
//! Layout, one item per line:
//! ```text
//! <points file>
//! <zone file>
//! <ncol> <nrow>
//! <npp>
//! <point name>            (npp lines, index order)
//! <node> <t> <n> 0.00000e+00 <pt> <w> <pt> <w> ...
//! ```
//! Nodes and point indices are 1-based; nodes are row-major
//! (`node = (row-1)·ncol + col`). `t` is 1 for log10-space estimation.
//! Weights use `%12.8g`. Only estimated nodes are written.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use surtgeo_core::io::{format_exp, format_general, write_array, ArrayDelimiter};
use surtgeo_core::{Error, Raster, Result};
use tracing::debug;

use super::kriging::{GridKriging, KrigingBatch};
use super::structure::Transform;

/// One estimated grid node.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorNode {
    /// 1-based row-major node index
    pub node: usize,
    pub transform: Transform,
    /// `(0-based point index, weight)` pairs
    pub factors: Vec<(usize, f64)>,
}

/// In-memory form of a factors file.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorsRecord {
    pub points_file: String,
    pub zone_file: String,
    pub ncol: usize,
    pub nrow: usize,
    pub point_names: Vec<String>,
    pub nodes: Vec<FactorNode>,
}

impl FactorsRecord {
    pub fn from_grid_kriging(gk: &GridKriging, points_file: &str, zone_file: &str) -> Result<Self> {
        Self::from_batch(&gk.batch, gk.ncol, gk.nrow, points_file, zone_file)
    }

    /// Build a record from a batch whose result indices are 0-based
    /// row-major cell indices of an `nrow` x `ncol` grid.
    pub fn from_batch(
        batch: &KrigingBatch,
        ncol: usize,
        nrow: usize,
        points_file: &str,
        zone_file: &str,
    ) -> Result<Self> {
        let index: HashMap<&str, usize> = batch
            .point_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut nodes = Vec::with_capacity(batch.num_estimated());
        for r in batch.results.iter().filter(|r| r.is_estimated()) {
            if r.index >= ncol * nrow {
                return Err(Error::Validation(format!(
                    "result index {} outside a {nrow}x{ncol} grid",
                    r.index
                )));
            }
            let factors = r
                .neighbors
                .iter()
                .map(|n| {
                    index
                        .get(n.point.as_str())
                        .map(|&i| (i, n.weight))
                        .ok_or_else(|| Error::Validation(format!("unknown point '{}'", n.point)))
                })
                .collect::<Result<Vec<_>>>()?;
            nodes.push(FactorNode {
                node: r.index + 1,
                transform: batch.transform,
                factors,
            });
        }

        Ok(Self {
            points_file: points_file.to_string(),
            zone_file: zone_file.to_string(),
            ncol,
            nrow,
            point_names: batch.point_names.clone(),
            nodes,
        })
    }

    pub fn write<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "{}", self.points_file)?;
        writeln!(w, "{}", self.zone_file)?;
        writeln!(w, "{} {}", self.ncol, self.nrow)?;
        writeln!(w, "{}", self.point_names.len())?;
        for name in &self.point_names {
            writeln!(w, "{name}")?;
        }
        let reserved = format_exp(0.0, 5, false);
        for node in &self.nodes {
            write!(
                w,
                "{} {} {} {:>8} ",
                node.node,
                node.transform.flag(),
                node.factors.len(),
                reserved
            )?;
            for (pt, weight) in &node.factors {
                write!(w, "{} {:>12} ", pt + 1, format_general(*weight, 8))?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        self.write(&mut w)?;
        w.flush()?;
        debug!("wrote {} factor nodes to {}", self.nodes.len(), path.as_ref().display());
        Ok(())
    }

    /// Parse a factors file. Point names are lower-cased.
    pub fn read<R: BufRead>(r: R) -> Result<Self> {
        let mut lines = r.lines().enumerate().map(|(i, l)| (i + 1, l));
        let mut next = |what: &str| -> Result<(usize, String)> {
            match lines.next() {
                Some((n, Ok(l))) => Ok((n, l)),
                Some((_, Err(e))) => Err(e.into()),
                None => Err(Error::FileFormat(format!("unexpected end of file reading {what}"))),
            }
        };

        let points_file = next("points file name")?.1.trim().to_string();
        let zone_file = next("zone file name")?.1.trim().to_string();

        let (n, line) = next("grid dimensions")?;
        let dims: Vec<&str> = line.split_whitespace().collect();
        if dims.len() < 2 {
            return Err(Error::format_at(n, format!("expected '<ncol> <nrow>', got '{}'", line.trim())));
        }
        let ncol: usize = parse_token(n, dims[0], "ncol")?;
        let nrow: usize = parse_token(n, dims[1], "nrow")?;

        let (n, line) = next("point count")?;
        let npp: usize = parse_token(n, line.trim(), "point count")?;
        let mut point_names = Vec::with_capacity(npp);
        for _ in 0..npp {
            let (n, line) = next("point names")?;
            let name = line.trim().to_lowercase();
            if name.is_empty() {
                return Err(Error::format_at(n, "empty point name"));
            }
            point_names.push(name);
        }

        let mut nodes = Vec::new();
        while let Some((n, line)) = lines.next() {
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < 4 {
                return Err(Error::format_at(n, "truncated factor record"));
            }
            let node: usize = parse_token(n, tokens[0], "node index")?;
            if node == 0 || node > ncol * nrow {
                return Err(Error::format_at(n, format!("node {node} outside a {nrow}x{ncol} grid")));
            }
            let flag: i64 = parse_token(n, tokens[1], "transform flag")?;
            let transform = Transform::from_flag(flag).map_err(|e| Error::format_at(n, e))?;
            let count: usize = parse_token(n, tokens[2], "neighbor count")?;
            if tokens.len() != 4 + 2 * count {
                return Err(Error::format_at(
                    n,
                    format!("expected {count} point/weight pairs, found {} tokens", tokens.len() - 4),
                ));
            }
            let mut factors = Vec::with_capacity(count);
            for pair in tokens[4..].chunks_exact(2) {
                let pt: usize = parse_token(n, pair[0], "point index")?;
                if pt == 0 || pt > npp {
                    return Err(Error::format_at(n, format!("point index {pt} outside 1..={npp}")));
                }
                let weight: f64 = parse_token(n, pair[1], "weight")?;
                factors.push((pt - 1, weight));
            }
            nodes.push(FactorNode {
                node,
                transform,
                factors,
            });
        }

        Ok(Self {
            points_file,
            zone_file,
            ncol,
            nrow,
            point_names,
            nodes,
        })
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Zero-based `(row, col)` of a 1-based node index.
    pub fn node_cell(&self, node: usize) -> (usize, usize) {
        let row = (node - 1) / self.ncol + 1;
        let col = node - (row - 1) * self.ncol;
        (row - 1, col - 1)
    }
}

fn parse_token<T: std::str::FromStr>(line: usize, token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::format_at(line, format!("invalid {what} '{token}'")))
}

/// Treatment of reconstructed values outside the limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRange {
    /// Replace with `fill_value`
    #[default]
    Fill,
    /// Clamp to the violated limit
    Clamp,
}

#[derive(Debug, Clone, Copy)]
pub struct FacToRealParams {
    pub lower_limit: f64,
    pub upper_limit: f64,
    /// Value for unestimated and out-of-range nodes
    pub fill_value: f64,
    pub out_of_range: OutOfRange,
}

impl Default for FacToRealParams {
    fn default() -> Self {
        Self {
            lower_limit: -1.0e30,
            upper_limit: 1.0e30,
            fill_value: 1.0e30,
            out_of_range: OutOfRange::Fill,
        }
    }
}

/// Reconstruct a grid from factors and point values keyed by name.
///
/// Names are matched case-insensitively and the two name sets must be
/// identical.
pub fn fac2real(record: &FactorsRecord, values: &HashMap<String, f64>, params: &FacToRealParams) -> Result<Raster> {
    if record.ncol == 0 || record.nrow == 0 {
        return Err(Error::InvalidDimensions {
            ncol: record.ncol,
            nrow: record.nrow,
        });
    }

    let lowered: HashMap<String, f64> = values.iter().map(|(k, v)| (k.to_lowercase(), *v)).collect();
    let in_file: BTreeSet<&str> = record.point_names.iter().map(String::as_str).collect();
    let supplied: BTreeSet<&str> = lowered.keys().map(String::as_str).collect();
    let diff: Vec<&str> = in_file.symmetric_difference(&supplied).copied().collect();
    if !diff.is_empty() {
        return Err(Error::FileFormat(format!(
            "point names differ between factors file and values: {}",
            diff.join(",")
        )));
    }

    let by_index: Vec<f64> = record
        .point_names
        .iter()
        .map(|n| lowered.get(n).copied().unwrap_or(f64::NAN))
        .collect();

    let mut out = Raster::filled(record.nrow, record.ncol, params.fill_value);
    for node in &record.nodes {
        let estimate = match node.transform {
            Transform::None => node.factors.iter().map(|(i, w)| w * by_index[*i]).sum::<f64>(),
            Transform::Log => {
                let s: f64 = node.factors.iter().map(|(i, w)| w * by_index[*i].log10()).sum();
                10f64.powf(s)
            }
        };
        let value = if !estimate.is_finite() {
            params.fill_value
        } else if estimate < params.lower_limit {
            match params.out_of_range {
                OutOfRange::Fill => params.fill_value,
                OutOfRange::Clamp => params.lower_limit,
            }
        } else if estimate > params.upper_limit {
            match params.out_of_range {
                OutOfRange::Fill => params.fill_value,
                OutOfRange::Clamp => params.upper_limit,
            }
        } else {
            estimate
        };
        let (r, c) = record.node_cell(node.node);
        out.set(r, c, value)?;
    }
    Ok(out)
}

/// Write a reconstructed grid as an undelimited `%15.6E` array.
pub fn write_real_array<W: Write>(raster: &Raster, w: W) -> Result<()> {
    write_array(w, raster.data(), ArrayDelimiter::None)
}
