//! GSLIB point data files
//!
//! A title line, the attribute count, one attribute name per line, then
//! whitespace-delimited rows. Points are named `pt0`, `pt1`, ... in row
//! order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use surtgeo_core::{Error, Result};

use crate::geostats::Point;

/// Column selection for [`read_gslib`]
#[derive(Debug, Clone)]
pub struct GslibParams {
    /// Attribute holding the values; `None` requires exactly three
    /// attributes and takes the third
    pub attr_name: Option<String>,
    pub x_idx: usize,
    pub y_idx: usize,
}

impl Default for GslibParams {
    fn default() -> Self {
        Self {
            attr_name: None,
            x_idx: 0,
            y_idx: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GslibData {
    pub title: String,
    pub points: Vec<Point>,
    pub values: Vec<f64>,
}

impl GslibData {
    pub fn values_by_name(&self) -> HashMap<String, f64> {
        self.points
            .iter()
            .zip(&self.values)
            .map(|(p, v)| (p.name.clone(), *v))
            .collect()
    }
}

pub fn parse_gslib<R: BufRead>(r: R, params: &GslibParams) -> Result<GslibData> {
    let mut lines = r.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut header = |what: &str| -> Result<(usize, String)> {
        match lines.next() {
            Some((n, Ok(l))) => Ok((n, l.trim().to_string())),
            Some((_, Err(e))) => Err(e.into()),
            None => Err(Error::FileFormat(format!("unexpected end of file reading {what}"))),
        }
    };

    let title = header("title")?.1;
    let (n, count) = header("attribute count")?;
    let num_attrs: usize = count
        .parse()
        .map_err(|_| Error::format_at(n, format!("invalid attribute count '{count}'")))?;
    let mut attrs = Vec::with_capacity(num_attrs);
    for _ in 0..num_attrs {
        attrs.push(header("attribute names")?.1);
    }

    let a_idx = match &params.attr_name {
        Some(name) => attrs.iter().position(|a| a == name).ok_or_else(|| {
            Error::FileFormat(format!("attribute '{name}' not in [{}]", attrs.join(",")))
        })?,
        None if attrs.len() == 3 => 2,
        None => {
            return Err(Error::FileFormat(format!(
                "no attribute name given but the file has {} attributes (expected 3)",
                attrs.len()
            )));
        }
    };
    if params.x_idx >= attrs.len() || params.y_idx >= attrs.len() {
        return Err(Error::FileFormat(format!(
            "coordinate columns ({}, {}) exceed {} attributes",
            params.x_idx,
            params.y_idx,
            attrs.len()
        )));
    }

    let mut points = Vec::new();
    let mut values = Vec::new();
    for (n, line) in lines {
        let line = line?;
        let raw: Vec<&str> = line.split_whitespace().collect();
        if raw.is_empty() {
            continue;
        }
        let field = |idx: usize| -> Result<f64> {
            raw.get(idx)
                .ok_or_else(|| Error::format_at(n, format!("missing column {idx}")))?
                .parse()
                .map_err(|_| Error::format_at(n, format!("invalid value in column {idx}")))
        };
        let x = field(params.x_idx)?;
        let y = field(params.y_idx)?;
        let v = field(a_idx)?;
        points.push(Point::new(format!("pt{}", points.len()), x, y));
        values.push(v);
    }

    Ok(GslibData { title, points, values })
}

pub fn read_gslib<P: AsRef<Path>>(path: P, params: &GslibParams) -> Result<GslibData> {
    parse_gslib(BufReader::new(File::open(path)?), params)
}
