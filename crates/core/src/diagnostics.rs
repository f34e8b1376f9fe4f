//! Non-fatal diagnostics
//!
//! Conditions that should not abort an operation (near-duplicate points,
//! unmatched zones, unsupported file attributes, forgiven solve failures)
//! are collected as [`Warning`]s and handed back to the caller. Every
//! warning is also emitted through `tracing` when it is recorded.

use std::fmt;

/// A non-fatal condition raised by a SurtGeo operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Several registry entries shared a name and identical coordinates
    DuplicatePointsCollapsed { name: String, count: usize },
    /// Two distinct points are closer than the resolvable distance
    PointsTooClose {
        first: String,
        second: String,
        distance: f64,
    },
    /// Points removed while rectifying near-duplicates
    PointsDropped { names: Vec<String> },
    /// Zoned kriging requested but the points carry no zone tags
    MissingPointZones,
    /// A point zone has no matching cells in the zone array
    UnmatchedZone { zone: i32 },
    /// Targets were tagged with a zone that no conditioning point carries
    ZoneWithoutPoints { zone: i32, targets: usize },
    /// A recognized but unsupported keyword was skipped while reading
    UnsupportedAttribute { keyword: String },
    /// A structure sill was rescaled to unity before a grouped draw
    SillRescaled { from: f64 },
    /// A kriging system could not be solved and the target was left unestimated
    SolveFailed {
        index: usize,
        x: f64,
        y: f64,
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicatePointsCollapsed { name, count } => {
                write!(f, "{count} entries named '{name}' collapsed to one point")
            }
            Warning::PointsTooClose {
                first,
                second,
                distance,
            } => write!(
                f,
                "points {first} and {second} are too close ({distance:e}); \
                 this will cause a singular kriging matrix"
            ),
            Warning::PointsDropped { names } => {
                write!(f, "rectified point data by removing: {}", names.join(","))
            }
            Warning::MissingPointZones => {
                write!(f, "points carry no zone tags, assigning generic zone 1")
            }
            Warning::UnmatchedZone { zone } => {
                write!(f, "point zone {zone} not found in zone array, skipping")
            }
            Warning::ZoneWithoutPoints { zone, targets } => {
                write!(f, "no points in zone {zone}, skipping {targets} targets")
            }
            Warning::UnsupportedAttribute { keyword } => {
                write!(f, "'{keyword}' attribute not supported, skipping")
            }
            Warning::SillRescaled { from } => {
                write!(f, "sill {from} rescaled to unity (contribution and nugget scaled)")
            }
            Warning::SolveFailed {
                index,
                x,
                y,
                reason,
            } => write!(f, "kriging solve failed at target {index} ({x}, {y}): {reason}"),
        }
    }
}

/// Ordered collection of warnings produced by one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and trace it.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Append warnings already traced by another collector.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.warnings.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.iter()
    }
}
