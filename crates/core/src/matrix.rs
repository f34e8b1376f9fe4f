//! Labeled symmetric matrix
//!
//! A dense square matrix whose rows and columns share one ordered list of
//! names. Rows are addressed by stable integer index; the name map is only
//! consulted at the boundaries (named sub-matrix extraction, export).

use std::collections::HashMap;
use std::io::Write;

use ndarray::Array2;

use crate::error::{Error, Result};

/// Square matrix with named rows/columns (same names on both axes).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    names: Vec<String>,
    index: HashMap<String, usize>,
    data: Array2<f64>,
}

impl LabeledMatrix {
    /// Zero matrix over `names`.
    pub fn zeros(names: Vec<String>) -> Result<Self> {
        let n = names.len();
        Self::from_array(Array2::zeros((n, n)), names)
    }

    /// Wrap an existing square array.
    pub fn from_array(data: Array2<f64>, names: Vec<String>) -> Result<Self> {
        let (r, c) = data.dim();
        if r != c || r != names.len() {
            return Err(Error::Validation(format!(
                "matrix shape {r}x{c} does not match {} names",
                names.len()
            )));
        }
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(Error::Validation(format!("duplicate matrix label '{name}'")));
            }
        }
        Ok(Self { names, index, data })
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

    /// Row/column index of a label
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    pub fn get_by_name(&self, row: &str, col: &str) -> Option<f64> {
        Some(self.data[(self.index_of(row)?, self.index_of(col)?)])
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Add `value` to every diagonal entry.
    pub fn add_diagonal(&mut self, value: f64) {
        self.data.diag_mut().mapv_inplace(|d| d + value);
    }

    /// Accumulate into one entry.
    #[inline]
    pub fn accumulate(&mut self, i: usize, j: usize, value: f64) {
        self.data[(i, j)] += value;
    }

    /// Copy the upper triangle onto the lower triangle.
    pub fn mirror_upper(&mut self) {
        let n = self.len();
        for i in 0..n {
            for j in (i + 1)..n {
                self.data[(j, i)] = self.data[(i, j)];
            }
        }
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        let n = self.len();
        (0..n).all(|i| ((i + 1)..n).all(|j| (self.data[(i, j)] - self.data[(j, i)]).abs() <= tol))
    }

    /// Dense sub-matrix for the given row/column indices, in that order.
    pub fn submatrix(&self, idx: &[usize]) -> Array2<f64> {
        Array2::from_shape_fn((idx.len(), idx.len()), |(a, b)| self.data[(idx[a], idx[b])])
    }

    /// Labeled sub-matrix for the given names, in that order.
    pub fn submatrix_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<LabeledMatrix> {
        let idx = names
            .iter()
            .map(|n| {
                self.index_of(n.as_ref())
                    .ok_or_else(|| Error::Validation(format!("unknown matrix label '{}'", n.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        LabeledMatrix::from_array(
            self.submatrix(&idx),
            names.iter().map(|n| n.as_ref().to_string()).collect(),
        )
    }

    /// Export as a plain whitespace-delimited table with a header row of
    /// column names and each row prefixed by its name.
    pub fn write_table<W: Write>(&self, mut w: W) -> Result<()> {
        write!(w, "name")?;
        for name in &self.names {
            write!(w, " {name}")?;
        }
        writeln!(w)?;
        for (i, name) in self.names.iter().enumerate() {
            write!(w, "{name}")?;
            for v in self.data.row(i) {
                write!(w, " {}", crate::io::format_exp(*v, 6, true))?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{i}")).collect()
    }

    #[test]
    fn test_accumulate_and_mirror() {
        let mut m = LabeledMatrix::zeros(names(3)).unwrap();
        m.add_diagonal(2.0);
        m.accumulate(0, 1, 0.5);
        m.accumulate(1, 2, 0.25);
        m.mirror_upper();

        assert!(m.is_symmetric(0.0));
        assert_eq!(m.get(1, 0), 0.5);
        assert_eq!(m.get(2, 1), 0.25);
        assert_eq!(m.get(2, 2), 2.0);
    }

    #[test]
    fn test_named_submatrix_keeps_requested_order() {
        let mut m = LabeledMatrix::zeros(names(3)).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                m.accumulate(i, j, (i * 10 + j) as f64);
            }
        }
        let sub = m.submatrix_by_names(&["p2", "p0"]).unwrap();
        assert_eq!(sub.names(), &["p2".to_string(), "p0".to_string()]);
        assert_eq!(sub.get(0, 0), 22.0);
        assert_eq!(sub.get(0, 1), 20.0);
        assert_eq!(sub.get(1, 0), 2.0);
        assert!(m.submatrix_by_names(&["nope"]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_labels_and_bad_shape() {
        let dup = vec!["a".to_string(), "a".to_string()];
        assert!(LabeledMatrix::zeros(dup).is_err());
        assert!(LabeledMatrix::from_array(Array2::zeros((2, 3)), names(2)).is_err());
    }

    #[test]
    fn test_write_table() {
        let mut m = LabeledMatrix::zeros(names(2)).unwrap();
        m.add_diagonal(1.0);
        let mut buf = Vec::new();
        m.write_table(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name p0 p1");
        assert_eq!(lines[1], "p0 1.000000E+00 0.000000E+00");
    }
}
