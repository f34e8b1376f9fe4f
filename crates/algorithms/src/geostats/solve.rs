//! Dense linear solver for small kriging systems

use std::fmt;

use ndarray::{Array1, Array2};

/// Relative pivot threshold below which the system is treated as singular.
const PIVOT_TOL: f64 = 1e-12;

/// Elimination hit a (numerically) zero pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingularMatrix {
    pub column: usize,
    pub pivot: f64,
}

impl fmt::Display for SingularMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "singular matrix (pivot {:e} in column {})", self.pivot, self.column)
    }
}

/// Solve `A·x = b` by Gaussian elimination with partial pivoting.
///
/// Consumes both operands. Sized for the (k+1)×(k+1) ordinary kriging
/// systems, typically a few dozen unknowns.
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, SingularMatrix> {
    let n = b.len();
    debug_assert_eq!(a.dim(), (n, n));

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let tol = PIVOT_TOL * scale.max(f64::MIN_POSITIVE);

    for col in 0..n {
        let mut max_val = a[(col, col)].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = a[(row, col)].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        // NaN pivots fail here too
        if !(max_val > tol) {
            return Err(SingularMatrix {
                column: col,
                pivot: max_val,
            });
        }

        if max_row != col {
            for j in 0..n {
                a.swap((col, j), (max_row, j));
            }
            b.swap(col, max_row);
        }

        let pivot = a[(col, col)];
        for row in (col + 1)..n {
            let factor = a[(row, col)] / pivot;
            a[(row, col)] = 0.0;
            for j in (col + 1)..n {
                a[(row, j)] -= factor * a[(col, j)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for col in (0..n).rev() {
        let mut sum = b[col];
        for j in (col + 1)..n {
            sum -= a[(col, j)] * x[j];
        }
        x[col] = sum / a[(col, col)];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve_basic() {
        let x = solve(array![[2.0, 1.0], [1.0, 3.0]], array![5.0, 7.0]).unwrap();
        assert!((x[0] - 1.6).abs() < 1e-10, "x[0] = {}", x[0]);
        assert!((x[1] - 1.8).abs() < 1e-10, "x[1] = {}", x[1]);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        // Zero leading entry, like the Lagrange block when ordered first
        let x = solve(array![[0.0, 1.0], [1.0, 1.0]], array![2.0, 3.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular() {
        // Two identical rows: coincident conditioning points
        let a = array![[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]];
        let err = solve(a, array![0.5, 0.5, 1.0]).unwrap_err();
        assert_eq!(err.column, 1);
        assert!(solve(array![[f64::NAN]], array![1.0]).is_err());
    }
}
