//! Discrete Fourier transforms for spectral simulation
//!
//! Power-of-two lengths use an in-place Cooley-Tukey radix-2 transform.
//! Other lengths go through Bluestein's chirp-z algorithm, which rewrites
//! the DFT as a convolution evaluated with a power-of-two transform.
//! Inverse transforms are scaled by `1/n`, so `inverse(forward(x)) == x`.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::maybe_rayon::*;

/// Precomputed transform for one length.
#[derive(Debug, Clone)]
pub struct FftPlan {
    n: usize,
    bluestein: Option<Bluestein>,
}

#[derive(Debug, Clone)]
struct Bluestein {
    m: usize,
    /// `exp(-iπk²/n)`
    chirp: Vec<Complex64>,
    /// Forward transform of the conjugate chirp filter, length `m`
    filter: Vec<Complex64>,
}

impl FftPlan {
    pub fn new(n: usize) -> Self {
        if n <= 1 || n.is_power_of_two() {
            return Self { n, bluestein: None };
        }

        let m = (2 * n - 1).next_power_of_two();
        let two_n = 2 * n as u64;
        let chirp: Vec<Complex64> = (0..n as u64)
            .map(|k| {
                // k² mod 2n keeps the angle small for large k
                let phase = PI * ((k * k) % two_n) as f64 / n as f64;
                Complex64::from_polar(1.0, -phase)
            })
            .collect();

        let mut filter = vec![Complex64::new(0.0, 0.0); m];
        filter[0] = chirp[0].conj();
        for k in 1..n {
            let c = chirp[k].conj();
            filter[k] = c;
            filter[m - k] = c;
        }
        radix2(&mut filter, false);

        Self {
            n,
            bluestein: Some(Bluestein { m, chirp, filter }),
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Transform `data` in place; `data.len()` must equal the plan length.
    pub fn process(&self, data: &mut [Complex64], inverse: bool) {
        debug_assert_eq!(data.len(), self.n);
        if self.n <= 1 {
            return;
        }
        match &self.bluestein {
            None => {
                radix2(data, inverse);
                if inverse {
                    scale(data, 1.0 / self.n as f64);
                }
            }
            Some(b) => {
                if inverse {
                    // ifft(x) = conj(fft(conj(x))) / n
                    data.iter_mut().for_each(|c| *c = c.conj());
                    b.forward(data);
                    let s = 1.0 / self.n as f64;
                    data.iter_mut().for_each(|c| *c = c.conj() * s);
                } else {
                    b.forward(data);
                }
            }
        }
    }
}

impl Bluestein {
    fn forward(&self, data: &mut [Complex64]) {
        let n = data.len();
        let mut work = vec![Complex64::new(0.0, 0.0); self.m];
        for k in 0..n {
            work[k] = data[k] * self.chirp[k];
        }
        radix2(&mut work, false);
        for (w, f) in work.iter_mut().zip(&self.filter) {
            *w *= f;
        }
        radix2(&mut work, true);
        let s = 1.0 / self.m as f64;
        for k in 0..n {
            data[k] = work[k] * s * self.chirp[k];
        }
    }
}

fn scale(data: &mut [Complex64], s: f64) {
    data.iter_mut().for_each(|c| *c *= s);
}

/// Unscaled in-place radix-2 transform. `data.len()` must be a power of two.
fn radix2(data: &mut [Complex64], inverse: bool) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());

    // Bit reversal
    let mut j = 0_usize;
    for i in 0..n {
        if i < j {
            data.swap(i, j);
        }
        let mut m = n >> 1;
        while m > 0 && j & m != 0 {
            j ^= m;
            m >>= 1;
        }
        j |= m;
    }

    // Butterfly stages
    let sign = if inverse { 1.0 } else { -1.0 };
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let angle = sign * 2.0 * PI / len as f64;
        let wn = Complex64::from_polar(1.0, angle);

        let mut k = 0;
        while k < n {
            let mut w = Complex64::new(1.0, 0.0);
            for m in 0..half {
                let u = data[k + m];
                let t = w * data[k + m + half];
                data[k + m] = u + t;
                data[k + m + half] = u - t;
                w *= wn;
            }
            k += len;
        }
        len <<= 1;
    }
}

/// 2-D transform of a row-major `nrow` x `ncol` buffer.
///
/// Rows are transformed in parallel, then the buffer is transposed so the
/// columns can be handled the same way.
pub fn fft2(data: &mut [Complex64], nrow: usize, ncol: usize, inverse: bool) {
    debug_assert_eq!(data.len(), nrow * ncol);
    if nrow == 0 || ncol == 0 {
        return;
    }
    let row_plan = FftPlan::new(ncol);
    data.par_chunks_mut(ncol)
        .for_each(|row| row_plan.process(row, inverse));

    let mut t = transpose(data, nrow, ncol);
    let col_plan = FftPlan::new(nrow);
    t.par_chunks_mut(nrow)
        .for_each(|col| col_plan.process(col, inverse));

    for r in 0..nrow {
        for c in 0..ncol {
            data[r * ncol + c] = t[c * nrow + r];
        }
    }
}

fn transpose(data: &[Complex64], nrow: usize, ncol: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); data.len()];
    for r in 0..nrow {
        for c in 0..ncol {
            out[c * nrow + r] = data[r * ncol + c];
        }
    }
    out
}
