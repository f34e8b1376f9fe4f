//! Numeric text formatting compatible with C/Python printf conventions.
//!
//! Factors files and ASCII arrays are consumed by legacy tools that expect
//! `%e`/`%E` exponents with a sign and at least two digits, and `%g`
//! general formatting with trailing zeros stripped. Rust's `{:e}` prints
//! `1.5e-5`, so the conversions are done here.

use std::io::{BufRead, Write};

use ndarray::Array2;

use crate::error::{Error, Result};

fn non_finite(value: f64, upper: bool) -> String {
    let s = if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    };
    if upper { s.to_uppercase() } else { s.to_string() }
}

fn split_exponent(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((mant, exp)) => (mant, exp.parse().unwrap_or_default()),
        None => (s, 0),
    }
}

fn exponent_suffix(exp: i32, upper: bool) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{e}{sign}{:02}", exp.abs())
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `%.{precision}e` (or `%E` when `upper`): `1.50000e-05`.
pub fn format_exp(value: f64, precision: usize, upper: bool) -> String {
    if !value.is_finite() {
        return non_finite(value, upper);
    }
    let s = format!("{:.*e}", precision, value);
    let (mant, exp) = split_exponent(&s);
    format!("{mant}{}", exponent_suffix(exp, upper))
}

/// `%.{precision}g`: shortest of fixed/scientific with trailing zeros removed.
pub fn format_general(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value, false);
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0".into() } else { "0".into() };
    }
    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, value);
    let (mant, exp) = split_exponent(&sci);
    if exp < -4 || exp >= p as i32 {
        format!("{}{}", strip_trailing_zeros(mant), exponent_suffix(exp, false))
    } else {
        let decimals = (p as i32 - 1 - exp) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Column separator used by [`write_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDelimiter {
    /// Single space between fields (variance arrays)
    Space,
    /// Fields abut; the fixed width keeps them separated (fac2real arrays)
    None,
}

/// Write a 2-D array one row per line, each value as `%15.6E`.
pub fn write_array<W: Write>(mut w: W, data: &Array2<f64>, delimiter: ArrayDelimiter) -> Result<()> {
    let sep = match delimiter {
        ArrayDelimiter::Space => " ",
        ArrayDelimiter::None => "",
    };
    for row in data.rows() {
        let line = row
            .iter()
            .map(|v| format!("{:>15}", format_exp(*v, 6, true)))
            .collect::<Vec<_>>()
            .join(sep);
        writeln!(w, "{line}")?;
    }
    Ok(())
}

/// Read a whitespace-delimited array with `nrow` rows of `ncol` values.
///
/// Values may wrap across lines; only the total count matters.
pub fn read_array<R: BufRead>(r: R, nrow: usize, ncol: usize) -> Result<Array2<f64>> {
    let mut values = Vec::with_capacity(nrow * ncol);
    for (lineno, line) in r.lines().enumerate() {
        let line = line?;
        for tok in line.split_whitespace() {
            let v: f64 = tok
                .parse()
                .map_err(|_| Error::format_at(lineno + 1, format!("bad array value '{tok}'")))?;
            values.push(v);
        }
    }
    if values.len() != nrow * ncol {
        return Err(Error::FileFormat(format!(
            "expected {} array values ({nrow}x{ncol}), found {}",
            nrow * ncol,
            values.len()
        )));
    }
    Array2::from_shape_vec((nrow, ncol), values).map_err(|e| Error::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_exp_matches_printf() {
        assert_eq!(format_exp(0.0, 5, false), "0.00000e+00");
        assert_eq!(format_exp(1.5e-5, 6, true), "1.500000E-05");
        assert_eq!(format_exp(-123456.0, 3, false), "-1.235e+05");
        assert_eq!(format_exp(1.0e30, 6, true), "1.000000E+30");
        assert_eq!(format_exp(1.0e-300, 2, false), "1.00e-300");
        assert_eq!(format_exp(f64::NAN, 6, true), "NAN");
    }

    #[test]
    fn test_format_general_matches_printf() {
        assert_eq!(format_general(0.0, 8), "0");
        assert_eq!(format_general(1.0, 8), "1");
        assert_eq!(format_general(0.25, 8), "0.25");
        assert_eq!(format_general(0.123456789, 8), "0.12345679");
        assert_eq!(format_general(-0.000012345, 8), "-1.2345e-05");
        assert_eq!(format_general(123456789.0, 8), "1.2345679e+08");
        assert_eq!(format_general(12345678.0, 8), "12345678");
        assert_eq!(format_general(0.0001, 8), "0.0001");
    }

    #[test]
    fn test_write_and_read_array() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, -2.5, 1.0e30, 0.0]).unwrap();
        let mut buf = Vec::new();
        write_array(&mut buf, &data, ArrayDelimiter::None).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().next().unwrap(), "   1.000000E+00  -2.500000E+00");

        let back = read_array(std::io::Cursor::new(buf), 2, 2).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_read_array_counts_values() {
        let text = "1 2 3\n4 5\n";
        assert!(read_array(std::io::Cursor::new(text), 2, 3).is_err());
        let ok = read_array(std::io::Cursor::new("1 2\n3\n4\n"), 2, 2).unwrap();
        assert_eq!(ok[(1, 1)], 4.0);
    }
}
