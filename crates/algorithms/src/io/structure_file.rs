//! Structure definition files
//!
//! ```text
//! STRUCTURE <name>
//!   NUGGET <v>
//!   NUMVARIOGRAM <n>
//!   VARIOGRAM <name> <contribution>
//!   TRANSFORM <none|log>
//! END STRUCTURE
//!
//! VARIOGRAM <name>
//!   VARTYPE <1|2|3>
//!   A <range>
//!   ANISOTROPY <ratio>
//!   BEARING <degrees>
//! END VARIOGRAM
//! ```
//!
//! Keywords and names are case-insensitive; lines starting with `#` are
//! comments.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use surtgeo_core::{Diagnostics, Error, Result, Warning};
use tracing::debug;

use crate::geostats::{by_name, CovarianceStructure, Transform, Variogram, VariogramKind};

struct StructureBlock {
    line: usize,
    name: String,
    nugget: f64,
    transform: Transform,
    /// `(variogram name, contribution)` in declaration order
    members: Vec<(String, f64)>,
}

struct VariogramBlock {
    kind: VariogramKind,
    a: f64,
    anisotropy: f64,
    bearing: f64,
}

/// Lower-cased, non-comment lines with their 1-based numbers.
struct Lines<R> {
    inner: std::iter::Enumerate<std::io::Lines<R>>,
}

impl<R: BufRead> Lines<R> {
    fn next_tokens(&mut self) -> Result<Option<(usize, Vec<String>)>> {
        for (i, line) in self.inner.by_ref() {
            let line = line?.trim().to_lowercase();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens = line.split_whitespace().map(str::to_string).collect();
            return Ok(Some((i + 1, tokens)));
        }
        Ok(None)
    }
}

fn arg<'a>(tokens: &'a [String], idx: usize, line: usize) -> Result<&'a str> {
    tokens
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| Error::format_at(line, format!("missing value after '{}'", tokens[0])))
}

fn number<T: std::str::FromStr>(tokens: &[String], idx: usize, line: usize) -> Result<T> {
    let tok = arg(tokens, idx, line)?;
    tok.parse()
        .map_err(|_| Error::format_at(line, format!("invalid number '{tok}' for '{}'", tokens[0])))
}

/// Parse every structure in a structure file, in file order.
pub fn parse_struct<R: BufRead>(r: R) -> Result<(Vec<CovarianceStructure>, Diagnostics)> {
    let mut lines = Lines {
        inner: r.lines().enumerate(),
    };
    let mut diagnostics = Diagnostics::new();
    let mut structures = Vec::new();
    let mut variograms: HashMap<String, VariogramBlock> = HashMap::new();

    while let Some((n, tokens)) = lines.next_tokens()? {
        match tokens[0].as_str() {
            "structure" => {
                let name = arg(&tokens, 1, n)?.to_string();
                structures.push(read_structure(&mut lines, n, name, &mut diagnostics)?);
            }
            "variogram" => {
                let name = arg(&tokens, 1, n)?.to_string();
                let block = read_variogram(&mut lines, n)?;
                variograms.insert(name, block);
            }
            other => {
                return Err(Error::format_at(n, format!("unrecognized keyword '{other}'")));
            }
        }
    }

    let mut out = Vec::with_capacity(structures.len());
    for s in structures {
        let mut vs = Vec::with_capacity(s.members.len());
        for (vname, contribution) in &s.members {
            let block = variograms.get(vname).ok_or_else(|| {
                Error::format_at(s.line, format!("variogram '{vname}' not found for structure '{}'", s.name))
            })?;
            let v = Variogram::new(block.kind, *contribution, block.a)?
                .with_anisotropy(block.anisotropy)?
                .with_bearing(block.bearing)
                .with_name(vname.clone());
            vs.push(v);
        }
        out.push(
            CovarianceStructure::new(s.nugget, vs)?
                .with_name(s.name)
                .with_transform(s.transform),
        );
    }
    debug!("parsed {} structure(s)", out.len());
    Ok((out, diagnostics))
}

fn read_structure<R: BufRead>(
    lines: &mut Lines<R>,
    start: usize,
    name: String,
    diagnostics: &mut Diagnostics,
) -> Result<StructureBlock> {
    let mut block = StructureBlock {
        line: start,
        name,
        nugget: 0.0,
        transform: Transform::None,
        members: Vec::new(),
    };
    let mut declared: Option<(usize, usize)> = None;

    loop {
        let Some((n, tokens)) = lines.next_tokens()? else {
            return Err(Error::format_at(start, "end of file while reading structure"));
        };
        match tokens[0].as_str() {
            "nugget" => block.nugget = number(&tokens, 1, n)?,
            "transform" => {
                block.transform = arg(&tokens, 1, n)?.parse().map_err(|e| Error::format_at(n, e))?;
            }
            "numvariogram" => declared = Some((n, number(&tokens, 1, n)?)),
            "variogram" => {
                let vname = arg(&tokens, 1, n)?.to_string();
                let contribution = number(&tokens, 2, n)?;
                block.members.push((vname, contribution));
            }
            "mean" => diagnostics.push(Warning::UnsupportedAttribute {
                keyword: "mean".into(),
            }),
            "end" => break,
            other => {
                return Err(Error::format_at(
                    n,
                    format!("unrecognized keyword '{other}' in structure definition"),
                ));
            }
        }
    }

    if let Some((n, count)) = declared {
        if count != block.members.len() {
            return Err(Error::format_at(
                n,
                format!("NUMVARIOGRAM {count} but {} variograms listed", block.members.len()),
            ));
        }
    }
    Ok(block)
}

fn read_variogram<R: BufRead>(lines: &mut Lines<R>, start: usize) -> Result<VariogramBlock> {
    let mut kind = None;
    let mut a = None;
    let mut anisotropy = 1.0;
    let mut bearing = 0.0;

    loop {
        let Some((n, tokens)) = lines.next_tokens()? else {
            return Err(Error::format_at(start, "end of file while reading variogram"));
        };
        match tokens[0].as_str() {
            "vartype" => {
                kind = Some(VariogramKind::from_code(number(&tokens, 1, n)?).map_err(|e| Error::format_at(n, e))?)
            }
            "a" => a = Some(number(&tokens, 1, n)?),
            "anisotropy" => anisotropy = number(&tokens, 1, n)?,
            "bearing" => bearing = number(&tokens, 1, n)?,
            "end" => break,
            other => {
                return Err(Error::format_at(n, format!("unrecognized keyword '{other}' in variogram")));
            }
        }
    }

    Ok(VariogramBlock {
        kind: kind.ok_or_else(|| Error::format_at(start, "variogram missing VARTYPE"))?,
        a: a.ok_or_else(|| Error::format_at(start, "variogram missing A"))?,
        anisotropy,
        bearing,
    })
}

/// Read every structure in `path`.
pub fn read_struct_file<P: AsRef<Path>>(path: P) -> Result<(Vec<CovarianceStructure>, Diagnostics)> {
    parse_struct(BufReader::new(File::open(path)?))
}

/// Write structures in name order, each followed by its variogram blocks.
pub fn write_struct_file<P: AsRef<Path>>(path: P, structures: &[CovarianceStructure]) -> Result<()> {
    let mut ordered: Vec<&CovarianceStructure> = structures.iter().collect();
    ordered.sort_by(|a, b| by_name(a, b));
    let mut w = BufWriter::new(File::create(path)?);
    for s in ordered {
        s.to_struct_file(&mut w)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geostats::sort_structures;

    const TWO: &str = "\
# two structures sharing a variogram
STRUCTURE Struct1
  NUGGET 0.1
  NUMVARIOGRAM 2
  VARIOGRAM Short 1.0
  VARIOGRAM long 0.5
  TRANSFORM log
  MEAN 2.0
END STRUCTURE

structure other
  numvariogram 1
  variogram short 3.0
end structure

VARIOGRAM short
  VARTYPE 1
  A 500
  ANISOTROPY 2.0
  BEARING 45
END VARIOGRAM

variogram long
  vartype 2
  a 2000
end variogram
";

    #[test]
    fn test_parse_multiple_structures() {
        let (gs, diag) = parse_struct(TWO.as_bytes()).unwrap();
        assert_eq!(gs.len(), 2);
        assert_eq!(gs[0].name(), "struct1");
        assert_eq!(gs[0].transform(), Transform::Log);
        assert_eq!(gs[0].variograms().len(), 2);
        assert_eq!(gs[0].variograms()[0].kind(), VariogramKind::Spherical);
        assert_eq!(gs[0].variograms()[0].bearing(), 45.0);
        assert!((gs[0].sill() - 1.6).abs() < 1e-12);
        assert_eq!(gs[1].variograms()[0].contribution(), 3.0);
        assert_eq!(gs[1].nugget(), 0.0);
        assert!(matches!(
            diag.warnings()[0],
            Warning::UnsupportedAttribute { ref keyword } if keyword == "mean"
        ));
    }

    #[test]
    fn test_unknown_keyword_is_named() {
        let text = "STRUCTURE s\n  NUGGET 0\n  SILL 1.0\nEND STRUCTURE\n";
        let err = parse_struct(text.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::FileFormat(_)));
        assert!(msg.contains("sill") && msg.contains("line 3"), "got: {}", msg);
    }

    #[test]
    fn test_premature_eof() {
        let text = "VARIOGRAM v\n  VARTYPE 2\n  A 10\n";
        assert!(matches!(parse_struct(text.as_bytes()), Err(Error::FileFormat(_))));
    }

    #[test]
    fn test_missing_variogram_and_count_mismatch() {
        let text = "STRUCTURE s\n NUMVARIOGRAM 1\n VARIOGRAM ghost 1.0\nEND STRUCTURE\n";
        let msg = parse_struct(text.as_bytes()).unwrap_err().to_string();
        assert!(msg.contains("ghost"), "got: {}", msg);

        let text = "STRUCTURE s\n NUMVARIOGRAM 2\n VARIOGRAM v 1.0\nEND STRUCTURE\n";
        assert!(parse_struct(text.as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let (mut gs, _) = parse_struct(TWO.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("struct.dat");
        write_struct_file(&path, &gs).unwrap();
        let (back, _) = read_struct_file(&path).unwrap();
        sort_structures(&mut gs);
        assert_eq!(back[0].name(), "other");
        assert_eq!(back, gs);
    }
}
