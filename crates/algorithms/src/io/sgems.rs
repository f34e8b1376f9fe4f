//! SGEMS variogram model XML
//!
//! ```xml
//! <Variogram nugget="0.1" structures_count="1">
//!   <structure_1 contribution="0.9" type="Spherical">
//!     <ranges max="1000" medium="1000" min="250"/>
//!     <angles x="90" y="0" z="0"/>
//!   </structure_1>
//! </Variogram>
//! ```
//!
//! Only single-structure models are supported. The bearing is
//! `atan2(x, y)` in degrees and the anisotropy is `max / min`.

use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};
use surtgeo_core::{Error, Result};

use crate::geostats::{CovarianceStructure, Variogram, VariogramKind};

fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

fn float_attr(node: Node<'_, '_>, name: &str) -> Result<f64> {
    let raw = attr(node, name).ok_or_else(|| {
        Error::FileFormat(format!("<{}> missing '{name}' attribute", node.tag_name().name()))
    })?;
    raw.trim()
        .parse()
        .map_err(|_| Error::FileFormat(format!("invalid '{name}' value '{raw}'")))
}

/// Parse an SGEMS variogram model from XML text.
pub fn parse_sgems_variogram_xml(text: &str) -> Result<CovarianceStructure> {
    let doc = Document::parse(text).map_err(|e| Error::FileFormat(format!("invalid XML: {e}")))?;
    let root = doc.root_element();

    let nugget = match attr(root, "nugget").map(str::trim) {
        Some(v) if !v.is_empty() => v
            .parse()
            .map_err(|_| Error::FileFormat(format!("invalid nugget '{v}'")))?,
        _ => 0.0,
    };
    let count: usize = match attr(root, "structures_count") {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::FileFormat(format!("invalid structures_count '{v}'")))?,
        None => 0,
    };
    if count == 0 {
        return Err(Error::FileFormat("no structures found".into()));
    }
    if count != 1 {
        return Err(Error::FileFormat(format!(
            "only single-structure models are supported, found structures_count={count}"
        )));
    }

    let structure = root
        .children()
        .find(|n| n.is_element())
        .ok_or_else(|| Error::FileFormat("structure element missing".into()))?;

    let kind = VariogramKind::from_sgems(
        attr(structure, "type").ok_or_else(|| Error::FileFormat("structure missing 'type'".into()))?,
    )?;
    let contribution = float_attr(structure, "contribution")?;

    let child = |tag: &str| {
        structure
            .children()
            .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case(tag))
            .ok_or_else(|| Error::FileFormat(format!("structure missing <{tag}>")))
    };
    let ranges = child("ranges")?;
    let angles = child("angles")?;
    let max_range = float_attr(ranges, "max")?;
    let min_range = float_attr(ranges, "min")?;
    let x_angle = float_attr(angles, "x")?;
    let y_angle = float_attr(angles, "y")?;

    let v = Variogram::new(kind, contribution, max_range)?
        .with_anisotropy(max_range / min_range)?
        .with_bearing(x_angle.atan2(y_angle).to_degrees())
        .with_name(structure.tag_name().name());
    CovarianceStructure::new(nugget, vec![v])
}

/// Read an SGEMS variogram model file.
pub fn read_sgems_variogram_xml<P: AsRef<Path>>(path: P) -> Result<CovarianceStructure> {
    parse_sgems_variogram_xml(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model() {
        let xml = r#"<Variogram nugget="0.1" structures_count="1">
  <structure_1 contribution="0.9" type="Spherical">
    <ranges max="1000" medium="1000" min="250"/>
    <angles x="90" y="0" z="0"/>
  </structure_1>
</Variogram>"#;
        let gs = parse_sgems_variogram_xml(xml).unwrap();
        assert_eq!(gs.nugget(), 0.1);
        let v = &gs.variograms()[0];
        assert_eq!(v.kind(), VariogramKind::Spherical);
        assert_eq!(v.name(), "structure_1");
        assert_eq!(v.a(), 1000.0);
        assert_eq!(v.anisotropy(), 4.0);
        assert!((v.bearing() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_nested_models() {
        let xml = r#"<Variogram nugget="0" structures_count="2"><s type="exp"/></Variogram>"#;
        assert!(matches!(parse_sgems_variogram_xml(xml), Err(Error::FileFormat(_))));
        let xml = r#"<Variogram nugget=""/>"#;
        assert!(parse_sgems_variogram_xml(xml).is_err());
    }
}
