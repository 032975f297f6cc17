//! DXF output for laser cutting
//!
//! Writes an ASCII DXF with the R12 entity subset: a layer table and one
//! `LINE` per wall. Cuts go on one layer and interior walls on another so
//! the cutter can ignore the latter. Open passages are not written.
//!
//! DXF has y pointing up, so y is flipped against the layout's top-left
//! origin.

use std::io::{self, Write};

use jig_core::{ClassifiedEdge, EdgeClass, Layout};

/// ACI color of the cut layer (white/black)
const CUT_COLOR: u8 = 7;
/// ACI color of the interior layer (green)
const INTERIOR_COLOR: u8 = 3;

/// Layer names for the two edge classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxfLayers {
    pub cut: String,
    pub interior: String,
}

impl Default for DxfLayers {
    fn default() -> Self {
        Self {
            cut: "CUT".to_string(),
            interior: "INTERIOR".to_string(),
        }
    }
}

impl DxfLayers {
    fn name(&self, class: EdgeClass) -> &str {
        match class {
            EdgeClass::Cut => &self.cut,
            EdgeClass::Interior => &self.interior,
        }
    }
}

/// Write `layout` as DXF
pub fn write_dxf<W: Write>(layout: &Layout, layers: &DxfLayers, out: &mut W) -> io::Result<()> {
    let top = layout.height as f64 * layout.cell_size;

    pair(out, 0, "SECTION")?;
    pair(out, 2, "TABLES")?;
    pair(out, 0, "TABLE")?;
    pair(out, 2, "LAYER")?;
    pair(out, 70, 2)?;
    layer(out, &layers.cut, CUT_COLOR)?;
    layer(out, &layers.interior, INTERIOR_COLOR)?;
    pair(out, 0, "ENDTAB")?;
    pair(out, 0, "ENDSEC")?;

    pair(out, 0, "SECTION")?;
    pair(out, 2, "ENTITIES")?;
    for edge in layout.edges.iter().filter(|e| e.is_wall()) {
        line(out, edge, layers.name(edge.class), top)?;
    }
    pair(out, 0, "ENDSEC")?;
    pair(out, 0, "EOF")?;
    Ok(())
}

fn pair<W: Write>(out: &mut W, code: u16, value: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "{code}")?;
    writeln!(out, "{value}")
}

fn layer<W: Write>(out: &mut W, name: &str, color: u8) -> io::Result<()> {
    pair(out, 0, "LAYER")?;
    pair(out, 2, name)?;
    pair(out, 70, 0)?;
    pair(out, 62, color)?;
    pair(out, 6, "CONTINUOUS")
}

fn line<W: Write>(out: &mut W, edge: &ClassifiedEdge, layer: &str, top: f64) -> io::Result<()> {
    pair(out, 0, "LINE")?;
    pair(out, 8, layer)?;
    pair(out, 10, coord(edge.start.x))?;
    pair(out, 20, coord(top - edge.start.y))?;
    pair(out, 30, coord(0.0))?;
    pair(out, 11, coord(edge.end.x))?;
    pair(out, 21, coord(top - edge.end.y))?;
    pair(out, 31, coord(0.0))
}

fn coord(v: f64) -> String {
    format!("{v:.3}")
}
