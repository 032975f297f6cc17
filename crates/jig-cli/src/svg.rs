//! SVG preview
//!
//! Cut walls are drawn black and interior walls green; open passages are
//! left out. The canvas is 500 pixels tall, as wide as the grid's aspect
//! ratio demands, with a 10 pixel margin.

use std::io::{self, Write};

use jig_core::{ClassifiedEdge, Layout};

pub const CANVAS_HEIGHT: f64 = 500.0;
pub const PADDING: f64 = 10.0;

const CUT_STROKE: &str = "black";
const INTERIOR_STROKE: &str = "green";

/// Pixel scale and canvas size for a layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn for_layout(layout: &Layout) -> Self {
        let drawing_height = layout.height as f64 * layout.cell_size;
        let scale = (CANVAS_HEIGHT - 2.0 * PADDING) / drawing_height;
        let width = layout.width as f64 * layout.cell_size * scale + 2.0 * PADDING;
        Self {
            scale,
            width,
            height: CANVAS_HEIGHT,
        }
    }

    fn project(&self, v: f64) -> f64 {
        v * self.scale + PADDING
    }
}

/// Write `layout` as an SVG document
pub fn write_svg<W: Write>(layout: &Layout, out: &mut W) -> io::Result<()> {
    let canvas = Canvas::for_layout(layout);
    writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.2} {h:.2}\">",
        w = canvas.width,
        h = canvas.height
    )?;

    // Interior first so cuts are drawn on top
    group(out, &canvas, INTERIOR_STROKE, layout.interior_edges())?;
    group(out, &canvas, CUT_STROKE, layout.cut_edges())?;
    writeln!(out, "</svg>")
}

fn group<'a, W: Write>(
    out: &mut W,
    canvas: &Canvas,
    stroke: &str,
    edges: impl Iterator<Item = &'a ClassifiedEdge>,
) -> io::Result<()> {
    writeln!(out, "  <g stroke=\"{stroke}\" stroke-width=\"1\" stroke-linecap=\"square\">")?;
    for edge in edges.filter(|e| e.is_wall()) {
        writeln!(
            out,
            "    <line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"/>",
            canvas.project(edge.start.x),
            canvas.project(edge.start.y),
            canvas.project(edge.end.x),
            canvas.project(edge.end.y)
        )?;
    }
    writeln!(out, "  </g>")
}
