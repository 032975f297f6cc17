//! jig-cli: command-line front end for jig-core
//!
//! Turns flags and config files into a [`jig_core::PuzzleConfig`] and writes
//! finished layouts as DXF for the laser cutter, SVG for preview, or JSON.

pub mod dxf;
pub mod options;
pub mod svg;

pub use dxf::{DxfLayers, write_dxf};
pub use options::ConfigArgs;
pub use svg::write_svg;
