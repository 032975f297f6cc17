//! jig-core: jigsaw puzzle layout generation
//!
//! Builds a random maze over a rectangular grid, carves it into pieces along
//! a replay of the maze walk, then merges and splits pieces until they fit
//! the configured size bounds and none is a square block. The result is a
//! classified edge set: cuts for the laser, interior lines for reference.
//!
//! This crate has no I/O; writers live in `jig-cli`.

pub mod carve;
pub mod config;
pub mod error;
pub mod grid;
pub mod layout;
pub mod maze;
pub mod optimize;
pub mod registry;
mod rng;

pub use config::PuzzleConfig;
pub use error::{ConfigError, InvariantError, LayoutError, NonConvergenceWarning, Violation};
pub use grid::{Coord, Direction, EdgeId, EdgeState, Grid};
pub use layout::{ClassifiedEdge, EdgeClass, Generation, Layout, LayoutSummary, Point, generate};
pub use registry::{Piece, PieceId, PieceRegistry};
pub use rng::LayoutRng;
