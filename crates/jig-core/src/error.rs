//! Error taxonomy for layout generation
//!
//! Configuration and invariant failures abort a run with no output.
//! Convergence problems are not errors: they travel alongside the finished
//! layout as a [`NonConvergenceWarning`].

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::grid::{Coord, EdgeId};
use crate::registry::PieceId;

/// Invalid configuration, detected before generation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("minimum piece size must be at least 1, got {0}")]
    MinPieceSize(usize),

    #[error("maximum piece size {max} is smaller than minimum piece size {min}")]
    PieceSizeBounds { min: usize, max: usize },

    #[error("cut probability must be within [0, 1], got {0}")]
    CutProbability(f64),

    #[error("optimizer iteration cap must be positive")]
    OptimizerIterations,

    #[error("start cell {start} lies outside the {width}x{height} grid")]
    StartOutsideGrid {
        start: Coord,
        width: usize,
        height: usize,
    },

    #[error("cell size must be a positive finite number, got {0}")]
    CellSize(f64),
}

/// Internal consistency violation; indicates a logic defect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("edge {0} is a boundary edge and cannot change state")]
    BoundaryEdge(EdgeId),

    #[error("edge {0} does not belong to the grid")]
    UnknownEdge(EdgeId),

    #[error("cell {0} lies outside the grid")]
    OutsideGrid(Coord),

    #[error("piece {0} is not registered")]
    UnknownPiece(PieceId),

    #[error("cannot merge piece {0} with itself")]
    SelfMerge(PieceId),

    #[error("edge {edge} does not separate pieces {a} and {b}")]
    NotSeparating { edge: EdgeId, a: PieceId, b: PieceId },

    #[error("edge {edge} is not an open edge inside piece {piece}")]
    NotInternal { edge: EdgeId, piece: PieceId },

    #[error("splitting piece {piece} along {edge} does not yield exactly two parts")]
    NotBisecting { edge: EdgeId, piece: PieceId },

    #[error("region for piece {piece} is not a connected proper subset with a connected remainder")]
    InvalidRegion { piece: PieceId },

    #[error("piece {piece} is not a tree of open edges ({cells} cells, {edges} open edges)")]
    NotATree {
        piece: PieceId,
        cells: usize,
        edges: usize,
    },

    #[error("registry disagrees with edge state at cell {0}")]
    PartitionMismatch(Coord),
}

/// Error returned by a generation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantError),
}

/// Why a piece fails the size and shape constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Violation {
    Undersized,
    Oversized,
    Square,
}

/// A piece left outside the constraints when the optimizer stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonconforming {
    pub piece: PieceId,
    pub size: usize,
    pub violation: Violation,
}

/// The optimizer stopped with nonconforming pieces
///
/// Non-fatal: the layout is still emitted, and the caller may retry with a
/// different seed or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonConvergenceWarning {
    /// Optimizer iterations performed
    pub iterations: usize,
    /// True when the iteration cap stopped the optimizer, false when it
    /// reached a fixpoint that still contains unresolvable pieces
    pub cap_reached: bool,
    pub pieces: Vec<Nonconforming>,
}

impl fmt::Display for NonConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = if self.cap_reached {
            "iteration cap reached"
        } else {
            "no further change possible"
        };
        write!(
            f,
            "optimizer stopped after {} iterations ({reason}) with {} nonconforming piece(s)",
            self.iterations,
            self.pieces.len()
        )?;
        for entry in &self.pieces {
            write!(f, "; piece {} {} ({} cells)", entry.piece, entry.violation, entry.size)?;
        }
        Ok(())
    }
}
