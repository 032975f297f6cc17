//! Edge identities and wall states

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Wall state of one edge
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum EdgeState {
    /// Outer edge of the lattice; always a cut, never changes
    Boundary,
    /// Wall not opened by the maze builder
    #[default]
    Blocked,
    /// Passage opened by the maze builder; both sides share a piece
    MazeOpen,
    /// Wall reinstated to separate two pieces
    PieceCut,
}

impl EdgeState {
    /// Rendered as a cut on the fabrication layer
    pub const fn is_cut(&self) -> bool {
        matches!(self, EdgeState::Boundary | EdgeState::PieceCut)
    }

    /// Connects the cells on either side
    pub const fn is_open(&self) -> bool {
        matches!(self, EdgeState::MazeOpen)
    }

    /// Internal wall that may separate two pieces
    pub const fn is_separator(&self) -> bool {
        matches!(self, EdgeState::Blocked | EdgeState::PieceCut)
    }
}

/// Orientation of an edge in the lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// Runs west-east along the north side of row `y`
    Horizontal,
    /// Runs north-south along the west side of column `x`
    Vertical,
}

/// Identity of one edge, anchored at lattice point `(x, y)`
///
/// Horizontal edges exist for `x < width, y <= height` and vertical edges for
/// `x <= width, y < height`. The derived ordering (by `y`, then `x`, then
/// axis) is the row-major edge order used for every tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId {
    pub y: usize,
    pub x: usize,
    pub axis: Axis,
}

impl EdgeId {
    pub const fn horizontal(x: usize, y: usize) -> Self {
        Self {
            y,
            x,
            axis: Axis::Horizontal,
        }
    }

    pub const fn vertical(x: usize, y: usize) -> Self {
        Self {
            y,
            x,
            axis: Axis::Vertical,
        }
    }

    /// Endpoints in lattice units, start before end
    pub const fn endpoints(&self) -> ((usize, usize), (usize, usize)) {
        match self.axis {
            Axis::Horizontal => ((self.x, self.y), (self.x + 1, self.y)),
            Axis::Vertical => ((self.x, self.y), (self.x, self.y + 1)),
        }
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.axis {
            Axis::Horizontal => 'H',
            Axis::Vertical => 'V',
        };
        write!(f, "{tag}({}, {})", self.x, self.y)
    }
}
