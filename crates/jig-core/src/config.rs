//! Generation configuration
//!
//! Every option has a default so partial config files deserialize.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::Coord;

pub const DEFAULT_WIDTH: usize = 20;
pub const DEFAULT_HEIGHT: usize = 20;
pub const DEFAULT_MIN_PIECE_SIZE: usize = 4;
pub const DEFAULT_MAX_PIECE_SIZE: usize = 10;
pub const DEFAULT_CUT_PROBABILITY: f64 = 0.3;
pub const DEFAULT_MAX_OPTIMIZER_ITERATIONS: usize = 100;
/// Drawing units per cell
pub const DEFAULT_CELL_SIZE: f64 = 10.0;

/// Options for one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub width: usize,
    pub height: usize,
    pub min_piece_size: usize,
    pub max_piece_size: usize,
    /// Chance that the carver proposes a cut at each forward maze edge
    pub cut_probability: f64,
    /// Drawn from entropy when absent
    pub seed: Option<u64>,
    pub max_optimizer_iterations: usize,
    /// Cell the maze walk starts from
    pub start: Coord,
    pub cell_size: f64,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            min_piece_size: DEFAULT_MIN_PIECE_SIZE,
            max_piece_size: DEFAULT_MAX_PIECE_SIZE,
            cut_probability: DEFAULT_CUT_PROBABILITY,
            seed: None,
            max_optimizer_iterations: DEFAULT_MAX_OPTIMIZER_ITERATIONS,
            start: Coord::new(0, 0),
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl PuzzleConfig {
    /// Config for a `width` x `height` grid with default everything else
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Check every option, reporting the first one out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if self.min_piece_size == 0 {
            return Err(ConfigError::MinPieceSize(self.min_piece_size));
        }
        if self.max_piece_size < self.min_piece_size {
            return Err(ConfigError::PieceSizeBounds {
                min: self.min_piece_size,
                max: self.max_piece_size,
            });
        }
        if !(0.0..=1.0).contains(&self.cut_probability) {
            return Err(ConfigError::CutProbability(self.cut_probability));
        }
        if self.max_optimizer_iterations == 0 {
            return Err(ConfigError::OptimizerIterations);
        }
        if self.start.x >= self.width || self.start.y >= self.height {
            return Err(ConfigError::StartOutsideGrid {
                start: self.start,
                width: self.width,
                height: self.height,
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::CellSize(self.cell_size));
        }
        Ok(())
    }
}
