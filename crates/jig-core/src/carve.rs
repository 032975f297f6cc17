//! Piece carving
//!
//! Replays the recorded maze walk and turns some of its tree edges back into
//! walls. Each accepted cut separates the branch below the edge from the
//! piece it was part of.

use log::{debug, info};

use crate::error::InvariantError;
use crate::grid::Grid;
use crate::maze::{MazeWalk, WalkStep};
use crate::registry::PieceRegistry;
use crate::rng::LayoutRng;

/// Carver knobs, taken from the run configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarveParams {
    pub cut_probability: f64,
    pub min_piece_size: usize,
}

/// What the carver did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarveStats {
    /// Forward edges the walk crossed
    pub considered: usize,
    /// Cuts drawn by the random decision
    pub proposed: usize,
    /// Proposals dropped because the branch would be too small
    pub small_branch: usize,
    /// Proposals dropped because the piece left behind would be too small
    pub small_remainder: usize,
    pub accepted: usize,
}

/// Replay `walk` over `grid`, splitting pieces in `registry` as cuts land
///
/// A decision is drawn for every forward edge so the random stream depends
/// only on the maze. Retreats never cut.
pub fn carve_pieces(
    grid: &mut Grid,
    registry: &mut PieceRegistry,
    walk: &MazeWalk,
    params: CarveParams,
    rng: &mut LayoutRng,
) -> Result<CarveStats, InvariantError> {
    let sizes = walk.subtree_sizes();
    let mut stats = CarveStats::default();

    for step in walk.steps() {
        let WalkStep::Advance { from, to, edge } = *step else {
            continue;
        };
        stats.considered += 1;
        if !rng.chance(params.cut_probability) {
            continue;
        }
        stats.proposed += 1;

        let piece = registry.piece_at(from);
        let branch = sizes.get(&to).copied().unwrap_or(0);
        let remainder = registry.size_of(piece)?.saturating_sub(branch);
        if branch < params.min_piece_size {
            debug!("carve: rejected {edge}, branch of {branch} cells");
            stats.small_branch += 1;
            continue;
        }
        if remainder < params.min_piece_size {
            debug!("carve: rejected {edge}, {remainder} cells would remain");
            stats.small_remainder += 1;
            continue;
        }

        let id = registry.split_off(grid, piece, edge, to)?;
        debug!("carve: cut {edge}, piece {id} holds {branch} cells");
        stats.accepted += 1;
    }

    info!(
        "carved {} pieces: {} of {} proposed cuts accepted",
        registry.len(),
        stats.accepted,
        stats.proposed
    );
    Ok(stats)
}
