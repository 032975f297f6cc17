//! Piece optimization
//!
//! Repeats three ordered passes until nothing changes or the iteration cap
//! is hit:
//!
//! 1. shrink: merge every undersized piece into its smallest neighbor
//! 2. square: merge every k x k block into its smallest neighbor
//! 3. split: bisect every oversized piece along a tree edge, or failing
//!    that, along a connected region boundary
//!
//! Each pass walks a snapshot of the ids in ascending order and skips ids
//! that an earlier merge in the same pass has retired.

use std::collections::{BTreeSet, VecDeque};

use log::{debug, info, warn};

use crate::error::{InvariantError, NonConvergenceWarning, Nonconforming, Violation};
use crate::grid::{Coord, EdgeId, EdgeState, Grid};
use crate::registry::{PieceId, PieceRegistry, is_grid_connected, is_square_block};

/// Optimizer bounds, taken from the run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeParams {
    pub min_piece_size: usize,
    pub max_piece_size: usize,
    pub max_iterations: usize,
}

/// Outcome of an optimizer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// Iterations performed, counting the final unchanged one
    pub iterations: usize,
    /// Whether an iteration completed without any change
    pub settled: bool,
    pub merges: usize,
    pub splits: usize,
    /// Splits that needed the region fallback
    pub region_splits: usize,
    pub warning: Option<NonConvergenceWarning>,
}

/// How an oversized piece will be bisected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitPlan {
    /// Cut one tree edge; `branch` is the cell on the side that gets the new id
    Edge { edge: EdgeId, branch: Coord },
    /// Carve out a connected region and re-span both sides
    Region(BTreeSet<Coord>),
}

/// Drive the pieces toward the size and shape bounds
pub fn optimize(
    grid: &mut Grid,
    registry: &mut PieceRegistry,
    params: OptimizeParams,
) -> Result<OptimizeReport, InvariantError> {
    let mut report = OptimizeReport::default();

    for iteration in 1..=params.max_iterations {
        report.iterations = iteration;
        let mut changed = false;
        changed |= shrink_pass(grid, registry, params, &mut report)?;
        changed |= square_pass(grid, registry, &mut report)?;
        changed |= split_pass(grid, registry, params, &mut report)?;
        debug!(
            "optimizer iteration {iteration}: {} pieces, changed: {changed}",
            registry.len()
        );
        if !changed {
            report.settled = true;
            break;
        }
    }

    let pieces = nonconforming(registry, params);
    if !pieces.is_empty() {
        let warning = NonConvergenceWarning {
            iterations: report.iterations,
            cap_reached: !report.settled,
            pieces,
        };
        warn!("{warning}");
        report.warning = Some(warning);
    }

    info!(
        "optimizer finished with {} pieces after {} iterations ({} merges, {} splits)",
        registry.len(),
        report.iterations,
        report.merges,
        report.splits
    );
    Ok(report)
}

fn shrink_pass(
    grid: &mut Grid,
    registry: &mut PieceRegistry,
    params: OptimizeParams,
    report: &mut OptimizeReport,
) -> Result<bool, InvariantError> {
    let mut changed = false;
    for id in registry.ids() {
        let Some(piece) = registry.get(id) else {
            continue;
        };
        if piece.size() >= params.min_piece_size {
            continue;
        }
        if let Some((other, wall)) = merge_target(grid, registry, id)? {
            debug!("shrink: piece {id} ({} cells) into {other}", piece.size());
            registry.merge(grid, id, other, wall)?;
            report.merges += 1;
            changed = true;
        }
    }
    Ok(changed)
}

fn square_pass(
    grid: &mut Grid,
    registry: &mut PieceRegistry,
    report: &mut OptimizeReport,
) -> Result<bool, InvariantError> {
    let mut changed = false;
    for id in registry.ids() {
        let Some(piece) = registry.get(id) else {
            continue;
        };
        if !piece.is_square() {
            continue;
        }
        if let Some((other, wall)) = merge_target(grid, registry, id)? {
            debug!("square: piece {id} ({} cells) into {other}", piece.size());
            registry.merge(grid, id, other, wall)?;
            report.merges += 1;
            changed = true;
        }
    }
    Ok(changed)
}

fn split_pass(
    grid: &mut Grid,
    registry: &mut PieceRegistry,
    params: OptimizeParams,
    report: &mut OptimizeReport,
) -> Result<bool, InvariantError> {
    let mut changed = false;
    for id in registry.ids() {
        let Some(piece) = registry.get(id) else {
            continue;
        };
        if piece.size() <= params.max_piece_size {
            continue;
        }
        match find_split(grid, registry, id, params.min_piece_size)? {
            Some(SplitPlan::Edge { edge, branch }) => {
                registry.split_off(grid, id, edge, branch)?;
            }
            Some(SplitPlan::Region(region)) => {
                registry.split_region(grid, id, &region)?;
                report.region_splits += 1;
            }
            None => {
                debug!("split: piece {id} has no admissible split");
                continue;
            }
        }
        report.splits += 1;
        changed = true;
    }
    Ok(changed)
}

/// Smallest neighbor of `id` (ties to the lowest id) and the wall to open
///
/// Prefers the first shared `PieceCut` wall in row-major order, then the
/// first shared wall of any kind. `None` when the piece has no neighbors.
pub fn merge_target(
    grid: &Grid,
    registry: &PieceRegistry,
    id: PieceId,
) -> Result<Option<(PieceId, EdgeId)>, InvariantError> {
    let piece = registry.piece(id)?;
    let mut best: Option<(usize, PieceId)> = None;
    for &other in piece.neighbors().keys() {
        let candidate = (registry.size_of(other)?, other);
        if best.is_none_or(|current| candidate < current) {
            best = Some(candidate);
        }
    }
    let Some((_, other)) = best else {
        return Ok(None);
    };

    let walls = piece.shared_edges(other);
    let wall = walls.and_then(|walls| {
        walls
            .iter()
            .find(|wall| grid.state(**wall) == EdgeState::PieceCut)
            .or_else(|| walls.first())
            .copied()
    });
    Ok(wall.map(|wall| (other, wall)))
}

/// Find the most balanced admissible bisection of piece `id`
///
/// Both parts must hold at least `min_size` cells and neither may be a
/// square block. Tree edges are tried first, ordered by imbalance and then
/// row-major edge order; region bisections are the fallback.
pub fn find_split(
    grid: &Grid,
    registry: &PieceRegistry,
    id: PieceId,
    min_size: usize,
) -> Result<Option<SplitPlan>, InvariantError> {
    registry.check_tree(grid, id)?;
    let cells = registry.piece(id)?.cells();
    let tree = RootedTree::new(grid, cells);
    let n = cells.len();

    let mut candidates: Vec<(usize, EdgeId, usize)> = (1..tree.order.len())
        .filter_map(|i| {
            let branch = tree.sizes[i];
            let edge = tree.parent_edge[i]?;
            (branch >= min_size && n - branch >= min_size)
                .then(|| (n.abs_diff(2 * branch), edge, i))
        })
        .collect();
    candidates.sort();

    for (_, edge, i) in candidates {
        let part: BTreeSet<Coord> = tree.order[i..i + tree.sizes[i]].iter().copied().collect();
        if is_square_block(&part) || is_square_block(cells.difference(&part)) {
            continue;
        }
        return Ok(Some(SplitPlan::Edge {
            edge,
            branch: tree.order[i],
        }));
    }

    Ok(find_region_split(grid, cells, min_size).map(SplitPlan::Region))
}

/// Connected bipartition of `cells` with both sides connected, at least
/// `min_size` cells and not square, most balanced first
fn find_region_split(
    grid: &Grid,
    cells: &BTreeSet<Coord>,
    min_size: usize,
) -> Option<BTreeSet<Coord>> {
    let n = cells.len();
    if n < 2 * min_size {
        return None;
    }
    let mut targets: Vec<usize> = (min_size..=n - min_size).collect();
    targets.sort_by_key(|&k| (n.abs_diff(2 * k), k));

    for k in targets {
        for &seed in cells {
            let region = grow_region(grid, cells, seed, k);
            if region.len() < k {
                continue;
            }
            let rest: BTreeSet<Coord> = cells.difference(&region).copied().collect();
            if is_square_block(&region) || is_square_block(&rest) {
                continue;
            }
            if is_grid_connected(grid, &rest) {
                return Some(region);
            }
        }
    }
    None
}

/// Breadth-first region of up to `k` cells of `cells`, grown from `seed`
fn grow_region(grid: &Grid, cells: &BTreeSet<Coord>, seed: Coord, k: usize) -> BTreeSet<Coord> {
    let mut region = BTreeSet::from([seed]);
    let mut queue = VecDeque::from([seed]);
    while let Some(cell) = queue.pop_front() {
        for (_, next) in grid.neighbors(cell) {
            if region.len() == k {
                return region;
            }
            if cells.contains(&next) && region.insert(next) {
                queue.push_back(next);
            }
        }
    }
    region
}

/// A piece's open-edge tree, rooted at its first cell in row-major order
///
/// `order` is a preorder, so the subtree of `order[i]` is exactly
/// `order[i..i + sizes[i]]`.
struct RootedTree {
    order: Vec<Coord>,
    /// Edge to the parent; `None` for the root
    parent_edge: Vec<Option<EdgeId>>,
    sizes: Vec<usize>,
}

impl RootedTree {
    fn new(grid: &Grid, cells: &BTreeSet<Coord>) -> Self {
        let mut order = Vec::with_capacity(cells.len());
        let mut parent_edge = Vec::with_capacity(cells.len());
        let mut parent_of: Vec<Option<usize>> = Vec::with_capacity(cells.len());
        let mut seen = BTreeSet::new();
        let mut stack: Vec<(Coord, Option<(usize, EdgeId)>)> = Vec::new();

        if let Some(&root) = cells.first() {
            seen.insert(root);
            stack.push((root, None));
        }
        while let Some((cell, parent)) = stack.pop() {
            let index = order.len();
            order.push(cell);
            parent_of.push(parent.map(|(p, _)| p));
            parent_edge.push(parent.map(|(_, e)| e));
            for (dir, next) in grid.neighbors(cell) {
                if cells.contains(&next) && grid.edge(cell, dir).is_open() && seen.insert(next) {
                    stack.push((next, Some((index, grid.edge_id(cell, dir)))));
                }
            }
        }

        let mut sizes = vec![1usize; order.len()];
        for i in (1..order.len()).rev() {
            if let Some(p) = parent_of[i] {
                sizes[p] += sizes[i];
            }
        }
        Self {
            order,
            parent_edge,
            sizes,
        }
    }
}

/// Pieces outside the bounds; the sole whole-grid piece is exempt from the
/// undersized and square checks
pub fn nonconforming(registry: &PieceRegistry, params: OptimizeParams) -> Vec<Nonconforming> {
    registry
        .pieces()
        .filter_map(|piece| {
            let exempt = !piece.has_neighbors();
            let violation = if piece.size() > params.max_piece_size {
                Violation::Oversized
            } else if !exempt && piece.size() < params.min_piece_size {
                Violation::Undersized
            } else if !exempt && piece.is_square() {
                Violation::Square
            } else {
                return None;
            };
            Some(Nonconforming {
                piece: piece.id(),
                size: piece.size(),
                violation,
            })
        })
        .collect()
}
