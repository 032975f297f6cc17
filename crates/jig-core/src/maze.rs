//! Maze building
//!
//! Randomized depth-first spanning tree over the cell lattice. The walk is
//! recorded step by step so the carver can replay it without drawing any
//! randomness of its own for the traversal.

use std::collections::BTreeMap;

use log::{info, trace};

use crate::error::InvariantError;
use crate::grid::{Coord, Direction, EdgeId, EdgeState, Grid};
use crate::rng::LayoutRng;

/// One event of the recorded depth-first walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Forward move across a newly opened tree edge
    Advance { from: Coord, to: Coord, edge: EdgeId },
    /// Backtrack from an exhausted cell to its parent
    Retreat { from: Coord, to: Coord },
}

/// The recorded traversal that built the maze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MazeWalk {
    start: Coord,
    steps: Vec<WalkStep>,
}

impl MazeWalk {
    pub fn start(&self) -> Coord {
        self.start
    }

    pub fn steps(&self) -> &[WalkStep] {
        &self.steps
    }

    /// Tree edges in the order they were opened
    pub fn tree_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.steps.iter().filter_map(|step| match step {
            WalkStep::Advance { edge, .. } => Some(*edge),
            WalkStep::Retreat { .. } => None,
        })
    }

    /// Cells in preorder, starting with the seed cell
    pub fn preorder(&self) -> impl Iterator<Item = Coord> + '_ {
        std::iter::once(self.start).chain(self.steps.iter().filter_map(|step| match step {
            WalkStep::Advance { to, .. } => Some(*to),
            WalkStep::Retreat { .. } => None,
        }))
    }

    /// Number of cells in the subtree rooted at each cell
    ///
    /// Cutting the tree edge into `c` disconnects exactly `sizes[c]` cells.
    pub fn subtree_sizes(&self) -> BTreeMap<Coord, usize> {
        let mut sizes = BTreeMap::from([(self.start, 1usize)]);
        let mut path = vec![self.start];

        for step in &self.steps {
            match *step {
                WalkStep::Advance { to, .. } => {
                    sizes.insert(to, 1);
                    path.push(to);
                }
                WalkStep::Retreat { .. } => fold_child(&mut path, &mut sizes),
            }
        }
        // A truncated walk still leaves consistent sizes
        while path.len() > 1 {
            fold_child(&mut path, &mut sizes);
        }
        sizes
    }
}

/// Pop the top of `path` and add its subtree size to its parent
fn fold_child(path: &mut Vec<Coord>, sizes: &mut BTreeMap<Coord, usize>) {
    if let Some(child) = path.pop() {
        let size = sizes.get(&child).copied().unwrap_or(0);
        if let Some(parent) = path.last() {
            *sizes.entry(*parent).or_insert(0) += size;
        }
    }
}

/// A cell on the traversal stack with its shuffled candidate directions
struct Frame {
    cell: Coord,
    dirs: Vec<Direction>,
    next: usize,
}

/// Open a random spanning tree over `grid`, starting from `start`
///
/// Every internal edge must be `Blocked` on entry. Afterwards exactly
/// `width * height - 1` edges are `MazeOpen` and they form a tree.
/// Fails with `OutsideGrid` when `start` is not a cell of `grid`.
pub fn build_maze(
    grid: &mut Grid,
    start: Coord,
    rng: &mut LayoutRng,
) -> Result<MazeWalk, InvariantError> {
    if !grid.contains(start) {
        return Err(InvariantError::OutsideGrid(start));
    }
    let mut visited = vec![false; grid.cell_count()];
    let mut steps = Vec::with_capacity(2 * grid.cell_count());
    let mut stack = Vec::with_capacity(grid.cell_count());

    visited[grid.index(start)] = true;
    stack.push(frame(grid, start, &visited, rng));

    while let Some(top) = stack.last_mut() {
        let cell = top.cell;
        let mut advanced = None;
        while top.next < top.dirs.len() {
            let dir = top.dirs[top.next];
            top.next += 1;
            if let Some(next) = grid.neighbor(cell, dir) {
                if !visited[grid.index(next)] {
                    advanced = Some((dir, next));
                    break;
                }
            }
        }

        match advanced {
            Some((dir, next)) => {
                let edge = grid.edge_id(cell, dir);
                grid.set_state(edge, EdgeState::MazeOpen)?;
                visited[grid.index(next)] = true;
                trace!("maze: {cell} -> {next}");
                steps.push(WalkStep::Advance {
                    from: cell,
                    to: next,
                    edge,
                });
                stack.push(frame(grid, next, &visited, rng));
            }
            None => {
                stack.pop();
                if let Some(parent) = stack.last() {
                    trace!("maze: {cell} <- {}", parent.cell);
                    steps.push(WalkStep::Retreat {
                        from: cell,
                        to: parent.cell,
                    });
                }
            }
        }
    }

    info!(
        "maze built over {}x{} from {start}: {} open edges",
        grid.width(),
        grid.height(),
        grid.count(EdgeState::MazeOpen)
    );
    Ok(MazeWalk { start, steps })
}

/// Push-time frame: unvisited neighbors in a shuffled order
fn frame(grid: &Grid, cell: Coord, visited: &[bool], rng: &mut LayoutRng) -> Frame {
    let mut dirs: Vec<Direction> = grid
        .neighbors(cell)
        .filter(|(_, next)| !visited[grid.index(*next)])
        .map(|(dir, _)| dir)
        .collect();
    rng.shuffle(&mut dirs);
    Frame {
        cell,
        dirs,
        next: 0,
    }
}
