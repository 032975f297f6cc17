//! Grid model
//!
//! The rectangular cell lattice and the state of every edge. Each edge is
//! stored once, so both adjacent cells always see the same state.

mod cell;
mod edge;

pub use cell::{Coord, Direction};
pub use edge::{Axis, EdgeId, EdgeState};

use strum::IntoEnumIterator;

use crate::error::{ConfigError, InvariantError};

/// Cell lattice with per-edge wall state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// `width * (height + 1)` edges, indexed `y * width + x`
    horizontal: Vec<EdgeState>,
    /// `(width + 1) * height` edges, indexed `y * (width + 1) + x`
    vertical: Vec<EdgeState>,
}

impl Grid {
    /// Allocate a lattice with every internal edge `Blocked` and every
    /// lattice-boundary edge `Boundary`
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }

        let mut horizontal = vec![EdgeState::Blocked; width * (height + 1)];
        for x in 0..width {
            horizontal[x] = EdgeState::Boundary;
            horizontal[height * width + x] = EdgeState::Boundary;
        }

        let mut vertical = vec![EdgeState::Blocked; (width + 1) * height];
        for y in 0..height {
            vertical[y * (width + 1)] = EdgeState::Boundary;
            vertical[y * (width + 1) + width] = EdgeState::Boundary;
        }

        Ok(Self {
            width,
            height,
            horizontal,
            vertical,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Dense row-major index of a cell
    pub fn index(&self, coord: Coord) -> usize {
        coord.y * self.width + coord.x
    }

    pub fn coord_at(&self, index: usize) -> Coord {
        Coord::new(index % self.width, index / self.width)
    }

    /// All cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cell_count()).map(|i| self.coord_at(i))
    }

    /// The adjacent cell in `dir`, or `None` at the grid edge
    pub fn neighbor(&self, coord: Coord, dir: Direction) -> Option<Coord> {
        coord.step(dir).filter(|next| self.contains(*next))
    }

    /// In-grid neighbors in North, East, South, West order
    pub fn neighbors(&self, coord: Coord) -> impl Iterator<Item = (Direction, Coord)> + '_ {
        Direction::iter().filter_map(move |dir| self.neighbor(coord, dir).map(|next| (dir, next)))
    }

    /// Identity of the edge on side `dir` of `coord`
    pub fn edge_id(&self, coord: Coord, dir: Direction) -> EdgeId {
        match dir {
            Direction::North => EdgeId::horizontal(coord.x, coord.y),
            Direction::South => EdgeId::horizontal(coord.x, coord.y + 1),
            Direction::West => EdgeId::vertical(coord.x, coord.y),
            Direction::East => EdgeId::vertical(coord.x + 1, coord.y),
        }
    }

    /// The cells on either side of an edge: north/west first, south/east second
    pub fn cells_of(&self, edge: EdgeId) -> (Option<Coord>, Option<Coord>) {
        let second = Coord::new(edge.x, edge.y);
        let first = match edge.axis {
            Axis::Horizontal => second.step(Direction::North),
            Axis::Vertical => second.step(Direction::West),
        };
        (
            first.filter(|c| self.contains(*c)),
            Some(second).filter(|c| self.contains(*c)),
        )
    }

    /// Both cells of an internal edge
    pub fn sides(&self, edge: EdgeId) -> Option<(Coord, Coord)> {
        match self.cells_of(edge) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    pub fn is_internal(&self, edge: EdgeId) -> bool {
        self.sides(edge).is_some()
    }

    fn slot(&self, edge: EdgeId) -> Option<usize> {
        match edge.axis {
            Axis::Horizontal if edge.x < self.width && edge.y <= self.height => {
                Some(edge.y * self.width + edge.x)
            }
            Axis::Vertical if edge.x <= self.width && edge.y < self.height => {
                Some(edge.y * (self.width + 1) + edge.x)
            }
            _ => None,
        }
    }

    /// State of an edge; edges outside the lattice read as `Boundary`
    pub fn state(&self, edge: EdgeId) -> EdgeState {
        match (edge.axis, self.slot(edge)) {
            (Axis::Horizontal, Some(i)) => self.horizontal[i],
            (Axis::Vertical, Some(i)) => self.vertical[i],
            (_, None) => EdgeState::Boundary,
        }
    }

    /// State of the edge on side `dir` of `coord`
    pub fn edge(&self, coord: Coord, dir: Direction) -> EdgeState {
        self.state(self.edge_id(coord, dir))
    }

    /// Set the state of an internal edge, returning the prior state
    pub fn set_state(
        &mut self,
        edge: EdgeId,
        state: EdgeState,
    ) -> Result<EdgeState, InvariantError> {
        let slot = self.slot(edge).ok_or(InvariantError::UnknownEdge(edge))?;
        let current = self.state(edge);
        if current == EdgeState::Boundary || state == EdgeState::Boundary {
            return Err(InvariantError::BoundaryEdge(edge));
        }
        match edge.axis {
            Axis::Horizontal => self.horizontal[slot] = state,
            Axis::Vertical => self.vertical[slot] = state,
        }
        Ok(current)
    }

    /// Set the edge on side `dir` of `coord`, returning the prior state
    pub fn set_edge(
        &mut self,
        coord: Coord,
        dir: Direction,
        state: EdgeState,
    ) -> Result<EdgeState, InvariantError> {
        self.set_state(self.edge_id(coord, dir), state)
    }

    /// All internal edges in row-major order
    ///
    /// The sequence is lazy and can be restarted by calling again.
    pub fn internal_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges().filter(move |edge| self.is_internal(*edge))
    }

    /// Every edge, boundary included, in row-major order
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        let (width, height) = (self.width, self.height);
        (0..=height).flat_map(move |y| {
            (0..=width).flat_map(move |x| {
                let horizontal = (x < width).then(|| EdgeId::horizontal(x, y));
                let vertical = (y < height).then(|| EdgeId::vertical(x, y));
                horizontal.into_iter().chain(vertical)
            })
        })
    }

    /// Number of edges currently in `state`
    pub fn count(&self, state: EdgeState) -> usize {
        self.horizontal
            .iter()
            .chain(self.vertical.iter())
            .filter(|s| **s == state)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            Grid::new(0, 3),
            Err(ConfigError::EmptyGrid { width: 0, height: 3 })
        ));
        assert!(Grid::new(3, 0).is_err());
    }

    #[test]
    fn test_initial_states() {
        let grid = Grid::new(3, 2).unwrap();
        // 3 * 3 horizontal + 4 * 2 vertical
        assert_eq!(grid.edges().count(), 17);
        // Perimeter: 2 * (3 + 2)
        assert_eq!(grid.count(EdgeState::Boundary), 10);
        assert_eq!(grid.count(EdgeState::Blocked), 7);
        assert_eq!(grid.internal_edges().count(), 7);

        for cell in grid.cells() {
            for dir in Direction::iter() {
                let expected = if grid.neighbor(cell, dir).is_some() {
                    EdgeState::Blocked
                } else {
                    EdgeState::Boundary
                };
                assert_eq!(grid.edge(cell, dir), expected, "{cell} {dir}");
            }
        }
    }

    #[test]
    fn test_edge_shared_between_cells() {
        let mut grid = Grid::new(4, 4).unwrap();
        let a = Coord::new(1, 1);
        let b = Coord::new(2, 1);
        assert_eq!(grid.edge_id(a, Direction::East), grid.edge_id(b, Direction::West));

        let prior = grid.set_edge(a, Direction::East, EdgeState::MazeOpen).unwrap();
        assert_eq!(prior, EdgeState::Blocked);
        assert_eq!(grid.edge(b, Direction::West), EdgeState::MazeOpen);

        let c = Coord::new(1, 2);
        grid.set_edge(c, Direction::North, EdgeState::PieceCut).unwrap();
        assert_eq!(grid.edge(a, Direction::South), EdgeState::PieceCut);
    }

    #[test]
    fn test_boundary_is_immutable() {
        let mut grid = Grid::new(2, 2).unwrap();
        let origin = Coord::new(0, 0);
        let edge = grid.edge_id(origin, Direction::North);
        assert_eq!(
            grid.set_state(edge, EdgeState::MazeOpen),
            Err(InvariantError::BoundaryEdge(edge))
        );
        let inner = grid.edge_id(origin, Direction::East);
        assert!(grid.set_state(inner, EdgeState::Boundary).is_err());
        assert_eq!(grid.state(inner), EdgeState::Blocked);
    }

    #[test]
    fn test_unknown_edge() {
        let mut grid = Grid::new(2, 2).unwrap();
        let outside = EdgeId::vertical(7, 7);
        assert_eq!(grid.state(outside), EdgeState::Boundary);
        assert_eq!(
            grid.set_state(outside, EdgeState::MazeOpen),
            Err(InvariantError::UnknownEdge(outside))
        );
    }

    #[test]
    fn test_neighbor_at_edges() {
        let grid = Grid::new(3, 3).unwrap();
        let corner = Coord::new(2, 2);
        assert_eq!(grid.neighbor(corner, Direction::East), None);
        assert_eq!(grid.neighbor(corner, Direction::South), None);
        assert_eq!(grid.neighbor(corner, Direction::North), Some(Coord::new(2, 1)));
        assert_eq!(grid.neighbors(Coord::new(1, 1)).count(), 4);
        assert_eq!(grid.neighbors(Coord::new(0, 0)).count(), 2);
    }

    #[test]
    fn test_cells_of() {
        let grid = Grid::new(3, 2).unwrap();
        assert_eq!(
            grid.cells_of(EdgeId::horizontal(1, 1)),
            (Some(Coord::new(1, 0)), Some(Coord::new(1, 1)))
        );
        assert_eq!(
            grid.cells_of(EdgeId::vertical(0, 1)),
            (None, Some(Coord::new(0, 1)))
        );
        assert_eq!(
            grid.cells_of(EdgeId::vertical(3, 1)),
            (Some(Coord::new(2, 1)), None)
        );
    }

    #[test]
    fn test_internal_edges_sorted_and_restartable() {
        let grid = Grid::new(4, 3).unwrap();
        let first: Vec<_> = grid.internal_edges().collect();
        let second: Vec<_> = grid.internal_edges().collect();
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
        // 4 * 2 horizontal + 3 * 3 vertical
        assert_eq!(first.len(), 4 * 2 + 3 * 3);
    }

    #[test]
    fn test_single_cell_has_no_internal_edges() {
        let grid = Grid::new(1, 1).unwrap();
        assert_eq!(grid.internal_edges().count(), 0);
        assert_eq!(grid.count(EdgeState::Boundary), 4);
    }
}
