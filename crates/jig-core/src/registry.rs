//! Piece registry
//!
//! Pieces are the connected components of the grid under `MazeOpen` edges.
//! The registry caches which piece owns each cell and which pieces touch,
//! and every mutation here changes edge state and the cache together.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::InvariantError;
use crate::grid::{Coord, Direction, EdgeId, EdgeState, Grid};

/// Identifier of a piece; never reused within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A maximal set of cells joined by open edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    id: PieceId,
    cells: BTreeSet<Coord>,
    /// Neighboring pieces and the walls shared with each, row-major
    neighbors: BTreeMap<PieceId, BTreeSet<EdgeId>>,
}

impl Piece {
    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &BTreeSet<Coord> {
        &self.cells
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.cells.contains(&coord)
    }

    pub fn neighbors(&self) -> &BTreeMap<PieceId, BTreeSet<EdgeId>> {
        &self.neighbors
    }

    pub fn has_neighbors(&self) -> bool {
        !self.neighbors.is_empty()
    }

    /// Walls shared with `other`, row-major
    pub fn shared_edges(&self, other: PieceId) -> Option<&BTreeSet<EdgeId>> {
        self.neighbors.get(&other)
    }

    /// Whether the piece fills a k x k block exactly
    pub fn is_square(&self) -> bool {
        is_square_block(&self.cells)
    }
}

/// True when `cells` fill a k x k bounding box with no gaps (k >= 1)
pub fn is_square_block<'a>(cells: impl IntoIterator<Item = &'a Coord>) -> bool {
    let mut count = 0usize;
    let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
    let (mut max_x, mut max_y) = (0usize, 0usize);
    for cell in cells {
        count += 1;
        min_x = min_x.min(cell.x);
        min_y = min_y.min(cell.y);
        max_x = max_x.max(cell.x);
        max_y = max_y.max(cell.y);
    }
    if count == 0 {
        return false;
    }
    let width = max_x - min_x + 1;
    let height = max_y - min_y + 1;
    width == height && count == width * height
}

/// Cells reachable from `start` through open edges
pub fn open_component(grid: &Grid, start: Coord) -> BTreeSet<Coord> {
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        for (dir, next) in grid.neighbors(cell) {
            if grid.edge(cell, dir).is_open() && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Whether `cells` form one region under plain grid adjacency
pub fn is_grid_connected(grid: &Grid, cells: &BTreeSet<Coord>) -> bool {
    let Some(&start) = cells.first() else {
        return false;
    };
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        for (_, next) in grid.neighbors(cell) {
            if cells.contains(&next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.len() == cells.len()
}

/// Equivalence classes over a fixed set of members
#[derive(Debug, Clone)]
struct ConnectivityTracker {
    /// Each member's class; members in the same class are connected
    smeq: Vec<usize>,
}

impl ConnectivityTracker {
    fn new(members: usize) -> Self {
        Self {
            smeq: (0..members).collect(),
        }
    }

    fn are_connected(&self, a: usize, b: usize) -> bool {
        self.smeq[a] == self.smeq[b]
    }

    fn merge(&mut self, a: usize, b: usize) {
        let old_class = self.smeq[b];
        let new_class = self.smeq[a];
        for eq in &mut self.smeq {
            if *eq == old_class {
                *eq = new_class;
            }
        }
    }

    fn all_connected(&self) -> bool {
        match self.smeq.first() {
            Some(&first) => self.smeq.iter().all(|&c| c == first),
            None => true,
        }
    }
}

/// Connected components and their adjacency, cached over grid edge state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceRegistry {
    width: usize,
    /// Owning piece of each cell, row-major
    owner: Vec<PieceId>,
    pieces: BTreeMap<PieceId, Piece>,
    next_id: u32,
}

impl PieceRegistry {
    /// Derive the pieces from edge state by flood fill
    ///
    /// Ids are assigned in row-major order of each piece's first cell.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut owner: Vec<Option<PieceId>> = vec![None; grid.cell_count()];
        let mut pieces = BTreeMap::new();
        let mut next_id = 0u32;

        for cell in grid.cells() {
            if owner[grid.index(cell)].is_some() {
                continue;
            }
            let id = PieceId(next_id);
            next_id += 1;
            let cells = open_component(grid, cell);
            for member in &cells {
                owner[grid.index(*member)] = Some(id);
            }
            pieces.insert(
                id,
                Piece {
                    id,
                    cells,
                    neighbors: BTreeMap::new(),
                },
            );
        }

        let mut registry = Self {
            width: grid.width(),
            owner: owner.into_iter().map(|o| o.unwrap_or(PieceId(0))).collect(),
            pieces,
            next_id,
        };
        let all: BTreeSet<PieceId> = registry.pieces.keys().copied().collect();
        registry.refresh(grid, &all);
        registry
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Snapshot of the current ids, ascending
    pub fn ids(&self) -> Vec<PieceId> {
        self.pieces.keys().copied().collect()
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn piece(&self, id: PieceId) -> Result<&Piece, InvariantError> {
        self.pieces.get(&id).ok_or(InvariantError::UnknownPiece(id))
    }

    /// Owning piece of a cell inside the grid
    pub fn piece_at(&self, coord: Coord) -> PieceId {
        self.owner[coord.y * self.width + coord.x]
    }

    pub fn size_of(&self, id: PieceId) -> Result<usize, InvariantError> {
        self.piece(id).map(Piece::size)
    }

    pub fn shape_is_square(&self, id: PieceId) -> Result<bool, InvariantError> {
        self.piece(id).map(Piece::is_square)
    }

    /// Pieces on either side of an edge; equal ids mean the edge is
    /// internal to one piece
    pub fn pieces_of(&self, grid: &Grid, edge: EdgeId) -> (Option<PieceId>, Option<PieceId>) {
        let (first, second) = grid.cells_of(edge);
        (
            first.map(|c| self.piece_at(c)),
            second.map(|c| self.piece_at(c)),
        )
    }

    /// Fuse two pieces across a wall they share
    ///
    /// `edge` must be a `PieceCut` or `Blocked` wall with `a` on one side and
    /// `b` on the other. It becomes `MazeOpen`; any other `PieceCut` wall on
    /// the same seam reverts to `Blocked`. The larger id survives.
    pub fn merge(
        &mut self,
        grid: &mut Grid,
        a: PieceId,
        b: PieceId,
        edge: EdgeId,
    ) -> Result<PieceId, InvariantError> {
        if a == b {
            return Err(InvariantError::SelfMerge(a));
        }
        let seam: Vec<EdgeId> = self
            .piece(a)?
            .shared_edges(b)
            .map(|walls| walls.iter().copied().collect())
            .unwrap_or_default();
        self.piece(b)?;

        let separates = match self.pieces_of(grid, edge) {
            (Some(x), Some(y)) => (x == a && y == b) || (x == b && y == a),
            _ => false,
        };
        if !separates || !grid.state(edge).is_separator() {
            return Err(InvariantError::NotSeparating { edge, a, b });
        }

        grid.set_state(edge, EdgeState::MazeOpen)?;
        for wall in seam {
            if wall != edge && grid.state(wall) == EdgeState::PieceCut {
                grid.set_state(wall, EdgeState::Blocked)?;
            }
        }

        let (keep, gone) = if a > b { (a, b) } else { (b, a) };
        let absorbed = self
            .pieces
            .remove(&gone)
            .ok_or(InvariantError::UnknownPiece(gone))?;
        for cell in &absorbed.cells {
            self.owner[cell.y * self.width + cell.x] = keep;
        }

        let survivor = self
            .pieces
            .get_mut(&keep)
            .ok_or(InvariantError::UnknownPiece(keep))?;
        let mut touched: BTreeSet<PieceId> = survivor.neighbors.keys().copied().collect();
        touched.extend(absorbed.neighbors.keys().copied());
        survivor.cells.extend(absorbed.cells);
        touched.insert(keep);
        touched.remove(&gone);
        self.refresh(grid, &touched);

        debug!("merged piece {gone} into {keep} across {edge}");
        Ok(keep)
    }

    /// Cut an open edge inside `piece`; the new id goes to the part holding
    /// the edge's south/east cell
    pub fn split(
        &mut self,
        grid: &mut Grid,
        piece: PieceId,
        edge: EdgeId,
    ) -> Result<PieceId, InvariantError> {
        let (_, second) = grid
            .sides(edge)
            .ok_or(InvariantError::NotInternal { edge, piece })?;
        self.split_off(grid, piece, edge, second)
    }

    /// Cut an open edge inside `piece`; the new id goes to the part holding
    /// `branch`, which must be one of the edge's cells
    ///
    /// Fails, leaving everything unchanged, unless removing the edge leaves
    /// exactly two connected parts.
    pub fn split_off(
        &mut self,
        grid: &mut Grid,
        piece: PieceId,
        edge: EdgeId,
        branch: Coord,
    ) -> Result<PieceId, InvariantError> {
        let (first, second) = grid
            .sides(edge)
            .ok_or(InvariantError::NotInternal { edge, piece })?;
        let current = self.piece(piece)?;
        let size = current.size();
        let inside = current.contains(first) && current.contains(second);
        if !inside || !grid.state(edge).is_open() || (branch != first && branch != second) {
            return Err(InvariantError::NotInternal { edge, piece });
        }
        let other = if branch == first { second } else { first };

        grid.set_state(edge, EdgeState::PieceCut)?;
        let part = open_component(grid, branch);
        let bisects = !part.contains(&other) && {
            let rest = open_component(grid, other);
            part.len() + rest.len() == size
        };
        if !bisects {
            grid.set_state(edge, EdgeState::MazeOpen)?;
            return Err(InvariantError::NotBisecting { edge, piece });
        }

        let id = self.detach(grid, piece, part)?;
        debug!("split piece {piece} along {edge}, new piece {id}");
        Ok(id)
    }

    /// Carve `region` out of `piece` as a new piece
    ///
    /// Both `region` and the remainder must be connected under grid
    /// adjacency. Open edges between them become `PieceCut`, and each side is
    /// re-spanned by opening its own `Blocked` walls in row-major order until
    /// it is a single tree again.
    pub fn split_region(
        &mut self,
        grid: &mut Grid,
        piece: PieceId,
        region: &BTreeSet<Coord>,
    ) -> Result<PieceId, InvariantError> {
        let current = self.piece(piece)?;
        let rest: BTreeSet<Coord> = current.cells.difference(region).copied().collect();
        let valid = !region.is_empty()
            && !rest.is_empty()
            && region.iter().all(|c| current.contains(*c))
            && is_grid_connected(grid, region)
            && is_grid_connected(grid, &rest);
        if !valid {
            return Err(InvariantError::InvalidRegion { piece });
        }

        for &cell in region {
            for dir in [Direction::North, Direction::East, Direction::South, Direction::West] {
                let Some(next) = grid.neighbor(cell, dir) else {
                    continue;
                };
                if rest.contains(&next) && grid.edge(cell, dir).is_open() {
                    grid.set_edge(cell, dir, EdgeState::PieceCut)?;
                }
            }
        }
        respan(grid, region, piece)?;
        respan(grid, &rest, piece)?;

        let id = self.detach(grid, piece, region.clone())?;
        debug!(
            "split piece {piece} by region, new piece {id} with {} cells",
            region.len()
        );
        Ok(id)
    }

    /// Move `part` out of `piece` into a fresh id and refresh adjacency
    fn detach(
        &mut self,
        grid: &Grid,
        piece: PieceId,
        part: BTreeSet<Coord>,
    ) -> Result<PieceId, InvariantError> {
        let id = PieceId(self.next_id);
        self.next_id += 1;

        let current = self
            .pieces
            .get_mut(&piece)
            .ok_or(InvariantError::UnknownPiece(piece))?;
        let mut touched: BTreeSet<PieceId> = current.neighbors.keys().copied().collect();
        current.cells.retain(|c| !part.contains(c));
        for cell in &part {
            self.owner[cell.y * self.width + cell.x] = id;
        }
        self.pieces.insert(
            id,
            Piece {
                id,
                cells: part,
                neighbors: BTreeMap::new(),
            },
        );
        touched.insert(piece);
        touched.insert(id);
        self.refresh(grid, &touched);
        Ok(id)
    }

    /// Promote every `Blocked` wall between two different pieces to
    /// `PieceCut`, returning how many were promoted
    pub fn seal(&self, grid: &mut Grid) -> Result<usize, InvariantError> {
        let walls: Vec<EdgeId> = grid
            .internal_edges()
            .filter(|edge| grid.state(*edge) == EdgeState::Blocked)
            .filter(|edge| {
                let (a, b) = self.pieces_of(grid, *edge);
                a != b
            })
            .collect();
        for wall in &walls {
            grid.set_state(*wall, EdgeState::PieceCut)?;
        }
        Ok(walls.len())
    }

    /// Re-derive the partition from edge state and compare it with the cache
    pub fn verify(&self, grid: &Grid) -> Result<(), InvariantError> {
        let fresh = PieceRegistry::from_grid(grid);
        if fresh.len() != self.len() {
            let cell = first_disagreement(self, &fresh, grid).unwrap_or_default();
            return Err(InvariantError::PartitionMismatch(cell));
        }
        for piece in self.pieces.values() {
            let Some(&first) = piece.cells.first() else {
                continue;
            };
            let counterpart = fresh.piece_at(first);
            let fresh_size = fresh.size_of(counterpart)?;
            for &cell in &piece.cells {
                if self.piece_at(cell) != piece.id || fresh.piece_at(cell) != counterpart {
                    return Err(InvariantError::PartitionMismatch(cell));
                }
            }
            if fresh_size != piece.size() {
                return Err(InvariantError::PartitionMismatch(first));
            }
        }
        Ok(())
    }

    /// Check that a piece is spanned by exactly `size - 1` open edges
    pub fn check_tree(&self, grid: &Grid, id: PieceId) -> Result<(), InvariantError> {
        let piece = self.piece(id)?;
        let edges = open_edges_within(grid, &piece.cells).len();
        if edges + 1 != piece.size() {
            return Err(InvariantError::NotATree {
                piece: id,
                cells: piece.size(),
                edges,
            });
        }
        Ok(())
    }

    /// Recompute the neighbor maps of the given pieces from cell ownership
    fn refresh(&mut self, grid: &Grid, ids: &BTreeSet<PieceId>) {
        for &id in ids {
            let Some(piece) = self.pieces.get(&id) else {
                continue;
            };
            let mut neighbors: BTreeMap<PieceId, BTreeSet<EdgeId>> = BTreeMap::new();
            for &cell in &piece.cells {
                for (dir, next) in grid.neighbors(cell) {
                    let other = self.owner[next.y * self.width + next.x];
                    if other != id {
                        neighbors
                            .entry(other)
                            .or_default()
                            .insert(grid.edge_id(cell, dir));
                    }
                }
            }
            if let Some(piece) = self.pieces.get_mut(&id) {
                piece.neighbors = neighbors;
            }
        }
    }
}

/// Open edges with both cells in `cells`, row-major
pub fn open_edges_within(grid: &Grid, cells: &BTreeSet<Coord>) -> BTreeSet<EdgeId> {
    internal_walls_within(grid, cells)
        .into_iter()
        .filter(|edge| grid.state(*edge).is_open())
        .collect()
}

/// Internal edges with both cells in `cells`, row-major
pub fn internal_walls_within(grid: &Grid, cells: &BTreeSet<Coord>) -> BTreeSet<EdgeId> {
    let mut edges = BTreeSet::new();
    for &cell in cells {
        for dir in [Direction::East, Direction::South] {
            if let Some(next) = grid.neighbor(cell, dir) {
                if cells.contains(&next) {
                    edges.insert(grid.edge_id(cell, dir));
                }
            }
        }
    }
    edges
}

/// Reconnect `cells` into one tree of open edges by opening `Blocked`
/// walls in row-major order
fn respan(grid: &mut Grid, cells: &BTreeSet<Coord>, piece: PieceId) -> Result<(), InvariantError> {
    let slots: BTreeMap<Coord, usize> = cells.iter().enumerate().map(|(i, c)| (*c, i)).collect();
    let mut tracker = ConnectivityTracker::new(cells.len());
    let walls = internal_walls_within(grid, cells);

    let ends = |grid: &Grid, edge: EdgeId| -> Option<(usize, usize)> {
        let (a, b) = grid.sides(edge)?;
        Some((*slots.get(&a)?, *slots.get(&b)?))
    };

    for &edge in &walls {
        if grid.state(edge).is_open() {
            if let Some((a, b)) = ends(&*grid, edge) {
                tracker.merge(a, b);
            }
        }
    }
    for &edge in &walls {
        if grid.state(edge) != EdgeState::Blocked {
            continue;
        }
        if let Some((a, b)) = ends(&*grid, edge) {
            if !tracker.are_connected(a, b) {
                grid.set_state(edge, EdgeState::MazeOpen)?;
                tracker.merge(a, b);
            }
        }
    }

    if tracker.all_connected() {
        Ok(())
    } else {
        Err(InvariantError::InvalidRegion { piece })
    }
}

fn first_disagreement(ours: &PieceRegistry, fresh: &PieceRegistry, grid: &Grid) -> Option<Coord> {
    grid.cells().find(|cell| {
        let mine = ours.get(ours.piece_at(*cell)).map(Piece::size);
        let theirs = fresh.get(fresh.piece_at(*cell)).map(Piece::size);
        mine != theirs
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open a straight path along row 0, then down column `width - 1`, and so
    /// on: a serpentine spanning tree over the whole grid
    fn serpentine(width: usize, height: usize) -> Grid {
        let mut grid = Grid::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width - 1 {
                grid.set_edge(Coord::new(x, y), Direction::East, EdgeState::MazeOpen)
                    .unwrap();
            }
            if y + 1 < height {
                let x = if y % 2 == 0 { width - 1 } else { 0 };
                grid.set_edge(Coord::new(x, y), Direction::South, EdgeState::MazeOpen)
                    .unwrap();
            }
        }
        grid
    }

    #[test]
    fn test_square_predicate() {
        let one = BTreeSet::from([Coord::new(3, 3)]);
        assert!(is_square_block(&one));

        let block: BTreeSet<_> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        assert!(is_square_block(&block));

        let bar: BTreeSet<_> = [(0, 0), (1, 0), (2, 0), (3, 0)]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        assert!(!is_square_block(&bar));

        let notched: BTreeSet<_> = [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (0, 2), (1, 2), (2, 2)]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        assert!(!is_square_block(&notched));
        assert!(!is_square_block(&BTreeSet::new()));
    }

    #[test]
    fn test_from_grid_without_open_edges() {
        let grid = Grid::new(3, 2).unwrap();
        let registry = PieceRegistry::from_grid(&grid);
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.piece_at(Coord::new(0, 0)), PieceId(0));
        assert_eq!(registry.piece_at(Coord::new(2, 1)), PieceId(5));
        let corner = registry.piece(PieceId(0)).unwrap();
        assert_eq!(corner.neighbors().len(), 2);
        assert!(corner.is_square());
    }

    #[test]
    fn test_from_grid_single_piece() {
        let grid = serpentine(4, 3);
        let registry = PieceRegistry::from_grid(&grid);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.size_of(PieceId(0)).unwrap(), 12);
        assert!(!registry.piece(PieceId(0)).unwrap().has_neighbors());
        registry.check_tree(&grid, PieceId(0)).unwrap();
        registry.verify(&grid).unwrap();
    }

    #[test]
    fn test_pieces_of() {
        let grid = serpentine(3, 3);
        let registry = PieceRegistry::from_grid(&grid);
        let inner = EdgeId::vertical(1, 0);
        assert_eq!(
            registry.pieces_of(&grid, inner),
            (Some(PieceId(0)), Some(PieceId(0)))
        );
        let outer = EdgeId::horizontal(0, 0);
        assert_eq!(registry.pieces_of(&grid, outer), (None, Some(PieceId(0))));
    }

    #[test]
    fn test_split_and_merge_round_trip() {
        let mut grid = serpentine(4, 2);
        let mut registry = PieceRegistry::from_grid(&grid);

        // Row 0 runs east, then (3,0)-(3,1) drops to row 1
        let drop = EdgeId::horizontal(3, 1);
        let lower = registry.split(&mut grid, PieceId(0), drop).unwrap();
        assert_eq!(lower, PieceId(1));
        assert_eq!(grid.state(drop), EdgeState::PieceCut);
        assert_eq!(registry.size_of(PieceId(0)).unwrap(), 4);
        assert_eq!(registry.size_of(lower).unwrap(), 4);
        assert_eq!(registry.piece_at(Coord::new(0, 1)), lower);

        let shared = registry.piece(PieceId(0)).unwrap().shared_edges(lower).unwrap();
        assert_eq!(shared.len(), 4);
        assert!(shared.contains(&drop));
        registry.verify(&grid).unwrap();

        let kept = registry.merge(&mut grid, PieceId(0), lower, drop).unwrap();
        assert_eq!(kept, lower);
        assert_eq!(registry.len(), 1);
        assert_eq!(grid.state(drop), EdgeState::MazeOpen);
        assert_eq!(registry.size_of(kept).unwrap(), 8);
        registry.verify(&grid).unwrap();
        registry.check_tree(&grid, kept).unwrap();
    }

    #[test]
    fn test_merge_dissolves_seam() {
        let mut grid = serpentine(3, 2);
        let mut registry = PieceRegistry::from_grid(&grid);
        let drop = EdgeId::horizontal(2, 1);
        let lower = registry.split(&mut grid, PieceId(0), drop).unwrap();

        // Mark another wall on the seam as a cut, then merge across a third
        let cut = EdgeId::horizontal(0, 1);
        grid.set_state(cut, EdgeState::PieceCut).unwrap();
        let across = EdgeId::horizontal(1, 1);
        registry.merge(&mut grid, lower, PieceId(0), across).unwrap();

        assert_eq!(grid.state(across), EdgeState::MazeOpen);
        assert_eq!(grid.state(cut), EdgeState::Blocked);
        assert_eq!(grid.state(drop), EdgeState::Blocked);
        assert_eq!(grid.count(EdgeState::PieceCut), 0);
    }

    #[test]
    fn test_merge_rejects_wrong_edge() {
        let mut grid = serpentine(4, 2);
        let mut registry = PieceRegistry::from_grid(&grid);
        let lower = registry
            .split(&mut grid, PieceId(0), EdgeId::horizontal(3, 1))
            .unwrap();

        // Open edge inside piece 0
        let inner = EdgeId::vertical(1, 0);
        assert_eq!(
            registry.merge(&mut grid, PieceId(0), lower, inner),
            Err(InvariantError::NotSeparating {
                edge: inner,
                a: PieceId(0),
                b: lower
            })
        );
        assert_eq!(
            registry.merge(&mut grid, lower, lower, inner),
            Err(InvariantError::SelfMerge(lower))
        );
        assert_eq!(
            registry.merge(&mut grid, PieceId(0), PieceId(9), inner),
            Err(InvariantError::UnknownPiece(PieceId(9)))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_split_rejects_non_bridge() {
        let mut grid = Grid::new(2, 2).unwrap();
        // A cycle around the 2x2 block
        for (cell, dir) in [
            (Coord::new(0, 0), Direction::East),
            (Coord::new(0, 0), Direction::South),
            (Coord::new(1, 0), Direction::South),
            (Coord::new(0, 1), Direction::East),
        ] {
            grid.set_edge(cell, dir, EdgeState::MazeOpen).unwrap();
        }
        let mut registry = PieceRegistry::from_grid(&grid);
        let edge = EdgeId::vertical(1, 0);
        assert_eq!(
            registry.split(&mut grid, PieceId(0), edge),
            Err(InvariantError::NotBisecting {
                edge,
                piece: PieceId(0)
            })
        );
        assert_eq!(grid.state(edge), EdgeState::MazeOpen);
        assert_eq!(registry.len(), 1);
        assert!(registry.check_tree(&grid, PieceId(0)).is_err());
    }

    #[test]
    fn test_split_rejects_closed_edge() {
        let mut grid = serpentine(3, 3);
        let mut registry = PieceRegistry::from_grid(&grid);
        // Between (0,0) and (0,1): a maze wall, not an open edge
        let wall = EdgeId::horizontal(0, 1);
        assert_eq!(grid.state(wall), EdgeState::Blocked);
        assert!(matches!(
            registry.split(&mut grid, PieceId(0), wall),
            Err(InvariantError::NotInternal { .. })
        ));
        let boundary = EdgeId::vertical(0, 0);
        assert!(registry.split(&mut grid, PieceId(0), boundary).is_err());
    }

    #[test]
    fn test_split_off_assigns_branch() {
        let mut grid = serpentine(4, 2);
        let mut registry = PieceRegistry::from_grid(&grid);
        let edge = EdgeId::vertical(1, 0);
        let id = registry
            .split_off(&mut grid, PieceId(0), edge, Coord::new(0, 0))
            .unwrap();
        assert_eq!(registry.size_of(id).unwrap(), 1);
        assert_eq!(registry.piece_at(Coord::new(0, 0)), id);
        assert_eq!(registry.size_of(PieceId(0)).unwrap(), 7);
    }

    #[test]
    fn test_split_region_respans_both_sides() {
        let mut grid = serpentine(4, 2);
        let mut registry = PieceRegistry::from_grid(&grid);
        // Left half: not a subtree of the serpentine
        let region: BTreeSet<Coord> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        let id = registry
            .split_region(&mut grid, PieceId(0), &region)
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.size_of(id).unwrap(), 4);
        assert_eq!(registry.size_of(PieceId(0)).unwrap(), 4);
        registry.check_tree(&grid, id).unwrap();
        registry.check_tree(&grid, PieceId(0)).unwrap();
        registry.verify(&grid).unwrap();
        assert_eq!(grid.state(EdgeId::vertical(2, 0)), EdgeState::PieceCut);
        assert_eq!(grid.state(EdgeId::vertical(2, 1)), EdgeState::PieceCut);
    }

    #[test]
    fn test_split_region_rejects_disconnected() {
        let mut grid = serpentine(4, 1);
        let mut registry = PieceRegistry::from_grid(&grid);
        let region = BTreeSet::from([Coord::new(1, 0)]);
        assert_eq!(
            registry.split_region(&mut grid, PieceId(0), &region),
            Err(InvariantError::InvalidRegion { piece: PieceId(0) })
        );
        assert_eq!(grid.count(EdgeState::PieceCut), 0);
    }

    #[test]
    fn test_seal_promotes_separating_walls() {
        let mut grid = serpentine(4, 2);
        let mut registry = PieceRegistry::from_grid(&grid);
        registry
            .split(&mut grid, PieceId(0), EdgeId::horizontal(3, 1))
            .unwrap();
        let promoted = registry.seal(&mut grid).unwrap();
        assert_eq!(promoted, 3);
        assert_eq!(grid.count(EdgeState::PieceCut), 4);
        assert_eq!(grid.count(EdgeState::Blocked), 0);
        registry.verify(&grid).unwrap();
    }

    #[test]
    fn test_verify_detects_stale_cache() {
        let mut grid = serpentine(3, 1);
        let registry = PieceRegistry::from_grid(&grid);
        grid.set_state(EdgeId::vertical(1, 0), EdgeState::PieceCut)
            .unwrap();
        assert!(matches!(
            registry.verify(&grid),
            Err(InvariantError::PartitionMismatch(_))
        ));
    }
}
