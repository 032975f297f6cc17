//! Generation runs and their output
//!
//! A [`Generation`] owns the mutable state of one run, so independent runs
//! never share anything. Running it yields a [`Layout`], the classified edge
//! set handed to writers.

use std::collections::BTreeMap;
use std::fmt;

use log::info;
use serde::Serialize;
use strum::Display;

use crate::carve::{CarveParams, CarveStats, carve_pieces};
use crate::config::PuzzleConfig;
use crate::error::{LayoutError, NonConvergenceWarning};
use crate::grid::{Coord, EdgeId, EdgeState, Grid};
use crate::maze::build_maze;
use crate::optimize::{OptimizeParams, optimize};
use crate::registry::{PieceId, PieceRegistry};
use crate::rng::LayoutRng;

/// Fabrication category of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum EdgeClass {
    /// Boundary or piece cut: goes on the cutting layer
    Cut,
    /// Open passage or maze wall inside a piece: reference only
    Interior,
}

impl From<EdgeState> for EdgeClass {
    fn from(state: EdgeState) -> Self {
        if state.is_cut() {
            EdgeClass::Cut
        } else {
            EdgeClass::Interior
        }
    }
}

/// A point in drawing units; y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One edge with its geometry and category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifiedEdge {
    pub edge: EdgeId,
    pub start: Point,
    pub end: Point,
    pub class: EdgeClass,
    pub state: EdgeState,
}

impl ClassifiedEdge {
    fn new(edge: EdgeId, state: EdgeState, cell_size: f64) -> Self {
        let ((x0, y0), (x1, y1)) = edge.endpoints();
        let scale = |v: usize| v as f64 * cell_size;
        Self {
            edge,
            start: Point {
                x: scale(x0),
                y: scale(y0),
            },
            end: Point {
                x: scale(x1),
                y: scale(y1),
            },
            class: state.into(),
            state,
        }
    }

    /// Interior wall, as opposed to an open passage
    pub fn is_wall(&self) -> bool {
        self.state != EdgeState::MazeOpen
    }
}

/// A final piece, for export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceSummary {
    pub id: PieceId,
    pub size: usize,
    pub square: bool,
    pub cells: Vec<Coord>,
}

/// Headline numbers of a finished layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSummary {
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub pieces: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
    /// Piece count per piece size
    pub sizes: BTreeMap<usize, usize>,
    pub cut_walls: usize,
    /// Maze walls left inside pieces
    pub interior_walls: usize,
    pub iterations: usize,
}

impl fmt::Display for LayoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "seed:       {}", self.seed)?;
        writeln!(f, "grid:       {}x{}", self.width, self.height)?;
        writeln!(f, "pieces:     {}", self.pieces)?;
        writeln!(
            f,
            "piece size: min {} / max {} / mean {:.2}",
            self.min_size, self.max_size, self.mean_size
        )?;
        write!(f, "histogram: ")?;
        for (size, count) in &self.sizes {
            write!(f, " {size}:{count}")?;
        }
        writeln!(f)?;
        writeln!(f, "cut walls:  {}", self.cut_walls)?;
        writeln!(f, "interior:   {}", self.interior_walls)?;
        write!(f, "iterations: {}", self.iterations)
    }
}

/// The finished layout of one run
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    pub cell_size: f64,
    pub iterations: usize,
    pub pieces: Vec<PieceSummary>,
    /// Every edge of the lattice, row-major
    pub edges: Vec<ClassifiedEdge>,
    pub warning: Option<NonConvergenceWarning>,
    #[serde(skip)]
    carve: CarveStats,
    #[serde(skip)]
    grid: Grid,
}

impl Layout {
    /// Final edge state
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn carve_stats(&self) -> CarveStats {
        self.carve
    }

    pub fn is_conforming(&self) -> bool {
        self.warning.is_none()
    }

    pub fn cut_edges(&self) -> impl Iterator<Item = &ClassifiedEdge> {
        self.edges.iter().filter(|e| e.class == EdgeClass::Cut)
    }

    pub fn interior_edges(&self) -> impl Iterator<Item = &ClassifiedEdge> {
        self.edges.iter().filter(|e| e.class == EdgeClass::Interior)
    }

    pub fn summary(&self) -> LayoutSummary {
        let sizes: Vec<usize> = self.pieces.iter().map(|p| p.size).collect();
        let total: usize = sizes.iter().sum();
        let mut histogram = BTreeMap::new();
        for &size in &sizes {
            *histogram.entry(size).or_insert(0) += 1;
        }
        LayoutSummary {
            seed: self.seed,
            width: self.width,
            height: self.height,
            pieces: sizes.len(),
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            mean_size: if sizes.is_empty() {
                0.0
            } else {
                total as f64 / sizes.len() as f64
            },
            sizes: histogram,
            cut_walls: self.cut_edges().count(),
            interior_walls: self.interior_edges().filter(|e| e.is_wall()).count(),
            iterations: self.iterations,
        }
    }

    /// Text drawing: `+---+` and `|` for cuts, `...` and `:` for interior
    /// walls, blanks for open passages
    pub fn ascii(&self) -> String {
        let grid = &self.grid;
        let horizontal = |state: EdgeState| match state {
            s if s.is_cut() => "---",
            EdgeState::Blocked => "...",
            _ => "   ",
        };
        let vertical = |state: EdgeState| match state {
            s if s.is_cut() => '|',
            EdgeState::Blocked => ':',
            _ => ' ',
        };

        let mut out = String::new();
        for y in 0..=grid.height() {
            out.push('+');
            for x in 0..grid.width() {
                out.push_str(horizontal(grid.state(EdgeId::horizontal(x, y))));
                out.push('+');
            }
            out.push('\n');
            if y == grid.height() {
                break;
            }
            for x in 0..=grid.width() {
                out.push(vertical(grid.state(EdgeId::vertical(x, y))));
                if x < grid.width() {
                    out.push_str("   ");
                }
            }
            out.push('\n');
        }
        out
    }

    /// Piece of every cell, one text row per grid row; pieces are numbered
    /// in row-major order of their first cell
    pub fn piece_map(&self) -> String {
        let registry = PieceRegistry::from_grid(&self.grid);
        let mut out = String::new();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let id = registry.piece_at(Coord::new(x, y));
                out.push_str(&format!("{:>4}", id.0));
            }
            out.push('\n');
        }
        out
    }
}

/// One generation run and all of its mutable state
#[derive(Debug)]
pub struct Generation {
    config: PuzzleConfig,
    rng: LayoutRng,
    grid: Grid,
}

impl Generation {
    /// Validate `config` and allocate the run state
    pub fn new(config: PuzzleConfig) -> Result<Self, LayoutError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => LayoutRng::new(seed),
            None => LayoutRng::from_entropy(),
        };
        let grid = Grid::new(config.width, config.height)?;
        info!(
            "generating {}x{} layout with seed {}",
            config.width,
            config.height,
            rng.seed()
        );
        Ok(Self { config, rng, grid })
    }

    /// The seed in use, drawn from entropy when the config had none
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Build, carve, optimize, seal and classify
    pub fn run(mut self) -> Result<Layout, LayoutError> {
        let config = &self.config;
        let walk = build_maze(&mut self.grid, config.start, &mut self.rng)?;

        let mut registry = PieceRegistry::from_grid(&self.grid);
        let carve = carve_pieces(
            &mut self.grid,
            &mut registry,
            &walk,
            CarveParams {
                cut_probability: config.cut_probability,
                min_piece_size: config.min_piece_size,
            },
            &mut self.rng,
        )?;

        let report = optimize(
            &mut self.grid,
            &mut registry,
            OptimizeParams {
                min_piece_size: config.min_piece_size,
                max_piece_size: config.max_piece_size,
                max_iterations: config.max_optimizer_iterations,
            },
        )?;

        registry.seal(&mut self.grid)?;
        registry.verify(&self.grid)?;
        for id in registry.ids() {
            registry.check_tree(&self.grid, id)?;
        }

        let pieces = registry
            .pieces()
            .map(|piece| PieceSummary {
                id: piece.id(),
                size: piece.size(),
                square: piece.is_square(),
                cells: piece.cells().iter().copied().collect(),
            })
            .collect();
        let edges = self
            .grid
            .edges()
            .map(|edge| ClassifiedEdge::new(edge, self.grid.state(edge), config.cell_size))
            .collect();

        Ok(Layout {
            width: config.width,
            height: config.height,
            seed: self.rng.seed(),
            cell_size: config.cell_size,
            iterations: report.iterations,
            pieces,
            edges,
            warning: report.warning,
            carve,
            grid: self.grid,
        })
    }
}

/// Run one generation with `config`
pub fn generate(config: &PuzzleConfig) -> Result<Layout, LayoutError> {
    Generation::new(config.clone())?.run()
}
