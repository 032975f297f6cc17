//! Configuration from a JSON file plus command-line overrides

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use jig_core::{Coord, PuzzleConfig};

/// Generation options; every flag overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON file holding a puzzle configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Grid width in cells
    #[arg(short = 'W', long)]
    pub width: Option<usize>,

    /// Grid height in cells
    #[arg(short = 'H', long)]
    pub height: Option<usize>,

    /// Smallest allowed piece, in cells
    #[arg(long = "min-size")]
    pub min_size: Option<usize>,

    /// Largest allowed piece, in cells
    #[arg(long = "max-size")]
    pub max_size: Option<usize>,

    /// Chance of proposing a cut at each maze edge, 0 to 1
    #[arg(short = 'p', long = "cut-probability")]
    pub cut_probability: Option<f64>,

    /// Random seed; drawn from entropy when omitted
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Optimizer iteration cap
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<usize>,

    /// Drawing units per cell
    #[arg(long = "cell-size")]
    pub cell_size: Option<f64>,

    /// Column of the maze start cell
    #[arg(long = "start-x")]
    pub start_x: Option<usize>,

    /// Row of the maze start cell
    #[arg(long = "start-y")]
    pub start_y: Option<usize>,
}

impl ConfigArgs {
    /// Load the config file, if any, then apply the flags on top
    ///
    /// The result is not validated; generation does that.
    pub fn resolve(&self) -> Result<PuzzleConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => PuzzleConfig::default(),
        };
        Ok(self.apply(base))
    }

    /// Apply the flags that were given to `config`
    pub fn apply(&self, mut config: PuzzleConfig) -> PuzzleConfig {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(min) = self.min_size {
            config.min_piece_size = min;
        }
        if let Some(max) = self.max_size {
            config.max_piece_size = max;
        }
        if let Some(p) = self.cut_probability {
            config.cut_probability = p;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(iterations) = self.max_iterations {
            config.max_optimizer_iterations = iterations;
        }
        if let Some(size) = self.cell_size {
            config.cell_size = size;
        }
        config.start = Coord::new(
            self.start_x.unwrap_or(config.start.x),
            self.start_y.unwrap_or(config.start.y),
        );
        config
    }
}

/// Read a [`PuzzleConfig`] from a JSON file; missing fields take defaults
pub fn load_config(path: &Path) -> Result<PuzzleConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Parse a [`PuzzleConfig`] from JSON text
pub fn parse_config(text: &str) -> Result<PuzzleConfig> {
    Ok(serde_json::from_str(text)?)
}
