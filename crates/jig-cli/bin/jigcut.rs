//! jigcut: generate a jigsaw puzzle layout
//!
//! Prints a run summary and optionally writes DXF, SVG and JSON files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use jig_cli::dxf::{DxfLayers, write_dxf};
use jig_cli::options::ConfigArgs;
use jig_cli::svg::write_svg;
use jig_core::{Generation, Layout};

/// Jigsaw puzzle layout generator
#[derive(Parser, Debug)]
#[command(name = "jigcut")]
#[command(author, version, about = "Generate interlocking puzzle layouts for laser cutting", long_about = None)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,

    /// Write the layout as DXF
    #[arg(long)]
    dxf: Option<PathBuf>,

    /// DXF layer for cut lines
    #[arg(long = "cut-layer", default_value = "CUT")]
    cut_layer: String,

    /// DXF layer for interior walls
    #[arg(long = "interior-layer", default_value = "INTERIOR")]
    interior_layer: String,

    /// Write an SVG preview
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the layout as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print the layout and a piece map as text
    #[arg(long)]
    ascii: bool,

    /// Exit with an error if the optimizer leaves nonconforming pieces
    #[arg(long)]
    strict: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = args.config.resolve()?;
    let generation = Generation::new(config).context("invalid configuration")?;
    info!("seed {}", generation.seed());
    let layout = generation.run().context("layout generation failed")?;

    if let Some(path) = &args.dxf {
        let layers = DxfLayers {
            cut: args.cut_layer.clone(),
            interior: args.interior_layer.clone(),
        };
        write_file(path, |out| write_dxf(&layout, &layers, out))?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.svg {
        write_file(path, |out| write_svg(&layout, out))?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.json {
        write_json(path, &layout)?;
        info!("wrote {}", path.display());
    }

    if args.ascii {
        print!("{}", layout.ascii());
        println!();
        print!("{}", layout.piece_map());
    }
    println!("{}", layout.summary());

    if let Some(warning) = &layout.warning {
        eprintln!("warning: {warning}");
        if args.strict {
            warn!("strict mode: failing on nonconforming layout");
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write(&mut out).with_context(|| format!("writing {}", path.display()))?;
    out.flush()
        .with_context(|| format!("writing {}", path.display()))
}

fn write_json(path: &Path, layout: &Layout) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, layout)
        .with_context(|| format!("writing {}", path.display()))?;
    writeln!(out)?;
    out.flush()
        .with_context(|| format!("writing {}", path.display()))
}
