#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for generating, transferring and playing Tile Defence levels.

mod layout_transfer;
mod play;
mod scenario;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tile_defence_core::{seconds, Catalog, LevelDefinition, SimulationConfig, TileCoord, TileKind};
use tile_defence_system_path_generation::{generate, GenerationParams};
use tile_defence_world::World;
use tracing_subscriber::EnvFilter;

use crate::{
    layout_transfer::LevelLayout,
    play::{play, PlayOptions},
    scenario::{load_level, write_level, Scenario},
};

/// Log filter applied when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "tile_defence=info";

#[derive(Debug, Parser)]
#[command(name = "tile-defence", version, about = "Headless Tile Defence tools")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Generate a level layout with a seeded random walk.
    Generate(GenerateArgs),
    /// Play a scenario headless with a fixed time step.
    Play(PlayArgs),
    /// Print a level of a scenario as a single-line layout string.
    Export(ExportArgs),
    /// Decode a layout string and optionally write it as a level file.
    Import(ImportArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Number of tile columns.
    #[arg(long, default_value_t = 12)]
    width: u32,
    /// Number of tile rows.
    #[arg(long, default_value_t = 8)]
    height: u32,
    /// Minimum share of the grid, in percent, covered by the path.
    #[arg(long, default_value_t = 30)]
    density: u32,
    /// Attempts made before giving up.
    #[arg(long, default_value_t = 50)]
    attempts: u32,
    /// Seed of the random walk; a random seed is drawn when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Row of the start tile on the left edge.
    #[arg(long)]
    start_row: Option<u32>,
    #[command(flatten)]
    economy: EconomyArgs,
    /// Level TOML file to write instead of printing the layout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct EconomyArgs {
    /// Lives of a level written by this command.
    #[arg(long, default_value_t = 20)]
    lives: u32,
    /// Currency of a level written by this command.
    #[arg(long, default_value_t = 100)]
    currency: u32,
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Scenario TOML file.
    scenario: PathBuf,
    /// Seconds of simulated time per tick.
    #[arg(long, default_value_t = 0.1)]
    dt: f32,
    /// Tick limit per level.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
    /// Place the cheapest structure along the path at every build phase.
    #[arg(long)]
    auto_build: bool,
    /// Zero-based index of the first level to play.
    #[arg(long, default_value_t = 0)]
    level: usize,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Scenario TOML file, or a single level TOML file with `--single`.
    input: PathBuf,
    /// Treat the input as a single level file.
    #[arg(long)]
    single: bool,
    /// Zero-based index of the scenario level to export.
    #[arg(long, default_value_t = 0)]
    level: usize,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Layout string produced by `export`.
    layout: String,
    #[command(flatten)]
    economy: EconomyArgs,
    /// Level TOML file to write.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

/// Entry point for the Tile Defence command-line interface.
fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Generate(args) => run_generate(&args),
        CliCommand::Play(args) => run_play(&args),
        CliCommand::Export(args) => run_export(&args),
        CliCommand::Import(args) => run_import(&args),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let params = GenerationParams {
        width: args.width,
        height: args.height,
        density_percent: args.density,
        max_attempts: args.attempts,
        seed: args.seed.unwrap_or_else(rand::random),
        start_row: args.start_row,
    };
    let generated = generate(&params).context("layout generation failed")?;

    let mut level = empty_level(&args.economy);
    generated.write_into(&mut level);
    emit_level(&level, args.output.as_ref())?;
    println!("seed: {}", params.seed);
    Ok(())
}

fn run_play(args: &PlayArgs) -> Result<()> {
    let dt = seconds(args.dt);
    if dt.is_zero() {
        bail!("time step must be a positive number of seconds, got {}", args.dt);
    }

    let scenario = Scenario::load(&args.scenario)?;
    let options = PlayOptions {
        dt,
        max_ticks: args.max_ticks,
        auto_build: args.auto_build,
        first_level: args.level,
    };

    for outcome in play(&scenario, options)? {
        println!(
            "level {}: {:?} after {} ticks, {} lives, {} coins",
            outcome.level, outcome.phase, outcome.ticks, outcome.lives, outcome.currency
        );
    }
    Ok(())
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let level = if args.single {
        load_level(&args.input)?
    } else {
        let scenario = Scenario::load(&args.input)?;
        scenario
            .levels
            .get(args.level)
            .cloned()
            .with_context(|| format!("scenario has no level {}", args.level))?
    };

    println!("{}", LevelLayout::from_level(&level).encode()?);
    Ok(())
}

fn run_import(args: &ImportArgs) -> Result<()> {
    let layout = LevelLayout::decode(&args.layout).context("invalid layout string")?;
    let mut level = empty_level(&args.economy);
    layout.write_into(&mut level);

    let _ = World::new(&level, Catalog::default(), SimulationConfig::default())
        .context("layout does not form a playable level")?;
    emit_level(&level, args.output.as_ref())
}

fn empty_level(economy: &EconomyArgs) -> LevelDefinition {
    LevelDefinition {
        width: 1,
        height: 1,
        tiles: vec![TileKind::Obstacle],
        start: TileCoord::new(0, 0),
        end: TileCoord::new(0, 0),
        starting_lives: economy.lives,
        starting_currency: economy.currency,
        waves: Vec::new(),
    }
}

fn emit_level(level: &LevelDefinition, output: Option<&PathBuf>) -> Result<()> {
    let layout = LevelLayout::from_level(level);
    match output {
        Some(path) => {
            write_level(path, level)?;
            println!("wrote {}x{} level to {}", level.width, level.height, path.display());
        }
        None => {
            println!("{}", layout.render());
            println!("{}", layout.encode()?);
        }
    }
    Ok(())
}
