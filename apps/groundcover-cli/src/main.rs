mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use groundcover_common::Rect;
use groundcover_sim::ParticleField;
use groundcover_stream::{CoverageController, CoverageStats, Population};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "groundcover-cli", about = "CLI tool for groundcover coverage tracking")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Fly a viewpoint over a tile layout and report coverage activity
    Run {
        /// Scenario YAML; the built-in 3x3 layout when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Base RNG seed, overriding the scenario's per-population seeds
        #[arg(short, long)]
        seed: Option<u64>,
        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a registry from a layout file and report configuration errors
    Validate {
        /// Layout YAML (a scenario file; only `tiles` and `controller` are read)
        layout: PathBuf,
    },
}

#[derive(Serialize)]
struct RunSummary {
    ticks: u64,
    populations: Vec<PopulationSummary>,
}

#[derive(Serialize)]
struct PopulationSummary {
    name: String,
    live: Option<Rect>,
    stats: CoverageStats,
    particles: usize,
    state_hash: u64,
}

impl PopulationSummary {
    fn capture(population: &Population<ParticleField>) -> Self {
        Self {
            name: population.name().to_owned(),
            live: population.tracker().live_bounds(),
            stats: population.tracker().stats().clone(),
            particles: population.sim().particle_count(),
            state_hash: population.sim().state_hash(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("groundcover-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", groundcover_common::crate_info());
            println!("stream: {}", groundcover_stream::crate_info());
            println!("sim: {}", groundcover_sim::crate_info());
        }
        Commands::Run {
            scenario,
            ticks,
            seed,
            json,
        } => {
            let scenario = match scenario {
                Some(path) => Scenario::load(path)?,
                None => Scenario::default(),
            };
            let summary = run(&scenario, ticks, seed, !json)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for pop in &summary.populations {
                    println!(
                        "{}: resets={}, culls={}, spawn events={}, requested={}, particles={}, hash={:#x}",
                        pop.name,
                        pop.stats.resets,
                        pop.stats.culls,
                        pop.stats.spawn_events,
                        pop.stats.entities_requested,
                        pop.particles,
                        pop.state_hash
                    );
                }
            }
        }
        Commands::Validate { layout } => {
            let scenario = Scenario::load(&layout)?;
            let mut controller = CoverageController::new(scenario.controller);
            let registry = controller
                .try_refresh(&scenario.tiles)
                .with_context(|| format!("{}: cannot build a tile registry", layout.display()))?;
            let grid = registry.grid();
            println!(
                "{}: {} tile(s), origin={:?}, tile size={:?}",
                layout.display(),
                registry.len(),
                grid.origin(),
                grid.tile_size()
            );
            if !registry.errors().is_empty() {
                anyhow::bail!("layout has configuration errors: {:?}", registry.errors());
            }
            println!("Layout OK");
        }
    }

    Ok(())
}

/// Close the field's tick and drop its event log, returning how many
/// events it held.
fn finish_tick(population: &mut Population<ParticleField>) -> usize {
    let field = population.sim_mut();
    field.step();
    field.drain_events().len()
}

fn run(
    scenario: &Scenario,
    ticks: u64,
    seed: Option<u64>,
    print_ticks: bool,
) -> anyhow::Result<RunSummary> {
    let mut controller = CoverageController::new(scenario.controller);
    let mut populations = scenario.populations(seed);
    if print_ticks {
        println!(
            "Coverage run: {} tile(s), {} population(s), ticks={ticks}",
            scenario.tiles.len(),
            populations.len()
        );
    }

    for tick in 0..ticks {
        let viewpoint = scenario.path.viewpoint_at(tick);
        let force_reset = scenario.path.forces_reset(tick);
        let results = controller.tick(&scenario.tiles, &viewpoint, force_reset, &mut populations);
        for (population, result) in populations.iter_mut().zip(&results) {
            finish_tick(population);
            let report = match result {
                Ok(report) => report,
                Err(err) => {
                    if print_ticks {
                        println!("  tick {tick:>4} {:<10} error: {err}", population.name());
                    }
                    continue;
                }
            };
            if print_ticks && (report.reset || !report.spawns.is_empty()) {
                let spawned: u32 = report.spawns.iter().map(|s| s.count).sum();
                println!(
                    "  tick {tick:>4} {:<10} reset={:<5} spawn calls={} entities={spawned}",
                    population.name(),
                    report.reset,
                    report.spawn_calls()
                );
            }
        }
    }

    tracing::info!(ticks, populations = populations.len(), "coverage run complete");
    Ok(RunSummary {
        ticks,
        populations: populations.iter().map(PopulationSummary::capture).collect(),
    })
}
