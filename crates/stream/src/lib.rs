//! Streaming coverage: tile grid, tile registry, live-coverage tracking.
//!
//! # Invariants
//! - A tracker issues at most one cull and at most the simulation's creation
//!   limit of spawns per tick; a reset is always the first operation of its tick.
//! - Live bounds only grow through a planned border expansion and only shrink
//!   by clipping to the target.
//! - Empty rectangles are no-ops, never errors.
//!
//! # Layout
//! [`GridIndex`] maps positions to tiles, [`TileRegistry`] holds the placed
//! tiles, [`CoverageTracker`] runs the per-tick expansion, [`TileWalker`]
//! splits a multi-tile spawn across ticks, and [`CoverageController`] ties
//! them together for several populations.

mod budget;
mod controller;
mod error;
mod grid;
mod registry;
mod tracker;
mod walker;

pub use budget::{CreationBudget, DITHER_EPSILON, SpawnBudgeter, dithered_count};
pub use controller::{ControllerConfig, CoverageController, GridConfig, Population};
pub use error::CoverageError;
pub use grid::{GridIndex, TileRange};
pub use registry::{RegistryError, RegistryErrors, TilePlacement, TileRegistry};
pub use tracker::{
    Border, CoverageStats, CoverageTracker, Expansion, TickReport, TileCoverage, TrackerConfig,
    plan_expansion, reset_sliver, target_bounds,
};
pub use walker::{TileSlice, TileWalker, Walk, WalkerState};

pub fn crate_info() -> &'static str {
    "groundcover-stream v0.1.0"
}
