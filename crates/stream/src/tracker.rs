use std::collections::BTreeMap;

use glam::DVec2;
use groundcover_common::{Rect, Simulation, SpawnRequest, TileCoord, Transform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::budget::{CreationBudget, SpawnBudgeter};
use crate::error::CoverageError;
use crate::registry::TileRegistry;
use crate::walker::TileWalker;

/// Per-population tracking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Edge length of the square tiling volume, in world units.
    pub volume_size: f64,
    /// How far ahead of the viewpoint the volume is centred.
    pub forward_bias: f64,
    /// Entities per square world unit.
    pub density: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            volume_size: 160.0,
            forward_bias: 0.0,
            density: 0.05,
        }
    }
}

/// The rectangle that should be fully populated for `viewpoint`.
pub fn target_bounds(config: &TrackerConfig, viewpoint: &Transform) -> Rect {
    let center = viewpoint.position + viewpoint.forward() * config.forward_bias;
    Rect::from_center_size(
        DVec2::new(center.x, center.z),
        DVec2::splat(config.volume_size),
    )
}

/// Zero-width live region on the target's `min_x` edge, spanning its Z extent.
///
/// Expanding from a sliver rather than declaring the whole target live keeps
/// the refill inside the normal one-border-per-tick expansion.
pub fn reset_sliver(target: &Rect) -> Rect {
    Rect::from_edges(target.min_x(), target.min_x(), target.min_z(), target.max_z())
}

/// Which edge of the live bounds an expansion grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Border {
    MinX,
    MaxX,
    MinZ,
    MaxZ,
}

/// One planned expansion step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    pub border: Border,
    /// Region between the live edge and the target edge.
    pub spawn: Rect,
    /// Live bounds once the spawn has been issued.
    pub live: Rect,
}

/// Pick the single border with the largest gap between `live` and `target`.
///
/// Returns `None` when `live` already reaches every edge of `target`. The
/// live bounds are first trimmed to the target along the other axis so the
/// spawn region stays a rectangle adjacent to them.
pub fn plan_expansion(live: &Rect, target: &Rect) -> Option<Expansion> {
    let min_x_delta = live.min_x() - target.min_x();
    let max_x_delta = target.max_x() - live.max_x();
    let min_z_delta = live.min_z() - target.min_z();
    let max_z_delta = target.max_z() - live.max_z();
    let x_delta = min_x_delta.max(max_x_delta);
    let z_delta = min_z_delta.max(max_z_delta);

    if x_delta.max(z_delta) <= 0.0 {
        return None;
    }

    let expansion = if x_delta > z_delta {
        let trimmed = live
            .with_min_z(live.min_z().max(target.min_z()))
            .with_max_z(live.max_z().min(target.max_z()));
        if min_x_delta > max_x_delta {
            Expansion {
                border: Border::MinX,
                spawn: trimmed.with_min_x(target.min_x()).with_max_x(trimmed.min_x()),
                live: trimmed.with_min_x(target.min_x()),
            }
        } else {
            Expansion {
                border: Border::MaxX,
                spawn: trimmed.with_min_x(trimmed.max_x()).with_max_x(target.max_x()),
                live: trimmed.with_max_x(target.max_x()),
            }
        }
    } else {
        let trimmed = live
            .with_min_x(live.min_x().max(target.min_x()))
            .with_max_x(live.max_x().min(target.max_x()));
        if min_z_delta > max_z_delta {
            Expansion {
                border: Border::MinZ,
                spawn: trimmed.with_min_z(target.min_z()).with_max_z(trimmed.min_z()),
                live: trimmed.with_min_z(target.min_z()),
            }
        } else {
            Expansion {
                border: Border::MaxZ,
                spawn: trimmed.with_min_z(trimmed.max_z()).with_max_z(target.max_z()),
                live: trimmed.with_max_z(target.max_z()),
            }
        }
    };
    Some(expansion)
}

/// Coverage state of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCoverage {
    /// Populated part of the tile.
    pub live: Rect,
    /// Entities requested into the tile since the last reset.
    pub spawned: u64,
    pub spawn_events: u32,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub target: Rect,
    pub live: Rect,
    pub reset: bool,
    pub culled: bool,
    pub spawns: Vec<SpawnRequest>,
    pub walker_active: bool,
}

impl TickReport {
    fn new(target: Rect) -> Self {
        Self {
            target,
            live: Rect::ZERO,
            reset: false,
            culled: false,
            spawns: Vec::new(),
            walker_active: false,
        }
    }

    /// Creation events actually sent to the simulation.
    pub fn spawn_calls(&self) -> usize {
        self.spawns.iter().filter(|s| s.count > 0).count()
    }
}

/// Running totals across ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageStats {
    pub ticks: u64,
    pub resets: u64,
    pub culls: u64,
    pub spawn_events: u64,
    pub entities_requested: u64,
}

/// Maintains the live region of one entity population.
///
/// Each tick either hard-resets (target jumped away, or the caller forced
/// it) or culls to the new target and grows the live region by at most one
/// border. A border that spans several tiles is handed to a [`TileWalker`]
/// and spawned one tile per creation event over the following ticks.
///
/// `live` only ever covers populated ground. While a walk is in progress
/// the planned region is held as `claimed` and becomes live once the walk's
/// last slice has been spawned.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    config: TrackerConfig,
    budgeter: SpawnBudgeter,
    live: Option<Rect>,
    claimed: Option<Rect>,
    last_target: Option<Rect>,
    walker: TileWalker,
    tiles: BTreeMap<TileCoord, TileCoverage>,
    stats: CoverageStats,
}

impl CoverageTracker {
    /// A tracker with nothing live; its first tick hard-resets.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            budgeter: SpawnBudgeter::new(config.density),
            live: None,
            claimed: None,
            last_target: None,
            walker: TileWalker::new(),
            tiles: BTreeMap::new(),
            stats: CoverageStats::default(),
        }
    }

    /// A tracker that treats `live` as already populated.
    pub fn with_live_bounds(config: TrackerConfig, live: Rect) -> Self {
        Self {
            live: Some(live),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Region known to be fully populated.
    pub fn live_bounds(&self) -> Option<Rect> {
        self.live
    }

    /// Live bounds the walk in progress will reach once it completes.
    pub fn claimed_bounds(&self) -> Option<Rect> {
        self.claimed
    }

    pub fn walker(&self) -> &TileWalker {
        &self.walker
    }

    pub fn stats(&self) -> &CoverageStats {
        &self.stats
    }

    pub fn tile_coverage(&self, coord: TileCoord) -> Option<&TileCoverage> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> &BTreeMap<TileCoord, TileCoverage> {
        &self.tiles
    }

    /// Target bounds for `viewpoint` under this tracker's config.
    pub fn target_for(&self, viewpoint: &Transform) -> Rect {
        target_bounds(&self.config, viewpoint)
    }

    /// Advance one tick towards covering `target`.
    pub fn tick<S, R>(
        &mut self,
        target: Rect,
        force_reset: bool,
        registry: &TileRegistry,
        sim: &mut S,
        rng: &mut R,
    ) -> Result<TickReport, CoverageError>
    where
        S: Simulation + ?Sized,
        R: Rng + ?Sized,
    {
        let _span = tracing::debug_span!("coverage_tick").entered();
        self.stats.ticks += 1;
        let mut report = TickReport::new(target);

        let live = match self.live {
            Some(live) if !force_reset && (live.is_empty() || live.overlaps(&target)) => live,
            _ => {
                self.hard_reset(&target, sim);
                report.reset = true;
                report.live = reset_sliver(&target);
                return Ok(report);
            }
        };

        let mut live = live.clip(&target);
        self.claimed = self.claimed.map(|claimed| claimed.clip(&target));
        if self.last_target != Some(target) {
            self.cull(&target, sim);
            report.culled = true;
        }
        // the cull may have ended the walk
        self.commit_if_walk_done(&mut live);

        let mut budget = CreationBudget::new(sim.max_creation_events_per_tick());
        while !budget.is_exhausted() {
            if !self.walker.is_active() {
                let Some(expansion) = plan_expansion(&live, &target) else {
                    break;
                };
                tracing::debug!(border = ?expansion.border, area = expansion.spawn.area(), "expanding live bounds");
                self.claimed = Some(expansion.live);
                self.walker.start(expansion.spawn, registry.grid());
            }
            if let Some(slice) = self.walker.current(registry) {
                let request = self.budgeter.request(slice.bounds, slice.tile, rng);
                if let Err(err) = budget.issue(sim, &request) {
                    // the walker stays on this slice so the next tick retries it
                    tracing::debug!(tile = ?request.tile.coord, %err, "spawn refused");
                    self.live = Some(live);
                    return Err(err.into());
                }
                self.walker.advance(registry);
                self.record_spawn(&request);
                report.spawns.push(request);
            }
            self.commit_if_walk_done(&mut live);
        }

        self.live = Some(live);
        report.live = live;
        report.walker_active = self.walker.is_active();
        tracing::trace!(
            spawns = report.spawns.len(),
            culled = report.culled,
            walker_active = report.walker_active,
            "coverage tick complete"
        );
        Ok(report)
    }

    fn hard_reset<S: Simulation + ?Sized>(&mut self, target: &Rect, sim: &mut S) {
        tracing::debug!(?target, "hard reset");
        sim.reset();
        self.walker.cancel();
        self.claimed = None;
        self.tiles.clear();
        self.live = Some(reset_sliver(target));
        self.last_target = Some(*target);
        self.stats.resets += 1;
    }

    fn commit_if_walk_done(&mut self, live: &mut Rect) {
        if self.walker.is_active() {
            return;
        }
        if let Some(claimed) = self.claimed.take() {
            *live = claimed;
        }
    }

    fn cull<S: Simulation + ?Sized>(&mut self, target: &Rect, sim: &mut S) {
        tracing::debug!(?target, "culling outside target");
        sim.cull_outside(*target);
        self.walker.clip_pending(target);
        for coverage in self.tiles.values_mut() {
            coverage.live = coverage.live.clip(target);
        }
        self.tiles.retain(|_, coverage| !coverage.live.is_empty());
        self.last_target = Some(*target);
        self.stats.culls += 1;
    }

    fn record_spawn(&mut self, request: &SpawnRequest) {
        tracing::debug!(tile = ?request.tile.coord, count = request.count, "spawn");
        let coverage = self.tiles.entry(request.tile.coord).or_insert(TileCoverage {
            live: request.bounds,
            spawned: 0,
            spawn_events: 0,
        });
        coverage.live = coverage.live.expand(&request.bounds);
        coverage.spawned += request.count as u64;
        coverage.spawn_events += 1;
        self.stats.spawn_events += 1;
        self.stats.entities_requested += request.count as u64;
    }
}
