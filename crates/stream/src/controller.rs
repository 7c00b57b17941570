use glam::DVec2;
use groundcover_common::{Simulation, Transform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoverageError;
use crate::registry::{RegistryError, TilePlacement, TileRegistry};
use crate::tracker::{CoverageTracker, TickReport, TrackerConfig};

/// Explicit grid alignment, overriding the origin-tile default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub origin: DVec2,
    pub tile_size: DVec2,
}

/// How the controller builds its tile registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Tile group to register. `None` uses the group of the first tile.
    pub group: Option<u32>,
    /// Grid alignment. `None` aligns to the first tile of the group.
    pub grid: Option<GridConfig>,
    /// Run the neighbour alignment check after building.
    pub full_validation: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            group: None,
            grid: None,
            full_validation: true,
        }
    }
}

/// One simulated entity population: its tracker, backend, and random stream.
pub struct Population<S> {
    name: String,
    tracker: CoverageTracker,
    sim: S,
    rng: ChaCha8Rng,
}

impl<S: Simulation> Population<S> {
    pub fn new(name: impl Into<String>, config: TrackerConfig, sim: S, seed: u64) -> Self {
        Self {
            name: name.into(),
            tracker: CoverageTracker::new(config),
            sim,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracker(&self) -> &CoverageTracker {
        &self.tracker
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Tick this population against the target derived from `viewpoint`.
    pub fn tick(
        &mut self,
        viewpoint: &Transform,
        force_reset: bool,
        registry: &TileRegistry,
    ) -> Result<TickReport, CoverageError> {
        let target = self.tracker.target_for(viewpoint);
        self.tracker
            .tick(target, force_reset, registry, &mut self.sim, &mut self.rng)
    }
}

/// Owns the tile registry and drives every population each tick.
///
/// The registry is built lazily from the host's tile placements. Until some
/// tile matches, ticks do nothing and the build is retried on the next one.
#[derive(Debug, Clone, Default)]
pub struct CoverageController {
    config: ControllerConfig,
    registry: Option<TileRegistry>,
}

impl CoverageController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn registry(&self) -> Option<&TileRegistry> {
        self.registry.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_some()
    }

    /// Drop the registry; the next tick rebuilds it from fresh placements.
    pub fn invalidate(&mut self) {
        self.registry = None;
    }

    /// Build the registry if there is none yet.
    ///
    /// Build failures are logged and retried on the next call.
    pub fn refresh(&mut self, placements: &[TilePlacement]) -> Option<&TileRegistry> {
        match self.try_refresh(placements) {
            Ok(registry) => Some(registry),
            Err(RegistryError::NoTiles) => {
                tracing::debug!("no tiles available yet");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "tile registry not built");
                None
            }
        }
    }

    /// Build the registry if there is none yet, reporting why it could not be.
    pub fn try_refresh(&mut self, placements: &[TilePlacement]) -> Result<&TileRegistry, RegistryError> {
        let registry = match self.registry.take() {
            Some(registry) => registry,
            None => {
                let registry = self.build(placements)?;
                if !registry.errors().is_empty() {
                    tracing::warn!(errors = ?registry.errors(), "tile registry has configuration errors");
                }
                tracing::info!(tiles = registry.len(), "tile registry ready");
                registry
            }
        };
        Ok(self.registry.insert(registry))
    }

    fn build(&self, placements: &[TilePlacement]) -> Result<TileRegistry, RegistryError> {
        let grid = match self.config.grid {
            Some(grid) => Some(TileRegistry::checked_grid(grid.origin, grid.tile_size)?),
            None => None,
        };
        let origin = placements
            .iter()
            .filter(|p| p.size.x > 0.0 && p.size.y > 0.0)
            .find(|p| self.config.group.is_none_or(|g| p.group == g))
            .ok_or(RegistryError::NoTiles)?;
        let group = self.config.group.unwrap_or(origin.group);
        let grid = match grid {
            Some(grid) => grid,
            None => TileRegistry::checked_grid(origin.position, origin.size)?,
        };
        let filter = |p: &TilePlacement| p.group == group;
        if self.config.full_validation {
            TileRegistry::build(placements, grid, filter)
        } else {
            TileRegistry::build_unvalidated(placements, grid, filter)
        }
    }

    /// Refresh the registry, then tick every population.
    ///
    /// Returns one result per population, in order, or none while no
    /// registry exists. A failing population never stops the others.
    pub fn tick<S: Simulation>(
        &mut self,
        placements: &[TilePlacement],
        viewpoint: &Transform,
        force_reset: bool,
        populations: &mut [Population<S>],
    ) -> Vec<Result<TickReport, CoverageError>> {
        let _span = tracing::info_span!("coverage_update").entered();
        let Some(registry) = self.refresh(placements) else {
            return Vec::new();
        };
        populations
            .iter_mut()
            .map(|population| {
                let result = population.tick(viewpoint, force_reset, registry);
                if let Err(err) = &result {
                    tracing::warn!(population = population.name(), %err, "coverage tick failed");
                }
                result
            })
            .collect()
    }
}
