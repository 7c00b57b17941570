use serde::{Deserialize, Serialize};

use crate::{Rect, TileCoord, TileId};

/// Per-tile attribute binding carried by a spawn request.
///
/// A backend binds the tile's height and material data before it creates
/// entities inside `bounds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileContext {
    pub coord: TileCoord,
    pub tile: TileId,
    /// World-space extent of the tile.
    pub bounds: Rect,
}

/// A bounded creation request: `count` entities uniformly inside `bounds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub bounds: Rect,
    pub count: u32,
    pub tile: TileContext,
}

impl SpawnRequest {
    pub fn min_x(&self) -> f64 {
        self.bounds.min_x()
    }

    pub fn max_x(&self) -> f64 {
        self.bounds.max_x()
    }

    pub fn min_z(&self) -> f64 {
        self.bounds.min_z()
    }

    pub fn max_z(&self) -> f64 {
        self.bounds.max_z()
    }
}

/// Errors reported by a simulation backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("creation budget exceeded: at most {limit} creation event(s) per tick")]
    CreationBudgetExceeded { limit: usize },
    #[error("simulation rejected request: {0}")]
    Rejected(String),
}

/// The downstream particle simulation driven by a coverage tracker.
///
/// A tracker issues at most one `cull_outside` and at most
/// `max_creation_events_per_tick` spawn calls per tick, and always issues
/// `reset` before anything else in the same tick.
pub trait Simulation {
    /// Destroy every live entity.
    fn reset(&mut self);

    /// Destroy entities outside `bounds`.
    fn cull_outside(&mut self, bounds: Rect);

    /// Create `request.count` entities uniformly inside `request.bounds`.
    fn spawn_in_bounds(&mut self, request: &SpawnRequest) -> Result<(), SimulationError>;

    /// How many creation events the backend accepts per tick.
    fn max_creation_events_per_tick(&self) -> usize {
        1
    }
}

impl<S: Simulation + ?Sized> Simulation for &mut S {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn cull_outside(&mut self, bounds: Rect) {
        (**self).cull_outside(bounds);
    }

    fn spawn_in_bounds(&mut self, request: &SpawnRequest) -> Result<(), SimulationError> {
        (**self).spawn_in_bounds(request)
    }

    fn max_creation_events_per_tick(&self) -> usize {
        (**self).max_creation_events_per_tick()
    }
}

impl<S: Simulation + ?Sized> Simulation for Box<S> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn cull_outside(&mut self, bounds: Rect) {
        (**self).cull_outside(bounds);
    }

    fn spawn_in_bounds(&mut self, request: &SpawnRequest) -> Result<(), SimulationError> {
        (**self).spawn_in_bounds(request)
    }

    fn max_creation_events_per_tick(&self) -> usize {
        (**self).max_creation_events_per_tick()
    }
}
