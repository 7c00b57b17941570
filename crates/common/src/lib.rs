//! Shared types for the groundcover workspace.
//!
//! Rectangles and tile coordinates live on the XZ ground plane. The
//! [`Simulation`] trait is the whole contract between the coverage core and
//! whatever backend actually owns the particles.

mod rect;
mod simulation;
mod types;

pub use rect::Rect;
pub use simulation::{Simulation, SimulationError, SpawnRequest, TileContext};
pub use types::{TileCoord, TileId, Transform};

pub fn crate_info() -> &'static str {
    "groundcover-common v0.1.0"
}
