//! Reference particle simulation: a deterministic stand-in for the GPU backend.
//!
//! # Invariants
//! - Same seed and same sequence of requests produce identical fields.
//! - At most `creation_limit` creation events are accepted between two `step` calls.

pub mod field;

pub use field::{FieldEvent, Particle, ParticleField, ParticleId};

pub fn crate_info() -> &'static str {
    "groundcover-sim v0.1.0"
}
