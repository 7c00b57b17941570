use std::collections::BTreeMap;

use glam::DVec2;
use groundcover_common::{Rect, Simulation, SimulationError, SpawnRequest, TileCoord};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Sequential particle identifier; never reused within a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u64);

/// A live particle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub position: DVec2,
    /// Tile whose attribute data the particle was spawned with.
    pub tile: TileCoord,
}

/// Record of every request the field handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEvent {
    /// All particles were destroyed.
    Reset { cleared: usize },
    /// Particles outside `bounds` were destroyed.
    Culled { bounds: Rect, removed: usize },
    /// A creation event; `created` can fall short of `count` at capacity.
    Spawned {
        bounds: Rect,
        count: u32,
        created: u32,
        tile: TileCoord,
    },
    /// The field advanced one tick.
    Stepped { tick: u64 },
}

/// In-memory particle population implementing [`Simulation`].
///
/// Particles are kept in a BTreeMap so iteration, and therefore
/// [`ParticleField::state_hash`], is deterministic. Positions come from a
/// seeded ChaCha stream. Like the GPU backend it stands in for, the field
/// accepts a limited number of creation events per tick; the driver closes a
/// tick with [`ParticleField::step`].
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: BTreeMap<ParticleId, Particle>,
    next_id: u64,
    tick: u64,
    seed: u64,
    rng: ChaCha8Rng,
    creation_limit: usize,
    creations_this_tick: usize,
    capacity: Option<usize>,
    event_log: Vec<FieldEvent>,
}

impl Default for ParticleField {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl ParticleField {
    /// Empty field at tick 0 with seed 0 and one creation event per tick.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            particles: BTreeMap::new(),
            next_id: 0,
            tick: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            creation_limit: 1,
            creations_this_tick: 0,
            capacity: None,
            event_log: Vec::new(),
        }
    }

    /// Accept up to `limit` creation events per tick.
    pub fn with_creation_limit(mut self, limit: usize) -> Self {
        self.creation_limit = limit;
        self
    }

    /// Cap the number of live particles; creation beyond it is dropped.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &BTreeMap<ParticleId, Particle> {
        &self.particles
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(&id)
    }

    /// Number of particles inside `bounds` (edges inclusive).
    pub fn count_within(&self, bounds: &Rect) -> usize {
        self.particles
            .values()
            .filter(|p| bounds.contains_point(p.position))
            .count()
    }

    /// Creation events accepted since the last `step`.
    pub fn creations_this_tick(&self) -> usize {
        self.creations_this_tick
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[FieldEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<FieldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Close the current tick and reopen the creation allowance.
    pub fn step(&mut self) {
        self.tick += 1;
        self.creations_this_tick = 0;
        self.event_log.push(FieldEvent::Stepped { tick: self.tick });
    }

    fn room(&self) -> usize {
        self.capacity
            .map_or(usize::MAX, |cap| cap.saturating_sub(self.particles.len()))
    }

    fn sample(&mut self, bounds: &Rect) -> DVec2 {
        let u: f64 = self.rng.gen_range(0.0..1.0);
        let v: f64 = self.rng.gen_range(0.0..1.0);
        DVec2::new(
            bounds.min_x() + u * bounds.width(),
            bounds.min_z() + v * bounds.depth(),
        )
    }

    /// Deterministic hash of the live particles and tick.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, particle) in &self.particles {
            mix(&mut h, &id.0.to_le_bytes());
            mix(&mut h, &particle.position.x.to_le_bytes());
            mix(&mut h, &particle.position.y.to_le_bytes());
            mix(&mut h, &particle.tile.x.to_le_bytes());
            mix(&mut h, &particle.tile.z.to_le_bytes());
        }
        h
    }
}

impl Simulation for ParticleField {
    fn reset(&mut self) {
        let cleared = self.particles.len();
        self.particles.clear();
        self.event_log.push(FieldEvent::Reset { cleared });
    }

    fn cull_outside(&mut self, bounds: Rect) {
        let before = self.particles.len();
        self.particles.retain(|_, p| bounds.contains_point(p.position));
        let removed = before - self.particles.len();
        self.event_log.push(FieldEvent::Culled { bounds, removed });
    }

    fn spawn_in_bounds(&mut self, request: &SpawnRequest) -> Result<(), SimulationError> {
        if self.creations_this_tick >= self.creation_limit {
            return Err(SimulationError::CreationBudgetExceeded {
                limit: self.creation_limit,
            });
        }
        self.creations_this_tick += 1;

        let created = (request.count as usize).min(self.room()) as u32;
        if created < request.count {
            tracing::warn!(requested = request.count, created, "particle field at capacity");
        }
        for _ in 0..created {
            let position = self.sample(&request.bounds);
            let id = ParticleId(self.next_id);
            self.next_id += 1;
            self.particles.insert(
                id,
                Particle {
                    position,
                    tile: request.tile.coord,
                },
            );
        }
        self.event_log.push(FieldEvent::Spawned {
            bounds: request.bounds,
            count: request.count,
            created,
            tile: request.tile.coord,
        });
        Ok(())
    }

    fn max_creation_events_per_tick(&self) -> usize {
        self.creation_limit
    }
}
