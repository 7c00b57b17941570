use std::path::Path;

use anyhow::Context;
use glam::{DVec2, DVec3};
use groundcover_common::Transform;
use groundcover_sim::ParticleField;
use groundcover_stream::{ControllerConfig, Population, TilePlacement, TrackerConfig};
use serde::{Deserialize, Serialize};

/// Mixed into a population seed to seed its particle field, so placement
/// draws never mirror the tracker's count dithering.
pub const FIELD_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// A scripted flight: tile layout, populations, and viewpoint path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub tiles: Vec<TilePlacement>,
    pub controller: ControllerConfig,
    pub populations: Vec<PopulationConfig>,
    pub path: FlightPath,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            tiles: grid_layout(3, 3, 100.0),
            controller: ControllerConfig::default(),
            populations: vec![
                PopulationConfig {
                    name: "grass".into(),
                    tracker: TrackerConfig {
                        volume_size: 80.0,
                        ..TrackerConfig::default()
                    },
                    seed: 1,
                    ..PopulationConfig::default()
                },
                PopulationConfig {
                    name: "flowers".into(),
                    tracker: TrackerConfig {
                        volume_size: 120.0,
                        forward_bias: 20.0,
                        density: 0.01,
                    },
                    seed: 2,
                    ..PopulationConfig::default()
                },
            ],
            path: FlightPath::default(),
        }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Build every population; `seed`, when given, replaces the per-population seeds.
    pub fn populations(&self, seed: Option<u64>) -> Vec<Population<ParticleField>> {
        self.populations
            .iter()
            .enumerate()
            .map(|(i, pop)| {
                let seed = seed.map_or(pop.seed, |s| s.wrapping_add(i as u64));
                let mut field = ParticleField::with_seed(seed ^ FIELD_SEED_SALT)
                    .with_creation_limit(pop.creation_limit);
                if let Some(capacity) = pop.capacity {
                    field = field.with_capacity(capacity);
                }
                Population::new(pop.name.clone(), pop.tracker, field, seed)
            })
            .collect()
    }
}

/// One simulated population and its backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub name: String,
    pub tracker: TrackerConfig,
    pub seed: u64,
    /// Creation events the backend accepts per tick.
    pub creation_limit: usize,
    pub capacity: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            name: "population".into(),
            tracker: TrackerConfig::default(),
            seed: 0,
            creation_limit: 1,
            capacity: None,
        }
    }
}

/// Straight-line viewpoint motion with optional forced resets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPath {
    pub start: DVec3,
    /// World units per tick.
    pub velocity: DVec3,
    /// Heading around +Y, radians.
    pub yaw: f64,
    /// Ticks on which every tracker is forced to reset.
    pub resets: Vec<u64>,
}

impl Default for FlightPath {
    fn default() -> Self {
        Self {
            start: DVec3::new(60.0, 10.0, 150.0),
            velocity: DVec3::new(2.0, 0.0, 0.5),
            yaw: std::f64::consts::FRAC_PI_2,
            resets: Vec::new(),
        }
    }
}

impl FlightPath {
    pub fn viewpoint_at(&self, tick: u64) -> Transform {
        Transform::looking(self.start + self.velocity * tick as f64, self.yaw)
    }

    pub fn forces_reset(&self, tick: u64) -> bool {
        self.resets.contains(&tick)
    }
}

/// `columns` x `rows` tiles of `size`, min corner at the origin.
pub fn grid_layout(columns: u32, rows: u32, size: f64) -> Vec<TilePlacement> {
    let mut tiles = Vec::with_capacity((columns * rows) as usize);
    for z in 0..rows {
        for x in 0..columns {
            tiles.push(TilePlacement::new(
                z * columns + x,
                DVec2::new(x as f64 * size, z as f64 * size),
                DVec2::splat(size),
            ));
        }
    }
    tiles
}
