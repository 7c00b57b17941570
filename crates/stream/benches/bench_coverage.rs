use std::hint::black_box;
use std::time::Instant;

use glam::{DVec2, DVec3};
use groundcover_common::Transform;
use groundcover_sim::ParticleField;
use groundcover_stream::{
    CoverageTracker, GridIndex, TilePlacement, TileRegistry, TrackerConfig, dithered_count,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn make_layout(side: u32, tile_size: f64) -> Vec<TilePlacement> {
    let mut tiles = Vec::new();
    for z in 0..side {
        for x in 0..side {
            tiles.push(TilePlacement::new(
                z * side + x,
                DVec2::new(x as f64 * tile_size, z as f64 * tile_size),
                DVec2::splat(tile_size),
            ));
        }
    }
    tiles
}

fn make_registry(side: u32) -> TileRegistry {
    let tiles = make_layout(side, 100.0);
    TileRegistry::build(&tiles, GridIndex::new(DVec2::ZERO, DVec2::splat(100.0)), |_| true)
        .expect("layout has tiles")
}

fn bench_registry_build(side: u32, iterations: usize) {
    let tiles = make_layout(side, 100.0);
    let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(100.0));

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(TileRegistry::build(black_box(&tiles), grid, |_| true));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  registry build ({} tiles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        tiles.len()
    );
}

fn bench_tracker_flight(volume_size: f64, creation_limit: usize, ticks: usize) {
    let registry = make_registry(32);
    let config = TrackerConfig {
        volume_size,
        ..TrackerConfig::default()
    };
    let mut tracker = CoverageTracker::new(config);
    let mut sim = ParticleField::with_seed(1).with_creation_limit(creation_limit);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let start = Instant::now();
    for i in 0..ticks {
        // Diagonal flight across the layout
        let viewpoint = Transform::from_position(DVec3::new(
            200.0 + i as f64 * 1.5,
            0.0,
            200.0 + i as f64 * 0.75,
        ));
        let target = tracker.target_for(&viewpoint);
        let _ = black_box(tracker.tick(black_box(target), false, &registry, &mut sim, &mut rng));
        sim.step();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / ticks as u32;
    println!(
        "  tracker flight (volume {volume_size}, limit {creation_limit}, {ticks} ticks): {per_iter:?}/tick, total {elapsed:?}, particles {}",
        sim.particle_count()
    );
}

fn bench_dithered_count(iterations: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let start = Instant::now();
    for i in 0..iterations {
        let _ = black_box(dithered_count(black_box(i as f64 * 0.5), 0.05, &mut rng));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  dithered count ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Coverage Benchmarks ===\n");

    println!("Registry build:");
    bench_registry_build(4, 1000);
    bench_registry_build(16, 100);
    bench_registry_build(64, 10);

    println!("\nTracker flight:");
    bench_tracker_flight(80.0, 1, 1000);
    bench_tracker_flight(160.0, 1, 1000);
    bench_tracker_flight(160.0, 4, 1000);

    println!("\nSpawn budget:");
    bench_dithered_count(100_000);

    println!("\n=== Done ===");
}
