use groundcover_common::{Rect, Simulation, SimulationError, SpawnRequest, TileContext};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Subtracted from the dithered product so a draw of exactly 0 with an
/// integral `area * density` does not round up.
pub const DITHER_EPSILON: f64 = 0.001;

/// Stochastically rounded entity count for `area * density`.
///
/// `floor(area * density + U[0,1) - epsilon)`, clamped at zero. Averaged
/// over many small spawns the total converges to `area * density`. Always
/// consumes exactly one draw from `rng`.
pub fn dithered_count<R: Rng + ?Sized>(area: f64, density: f64, rng: &mut R) -> u32 {
    dither(area, density, DITHER_EPSILON, rng)
}

fn dither<R: Rng + ?Sized>(area: f64, density: f64, epsilon: f64, rng: &mut R) -> u32 {
    let jitter: f64 = rng.gen_range(0.0..1.0);
    let count = (area.max(0.0) * density + jitter - epsilon).floor();
    if count <= 0.0 {
        0
    } else {
        // saturating float-to-int cast
        count as u32
    }
}

/// Converts spawn rectangles into dithered creation requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBudgeter {
    /// Entities per square world unit.
    pub density: f64,
    pub epsilon: f64,
}

impl SpawnBudgeter {
    pub fn new(density: f64) -> Self {
        Self {
            density,
            epsilon: DITHER_EPSILON,
        }
    }

    pub fn count_for<R: Rng + ?Sized>(&self, area: f64, rng: &mut R) -> u32 {
        dither(area, self.density, self.epsilon, rng)
    }

    /// Build the creation request for `bounds` inside `tile`.
    pub fn request<R: Rng + ?Sized>(&self, bounds: Rect, tile: TileContext, rng: &mut R) -> SpawnRequest {
        SpawnRequest {
            bounds,
            count: self.count_for(bounds.area(), rng),
            tile,
        }
    }
}

/// Per-tick allowance of creation events.
///
/// Each issued request uses one slot whether or not it creates anything;
/// requests with a zero count are not forwarded to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationBudget {
    limit: usize,
    used: usize,
}

impl CreationBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Issue `request` to `sim`, consuming one slot.
    pub fn issue<S: Simulation + ?Sized>(
        &mut self,
        sim: &mut S,
        request: &SpawnRequest,
    ) -> Result<(), SimulationError> {
        if self.is_exhausted() {
            return Err(SimulationError::CreationBudgetExceeded { limit: self.limit });
        }
        self.used += 1;
        if request.count > 0 {
            sim.spawn_in_bounds(request)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcover_common::{TileCoord, TileId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx() -> TileContext {
        TileContext {
            coord: TileCoord::new(0, 0),
            tile: TileId(1),
            bounds: Rect::from_edges(0.0, 100.0, 0.0, 100.0),
        }
    }

    #[derive(Default)]
    struct Counter {
        spawns: Vec<u32>,
    }

    impl Simulation for Counter {
        fn reset(&mut self) {}

        fn cull_outside(&mut self, _bounds: Rect) {}

        fn spawn_in_bounds(&mut self, request: &SpawnRequest) -> Result<(), SimulationError> {
            self.spawns.push(request.count);
            Ok(())
        }
    }

    #[test]
    fn zero_area_never_spawns() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for density in [0.0, 0.5, 10.0, 1.0e6] {
            for _ in 0..100 {
                assert_eq!(dithered_count(0.0, density, &mut rng), 0);
            }
        }
        assert_eq!(dithered_count(-5.0, 3.0, &mut rng), 0);
    }

    #[test]
    fn unit_expectation_dithers_to_zero_or_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let mut total = 0u64;
        for _ in 0..n {
            let c = dithered_count(10.0, 0.1, &mut rng);
            assert!(c <= 1);
            total += c as u64;
        }
        let mean = total as f64 / n as f64;
        assert!((mean - 1.0).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn fractional_expectation_converges() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 50_000;
        let total: u64 = (0..n).map(|_| dithered_count(3.0, 0.25, &mut rng) as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 0.75).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn each_call_draws_once() {
        let mut a = ChaCha8Rng::seed_from_u64(3);
        let mut b = ChaCha8Rng::seed_from_u64(3);
        dithered_count(0.0, 1.0, &mut a);
        dithered_count(50.0, 1.0, &mut a);
        let _: f64 = b.gen_range(0.0..1.0);
        let _: f64 = b.gen_range(0.0..1.0);
        assert_eq!(a.gen_range(0..u64::MAX), b.gen_range(0..u64::MAX));
    }

    #[test]
    fn budgeter_request_uses_bounds_area() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let budgeter = SpawnBudgeter::new(1.0);
        let bounds = Rect::from_edges(0.0, 10.0, 0.0, 10.0);
        let request = budgeter.request(bounds, ctx(), &mut rng);
        assert_eq!(request.bounds, bounds);
        assert!(request.count == 99 || request.count == 100);
    }

    #[test]
    fn budget_refuses_extra_events() {
        let mut sim = Counter::default();
        let mut budget = CreationBudget::new(1);
        let request = SpawnRequest {
            bounds: Rect::from_edges(0.0, 1.0, 0.0, 1.0),
            count: 4,
            tile: ctx(),
        };
        budget.issue(&mut sim, &request).unwrap();
        assert!(budget.is_exhausted());
        assert_eq!(
            budget.issue(&mut sim, &request),
            Err(SimulationError::CreationBudgetExceeded { limit: 1 })
        );
        assert_eq!(sim.spawns, vec![4]);
    }

    #[test]
    fn zero_count_uses_slot_without_forwarding() {
        let mut sim = Counter::default();
        let mut budget = CreationBudget::new(2);
        let request = SpawnRequest {
            bounds: Rect::from_edges(0.0, 1.0, 0.0, 1.0),
            count: 0,
            tile: ctx(),
        };
        budget.issue(&mut sim, &request).unwrap();
        assert_eq!(budget.remaining(), 1);
        assert!(sim.spawns.is_empty());
    }
}
