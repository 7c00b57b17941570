use glam::{DVec2, DVec3};
use groundcover_common::{Rect, TileCoord};
use serde::{Deserialize, Serialize};

/// Fixed-size tile grid on the XZ plane.
///
/// Maps world positions to tile coordinates by floor division relative to
/// `origin`. Stateless: every position maps to some coordinate, including
/// positions far outside any populated tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridIndex {
    origin: DVec2,
    tile_size: DVec2,
}

impl GridIndex {
    /// Create a grid with the given origin and per-tile size.
    pub fn new(origin: DVec2, tile_size: DVec2) -> Self {
        assert!(
            tile_size.x > 0.0 && tile_size.y > 0.0,
            "tile_size must be positive"
        );
        Self { origin, tile_size }
    }

    /// Like [`GridIndex::new`], but `None` for a non-positive or NaN tile size.
    pub fn try_new(origin: DVec2, tile_size: DVec2) -> Option<Self> {
        (tile_size.x > 0.0 && tile_size.y > 0.0).then_some(Self { origin, tile_size })
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn tile_size(&self) -> DVec2 {
        self.tile_size
    }

    /// Tile containing a ground-plane position.
    pub fn tile_coord_of(&self, pos: DVec2) -> TileCoord {
        let rel = (pos - self.origin) / self.tile_size;
        TileCoord::new(rel.x.floor() as i32, rel.y.floor() as i32)
    }

    /// Tile containing a world position; Y is ignored.
    pub fn tile_coord_of_world(&self, pos: DVec3) -> TileCoord {
        self.tile_coord_of(DVec2::new(pos.x, pos.z))
    }

    /// Grid coordinate closest to a tile's placement corner.
    pub fn nearest_tile_coord(&self, pos: DVec2) -> TileCoord {
        let rel = (pos - self.origin) / self.tile_size;
        TileCoord::new(rel.x.round() as i32, rel.y.round() as i32)
    }

    /// World-space rectangle of a grid cell.
    pub fn tile_bounds(&self, coord: TileCoord) -> Rect {
        let min = self.origin + DVec2::new(coord.x as f64, coord.z as f64) * self.tile_size;
        Rect::from_min_max(min, min + self.tile_size)
    }

    /// Inclusive range of tiles touched by `rect`.
    pub fn tile_range(&self, rect: &Rect) -> TileRange {
        TileRange {
            min: self.tile_coord_of(rect.min()),
            max: self.tile_coord_of(rect.max()),
        }
    }
}

/// Inclusive 2-D range of tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub min: TileCoord,
    pub max: TileCoord,
}

impl TileRange {
    pub fn new(min: TileCoord, max: TileCoord) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x >= self.min.x && coord.x <= self.max.x && coord.z >= self.min.z && coord.z <= self.max.z
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let w = (self.max.x - self.min.x) as usize + 1;
        let d = (self.max.z - self.min.z) as usize + 1;
        w * d
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.z < self.min.z
    }

    /// Coordinate following `coord` in row-major order, if still in range.
    pub fn next_after(&self, coord: TileCoord) -> Option<TileCoord> {
        let next = if coord.x < self.max.x {
            TileCoord::new(coord.x + 1, coord.z)
        } else {
            TileCoord::new(self.min.x, coord.z + 1)
        };
        self.contains(next).then_some(next)
    }

    /// Row-major iteration: one Z row at a time, X ascending within a row.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min.z..=self.max.z)
            .flat_map(move |z| (self.min.x..=self.max.x).map(move |x| TileCoord::new(x, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_coord_of_floors_relative_to_origin() {
        let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(16.0));
        assert_eq!(grid.tile_coord_of(DVec2::new(10.0, 10.0)), TileCoord::new(0, 0));
        assert_eq!(grid.tile_coord_of(DVec2::new(20.0, -5.0)), TileCoord::new(1, -1));

        let offset = GridIndex::new(DVec2::new(100.0, 50.0), DVec2::new(100.0, 25.0));
        assert_eq!(offset.tile_coord_of(DVec2::new(99.0, 50.0)), TileCoord::new(-1, 0));
        assert_eq!(offset.tile_coord_of(DVec2::new(200.0, 100.0)), TileCoord::new(1, 2));
    }

    #[test]
    fn world_lookup_ignores_height() {
        let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(10.0));
        assert_eq!(
            grid.tile_coord_of_world(DVec3::new(15.0, 1000.0, -1.0)),
            TileCoord::new(1, -1)
        );
    }

    #[test]
    fn try_new_rejects_degenerate_sizes() {
        assert!(GridIndex::try_new(DVec2::ZERO, DVec2::ZERO).is_none());
        assert!(GridIndex::try_new(DVec2::ZERO, DVec2::new(10.0, -1.0)).is_none());
        assert!(GridIndex::try_new(DVec2::ZERO, DVec2::new(f64::NAN, 1.0)).is_none());
        assert!(GridIndex::try_new(DVec2::ONE, DVec2::splat(5.0)).is_some());
    }

    #[test]
    fn far_positions_still_map() {
        let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(100.0));
        assert_eq!(
            grid.tile_coord_of(DVec2::new(1.0e6, -1.0e6)),
            TileCoord::new(10_000, -10_000)
        );
    }

    #[test]
    fn nearest_coord_rounds_small_offsets() {
        let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(100.0));
        assert_eq!(grid.nearest_tile_coord(DVec2::new(99.99, 0.0)), TileCoord::new(1, 0));
        assert_eq!(grid.nearest_tile_coord(DVec2::new(105.0, -0.5)), TileCoord::new(1, 0));
    }

    #[test]
    fn tile_bounds_cover_cell() {
        let grid = GridIndex::new(DVec2::new(-50.0, 0.0), DVec2::splat(100.0));
        let b = grid.tile_bounds(TileCoord::new(1, 2));
        assert_eq!(b, Rect::from_edges(50.0, 150.0, 200.0, 300.0));
    }

    #[test]
    fn range_iterates_row_major() {
        let range = TileRange::new(TileCoord::new(0, 0), TileCoord::new(1, 1));
        let coords: Vec<_> = range.iter().collect();
        assert_eq!(
            coords,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(1, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 1),
            ]
        );
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn next_after_walks_then_stops() {
        let range = TileRange::new(TileCoord::new(0, 0), TileCoord::new(1, 0));
        assert_eq!(range.next_after(TileCoord::new(0, 0)), Some(TileCoord::new(1, 0)));
        assert_eq!(range.next_after(TileCoord::new(1, 0)), None);
    }

    #[test]
    fn tile_range_spans_rect() {
        let grid = GridIndex::new(DVec2::ZERO, DVec2::splat(100.0));
        let range = grid.tile_range(&Rect::from_edges(50.0, 250.0, -10.0, 10.0));
        assert_eq!(range.min, TileCoord::new(0, -1));
        assert_eq!(range.max, TileCoord::new(2, 0));
        assert_eq!(range.len(), 6);
    }

    #[test]
    #[should_panic(expected = "tile_size must be positive")]
    fn zero_tile_size_panics() {
        let _ = GridIndex::new(DVec2::ZERO, DVec2::new(0.0, 10.0));
    }
}
