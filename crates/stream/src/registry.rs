use std::collections::BTreeMap;

use bitflags::bitflags;
use glam::DVec2;
use groundcover_common::{Rect, TileContext, TileCoord, TileId};
use serde::{Deserialize, Serialize};

use crate::grid::GridIndex;

/// One independently placed terrain tile, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub id: TileId,
    /// World-space XZ position of the tile's min corner.
    pub position: DVec2,
    /// World-space XZ extent.
    pub size: DVec2,
    /// Grouping id; tiles of one terrain share a group.
    #[serde(default)]
    pub group: u32,
}

impl TilePlacement {
    pub fn new(id: u32, position: DVec2, size: DVec2) -> Self {
        Self {
            id: TileId(id),
            position,
            size,
            group: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_max(self.position, self.position + self.size)
    }
}

bitflags! {
    /// Configuration problems found while building a registry.
    ///
    /// These never abort a build; the registry stays usable with whatever
    /// tiles were accepted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RegistryErrors: u8 {
        /// Two different tiles resolved to the same grid coordinate.
        const OVERLAPPING = 1 << 0;
        /// A tile's size differs from the first registered tile.
        const SIZE_MISMATCH = 1 << 2;
        /// A neighbour is not exactly one tile size away.
        const EDGE_ALIGNMENT_MISMATCH = 1 << 3;
    }
}

/// Errors from registry construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Nothing passed the filter. Callers treat this as "not ready yet".
    #[error("no tiles matched the registry filter")]
    NoTiles,
    /// The grid's tile size is not positive in both axes.
    #[error("grid tile size must be positive, got {tile_size}")]
    InvalidGrid { tile_size: DVec2 },
}


/// Grid-aligned set of tiles built from independent placements.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    grid: GridIndex,
    tiles: BTreeMap<TileCoord, TilePlacement>,
    patch_size: Option<DVec2>,
    errors: RegistryErrors,
}

impl TileRegistry {
    /// Build and validate a registry from every placement accepted by `filter`.
    pub fn build<F>(
        placements: &[TilePlacement],
        grid: GridIndex,
        filter: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&TilePlacement) -> bool,
    {
        let mut registry = Self::build_unvalidated(placements, grid, filter)?;
        registry.validate();
        Ok(registry)
    }

    /// Build without the neighbour alignment pass.
    pub fn build_unvalidated<F>(
        placements: &[TilePlacement],
        grid: GridIndex,
        filter: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&TilePlacement) -> bool,
    {
        let mut registry = Self {
            grid,
            tiles: BTreeMap::new(),
            patch_size: None,
            errors: RegistryErrors::empty(),
        };
        for placement in placements.iter().filter(|p| filter(p)) {
            let coord = grid.nearest_tile_coord(placement.position);
            registry.try_insert(coord, *placement);
        }
        if registry.tiles.is_empty() {
            return Err(RegistryError::NoTiles);
        }
        Ok(registry)
    }

    /// Build with the grid origin and tile size taken from `origin`, keeping
    /// only tiles in the same group.
    pub fn from_origin_tile(
        origin: &TilePlacement,
        placements: &[TilePlacement],
    ) -> Result<Self, RegistryError> {
        let grid = Self::checked_grid(origin.position, origin.size)?;
        let group = origin.group;
        Self::build(placements, grid, |p| p.group == group)
    }

    /// Grid for `origin` and `tile_size`, or [`RegistryError::InvalidGrid`]
    /// when the size comes from untrusted configuration.
    pub fn checked_grid(origin: DVec2, tile_size: DVec2) -> Result<GridIndex, RegistryError> {
        GridIndex::try_new(origin, tile_size).ok_or(RegistryError::InvalidGrid { tile_size })
    }

    /// Replace the contents with a fresh build over the same grid.
    pub fn rebuild<F>(&mut self, placements: &[TilePlacement], filter: F) -> Result<(), RegistryError>
    where
        F: Fn(&TilePlacement) -> bool,
    {
        *self = Self::build(placements, self.grid, filter)?;
        Ok(())
    }

    fn try_insert(&mut self, coord: TileCoord, placement: TilePlacement) -> bool {
        if let Some(existing) = self.tiles.get(&coord) {
            if existing.id != placement.id {
                tracing::debug!(?coord, existing = ?existing.id, rejected = ?placement.id, "overlapping tile");
                self.errors |= RegistryErrors::OVERLAPPING;
            }
            return false;
        }
        match self.patch_size {
            None => self.patch_size = Some(placement.size),
            Some(size) => {
                if !approx_eq(size.x, placement.size.x) || !approx_eq(size.y, placement.size.y) {
                    tracing::debug!(?coord, tile = ?placement.id, "tile size mismatch");
                    self.errors |= RegistryErrors::SIZE_MISMATCH;
                }
            }
        }
        self.tiles.insert(coord, placement);
        true
    }

    /// Check every tile against its cardinal neighbours and return the
    /// accumulated flags.
    pub fn validate(&mut self) -> RegistryErrors {
        let misaligned = self
            .tiles
            .iter()
            .any(|(coord, tile)| !self.edges_aligned(*coord, tile));
        if misaligned {
            self.errors |= RegistryErrors::EDGE_ALIGNMENT_MISMATCH;
        }
        self.errors
    }

    fn edges_aligned(&self, coord: TileCoord, tile: &TilePlacement) -> bool {
        let [left, right, top, bottom] = coord.neighbors();
        let p = tile.position;
        let s = tile.size;
        let left_ok = self.tiles.get(&left).is_none_or(|n| {
            approx_eq(p.x, n.position.x + n.size.x) && approx_eq(p.y, n.position.y)
        });
        let right_ok = self
            .tiles
            .get(&right)
            .is_none_or(|n| approx_eq(p.x + s.x, n.position.x) && approx_eq(p.y, n.position.y));
        let top_ok = self
            .tiles
            .get(&top)
            .is_none_or(|n| approx_eq(p.x, n.position.x) && approx_eq(p.y + s.y, n.position.y));
        let bottom_ok = self.tiles.get(&bottom).is_none_or(|n| {
            approx_eq(p.x, n.position.x) && approx_eq(p.y, n.position.y + n.size.y)
        });
        left_ok && right_ok && top_ok && bottom_ok
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn errors(&self) -> RegistryErrors {
        self.errors
    }

    pub fn get(&self, coord: TileCoord) -> Option<&TilePlacement> {
        self.tiles.get(&coord)
    }

    /// Tile whose grid cell contains `pos`.
    pub fn tile_at(&self, pos: DVec2) -> Option<&TilePlacement> {
        self.get(self.grid.tile_coord_of(pos))
    }

    /// Attribute binding for spawning into the tile at `coord`.
    pub fn context(&self, coord: TileCoord) -> Option<TileContext> {
        self.get(coord).map(|tile| TileContext {
            coord,
            tile: tile.id,
            bounds: tile.bounds(),
        })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (&TileCoord, &TilePlacement)> {
        self.tiles.iter()
    }
}

/// Relative float comparison for placement checks.
fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= 1.0e-6 * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid100() -> GridIndex {
        GridIndex::new(DVec2::ZERO, DVec2::splat(100.0))
    }

    fn tile(id: u32, x: f64, z: f64) -> TilePlacement {
        TilePlacement::new(id, DVec2::new(x, z), DVec2::splat(100.0))
    }

    #[test]
    fn adjacent_tiles_register_cleanly() {
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), tile(2, 100.0, 0.0)], grid100(), |_| true)
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.errors(), RegistryErrors::empty());
        assert!(!registry.errors().contains(RegistryErrors::EDGE_ALIGNMENT_MISMATCH));
        assert_eq!(registry.get(TileCoord::new(1, 0)).unwrap().id, TileId(2));
    }

    #[test]
    fn gap_between_tiles_flags_edge_misalignment() {
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), tile(2, 105.0, 0.0)], grid100(), |_| true)
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.errors().contains(RegistryErrors::EDGE_ALIGNMENT_MISMATCH));
        assert!(!registry.errors().contains(RegistryErrors::OVERLAPPING));
    }

    #[test]
    fn unvalidated_build_skips_alignment_pass() {
        let registry =
            TileRegistry::build_unvalidated(&[tile(1, 0.0, 0.0), tile(2, 105.0, 0.0)], grid100(), |_| true)
                .unwrap();
        assert!(registry.errors().is_empty());
    }

    #[test]
    fn different_tile_at_same_coord_is_flagged_not_inserted() {
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), tile(2, 2.0, 0.0)], grid100(), |_| true)
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(TileCoord::new(0, 0)).unwrap().id, TileId(1));
        assert!(registry.errors().contains(RegistryErrors::OVERLAPPING));
    }

    #[test]
    fn same_tile_twice_is_a_no_op() {
        let t = tile(1, 0.0, 0.0);
        let registry = TileRegistry::build(&[t, t], grid100(), |_| true).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.errors().is_empty());
    }

    #[test]
    fn size_mismatch_is_flagged_but_kept() {
        let small = TilePlacement::new(2, DVec2::new(100.0, 0.0), DVec2::splat(50.0));
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), small], grid100(), |_| true).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.errors().contains(RegistryErrors::SIZE_MISMATCH));
    }

    #[test]
    fn vertical_neighbors_are_checked() {
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), tile(2, 3.0, 100.0)], grid100(), |_| true)
            .unwrap();
        assert!(registry.errors().contains(RegistryErrors::EDGE_ALIGNMENT_MISMATCH));
    }

    #[test]
    fn empty_filter_result_is_no_tiles() {
        let err = TileRegistry::build(&[tile(1, 0.0, 0.0)], grid100(), |p| p.group == 9).unwrap_err();
        assert_eq!(err, RegistryError::NoTiles);
        assert_eq!(
            TileRegistry::build(&[], grid100(), |_| true).unwrap_err(),
            RegistryError::NoTiles
        );
    }

    #[test]
    fn origin_tile_defines_grid_and_group() {
        let origin = TilePlacement {
            group: 3,
            ..tile(1, 50.0, 50.0)
        };
        let other_group = TilePlacement {
            group: 4,
            ..tile(2, 150.0, 50.0)
        };
        let same_group = TilePlacement {
            group: 3,
            ..tile(3, 50.0, 150.0)
        };
        let registry = TileRegistry::from_origin_tile(&origin, &[origin, other_group, same_group]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.grid().origin(), DVec2::new(50.0, 50.0));
        assert_eq!(registry.get(TileCoord::new(0, 1)).unwrap().id, TileId(3));
        assert!(registry.errors().is_empty());
    }

    #[test]
    fn zero_sized_origin_tile_is_an_error() {
        let flat = TilePlacement::new(1, DVec2::ZERO, DVec2::new(100.0, 0.0));
        assert_eq!(
            TileRegistry::from_origin_tile(&flat, &[flat]).unwrap_err(),
            RegistryError::InvalidGrid {
                tile_size: DVec2::new(100.0, 0.0)
            }
        );
    }

    #[test]
    fn lookups_resolve_by_world_position() {
        let registry = TileRegistry::build(&[tile(1, 0.0, 0.0), tile(2, 100.0, 0.0)], grid100(), |_| true)
            .unwrap();
        assert_eq!(registry.tile_at(DVec2::new(150.0, 20.0)).unwrap().id, TileId(2));
        assert!(registry.tile_at(DVec2::new(-1.0, 20.0)).is_none());

        let ctx = registry.context(TileCoord::new(1, 0)).unwrap();
        assert_eq!(ctx.tile, TileId(2));
        assert_eq!(ctx.bounds, Rect::from_edges(100.0, 200.0, 0.0, 100.0));
    }

    #[test]
    fn rebuild_replaces_tiles() {
        let mut registry = TileRegistry::build(&[tile(1, 0.0, 0.0)], grid100(), |_| true).unwrap();
        registry
            .rebuild(&[tile(1, 0.0, 0.0), tile(2, 0.0, 100.0)], |_| true)
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.rebuild(&[], |_| true).is_err());
        assert_eq!(registry.len(), 2);
    }
}
