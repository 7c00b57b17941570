use groundcover_common::{Rect, TileContext, TileCoord};

use crate::grid::{GridIndex, TileRange};
use crate::registry::TileRegistry;

/// A pending spawn region being split across tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Walk {
    pub bounds: Rect,
    pub range: TileRange,
    /// Next coordinate to visit; `None` once the range is exhausted.
    pub cursor: Option<TileCoord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WalkerState {
    #[default]
    Idle,
    Walking(Walk),
}

/// The part of a pending spawn region that falls inside one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSlice {
    pub bounds: Rect,
    pub tile: TileContext,
}

/// Spreads one spawn region over several ticks, one tile per creation event.
///
/// Tiles are visited in row-major order. Coordinates with no registered
/// tile, or whose tile clips the region to zero area, are skipped within
/// the same step.
#[derive(Debug, Clone, Default)]
pub struct TileWalker {
    state: WalkerState,
}

impl TileWalker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WalkerState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, WalkerState::Walking(_))
    }

    /// Region still waiting to be spawned.
    pub fn pending(&self) -> Option<Rect> {
        match self.state {
            WalkerState::Walking(walk) => Some(walk.bounds),
            WalkerState::Idle => None,
        }
    }

    /// Begin walking `bounds`, replacing any walk in progress.
    pub fn start(&mut self, bounds: Rect, grid: &GridIndex) {
        if bounds.is_empty() {
            self.state = WalkerState::Idle;
            return;
        }
        let range = grid.tile_range(&bounds);
        self.state = WalkerState::Walking(Walk {
            bounds,
            range,
            cursor: Some(range.min),
        });
    }

    pub fn cancel(&mut self) {
        self.state = WalkerState::Idle;
    }

    /// Shrink the pending region to `target`; a walk left with no area ends.
    pub fn clip_pending(&mut self, target: &Rect) {
        if let WalkerState::Walking(walk) = &mut self.state {
            walk.bounds = walk.bounds.clip(target);
            if walk.bounds.is_empty() {
                self.state = WalkerState::Idle;
            }
        }
    }

    /// Advance to the next tile with a non-empty slice of the pending region.
    ///
    /// Returns `None` and goes idle once the range is exhausted. When no
    /// further tile in the range would yield a slice, the walker is already
    /// idle when the final slice is returned.
    pub fn step(&mut self, registry: &TileRegistry) -> Option<TileSlice> {
        let slice = self.current(registry)?;
        self.advance(registry);
        Some(slice)
    }

    /// The slice under the cursor, without moving past it.
    ///
    /// Repeated calls return the same slice until [`TileWalker::advance`].
    /// Goes idle and returns `None` when nothing in the range is left.
    pub fn current(&mut self, registry: &TileRegistry) -> Option<TileSlice> {
        let WalkerState::Walking(walk) = &mut self.state else {
            return None;
        };
        let slice = walk.seek(registry);
        if slice.is_none() {
            self.state = WalkerState::Idle;
        }
        slice
    }

    /// Move past the current slice; goes idle if no further slice exists.
    pub fn advance(&mut self, registry: &TileRegistry) {
        let WalkerState::Walking(walk) = &mut self.state else {
            return;
        };
        if let Some(coord) = walk.cursor {
            tracing::trace!(?coord, "walker advanced");
        }
        walk.cursor = walk.cursor.and_then(|coord| walk.range.next_after(coord));
        if walk.seek(registry).is_none() {
            self.state = WalkerState::Idle;
        }
    }
}

impl Walk {
    fn slice_at(&self, coord: TileCoord, registry: &TileRegistry) -> Option<TileSlice> {
        let tile = registry.context(coord)?;
        let bounds = self.bounds.clip(&tile.bounds);
        (!bounds.is_empty()).then_some(TileSlice { bounds, tile })
    }

    /// Move the cursor onto the next coordinate that yields a slice.
    fn seek(&mut self, registry: &TileRegistry) -> Option<TileSlice> {
        while let Some(coord) = self.cursor {
            if let Some(slice) = self.slice_at(coord, registry) {
                return Some(slice);
            }
            self.cursor = self.range.next_after(coord);
        }
        None
    }
}
