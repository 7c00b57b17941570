use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Integer coordinate of a tile in the terrain grid (XZ plane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The four cardinal neighbours: -x, +x, +z, -z.
    pub fn neighbors(self) -> [TileCoord; 4] {
        [
            TileCoord::new(self.x - 1, self.z),
            TileCoord::new(self.x + 1, self.z),
            TileCoord::new(self.x, self.z + 1),
            TileCoord::new(self.x, self.z - 1),
        ]
    }
}

/// Identity of an independently placed tile object.
///
/// Two placements with the same id are the same tile; the registry uses this
/// to tell a harmless re-add from an overlapping tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// Viewpoint transform supplied by the driver every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Viewpoint looking along `+Z` rotated by `yaw` radians about `+Y`.
    pub fn looking(position: DVec3, yaw: f64) -> Self {
        Self {
            position,
            rotation: DQuat::from_rotation_y(yaw),
        }
    }

    /// Unit forward vector (`+Z` in local space).
    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }

    /// Position projected onto the XZ ground plane.
    pub fn ground_position(&self) -> DVec2 {
        DVec2::new(self.position.x, self.position.z)
    }
}
