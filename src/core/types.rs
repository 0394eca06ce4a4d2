//! Core type aliases and re-exports

use serde::{Deserialize, Serialize};

pub use glam::{IVec3, Vec3};

/// Standard Result type for the engine
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Axis a slice plane is perpendicular to.
///
/// `Axis::Z` addresses the XY plane (coordinate = z), `Axis::Y` the XZ plane
/// and `Axis::X` the YZ plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in component order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index into a position vector.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Plane coordinate of `position` along this axis.
    pub fn coordinate(self, position: IVec3) -> i32 {
        position[self.index()]
    }
}
