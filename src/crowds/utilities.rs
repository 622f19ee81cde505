//! Useful structures and tools used by the fields
//!

use bevy::prelude::*;

/// The four axis directions a cell can be entered from. Directional fields
/// ([crate::prelude::Tile::get_speed_field], [crate::prelude::Tile::get_cost_field])
/// are stored as a [Vec4] in this order, `East` (`+x`), `North` (`+y`),
/// `West` (`-x`) then `South` (`-y`)
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub enum Cardinal {
	/// `+x`
	East,
	/// `+y`
	North,
	/// `-x`
	West,
	/// `-y`
	South,
}

impl Cardinal {
	/// Every direction in storage order
	pub const ALL: [Cardinal; 4] = [
		Cardinal::East,
		Cardinal::North,
		Cardinal::West,
		Cardinal::South,
	];
	/// Index of the direction within a directional [Vec4]
	pub fn index(&self) -> usize {
		match self {
			Cardinal::East => 0,
			Cardinal::North => 1,
			Cardinal::West => 2,
			Cardinal::South => 3,
		}
	}
	/// Unit step in grid space
	pub fn to_ivec2(&self) -> IVec2 {
		match self {
			Cardinal::East => IVec2::new(1, 0),
			Cardinal::North => IVec2::new(0, 1),
			Cardinal::West => IVec2::new(-1, 0),
			Cardinal::South => IVec2::new(0, -1),
		}
	}
	/// Unit vector in world space
	pub fn to_vec2(&self) -> Vec2 {
		self.to_ivec2().as_vec2()
	}
	/// Get the opposite direction
	pub fn inverse(&self) -> Cardinal {
		match self {
			Cardinal::East => Cardinal::West,
			Cardinal::North => Cardinal::South,
			Cardinal::West => Cardinal::East,
			Cardinal::South => Cardinal::North,
		}
	}
}
