//! An agent claims space in the density field through a footprint, a small
//! grid of weights in `[0, 1]` placed at a global anchor. Slow agents use a
//! stationary footprint of their own outline, fast agents project theirs
//! along their heading so the crowd reacts to where they are about to be
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Weights of an agent placed in the world
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
	/// Weights, cell `(0, 0)` lands on the global cell `floor(anchor)`
	shape: Grid<f32>,
	/// Continuous global position of the shape's lowest corner
	anchor: Vec2,
}

impl Footprint {
	/// Create a new instance of [Footprint]
	pub fn new(shape: Grid<f32>, anchor: Vec2) -> Self {
		Footprint { shape, anchor }
	}
	/// Get the weights
	pub fn get_shape(&self) -> &Grid<f32> {
		&self.shape
	}
	/// Global cell that weight `(0, 0)` is written into
	pub fn get_origin(&self) -> IVec2 {
		self.anchor.floor().as_ivec2()
	}
	/// Inclusive `(min, max)` global cells covered by the shape
	pub fn get_bounds(&self) -> (IVec2, IVec2) {
		let origin = self.get_origin();
		let (columns, rows) = self.shape.get_dimensions();
		let extent = IVec2::new(columns as i32 - 1, rows as i32 - 1).max(IVec2::ZERO);
		(origin, origin + extent)
	}
}

/// The unrotated outline of an agent, rebuilt only when the agent size or
/// the falloff changes
#[derive(Clone, Debug)]
pub struct BaseFootprintCache {
	/// Size the base was built for
	size: Vec2,
	/// Falloff the base was built for
	falloff: f32,
	/// Cached outline
	base: Grid<f32>,
}

impl BaseFootprintCache {
	/// Build the outline of an agent of `size`
	pub fn new(size: Vec2, falloff: f32) -> Self {
		BaseFootprintCache {
			size,
			falloff,
			base: base_footprint(size, falloff),
		}
	}
	/// Get the outline, rebuilding it if the size or falloff has changed
	pub fn get(&mut self, size: Vec2, falloff: f32) -> &Grid<f32> {
		if self.size != size || self.falloff != falloff {
			trace!("Rebuilding base footprint for size {} falloff {}", size, falloff);
			self.size = size;
			self.falloff = falloff;
			self.base = base_footprint(size, falloff);
		}
		&self.base
	}
}

/// The outline of an agent of `size` with a radial falloff border
pub fn base_footprint(size: Vec2, falloff: f32) -> Grid<f32> {
	let width = size.x.max(0.0) as usize + 1;
	let height = size.y.max(0.0) as usize + 1;
	grid_math::radial_fade_rect(width, height, falloff)
}

/// Footprint of an agent standing still, the outline rotated to the agent
/// heading (degrees clockwise from `+y`) and centred on its position
pub fn stationary_footprint(base: &Grid<f32>, position: Vec2, rotation: f32) -> Footprint {
	let rotated = grid_math::rotate(base, -rotation);
	let half = Vec2::new(
		rotated.get_columns() as f32 / 2.0,
		rotated.get_rows() as f32 / 2.0,
	);
	let anchor = position - half + Vec2::splat(0.5);
	Footprint::new(grid_math::bilinear_place(&rotated, anchor), anchor)
}

/// Footprint of a moving agent. The outline is stretched forwards by the
/// distance covered in `v_predictive_seconds`, fading from `v_scale_max`
/// to `v_scale_min`, then rotated to the heading so the agent itself stays
/// at its position
pub fn mobile_footprint(
	base: &Grid<f32>,
	size: Vec2,
	position: Vec2,
	rotation: f32,
	speed: f32,
	settings: &CrowdSettings,
) -> Footprint {
	let distance = (speed * settings.v_predictive_seconds).max(0.0).ceil() as usize;
	let footprint_end = (settings.u_radial_falloff + size.x + 1.0).max(0.0).floor() as usize;
	let predictive = grid_math::linear_fadeout(
		base,
		footprint_end,
		distance,
		settings.v_scale_max,
		settings.v_scale_min,
	);
	let degrees = grid_math::modulus(90.0 - rotation, 360.0);
	let rotated = grid_math::rotate(&predictive, degrees);
	let base_height = base.get_rows() as f32;
	// centre of the agent's own outline relative to the centre of the
	// stretched footprint, then carried through the rotation
	let unit_offset = Vec2::new(
		base.get_columns() as f32 / 2.0 - predictive.get_columns() as f32 / 2.0,
		base_height / 2.0 - base_height / 2.0,
	);
	let unit_offset = grid_math::rotate_vec2(unit_offset, degrees.to_radians());
	// trim trigonometric noise so right angle headings stay on whole cells
	let unit_offset = (unit_offset * 1000.0).round() / 1000.0
		+ Vec2::new(
			rotated.get_columns() as f32 / 2.0,
			rotated.get_rows() as f32 / 2.0,
		);
	let anchor = position - unit_offset + Vec2::splat(0.5);
	Footprint::new(grid_math::bilinear_place(&rotated, anchor), anchor)
}

/// Pick and build the footprint for an agent's current motion
pub fn build_footprint(
	base: &Grid<f32>,
	size: Vec2,
	position: Vec2,
	rotation: f32,
	speed: f32,
	settings: &CrowdSettings,
) -> Footprint {
	if speed < settings.v_dynamic_footprint_threshold {
		stationary_footprint(base, position, rotation)
	} else {
		mobile_footprint(base, size, position, rotation, speed, settings)
	}
}
