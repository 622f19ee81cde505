//! Fast marching solution of the eikonal equation over one tile. Starting
//! from a goal region the potential `phi` (the least accumulated cost of
//! reaching the goal) is propagated outward in order of increasing value.
//! Its normalised gradient points away from the goal and, scaled by the
//! directional speed, yields the velocity every agent heading for that goal
//! should take
//!

pub mod indexed_heap;

use std::collections::HashSet;

use rayon::prelude::*;

use crate::prelude::*;
use bevy::prelude::*;

use self::indexed_heap::IndexedMinHeap;

/// The solved fields of a tile for one goal region
#[derive(Clone, Debug)]
pub struct EikonalSolution {
	/// Tile the solution covers
	tile_id: TileID,
	/// Potential, `inf` where the goal cannot be reached
	phi: Grid<f32>,
	/// Normalised potential gradient
	dphi: Grid<Vec2>,
	/// Velocity down the potential
	velocity: Grid<Vec2>,
	/// In-tile cells in the order they were accepted
	accepted_order: Vec<FieldCell>,
}

impl EikonalSolution {
	/// Get the tile the solution covers
	pub fn get_tile_id(&self) -> TileID {
		self.tile_id
	}
	/// Get the potential field
	pub fn get_potential_field(&self) -> &Grid<f32> {
		&self.phi
	}
	/// Get the normalised potential gradient
	pub fn get_potential_gradient_field(&self) -> &Grid<Vec2> {
		&self.dphi
	}
	/// Get the velocity field
	pub fn get_velocity_field(&self) -> &Grid<Vec2> {
		&self.velocity
	}
	/// Get the in-tile cells in the order they were accepted
	pub fn get_accepted_order(&self) -> &[FieldCell] {
		&self.accepted_order
	}
	/// Velocity at a continuous global position, bilinearly sampled and
	/// clamped to the tile edges
	pub fn sample_velocity(&self, position: Vec2) -> Vec2 {
		let local = position - self.tile_id.get_corner().as_vec2();
		grid_math::bilinear_sample_vec2(&self.velocity, local.x, local.y, true)
	}
}

/// Working state of a single solve
pub struct EikonalSolver<'a> {
	/// Tile being solved
	tile: &'a Tile,
	/// Tunable weights
	settings: &'a CrowdSettings,
	/// Goal cells in local coordinates, may sit outside the tile
	goals: HashSet<IVec2>,
	/// Potential
	phi: Grid<f32>,
	/// Cells whose potential is final
	accepted: Grid<bool>,
	/// Cells with a tentative potential
	considered: IndexedMinHeap<IVec2>,
	/// Accepted in-tile cells in order
	accepted_order: Vec<FieldCell>,
}

impl<'a> EikonalSolver<'a> {
	/// Solve the potential of `tile` towards the global goal cells. Goals
	/// just beyond the tile edge seed the cells next to them
	pub fn solve(tile: &'a Tile, goals: &[IVec2], settings: &'a CrowdSettings) -> EikonalSolution {
		let mut solver = EikonalSolver::new(tile, goals, settings);
		solver.march();
		solver.finish()
	}
	/// Set every goal to a potential of `0` and queue it
	fn new(tile: &'a Tile, goals: &[IVec2], settings: &'a CrowdSettings) -> Self {
		let (columns, rows) = (tile.get_size_x(), tile.get_size_y());
		let mut solver = EikonalSolver {
			tile,
			settings,
			goals: HashSet::new(),
			phi: Grid::new(columns, rows, f32::INFINITY),
			accepted: Grid::new(columns, rows, false),
			considered: IndexedMinHeap::new(),
			accepted_order: Vec::new(),
		};
		for global in goals {
			let local = tile.local_from_global(*global);
			if tile.is_local_point_valid(local) {
				solver.phi[FieldCell::new(local.x as usize, local.y as usize)] = 0.0;
			}
			solver.goals.insert(local);
			solver.considered.push(local, 0.0);
		}
		if solver.goals.is_empty() {
			warn!("Solving tile {:?} with no goals", tile.get_id());
		}
		solver
	}
	/// Accept cells in order of increasing potential, updating the
	/// neighbours of each
	fn march(&mut self) {
		while let Some((current, _)) = self.considered.pop() {
			for dir in Cardinal::ALL {
				let neighbour = current + dir.to_ivec2();
				if !self.is_valid_neighbour(neighbour) {
					continue;
				}
				let proposed = self.proposed_potential(neighbour);
				let cell = FieldCell::new(neighbour.x as usize, neighbour.y as usize);
				if proposed < self.phi[cell] {
					self.phi[cell] = proposed;
					self.considered.push(neighbour, proposed);
				}
			}
			if let Some(cell) = self.accepted.field_cell(current.x, current.y) {
				self.accepted[cell] = true;
				if self.tile.is_local_point_valid(current) {
					self.accepted_order.push(cell);
				}
			}
		}
	}
	/// A neighbour can be updated when it is a passable in-tile cell that is
	/// neither a goal nor accepted
	fn is_valid_neighbour(&self, local: IVec2) -> bool {
		if self.goals.contains(&local) || !self.tile.is_local_point_valid(local) {
			return false;
		}
		!self.accepted[FieldCell::new(local.x as usize, local.y as usize)]
	}
	/// Potential of a cell from the cheapest neighbour on each axis
	fn proposed_potential(&self, local: IVec2) -> f32 {
		let cell = FieldCell::new(local.x as usize, local.y as usize);
		let cost = self.tile.get_cost_field()[cell];
		let mut phi_m = Vec4::splat(f32::INFINITY);
		for dir in Cardinal::ALL {
			let m = local + dir.to_ivec2();
			let i = dir.index();
			if self.tile.is_local_point_valid(m) {
				phi_m[i] = self.phi[FieldCell::new(m.x as usize, m.y as usize)] + cost[i];
			} else if self.goals.contains(&m) {
				phi_m[i] = cost[i];
			}
		}
		let (phi_x, cost_x) = cheapest(phi_m, cost, Cardinal::East, Cardinal::West);
		let (phi_y, cost_y) = cheapest(phi_m, cost, Cardinal::North, Cardinal::South);
		solve_quadratic(phi_x, cost_x, phi_y, cost_y, self.settings)
	}
	/// Build the gradient and velocity from the potential
	fn finish(self) -> EikonalSolution {
		let gradient = grid_math::gradient(&self.phi);
		let dphi = Grid::from_fn(self.phi.get_columns(), self.phi.get_rows(), |cell| {
			// unreachable cells stay still
			if self.phi[cell].is_infinite() {
				Vec2::ZERO
			} else {
				gradient[cell].normalize_or_zero()
			}
		});
		let f = self.tile.get_speed_field();
		let velocity = Grid::from_fn(dphi.get_columns(), dphi.get_rows(), |cell| {
			let d = dphi[cell];
			let speed = f[cell];
			let x = if d.x > 0.0 {
				-speed[Cardinal::West.index()] * d.x
			} else {
				-speed[Cardinal::East.index()] * d.x
			};
			let y = if d.y > 0.0 {
				-speed[Cardinal::South.index()] * d.y
			} else {
				-speed[Cardinal::North.index()] * d.y
			};
			Vec2::new(x, y)
		});
		trace!(
			"Solved tile {:?}, {} cells accepted",
			self.tile.get_id(),
			self.accepted_order.len()
		);
		EikonalSolution {
			tile_id: self.tile.get_id(),
			phi: self.phi,
			dphi,
			velocity,
			accepted_order: self.accepted_order,
		}
	}
}

/// The smaller candidate potential along one axis with the cost of the
/// direction it came from, ties favour `first`
fn cheapest(phi_m: Vec4, cost: Vec4, first: Cardinal, second: Cardinal) -> (f32, f32) {
	let (a, b) = (first.index(), second.index());
	if phi_m[a] <= phi_m[b] {
		(phi_m[a], cost[a])
	} else {
		(phi_m[b], cost[b])
	}
}

/// Combine the two axis candidates into one potential. When the axes
/// disagree too much the cheaper axis is used alone, otherwise the roots of
/// the discretised eikonal quadratic are blended by the eikonal weights
pub fn solve_quadratic(phi_x: f32, cost_x: f32, phi_y: f32, cost_y: f32, settings: &CrowdSettings) -> f32 {
	if phi_x.is_infinite() && phi_y.is_infinite() {
		return f32::INFINITY;
	}
	let cx2 = cost_x * cost_x;
	let cy2 = cost_y * cost_y;
	let diff = phi_x - phi_y;
	if phi_x.is_infinite()
		|| phi_y.is_infinite()
		|| diff * diff > cx2 + cy2 - 1.0 / (cx2 * cy2)
	{
		return if phi_x <= phi_y {
			phi_x + cost_x
		} else {
			phi_y + cost_y
		};
	}
	let radical = (cx2 * cy2 * (cx2 + cy2 - diff * diff)).sqrt();
	let base = cy2 * phi_x + cx2 * phi_y;
	let root_max = (base + radical) / (cx2 + cy2);
	let root_min = (base - radical) / (cx2 + cy2);
	let w_max = settings.eikonal_max_weight;
	let w_min = settings.eikonal_min_weight;
	(root_max * w_max + root_min * w_min) / (w_max + w_min)
}

/// Solve several independent tile and goal pairs in parallel. A request for
/// a tile that doesn't exist yields `None`
pub fn solve_many(
	requests: &[(TileID, Vec<IVec2>)],
	tiles: &CrowdTiles,
	settings: &CrowdSettings,
) -> Vec<Option<EikonalSolution>> {
	requests
		.par_iter()
		.map(|(id, goals)| {
			let Some(tile) = tiles.get_tile(id) else {
				warn!("Cannot solve missing tile {:?}", id);
				return None;
			};
			Some(EikonalSolver::solve(tile, goals, settings))
		})
		.collect()
}
