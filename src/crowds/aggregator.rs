//! Rebuilds the fields of a tile each tick. A tile is reset to its agent-free
//! baseline, every agent touching it stamps density and momentum, the
//! momentum is divided back into an average velocity, and finally the
//! directional speed and cost of every cell are derived. Speed and cost look
//! one cell across the tile edge, so they read neighbouring tiles through a
//! [TileLookup]
//!

use rayon::prelude::*;

use crate::prelude::*;
use bevy::prelude::*;

/// Clear density and momentum and restore the baseline discomfort, speed and
/// cost
pub fn reset_tile(tile: &mut Tile) {
	tile.reset_to_baseline();
}

/// Write an agent's footprint into a tile. Density combines per
/// [DensityCombine], momentum (`weight * mass * velocity`) always sums.
/// Weights falling outside of the tile are ignored
pub fn stamp_agent(tile: &mut Tile, agent: &CrowdAgent, settings: &CrowdSettings) {
	let footprint = agent.get_footprint();
	let origin = footprint.get_origin();
	let mass = agent.get_mass();
	let velocity = agent.get_velocity();
	for (cell, weight) in footprint.get_shape().iter() {
		if *weight <= 0.0 {
			continue;
		}
		let local = tile.local_from_global(origin + cell.as_ivec2());
		let Some(target) = tile.get_density_field().field_cell(local.x, local.y) else {
			continue;
		};
		let density = weight * mass;
		let rho = &mut tile.get_density_field_mut()[target];
		match settings.density_combine {
			DensityCombine::Sum => *rho += density,
			DensityCombine::Max => *rho = rho.max(density),
		}
		tile.get_average_velocity_field_mut()[target] += velocity * density;
	}
}

/// Turn the summed momentum into an average velocity by dividing through by
/// density, cells without density are left untouched
pub fn derive_average_velocity(tile: &mut Tile) {
	let rho = tile.get_density_field().clone();
	for (cell, v) in tile.get_average_velocity_field_mut().iter_mut() {
		let density = rho[cell];
		if density != 0.0 {
			*v /= density;
		}
	}
}

/// Speed dictated by the terrain when moving along `direction` over a cell
/// with height gradient `dh`, uphill is slower
pub fn compute_topographical_speed(direction: Vec2, dh: Vec2, settings: &CrowdSettings) -> f32 {
	let slope = direction.dot(dh);
	settings.f_speed_max
		+ (slope - settings.f_slope_min) / (settings.f_slope_max - settings.f_slope_min)
			* (settings.f_speed_min - settings.f_speed_max)
}

/// Speed dictated by the crowd, the component of its average velocity along
/// `direction`
pub fn compute_flow_speed(direction: Vec2, v_ave: Vec2) -> f32 {
	direction.dot(v_ave).max(0.0)
}

/// Find the tile and cell holding a global point, preferring `tile` itself
fn locate<'a, L: TileLookup + ?Sized>(
	tile: &'a Tile,
	global: IVec2,
	lookup: &'a L,
) -> Option<(&'a Tile, FieldCell)> {
	if let Some(cell) = tile.field_cell_from_global(global) {
		return Some((tile, cell));
	}
	let owner = lookup.resolve(global)?;
	let cell = owner.field_cell_from_global(global)?;
	Some((owner, cell))
}

/// Passable tile and cell holding a global point
fn locate_valid<'a, L: TileLookup + ?Sized>(
	tile: &'a Tile,
	global: IVec2,
	lookup: &'a L,
) -> Option<(&'a Tile, FieldCell)> {
	locate(tile, global, lookup).filter(|(owner, cell)| owner.get_discomfort_field()[*cell] < 1.0)
}

/// Speed of moving from a cell into its neighbour along `direction`, derived
/// from the neighbour's terrain and crowd
fn speed_into<L: TileLookup + ?Sized>(
	tile: &Tile,
	cell: FieldCell,
	direction: Cardinal,
	lookup: &L,
	settings: &CrowdSettings,
) -> f32 {
	let global = tile.global_from_local(cell.as_ivec2()) + direction.to_ivec2();
	let Some((owner, into)) = locate_valid(tile, global, lookup) else {
		return settings.f_speed_min;
	};
	let dir = direction.to_vec2();
	let rho = owner.get_density_field()[into];
	let speed = if rho < settings.f_rho_min {
		compute_topographical_speed(dir, owner.get_height_gradient_field()[into], settings)
	} else if rho > settings.f_rho_max {
		compute_flow_speed(dir, owner.get_average_velocity_field()[into])
	} else {
		let ft = compute_topographical_speed(dir, owner.get_height_gradient_field()[into], settings);
		let fv = compute_flow_speed(dir, owner.get_average_velocity_field()[into]);
		ft + (rho - settings.f_rho_min) / (settings.f_rho_max - settings.f_rho_min) * (fv - ft)
	};
	speed.clamp(settings.f_speed_min, settings.f_speed_max)
}

/// Directional speed of every cell of a tile. A direction leading off the
/// world or into an impassable cell gets the minimum speed
pub fn compute_speed_field<L: TileLookup + ?Sized>(
	tile: &Tile,
	lookup: &L,
	settings: &CrowdSettings,
) -> Grid<Vec4> {
	Grid::from_fn(tile.get_size_x(), tile.get_size_y(), |cell| {
		let mut f = Vec4::ZERO;
		for dir in Cardinal::ALL {
			f[dir.index()] = speed_into(tile, cell, dir, lookup, settings);
		}
		f
	})
}

/// Directional cost of every cell of a tile from its directional `speed`
/// and the discomfort of the cell being entered. A zero speed or an invalid
/// neighbour costs infinity
pub fn compute_cost_field<L: TileLookup + ?Sized>(
	tile: &Tile,
	speed: &Grid<Vec4>,
	lookup: &L,
	settings: &CrowdSettings,
) -> Grid<Vec4> {
	Grid::from_fn(tile.get_size_x(), tile.get_size_y(), |cell| {
		let mut c = Vec4::splat(f32::INFINITY);
		for dir in Cardinal::ALL {
			let f = speed[cell][dir.index()];
			if f == 0.0 {
				continue;
			}
			let global = tile.global_from_local(cell.as_ivec2()) + dir.to_ivec2();
			let Some((owner, into)) = locate_valid(tile, global, lookup) else {
				continue;
			};
			let g = owner.get_discomfort_field()[into].clamp(0.0, 1.0);
			c[dir.index()] = settings.c_alpha + settings.c_beta / f + settings.c_gamma * g / f;
		}
		c
	})
}

/// Compute the agent-free speed and cost of a tile and store them as its
/// baseline. The tile should be in its agent-free state
pub fn initiate_tile<L: TileLookup + ?Sized>(tile: &mut Tile, lookup: &L, settings: &CrowdSettings) {
	let (f, c) = {
		let view: &Tile = tile;
		let f = compute_speed_field(view, lookup, settings);
		let c = compute_cost_field(view, &f, lookup, settings);
		(f, c)
	};
	tile.set_speed_field(f);
	tile.set_cost_field(c);
	tile.store_baseline_fields();
}

/// Initiate every tile of a world, each tile reading its neighbours' static
/// fields
pub fn initiate_tiles(tiles: &mut CrowdTiles, settings: &CrowdSettings) {
	let ids: Vec<TileID> = tiles.get().keys().copied().collect();
	reinitiate_tiles(&ids, tiles, settings);
}

/// Recompute the agent-free baseline of some tiles, used after their
/// discomfort or terrain changes. Live density is cleared so the tiles need
/// updating again before they are solved
pub fn reinitiate_tiles(ids: &[TileID], tiles: &mut CrowdTiles, settings: &CrowdSettings) {
	debug!("Initiating {} tiles", ids.len());
	for id in ids {
		if let Some(tile) = tiles.get_tile_mut(id) {
			reset_tile(tile);
		}
	}
	let fields = compute_directional_fields(ids, tiles, settings);
	for (id, f, c) in fields {
		if let Some(tile) = tiles.get_tile_mut(&id) {
			tile.set_speed_field(f);
			tile.set_cost_field(c);
			tile.store_baseline_fields();
		}
	}
}

/// Speed and cost of several tiles computed in parallel from a shared view
fn compute_directional_fields(
	ids: &[TileID],
	tiles: &CrowdTiles,
	settings: &CrowdSettings,
) -> Vec<(TileID, Grid<Vec4>, Grid<Vec4>)> {
	ids.par_iter()
		.filter_map(|id| {
			let tile = tiles.get_tile(id)?;
			let f = compute_speed_field(tile, tiles, settings);
			let c = compute_cost_field(tile, &f, tiles, settings);
			Some((*id, f, c))
		})
		.collect()
}

/// Reset a tile and stamp every agent that impacts it, then derive the
/// average velocity
fn accumulate_agents<A: AgentLookup + ?Sized>(tile: &mut Tile, agents: &A, settings: &CrowdSettings) {
	reset_tile(tile);
	let impacting: Vec<AgentID> = tile.get_impacting_agents().iter().copied().collect();
	for id in impacting {
		match agents.get_agent(&id) {
			Some(agent) => stamp_agent(tile, agent, settings),
			None => warn!("Tile {:?} references missing agent {:?}", tile.get_id(), id),
		}
	}
	derive_average_velocity(tile);
}

/// Rebuild a single tile for `tick`. Returns `false` when the tile is
/// missing or has already been rebuilt during `tick`
pub fn update_tile<A: AgentLookup + ?Sized>(
	id: TileID,
	tiles: &mut CrowdTiles,
	agents: &A,
	settings: &CrowdSettings,
	tick: u64,
) -> bool {
	update_tiles(&[id], tiles, agents, settings, tick) == 1
}

/// Rebuild a batch of tiles for `tick`, returning how many were rebuilt.
/// Every tile first has its density and momentum accumulated, only then are
/// speed and cost derived, in parallel, so every tile reads its neighbours'
/// densities as of this tick
pub fn update_tiles<A: AgentLookup + ?Sized>(
	ids: &[TileID],
	tiles: &mut CrowdTiles,
	agents: &A,
	settings: &CrowdSettings,
	tick: u64,
) -> usize {
	let mut pending = Vec::new();
	for id in ids {
		let Some(tile) = tiles.get_tile_mut(id) else {
			warn!("Cannot update missing tile {:?}", id);
			continue;
		};
		if !tile.should_update(tick) || pending.contains(id) {
			continue;
		}
		accumulate_agents(tile, agents, settings);
		pending.push(*id);
	}
	let fields = compute_directional_fields(&pending, tiles, settings);
	let updated = fields.len();
	for (id, f, c) in fields {
		if let Some(tile) = tiles.get_tile_mut(&id) {
			tile.set_speed_field(f);
			tile.set_cost_field(c);
			tile.mark_complete(tick);
			trace!("Tile {:?} updated for tick {}", id, tick);
		}
	}
	updated
}

#[cfg(test)]
mod tests {
	use super::*;

	fn agent_at(position: Vec2, velocity: Vec2, settings: &CrowdSettings) -> CrowdAgent {
		// stood still so the footprint isn't projected
		let mut agent = CrowdAgent::new(position, Vec2::ZERO, 0.0, Vec2::ZERO, 1.0, settings);
		agent.set_velocity(velocity);
		agent
	}

	#[test]
	fn stamp_single_cell() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 5, 5, &settings);
		let agent = agent_at(Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), &settings);
		stamp_agent(&mut tile, &agent, &settings);
		derive_average_velocity(&mut tile);
		let cell = FieldCell::new(1, 1);
		assert_eq!(1.0, tile.get_density_field()[cell]);
		let result = tile.get_average_velocity_field()[cell];
		let actual = Vec2::new(1.0, 0.0);
		assert_eq!(actual, result);
		assert_eq!(0.0, tile.get_density_field()[FieldCell::new(2, 1)]);
	}
	#[test]
	fn stamp_outside_tile_is_ignored() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 5, 5, &settings);
		let agent = agent_at(Vec2::new(7.0, 1.0), Vec2::ZERO, &settings);
		stamp_agent(&mut tile, &agent, &settings);
		let result: f32 = tile.get_density_field().get().iter().sum();
		assert_eq!(0.0, result);
	}
	#[test]
	fn density_combine_policies() {
		let mut settings = CrowdSettings::default();
		let a = agent_at(Vec2::new(2.0, 2.0), Vec2::new(1.0, 0.0), &settings);
		let b = agent_at(Vec2::new(2.0, 2.0), Vec2::new(0.0, 1.0), &settings);
		let cell = FieldCell::new(2, 2);

		let mut tile = Tile::flat(TileID::new(0, 0), 5, 5, &settings);
		stamp_agent(&mut tile, &a, &settings);
		stamp_agent(&mut tile, &b, &settings);
		assert_eq!(1.0, tile.get_density_field()[cell]);
		assert_eq!(Vec2::new(1.0, 1.0), tile.get_average_velocity_field()[cell]);

		settings.density_combine = DensityCombine::Sum;
		let mut tile = Tile::flat(TileID::new(0, 0), 5, 5, &settings);
		stamp_agent(&mut tile, &a, &settings);
		stamp_agent(&mut tile, &b, &settings);
		derive_average_velocity(&mut tile);
		assert_eq!(2.0, tile.get_density_field()[cell]);
		assert_eq!(Vec2::new(0.5, 0.5), tile.get_average_velocity_field()[cell]);
	}
	#[test]
	fn topographical_speed_on_flat() {
		let settings = CrowdSettings::default();
		let result = compute_topographical_speed(Vec2::X, Vec2::ZERO, &settings);
		let actual = settings.flat_speed();
		assert_eq!(actual, result);
	}
	#[test]
	fn topographical_speed_uphill_is_slower() {
		let settings = CrowdSettings::default();
		let up = compute_topographical_speed(Vec2::X, Vec2::new(0.5, 0.0), &settings);
		let down = compute_topographical_speed(Vec2::X, Vec2::new(-0.5, 0.0), &settings);
		assert!(up < down);
		assert_eq!(5.0, up);
	}
	#[test]
	fn gentle_ramp_stays_passable() {
		let settings = CrowdSettings::default();
		let discomfort = Grid::new(5, 5, 0.0);
		let height = Grid::from_fn(5, 5, |cell| 0.1 * cell.get_column() as f32);
		let mut tile = Tile::new(TileID::new(0, 0), discomfort, height, &settings);
		initiate_tile(&mut tile, &IsolatedTile, &settings);
		let speed = tile.get_speed_field()[FieldCell::new(2, 2)];
		// a slope of 0.1 sits 55% of the way from fastest to slowest
		assert!((speed[Cardinal::East.index()] - 9.0).abs() < 1e-4);
		assert!((speed[Cardinal::West.index()] - 11.0).abs() < 1e-4);
		assert_eq!(settings.flat_speed(), speed[Cardinal::North.index()]);
		let cost = tile.get_cost_field()[FieldCell::new(2, 2)][Cardinal::East.index()];
		assert!(cost.is_finite());
	}
	#[test]
	fn flow_speed_never_negative() {
		let result = compute_flow_speed(Vec2::X, Vec2::new(-3.0, 1.0));
		assert_eq!(0.0, result);
		assert_eq!(2.0, compute_flow_speed(Vec2::Y, Vec2::new(-3.0, 2.0)));
	}
	#[test]
	fn speed_at_isolated_edges() {
		let settings = CrowdSettings::default();
		let tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		let speed = compute_speed_field(&tile, &IsolatedTile, &settings);
		let result = speed[FieldCell::new(0, 0)];
		let actual = Vec4::new(10.0, 10.0, 0.0, 0.0);
		assert_eq!(actual, result);
		let cost = compute_cost_field(&tile, &speed, &IsolatedTile, &settings);
		let c = cost[FieldCell::new(0, 0)];
		assert!((c.x - 1.1).abs() < 1e-6);
		assert!(c.z.is_infinite() && c.w.is_infinite());
	}
	#[test]
	fn speed_into_dense_crowd_follows_flow() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		let cell = FieldCell::new(1, 1);
		tile.get_density_field_mut()[cell] = 1.0;
		tile.get_average_velocity_field_mut()[cell] = Vec2::new(4.0, 0.0);
		let speed = compute_speed_field(&tile, &IsolatedTile, &settings);
		// from the west the crowd carries you east, from the east it opposes
		assert_eq!(4.0, speed[FieldCell::new(0, 1)][Cardinal::East.index()]);
		assert_eq!(0.0, speed[FieldCell::new(2, 1)][Cardinal::West.index()]);
	}
	#[test]
	fn blended_speed() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		let cell = FieldCell::new(1, 1);
		// half way between rho_min and rho_max
		tile.get_density_field_mut()[cell] = 0.55;
		tile.get_average_velocity_field_mut()[cell] = Vec2::new(4.0, 0.0);
		let speed = compute_speed_field(&tile, &IsolatedTile, &settings);
		let result = speed[FieldCell::new(0, 1)][Cardinal::East.index()];
		let actual = 7.0;
		assert!((actual - result).abs() < 1e-5);
	}
	#[test]
	fn impassable_neighbour_costs_infinity() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		tile.set_discomfort(1.0, FieldCell::new(1, 1));
		initiate_tile(&mut tile, &IsolatedTile, &settings);
		let result = tile.get_cost_field()[FieldCell::new(0, 1)][Cardinal::East.index()];
		assert!(result.is_infinite());
		assert_eq!(0.0, tile.get_speed_field()[FieldCell::new(0, 1)][Cardinal::East.index()]);
	}
	#[test]
	fn discomfort_raises_cost() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		tile.set_discomfort(0.5, FieldCell::new(1, 1));
		initiate_tile(&mut tile, &IsolatedTile, &settings);
		let result = tile.get_cost_field()[FieldCell::new(0, 1)][Cardinal::East.index()];
		let actual = 1.0 + 0.1 + 0.05;
		assert!((actual - result).abs() < 1e-6);
	}
	#[test]
	fn reinitiate_after_discomfort_change() {
		let settings = CrowdSettings::default();
		let mut tiles = CrowdTiles::new(WorldDimensions::new(10, 5, 5), &settings);
		initiate_tiles(&mut tiles, &settings);
		assert!(tiles.set_discomfort(IVec2::new(5, 2), 1.0));
		reinitiate_tiles(&[TileID::new(0, 0), TileID::new(5, 0)], &mut tiles, &settings);
		let west = tiles.get_tile(&TileID::new(0, 0)).unwrap();
		let result = west.get_cost_field()[FieldCell::new(4, 2)][Cardinal::East.index()];
		assert!(result.is_infinite());
		// the baseline now carries the wall
		let mut west = west.clone();
		west.reset_to_baseline();
		assert!(west.get_cost_field()[FieldCell::new(4, 2)][Cardinal::East.index()].is_infinite());
	}
	#[test]
	fn update_tile_once_per_tick() {
		let settings = CrowdSettings::default();
		let mut tiles = CrowdTiles::new(WorldDimensions::new(5, 5, 5), &settings);
		initiate_tiles(&mut tiles, &settings);
		let agents = CrowdAgents::default();
		let id = TileID::new(0, 0);
		assert!(update_tile(id, &mut tiles, &agents, &settings, 1));
		assert!(!update_tile(id, &mut tiles, &agents, &settings, 1));
		assert_eq!(Some(1), tiles.get_tile(&id).unwrap().get_last_update_id());
		assert!(!update_tile(TileID::new(5, 0), &mut tiles, &agents, &settings, 1));
	}
	#[test]
	fn neighbour_density_slows_edge() {
		let settings = CrowdSettings::default();
		let mut tiles = CrowdTiles::new(WorldDimensions::new(10, 5, 5), &settings);
		initiate_tiles(&mut tiles, &settings);
		let mut agents = CrowdAgents::default();
		let id = AgentID::new(1);
		// a stationary agent just over the edge in the eastern tile
		agents.insert(id, agent_at(Vec2::new(5.0, 2.0), Vec2::ZERO, &settings));
		let east = TileID::new(5, 0);
		let west = TileID::new(0, 0);
		tiles.get_tile_mut(&east).unwrap().subscribe_agent(id);
		let updated = update_tiles(&[west, east], &mut tiles, &agents, &settings, 1);
		assert_eq!(2, updated);
		let tile = tiles.get_tile(&west).unwrap();
		let result = tile.get_speed_field()[FieldCell::new(4, 2)][Cardinal::East.index()];
		assert_eq!(0.0, result);
		assert!(tile.get_cost_field()[FieldCell::new(4, 2)][Cardinal::East.index()].is_infinite());
		assert_eq!(10.0, tile.get_speed_field()[FieldCell::new(4, 1)][Cardinal::East.index()]);
	}
}
