//! Logic relating to rebuilding tile fields. Each tick agents refresh their
//! footprints and re-register with the tiles they touch, then every dirty
//! tile is reset, stamped and has its speed and cost recomputed
//!

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// Counts field rebuild ticks, tiles and agents use it to avoid doing the
/// same work twice in one tick
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct TickCounter(u64);

impl TickCounter {
	/// Get the current tick
	pub fn get(&self) -> u64 {
		self.0
	}
}

/// Used to change the discomfort of a cell, the affected tiles have their
/// baselines recomputed
#[derive(Event)]
pub struct EventUpdateDiscomfortCell {
	/// Global cell to update
	cell: IVec2,
	/// The discomfort the cell should be assigned, `>= 1` is impassable
	value: f32,
}

impl EventUpdateDiscomfortCell {
	/// Create a new instance of [EventUpdateDiscomfortCell]
	#[cfg(not(tarpaulin_include))]
	pub fn new(cell: IVec2, value: f32) -> Self {
		EventUpdateDiscomfortCell { cell, value }
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_cell(&self) -> IVec2 {
		self.cell
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_value(&self) -> f32 {
		self.value
	}
}

/// Force a tile to be rebuilt on this tick
#[derive(Event)]
pub struct EventTileDirty {
	/// The tile to rebuild
	tile: TileID,
}

impl EventTileDirty {
	/// Create a new instance of [EventTileDirty]
	#[cfg(not(tarpaulin_include))]
	pub fn new(tile: TileID) -> Self {
		EventTileDirty { tile }
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_tile(&self) -> TileID {
		self.tile
	}
}

/// Move onto the next tick
#[cfg(not(tarpaulin_include))]
pub fn advance_tick(mut tick: ResMut<TickCounter>) {
	tick.0 += 1;
}

/// Read [EventUpdateDiscomfortCell] and write the values into the tiles
#[cfg(not(tarpaulin_include))]
pub fn process_discomfort_updates(
	mut events: EventReader<EventUpdateDiscomfortCell>,
	mut q_tiles: Query<&mut CrowdTiles>,
	settings: Res<CrowdSettings>,
) {
	// coalesce events so each tile is only initiated once
	let mut changed = Vec::new();
	for event in events.read() {
		changed.push((event.get_cell(), event.get_value()));
	}
	if changed.is_empty() {
		return;
	}
	for mut tiles in q_tiles.iter_mut() {
		let mut initiate = Vec::new();
		for (cell, value) in changed.iter() {
			if !tiles.set_discomfort(*cell, *value) {
				warn!("Discomfort update at {} lies outside of the world", cell);
				continue;
			}
			if let Some(id) = tiles.get_dimensions().get_tile_id(*cell) {
				// edge costs of the neighbours look into the changed tile
				for adjacent in tiles.get_adjacent_tiles(&id) {
					if !initiate.contains(&adjacent) {
						initiate.push(adjacent);
					}
				}
				if !initiate.contains(&id) {
					initiate.push(id);
				}
			}
		}
		debug!("Discomfort changed, initiating {} tiles", initiate.len());
		reinitiate_tiles(&initiate, &mut tiles, &settings);
		for id in initiate {
			tiles.mark_dirty(id);
		}
	}
}

/// Read [EventTileDirty] and queue the tiles for rebuilding
#[cfg(not(tarpaulin_include))]
pub fn process_dirty_tiles(mut events: EventReader<EventTileDirty>, mut q_tiles: Query<&mut CrowdTiles>) {
	for event in events.read() {
		for mut tiles in q_tiles.iter_mut() {
			tiles.mark_dirty(event.get_tile());
		}
	}
}

/// Refresh the footprint of every agent and keep the tiles' record of which
/// agents touch them current. Every tile an agent touches, or has just left,
/// is marked dirty
#[cfg(not(tarpaulin_include))]
pub fn track_agent_footprints(
	mut q_agents: Query<(Entity, &mut CrowdAgent)>,
	mut q_tiles: Query<&mut CrowdTiles>,
	mut removed: RemovedComponents<CrowdAgent>,
	settings: Res<CrowdSettings>,
	tick: Res<TickCounter>,
) {
	let removed: Vec<AgentID> = removed.read().map(AgentID::from).collect();
	for mut tiles in q_tiles.iter_mut() {
		for id in removed.iter() {
			let ids: Vec<TileID> = tiles.get().keys().copied().collect();
			for tile_id in ids {
				let left = tiles
					.get_tile_mut(&tile_id)
					.is_some_and(|tile| tile.unsubscribe_agent(*id));
				if left {
					tiles.mark_dirty(tile_id);
				}
			}
		}
		for (entity, mut agent) in q_agents.iter_mut() {
			let id = AgentID::from(entity);
			agent.refresh_footprint(&settings, tick.get());
			let (min, max) = agent.get_footprint().get_bounds();
			let current = tiles.get_tiles_overlapping(min, max);
			let (left, joined) = agent.diff_impacted_tiles(current.clone());
			for tile_id in left {
				if let Some(tile) = tiles.get_tile_mut(&tile_id) {
					tile.unsubscribe_agent(id);
				}
				tiles.mark_dirty(tile_id);
			}
			for tile_id in joined {
				if let Some(tile) = tiles.get_tile_mut(&tile_id) {
					tile.subscribe_agent(id);
				}
			}
			for tile_id in current {
				tiles.mark_dirty(tile_id);
			}
		}
	}
}

/// Rebuild every dirty tile
#[cfg(not(tarpaulin_include))]
pub fn update_dirty_tiles(
	q_agents: Query<(Entity, &CrowdAgent)>,
	mut q_tiles: Query<&mut CrowdTiles>,
	settings: Res<CrowdSettings>,
	tick: Res<TickCounter>,
) {
	let agents: BTreeMap<AgentID, &CrowdAgent> = q_agents
		.iter()
		.map(|(entity, agent)| (AgentID::from(entity), agent))
		.collect();
	for mut tiles in q_tiles.iter_mut() {
		let dirty = tiles.take_dirty();
		if dirty.is_empty() {
			continue;
		}
		let updated = update_tiles(&dirty, &mut tiles, &agents, &settings, tick.get());
		trace!("Rebuilt {} of {} dirty tiles", updated, dirty.len());
	}
}
