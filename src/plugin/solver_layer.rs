//! Logic relating to eikonal solutions. Agents ask for a route to a goal
//! region within a tile, agents sharing a goal share a solution, and each
//! solution is re-solved on a fixed cadence while anyone follows it
//!

use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Ask for an agent to be steered towards a goal region within a tile
#[derive(Event)]
pub struct EventSolveRequest {
	/// Entity carrying the [CrowdAgent]
	agent: Entity,
	/// The tile to solve across
	tile: TileID,
	/// Global goal cells
	goals: Vec<IVec2>,
}

impl EventSolveRequest {
	/// Create a new instance of [EventSolveRequest]
	#[cfg(not(tarpaulin_include))]
	pub fn new(agent: Entity, tile: TileID, goals: Vec<IVec2>) -> Self {
		EventSolveRequest { agent, tile, goals }
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_agent(&self) -> Entity {
		self.agent
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_tile(&self) -> TileID {
		self.tile
	}
	#[cfg(not(tarpaulin_include))]
	pub fn get_goals(&self) -> &[IVec2] {
		&self.goals
	}
}

/// Subscribe agents to the solutions they asked for, dropping any solution
/// they followed before
#[cfg(not(tarpaulin_include))]
pub fn event_subscribe_solutions(
	mut events: EventReader<EventSolveRequest>,
	mut q_agents: Query<&mut CrowdAgent>,
	mut q_cache: Query<(&CrowdTiles, &mut SolutionCache)>,
	time: Res<Time>,
) {
	let now = time.elapsed();
	for event in events.read() {
		if event.get_goals().is_empty() {
			warn!("Solve request for {:?} has no goals", event.get_agent());
			continue;
		}
		let Ok(mut agent) = q_agents.get_mut(event.get_agent()) else {
			warn!("Solve request for {:?} which isn't an agent", event.get_agent());
			continue;
		};
		let id = AgentID::from(event.get_agent());
		let metadata = SolutionMetadata::new(event.get_tile(), event.get_goals());
		for (tiles, mut cache) in q_cache.iter_mut() {
			if tiles.get_tile(&event.get_tile()).is_none() {
				error!("Solve request for tile {:?} which doesn't exist", event.get_tile());
				continue;
			}
			if let Some(previous) = agent.set_solution(Some(metadata.clone())) {
				if previous != metadata {
					cache.unsubscribe(&previous, id, now);
				}
			}
			cache.subscribe(metadata.clone(), id);
		}
	}
}

/// Solve every solution that is new or has reached its refresh cadence
#[cfg(not(tarpaulin_include))]
pub fn solve_due_solutions(
	mut q_cache: Query<(&CrowdTiles, &mut SolutionCache)>,
	settings: Res<CrowdSettings>,
	time: Res<Time>,
) {
	let now = time.elapsed();
	let refresh = Duration::from_secs_f32(settings.solution_refresh_seconds);
	for (tiles, mut cache) in q_cache.iter_mut() {
		let due: Vec<SolutionMetadata> = cache
			.get_due(now, refresh)
			.into_iter()
			.filter(|m| !tiles.is_dirty(&m.get_tile_id()))
			.collect();
		if due.is_empty() {
			continue;
		}
		let requests: Vec<(TileID, Vec<IVec2>)> = due
			.iter()
			.map(|m| (m.get_tile_id(), m.get_goals()))
			.collect();
		let solved = solve_many(&requests, tiles, &settings);
		for (metadata, eikonal) in due.iter().zip(solved) {
			if let Some(eikonal) = eikonal {
				cache.insert_eikonal(metadata, eikonal, now);
			}
		}
		debug!("Solved {} crowd solutions", due.len());
	}
}

/// Write the velocity of each agent's solution at its position into the
/// agent's desired velocity
#[cfg(not(tarpaulin_include))]
pub fn steer_agents(mut q_agents: Query<&mut CrowdAgent>, q_cache: Query<&SolutionCache>) {
	for mut agent in q_agents.iter_mut() {
		let Some(metadata) = agent.get_solution().cloned() else {
			continue;
		};
		let position = agent.get_position();
		let velocity = q_cache
			.iter()
			.find_map(|cache| cache.get_solution(&metadata))
			.and_then(|solution| solution.sample_velocity(position))
			.unwrap_or(Vec2::ZERO);
		agent.set_desired_velocity(velocity);
	}
}

/// Drop solutions that have been left unfollowed for longer than the
/// configured lifetime, despawned agents stop following everything
#[cfg(not(tarpaulin_include))]
pub fn cleanup_old_solutions(
	mut q_cache: Query<&mut SolutionCache>,
	mut removed: RemovedComponents<CrowdAgent>,
	settings: Res<CrowdSettings>,
	time: Res<Time>,
) {
	let now = time.elapsed();
	let removed: Vec<AgentID> = removed.read().map(AgentID::from).collect();
	let lifetime = Duration::from_secs_f32(settings.solution_lifetime_seconds);
	for mut cache in q_cache.iter_mut() {
		for id in removed.iter() {
			cache.unsubscribe_everywhere(*id, now);
		}
		let dropped = cache.remove_stale(now, lifetime);
		if dropped > 0 {
			debug!("Removed {} stale solutions", dropped);
		}
	}
}
