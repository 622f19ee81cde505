//! Agents are the members of a crowd. Each carries the physical state the
//! fields need (position, velocity, heading, size and mass) along with its
//! cached footprint and the tiles that footprint touches
//!

use std::borrow::Borrow;
use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// Unique ID of an agent
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct AgentID(u64);

impl AgentID {
	/// Create a new instance of [AgentID]
	pub fn new(id: u64) -> Self {
		AgentID(id)
	}
	/// Get the raw ID
	pub fn get(&self) -> u64 {
		self.0
	}
}

impl From<Entity> for AgentID {
	fn from(entity: Entity) -> Self {
		AgentID(entity.to_bits())
	}
}

/// A member of the crowd
#[derive(Component, Clone, Debug)]
pub struct CrowdAgent {
	/// Global position, cell `(x, y)` covers `x..x+1`, `y..y+1`
	position: Vec2,
	/// Current velocity
	velocity: Vec2,
	/// Heading in degrees, clockwise from `+y`
	rotation: f32,
	/// Extent of the agent in cells
	size: Vec2,
	/// Scales the density and momentum the agent stamps
	mass: f32,
	/// Unrotated outline
	base: BaseFootprintCache,
	/// The footprint as of the last refresh
	footprint: Footprint,
	/// Tick on which the footprint was last refreshed
	last_update_id: Option<u64>,
	/// Tiles the current footprint touches
	impacted_tiles: Vec<TileID>,
	/// Velocity sampled from the agent's solution, what the host should steer
	/// towards
	desired_velocity: Vec2,
	/// Solution the agent follows
	solution: Option<SolutionMetadata>,
}

impl CrowdAgent {
	/// Create a new agent, its footprint is built immediately
	pub fn new(
		position: Vec2,
		velocity: Vec2,
		rotation: f32,
		size: Vec2,
		mass: f32,
		settings: &CrowdSettings,
	) -> Self {
		let mut base = BaseFootprintCache::new(size, settings.u_radial_falloff);
		let footprint = build_footprint(
			base.get(size, settings.u_radial_falloff),
			size,
			position,
			rotation,
			velocity.length(),
			settings,
		);
		CrowdAgent {
			position,
			velocity,
			rotation,
			size,
			mass,
			base,
			footprint,
			last_update_id: None,
			impacted_tiles: Vec::new(),
			desired_velocity: Vec2::ZERO,
			solution: None,
		}
	}
	/// Get the position
	pub fn get_position(&self) -> Vec2 {
		self.position
	}
	/// Set the position
	pub fn set_position(&mut self, position: Vec2) {
		self.position = position;
	}
	/// Get the velocity
	pub fn get_velocity(&self) -> Vec2 {
		self.velocity
	}
	/// Set the velocity
	pub fn set_velocity(&mut self, velocity: Vec2) {
		self.velocity = velocity;
	}
	/// Current speed
	pub fn get_speed(&self) -> f32 {
		self.velocity.length()
	}
	/// Get the heading, degrees clockwise from `+y`
	pub fn get_rotation(&self) -> f32 {
		self.rotation
	}
	/// Set the heading, degrees clockwise from `+y`
	pub fn set_rotation(&mut self, rotation: f32) {
		self.rotation = rotation;
	}
	/// Point the heading along the velocity, a stationary agent keeps its
	/// heading
	pub fn face_velocity(&mut self) {
		if self.velocity != Vec2::ZERO {
			self.rotation = grid_math::modulus(
				self.velocity.x.atan2(self.velocity.y).to_degrees(),
				360.0,
			);
		}
	}
	/// Get the size
	pub fn get_size(&self) -> Vec2 {
		self.size
	}
	/// Set the size
	pub fn set_size(&mut self, size: Vec2) {
		self.size = size;
	}
	/// Get the mass
	pub fn get_mass(&self) -> f32 {
		self.mass
	}
	/// Get the footprint as of the last refresh
	pub fn get_footprint(&self) -> &Footprint {
		&self.footprint
	}
	/// Tick on which the footprint was last refreshed
	pub fn get_last_update_id(&self) -> Option<u64> {
		self.last_update_id
	}
	/// Rebuild the footprint from the current motion unless it has already
	/// been rebuilt during `tick`. Returns `true` if it was rebuilt
	pub fn refresh_footprint(&mut self, settings: &CrowdSettings, tick: u64) -> bool {
		if self.last_update_id == Some(tick) {
			return false;
		}
		let base = self.base.get(self.size, settings.u_radial_falloff);
		self.footprint = build_footprint(
			base,
			self.size,
			self.position,
			self.rotation,
			self.velocity.length(),
			settings,
		);
		self.last_update_id = Some(tick);
		true
	}
	/// Get the tiles the footprint touched when they were last recorded
	pub fn get_impacted_tiles(&self) -> &[TileID] {
		&self.impacted_tiles
	}
	/// Record the tiles the footprint now touches, returning the tiles that
	/// are no longer touched and the newly touched ones
	pub fn diff_impacted_tiles(&mut self, current: Vec<TileID>) -> (Vec<TileID>, Vec<TileID>) {
		let left: Vec<TileID> = self
			.impacted_tiles
			.iter()
			.filter(|id| !current.contains(id))
			.copied()
			.collect();
		let joined: Vec<TileID> = current
			.iter()
			.filter(|id| !self.impacted_tiles.contains(id))
			.copied()
			.collect();
		self.impacted_tiles = current;
		(left, joined)
	}
	/// Velocity the agent's solution suggests
	pub fn get_desired_velocity(&self) -> Vec2 {
		self.desired_velocity
	}
	/// Set the suggested velocity
	pub fn set_desired_velocity(&mut self, velocity: Vec2) {
		self.desired_velocity = velocity;
	}
	/// The solution the agent follows
	pub fn get_solution(&self) -> Option<&SolutionMetadata> {
		self.solution.as_ref()
	}
	/// Follow a different solution, returns the one previously followed
	pub fn set_solution(&mut self, solution: Option<SolutionMetadata>) -> Option<SolutionMetadata> {
		std::mem::replace(&mut self.solution, solution)
	}
}

/// Read access to agents by ID
pub trait AgentLookup {
	/// Get an agent
	fn get_agent(&self, id: &AgentID) -> Option<&CrowdAgent>;
}

impl<A: Borrow<CrowdAgent>> AgentLookup for BTreeMap<AgentID, A> {
	fn get_agent(&self, id: &AgentID) -> Option<&CrowdAgent> {
		self.get(id).map(|a| a.borrow())
	}
}

/// Agents owned outside of the ECS, keyed by [AgentID]
#[derive(Component, Clone, Debug, Default)]
pub struct CrowdAgents {
	/// The agents
	agents: BTreeMap<AgentID, CrowdAgent>,
}

impl AgentLookup for CrowdAgents {
	fn get_agent(&self, id: &AgentID) -> Option<&CrowdAgent> {
		self.agents.get(id)
	}
}

impl CrowdAgents {
	/// Get the map of agents
	pub fn get(&self) -> &BTreeMap<AgentID, CrowdAgent> {
		&self.agents
	}
	/// Get a mutable reference to the map of agents
	pub fn get_mut(&mut self) -> &mut BTreeMap<AgentID, CrowdAgent> {
		&mut self.agents
	}
	/// Add an agent, returns any agent previously stored under the ID
	pub fn insert(&mut self, id: AgentID, agent: CrowdAgent) -> Option<CrowdAgent> {
		self.agents.insert(id, agent)
	}
	/// Remove an agent
	pub fn remove(&mut self, id: &AgentID) -> Option<CrowdAgent> {
		self.agents.remove(id)
	}
	/// Get a mutable reference to an agent
	pub fn get_agent_mut(&mut self, id: &AgentID) -> Option<&mut CrowdAgent> {
		self.agents.get_mut(id)
	}
}
