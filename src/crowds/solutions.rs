//! Agents heading for the same goal in the same tile share one eikonal
//! solution. The [SolutionCache] keeps every requested solution alongside the
//! agents following it, knows when each is due to be solved again and drops
//! the ones nobody has followed for a while
//!

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::prelude::*;
use bevy::prelude::*;

/// Identifies a solution by the tile solved and its goal region
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub struct SolutionMetadata {
	/// The tile solved
	tile_id: TileID,
	/// Global goal cells, sorted and deduplicated so equal regions compare
	/// equal
	goals: Vec<(i32, i32)>,
}

impl SolutionMetadata {
	/// Create a new instance of [SolutionMetadata]
	pub fn new(tile_id: TileID, goals: &[IVec2]) -> Self {
		let mut goals: Vec<(i32, i32)> = goals.iter().map(|g| (g.x, g.y)).collect();
		goals.sort();
		goals.dedup();
		SolutionMetadata { tile_id, goals }
	}
	/// Get the tile solved
	pub fn get_tile_id(&self) -> TileID {
		self.tile_id
	}
	/// Get the global goal cells
	pub fn get_goals(&self) -> Vec<IVec2> {
		self.goals.iter().map(|(x, y)| IVec2::new(*x, *y)).collect()
	}
}

/// A shared solution and the agents following it
#[derive(Clone, Debug, Default)]
pub struct Solution {
	/// The latest solve, `None` until first solved
	eikonal: Option<EikonalSolution>,
	/// Agents following the solution
	subscribers: BTreeSet<AgentID>,
	/// Elapsed time of the latest solve
	last_solved: Option<Duration>,
	/// Elapsed time at which the last subscriber left
	idle_since: Option<Duration>,
}

impl Solution {
	/// Get the latest solve
	pub fn get_eikonal(&self) -> Option<&EikonalSolution> {
		self.eikonal.as_ref()
	}
	/// Get the agents following the solution
	pub fn get_subscribers(&self) -> &BTreeSet<AgentID> {
		&self.subscribers
	}
	/// Elapsed time of the latest solve
	pub fn get_last_solved(&self) -> Option<Duration> {
		self.last_solved
	}
	/// Velocity at a global position, `None` until first solved
	pub fn sample_velocity(&self, position: Vec2) -> Option<Vec2> {
		self.eikonal.as_ref().map(|e| e.sample_velocity(position))
	}
	/// Whether the solution needs solving at elapsed time `now`
	pub fn is_due(&self, now: Duration, refresh: Duration) -> bool {
		match self.last_solved {
			None => true,
			Some(solved) => now.saturating_sub(solved) >= refresh,
		}
	}
}

/// Every solution agents have asked for
#[derive(Component, Clone, Debug, Default)]
pub struct SolutionCache {
	/// Solutions keyed by tile and goal region
	solutions: BTreeMap<SolutionMetadata, Solution>,
}

impl SolutionCache {
	/// Get the map of solutions
	pub fn get(&self) -> &BTreeMap<SolutionMetadata, Solution> {
		&self.solutions
	}
	/// Get a solution
	pub fn get_solution(&self, metadata: &SolutionMetadata) -> Option<&Solution> {
		self.solutions.get(metadata)
	}
	/// Have an agent follow a solution, creating an unsolved entry if the
	/// solution hasn't been asked for before
	pub fn subscribe(&mut self, metadata: SolutionMetadata, agent: AgentID) {
		let solution = self.solutions.entry(metadata).or_default();
		solution.subscribers.insert(agent);
		solution.idle_since = None;
	}
	/// Stop an agent following a solution
	pub fn unsubscribe(&mut self, metadata: &SolutionMetadata, agent: AgentID, now: Duration) {
		if let Some(solution) = self.solutions.get_mut(metadata) {
			if solution.subscribers.remove(&agent) && solution.subscribers.is_empty() {
				solution.idle_since = Some(now);
			}
		}
	}
	/// Stop an agent following any solution, used when the agent is removed
	pub fn unsubscribe_everywhere(&mut self, agent: AgentID, now: Duration) {
		for solution in self.solutions.values_mut() {
			if solution.subscribers.remove(&agent) && solution.subscribers.is_empty() {
				solution.idle_since = Some(now);
			}
		}
	}
	/// Solutions that have never been solved or whose last solve is at least
	/// `refresh` old
	pub fn get_due(&self, now: Duration, refresh: Duration) -> Vec<SolutionMetadata> {
		self.solutions
			.iter()
			.filter(|(_, s)| s.is_due(now, refresh))
			.map(|(m, _)| m.clone())
			.collect()
	}
	/// Store a fresh solve
	pub fn insert_eikonal(&mut self, metadata: &SolutionMetadata, eikonal: EikonalSolution, now: Duration) {
		if let Some(solution) = self.solutions.get_mut(metadata) {
			solution.eikonal = Some(eikonal);
			solution.last_solved = Some(now);
		}
	}
	/// Drop solutions that have had no subscribers for longer than
	/// `lifetime`, returns how many were removed
	pub fn remove_stale(&mut self, now: Duration, lifetime: Duration) -> usize {
		let before = self.solutions.len();
		self.solutions.retain(|_, s| match s.idle_since {
			Some(idle) => s.subscribers.is_empty() && now.saturating_sub(idle) <= lifetime,
			None => true,
		});
		before - self.solutions.len()
	}
}
