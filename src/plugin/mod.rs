//! Defines the Bevy [Plugin] for Continuum Crowds
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod field_layer;
pub mod solver_layer;

/// Order in which the crowd systems run each `Update`
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Drop stale solutions
	Tidy,
	/// Stamp agents and rebuild tile fields
	Fields,
	/// Solve the potentials of requested goals
	Solve,
	/// Hand solved velocities to agents
	Steer,
}

/// Drives crowd fields, solutions and steering for every entity carrying
/// [CrowdTiles] and [SolutionCache] (see [crate::bundle::ContinuumCrowdsBundle])
/// and every entity carrying a [CrowdAgent]
pub struct ContinuumCrowdsPlugin;

impl Plugin for ContinuumCrowdsPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		if let Some(settings) = app.world().get_resource::<CrowdSettings>() {
			settings.validate();
		}
		app.register_type::<Cardinal>()
			.register_type::<CrowdSettings>()
			.register_type::<DensityCombine>()
			.register_type::<TileID>()
			.register_type::<FieldCell>()
			.register_type::<AgentID>()
			.register_type::<WorldDimensions>()
			.register_type::<SolutionMetadata>()
			.init_resource::<CrowdSettings>()
			.init_resource::<field_layer::TickCounter>()
			.add_event::<field_layer::EventUpdateDiscomfortCell>()
			.add_event::<field_layer::EventTileDirty>()
			.add_event::<solver_layer::EventSolveRequest>()
			.configure_sets(
				Update,
				(
					OrderingSet::Tidy,
					OrderingSet::Fields,
					OrderingSet::Solve,
					OrderingSet::Steer,
				)
					.chain(),
			)
			.add_systems(
				Update,
				(
					solver_layer::cleanup_old_solutions.in_set(OrderingSet::Tidy),
					(
						field_layer::advance_tick,
						field_layer::process_discomfort_updates,
						field_layer::process_dirty_tiles,
						field_layer::track_agent_footprints,
						field_layer::update_dirty_tiles,
					)
						.chain()
						.in_set(OrderingSet::Fields),
					(
						solver_layer::event_subscribe_solutions,
						solver_layer::solve_due_solutions,
					)
						.chain()
						.in_set(OrderingSet::Solve),
					solver_layer::steer_agents.in_set(OrderingSet::Steer),
				),
			);
	}
}
