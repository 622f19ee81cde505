//! Run the plugin inside a headless App
//!

use bevy::prelude::*;
use bevy_continuum_crowds_plugin::prelude::*;

fn setup_app() -> App {
	let mut app = App::new();
	app.init_resource::<Time>();
	app.add_plugins(ContinuumCrowdsPlugin);
	let settings = CrowdSettings::default();
	app.world_mut()
		.spawn(ContinuumCrowdsBundle::new(10, 10, 10, &settings));
	app
}

fn spawn_agent(app: &mut App, position: Vec2) -> Entity {
	let settings = CrowdSettings::default();
	app.world_mut()
		.spawn(CrowdAgent::new(position, Vec2::ZERO, 0.0, Vec2::ZERO, 1.0, &settings))
		.id()
}

#[test]
fn agent_is_steered_to_goal() {
	let mut app = setup_app();
	let agent = spawn_agent(&mut app, Vec2::new(1.0, 1.0));
	app.world_mut().send_event(EventSolveRequest::new(
		agent,
		TileID::new(0, 0),
		vec![IVec2::new(8, 8)],
	));
	app.update();
	app.update();
	let crowd_agent = app.world().get::<CrowdAgent>(agent).unwrap();
	let desired = crowd_agent.get_desired_velocity();
	assert!(desired.x > 0.0 && desired.y > 0.0);
	let tile_ids = crowd_agent.get_impacted_tiles().to_vec();
	assert_eq!(vec![TileID::new(0, 0)], tile_ids);

	let mut q_tiles = app.world_mut().query::<&CrowdTiles>();
	let tiles = q_tiles.iter(app.world()).next().unwrap();
	let tile = tiles.get_tile(&TileID::new(0, 0)).unwrap();
	assert_eq!(1.0, tile.get_density_field()[FieldCell::new(1, 1)]);
}

#[test]
fn discomfort_event_blocks_cell() {
	let mut app = setup_app();
	app.world_mut()
		.send_event(EventUpdateDiscomfortCell::new(IVec2::new(5, 5), 1.0));
	app.update();
	let mut q_tiles = app.world_mut().query::<&CrowdTiles>();
	let tiles = q_tiles.iter(app.world()).next().unwrap();
	let tile = tiles.get_tile(&TileID::new(0, 0)).unwrap();
	assert_eq!(1.0, tile.get_discomfort_field()[FieldCell::new(5, 5)]);
	let into_block = tile.get_cost_field()[FieldCell::new(4, 5)][Cardinal::East.index()];
	assert!(into_block.is_infinite());
}

#[test]
fn despawned_agent_leaves_everything() {
	let mut app = setup_app();
	let agent = spawn_agent(&mut app, Vec2::new(2.0, 2.0));
	app.world_mut().send_event(EventSolveRequest::new(
		agent,
		TileID::new(0, 0),
		vec![IVec2::new(8, 8)],
	));
	app.update();
	app.world_mut().despawn(agent);
	app.update();

	let mut q_tiles = app.world_mut().query::<&CrowdTiles>();
	let tiles = q_tiles.iter(app.world()).next().unwrap();
	let tile = tiles.get_tile(&TileID::new(0, 0)).unwrap();
	assert!(tile.get_impacting_agents().is_empty());
	assert_eq!(0.0, tile.get_density_field()[FieldCell::new(2, 2)]);

	let mut q_cache = app.world_mut().query::<&SolutionCache>();
	let cache = q_cache.iter(app.world()).next().unwrap();
	assert!(cache
		.get()
		.values()
		.all(|solution| solution.get_subscribers().is_empty()));
}
