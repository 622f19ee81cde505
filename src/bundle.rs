//! Everything a world needs for crowds to move across it, spawn this and
//! then spawn entities carrying a [CrowdAgent]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The tiles of a world and the solutions being followed across them
#[derive(Bundle)]
pub struct ContinuumCrowdsBundle {
	/// Fields of every tile
	tiles: CrowdTiles,
	/// Shared eikonal solutions
	solution_cache: SolutionCache,
}

impl ContinuumCrowdsBundle {
	/// Create a new instance of [ContinuumCrowdsBundle] of level tiles without
	/// any discomfort. The world is `length` cells along `x` and `depth`
	/// cells along `y` and each must be an exact multiple of
	/// `tile_resolution`
	pub fn new(length: u32, depth: u32, tile_resolution: u32, settings: &CrowdSettings) -> Self {
		let dimensions = WorldDimensions::new(length, depth, tile_resolution);
		ContinuumCrowdsBundle::from_tiles(CrowdTiles::new(dimensions, settings), settings)
	}
	/// Create a new instance of [ContinuumCrowdsBundle] from tiles that have
	/// already been built, their speed and cost fields are (re)initiated
	pub fn from_tiles(mut tiles: CrowdTiles, settings: &CrowdSettings) -> Self {
		initiate_tiles(&mut tiles, settings);
		ContinuumCrowdsBundle {
			tiles,
			solution_cache: SolutionCache::default(),
		}
	}
	/// Create a new instance of [ContinuumCrowdsBundle] where the discomfort
	/// of each tile is read from a directory of csv files
	#[cfg(feature = "csv")]
	pub fn new_from_csv(
		length: u32,
		depth: u32,
		tile_resolution: u32,
		directory: &str,
		settings: &CrowdSettings,
	) -> Self {
		let dimensions = WorldDimensions::new(length, depth, tile_resolution);
		let tiles = CrowdTiles::from_csv_dir(dimensions, directory.to_string(), settings);
		ContinuumCrowdsBundle::from_tiles(tiles, settings)
	}
	/// Create a new instance of [ContinuumCrowdsBundle] where the height of
	/// the world is read from a greyscale image
	#[cfg(feature = "heightmap")]
	pub fn new_from_heightmap(
		length: u32,
		depth: u32,
		tile_resolution: u32,
		path: &str,
		height_scale: f32,
		settings: &CrowdSettings,
	) -> Self {
		let dimensions = WorldDimensions::new(length, depth, tile_resolution);
		let tiles = CrowdTiles::from_heightmap(dimensions, path.to_string(), height_scale, settings);
		ContinuumCrowdsBundle::from_tiles(tiles, settings)
	}
	/// Get the tiles
	pub fn get_tiles(&self) -> &CrowdTiles {
		&self.tiles
	}
	/// Get the solution cache
	pub fn get_solution_cache(&self) -> &SolutionCache {
		&self.solution_cache
	}
}
