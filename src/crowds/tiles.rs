//! A world is split into square tiles. Each [Tile] owns the per-cell fields of
//! its region, agents write density and momentum into them and the
//! aggregator derives the directional speed and cost the solver consumes
//!

use std::collections::{BTreeMap, BTreeSet};

use crate::prelude::*;
use bevy::prelude::*;

/// Unique ID of a tile, the global cell coordinate of its lowest corner
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct TileID((i32, i32));

impl TileID {
	/// Create a new instance of [TileID]
	pub fn new(x: i32, y: i32) -> Self {
		TileID((x, y))
	}
	/// Get the corner `(x, y)` tuple
	pub fn get(&self) -> (i32, i32) {
		self.0
	}
	/// Get the corner as a grid coordinate
	pub fn get_corner(&self) -> IVec2 {
		IVec2::new(self.0 .0, self.0 .1)
	}
}

/// Read access to tiles by global cell position, lets a tile look across its
/// edges into neighbouring tiles
pub trait TileLookup {
	/// Get the tile containing a global cell, `None` if no tile covers it
	fn resolve(&self, global: IVec2) -> Option<&Tile>;
}

/// A lookup with no tiles, for evaluating a tile in isolation where every
/// edge is treated as a wall
pub struct IsolatedTile;

impl TileLookup for IsolatedTile {
	fn resolve(&self, _global: IVec2) -> Option<&Tile> {
		None
	}
}

/// The region of a world covered by one set of fields
#[derive(Clone, Debug)]
pub struct Tile {
	/// Global corner
	id: TileID,
	/// Tick on which the fields were last rebuilt
	last_update_id: Option<u64>,
	/// Agents whose footprints currently touch this tile
	impacting_agents: BTreeSet<AgentID>,
	/// Density
	rho: Grid<f32>,
	/// Average velocity, holds summed momentum until derived
	v_ave: Grid<Vec2>,
	/// Height
	h: Grid<f32>,
	/// Height gradient
	dh: Grid<Vec2>,
	/// Discomfort, values `>= 1` are impassable
	g: Grid<f32>,
	/// Directional speed into each neighbour
	f: Grid<Vec4>,
	/// Directional cost into each neighbour
	c: Grid<Vec4>,
	/// Agent-free discomfort restored on each reset
	g_baseline: Grid<f32>,
	/// Agent-free speed restored on each reset
	f_baseline: Grid<Vec4>,
	/// Agent-free cost restored on each reset
	c_baseline: Grid<Vec4>,
}

impl Tile {
	/// Create a tile from its discomfort and height where the height gradient
	/// is derived. Panics if the grids differ in size or are empty
	pub fn new(id: TileID, discomfort: Grid<f32>, height: Grid<f32>, settings: &CrowdSettings) -> Self {
		let dh = grid_math::gradient(&height);
		Tile::new_with_gradient(id, discomfort, height, dh, settings)
	}
	/// Create a tile from explicit discomfort, height and height gradient.
	/// Speed and cost begin at their flat ground values until the tile is
	/// initiated. Panics if the grids differ in size or are empty
	pub fn new_with_gradient(
		id: TileID,
		discomfort: Grid<f32>,
		height: Grid<f32>,
		height_gradient: Grid<Vec2>,
		settings: &CrowdSettings,
	) -> Self {
		let (columns, rows) = discomfort.get_dimensions();
		if columns == 0 || rows == 0 {
			panic!("Tile {:?} must have at least one cell", id);
		}
		if height.get_dimensions() != (columns, rows)
			|| height_gradient.get_dimensions() != (columns, rows)
		{
			panic!(
				"Tile {:?} fields must all be sized ({}, {}), found height {:?} and gradient {:?}",
				id,
				columns,
				rows,
				height.get_dimensions(),
				height_gradient.get_dimensions()
			);
		}
		let f = Grid::new(columns, rows, Vec4::splat(settings.flat_speed()));
		let c = Grid::new(columns, rows, Vec4::splat(settings.flat_cost()));
		Tile {
			id,
			last_update_id: None,
			impacting_agents: BTreeSet::new(),
			rho: Grid::new(columns, rows, 0.0),
			v_ave: Grid::new(columns, rows, Vec2::ZERO),
			h: height,
			dh: height_gradient,
			g_baseline: discomfort.clone(),
			g: discomfort,
			f_baseline: f.clone(),
			f,
			c_baseline: c.clone(),
			c,
		}
	}
	/// Create a level tile with no discomfort
	pub fn flat(id: TileID, columns: usize, rows: usize, settings: &CrowdSettings) -> Self {
		Tile::new(
			id,
			Grid::new(columns, rows, 0.0),
			Grid::new(columns, rows, 0.0),
			settings,
		)
	}
	/// Get the tile ID
	pub fn get_id(&self) -> TileID {
		self.id
	}
	/// Get the global corner
	pub fn get_corner(&self) -> IVec2 {
		self.id.get_corner()
	}
	/// Number of columns
	pub fn get_size_x(&self) -> usize {
		self.g.get_columns()
	}
	/// Number of rows
	pub fn get_size_y(&self) -> usize {
		self.g.get_rows()
	}
	/// Get the density field
	pub fn get_density_field(&self) -> &Grid<f32> {
		&self.rho
	}
	/// Get a mutable reference to the density field
	pub fn get_density_field_mut(&mut self) -> &mut Grid<f32> {
		&mut self.rho
	}
	/// Get the average velocity field
	pub fn get_average_velocity_field(&self) -> &Grid<Vec2> {
		&self.v_ave
	}
	/// Get a mutable reference to the average velocity field
	pub fn get_average_velocity_field_mut(&mut self) -> &mut Grid<Vec2> {
		&mut self.v_ave
	}
	/// Get the height field
	pub fn get_height_field(&self) -> &Grid<f32> {
		&self.h
	}
	/// Get the height gradient field
	pub fn get_height_gradient_field(&self) -> &Grid<Vec2> {
		&self.dh
	}
	/// Get the discomfort field
	pub fn get_discomfort_field(&self) -> &Grid<f32> {
		&self.g
	}
	/// Get the directional speed field
	pub fn get_speed_field(&self) -> &Grid<Vec4> {
		&self.f
	}
	/// Get the directional cost field
	pub fn get_cost_field(&self) -> &Grid<Vec4> {
		&self.c
	}
	/// Replace the directional speed field. Panics on a size mismatch
	pub fn set_speed_field(&mut self, speed: Grid<Vec4>) {
		self.check_dimensions(speed.get_dimensions());
		self.f = speed;
	}
	/// Replace the directional cost field. Panics on a size mismatch
	pub fn set_cost_field(&mut self, cost: Grid<Vec4>) {
		self.check_dimensions(cost.get_dimensions());
		self.c = cost;
	}
	/// Change the discomfort of a cell, both live and baseline. The speed and
	/// cost baselines become stale until the tile is initiated again
	pub fn set_discomfort(&mut self, value: f32, field_cell: FieldCell) {
		self.g.set_field_cell_value(value, field_cell);
		self.g_baseline.set_field_cell_value(value, field_cell);
	}
	/// Panics if `dimensions` don't match the tile
	fn check_dimensions(&self, dimensions: (usize, usize)) {
		if dimensions != self.g.get_dimensions() {
			panic!(
				"Tile {:?} is sized {:?}, cannot accept a field sized {:?}",
				self.id,
				self.g.get_dimensions(),
				dimensions
			);
		}
	}
	/// Snapshot the current discomfort, speed and cost as the agent-free
	/// baseline
	pub fn store_baseline_fields(&mut self) {
		self.g_baseline = self.g.clone();
		self.f_baseline = self.f.clone();
		self.c_baseline = self.c.clone();
	}
	/// Clear density and momentum and restore the baseline fields
	pub fn reset_to_baseline(&mut self) {
		for v in self.rho.values_mut() {
			*v = 0.0;
		}
		for v in self.v_ave.values_mut() {
			*v = Vec2::ZERO;
		}
		self.g.clone_from(&self.g_baseline);
		self.f.clone_from(&self.f_baseline);
		self.c.clone_from(&self.c_baseline);
	}
	/// Tick on which the fields were last rebuilt
	pub fn get_last_update_id(&self) -> Option<u64> {
		self.last_update_id
	}
	/// Whether the fields still need rebuilding for `tick`
	pub fn should_update(&self, tick: u64) -> bool {
		self.last_update_id != Some(tick)
	}
	/// Record that the fields have been rebuilt for `tick`
	pub fn mark_complete(&mut self, tick: u64) {
		self.last_update_id = Some(tick);
	}
	/// Get the agents whose footprints touch this tile
	pub fn get_impacting_agents(&self) -> &BTreeSet<AgentID> {
		&self.impacting_agents
	}
	/// Register an agent as touching this tile, returns `true` if it is new
	pub fn subscribe_agent(&mut self, agent: AgentID) -> bool {
		self.impacting_agents.insert(agent)
	}
	/// Remove an agent from the tile, returns `true` if it was present
	pub fn unsubscribe_agent(&mut self, agent: AgentID) -> bool {
		self.impacting_agents.remove(&agent)
	}
	/// Convert a global cell into a local one (may fall outside the tile)
	pub fn local_from_global(&self, global: IVec2) -> IVec2 {
		global - self.get_corner()
	}
	/// Convert a local cell into a global one
	pub fn global_from_local(&self, local: IVec2) -> IVec2 {
		local + self.get_corner()
	}
	/// Whether a local cell is inside the tile
	pub fn contains_local_point(&self, local: IVec2) -> bool {
		self.g.contains(local.x, local.y)
	}
	/// Whether a global cell is inside the tile
	pub fn contains_global_point(&self, global: IVec2) -> bool {
		self.contains_local_point(self.local_from_global(global))
	}
	/// [FieldCell] of a global cell when it is inside the tile
	pub fn field_cell_from_global(&self, global: IVec2) -> Option<FieldCell> {
		let local = self.local_from_global(global);
		self.g.field_cell(local.x, local.y)
	}
	/// A local cell is valid when it is inside the tile and passable
	pub fn is_local_point_valid(&self, local: IVec2) -> bool {
		match self.g.try_get(local.x, local.y) {
			Some(g) => *g < 1.0,
			None => false,
		}
	}
}

/// The size of the world and how it is split into tiles
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub struct WorldDimensions {
	/// `(x, y)` number of cells across the world
	size: (u32, u32),
	/// Length of a (square) tile in cells. The world size must be perfectly
	/// divisible by it
	tile_resolution: u32,
}

impl WorldDimensions {
	/// Create a new instance of [WorldDimensions]. Panics if the world cannot
	/// be split evenly into tiles
	pub fn new(length: u32, depth: u32, tile_resolution: u32) -> Self {
		if tile_resolution == 0 {
			panic!("Tile resolution must be at least 1");
		}
		let length_rem = length % tile_resolution;
		let depth_rem = depth % tile_resolution;
		if length_rem > 0 || depth_rem > 0 {
			panic!(
				"World dimensions `({}, {})` cannot support tiles, dimensions must be exact factors of {}",
				length, depth, tile_resolution
			);
		}
		WorldDimensions {
			size: (length, depth),
			tile_resolution,
		}
	}
	/// Number of cells along `x`
	pub fn get_length(&self) -> u32 {
		self.size.0
	}
	/// Number of cells along `y`
	pub fn get_depth(&self) -> u32 {
		self.size.1
	}
	/// Length of a tile in cells
	pub fn get_tile_resolution(&self) -> u32 {
		self.tile_resolution
	}
	/// Number of tiles along `(x, y)`
	pub fn get_tile_counts(&self) -> (u32, u32) {
		(
			self.get_length() / self.tile_resolution,
			self.get_depth() / self.tile_resolution,
		)
	}
	/// ID of the tile containing a global cell, `None` outside the world
	pub fn get_tile_id(&self, global: IVec2) -> Option<TileID> {
		if global.x < 0
			|| global.y < 0
			|| global.x >= self.get_length() as i32
			|| global.y >= self.get_depth() as i32
		{
			return None;
		}
		let resolution = self.tile_resolution as i32;
		Some(TileID::new(
			global.x.div_euclid(resolution) * resolution,
			global.y.div_euclid(resolution) * resolution,
		))
	}
	/// Every tile ID in the world
	pub fn get_tile_ids(&self) -> Vec<TileID> {
		let (columns, rows) = self.get_tile_counts();
		let resolution = self.tile_resolution as i32;
		let mut ids = Vec::with_capacity((columns * rows) as usize);
		for column in 0..columns as i32 {
			for row in 0..rows as i32 {
				ids.push(TileID::new(column * resolution, row * resolution));
			}
		}
		ids
	}
}

/// Every [Tile] of a world, keyed by [TileID]
#[derive(Component, Clone, Debug)]
pub struct CrowdTiles {
	/// Size of the world
	dimensions: WorldDimensions,
	/// The tiles
	tiles: BTreeMap<TileID, Tile>,
	/// Tiles whose fields need rebuilding on the next tick
	dirty: BTreeSet<TileID>,
}

impl TileLookup for CrowdTiles {
	fn resolve(&self, global: IVec2) -> Option<&Tile> {
		self.dimensions
			.get_tile_id(global)
			.and_then(|id| self.tiles.get(&id))
	}
}

impl CrowdTiles {
	/// Create level tiles with no discomfort covering the world
	pub fn new(dimensions: WorldDimensions, settings: &CrowdSettings) -> Self {
		let resolution = dimensions.get_tile_resolution() as usize;
		let mut tiles = BTreeMap::new();
		for id in dimensions.get_tile_ids() {
			tiles.insert(id, Tile::flat(id, resolution, resolution, settings));
		}
		CrowdTiles {
			dimensions,
			tiles,
			dirty: BTreeSet::new(),
		}
	}
	/// Create the tiles from global discomfort and height grids spanning the
	/// whole world. Panics if the grids don't match the dimensions
	pub fn from_world_fields(
		dimensions: WorldDimensions,
		discomfort: &Grid<f32>,
		height: &Grid<f32>,
		settings: &CrowdSettings,
	) -> Self {
		let expected = (
			dimensions.get_length() as usize,
			dimensions.get_depth() as usize,
		);
		if discomfort.get_dimensions() != expected || height.get_dimensions() != expected {
			panic!(
				"World fields must be sized {:?}, found discomfort {:?} and height {:?}",
				expected,
				discomfort.get_dimensions(),
				height.get_dimensions()
			);
		}
		// the gradient is taken across the whole world so tile edges agree
		let dh = grid_math::gradient(height);
		let resolution = dimensions.get_tile_resolution() as usize;
		let mut tiles = BTreeMap::new();
		for id in dimensions.get_tile_ids() {
			let corner = id.get_corner();
			let slice = |cell: FieldCell| {
				FieldCell::new(
					corner.x as usize + cell.get_column(),
					corner.y as usize + cell.get_row(),
				)
			};
			let tile = Tile::new_with_gradient(
				id,
				Grid::from_fn(resolution, resolution, |c| discomfort[slice(c)]),
				Grid::from_fn(resolution, resolution, |c| height[slice(c)]),
				Grid::from_fn(resolution, resolution, |c| dh[slice(c)]),
				settings,
			);
			tiles.insert(id, tile);
		}
		CrowdTiles {
			dimensions,
			tiles,
			dirty: BTreeSet::new(),
		}
	}
	/// Get the world dimensions
	pub fn get_dimensions(&self) -> &WorldDimensions {
		&self.dimensions
	}
	/// Get the map of tiles
	pub fn get(&self) -> &BTreeMap<TileID, Tile> {
		&self.tiles
	}
	/// Get a tile
	pub fn get_tile(&self, id: &TileID) -> Option<&Tile> {
		self.tiles.get(id)
	}
	/// Get a mutable reference to a tile
	pub fn get_tile_mut(&mut self, id: &TileID) -> Option<&mut Tile> {
		self.tiles.get_mut(id)
	}
	/// IDs of tiles overlapping the inclusive global cell rectangle
	/// `min..=max`, clipped to the world
	pub fn get_tiles_overlapping(&self, min: IVec2, max: IVec2) -> Vec<TileID> {
		let resolution = self.dimensions.get_tile_resolution() as i32;
		let upper = IVec2::new(
			self.dimensions.get_length() as i32 - 1,
			self.dimensions.get_depth() as i32 - 1,
		);
		let min = min.max(IVec2::ZERO);
		let max = max.min(upper);
		let mut ids = Vec::new();
		if min.x > max.x || min.y > max.y {
			return ids;
		}
		let mut x = min.x.div_euclid(resolution) * resolution;
		while x <= max.x {
			let mut y = min.y.div_euclid(resolution) * resolution;
			while y <= max.y {
				ids.push(TileID::new(x, y));
				y += resolution;
			}
			x += resolution;
		}
		ids
	}
	/// IDs of the tiles sharing an edge with `id`
	pub fn get_adjacent_tiles(&self, id: &TileID) -> Vec<TileID> {
		let resolution = self.dimensions.get_tile_resolution() as i32;
		Cardinal::ALL
			.iter()
			.map(|dir| id.get_corner() + dir.to_ivec2() * resolution)
			.filter_map(|corner| self.dimensions.get_tile_id(corner))
			.collect()
	}
	/// Flag a tile, and the tiles around it whose edge speeds read its
	/// density, for rebuilding
	pub fn mark_dirty(&mut self, id: TileID) {
		if self.tiles.contains_key(&id) {
			let adjacent = self.get_adjacent_tiles(&id);
			self.dirty.insert(id);
			self.dirty.extend(adjacent);
		}
	}
	/// Whether a tile is waiting to be rebuilt
	pub fn is_dirty(&self, id: &TileID) -> bool {
		self.dirty.contains(id)
	}
	/// Take the set of tiles waiting to be rebuilt
	pub fn take_dirty(&mut self) -> Vec<TileID> {
		std::mem::take(&mut self.dirty).into_iter().collect()
	}
	/// Change the discomfort of a global cell, returns `false` if no tile
	/// covers it
	pub fn set_discomfort(&mut self, global: IVec2, value: f32) -> bool {
		let Some(id) = self.dimensions.get_tile_id(global) else {
			return false;
		};
		let Some(tile) = self.tiles.get_mut(&id) else {
			return false;
		};
		let Some(cell) = tile.field_cell_from_global(global) else {
			return false;
		};
		tile.set_discomfort(value, cell);
		true
	}
	/// From a directory containing a series of `{column}_{row}.csv` discomfort
	/// files, one per tile, generate level [CrowdTiles]. The first line of a
	/// file is the top row (highest `y`) of the tile
	#[cfg(feature = "csv")]
	pub fn from_csv_dir(
		dimensions: WorldDimensions,
		directory: String,
		settings: &CrowdSettings,
	) -> Self {
		let (columns, rows) = dimensions.get_tile_counts();
		let required_files_count = (columns * rows) as usize;
		let resolution = dimensions.get_tile_resolution() as i32;
		let files = std::fs::read_dir(directory)
			.expect("Unable to read csv directory")
			.map(|res| res.map(|e| e.path()))
			.collect::<Result<Vec<_>, std::io::Error>>()
			.expect("Failed to filter for CSV files");
		let mut crowd_tiles = CrowdTiles::new(dimensions, settings);
		let mut found = 0;
		for path in files {
			if path.extension().is_none_or(|ext| ext != "csv") {
				continue;
			}
			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.expect("CSV file name is not valid unicode");
			let (column, row) = name
				.split_once('_')
				.expect("CSV file name must be `{column}_{row}.csv`");
			let id = TileID::new(
				column
					.parse::<i32>()
					.expect("Failed to parse tile column from csv file name")
					* resolution,
				row.parse::<i32>()
					.expect("Failed to parse tile row from csv file name")
					* resolution,
			);
			let mut reader = csv::ReaderBuilder::new()
				.has_headers(false)
				.from_path(&path)
				.expect("Failed to open csv");
			let mut lines = Vec::new();
			for record in reader.deserialize() {
				let line: Vec<f32> = record.expect("Failed to parse csv record");
				lines.push(line);
			}
			// files are written top row first
			lines.reverse();
			let discomfort = Grid::from_rows(lines);
			let tile = crowd_tiles
				.tiles
				.get_mut(&id)
				.unwrap_or_else(|| panic!("CSV {:?} does not map onto a tile", path));
			let height = tile.get_height_field().clone();
			*tile = Tile::new(id, discomfort, height, settings);
			found += 1;
		}
		if found != required_files_count {
			panic!("Found {} CSVs, expected {}", found, required_files_count);
		}
		crowd_tiles
	}
	/// From a greyscale heightmap (one pixel per world cell, top row of the
	/// image is the highest `y`) generate [CrowdTiles] whose height is the
	/// pixel luminance scaled into `0..=height_scale`
	#[cfg(feature = "heightmap")]
	pub fn from_heightmap(
		dimensions: WorldDimensions,
		path: String,
		height_scale: f32,
		settings: &CrowdSettings,
	) -> Self {
		use photon_rs::native::open_image;
		let img = open_image(&path).expect("Failed to open heightmap");
		let img_width = img.get_width();
		let img_height = img.get_height();
		if img_width != dimensions.get_length() || img_height != dimensions.get_depth() {
			panic!(
				"Heightmap must be {}x{} pixels, found {}x{}",
				dimensions.get_length(),
				dimensions.get_depth(),
				img_width,
				img_height
			);
		}
		// raw pixels are arranged from the top left of the image and come in
		// sets of either 3 or 4 (if alpha channel is included)
		let raw_pixels = img.get_raw_pixels();
		let chunk_size = if (img_width * img_height * 4) as usize == raw_pixels.len() {
			4
		} else {
			3
		};
		let luminance: Vec<f32> = raw_pixels
			.chunks(chunk_size)
			.map(|rgb| (rgb[0] as f32 + rgb[1] as f32 + rgb[2] as f32) / (3.0 * 255.0))
			.collect();
		let width = img_width as usize;
		let depth = img_height as usize;
		let height = Grid::from_fn(width, depth, |cell| {
			let image_row = depth - 1 - cell.get_row();
			luminance[image_row * width + cell.get_column()] * height_scale
		});
		let discomfort = Grid::new(width, depth, 0.0);
		CrowdTiles::from_world_fields(dimensions, &discomfort, &height, settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tile_starts_flat() {
		let settings = CrowdSettings::default();
		let tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		let result = tile.get_speed_field()[FieldCell::new(1, 1)];
		let actual = Vec4::splat(10.0);
		assert_eq!(actual, result);
		let cost = tile.get_cost_field()[FieldCell::new(1, 1)];
		assert!((cost - Vec4::splat(1.1)).abs().max_element() < 1e-6);
	}
	#[test]
	#[should_panic]
	fn tile_mismatched_fields() {
		let settings = CrowdSettings::default();
		Tile::new(
			TileID::new(0, 0),
			Grid::new(3, 3, 0.0),
			Grid::new(3, 2, 0.0),
			&settings,
		);
	}
	#[test]
	fn tile_update_ids() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 2, 2, &settings);
		assert!(tile.should_update(1));
		tile.mark_complete(1);
		assert!(!tile.should_update(1));
		assert!(tile.should_update(2));
	}
	#[test]
	fn tile_reset_restores_baseline() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(5, 5), 2, 2, &settings);
		let cell = FieldCell::new(1, 0);
		tile.get_density_field_mut()[cell] = 3.0;
		tile.get_average_velocity_field_mut()[cell] = Vec2::ONE;
		tile.set_speed_field(Grid::new(2, 2, Vec4::ZERO));
		tile.reset_to_baseline();
		assert_eq!(0.0, tile.get_density_field()[cell]);
		assert_eq!(Vec2::ZERO, tile.get_average_velocity_field()[cell]);
		assert_eq!(Vec4::splat(10.0), tile.get_speed_field()[cell]);
	}
	#[test]
	fn tile_global_points() {
		let settings = CrowdSettings::default();
		let tile = Tile::flat(TileID::new(10, 20), 5, 5, &settings);
		assert!(tile.contains_global_point(IVec2::new(14, 24)));
		assert!(!tile.contains_global_point(IVec2::new(15, 24)));
		let result = tile.field_cell_from_global(IVec2::new(12, 21));
		let actual = Some(FieldCell::new(2, 1));
		assert_eq!(actual, result);
	}
	#[test]
	fn tile_validity_uses_discomfort() {
		let settings = CrowdSettings::default();
		let mut tile = Tile::flat(TileID::new(0, 0), 3, 3, &settings);
		tile.set_discomfort(1.0, FieldCell::new(1, 1));
		assert!(!tile.is_local_point_valid(IVec2::new(1, 1)));
		assert!(tile.is_local_point_valid(IVec2::new(0, 1)));
		assert!(!tile.is_local_point_valid(IVec2::new(-1, 1)));
	}
	#[test]
	#[should_panic]
	fn world_not_divisible() {
		WorldDimensions::new(10, 12, 5);
	}
	#[test]
	fn world_tile_hashing() {
		let dimensions = WorldDimensions::new(20, 10, 5);
		let result = dimensions.get_tile_id(IVec2::new(12, 9));
		let actual = Some(TileID::new(10, 5));
		assert_eq!(actual, result);
		assert_eq!(None, dimensions.get_tile_id(IVec2::new(-1, 0)));
		assert_eq!(None, dimensions.get_tile_id(IVec2::new(20, 0)));
	}
	#[test]
	fn crowd_tiles_resolve_across_tiles() {
		let settings = CrowdSettings::default();
		let tiles = CrowdTiles::new(WorldDimensions::new(10, 5, 5), &settings);
		let result = tiles.resolve(IVec2::new(5, 0)).map(|t| t.get_id());
		let actual = Some(TileID::new(5, 0));
		assert_eq!(actual, result);
		assert!(tiles.resolve(IVec2::new(10, 0)).is_none());
	}
	#[test]
	fn overlapping_tiles() {
		let settings = CrowdSettings::default();
		let tiles = CrowdTiles::new(WorldDimensions::new(10, 10, 5), &settings);
		let result = tiles.get_tiles_overlapping(IVec2::new(3, -2), IVec2::new(6, 3));
		let actual = vec![TileID::new(0, 0), TileID::new(5, 0)];
		assert_eq!(actual, result);
	}
	#[test]
	fn mark_dirty_spreads_to_adjacent() {
		let settings = CrowdSettings::default();
		let mut tiles = CrowdTiles::new(WorldDimensions::new(15, 5, 5), &settings);
		tiles.mark_dirty(TileID::new(5, 0));
		let result = tiles.take_dirty();
		let actual = vec![TileID::new(0, 0), TileID::new(5, 0), TileID::new(10, 0)];
		assert_eq!(actual, result);
		assert!(tiles.take_dirty().is_empty());
	}
	#[test]
	fn world_fields_are_sliced() {
		let settings = CrowdSettings::default();
		let dimensions = WorldDimensions::new(4, 2, 2);
		let discomfort = Grid::from_fn(4, 2, |c| if c.get_column() == 3 { 1.0 } else { 0.0 });
		let height = Grid::from_fn(4, 2, |c| 0.5 * c.get_column() as f32);
		let tiles = CrowdTiles::from_world_fields(dimensions, &discomfort, &height, &settings);
		let tile = tiles.get_tile(&TileID::new(2, 0)).unwrap();
		assert_eq!(1.0, tile.get_discomfort_field()[FieldCell::new(1, 0)]);
		assert_eq!(1.0, tile.get_height_field()[FieldCell::new(0, 1)]);
		// centred across the tile edge, one-sided at the world edge
		assert_eq!(Vec2::new(0.5, 0.0), tile.get_height_gradient_field()[FieldCell::new(0, 1)]);
		assert_eq!(Vec2::new(0.5, 0.0), tile.get_height_gradient_field()[FieldCell::new(1, 1)]);
	}
	#[test]
	#[cfg(feature = "csv")]
	fn crowd_tiles_from_csv() {
		let settings = CrowdSettings::default();
		let dimensions = WorldDimensions::new(10, 5, 5);
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/csv/discomfort/";
		let tiles = CrowdTiles::from_csv_dir(dimensions, path, &settings);
		let tile = tiles.get_tile(&TileID::new(5, 0)).unwrap();
		// bottom right wall of the second tile
		assert_eq!(1.0, tile.get_discomfort_field()[FieldCell::new(4, 0)]);
		assert_eq!(0.5, tile.get_discomfort_field()[FieldCell::new(0, 4)]);
	}
	#[test]
	#[cfg(feature = "heightmap")]
	fn crowd_tiles_from_heightmap() {
		let settings = CrowdSettings::default();
		let dimensions = WorldDimensions::new(10, 10, 5);
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/heightmap.png";
		let tiles = CrowdTiles::from_heightmap(dimensions, path, 10.0, &settings);
		let tile = tiles.get_tile(&TileID::new(0, 0)).unwrap();
		// the image brightens from left to right
		let left = tile.get_height_field()[FieldCell::new(0, 0)];
		let right = tile.get_height_field()[FieldCell::new(4, 0)];
		assert!(right > left);
		assert!(tile.get_height_gradient_field()[FieldCell::new(2, 2)].x > 0.0);
	}
}
