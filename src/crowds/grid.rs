//! A dense 2d array of cell values, the storage behind every per-cell field
//! of a tile and of an eikonal solution
//!

use std::ops::{Index, IndexMut};

use bevy::prelude::*;

/// Defines required access to field arrays
pub trait Field<T> {
	/// Get a reference to the field array, column-major
	fn get(&self) -> &[T];
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> T;
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: T, field_cell: FieldCell);
}

/// ID of a cell within a field, local to the tile or grid that owns it
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct FieldCell((usize, usize));

impl FieldCell {
	/// Create a new instance of [FieldCell]
	pub fn new(column: usize, row: usize) -> Self {
		FieldCell((column, row))
	}
	/// Get the cell `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the cell column
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the cell row
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
	/// The cell as a signed grid coordinate
	pub fn as_ivec2(&self) -> IVec2 {
		IVec2::new(self.get_column() as i32, self.get_row() as i32)
	}
	/// The cell as a point in grid space
	pub fn as_vec2(&self) -> Vec2 {
		Vec2::new(self.get_column() as f32, self.get_row() as f32)
	}
}

/// A `columns x rows` array stored column-major
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid<T> {
	/// Number of columns (`x` extent)
	columns: usize,
	/// Number of rows (`y` extent)
	rows: usize,
	/// Values, `data[column * rows + row]`
	data: Vec<T>,
}

impl<T: Clone> Grid<T> {
	/// Create a grid with every cell set to `value`
	pub fn new(columns: usize, rows: usize, value: T) -> Self {
		Grid {
			columns,
			rows,
			data: vec![value; columns * rows],
		}
	}
}

impl<T> Grid<T> {
	/// Create a grid by evaluating `f` for each cell
	pub fn from_fn(columns: usize, rows: usize, mut f: impl FnMut(FieldCell) -> T) -> Self {
		let mut data = Vec::with_capacity(columns * rows);
		for column in 0..columns {
			for row in 0..rows {
				data.push(f(FieldCell::new(column, row)));
			}
		}
		Grid {
			columns,
			rows,
			data,
		}
	}
	/// Create a grid from rows of values where `rows[y][x]` is the value of
	/// cell `(x, y)`. Panics if the rows are ragged
	pub fn from_rows(rows: Vec<Vec<T>>) -> Self
	where
		T: Clone,
	{
		let depth = rows.len();
		let length = rows.first().map_or(0, |r| r.len());
		if rows.iter().any(|r| r.len() != length) {
			panic!("Grid rows must all have a length of {}", length);
		}
		Grid::from_fn(length, depth, |cell| {
			rows[cell.get_row()][cell.get_column()].clone()
		})
	}
	/// Number of columns
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	/// Number of rows
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	/// `(columns, rows)`
	pub fn get_dimensions(&self) -> (usize, usize) {
		(self.columns, self.rows)
	}
	/// Whether the grid holds no cells
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
	/// Whether a signed coordinate lies inside the grid
	pub fn contains(&self, column: i32, row: i32) -> bool {
		column >= 0 && row >= 0 && (column as usize) < self.columns && (row as usize) < self.rows
	}
	/// Convert a signed coordinate into a [FieldCell] if it is inside the grid
	pub fn field_cell(&self, column: i32, row: i32) -> Option<FieldCell> {
		if self.contains(column, row) {
			Some(FieldCell::new(column as usize, row as usize))
		} else {
			None
		}
	}
	/// Get a reference to a value from a signed coordinate, `None` when outside
	pub fn try_get(&self, column: i32, row: i32) -> Option<&T> {
		self.field_cell(column, row).map(|cell| &self[cell])
	}
	/// Iterate over every cell alongside its value, column-major
	pub fn iter(&self) -> impl Iterator<Item = (FieldCell, &T)> {
		let rows = self.rows.max(1);
		self.data
			.iter()
			.enumerate()
			.map(move |(i, v)| (FieldCell::new(i / rows, i % rows), v))
	}
	/// Mutably iterate over every cell alongside its value, column-major
	pub fn iter_mut(&mut self) -> impl Iterator<Item = (FieldCell, &mut T)> {
		let rows = self.rows.max(1);
		self.data
			.iter_mut()
			.enumerate()
			.map(move |(i, v)| (FieldCell::new(i / rows, i % rows), v))
	}
	/// Mutably iterate over every value
	pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
		self.data.iter_mut()
	}
	/// Create a new grid of the same dimensions by mapping every value
	pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid<U> {
		Grid {
			columns: self.columns,
			rows: self.rows,
			data: self.data.iter().map(f).collect(),
		}
	}
	/// Position of a cell within the backing array. Panics when out of bounds
	fn offset(&self, field_cell: FieldCell) -> usize {
		let (column, row) = field_cell.get_column_row();
		if column >= self.columns || row >= self.rows {
			panic!(
				"{:?} is outside of a grid sized ({}, {})",
				field_cell, self.columns, self.rows
			);
		}
		column * self.rows + row
	}
}

impl<T> Index<FieldCell> for Grid<T> {
	type Output = T;
	fn index(&self, field_cell: FieldCell) -> &T {
		&self.data[self.offset(field_cell)]
	}
}

impl<T> IndexMut<FieldCell> for Grid<T> {
	fn index_mut(&mut self, field_cell: FieldCell) -> &mut T {
		let i = self.offset(field_cell);
		&mut self.data[i]
	}
}

impl<T: Copy> Field<T> for Grid<T> {
	fn get(&self) -> &[T] {
		&self.data
	}
	fn get_field_cell_value(&self, field_cell: FieldCell) -> T {
		self[field_cell]
	}
	fn set_field_cell_value(&mut self, value: T, field_cell: FieldCell) {
		self[field_cell] = value;
	}
}
