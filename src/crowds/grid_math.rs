//! Pure numeric helpers over [Grid]s. Sampling treats any tap outside of the
//! grid, and any non-finite value, as `0` so footprints and fields can be
//! resampled near their edges without special casing
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Replace NaN or infinite values with `0`
pub fn sanitise(value: f32) -> f32 {
	if value.is_finite() {
		value
	} else {
		0.0
	}
}

/// Euclidean modulus, the result always lies in `[0, m)` for positive `m`
pub fn modulus(x: f32, m: f32) -> f32 {
	(x % m + m) % m
}

/// Rotate a vector anticlockwise by `radians`
pub fn rotate_vec2(v: Vec2, radians: f32) -> Vec2 {
	let (sin, cos) = radians.sin_cos();
	Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Value of a cell for interpolation, `0` when outside or non-finite
fn tap(grid: &Grid<f32>, column: i32, row: i32) -> f32 {
	grid.try_get(column, row).copied().map_or(0.0, sanitise)
}

/// Bilinearly sample `grid` at the continuous point `(x, y)` where integer
/// coordinates land exactly on cell values
pub fn bilinear_sample(grid: &Grid<f32>, x: f32, y: f32) -> f32 {
	let x0 = x.floor();
	let y0 = y.floor();
	let fx = x - x0;
	let fy = y - y0;
	let (c, r) = (x0 as i32, y0 as i32);
	let top = tap(grid, c, r) * (1.0 - fx) + tap(grid, c + 1, r) * fx;
	let bottom = tap(grid, c, r + 1) * (1.0 - fx) + tap(grid, c + 1, r + 1) * fx;
	top * (1.0 - fy) + bottom * fy
}

/// Bilinearly sample a vector grid at `(x, y)`. When `clamped` the point is
/// first pulled inside the grid bounds so edge cells extend outwards,
/// otherwise outside taps count as zero
pub fn bilinear_sample_vec2(grid: &Grid<Vec2>, x: f32, y: f32, clamped: bool) -> Vec2 {
	if grid.is_empty() {
		return Vec2::ZERO;
	}
	let (x, y) = if clamped {
		(
			x.clamp(0.0, (grid.get_columns() - 1) as f32),
			y.clamp(0.0, (grid.get_rows() - 1) as f32),
		)
	} else {
		(x, y)
	};
	let tap = |column: i32, row: i32| -> Vec2 {
		match grid.try_get(column, row) {
			Some(v) if v.is_finite() => *v,
			_ => Vec2::ZERO,
		}
	};
	let x0 = x.floor();
	let y0 = y.floor();
	let fx = x - x0;
	let fy = y - y0;
	let (c, r) = (x0 as i32, y0 as i32);
	let top = tap(c, r) * (1.0 - fx) + tap(c + 1, r) * fx;
	let bottom = tap(c, r + 1) * (1.0 - fx) + tap(c + 1, r + 1) * fx;
	top * (1.0 - fy) + bottom * fy
}

/// Shift a grid by the fractional part of `offset`, spreading each source
/// cell over up to four destination cells. The result grows by one column
/// and/or row when there is a fractional shift along that axis and the sum
/// of all values is preserved. With no fractional shift the grid is returned
/// unchanged
pub fn bilinear_place(grid: &Grid<f32>, offset: Vec2) -> Grid<f32> {
	let dx = modulus(offset.x, 1.0);
	let dy = modulus(offset.y, 1.0);
	if dx == 0.0 && dy == 0.0 {
		return grid.clone();
	}
	let columns = grid.get_columns() + usize::from(dx != 0.0);
	let rows = grid.get_rows() + usize::from(dy != 0.0);
	Grid::from_fn(columns, rows, |cell| {
		let (xc, yc) = (cell.get_column() as i32, cell.get_row() as i32);
		let (xf, yf) = (xc - 1, yc - 1);
		let q11 = tap(grid, xf, yf);
		let q12 = tap(grid, xf, yc);
		let q21 = tap(grid, xc, yf);
		let q22 = tap(grid, xc, yc);
		dy * (dx * q11 + (1.0 - dx) * q21) + (1.0 - dy) * (dx * q12 + (1.0 - dx) * q22)
	})
}

/// Gradient of a scalar grid using centred differences inside and one-sided
/// differences along the edges. Where both neighbours along an
/// axis are infinite that component is `0`, where only one is infinite the
/// component is the sign of the difference
pub fn gradient(grid: &Grid<f32>) -> Grid<Vec2> {
	let (columns, rows) = grid.get_dimensions();
	let axis = |low: f32, high: f32, span: usize| -> f32 {
		if span == 0 {
			return 0.0;
		}
		match (low.is_infinite(), high.is_infinite()) {
			(true, true) => 0.0,
			(false, false) => (high - low) / span as f32,
			_ => (high - low).signum(),
		}
	};
	Grid::from_fn(columns, rows, |cell| {
		let (i, k) = cell.get_column_row();
		let x_min = i.saturating_sub(1);
		let x_max = (i + 1).min(columns - 1);
		let y_min = k.saturating_sub(1);
		let y_max = (k + 1).min(rows - 1);
		let dx = axis(
			grid[FieldCell::new(x_min, k)],
			grid[FieldCell::new(x_max, k)],
			x_max - x_min,
		);
		let dy = axis(
			grid[FieldCell::new(i, y_min)],
			grid[FieldCell::new(i, y_max)],
			y_max - y_min,
		);
		Vec2::new(dx, dy)
	})
}

/// Round to 3 decimal places, trims float noise from trigonometry so that
/// right angle rotations land exactly on cells
fn round3(v: f64) -> f64 {
	(v * 1000.0).round() / 1000.0
}

/// Rotate a grid anticlockwise by `degrees` about its centre. The output is
/// sized to the rotated bounding box and every output cell is an inverse
/// mapped bilinear sample of the source
pub fn rotate(grid: &Grid<f32>, degrees: f32) -> Grid<f32> {
	let radians = (degrees as f64).to_radians();
	let (sin, cos) = radians.sin_cos();
	let n = grid.get_columns() as f64;
	let m = grid.get_rows() as f64;
	let columns = (round3((n * cos).abs()) + round3((m * sin).abs())).ceil() as usize;
	let rows = (round3((m * cos).abs()) + round3((n * sin).abs())).ceil() as usize;
	let half_out = ((columns as f64 - 1.0) / 2.0, (rows as f64 - 1.0) / 2.0);
	let half_in = ((n - 1.0) / 2.0, (m - 1.0) / 2.0);
	Grid::from_fn(columns, rows, |cell| {
		let ut = cell.get_column() as f64 - half_out.0;
		let vt = cell.get_row() as f64 - half_out.1;
		let ur = ut * cos + vt * sin;
		let vr = -ut * sin + vt * cos;
		let x = round3(ur + half_in.0);
		let y = round3(vr + half_in.1);
		bilinear_sample(grid, x as f32, y as f32)
	})
}

/// A `width x height` rectangle of `1`s surrounded by a border of
/// `ceil(falloff)` cells that fade linearly along the sides and radially
/// around the corners, reaching `0` at `falloff + 1` cells from the
/// rectangle
pub fn radial_fade_rect(width: usize, height: usize, falloff: f32) -> Grid<f32> {
	let buffer = falloff.max(0.0).ceil() as usize;
	let columns = width + 2 * buffer;
	let rows = height + 2 * buffer;
	let scale = (buffer + 1) as f32;
	let inside = |v: usize, extent: usize| v >= buffer && v < buffer + extent;
	// distance inwards from the outer edge, used along the straight sides
	let edge = |v: usize, extent: usize| -> f32 {
		if v < buffer {
			(v + 1) as f32
		} else {
			(extent - v) as f32
		}
	};
	// distance outwards from the rectangle, used around the corners
	let corner = |v: usize, extent: usize| -> f32 {
		if v < buffer {
			(buffer - v) as f32
		} else {
			(buffer + v + 1 - extent) as f32
		}
	};
	Grid::from_fn(columns, rows, |cell| {
		let (x, y) = cell.get_column_row();
		match (inside(x, width), inside(y, height)) {
			(true, true) => 1.0,
			(false, true) => edge(x, columns) / scale,
			(true, false) => edge(y, rows) / scale,
			(false, false) => {
				let distance = Vec2::new(corner(x, columns), corner(y, rows)).length();
				(scale - distance).max(0.0) / scale
			}
		}
	})
}

/// Stretch a footprint forwards along `+x`. Columns before `fade_from` are
/// copied and then `extra_length` columns are appended, each the cross
/// section at column `fade_from - 1` scaled linearly from `start_scalar`
/// towards `end_scalar`
pub fn linear_fadeout(
	base: &Grid<f32>,
	fade_from: usize,
	extra_length: usize,
	start_scalar: f32,
	end_scalar: f32,
) -> Grid<f32> {
	let fade_from = fade_from.min(base.get_columns());
	let slice = fade_from.saturating_sub(1);
	let step = if extra_length > 0 {
		(end_scalar - start_scalar) / extra_length as f32
	} else {
		0.0
	};
	Grid::from_fn(fade_from + extra_length, base.get_rows(), |cell| {
		let (x, y) = cell.get_column_row();
		if x < fade_from {
			base[cell]
		} else {
			let scalar = step * (x - fade_from) as f32 + start_scalar;
			base[FieldCell::new(slice, y)] * scalar
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sum(grid: &Grid<f32>) -> f32 {
		grid.get().iter().sum()
	}

	#[test]
	fn modulus_negative() {
		let result = modulus(-0.25, 1.0);
		let actual = 0.75;
		assert_eq!(actual, result);
	}
	#[test]
	fn sample_on_cell() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
		let result = bilinear_sample(&grid, 1.0, 1.0);
		let actual = 4.0;
		assert_eq!(actual, result);
	}
	#[test]
	fn sample_between_cells() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
		let result = bilinear_sample(&grid, 0.5, 0.5);
		let actual = 2.5;
		assert_eq!(actual, result);
	}
	#[test]
	fn sample_outside_is_zero() {
		let grid = Grid::new(2, 2, 1.0);
		let result = bilinear_sample(&grid, 1.5, 0.0);
		let actual = 0.5;
		assert_eq!(actual, result);
		assert_eq!(0.0, bilinear_sample(&grid, -3.0, 5.0));
	}
	#[test]
	fn sample_ignores_infinity() {
		let grid = Grid::from_rows(vec![vec![2.0, f32::INFINITY]]);
		let result = bilinear_sample(&grid, 0.5, 0.0);
		let actual = 1.0;
		assert_eq!(actual, result);
	}
	#[test]
	fn sample_ignores_nan() {
		let grid = Grid::from_rows(vec![vec![f32::NAN, 4.0]]);
		let result = bilinear_sample(&grid, 0.5, 0.0);
		let actual = 2.0;
		assert_eq!(actual, result);
		assert_eq!(0.0, sanitise(f32::NAN));
	}
	#[test]
	fn sample_vec2_clamped() {
		let grid = Grid::new(3, 3, Vec2::new(1.0, -1.0));
		let result = bilinear_sample_vec2(&grid, 10.0, -4.0, true);
		let actual = Vec2::new(1.0, -1.0);
		assert_eq!(actual, result);
		assert_eq!(Vec2::ZERO, bilinear_sample_vec2(&grid, 10.0, -4.0, false));
	}
	#[test]
	fn place_integer_offset_is_identity() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
		let result = bilinear_place(&grid, Vec2::new(3.0, -2.0));
		assert_eq!(grid, result);
	}
	#[test]
	fn place_half_cell_preserves_mass() {
		let grid = Grid::new(2, 2, 1.0);
		let result = bilinear_place(&grid, Vec2::new(0.5, 0.5));
		assert_eq!((3, 3), result.get_dimensions());
		assert!((sum(&grid) - sum(&result)).abs() < 1e-5);
		let actual = 0.25;
		assert_eq!(actual, result[FieldCell::new(0, 0)]);
		assert_eq!(1.0, result[FieldCell::new(1, 1)]);
	}
	#[test]
	fn place_single_axis() {
		let grid = Grid::new(1, 1, 1.0);
		let result = bilinear_place(&grid, Vec2::new(0.25, 0.0));
		assert_eq!((2, 1), result.get_dimensions());
		assert_eq!(0.75, result[FieldCell::new(0, 0)]);
		assert_eq!(0.25, result[FieldCell::new(1, 0)]);
	}
	#[test]
	fn gradient_of_ramp() {
		let grid = Grid::from_fn(4, 3, |cell| cell.get_column() as f32);
		let result = gradient(&grid);
		for (_, v) in result.iter() {
			assert_eq!(Vec2::new(1.0, 0.0), *v);
		}
	}
	#[test]
	fn gradient_keeps_slope() {
		let grid = Grid::from_fn(5, 5, |cell| 0.1 * cell.get_column() as f32 + 0.5 * cell.get_row() as f32);
		let result = gradient(&grid)[FieldCell::new(2, 2)];
		let actual = Vec2::new(0.1, 0.5);
		assert!((actual - result).length() < 1e-5);
		// one-sided along the edges
		let edge = gradient(&grid)[FieldCell::new(0, 4)];
		assert!((actual - edge).length() < 1e-5);
	}
	#[test]
	fn gradient_next_to_infinity() {
		let grid = Grid::from_rows(vec![vec![0.0, 1.0, f32::INFINITY]]);
		let result = gradient(&grid)[FieldCell::new(1, 0)];
		let actual = Vec2::new(1.0, 0.0);
		assert_eq!(actual, result);
	}
	#[test]
	fn gradient_between_infinities() {
		let grid = Grid::from_rows(vec![vec![f32::INFINITY, 1.0, f32::INFINITY]]);
		let result = gradient(&grid)[FieldCell::new(1, 0)];
		assert_eq!(Vec2::ZERO, result);
	}
	#[test]
	fn rotate_zero_is_identity() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
		let result = rotate(&grid, 0.0);
		assert_eq!(grid, result);
	}
	#[test]
	fn rotate_quarter_turn_swaps_dimensions() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
		let result = rotate(&grid, 90.0);
		assert_eq!((2, 3), result.get_dimensions());
		assert!((sum(&grid) - sum(&result)).abs() < 1e-4);
	}
	#[test]
	fn rotate_half_turn_reverses() {
		let grid = Grid::from_rows(vec![vec![1.0, 2.0, 3.0]]);
		let result = rotate(&grid, 180.0);
		assert_eq!(3.0, result[FieldCell::new(0, 0)]);
		assert_eq!(1.0, result[FieldCell::new(2, 0)]);
	}
	#[test]
	fn rotate_vec2_quarter() {
		let result = rotate_vec2(Vec2::X, std::f32::consts::FRAC_PI_2);
		assert!((result - Vec2::Y).length() < 1e-6);
	}
	#[test]
	fn radial_fade_without_falloff() {
		let result = radial_fade_rect(2, 3, 0.0);
		let actual = Grid::new(2, 3, 1.0);
		assert_eq!(actual, result);
	}
	#[test]
	fn radial_fade_border() {
		let result = radial_fade_rect(1, 1, 1.0);
		assert_eq!((3, 3), result.get_dimensions());
		assert_eq!(1.0, result[FieldCell::new(1, 1)]);
		assert_eq!(0.5, result[FieldCell::new(0, 1)]);
		assert_eq!(0.5, result[FieldCell::new(1, 2)]);
		let corner = result[FieldCell::new(2, 2)];
		let actual = (2.0 - 2.0_f32.sqrt()) / 2.0;
		assert!((actual - corner).abs() < 1e-6);
	}
	#[test]
	fn linear_fadeout_extends() {
		let base = Grid::new(2, 2, 1.0);
		let result = linear_fadeout(&base, 2, 4, 0.5, 0.1);
		assert_eq!((6, 2), result.get_dimensions());
		assert_eq!(1.0, result[FieldCell::new(1, 0)]);
		assert_eq!(0.5, result[FieldCell::new(2, 0)]);
		let actual = 0.5 + 3.0 * (0.1 - 0.5) / 4.0;
		assert!((actual - result[FieldCell::new(5, 1)]).abs() < 1e-6);
	}
	#[test]
	fn linear_fadeout_without_extension() {
		let base = Grid::new(3, 1, 1.0);
		let result = linear_fadeout(&base, 3, 0, 0.3, 0.25);
		assert_eq!(base, result);
	}
}
