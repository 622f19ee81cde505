//! The tunable parameter set shared by footprints, field aggregation and the
//! eikonal solver
//!

use bevy::prelude::*;

/// How overlapping agent footprints combine their density within a cell.
/// Momentum (the velocity accumulator) always sums
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum DensityCombine {
	/// Add each contribution, dense crowds quickly saturate the flow speed
	Sum,
	/// Keep the largest contribution, gives steadier fields around clusters
	#[default]
	Max,
}

/// Tunable parameters of the crowd model
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(default)
)]
#[derive(Resource, Clone, Copy, Debug, PartialEq, Reflect)]
pub struct CrowdSettings {
	/// Radial falloff (in cells) around an agent footprint
	pub u_radial_falloff: f32,
	/// Speed above which an agent uses a predictive (mobile) footprint
	pub v_dynamic_footprint_threshold: f32,
	/// How many seconds ahead a mobile footprint projects
	pub v_predictive_seconds: f32,
	/// Scalar applied to the first projected column of a mobile footprint
	pub v_scale_max: f32,
	/// Scalar approached by the last projected column of a mobile footprint
	pub v_scale_min: f32,
	/// Steepest downhill slope considered by the topographical speed
	pub f_slope_min: f32,
	/// Steepest uphill slope considered by the topographical speed
	pub f_slope_max: f32,
	/// Below this density speed is purely topographical
	pub f_rho_min: f32,
	/// Above this density speed purely follows the crowd flow
	pub f_rho_max: f32,
	/// Slowest speed of any cell
	pub f_speed_min: f32,
	/// Fastest speed of any cell
	pub f_speed_max: f32,
	/// Cost weight on path length
	pub c_alpha: f32,
	/// Cost weight on travel time
	pub c_beta: f32,
	/// Cost weight on discomfort
	pub c_gamma: f32,
	/// Weight of the larger quadratic root when solving a cell
	pub eikonal_max_weight: f32,
	/// Weight of the smaller quadratic root when solving a cell
	pub eikonal_min_weight: f32,
	/// How stamped densities combine
	pub density_combine: DensityCombine,
	/// Minimum number of seconds between re-solving a cached solution
	pub solution_refresh_seconds: f32,
	/// Seconds an unsubscribed solution survives before being dropped
	pub solution_lifetime_seconds: f32,
}

impl Default for CrowdSettings {
	fn default() -> Self {
		CrowdSettings {
			u_radial_falloff: 0.0,
			v_dynamic_footprint_threshold: 0.25,
			v_predictive_seconds: 1.0,
			v_scale_max: 0.3,
			v_scale_min: 0.25,
			f_slope_min: -1.0,
			f_slope_max: 1.0,
			f_rho_min: 0.3,
			f_rho_max: 0.8,
			f_speed_min: 0.0,
			f_speed_max: 20.0,
			c_alpha: 1.0,
			c_beta: 1.0,
			c_gamma: 1.0,
			eikonal_max_weight: 2.5,
			eikonal_min_weight: 1.0,
			density_combine: DensityCombine::Max,
			solution_refresh_seconds: 0.1,
			solution_lifetime_seconds: 5.0,
		}
	}
}

impl CrowdSettings {
	/// Panics if the parameters cannot produce sensible fields
	pub fn validate(&self) {
		if self.f_slope_max <= self.f_slope_min {
			panic!(
				"Slope range is empty, min {} must be below max {}",
				self.f_slope_min, self.f_slope_max
			);
		}
		if self.f_rho_max <= self.f_rho_min {
			panic!(
				"Density range is empty, min {} must be below max {}",
				self.f_rho_min, self.f_rho_max
			);
		}
		if self.f_speed_max < self.f_speed_min {
			panic!(
				"Speed range is inverted, min {} exceeds max {}",
				self.f_speed_min, self.f_speed_max
			);
		}
		if self.eikonal_max_weight + self.eikonal_min_weight <= 0.0 {
			panic!(
				"Eikonal weights must have a positive sum, found {} and {}",
				self.eikonal_max_weight, self.eikonal_min_weight
			);
		}
		if self.v_predictive_seconds < 0.0 || self.u_radial_falloff < 0.0 {
			panic!("Footprint predictive seconds and radial falloff cannot be negative");
		}
	}
	/// Topographical speed over flat ground, the speed of an empty level tile
	pub fn flat_speed(&self) -> f32 {
		self.f_speed_max
			+ (0.0 - self.f_slope_min) / (self.f_slope_max - self.f_slope_min)
				* (self.f_speed_min - self.f_speed_max)
	}
	/// Cost of moving across an empty level tile with no discomfort
	pub fn flat_cost(&self) -> f32 {
		let speed = self.flat_speed();
		(speed * self.c_alpha + self.c_beta) / speed
	}
	/// Load settings from a RON file, panics if the file is missing or the
	/// parameters are invalid
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening CrowdSettings file");
		let settings: CrowdSettings = match ron::de::from_reader(file) {
			Ok(settings) => settings,
			Err(e) => panic!("Failed deserializing CrowdSettings: {}", e),
		};
		settings.validate();
		settings
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_valid() {
		CrowdSettings::default().validate();
	}
	#[test]
	fn flat_speed_default() {
		let settings = CrowdSettings::default();
		let result = settings.flat_speed();
		let actual = 10.0;
		assert_eq!(actual, result);
	}
	#[test]
	fn flat_cost_default() {
		let settings = CrowdSettings::default();
		let result = settings.flat_cost();
		let actual = 1.1;
		assert!((actual - result).abs() < 1e-6);
	}
	#[test]
	#[should_panic]
	fn empty_density_range() {
		let settings = CrowdSettings {
			f_rho_min: 0.8,
			f_rho_max: 0.8,
			..default()
		};
		settings.validate();
	}
	#[test]
	#[should_panic]
	fn inverted_speed_range() {
		let settings = CrowdSettings {
			f_speed_min: 5.0,
			f_speed_max: 1.0,
			..default()
		};
		settings.validate();
	}
	#[test]
	#[cfg(feature = "ron")]
	fn settings_from_ron() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/crowd_settings.ron";
		let result = CrowdSettings::from_ron(path);
		assert_eq!(DensityCombine::Sum, result.density_combine);
		assert_eq!(1.0, result.u_radial_falloff);
		assert_eq!(15.0, result.f_speed_max);
	}
}
