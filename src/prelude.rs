//! `use bevy_continuum_crowds_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::crowds::{
	agents::*,
	aggregator::*,
	eikonal::{indexed_heap::*, *},
	footprint::*,
	grid::*,
	grid_math,
	settings::*,
	solutions::*,
	tiles::*,
	utilities::*,
};

#[doc(hidden)]
pub use crate::{
	bundle::*,
	plugin::{field_layer::*, solver_layer::*, *},
};
