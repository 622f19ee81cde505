//! The Continuum Crowds model. A world is split into square tiles, each
//! carrying a set of grid fields. Agents stamp density and momentum into the
//! tiles they overlap, the tiles derive anisotropic speed and cost fields from
//! that, and an eikonal solver turns the cost of a tile into a potential whose
//! gradient steers every agent heading towards the same goal.
//!

pub mod agents;
pub mod aggregator;
pub mod eikonal;
pub mod footprint;
pub mod grid;
pub mod grid_math;
pub mod settings;
pub mod solutions;
pub mod tiles;
pub mod utilities;
