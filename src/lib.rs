//! This is a plugin for Bevy game engine to simulate crowds using Continuum
//! Crowds. Agents splat density onto tiles, tiles derive speed and cost
//! fields from density, terrain and discomfort, and a fast marching eikonal
//! solver turns those costs into a velocity field agents can follow
//!

pub mod bundle;
pub mod crowds;
pub mod plugin;

pub mod prelude;
