//! Shared test fixtures and utilities for pickplace crates.
//!
//! Provides a Cartesian "gantry" motion generator and matching simulation
//! host whose end effector is read straight from the first three joints, so
//! controller and driver tests run deterministically without IK.

pub mod fixtures;
pub mod mocks;
pub mod world;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{SceneBuilder, gantry_joints, observation_at};
pub use mocks::{GantryMotionGenerator, ResetCounter};
pub use world::{GantryWorld, GantryWorldConfig};
