//! Pick-and-place task control.
//!
//! A [`PickPlaceTask`] describes what to move where; a
//! [`PickPlaceController`] sequences the [`Phase`]s of one run and turns each
//! observation into an action through a pluggable
//! [`MotionGenerator`](pickplace_core::traits::MotionGenerator).

pub mod controller;
pub mod gripper;
pub mod phase;
pub mod task;

pub use controller::{PhaseTransition, PickPlaceController};
pub use gripper::ParallelGripper;
pub use phase::Phase;
pub use task::{PickPlaceTask, TaskParams};
