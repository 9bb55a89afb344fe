//! Simulation host and run loop for pick-and-place.
//!
//! [`KinematicWorld`] stands in for a physics simulation behind the
//! [`SimulationHost`](pickplace_core::traits::SimulationHost) trait, with
//! [`SyntheticCamera`]s for image capture. [`PickPlaceRunner`] drives any
//! host through a headless Bevy app until the task is done or the run is
//! cut short.
//!
//! # Example
//!
//! ```no_run
//! use pickplace_core::config::PickPlaceConfig;
//! use pickplace_ik::DlsMotionGenerator;
//! use pickplace_sim::{KinematicWorld, PickPlaceRunner, RunMode};
//!
//! let config = PickPlaceConfig::default();
//! let mut runner = PickPlaceRunner::new(
//!     &config,
//!     Box::new(KinematicWorld::new(&config)),
//!     Box::new(DlsMotionGenerator::from_config(&config.robot, &config.motion)),
//!     RunMode::Plain,
//! )
//! .unwrap();
//! let summary = runner.run().unwrap();
//! println!("{:?} after {} ticks", summary.stop_reason, summary.ticks);
//! ```

pub mod camera;
pub mod error;
pub mod runner;
pub mod world;

pub use camera::{CameraView, SceneSnapshot, SyntheticCamera};
pub use error::RunError;
pub use runner::{
    PickPlacePlugin, PickPlaceRunner, RunBook, RunMode, RunSummary, StopReason, TickStatus,
};
pub use world::KinematicWorld;
