// pickplace-core: Types, traits, config, time and errors for pick-and-place task control.

pub mod config;
pub mod error;
pub mod observation;
pub mod time;
pub mod traits;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::{
            CameraConfig, ControllerConfig, GripperConfig, JointSpec, LoggingConfig,
            MotionConfig, PickPlaceConfig, RobotConfig, RunConfig, TaskConfig,
        },
        error::{ConfigError, TaskError},
        observation::{SceneObservations, TaskObservation, keys},
        time::SimTime,
        traits::{EndEffectorTarget, MotionGenerator, SimulationHost},
        types::{Action, GripperCommand, ImageFrame, JointState, Pose},
    };
}
