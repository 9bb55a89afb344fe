use nalgebra::{UnitQuaternion, Vector3};

use crate::observation::SceneObservations;
use crate::types::{Action, ImageFrame, JointState};

// ---------------------------------------------------------------------------
// EndEffectorTarget
// ---------------------------------------------------------------------------

/// Goal handed to a [`MotionGenerator`] for one control tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EndEffectorTarget {
    /// Desired end-effector position in the world frame.
    pub position: Vector3<f32>,
    /// Desired orientation. `None` leaves orientation unconstrained.
    pub orientation: Option<UnitQuaternion<f32>>,
}

impl EndEffectorTarget {
    pub const fn position(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: None,
        }
    }

    pub const fn pose(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            orientation: Some(orientation),
        }
    }
}

// ---------------------------------------------------------------------------
// MotionGenerator
// ---------------------------------------------------------------------------

/// Turns an end-effector goal into a joint-space action for one tick.
///
/// Implementations may plan over several internal substeps but must return
/// a single action per call. The call is infallible: a generator that cannot
/// reach the goal returns its best effort.
pub trait MotionGenerator: Send + Sync + 'static {
    /// Compute the arm action that moves toward `target` from `joints`.
    fn forward(&mut self, target: &EndEffectorTarget, joints: &JointState) -> Action;

    /// Clear any internal planning state.
    fn reset(&mut self) {}

    /// Human-readable name for this generator.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// SimulationHost
// ---------------------------------------------------------------------------

/// The simulation the driver loop steps.
///
/// Covers physics/render stepping, play/stop state, observation readout,
/// action application and camera capture. Everything behind this trait is
/// opaque to the task-control loop.
pub trait SimulationHost: Send + Sync + 'static {
    /// Advance the simulation by one tick (physics and rendering).
    fn step(&mut self);

    /// `false` once the host application has shut down.
    fn is_running(&self) -> bool {
        true
    }

    /// `true` while the simulation timeline is playing.
    fn is_playing(&self) -> bool;

    /// `true` while the simulation timeline is stopped.
    fn is_stopped(&self) -> bool;

    /// Restore the world to its initial state.
    fn reset(&mut self);

    /// Read the current state of all tracked objects.
    fn observations(&self) -> SceneObservations;

    /// Apply a joint-space action to the robot.
    fn apply_action(&mut self, action: &Action);

    /// Current gripper joint positions.
    fn gripper_positions(&self) -> Vec<f32>;

    /// Grab one frame from the named camera, if the host has it.
    fn capture(&mut self, _camera: &str) -> Option<ImageFrame> {
        None
    }

    /// Human-readable name for this host.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
