//! Pick-and-place task description.

use nalgebra::Vector3;
use pickplace_core::config::TaskConfig;
use pickplace_core::error::TaskError;
use pickplace_core::observation::{SceneObservations, TaskObservation};
use pickplace_core::types::Pose;

/// Names and constants a run needs to read observations and place the cube.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskParams {
    pub name: String,
    pub cube_name: String,
    pub robot_name: String,
    pub cube_initial: Pose,
    pub cube_size: Vector3<f32>,
    pub target_position: Vector3<f32>,
    pub end_effector_offset: Vector3<f32>,
}

/// The configured task. The target is fixed at construction and never
/// changes afterwards.
#[derive(Debug, Clone)]
pub struct PickPlaceTask {
    params: TaskParams,
}

impl PickPlaceTask {
    pub fn from_config(config: &TaskConfig) -> Self {
        Self {
            params: TaskParams {
                name: config.name.clone(),
                cube_name: config.cube_name.clone(),
                robot_name: config.robot_name.clone(),
                cube_initial: Pose::new(config.cube_position(), config.cube_orientation()),
                cube_size: Vector3::from(config.cube_size),
                target_position: Vector3::from(config.target_position),
                end_effector_offset: Vector3::from(config.end_effector_offset),
            },
        }
    }

    pub const fn params(&self) -> &TaskParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub const fn target_position(&self) -> &Vector3<f32> {
        &self.params.target_position
    }

    pub const fn end_effector_offset(&self) -> &Vector3<f32> {
        &self.params.end_effector_offset
    }

    /// Validate a raw scene into the typed observation for this task.
    pub fn observe(&self, scene: &SceneObservations) -> Result<TaskObservation, TaskError> {
        TaskObservation::from_scene(scene, &self.params.cube_name, &self.params.robot_name)
    }
}

impl Default for PickPlaceTask {
    fn default() -> Self {
        Self::from_config(&TaskConfig::default())
    }
}
