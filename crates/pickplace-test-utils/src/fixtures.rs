//! Observation builders.

use pickplace_core::observation::{SceneObservations, TaskObservation, keys};
use pickplace_core::types::JointState;

const GANTRY_DOF: usize = 14;
const GRIPPER_INDICES: [usize; 2] = [6, 7];

/// 14-DOF joint state with the end effector in joints `0..3` and the two
/// gripper joints at `6` and `7`.
pub fn gantry_joints(end_effector: [f32; 3], gripper: [f32; 2]) -> JointState {
    let mut q = vec![0.0; GANTRY_DOF];
    q[..3].copy_from_slice(&end_effector);
    for (i, v) in GRIPPER_INDICES.into_iter().zip(gripper) {
        q[i] = v;
    }
    JointState::new(q)
}

/// Typed observation of a gantry robot, built through the same validation
/// path the driver uses.
pub fn observation_at(
    object: [f32; 3],
    target: [f32; 3],
    end_effector: [f32; 3],
    gripper: [f32; 2],
) -> TaskObservation {
    SceneBuilder::new()
        .object(object)
        .target(target)
        .end_effector(end_effector)
        .joints(gantry_joints(end_effector, gripper).into_vec())
        .task_observation()
        .expect("builder produces a complete scene")
}

/// Builds a complete [`SceneObservations`] for one object and one robot.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    object_name: String,
    robot_name: String,
    scene: SceneObservations,
}

impl SceneBuilder {
    /// Scene with the default task layout: cube at `(0.6, 0.3, 0.85)`,
    /// target `(0.8, 0.7, 1.0)` and a gantry end effector at `(0.3, 0.0, 1.3)`.
    pub fn new() -> Self {
        Self::named("cube", "cs_66")
    }

    pub fn named(object_name: &str, robot_name: &str) -> Self {
        Self {
            object_name: object_name.to_string(),
            robot_name: robot_name.to_string(),
            scene: SceneObservations::new(),
        }
        .object([0.6, 0.3, 0.85])
        .target([0.8, 0.7, 1.0])
        .end_effector([0.3, 0.0, 1.3])
        .joints(gantry_joints([0.3, 0.0, 1.3], [0.0, 0.0]).into_vec())
    }

    #[must_use]
    pub fn object(mut self, position: [f32; 3]) -> Self {
        self.scene.insert(&self.object_name, keys::POSITION, position.to_vec());
        self
    }

    #[must_use]
    pub fn target(mut self, position: [f32; 3]) -> Self {
        self.scene
            .insert(&self.object_name, keys::TARGET_POSITION, position.to_vec());
        self
    }

    #[must_use]
    pub fn end_effector(mut self, position: [f32; 3]) -> Self {
        self.scene
            .insert(&self.robot_name, keys::END_EFFECTOR_POSITION, position.to_vec());
        self
    }

    #[must_use]
    pub fn joints(mut self, positions: Vec<f32>) -> Self {
        self.scene.insert(&self.robot_name, keys::JOINT_POSITIONS, positions);
        self
    }

    /// Drop one field of the object (`robot = false`) or robot.
    #[must_use]
    pub fn without(mut self, robot: bool, field: &str) -> Self {
        let owner = if robot { &self.robot_name } else { &self.object_name };
        self.scene.remove(owner, field);
        self
    }

    pub fn build(self) -> SceneObservations {
        self.scene
    }

    pub fn task_observation(
        &self,
    ) -> Result<TaskObservation, pickplace_core::error::TaskError> {
        TaskObservation::from_scene(&self.scene, &self.object_name, &self.robot_name)
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_is_complete() {
        let obs = SceneBuilder::new().task_observation().unwrap();
        assert_eq!(obs.object.position, [0.6, 0.3, 0.85]);
        assert_eq!(obs.joints.len(), 14);
    }

    #[test]
    fn without_drops_a_key() {
        let builder = SceneBuilder::new().without(true, keys::END_EFFECTOR_POSITION);
        assert!(builder.task_observation().is_err());
    }

    #[test]
    fn gantry_joints_layout() {
        let q = gantry_joints([1.0, 2.0, 3.0], [0.5, -0.5]);
        assert_eq!(q.select(&[0, 1, 2, 6, 7]), Some(vec![1.0, 2.0, 3.0, 0.5, -0.5]));
    }
}
