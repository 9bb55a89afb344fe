//! Scripted [`SimulationHost`] for driver-loop tests.
//!
//! The gantry world has no physics: applied joint targets are reached
//! instantly, the end effector sits at the first three joints, and the cube
//! snaps to the end effector while the gripper is closed around it.

use nalgebra::Vector3;
use pickplace_core::observation::{SceneObservations, keys};
use pickplace_core::traits::SimulationHost;
use pickplace_core::types::{Action, ImageFrame, Pose};

/// Layout and play/stop script of a [`GantryWorld`].
#[derive(Debug, Clone)]
pub struct GantryWorldConfig {
    pub object_name: String,
    pub robot_name: String,
    pub dof: usize,
    /// Joints holding the end-effector x, y and z.
    pub ee_indices: [usize; 3],
    pub gripper_indices: Vec<usize>,
    pub gripper_closed: Vec<f32>,
    pub initial_end_effector: [f32; 3],
    pub cube_position: [f32; 3],
    pub target_position: [f32; 3],
    /// End-effector distance within which a closing gripper grabs the cube.
    pub grasp_radius: f32,
    /// Host tick at which the timeline stops.
    pub stop_at_tick: Option<u64>,
    /// Host tick at which the timeline plays again.
    pub resume_at_tick: Option<u64>,
    /// Host tick after which the application reports it has shut down.
    pub shutdown_at_tick: Option<u64>,
}

impl Default for GantryWorldConfig {
    fn default() -> Self {
        Self {
            object_name: "cube".into(),
            robot_name: "cs_66".into(),
            dof: 14,
            ee_indices: [0, 1, 2],
            gripper_indices: vec![6, 7],
            gripper_closed: vec![0.628, -0.628],
            initial_end_effector: [0.3, 0.0, 1.3],
            cube_position: [0.6, 0.3, 0.85],
            target_position: [0.8, 0.7, 1.0],
            grasp_radius: 0.02,
            stop_at_tick: None,
            resume_at_tick: None,
            shutdown_at_tick: None,
        }
    }
}

pub struct GantryWorld {
    config: GantryWorldConfig,
    joints: Vec<f32>,
    cube: [f32; 3],
    attached: bool,
    playing: bool,
    ticks: u64,
    resets: usize,
    applied: usize,
}

impl GantryWorld {
    pub fn new(config: GantryWorldConfig) -> Self {
        let mut world = Self {
            joints: Vec::new(),
            cube: config.cube_position,
            attached: false,
            playing: true,
            ticks: 0,
            resets: 0,
            applied: 0,
            config,
        };
        world.restore();
        world
    }

    fn restore(&mut self) {
        self.joints = vec![0.0; self.config.dof];
        for (&i, &v) in self.config.ee_indices.iter().zip(&self.config.initial_end_effector) {
            self.joints[i] = v;
        }
        self.cube = self.config.cube_position;
        self.attached = false;
    }

    pub fn end_effector(&self) -> Vector3<f32> {
        let [x, y, z] = self.config.ee_indices;
        Vector3::new(self.joints[x], self.joints[y], self.joints[z])
    }

    pub const fn cube_position(&self) -> [f32; 3] {
        self.cube
    }

    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Host ticks stepped so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of `reset` calls.
    pub const fn resets(&self) -> usize {
        self.resets
    }

    /// Number of `apply_action` calls.
    pub const fn applied(&self) -> usize {
        self.applied
    }

    fn gripper_closed(&self) -> bool {
        self.config
            .gripper_indices
            .iter()
            .zip(&self.config.gripper_closed)
            .all(|(&i, &closed)| (self.joints[i] - closed).abs() < 0.05)
    }
}

impl Default for GantryWorld {
    fn default() -> Self {
        Self::new(GantryWorldConfig::default())
    }
}

impl SimulationHost for GantryWorld {
    fn step(&mut self) {
        self.ticks += 1;
        if self.config.stop_at_tick == Some(self.ticks) {
            self.playing = false;
        }
        if self.config.resume_at_tick == Some(self.ticks) {
            self.playing = true;
        }
        if self.attached {
            let ee = self.end_effector();
            self.cube = [ee.x, ee.y, ee.z];
        }
    }

    fn is_running(&self) -> bool {
        self.config.shutdown_at_tick.is_none_or(|t| self.ticks < t)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn is_stopped(&self) -> bool {
        !self.playing
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.restore();
    }

    fn observations(&self) -> SceneObservations {
        let ee = self.end_effector();
        SceneObservations::new()
            .with(&self.config.object_name, keys::POSITION, self.cube.to_vec())
            .with(
                &self.config.object_name,
                keys::ORIENTATION,
                Pose::IDENTITY_ORIENTATION.to_vec(),
            )
            .with(
                &self.config.object_name,
                keys::TARGET_POSITION,
                self.config.target_position.to_vec(),
            )
            .with(&self.config.robot_name, keys::JOINT_POSITIONS, self.joints.clone())
            .with(
                &self.config.robot_name,
                keys::END_EFFECTOR_POSITION,
                vec![ee.x, ee.y, ee.z],
            )
    }

    fn apply_action(&mut self, action: &Action) {
        self.applied += 1;
        for (i, v) in action.position_targets() {
            if let Some(joint) = self.joints.get_mut(i) {
                *joint = v;
            }
        }

        if self.gripper_closed() {
            let cube = Vector3::from(self.cube);
            if !self.attached && (self.end_effector() - cube).norm() < self.config.grasp_radius {
                self.attached = true;
            }
        } else {
            self.attached = false;
        }
    }

    fn gripper_positions(&self) -> Vec<f32> {
        self.config
            .gripper_indices
            .iter()
            .map(|&i| self.joints[i])
            .collect()
    }

    fn capture(&mut self, camera: &str) -> Option<ImageFrame> {
        Some(ImageFrame {
            timestamp_ns: self.ticks,
            width: 2,
            height: 2,
            label: camera.to_string(),
            data: vec![128; 12],
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "GantryWorld"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_playing_at_initial_pose() {
        let world = GantryWorld::default();
        assert!(world.is_playing());
        assert!(!world.is_stopped());
        assert!(world.is_running());
        assert_relative_eq!(world.end_effector().z, 1.3);
        assert_eq!(world.gripper_positions(), vec![0.0, 0.0]);
    }

    #[test]
    fn observations_carry_required_keys() {
        let world = GantryWorld::default();
        let obs = world.observations();
        assert_eq!(obs.get("cube", keys::POSITION), Some(&[0.6, 0.3, 0.85][..]));
        assert_eq!(obs.get("cs_66", keys::JOINT_POSITIONS).map(<[f32]>::len), Some(14));
    }

    #[test]
    fn closing_at_cube_attaches_and_carries() {
        let mut world = GantryWorld::default();
        world.apply_action(&Action::positions(
            vec![0, 1, 2, 6, 7],
            vec![0.6, 0.3, 0.85, 0.628, -0.628],
        ));
        assert!(world.is_attached());
        world.apply_action(&Action::positions(vec![2], vec![1.2]));
        world.step();
        assert_relative_eq!(world.cube_position()[2], 1.2);

        world.apply_action(&Action::positions(vec![6, 7], vec![0.0, 0.0]));
        assert!(!world.is_attached());
    }

    #[test]
    fn closing_away_from_cube_does_not_attach() {
        let mut world = GantryWorld::default();
        world.apply_action(&Action::positions(vec![6, 7], vec![0.628, -0.628]));
        assert!(!world.is_attached());
    }

    #[test]
    fn scripted_stop_and_resume() {
        let mut world = GantryWorld::new(GantryWorldConfig {
            stop_at_tick: Some(2),
            resume_at_tick: Some(4),
            ..GantryWorldConfig::default()
        });
        world.step();
        assert!(world.is_playing());
        world.step();
        assert!(world.is_stopped());
        world.step();
        world.step();
        assert!(world.is_playing());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut world = GantryWorld::default();
        world.apply_action(&Action::positions(vec![0], vec![2.0]));
        world.reset();
        assert_relative_eq!(world.end_effector().x, 0.3);
        assert_eq!(world.resets(), 1);
    }

    #[test]
    fn shutdown_stops_running() {
        let mut world = GantryWorld::new(GantryWorldConfig {
            shutdown_at_tick: Some(1),
            ..GantryWorldConfig::default()
        });
        world.step();
        assert!(!world.is_running());
    }
}
