//! Kinematic stand-in for a physics simulation.
//!
//! [`KinematicWorld`] has no dynamics: joints track their commanded targets
//! at a bounded speed, the end-effector pose comes from forward kinematics
//! and the cube is rigidly carried by the end effector while the gripper is
//! closed around it. It is enough to run the task-control loop end to end
//! and to produce camera frames for logging runs.

use nalgebra::{Isometry3, Vector3};
use tracing::{debug, info};

use pickplace_core::config::{PickPlaceConfig, RunConfig};
use pickplace_core::observation::{SceneObservations, keys};
use pickplace_core::time::SimTime;
use pickplace_core::traits::SimulationHost;
use pickplace_core::types::{Action, ImageFrame, Pose};
use pickplace_ik::KinematicChain;
use pickplace_task::PickPlaceTask;

use crate::camera::{SceneSnapshot, SyntheticCamera};

/// Finger speed used when tracking gripper targets (rad/s).
const GRIPPER_SPEED: f32 = 2.0;
/// Per-finger distance from the closed position that still counts as a grip.
const GRIP_TOLERANCE: f32 = 0.05;
/// End-effector distance to the cube within which a closing gripper grabs it.
const GRASP_RADIUS: f32 = 0.03;

pub struct KinematicWorld {
    object_name: String,
    robot_name: String,
    chain: KinematicChain,
    arm_indices: Vec<usize>,
    gripper_indices: Vec<usize>,
    gripper_closed: Vec<f32>,
    default_joints: Vec<f32>,
    arm_step: f32,
    gripper_step: f32,
    dt: f64,

    cube_initial: Pose,
    cube_size: Vector3<f32>,
    target: Vector3<f32>,
    cameras: Vec<SyntheticCamera>,
    schedule: RunConfig,

    joints: Vec<f32>,
    targets: Vec<f32>,
    cube: Pose,
    /// Cube position relative to the end effector while carried.
    grip_offset: Option<Vector3<f32>>,
    time: SimTime,
    ticks: u64,
    playing: bool,
    running: bool,
}

impl KinematicWorld {
    pub fn new(config: &PickPlaceConfig) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let gripper_step = GRIPPER_SPEED * config.motion.physics_dt as f32;
        let task = PickPlaceTask::from_config(&config.task);
        let params = task.params();
        Self {
            object_name: params.cube_name.clone(),
            robot_name: params.robot_name.clone(),
            chain: KinematicChain::from_robot(&config.robot),
            arm_indices: config.robot.arm_joint_indices.clone(),
            gripper_indices: config.gripper.joint_indices.clone(),
            gripper_closed: config.gripper.closed_positions.clone(),
            default_joints: config.robot.default_joint_positions.clone(),
            arm_step: config.motion.max_joint_step(),
            gripper_step,
            dt: config.motion.physics_dt,
            cube_initial: params.cube_initial,
            cube_size: params.cube_size,
            target: params.target_position,
            cameras: SyntheticCamera::rig(&config.logging.cameras),
            schedule: config.run.clone(),
            joints: config.robot.default_joint_positions.clone(),
            targets: config.robot.default_joint_positions.clone(),
            cube: params.cube_initial,
            grip_offset: None,
            time: SimTime::new(),
            ticks: 0,
            playing: true,
            running: true,
        }
    }

    /// Start or resume the timeline.
    pub fn play(&mut self) {
        if !self.playing {
            info!(tick = self.ticks, "simulation playing");
        }
        self.playing = true;
    }

    /// Stop the timeline. Joints freeze until [`play`](Self::play).
    pub fn stop(&mut self) {
        if self.playing {
            info!(tick = self.ticks, "simulation stopped");
        }
        self.playing = false;
    }

    /// Make [`is_running`](SimulationHost::is_running) report `false`.
    pub fn request_shutdown(&mut self) {
        self.running = false;
    }

    pub fn end_effector(&self) -> Isometry3<f32> {
        self.arm_positions().map_or_else(
            || self.chain.forward_kinematics(&vec![0.0; self.chain.dof()]),
            |q| self.chain.forward_kinematics(&q),
        )
    }

    pub const fn cube(&self) -> &Pose {
        &self.cube
    }

    pub const fn is_carrying(&self) -> bool {
        self.grip_offset.is_some()
    }

    pub fn joint_positions(&self) -> &[f32] {
        &self.joints
    }

    pub const fn time(&self) -> SimTime {
        self.time
    }

    /// Host ticks stepped, playing or not.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    fn arm_positions(&self) -> Option<Vec<f32>> {
        self.arm_indices
            .iter()
            .map(|&i| self.joints.get(i).copied())
            .collect()
    }

    fn is_gripping(&self) -> bool {
        self.gripper_indices
            .iter()
            .zip(&self.gripper_closed)
            .all(|(&i, &closed)| {
                self.joints
                    .get(i)
                    .is_some_and(|&q| (q - closed).abs() < GRIP_TOLERANCE)
            })
    }

    /// Move every joint toward its target by at most one step.
    fn track_targets(&mut self) {
        for (i, (q, target)) in self.joints.iter_mut().zip(&self.targets).enumerate() {
            let max_step = if self.gripper_indices.contains(&i) {
                self.gripper_step
            } else {
                self.arm_step
            };
            *q += (target - *q).clamp(-max_step, max_step);
        }
    }

    fn update_grip(&mut self) {
        let ee = self.end_effector().translation.vector;
        let cube = self.cube.translation();
        match (self.grip_offset, self.is_gripping()) {
            (None, true) if (cube - ee).norm() < GRASP_RADIUS => {
                debug!(tick = self.ticks, "cube grasped");
                self.grip_offset = Some(cube - ee);
            }
            (Some(_), false) => {
                debug!(tick = self.ticks, "cube released");
                self.grip_offset = None;
            }
            _ => {}
        }
        if let Some(offset) = self.grip_offset {
            let carried = ee + offset;
            self.cube.position = [carried.x, carried.y, carried.z];
        }
    }

    fn follow_schedule(&mut self) {
        if self.schedule.stop_at_tick == Some(self.ticks) {
            self.stop();
        }
        if self.schedule.resume_at_tick == Some(self.ticks) {
            self.play();
        }
    }

    fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            end_effector: self.end_effector().translation.vector,
            cube: self.cube.translation(),
            cube_size: self.cube_size,
            target: self.target,
        }
    }
}

impl SimulationHost for KinematicWorld {
    fn step(&mut self) {
        self.ticks += 1;
        self.follow_schedule();
        if !self.playing {
            return;
        }
        self.track_targets();
        self.update_grip();
        self.time.advance_secs(self.dt);
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn is_stopped(&self) -> bool {
        !self.playing
    }

    fn reset(&mut self) {
        debug!(tick = self.ticks, time = %self.time, "world reset");
        self.joints.clone_from(&self.default_joints);
        self.targets.clone_from(&self.default_joints);
        self.cube = self.cube_initial;
        self.grip_offset = None;
        self.time.reset();
    }

    fn observations(&self) -> SceneObservations {
        let ee = Pose::from_isometry(&self.end_effector());
        SceneObservations::new()
            .with(&self.object_name, keys::POSITION, self.cube.position.to_vec())
            .with(&self.object_name, keys::ORIENTATION, self.cube.orientation.to_vec())
            .with(&self.object_name, keys::TARGET_POSITION, self.target.as_slice().to_vec())
            .with(&self.robot_name, keys::JOINT_POSITIONS, self.joints.clone())
            .with(&self.robot_name, keys::END_EFFECTOR_POSITION, ee.position.to_vec())
            .with(
                &self.robot_name,
                keys::END_EFFECTOR_ORIENTATION,
                ee.orientation.to_vec(),
            )
    }

    fn apply_action(&mut self, action: &Action) {
        for (i, q) in action.position_targets() {
            if let Some(target) = self.targets.get_mut(i) {
                *target = q;
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        let dt = self.dt as f32;
        for (i, v) in action.velocity_targets() {
            if let (Some(target), Some(q)) = (self.targets.get_mut(i), self.joints.get(i)) {
                *target = q + v * dt;
            }
        }
    }

    fn gripper_positions(&self) -> Vec<f32> {
        self.gripper_indices
            .iter()
            .filter_map(|&i| self.joints.get(i).copied())
            .collect()
    }

    fn capture(&mut self, camera: &str) -> Option<ImageFrame> {
        let camera = self.cameras.iter().find(|c| c.label() == camera)?;
        Some(camera.render(&self.snapshot(), self.time.nanos()))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "KinematicWorld"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
