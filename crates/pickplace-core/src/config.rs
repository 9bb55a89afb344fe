use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_task_name() -> String {
    "cs66_pick_place".into()
}
fn default_cube_name() -> String {
    "cube".into()
}
fn default_robot_name() -> String {
    "cs_66".into()
}
const fn default_cube_position() -> [f32; 3] {
    [0.6, 0.3, 0.85]
}
const fn default_orientation() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}
const fn default_target_position() -> [f32; 3] {
    [0.8, 0.7, 1.0]
}
const fn default_cube_size() -> [f32; 3] {
    [0.1330, 0.1330, 0.0715]
}
const fn default_approach_height() -> f32 {
    0.15
}
const fn default_position_tolerance() -> f32 {
    0.01
}
const fn default_gripper_tolerance() -> f32 {
    0.02
}
fn default_gripper_indices() -> Vec<usize> {
    vec![6, 7]
}
fn default_gripper_opened() -> Vec<f32> {
    vec![0.0, 0.0]
}
fn default_gripper_closed() -> Vec<f32> {
    vec![0.628, -0.628]
}
const fn default_dof() -> usize {
    14
}
fn default_arm_indices() -> Vec<usize> {
    (0..6).collect()
}
fn default_joint_positions() -> Vec<f32> {
    let mut q = vec![0.0; default_dof()];
    q[1] = 0.5;
    q[2] = 1.0;
    q[4] = 1.2;
    q
}
const fn default_base_position() -> [f32; 3] {
    [0.0, 0.0, 0.5]
}
const fn default_flange_offset() -> [f32; 3] {
    [0.0, 0.0, 0.1]
}
fn default_chain() -> Vec<JointSpec> {
    use std::f32::consts::PI;
    vec![
        JointSpec::revolute("shoulder_pan", [0.0, 0.0, 0.15], [0.0, 0.0, 1.0], -PI, PI),
        JointSpec::revolute("shoulder_lift", [0.0, 0.0, 0.1], [0.0, 1.0, 0.0], -2.0, 2.0),
        JointSpec::revolute("elbow", [0.0, 0.0, 0.6], [0.0, 1.0, 0.0], -2.6, 2.6),
        JointSpec::revolute("wrist_1", [0.0, 0.0, 0.5], [0.0, 0.0, 1.0], -PI, PI),
        JointSpec::revolute("wrist_2", [0.0, 0.0, 0.1], [0.0, 1.0, 0.0], -2.2, 2.2),
        JointSpec::revolute("wrist_3", [0.0, 0.0, 0.1], [0.0, 0.0, 1.0], -PI, PI),
    ]
}
const fn default_physics_dt() -> f64 {
    1.0 / 60.0
}
const fn default_max_joint_speed() -> f32 {
    1.5
}
const fn default_max_iterations() -> u32 {
    100
}
const fn default_damping() -> f32 {
    0.05
}
const fn default_ik_tolerance() -> f32 {
    1e-4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_primary_file() -> String {
    "simulation_logs.json".into()
}
fn default_secondary_file() -> String {
    "simulation_logs.csv".into()
}
fn default_image_dir() -> String {
    "images".into()
}
const fn default_capture_interval() -> u64 {
    10
}
fn default_cameras() -> Vec<CameraConfig> {
    vec![
        CameraConfig::new("camera1", 64, 64),
        CameraConfig::new("camera2", 64, 64),
    ]
}

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

/// Construction parameters of the pick-and-place task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_name")]
    pub name: String,
    /// Key of the manipulated object in scene observations.
    #[serde(default = "default_cube_name")]
    pub cube_name: String,
    /// Key of the robot in scene observations.
    #[serde(default = "default_robot_name")]
    pub robot_name: String,
    /// Initial cube position. Defaults to `(0.6, 0.3, 0.85)` when unset.
    #[serde(default)]
    pub cube_initial_position: Option<[f32; 3]>,
    /// Initial cube orientation `[w, x, y, z]`. Defaults to identity when unset.
    #[serde(default)]
    pub cube_initial_orientation: Option<[f32; 4]>,
    /// Placing position. Constant for the task's lifetime.
    #[serde(default = "default_target_position")]
    pub target_position: [f32; 3],
    /// Cube edge lengths (m).
    #[serde(default = "default_cube_size")]
    pub cube_size: [f32; 3],
    /// Offset added to every end-effector goal position (gripper geometry).
    #[serde(default)]
    pub end_effector_offset: [f32; 3],
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: default_task_name(),
            cube_name: default_cube_name(),
            robot_name: default_robot_name(),
            cube_initial_position: None,
            cube_initial_orientation: None,
            target_position: default_target_position(),
            cube_size: default_cube_size(),
            end_effector_offset: [0.0; 3],
        }
    }
}

impl TaskConfig {
    /// Initial cube position, falling back to the task default.
    pub fn cube_position(&self) -> [f32; 3] {
        self.cube_initial_position
            .unwrap_or_else(default_cube_position)
    }

    /// Initial cube orientation, falling back to identity.
    pub fn cube_orientation(&self) -> [f32; 4] {
        self.cube_initial_orientation
            .unwrap_or_else(default_orientation)
    }
}

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

/// Tuning of the phase sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Clearance above the object/target for the approach and transport goals (m).
    #[serde(default = "default_approach_height")]
    pub approach_height: f32,
    /// End-effector distance below which a goal counts as reached (m).
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f32,
    /// Per-joint distance below which the gripper counts as opened/closed (rad).
    #[serde(default = "default_gripper_tolerance")]
    pub gripper_tolerance: f32,
    /// Fixed goal orientation `[w, x, y, z]`. `None` leaves it unconstrained.
    #[serde(default)]
    pub end_effector_orientation: Option<[f32; 4]>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            approach_height: default_approach_height(),
            position_tolerance: default_position_tolerance(),
            gripper_tolerance: default_gripper_tolerance(),
            end_effector_orientation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// GripperConfig
// ---------------------------------------------------------------------------

/// Parallel gripper joint layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GripperConfig {
    /// Articulation indices of the actuated finger joints.
    #[serde(default = "default_gripper_indices")]
    pub joint_indices: Vec<usize>,
    #[serde(default = "default_gripper_opened")]
    pub opened_positions: Vec<f32>,
    #[serde(default = "default_gripper_closed")]
    pub closed_positions: Vec<f32>,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            joint_indices: default_gripper_indices(),
            opened_positions: default_gripper_opened(),
            closed_positions: default_gripper_closed(),
        }
    }
}

// ---------------------------------------------------------------------------
// RobotConfig
// ---------------------------------------------------------------------------

/// One actuated joint of the arm's kinematic chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    /// Translation from the previous joint frame (m).
    pub origin: [f32; 3],
    /// Roll-pitch-yaw of the joint frame relative to the previous one (rad).
    #[serde(default)]
    pub rpy: [f32; 3],
    /// Rotation axis in the joint frame.
    pub axis: [f32; 3],
    pub lower: f32,
    pub upper: f32,
    #[serde(default)]
    pub prismatic: bool,
}

impl JointSpec {
    pub fn revolute(name: &str, origin: [f32; 3], axis: [f32; 3], lower: f32, upper: f32) -> Self {
        Self {
            name: name.to_string(),
            origin,
            rpy: [0.0; 3],
            axis,
            lower,
            upper,
            prismatic: false,
        }
    }
}

/// Articulation description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Total degrees of freedom, gripper and passive joints included.
    #[serde(default = "default_dof")]
    pub dof: usize,
    /// Articulation indices of the arm joints, in chain order.
    #[serde(default = "default_arm_indices")]
    pub arm_joint_indices: Vec<usize>,
    /// Joint positions restored on reset.
    #[serde(default = "default_joint_positions")]
    pub default_joint_positions: Vec<f32>,
    /// World position of the robot base.
    #[serde(default = "default_base_position")]
    pub base_position: [f32; 3],
    /// Offset from the last arm joint to the end-effector frame.
    #[serde(default = "default_flange_offset")]
    pub end_effector_offset: [f32; 3],
    /// Arm kinematic chain from base to flange.
    #[serde(default = "default_chain")]
    pub joints: Vec<JointSpec>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            dof: default_dof(),
            arm_joint_indices: default_arm_indices(),
            default_joint_positions: default_joint_positions(),
            base_position: default_base_position(),
            end_effector_offset: default_flange_offset(),
            joints: default_chain(),
        }
    }
}

// ---------------------------------------------------------------------------
// MotionConfig
// ---------------------------------------------------------------------------

/// Motion generation and stepping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Control/physics timestep in seconds (default: 1/60).
    #[serde(default = "default_physics_dt")]
    pub physics_dt: f64,
    /// Joint speed limit used to bound per-tick motion (rad/s).
    #[serde(default = "default_max_joint_speed")]
    pub max_joint_speed: f32,
    /// IK solver iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// IK damping factor.
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// IK position convergence tolerance (m).
    #[serde(default = "default_ik_tolerance")]
    pub ik_tolerance: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            physics_dt: default_physics_dt(),
            max_joint_speed: default_max_joint_speed(),
            max_iterations: default_max_iterations(),
            damping: default_damping(),
            ik_tolerance: default_ik_tolerance(),
        }
    }
}

impl MotionConfig {
    /// Largest joint displacement allowed in one tick.
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_joint_step(&self) -> f32 {
        self.max_joint_speed * self.physics_dt as f32
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// A camera whose frames are captured during logging runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl CameraConfig {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
        }
    }
}

/// Where and how the per-tick log and camera frames are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct LoggingConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Structured dump file name, relative to `output_dir`.
    #[serde(default = "default_primary_file")]
    pub primary_file: String,
    /// Tabular export file name, relative to `output_dir`.
    #[serde(default = "default_secondary_file")]
    pub secondary_file: String,
    /// Image root, relative to `output_dir`. One subdirectory per camera.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    /// Capture one frame per camera every this many ticks.
    #[serde(default = "default_capture_interval")]
    pub capture_interval: u64,
    /// Emit a progress event every this many ticks. `None` disables it.
    #[serde(default)]
    pub progress_interval: Option<u64>,
    /// Upper bound on recorded ticks. `None` means unbounded.
    #[serde(default)]
    pub max_records: Option<usize>,
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            primary_file: default_primary_file(),
            secondary_file: default_secondary_file(),
            image_dir: default_image_dir(),
            capture_interval: default_capture_interval(),
            progress_interval: None,
            max_records: None,
            cameras: default_cameras(),
        }
    }
}

impl LoggingConfig {
    pub fn primary_path(&self) -> PathBuf {
        self.output_dir.join(&self.primary_file)
    }

    pub fn secondary_path(&self) -> PathBuf {
        self.output_dir.join(&self.secondary_file)
    }

    /// Directory holding one camera's frames.
    pub fn camera_dir(&self, label: &str) -> PathBuf {
        self.output_dir.join(&self.image_dir).join(label)
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Driver loop termination and scripted play/stop events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Resource)]
pub struct RunConfig {
    /// Exit after the first tick.
    #[serde(default)]
    pub test_mode: bool,
    /// Safety cap on ticks. `None` runs until done.
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Stop the simulation timeline at this host tick.
    #[serde(default)]
    pub stop_at_tick: Option<u64>,
    /// Resume the timeline at this host tick.
    #[serde(default)]
    pub resume_at_tick: Option<u64>,
}

// ---------------------------------------------------------------------------
// PickPlaceConfig
// ---------------------------------------------------------------------------

/// Complete configuration of one pick-and-place run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Resource)]
pub struct PickPlaceConfig {
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub gripper: GripperConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl PickPlaceConfig {
    /// Validate configuration. Returns Err on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motion.physics_dt <= 0.0 {
            return Err(ConfigError::InvalidPhysicsDt(self.motion.physics_dt));
        }
        if self.motion.max_joint_speed <= 0.0 {
            return Err(ConfigError::invalid("motion.max_joint_speed", "must be > 0"));
        }
        if self.controller.position_tolerance <= 0.0 {
            return Err(ConfigError::invalid("controller.position_tolerance", "must be > 0"));
        }
        if self.controller.gripper_tolerance <= 0.0 {
            return Err(ConfigError::invalid("controller.gripper_tolerance", "must be > 0"));
        }
        if self.logging.capture_interval == 0 {
            return Err(ConfigError::invalid("logging.capture_interval", "must be > 0"));
        }
        if self.logging.progress_interval == Some(0) {
            return Err(ConfigError::invalid("logging.progress_interval", "must be > 0"));
        }

        let gripper = &self.gripper;
        if gripper.joint_indices.is_empty()
            || gripper.opened_positions.len() != gripper.joint_indices.len()
            || gripper.closed_positions.len() != gripper.joint_indices.len()
        {
            return Err(ConfigError::invalid(
                "gripper",
                "joint_indices, opened_positions and closed_positions must have equal non-zero length",
            ));
        }

        let robot = &self.robot;
        if robot.default_joint_positions.len() != robot.dof {
            return Err(ConfigError::invalid(
                "robot.default_joint_positions",
                format!("expected {} values, got {}", robot.dof, robot.default_joint_positions.len()),
            ));
        }
        if let Some(&i) = robot
            .arm_joint_indices
            .iter()
            .chain(&gripper.joint_indices)
            .find(|&&i| i >= robot.dof)
        {
            return Err(ConfigError::invalid(
                "joint index",
                format!("{i} out of range for {} DOF", robot.dof),
            ));
        }
        if robot.arm_joint_indices.iter().any(|i| gripper.joint_indices.contains(i)) {
            return Err(ConfigError::Incompatible(
                "arm and gripper joint indices overlap".into(),
            ));
        }
        if robot.arm_joint_indices.len() != robot.joints.len() {
            return Err(ConfigError::Incompatible(format!(
                "{} arm joint indices but {} chain joints",
                robot.arm_joint_indices.len(),
                robot.joints.len()
            )));
        }
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PickPlaceConfig::default().validate().unwrap();
    }

    #[test]
    fn task_defaults_match_scene() {
        let task = TaskConfig::default();
        assert_eq!(task.cube_position(), [0.6, 0.3, 0.85]);
        assert_eq!(task.cube_orientation(), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(task.target_position, [0.8, 0.7, 1.0]);
        assert_eq!(task.cube_size, [0.1330, 0.1330, 0.0715]);
        assert_eq!(task.end_effector_offset, [0.0; 3]);
    }

    #[test]
    fn explicit_cube_position_overrides_default() {
        let task = TaskConfig {
            cube_initial_position: Some([0.1, 0.2, 0.3]),
            ..TaskConfig::default()
        };
        assert_eq!(task.cube_position(), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn robot_defaults_have_fourteen_dof() {
        let robot = RobotConfig::default();
        assert_eq!(robot.dof, 14);
        assert_eq!(robot.default_joint_positions.len(), 14);
        assert_eq!(robot.joints.len(), robot.arm_joint_indices.len());
    }

    #[test]
    fn max_joint_step_scales_with_dt() {
        let motion = MotionConfig {
            physics_dt: 0.1,
            max_joint_speed: 2.0,
            ..MotionConfig::default()
        };
        assert!((motion.max_joint_step() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn toml_defaults_from_empty_document() {
        let cfg = PickPlaceConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PickPlaceConfig::default());
    }

    #[test]
    fn toml_partial_override() {
        let toml_str = r#"
            [task]
            target_position = [-0.3, 0.6, 0.7]

            [logging]
            output_dir = "data_cam"
            capture_interval = 5
            progress_interval = 50

            [run]
            test_mode = true
        "#;
        let cfg = PickPlaceConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.task.target_position, [-0.3, 0.6, 0.7]);
        assert_eq!(cfg.task.cube_name, "cube");
        assert_eq!(cfg.logging.output_dir, PathBuf::from("data_cam"));
        assert_eq!(cfg.logging.capture_interval, 5);
        assert_eq!(cfg.logging.progress_interval, Some(50));
        assert!(cfg.run.test_mode);
        assert_eq!(cfg.logging.cameras.len(), 2);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = PickPlaceConfig::default();
        let text = cfg.to_toml_string().unwrap();
        let back = PickPlaceConfig::from_toml_str(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pickplace.toml");
        std::fs::write(&path, "[motion]\nphysics_dt = 0.01\n").unwrap();
        let cfg = PickPlaceConfig::from_file(&path).unwrap();
        assert!((cfg.motion.physics_dt - 0.01).abs() < f64::EPSILON);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[motion]\nphysics_dt = -1.0\n").unwrap();
        assert!(matches!(
            PickPlaceConfig::from_file(&bad),
            Err(ConfigError::InvalidPhysicsDt(_))
        ));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let err = PickPlaceConfig::from_file("/nonexistent/pickplace.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn zero_capture_interval_rejected() {
        let mut cfg = PickPlaceConfig::default();
        cfg.logging.capture_interval = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.capture_interval"
        ));
    }

    #[test]
    fn gripper_length_mismatch_rejected() {
        let mut cfg = PickPlaceConfig::default();
        cfg.gripper.closed_positions = vec![0.628];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_joint_index_rejected() {
        let mut cfg = PickPlaceConfig::default();
        cfg.gripper.joint_indices = vec![6, 20];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overlapping_indices_rejected() {
        let mut cfg = PickPlaceConfig::default();
        cfg.gripper.joint_indices = vec![5, 6];
        assert!(matches!(cfg.validate(), Err(ConfigError::Incompatible(_))));
    }

    #[test]
    fn chain_length_mismatch_rejected() {
        let mut cfg = PickPlaceConfig::default();
        cfg.robot.joints.pop();
        assert!(matches!(cfg.validate(), Err(ConfigError::Incompatible(_))));
    }

    #[test]
    fn logging_paths_join_output_dir() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.primary_path(), PathBuf::from("data/simulation_logs.json"));
        assert_eq!(logging.secondary_path(), PathBuf::from("data/simulation_logs.csv"));
        assert_eq!(
            logging.camera_dir("camera1"),
            PathBuf::from("data/images/camera1")
        );
    }
}
