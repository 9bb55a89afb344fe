//! Parallel gripper command and state helpers.

use pickplace_core::config::GripperConfig;
use pickplace_core::types::{Action, GripperCommand, JointState};

/// Two-finger gripper addressed through a subset of the articulation joints.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelGripper {
    joint_indices: Vec<usize>,
    opened: Vec<f32>,
    closed: Vec<f32>,
}

impl ParallelGripper {
    pub fn new(joint_indices: Vec<usize>, opened: Vec<f32>, closed: Vec<f32>) -> Self {
        assert_eq!(joint_indices.len(), opened.len());
        assert_eq!(joint_indices.len(), closed.len());
        Self {
            joint_indices,
            opened,
            closed,
        }
    }

    pub fn from_config(config: &GripperConfig) -> Self {
        Self::new(
            config.joint_indices.clone(),
            config.opened_positions.clone(),
            config.closed_positions.clone(),
        )
    }

    pub fn joint_indices(&self) -> &[usize] {
        &self.joint_indices
    }

    /// Joint targets for `command`, tagged with the command itself.
    pub fn forward(&self, command: GripperCommand) -> Action {
        let targets = match command {
            GripperCommand::Open => &self.opened,
            GripperCommand::Close => &self.closed,
        };
        Action::positions(self.joint_indices.clone(), targets.clone()).with_gripper(command)
    }

    /// Current finger positions, or `None` if `joints` is too short.
    pub fn positions(&self, joints: &JointState) -> Option<Vec<f32>> {
        joints.select(&self.joint_indices)
    }

    /// Every finger within `tolerance` of its closed position.
    pub fn is_closed(&self, positions: &[f32], tolerance: f32) -> bool {
        within(positions, &self.closed, tolerance)
    }

    /// Every finger within `tolerance` of its opened position.
    pub fn is_open(&self, positions: &[f32], tolerance: f32) -> bool {
        within(positions, &self.opened, tolerance)
    }
}

impl Default for ParallelGripper {
    fn default() -> Self {
        Self::from_config(&GripperConfig::default())
    }
}

fn within(positions: &[f32], goal: &[f32], tolerance: f32) -> bool {
    positions.len() == goal.len()
        && positions
            .iter()
            .zip(goal)
            .all(|(p, g)| (p - g).abs() <= tolerance)
}
