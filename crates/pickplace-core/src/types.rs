use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position plus orientation of a rigid body in the world frame.
///
/// The orientation is stored as a `[w, x, y, z]` quaternion, the layout
/// simulation hosts usually report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    /// Identity orientation in `[w, x, y, z]` order.
    pub const IDENTITY_ORIENTATION: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

    pub const fn new(position: [f32; 3], orientation: [f32; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at `position` with identity orientation.
    pub const fn from_position(position: [f32; 3]) -> Self {
        Self::new(position, Self::IDENTITY_ORIENTATION)
    }

    pub fn from_isometry(iso: &Isometry3<f32>) -> Self {
        let t = iso.translation.vector;
        let q = iso.rotation.quaternion();
        Self::new([t.x, t.y, t.z], [q.w, q.i, q.j, q.k])
    }

    pub fn translation(&self) -> Vector3<f32> {
        Vector3::from(self.position)
    }

    /// Orientation as a normalized unit quaternion.
    pub fn rotation(&self) -> UnitQuaternion<f32> {
        let [w, x, y, z] = self.orientation;
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
    }

    pub fn to_isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.translation()), self.rotation())
    }

    /// Euclidean distance between this pose's position and `point`.
    pub fn distance_to(&self, point: &Vector3<f32>) -> f32 {
        (self.translation() - point).norm()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position([0.0; 3])
    }
}

// ---------------------------------------------------------------------------
// JointState
// ---------------------------------------------------------------------------

/// Ordered joint positions of an articulation, gripper joints included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointState {
    positions: Vec<f32>,
}

impl JointState {
    pub const fn new(positions: Vec<f32>) -> Self {
        Self { positions }
    }

    pub fn zeros(dof: usize) -> Self {
        Self {
            positions: vec![0.0; dof],
        }
    }

    pub const fn len(&self) -> usize {
        self.positions.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.positions
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.positions
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.positions.get(index).copied()
    }

    /// Positions at `indices`, or `None` if any index is out of range.
    pub fn select(&self, indices: &[usize]) -> Option<Vec<f32>> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.positions
    }
}

impl std::ops::Index<usize> for JointState {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        &self.positions[i]
    }
}

impl From<Vec<f32>> for JointState {
    fn from(positions: Vec<f32>) -> Self {
        Self::new(positions)
    }
}

// ---------------------------------------------------------------------------
// GripperCommand
// ---------------------------------------------------------------------------

/// Discrete command for a parallel gripper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripperCommand {
    Open,
    Close,
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Joint-space command for one control tick.
///
/// Mirrors an articulation action: each of `joint_positions` and
/// `joint_velocities` is optional, and `joint_indices` names the joints the
/// values apply to (`None` means "all joints, in order").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub joint_positions: Option<Vec<f32>>,
    pub joint_velocities: Option<Vec<f32>>,
    pub joint_indices: Option<Vec<usize>>,
    pub gripper: Option<GripperCommand>,
}

impl Action {
    /// Absolute position targets for the given joints.
    pub fn positions(indices: Vec<usize>, positions: Vec<f32>) -> Self {
        Self {
            joint_positions: Some(positions),
            joint_indices: Some(indices),
            ..Self::default()
        }
    }

    /// An action that commands nothing.
    pub fn hold() -> Self {
        Self::default()
    }

    /// Builder: attach a gripper command.
    #[must_use]
    pub const fn with_gripper(mut self, command: GripperCommand) -> Self {
        self.gripper = Some(command);
        self
    }

    /// `true` if the action carries no joint targets.
    pub const fn is_empty(&self) -> bool {
        self.joint_positions.is_none() && self.joint_velocities.is_none()
    }

    /// Joint index that value `k` of this action applies to.
    fn index_of(&self, k: usize) -> usize {
        self.joint_indices
            .as_ref()
            .and_then(|indices| indices.get(k).copied())
            .unwrap_or(k)
    }

    /// `(joint index, target position)` pairs.
    pub fn position_targets(&self) -> Vec<(usize, f32)> {
        self.joint_positions
            .as_ref()
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(k, &v)| (self.index_of(k), v))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(joint index, target velocity)` pairs.
    pub fn velocity_targets(&self) -> Vec<(usize, f32)> {
        self.joint_velocities
            .as_ref()
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(k, &v)| (self.index_of(k), v))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Combine two actions addressing disjoint joints.
    ///
    /// Values without explicit indices are expanded to `0..len` first.
    /// Velocity commands survive only when neither side carries positions.
    /// The gripper command of `other` wins when both carry one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let gripper = other.gripper.or(self.gripper);
        let mut targets = self.position_targets();
        targets.extend(other.position_targets());

        if targets.is_empty() {
            let mut velocities = self.velocity_targets();
            velocities.extend(other.velocity_targets());
            let (indices, values): (Vec<usize>, Vec<f32>) = velocities.into_iter().unzip();
            return Self {
                joint_positions: None,
                joint_velocities: (!values.is_empty()).then_some(values),
                joint_indices: (!indices.is_empty()).then_some(indices),
                gripper,
            };
        }

        let (indices, values): (Vec<usize>, Vec<f32>) = targets.into_iter().unzip();
        Self {
            joint_positions: Some(values),
            joint_velocities: None,
            joint_indices: Some(indices),
            gripper,
        }
    }
}

// ---------------------------------------------------------------------------
// ImageFrame
// ---------------------------------------------------------------------------

/// Raw RGB8 pixel data from one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFrame {
    /// Simulation timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Camera label identifying which camera produced this frame.
    pub label: String,
    /// Row-major RGB8 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pose_default_is_identity() {
        let pose = Pose::default();
        assert_eq!(pose.position, [0.0; 3]);
        assert_eq!(pose.orientation, Pose::IDENTITY_ORIENTATION);
        assert_relative_eq!(pose.rotation().angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn pose_isometry_roundtrip() {
        let rot = UnitQuaternion::from_euler_angles(0.0, std::f32::consts::PI, 0.0);
        let iso = Isometry3::from_parts(Translation3::new(0.6, 0.3, 0.85), rot);
        let pose = Pose::from_isometry(&iso);
        assert_relative_eq!(pose.position[2], 0.85, epsilon = 1e-6);
        let back = pose.to_isometry();
        assert_relative_eq!(back.rotation.angle_to(&rot), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn pose_distance() {
        let pose = Pose::from_position([1.0, 0.0, 0.0]);
        assert_relative_eq!(pose.distance_to(&Vector3::new(1.0, 3.0, 4.0)), 5.0);
    }

    #[test]
    fn joint_state_select() {
        let js = JointState::new(vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(js.select(&[3, 0]), Some(vec![0.4, 0.1]));
        assert_eq!(js.select(&[1, 9]), None);
        assert_relative_eq!(js[2], 0.3);
    }

    #[test]
    fn joint_state_serializes_as_plain_array() {
        let js = JointState::new(vec![1.0, -1.0]);
        assert_eq!(serde_json::to_string(&js).unwrap(), "[1.0,-1.0]");
    }

    #[test]
    fn action_hold_is_empty() {
        assert!(Action::hold().is_empty());
        assert!(!Action::positions(vec![0], vec![1.0]).is_empty());
    }

    #[test]
    fn action_targets_without_indices_use_order() {
        let action = Action {
            joint_positions: Some(vec![0.5, 0.6]),
            ..Action::default()
        };
        assert_eq!(action.position_targets(), vec![(0, 0.5), (1, 0.6)]);
    }

    #[test]
    fn action_merge_concatenates_disjoint_joints() {
        let arm = Action::positions(vec![0, 1], vec![0.1, 0.2]);
        let gripper =
            Action::positions(vec![6, 7], vec![0.628, -0.628]).with_gripper(GripperCommand::Close);
        let merged = arm.merge(gripper);
        assert_eq!(merged.joint_indices, Some(vec![0, 1, 6, 7]));
        assert_eq!(merged.joint_positions, Some(vec![0.1, 0.2, 0.628, -0.628]));
        assert_eq!(merged.gripper, Some(GripperCommand::Close));
        assert!(merged.joint_velocities.is_none());
    }

    #[test]
    fn action_merge_with_hold_keeps_other() {
        let arm = Action::positions(vec![2], vec![1.5]);
        let merged = Action::hold().merge(arm.clone());
        assert_eq!(merged, arm);
    }

    #[test]
    fn gripper_command_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&GripperCommand::Close).unwrap(),
            "\"close\""
        );
    }
}
