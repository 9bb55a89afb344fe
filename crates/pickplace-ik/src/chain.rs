//! Serial kinematic chain built from configured joint specs.
//!
//! A [`KinematicChain`] is an ordered list of actuated joints from the robot
//! base to the flange, plus a fixed offset to the end-effector frame. It
//! stores everything forward kinematics and the geometric Jacobian need.

use nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use pickplace_core::config::{JointSpec, RobotConfig};

/// A single joint in the kinematic chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,
    /// Static transform from the previous joint frame to this joint frame.
    pub origin: Isometry3<f32>,
    /// Joint axis in the joint's local frame.
    pub axis: UnitVector3<f32>,
    /// Whether this is a prismatic joint (false = revolute).
    pub is_prismatic: bool,
    pub lower_limit: f32,
    pub upper_limit: f32,
}

impl ChainJoint {
    fn from_spec(spec: &JointSpec) -> Self {
        let translation = Translation3::new(spec.origin[0], spec.origin[1], spec.origin[2]);
        let rotation = UnitQuaternion::from_matrix(&rotation_matrix_from_rpy(
            spec.rpy[0],
            spec.rpy[1],
            spec.rpy[2],
        ));
        Self {
            name: spec.name.clone(),
            origin: Isometry3::from_parts(translation, rotation),
            axis: UnitVector3::new_normalize(Vector3::from(spec.axis)),
            is_prismatic: spec.prismatic,
            lower_limit: spec.lower,
            upper_limit: spec.upper,
        }
    }
}

/// An ordered kinematic chain from base to end-effector, expressed in the
/// world frame.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    /// World pose of the robot base.
    base: Isometry3<f32>,
    joints: Vec<ChainJoint>,
    /// Transform from the last joint frame to the end-effector frame.
    ee_offset: Isometry3<f32>,
}

impl KinematicChain {
    pub fn new(base: Isometry3<f32>, specs: &[JointSpec], ee_offset: Vector3<f32>) -> Self {
        Self {
            base,
            joints: specs.iter().map(ChainJoint::from_spec).collect(),
            ee_offset: Isometry3::translation(ee_offset.x, ee_offset.y, ee_offset.z),
        }
    }

    /// Chain of the configured arm, mounted at `robot.base_position`.
    pub fn from_robot(robot: &RobotConfig) -> Self {
        let [x, y, z] = robot.base_position;
        Self::new(
            Isometry3::translation(x, y, z),
            &robot.joints,
            Vector3::from(robot.end_effector_offset),
        )
    }

    /// Number of actuated degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// Forward kinematics: joint positions -> end-effector pose in the world.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`.
    pub fn forward_kinematics(&self, q: &[f32]) -> Isometry3<f32> {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = self.base;
        for (joint, &position) in self.joints.iter().zip(q) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }
        transform * self.ee_offset
    }

    /// Joint origins and axes in the world frame, plus the end-effector
    /// position, for Jacobian computation.
    pub fn joint_frames(&self, q: &[f32]) -> (Vec<Vector3<f32>>, Vec<Vector3<f32>>, Vector3<f32>) {
        assert_eq!(q.len(), self.dof());

        let mut transform = self.base;
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (joint, &position) in self.joints.iter().zip(q) {
            transform *= joint.origin;
            // Frame before the joint's own motion.
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }

        let ee_pos = (transform * self.ee_offset).translation.vector;
        (origins, axes, ee_pos)
    }

    /// Clamp joint positions to their limits.
    pub fn clamp_joints(&self, q: &mut [f32]) {
        for (value, joint) in q.iter_mut().zip(&self.joints) {
            *value = value.clamp(joint.lower_limit, joint.upper_limit);
        }
    }
}

/// Rotation matrix from roll-pitch-yaw (intrinsic XYZ / extrinsic ZYX).
fn rotation_matrix_from_rpy(roll: f32, pitch: f32, yaw: f32) -> Matrix3<f32> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    Matrix3::new(
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr,
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr,
        -sp,
        cp * sr,
        cp * cr,
    )
}

fn joint_transform(axis: &UnitVector3<f32>, is_prismatic: bool, position: f32) -> Isometry3<f32> {
    if is_prismatic {
        Isometry3::from_parts(
            Translation3::from(axis.into_inner() * position),
            UnitQuaternion::identity(),
        )
    } else {
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, position),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn planar_two_link() -> KinematicChain {
        let specs = [
            JointSpec::revolute("shoulder", [0.0, 0.0, 0.05], [0.0, 0.0, 1.0], -2.617, 2.617),
            JointSpec::revolute("elbow", [0.0, 0.0, 0.3], [0.0, 0.0, 1.0], -2.094, 2.094),
        ];
        KinematicChain::new(Isometry3::identity(), &specs, Vector3::new(0.0, 0.0, 0.25))
    }

    #[test]
    fn default_robot_chain_has_six_joints() {
        let chain = KinematicChain::from_robot(&RobotConfig::default());
        assert_eq!(chain.dof(), 6);
        assert_eq!(chain.joint_names()[0], "shoulder_pan");
    }

    #[test]
    fn fk_zero_position_stacks_offsets() {
        let chain = planar_two_link();
        let ee = chain.forward_kinematics(&[0.0, 0.0]);
        assert_relative_eq!(ee.translation.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ee.translation.z, 0.6, epsilon = 1e-5);
    }

    #[test]
    fn fk_includes_base_transform() {
        let robot = RobotConfig::default();
        let chain = KinematicChain::from_robot(&robot);
        let ee = chain.forward_kinematics(&[0.0; 6]);
        // 0.5 base + 0.15 + 0.1 + 0.6 + 0.5 + 0.1 + 0.1 + 0.1 flange
        assert_relative_eq!(ee.translation.z, 2.15, epsilon = 1e-4);
        assert_relative_eq!(ee.translation.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn shoulder_pitch_tilts_arm_forward() {
        let robot = RobotConfig::default();
        let chain = KinematicChain::from_robot(&robot);
        let mut q = [0.0; 6];
        q[1] = std::f32::consts::FRAC_PI_2;
        let ee = chain.forward_kinematics(&q);
        // Everything above the shoulder now points along +X.
        assert_relative_eq!(ee.translation.z, 0.75, epsilon = 1e-4);
        assert_relative_eq!(ee.translation.x, 1.4, epsilon = 1e-4);
    }

    #[test]
    fn joint_frames_match_fk() {
        let chain = KinematicChain::from_robot(&RobotConfig::default());
        let q = [0.3, 0.4, 0.9, -0.2, 1.1, 0.5];
        let (origins, axes, ee_pos) = chain.joint_frames(&q);
        assert_eq!(origins.len(), 6);
        assert_eq!(axes.len(), 6);
        let ee = chain.forward_kinematics(&q);
        assert_relative_eq!(ee_pos, ee.translation.vector, epsilon = 1e-5);
    }

    #[test]
    fn clamp_joints_respects_limits() {
        let chain = planar_two_link();
        let mut q = [5.0, -5.0];
        chain.clamp_joints(&mut q);
        assert_relative_eq!(q[0], 2.617, epsilon = 1e-5);
        assert_relative_eq!(q[1], -2.094, epsilon = 1e-5);
    }

    #[test]
    fn rpy_identity_is_identity_matrix() {
        let m = rotation_matrix_from_rpy(0.0, 0.0, 0.0);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn prismatic_joint_translates_along_axis() {
        let mut spec = JointSpec::revolute("slide", [0.0; 3], [1.0, 0.0, 0.0], 0.0, 1.0);
        spec.prismatic = true;
        let chain = KinematicChain::new(Isometry3::identity(), &[spec], Vector3::zeros());
        let ee = chain.forward_kinematics(&[0.4]);
        assert_relative_eq!(ee.translation.x, 0.4, epsilon = 1e-6);
    }
}
