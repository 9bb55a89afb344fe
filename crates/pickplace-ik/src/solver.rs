//! Damped Least Squares (Levenberg-Marquardt) IK solver.
//!
//! Iteratively solves for joint positions that place the end-effector at an
//! [`EndEffectorTarget`], using the geometric Jacobian and the DLS
//! pseudoinverse `dq = J^T (J J^T + lambda^2 I)^-1 e`.

use nalgebra::{DMatrix, DVector, Isometry3, UnitQuaternion, Vector3};

use pickplace_core::config::MotionConfig;
use pickplace_core::traits::EndEffectorTarget;

use crate::chain::KinematicChain;

/// Configuration for the DLS solver.
#[derive(Debug, Clone)]
pub struct DlsConfig {
    pub max_iterations: u32,
    /// Position error tolerance (m).
    pub position_tolerance: f32,
    /// Orientation error tolerance (rad).
    pub angle_tolerance: f32,
    /// Damping factor (lambda). Higher is more robust near singularities but
    /// converges slower.
    pub damping: f32,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-3,
            damping: 0.05,
        }
    }
}

impl From<&MotionConfig> for DlsConfig {
    fn from(motion: &MotionConfig) -> Self {
        Self {
            max_iterations: motion.max_iterations,
            position_tolerance: motion.ik_tolerance,
            damping: motion.damping,
            ..Self::default()
        }
    }
}

/// Result of an IK solve.
#[derive(Debug, Clone)]
pub struct IkResult {
    pub joint_positions: Vec<f32>,
    /// Whether the solver converged within tolerance.
    pub converged: bool,
    pub iterations: u32,
    /// Final position error (m).
    pub position_error: f32,
    /// Final orientation error (rad). Zero for position-only targets.
    pub orientation_error: f32,
}

/// Pose error between the current end effector and the target.
struct PoseError {
    position: f32,
    orientation: f32,
    /// Stacked `[dx, dy, dz]` or `[dx, dy, dz, rx, ry, rz]`.
    vector: DVector<f32>,
}

/// Damped Least Squares IK solver.
#[derive(Debug, Clone)]
pub struct DlsSolver {
    config: DlsConfig,
}

impl DlsSolver {
    pub const fn new(config: DlsConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DlsConfig::default())
    }

    pub const fn config(&self) -> &DlsConfig {
        &self.config
    }

    /// Solve IK for `chain`, warm-started from `q_init`.
    ///
    /// # Panics
    ///
    /// Panics if `q_init.len() != chain.dof()`.
    pub fn solve(
        &self,
        chain: &KinematicChain,
        target: &EndEffectorTarget,
        q_init: &[f32],
    ) -> IkResult {
        assert_eq!(q_init.len(), chain.dof());

        let mut q = q_init.to_vec();
        let lambda_sq = self.config.damping * self.config.damping;

        for iteration in 0..self.config.max_iterations {
            let error = pose_error(&chain.forward_kinematics(&q), target);
            if self.within_tolerance(&error, target) {
                return self.result(q, true, iteration, &error);
            }

            let jacobian = compute_jacobian(chain, &q, target.orientation.is_some());
            let m = jacobian.nrows();
            let damped = &jacobian * jacobian.transpose() + DMatrix::identity(m, m) * lambda_sq;
            let Some(damped_inv) = damped.try_inverse() else {
                return self.result(q, false, iteration, &error);
            };

            let dq = jacobian.transpose() * damped_inv * error.vector;
            for (value, delta) in q.iter_mut().zip(dq.iter()) {
                *value += delta;
            }
            chain.clamp_joints(&mut q);
        }

        let error = pose_error(&chain.forward_kinematics(&q), target);
        let converged = self.within_tolerance(&error, target);
        self.result(q, converged, self.config.max_iterations, &error)
    }

    fn within_tolerance(&self, error: &PoseError, target: &EndEffectorTarget) -> bool {
        error.position < self.config.position_tolerance
            && (target.orientation.is_none() || error.orientation < self.config.angle_tolerance)
    }

    #[allow(clippy::unused_self)]
    fn result(&self, q: Vec<f32>, converged: bool, iterations: u32, error: &PoseError) -> IkResult {
        IkResult {
            joint_positions: q,
            converged,
            iterations,
            position_error: error.position,
            orientation_error: error.orientation,
        }
    }
}

fn pose_error(ee_pose: &Isometry3<f32>, target: &EndEffectorTarget) -> PoseError {
    let dp = target.position - ee_pose.translation.vector;
    match target.orientation {
        None => PoseError {
            position: dp.norm(),
            orientation: 0.0,
            vector: DVector::from_column_slice(dp.as_slice()),
        },
        Some(rotation) => {
            let dr = axis_angle(&(rotation * ee_pose.rotation.inverse()));
            PoseError {
                position: dp.norm(),
                orientation: dr.norm(),
                vector: DVector::from_column_slice(&[dp.x, dp.y, dp.z, dr.x, dr.y, dr.z]),
            }
        }
    }
}

/// Orientation error as a 3-vector (axis * angle).
fn axis_angle(q: &UnitQuaternion<f32>) -> Vector3<f32> {
    q.axis()
        .map_or_else(Vector3::zeros, |axis| axis.into_inner() * q.angle())
}

/// Geometric Jacobian: 3xN for position targets, 6xN with orientation.
fn compute_jacobian(chain: &KinematicChain, q: &[f32], with_orientation: bool) -> DMatrix<f32> {
    let (origins, axes, ee_pos) = chain.joint_frames(q);
    let rows = if with_orientation { 6 } else { 3 };
    let mut jacobian = DMatrix::zeros(rows, chain.dof());

    for (i, joint) in chain.joints().iter().enumerate() {
        let z = axes[i];
        let linear = if joint.is_prismatic {
            z
        } else {
            z.cross(&(ee_pos - origins[i]))
        };
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
        if with_orientation && !joint.is_prismatic {
            jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&z);
        }
    }

    jacobian
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
