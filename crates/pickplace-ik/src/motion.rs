//! IK-driven [`MotionGenerator`].
//!
//! Each tick the generator solves IK from the current arm configuration to
//! the goal, then moves only part of the way: the joint displacement is
//! scaled so no joint exceeds `max_joint_step`. Repeated ticks trace a
//! smooth joint-space path that re-plans against the latest joint state.

use pickplace_core::config::{MotionConfig, RobotConfig};
use pickplace_core::traits::{EndEffectorTarget, MotionGenerator};
use pickplace_core::types::{Action, JointState, Pose};

use crate::chain::KinematicChain;
use crate::solver::{DlsConfig, DlsSolver, IkResult};

pub struct DlsMotionGenerator {
    chain: KinematicChain,
    solver: DlsSolver,
    /// Articulation indices of the chain joints, in chain order.
    arm_indices: Vec<usize>,
    max_joint_step: f32,
    last_solve: Option<IkResult>,
}

impl DlsMotionGenerator {
    pub fn new(
        chain: KinematicChain,
        solver: DlsSolver,
        arm_indices: Vec<usize>,
        max_joint_step: f32,
    ) -> Self {
        assert_eq!(chain.dof(), arm_indices.len(), "one articulation index per chain joint");
        Self {
            chain,
            solver,
            arm_indices,
            max_joint_step,
            last_solve: None,
        }
    }

    pub fn from_config(robot: &RobotConfig, motion: &MotionConfig) -> Self {
        Self::new(
            KinematicChain::from_robot(robot),
            DlsSolver::new(DlsConfig::from(motion)),
            robot.arm_joint_indices.clone(),
            motion.max_joint_step(),
        )
    }

    pub const fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    /// Result of the most recent IK solve, if any since the last reset.
    pub const fn last_solve(&self) -> Option<&IkResult> {
        self.last_solve.as_ref()
    }

    /// End-effector pose for a full articulation state.
    pub fn end_effector_pose(&self, joints: &JointState) -> Option<Pose> {
        let q = joints.select(&self.arm_indices)?;
        Some(Pose::from_isometry(&self.chain.forward_kinematics(&q)))
    }
}

impl MotionGenerator for DlsMotionGenerator {
    fn forward(&mut self, target: &EndEffectorTarget, joints: &JointState) -> Action {
        let Some(q) = joints.select(&self.arm_indices) else {
            return Action::hold();
        };

        let solve = self.solver.solve(&self.chain, target, &q);
        let step = limit_step(&q, &solve.joint_positions, self.max_joint_step);
        self.last_solve = Some(solve);

        Action::positions(self.arm_indices.clone(), step)
    }

    fn reset(&mut self) {
        self.last_solve = None;
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DlsMotionGenerator"
    }
}

/// Move from `from` toward `to`, scaling the whole displacement so that no
/// joint moves more than `max_step`.
fn limit_step(from: &[f32], to: &[f32], max_step: f32) -> Vec<f32> {
    let largest = from
        .iter()
        .zip(to)
        .map(|(a, b)| (b - a).abs())
        .fold(0.0_f32, f32::max);
    let scale = if largest > max_step { max_step / largest } else { 1.0 };
    from.iter().zip(to).map(|(a, b)| a + (b - a) * scale).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
