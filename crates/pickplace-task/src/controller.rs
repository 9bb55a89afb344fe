//! Phase sequencer for picking and placing.
//!
//! [`PickPlaceController`] turns one validated observation per tick into one
//! [`Action`]: it picks the goal for the current [`Phase`], asks the
//! [`MotionGenerator`] for the arm motion, merges the gripper command and
//! then checks whether the phase is complete.
//!
//! | Phase          | End-effector goal        | Gripper                  | Complete when               |
//! |----------------|--------------------------|--------------------------|-----------------------------|
//! | `Approaching`  | object + approach height | open                     | at goal                     |
//! | `Grasping`     | object                   | close once at goal       | at goal and fingers closed  |
//! | `Transporting` | target + approach height | closed                   | at goal                     |
//! | `Releasing`    | target                   | open once at goal        | at goal and fingers open    |
//! | `Done`         | none                     | open                     | never                       |
//!
//! Every goal has the end-effector offset added. The object position is
//! read once per run, on the first tick after [`reset`](PickPlaceController::reset),
//! so a grasp target that moves mid-motion is not chased.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pickplace_core::config::{ControllerConfig, PickPlaceConfig};
use pickplace_core::error::TaskError;
use pickplace_core::observation::{TaskObservation, keys};
use pickplace_core::traits::{EndEffectorTarget, MotionGenerator};
use pickplace_core::types::{Action, GripperCommand, Pose};

use crate::gripper::ParallelGripper;
use crate::phase::Phase;

/// Entry into a phase, stamped with the run-local tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub phase: Phase,
    /// Number of `advance` calls in the run before the phase became active.
    pub tick: u64,
}

/// Per-run state, created by `reset()`.
#[derive(Debug, Clone)]
struct RunState {
    phase: Phase,
    picking_pose: Option<Pose>,
    gripper: GripperCommand,
    ticks: u64,
    transitions: Vec<PhaseTransition>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Approaching,
            picking_pose: None,
            gripper: GripperCommand::Open,
            ticks: 0,
            transitions: vec![PhaseTransition {
                phase: Phase::Approaching,
                tick: 0,
            }],
        }
    }
}

pub struct PickPlaceController {
    motion: Box<dyn MotionGenerator>,
    gripper: ParallelGripper,
    approach_height: f32,
    position_tolerance: f32,
    gripper_tolerance: f32,
    orientation: Option<UnitQuaternion<f32>>,
    /// Shortest joint state that covers every joint the controller reads.
    min_dof: usize,
    run: Option<RunState>,
}

impl PickPlaceController {
    /// Create an unarmed controller. Call [`reset`](Self::reset) before the
    /// first [`advance`](Self::advance).
    pub fn new(
        motion: Box<dyn MotionGenerator>,
        gripper: ParallelGripper,
        config: &ControllerConfig,
    ) -> Self {
        let min_dof = gripper.joint_indices().iter().max().map_or(0, |&i| i + 1);
        Self {
            motion,
            gripper,
            approach_height: config.approach_height,
            position_tolerance: config.position_tolerance,
            gripper_tolerance: config.gripper_tolerance,
            orientation: config
                .end_effector_orientation
                .map(|o| Pose::new([0.0; 3], o).rotation()),
            min_dof,
            run: None,
        }
    }

    /// Build from a full configuration. Arm joint indices count toward the
    /// minimum joint-state length.
    pub fn from_config(motion: Box<dyn MotionGenerator>, config: &PickPlaceConfig) -> Self {
        let mut controller = Self::new(
            motion,
            ParallelGripper::from_config(&config.gripper),
            &config.controller,
        );
        let arm_dof = config
            .robot
            .arm_joint_indices
            .iter()
            .max()
            .map_or(0, |&i| i + 1);
        controller.min_dof = controller.min_dof.max(arm_dof);
        controller
    }

    /// Compute this tick's action and advance the phase if its goal is met.
    ///
    /// At most one transition happens per call.
    pub fn advance(
        &mut self,
        observation: &TaskObservation,
        target_position: &Vector3<f32>,
        end_effector_offset: &Vector3<f32>,
    ) -> Result<Action, TaskError> {
        let run = self.run.as_mut().ok_or(TaskError::NotInitialized)?;
        if observation.joints.len() < self.min_dof {
            return Err(TaskError::invalid_observation(keys::JOINT_POSITIONS));
        }
        let fingers = self
            .gripper
            .positions(&observation.joints)
            .ok_or_else(|| TaskError::invalid_observation(keys::JOINT_POSITIONS))?;

        run.ticks += 1;
        let picking = run.picking_pose.get_or_insert(observation.object).translation();
        let lift = Vector3::z() * self.approach_height;

        let phase = run.phase;
        let goal = match phase {
            Phase::Approaching => picking + lift,
            Phase::Grasping => picking,
            Phase::Transporting => target_position + lift,
            Phase::Releasing => *target_position,
            Phase::Done => {
                run.gripper = GripperCommand::Open;
                return Ok(self.gripper.forward(GripperCommand::Open));
            }
        } + end_effector_offset;

        let at_goal = observation.end_effector.distance_to(&goal) <= self.position_tolerance;

        run.gripper = match phase {
            Phase::Grasping if at_goal => GripperCommand::Close,
            Phase::Releasing if at_goal => GripperCommand::Open,
            Phase::Approaching => GripperCommand::Open,
            Phase::Transporting => GripperCommand::Close,
            _ => run.gripper,
        };

        let target = EndEffectorTarget {
            position: goal,
            orientation: self.orientation,
        };
        let action = self
            .motion
            .forward(&target, &observation.joints)
            .merge(self.gripper.forward(run.gripper));

        let complete = at_goal
            && match phase {
                Phase::Grasping => self.gripper.is_closed(&fingers, self.gripper_tolerance),
                Phase::Releasing => self.gripper.is_open(&fingers, self.gripper_tolerance),
                _ => true,
            };

        if complete {
            let next = phase.next();
            run.phase = next;
            run.transitions.push(PhaseTransition {
                phase: next,
                tick: run.ticks,
            });
            debug!(from = %phase, to = %next, tick = run.ticks, "phase transition");
        }

        Ok(action)
    }

    /// `true` once the object has been deposited.
    pub fn is_done(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.phase.is_terminal())
    }

    /// Arm a fresh run: phase back to `Approaching`, cached picking pose
    /// cleared, motion generator reset.
    pub fn reset(&mut self) {
        if let Some(run) = &self.run {
            debug!(phase = %run.phase, ticks = run.ticks, "controller reset");
        }
        self.run = Some(RunState::new());
        self.motion.reset();
    }

    /// Current phase. `Approaching` before the first reset.
    pub fn phase(&self) -> Phase {
        self.run.as_ref().map_or(Phase::Approaching, |run| run.phase)
    }

    /// Whether `reset()` has armed a run.
    pub const fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    /// Object pose cached for this run, once the first tick has read it.
    pub fn picking_pose(&self) -> Option<Pose> {
        self.run.as_ref().and_then(|run| run.picking_pose)
    }

    /// Phase entries of the current run, oldest first.
    pub fn transitions(&self) -> &[PhaseTransition] {
        self.run
            .as_ref()
            .map_or(&[][..], |run| run.transitions.as_slice())
    }

    /// Ticks advanced in the current run.
    pub fn ticks(&self) -> u64 {
        self.run.as_ref().map_or(0, |run| run.ticks)
    }

    pub fn motion_generator(&self) -> &dyn MotionGenerator {
        self.motion.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
