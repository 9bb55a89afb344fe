//! Mock implementations of core traits for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::Vector3;
use pickplace_core::traits::{EndEffectorTarget, MotionGenerator};
use pickplace_core::types::{Action, JointState};

// ---------------------------------------------------------------------------
// ResetCounter
// ---------------------------------------------------------------------------

/// Shared counter that survives the generator being boxed and moved into a
/// controller.
#[derive(Debug, Clone, Default)]
pub struct ResetCounter(Arc<AtomicUsize>);

impl ResetCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// GantryMotionGenerator
// ---------------------------------------------------------------------------

/// Motion generator for a Cartesian gantry: joints `indices[0..3]` are the
/// end-effector x, y and z. Each tick moves straight toward the goal by at
/// most `max_step` metres.
pub struct GantryMotionGenerator {
    indices: [usize; 3],
    max_step: f32,
    resets: ResetCounter,
    calls: usize,
}

impl GantryMotionGenerator {
    pub fn new(indices: [usize; 3], max_step: f32) -> Self {
        Self {
            indices,
            max_step,
            resets: ResetCounter::default(),
            calls: 0,
        }
    }

    /// Handle observing how often [`MotionGenerator::reset`] was called.
    pub fn reset_counter(&self) -> ResetCounter {
        self.resets.clone()
    }

    /// Number of `forward` calls since construction.
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl Default for GantryMotionGenerator {
    fn default() -> Self {
        Self::new([0, 1, 2], 0.02)
    }
}

impl MotionGenerator for GantryMotionGenerator {
    fn forward(&mut self, target: &EndEffectorTarget, joints: &JointState) -> Action {
        self.calls += 1;
        let Some(current) = joints.select(&self.indices) else {
            return Action::hold();
        };
        let current = Vector3::from_column_slice(&current);
        let delta = target.position - current;
        let distance = delta.norm();
        let next = if distance > self.max_step {
            current + delta * (self.max_step / distance)
        } else {
            target.position
        };
        Action::positions(self.indices.to_vec(), vec![next.x, next.y, next.z])
    }

    fn reset(&mut self) {
        self.resets.bump();
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "GantryMotionGenerator"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
