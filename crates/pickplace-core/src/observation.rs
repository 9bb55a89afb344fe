//! Scene observations and their validated, typed form.
//!
//! A [`SimulationHost`](crate::traits::SimulationHost) reports state as an
//! untyped [`SceneObservations`] map keyed by object name and field name.
//! The task-control loop never reads that map directly: it first converts it
//! into a [`TaskObservation`], which fails fast with
//! [`TaskError::InvalidObservation`] when a required entry is missing.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::types::{JointState, Pose};

/// Field names used inside [`SceneObservations`].
pub mod keys {
    pub const POSITION: &str = "position";
    pub const ORIENTATION: &str = "orientation";
    pub const TARGET_POSITION: &str = "target_position";
    pub const JOINT_POSITIONS: &str = "joint_positions";
    pub const END_EFFECTOR_POSITION: &str = "end_effector_position";
    pub const END_EFFECTOR_ORIENTATION: &str = "end_effector_orientation";
}

// ---------------------------------------------------------------------------
// SceneObservations
// ---------------------------------------------------------------------------

/// Name-keyed observation map: `object name -> field name -> values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneObservations {
    entries: BTreeMap<String, BTreeMap<String, Vec<f32>>>,
}

impl SceneObservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) one field of one object.
    pub fn insert(&mut self, object: &str, field: &str, values: Vec<f32>) {
        self.entries
            .entry(object.to_string())
            .or_default()
            .insert(field.to_string(), values);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, object: &str, field: &str, values: Vec<f32>) -> Self {
        self.insert(object, field, values);
        self
    }

    /// Remove one field, returning its values if present.
    pub fn remove(&mut self, object: &str, field: &str) -> Option<Vec<f32>> {
        self.entries.get_mut(object)?.remove(field)
    }

    pub fn get(&self, object: &str, field: &str) -> Option<&[f32]> {
        self.entries
            .get(object)
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
    }

    /// Names of all observed objects.
    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// TaskObservation
// ---------------------------------------------------------------------------

/// Validated per-tick observation consumed by the task-control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskObservation {
    /// Current pose of the manipulated object.
    pub object: Pose,
    /// Placing position reported alongside the object.
    pub target_position: Vector3<f32>,
    /// Full articulation joint state, gripper joints included.
    pub joints: JointState,
    /// Current end-effector pose.
    pub end_effector: Pose,
}

impl TaskObservation {
    /// Extract the fields the task needs from `scene`.
    ///
    /// Required: `{object}/position`, `{object}/target_position`,
    /// `{robot}/joint_positions` (non-empty) and
    /// `{robot}/end_effector_position`. Orientations default to identity
    /// when absent but must have four components when present.
    pub fn from_scene(
        scene: &SceneObservations,
        object_name: &str,
        robot_name: &str,
    ) -> Result<Self, TaskError> {
        let object_position = require::<3>(scene, object_name, keys::POSITION)?;
        let object_orientation = optional::<4>(scene, object_name, keys::ORIENTATION)?
            .unwrap_or(Pose::IDENTITY_ORIENTATION);
        let target = require::<3>(scene, object_name, keys::TARGET_POSITION)?;

        let joints = scene
            .get(robot_name, keys::JOINT_POSITIONS)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| missing(robot_name, keys::JOINT_POSITIONS))?;

        let ee_position = require::<3>(scene, robot_name, keys::END_EFFECTOR_POSITION)?;
        let ee_orientation = optional::<4>(scene, robot_name, keys::END_EFFECTOR_ORIENTATION)?
            .unwrap_or(Pose::IDENTITY_ORIENTATION);

        Ok(Self {
            object: Pose::new(object_position, object_orientation),
            target_position: Vector3::from(target),
            joints: JointState::new(joints.to_vec()),
            end_effector: Pose::new(ee_position, ee_orientation),
        })
    }
}

fn missing(object: &str, field: &str) -> TaskError {
    TaskError::invalid_observation(format!("{object}/{field}"))
}

fn require<const N: usize>(
    scene: &SceneObservations,
    object: &str,
    field: &str,
) -> Result<[f32; N], TaskError> {
    optional::<N>(scene, object, field)?.ok_or_else(|| missing(object, field))
}

fn optional<const N: usize>(
    scene: &SceneObservations,
    object: &str,
    field: &str,
) -> Result<Option<[f32; N]>, TaskError> {
    match scene.get(object, field) {
        None => Ok(None),
        Some(values) => <[f32; N]>::try_from(values)
            .map(Some)
            .map_err(|_| missing(object, field)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
