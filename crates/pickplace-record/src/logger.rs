//! In-memory run log with a two-file export.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;
use tracing::info;

use pickplace_core::config::LoggingConfig;
use pickplace_core::types::{Action, JointState, Pose};

use crate::error::RecordError;
use crate::table::TabularLog;
use crate::types::{ImageRefs, LogRecord, StructuredLog};

/// Append-only per-tick log, flushed once at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct TaskLogger {
    records: Vec<LogRecord>,
    cameras: Vec<String>,
    max_records: Option<usize>,
}

impl TaskLogger {
    pub fn new(cameras: Vec<String>, max_records: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            cameras,
            max_records,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(
            config.cameras.iter().map(|c| c.label.clone()).collect(),
            config.max_records,
        )
    }

    /// Append one tick.
    ///
    /// Fails with [`RecordError::StorageExhausted`] once `max_records` ticks
    /// are stored or the buffer cannot grow.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        tick: u64,
        joints: &JointState,
        gripper_state: &[f32],
        object: &Pose,
        target: &Vector3<f32>,
        action: &Action,
        images: &ImageRefs,
    ) -> Result<(), RecordError> {
        let capacity = self.records.len();
        if self.max_records.is_some_and(|max| capacity >= max) {
            return Err(RecordError::StorageExhausted { capacity });
        }
        self.records
            .try_reserve(1)
            .map_err(|_| RecordError::StorageExhausted { capacity })?;

        self.records.push(LogRecord {
            time: tick,
            joint_positions: joints.as_slice().to_vec(),
            gripper_state: gripper_state.to_vec(),
            cube_position: object.position,
            target_position: [target.x, target.y, target.z],
            action: action.clone(),
            image_paths: images.clone(),
        });
        Ok(())
    }

    /// Write the structured dump to `primary` and the CSV table to
    /// `secondary`, creating parent directories.
    ///
    /// The primary file is written first; if the secondary write fails the
    /// primary file is left in place.
    pub fn flush(&self, primary: &Path, secondary: &Path) -> Result<(), RecordError> {
        let dump = StructuredLog::from_records(&self.records, &self.cameras);
        let mut writer = BufWriter::new(create(primary)?);
        serde_json::to_writer(&mut writer, &dump)?;
        writer.flush()?;
        info!(path = %primary.display(), records = self.records.len(), "Simulation logs saved");

        TabularLog::write(BufWriter::new(create(secondary)?), &self.records, &self.cameras)?;
        info!(path = %secondary.display(), "Simulation logs also saved as CSV");
        Ok(())
    }

    /// Flush to the paths named in `config`.
    pub fn flush_to(&self, config: &LoggingConfig) -> Result<(), RecordError> {
        self.flush(&config.primary_path(), &config.secondary_path())
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn cameras(&self) -> &[String] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn create(path: &Path) -> Result<File, RecordError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
