//! Log record types and the column-oriented dump layout.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use pickplace_core::types::Action;

use crate::error::RecordError;

/// Most recent frame path per camera label. `None` before the first capture.
pub type ImageRefs = BTreeMap<String, Option<String>>;

/// Suffix of the per-camera path columns in both exports.
pub const IMAGE_COLUMN_SUFFIX: &str = "_image_paths";

/// Column name holding `camera`'s frame paths.
pub fn image_column(camera: &str) -> String {
    format!("{camera}{IMAGE_COLUMN_SUFFIX}")
}

// ---------------------------------------------------------------------------
// LogRecord
// ---------------------------------------------------------------------------

/// Everything logged for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Tick index within the logging run.
    pub time: u64,
    pub joint_positions: Vec<f32>,
    pub gripper_state: Vec<f32>,
    pub cube_position: [f32; 3],
    pub target_position: [f32; 3],
    pub action: Action,
    pub image_paths: ImageRefs,
}

// ---------------------------------------------------------------------------
// StructuredLog
// ---------------------------------------------------------------------------

/// Column-oriented dump: one array per field, all of equal length.
///
/// Camera columns are flattened into the top level as
/// `<camera>_image_paths`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredLog {
    pub time: Vec<u64>,
    pub joint_positions: Vec<Vec<f32>>,
    pub gripper_state: Vec<Vec<f32>>,
    pub cube_position: Vec<[f32; 3]>,
    pub target_position: Vec<[f32; 3]>,
    pub actions: Vec<Action>,
    #[serde(flatten)]
    pub image_paths: BTreeMap<String, Vec<Option<String>>>,
}

impl StructuredLog {
    /// Transpose `records` into columns, with one path column per camera.
    pub fn from_records(records: &[LogRecord], cameras: &[String]) -> Self {
        let mut log = Self {
            image_paths: cameras
                .iter()
                .map(|c| (image_column(c), Vec::with_capacity(records.len())))
                .collect(),
            ..Self::default()
        };
        for record in records {
            log.time.push(record.time);
            log.joint_positions.push(record.joint_positions.clone());
            log.gripper_state.push(record.gripper_state.clone());
            log.cube_position.push(record.cube_position);
            log.target_position.push(record.target_position);
            log.actions.push(record.action.clone());
            for camera in cameras {
                let path = record.image_paths.get(camera).cloned().flatten();
                if let Some(column) = log.image_paths.get_mut(&image_column(camera)) {
                    column.push(path);
                }
            }
        }
        log
    }

    /// Number of ticks in the dump.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Paths logged for `camera`, if it has a column.
    pub fn image_paths_for(&self, camera: &str) -> Option<&[Option<String>]> {
        self.image_paths.get(&image_column(camera)).map(Vec::as_slice)
    }

    /// Load a dump written by [`TaskLogger::flush`](crate::TaskLogger::flush).
    pub fn read(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(time: u64, camera1: Option<&str>) -> LogRecord {
        LogRecord {
            time,
            joint_positions: vec![0.0, 0.5],
            gripper_state: vec![0.0, 0.0],
            cube_position: [0.6, 0.3, 0.85],
            target_position: [0.8, 0.7, 1.0],
            action: Action::positions(vec![0], vec![0.1]),
            image_paths: [("camera1".to_string(), camera1.map(String::from))]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn columns_have_equal_length() {
        let cameras = vec!["camera1".to_string(), "camera2".to_string()];
        let log = StructuredLog::from_records(
            &[record(0, Some("a.json")), record(1, None)],
            &cameras,
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.actions.len(), 2);
        assert_eq!(
            log.image_paths_for("camera1"),
            Some(&[Some("a.json".to_string()), None][..])
        );
        // camera2 never appears in the records: column of `None`.
        assert_eq!(log.image_paths_for("camera2"), Some(&[None, None][..]));
    }

    #[test]
    fn camera_columns_flatten_to_top_level() {
        let cameras = vec!["camera1".to_string()];
        let log = StructuredLog::from_records(&[record(0, Some("a.json"))], &cameras);
        let json: serde_json::Value = serde_json::to_value(&log).unwrap();
        assert_eq!(json["camera1_image_paths"][0], "a.json");
        assert_eq!(json["time"][0], 0);
        assert!(json.get("image_paths").is_none());
    }

    #[test]
    fn image_column_name() {
        assert_eq!(image_column("camera2"), "camera2_image_paths");
    }
}
