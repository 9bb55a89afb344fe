//! Periodic camera frame capture.
//!
//! Every `capture_interval` ticks one frame per configured camera is written
//! to `<output_dir>/<image_dir>/<camera>/frame_<tick>.json` as a serialized
//! [`ImageFrame`]. The path of the latest frame per camera is kept so each
//! log record can reference it.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use pickplace_core::config::LoggingConfig;
use pickplace_core::types::ImageFrame;

use crate::error::RecordError;
use crate::types::ImageRefs;

pub struct FrameCapture {
    /// `(label, directory)` per camera.
    cameras: Vec<(String, PathBuf)>,
    interval: u64,
    latest: ImageRefs,
}

impl FrameCapture {
    pub fn new(root: &Path, cameras: &[String], interval: u64) -> Self {
        Self {
            cameras: cameras
                .iter()
                .map(|label| (label.clone(), root.join(label)))
                .collect(),
            interval: interval.max(1),
            latest: cameras.iter().map(|label| (label.clone(), None)).collect(),
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let labels: Vec<String> = config.cameras.iter().map(|c| c.label.clone()).collect();
        Self::new(
            &config.output_dir.join(&config.image_dir),
            &labels,
            config.capture_interval,
        )
    }

    /// Create every camera directory up front.
    pub fn prepare(&self) -> Result<(), RecordError> {
        for (_, dir) in &self.cameras {
            fs::create_dir_all(dir)?;
        }
        debug!(cameras = self.cameras.len(), "image directories ready");
        Ok(())
    }

    pub const fn is_capture_tick(&self, tick: u64) -> bool {
        tick % self.interval == 0
    }

    /// On capture ticks, grab a frame from each camera via `grab` and write
    /// it. Returns the number of frames written.
    ///
    /// A camera that yields no frame keeps its previous path.
    pub fn capture(
        &mut self,
        tick: u64,
        mut grab: impl FnMut(&str) -> Option<ImageFrame>,
    ) -> Result<usize, RecordError> {
        if !self.is_capture_tick(tick) {
            return Ok(0);
        }

        let mut written = 0;
        for (label, dir) in &self.cameras {
            let Some(frame) = grab(label) else {
                warn!(camera = %label, tick, "camera produced no frame");
                continue;
            };
            let path = dir.join(format!("frame_{tick}.json"));
            write_frame(&path, &frame)?;
            self.latest
                .insert(label.clone(), Some(path.display().to_string()));
            written += 1;
        }
        Ok(written)
    }

    /// Latest frame path per camera.
    pub const fn latest(&self) -> &ImageRefs {
        &self.latest
    }

    /// Forget captured paths, e.g. when a run restarts.
    pub fn clear(&mut self) {
        for path in self.latest.values_mut() {
            *path = None;
        }
    }

    /// Load a frame written by [`capture`](Self::capture).
    pub fn read_frame(path: impl AsRef<Path>) -> Result<ImageFrame, RecordError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn write_frame(path: &Path, frame: &ImageFrame) -> Result<(), RecordError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, frame)?;
    writer.flush()?;
    Ok(())
}
