//! `pickplace-record`: per-tick run logging for pick-and-place runs.
//!
//! [`TaskLogger`] keeps one [`LogRecord`] per tick in memory and writes two
//! exports at the end of a run:
//!
//! | Export                  | Layout                                               |
//! |-------------------------|------------------------------------------------------|
//! | [`StructuredLog`] (JSON) | one array per field, `<camera>_image_paths` columns |
//! | [`TabularLog`] (CSV)    | one row per tick, composite cells as JSON text       |
//!
//! [`FrameCapture`] writes camera frames every few ticks and hands the latest
//! path per camera to the logger.

pub mod capture;
pub mod error;
pub mod logger;
pub mod table;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        capture::FrameCapture,
        error::RecordError,
        logger::TaskLogger,
        table::TabularLog,
        types::{ImageRefs, LogRecord, StructuredLog},
    };
}

pub use prelude::*;
