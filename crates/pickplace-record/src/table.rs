//! CSV export of a run log.
//!
//! One row per tick. Scalars are written as-is; vectors, poses and actions
//! are written as JSON text inside a quoted cell so they parse back to the
//! exact logged values. Empty image cells mean "no frame captured yet".

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::RecordError;
use crate::types::{IMAGE_COLUMN_SUFFIX, ImageRefs, LogRecord, image_column};

/// Fixed leading columns, in order.
pub const BASE_COLUMNS: [&str; 6] = [
    "time",
    "joint_positions",
    "gripper_state",
    "cube_position",
    "target_position",
    "actions",
];

/// Rows loaded back from a CSV export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularLog {
    cameras: Vec<String>,
    rows: Vec<LogRecord>,
}

impl TabularLog {
    /// Header row for the given cameras.
    pub fn header(cameras: &[String]) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| (*c).to_string())
            .chain(cameras.iter().map(|c| image_column(c)))
            .collect()
    }

    /// Write `records` as CSV, header first.
    pub fn write<W: Write>(
        mut writer: W,
        records: &[LogRecord],
        cameras: &[String],
    ) -> Result<(), RecordError> {
        write_row(&mut writer, Self::header(cameras).iter().map(String::as_str))?;
        for record in records {
            let mut cells = vec![
                record.time.to_string(),
                serde_json::to_string(&record.joint_positions)?,
                serde_json::to_string(&record.gripper_state)?,
                serde_json::to_string(&record.cube_position)?,
                serde_json::to_string(&record.target_position)?,
                serde_json::to_string(&record.action)?,
            ];
            cells.extend(
                cameras
                    .iter()
                    .map(|c| record.image_paths.get(c).cloned().flatten().unwrap_or_default()),
            );
            write_row(&mut writer, cells.iter().map(String::as_str))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse a CSV export back into typed rows.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut rows = parse_csv(&text).map_err(|(line, msg)| RecordError::table(path, line, msg))?;
        if rows.is_empty() {
            return Err(RecordError::table(path, 1, "missing header"));
        }

        let (_, header) = rows.remove(0);
        if header.len() < BASE_COLUMNS.len()
            || header.iter().zip(BASE_COLUMNS).any(|(h, expected)| h != expected)
        {
            return Err(RecordError::table(path, 1, format!("unexpected header {header:?}")));
        }
        let cameras = header[BASE_COLUMNS.len()..]
            .iter()
            .map(|column| {
                column
                    .strip_suffix(IMAGE_COLUMN_SUFFIX)
                    .map(String::from)
                    .ok_or_else(|| RecordError::table(path, 1, format!("unknown column `{column}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let records = rows
            .into_iter()
            .map(|(line, cells)| {
                parse_record(&cells, &cameras).map_err(|msg| RecordError::table(path, line, msg))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cameras,
            rows: records,
        })
    }

    pub fn cameras(&self) -> &[String] {
        &self.cameras
    }

    pub fn rows(&self) -> &[LogRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_record(cells: &[String], cameras: &[String]) -> Result<LogRecord, String> {
    let expected = BASE_COLUMNS.len() + cameras.len();
    if cells.len() != expected {
        return Err(format!("expected {expected} cells, got {}", cells.len()));
    }

    let time = cells[0]
        .parse()
        .map_err(|e| format!("time `{}`: {e}", cells[0]))?;
    let image_paths: ImageRefs = cameras
        .iter()
        .zip(&cells[BASE_COLUMNS.len()..])
        .map(|(camera, cell)| (camera.clone(), (!cell.is_empty()).then(|| cell.clone())))
        .collect();

    Ok(LogRecord {
        time,
        joint_positions: json_cell(&cells[1], BASE_COLUMNS[1])?,
        gripper_state: json_cell(&cells[2], BASE_COLUMNS[2])?,
        cube_position: json_cell(&cells[3], BASE_COLUMNS[3])?,
        target_position: json_cell(&cells[4], BASE_COLUMNS[4])?,
        action: json_cell(&cells[5], BASE_COLUMNS[5])?,
        image_paths,
    })
}

fn json_cell<T: DeserializeOwned>(cell: &str, column: &str) -> Result<T, String> {
    serde_json::from_str(cell).map_err(|e| format!("{column}: {e}"))
}

// ---------------------------------------------------------------------------
// CSV primitives
// ---------------------------------------------------------------------------

fn write_row<'a, W: Write>(
    writer: &mut W,
    cells: impl Iterator<Item = &'a str>,
) -> std::io::Result<()> {
    let line = cells.map(escape).collect::<Vec<_>>().join(",");
    writeln!(writer, "{line}")
}

/// Quote a cell if it contains a delimiter, quote or line break.
fn escape(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

/// Split CSV text into rows of cells, tagged with their 1-based start line.
fn parse_csv(text: &str) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push(c);
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push((row_line, std::mem::take(&mut row)));
                line += 1;
                row_line = line;
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err((row_line, "unterminated quoted cell".into()));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push((row_line, row));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pickplace_core::types::{Action, GripperCommand};

    fn cameras() -> Vec<String> {
        vec!["camera1".into(), "camera2".into()]
    }

    fn record(time: u64) -> LogRecord {
        #[allow(clippy::cast_precision_loss)]
        let t = time as f32;
        LogRecord {
            time,
            joint_positions: vec![0.1 * t, -0.333_333_34, 1e-7, 0.0],
            gripper_state: vec![0.628, -0.628],
            cube_position: [0.6, 0.3, 0.85 + 0.01 * t],
            target_position: [0.8, 0.7, 1.0],
            action: Action::positions(vec![0, 1, 6, 7], vec![0.5, t, 0.628, -0.628])
                .with_gripper(GripperCommand::Close),
            image_paths: [
                ("camera1".to_string(), Some(format!("data/images/camera1/frame_{time}.json"))),
                ("camera2".to_string(), None),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("[1.0,2.0]"), "\"[1.0,2.0]\"");
        assert_eq!(escape(r#"{"a":1}"#), r#""{""a"":1}""#);
    }

    #[test]
    fn parse_handles_quotes_and_crlf() {
        let rows = parse_csv("a,\"b,c\",\"d\"\"e\"\r\n1,,3\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, vec!["a", "b,c", "d\"e"]);
        assert_eq!(rows[1].1, vec!["1", "", "3"]);
        assert_eq!(rows[1].0, 2);
    }

    #[test]
    fn parse_rejects_unterminated_quote() {
        assert!(parse_csv("a,\"b\n").is_err());
    }

    #[test]
    fn header_lists_camera_columns() {
        let header = TabularLog::header(&cameras());
        assert_eq!(header.len(), 8);
        assert_eq!(header[0], "time");
        assert_eq!(header[7], "camera2_image_paths");
    }

    #[test]
    fn n_records_roundtrip_as_n_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let records: Vec<LogRecord> = (0..25).map(record).collect();

        let file = std::fs::File::create(&path).unwrap();
        TabularLog::write(file, &records, &cameras()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 26);

        let table = TabularLog::read(&path).unwrap();
        assert_eq!(table.len(), 25);
        assert_eq!(table.cameras(), cameras().as_slice());
        assert_eq!(table.rows(), records.as_slice());
    }

    #[test]
    fn empty_log_is_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        TabularLog::write(std::fs::File::create(&path).unwrap(), &[], &cameras()).unwrap();
        let table = TabularLog::read(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.cameras().len(), 2);
    }

    #[test]
    fn bad_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "tick,joints\n0,[]\n").unwrap();
        assert!(matches!(
            TabularLog::read(&path),
            Err(RecordError::Table { line: 1, .. })
        ));
    }

    #[test]
    fn malformed_cell_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.csv");
        let mut text = TabularLog::header(&[]).join(",");
        text.push_str("\n0,\"[0.0]\",\"[]\",\"[1,2,3]\",\"[1,2,3]\",\"{}\"\n");
        text.push_str("1,not-json,\"[]\",\"[1,2,3]\",\"[1,2,3]\",\"{}\"\n");
        std::fs::write(&path, text).unwrap();
        match TabularLog::read(&path) {
            Err(RecordError::Table { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("joint_positions"), "{message}");
            }
            other => panic!("expected table error, got {other:?}"),
        }
    }
}
