/// CSV log persistence for aggregated records
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::TiltRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row read back from a hydrometer CSV log.
///
/// Numeric fields are blank for placeholder rows, hence the options. The
/// `reading_count` column is absent entirely in logs written by the older
/// per-reading tooling, so it defaults when missing.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRow {
    pub color: String,
    pub epoch: i64,
    pub timestamp: String,
    pub gravity: Option<f64>,
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
    #[serde(default)]
    pub reading_count: Option<u32>,
}

/// Append records to a headerless CSV log, creating the file on first use.
pub fn append_records(path: &Path, records: &[TiltRecord]) -> Result<(), StorageError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn log_reader<R: Read>(reader: R) -> csv::Reader<R> {
    // Flexible so six-column rows from older logs still parse.
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
}

/// Read a whole headerless CSV log back into memory.
pub fn read_log(path: &Path) -> Result<Vec<LogRow>, StorageError> {
    let mut reader = log_reader(File::open(path)?);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(record: &TiltRecord) -> String {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(record).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn record_serializes_in_log_order() {
        let record = TiltRecord {
            color: "Red".to_string(),
            epoch: 1_700_000_000,
            timestamp: "2023-11-14T22:13:20".to_string(),
            gravity: Some(1012.0),
            celsius: Some(21.1),
            fahrenheit: Some(70.0),
            reading_count: 3,
        };
        assert_eq!(
            serialize(&record),
            "Red,1700000000,2023-11-14T22:13:20,1012.0,21.1,70.0,3\n"
        );
    }

    #[test]
    fn placeholder_serializes_empty_numeric_fields() {
        let record = TiltRecord {
            color: "Orange".to_string(),
            epoch: 1_700_000_000,
            timestamp: "2023-11-14T22:13:20".to_string(),
            gravity: None,
            celsius: None,
            fahrenheit: None,
            reading_count: 0,
        };
        assert_eq!(
            serialize(&record),
            "Orange,1700000000,2023-11-14T22:13:20,,,,0\n"
        );
    }

    #[test]
    fn rows_round_trip_through_deserialization() {
        let raw = "Red,1700000000,2023-11-14T22:13:20,1012.0,21.1,70.0,3\n\
                   Orange,1700000000,2023-11-14T22:13:20,,,,0\n";
        let mut reader = log_reader(raw.as_bytes());
        let rows: Vec<LogRow> = reader.deserialize().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].color, "Red");
        assert_eq!(rows[0].gravity, Some(1012.0));
        assert_eq!(rows[0].reading_count, Some(3));
        assert_eq!(rows[1].gravity, None);
        assert_eq!(rows[1].celsius, None);
        assert_eq!(rows[1].reading_count, Some(0));
    }

    #[test]
    fn six_column_rows_from_older_logs_still_parse() {
        // Logs written before the reading_count column was added mix with
        // newer seven-column rows in the same file.
        let raw = "Red,1700000000,2023-11-14T22:13:20,1012,21.1,70.0\n\
                   Red,1700000600,2023-11-14T22:23:20,1013.0,21.1,70.0,2\n";
        let mut reader = log_reader(raw.as_bytes());
        let rows: Vec<LogRow> = reader.deserialize().map(Result::unwrap).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gravity, Some(1012.0));
        assert_eq!(rows[0].reading_count, None);
        assert_eq!(rows[1].reading_count, Some(2));
    }
}
