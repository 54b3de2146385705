/// Utility functions for data processing and formatting
use std::collections::{HashMap, HashSet};
use time::{format_description, OffsetDateTime};

use crate::config::Config;
use crate::models::{Beacon, Reading, TiltRecord};

/// Format a unix epoch as an ISO-8601 timestamp with second precision
///
/// Falls back to the default string representation if formatting fails,
/// and to an empty string for an out-of-range epoch.
pub fn iso_timestamp(epoch: i64) -> String {
    let format = format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]")
        .expect("Failed to create format description");
    OffsetDateTime::from_unix_timestamp(epoch)
        .map(|dt| dt.format(&format).unwrap_or_else(|_| dt.to_string()))
        .unwrap_or_default()
}

/// Current unix epoch in whole seconds
pub fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert °F to °C, rounded to one decimal place
pub fn to_celsius(fahrenheit: f64) -> f64 {
    round1((fahrenheit - 32.0) / 1.8)
}

/// Arithmetic mean of a non-empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a non-empty slice
///
/// For an even count this is the mean of the two middle values.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Keep the first observation per distinct UUID, preserving scan order
///
/// Later advertisements from a UUID already seen in this batch are dropped.
pub fn distinct_by_uuid(beacons: Vec<Beacon>) -> Vec<Beacon> {
    let mut seen = HashSet::new();
    beacons
        .into_iter()
        .filter(|beacon| seen.insert(beacon.uuid))
        .collect()
}

/// Collapse a run's captured readings into one record per configured color
///
/// Colors that reported get the rounded mean epoch and the rounded median
/// gravity and fahrenheit, with celsius derived from the median fahrenheit.
/// Colors that never reported emit a placeholder record stamped with the
/// run start and empty numeric fields. Records are ordered by color name.
///
/// # Arguments
/// * `captured` - readings accumulated per color across all cycles
/// * `config` - configuration listing the colors this run records
/// * `start_epoch` - unix epoch at which the run began
pub fn aggregate_readings(
    captured: &HashMap<String, Vec<Reading>>,
    config: &Config,
    start_epoch: i64,
) -> Vec<TiltRecord> {
    let mut colors: Vec<&String> = config.hydrometers.keys().collect();
    colors.sort();

    let mut records = Vec::with_capacity(colors.len());
    for color in colors {
        let readings = captured.get(color).map(Vec::as_slice).unwrap_or(&[]);
        let record = if readings.is_empty() {
            TiltRecord {
                color: color.clone(),
                epoch: start_epoch,
                timestamp: iso_timestamp(start_epoch),
                gravity: None,
                celsius: None,
                fahrenheit: None,
                reading_count: 0,
            }
        } else {
            let epochs: Vec<f64> = readings.iter().map(|r| r.epoch as f64).collect();
            let gravities: Vec<f64> = readings.iter().map(|r| r.gravity).collect();
            let fahrenheits: Vec<f64> = readings.iter().map(|r| r.fahrenheit).collect();

            let epoch = mean(&epochs).round() as i64;
            let fahrenheit = round1(median(&fahrenheits));

            TiltRecord {
                color: color.clone(),
                epoch,
                timestamp: iso_timestamp(epoch),
                gravity: Some(round1(median(&gravities))),
                celsius: Some(to_celsius(fahrenheit)),
                fahrenheit: Some(fahrenheit),
                reading_count: readings.len() as u32,
            }
        };
        records.push(record);
    }

    records
}
