use serde::Serialize;
use uuid::Uuid;

/// A decoded iBeacon advertisement.
///
/// Tilt hydrometers repurpose the iBeacon fields: `major` carries the
/// temperature in °F and `minor` the specific gravity (×1000).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beacon {
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
}

/// One captured reading for a configured color within a cycle.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub epoch: i64,
    pub gravity: f64,
    pub fahrenheit: f64,
}

/// Aggregated per-color record for one run.
///
/// Serialized field order matches the CSV log format:
/// `color, epoch, iso_timestamp, gravity, celsius, fahrenheit, reading_count`.
/// The numeric fields are empty for a color that never reported.
#[derive(Debug, Clone, Serialize)]
pub struct TiltRecord {
    pub color: String,
    pub epoch: i64,
    pub timestamp: String,
    pub gravity: Option<f64>,
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
    pub reading_count: u32,
}

const fn tilt_uuid(text: &str) -> Uuid {
    match Uuid::try_parse(text) {
        Ok(uuid) => uuid,
        Err(_) => panic!("invalid Tilt UUID literal"),
    }
}

/// The fixed proximity UUIDs advertised by the eight Tilt colors.
pub const TILT_COLORS: [(Uuid, &str); 8] = [
    (tilt_uuid("a495bb10-c5b1-4b44-b512-1370f02d74de"), "Red"),
    (tilt_uuid("a495bb20-c5b1-4b44-b512-1370f02d74de"), "Green"),
    (tilt_uuid("a495bb30-c5b1-4b44-b512-1370f02d74de"), "Black"),
    (tilt_uuid("a495bb40-c5b1-4b44-b512-1370f02d74de"), "Purple"),
    (tilt_uuid("a495bb50-c5b1-4b44-b512-1370f02d74de"), "Orange"),
    (tilt_uuid("a495bb60-c5b1-4b44-b512-1370f02d74de"), "Blue"),
    (tilt_uuid("a495bb70-c5b1-4b44-b512-1370f02d74de"), "Yellow"),
    (tilt_uuid("a495bb80-c5b1-4b44-b512-1370f02d74de"), "Pink"),
];

/// Look up the Tilt color for a proximity UUID, if it is one.
pub fn color_for_uuid(uuid: &Uuid) -> Option<&'static str> {
    TILT_COLORS
        .iter()
        .find(|(known, _)| known == uuid)
        .map(|(_, color)| *color)
}
