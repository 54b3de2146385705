/// Reading cycle control loop and the beacon source seam
use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::models::{color_for_uuid, Beacon, Reading, TiltRecord};
use crate::utils::{aggregate_readings, distinct_by_uuid, iso_timestamp, now_epoch, to_celsius};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),
}

/// Anything that can produce one batch of beacon observations.
///
/// The production implementation scans over BlueZ; tests script batches.
#[async_trait]
pub trait BeaconSource {
    async fn scan(&mut self) -> Result<Vec<Beacon>, ScanError>;
}

/// Run the configured number of reading cycles and aggregate the results
///
/// Within each cycle the source is polled while the give-up deadline has
/// not passed and no configured color has reported; once the deadline
/// elapses, remaining cycles perform no scans and the run falls through to
/// aggregation. Between cycles the loop waits `wait_seconds`, skipped once
/// the deadline has passed. Colors that never report still produce a
/// placeholder record stamped with the run start.
pub async fn monitor_tilt<S>(source: &mut S, config: &Config) -> Result<Vec<TiltRecord>, ScanError>
where
    S: BeaconSource + ?Sized,
{
    let settings = &config.readings;
    let start_epoch = now_epoch();
    let give_up = Duration::from_secs_f64(settings.give_up_minutes.max(0.0) * 60.0);
    let wait = Duration::from_secs_f64(settings.wait_seconds.max(0.0));
    let deadline = Instant::now() + give_up;

    info!(
        "Starting run of {} cycles at {}",
        settings.number,
        iso_timestamp(start_epoch)
    );

    let mut captured: HashMap<String, Vec<Reading>> = HashMap::new();

    for cycle in 0..settings.number {
        if cycle > 0 && Instant::now() < deadline {
            debug!("Waiting {:.1}s before next cycle", wait.as_secs_f64());
            sleep(wait).await;
        }
        info!("Starting cycle {} of {}", cycle + 1, settings.number);

        let mut found = false;
        while !found && Instant::now() < deadline {
            let beacons = distinct_by_uuid(source.scan().await?);
            debug!("Found {} distinct beacons", beacons.len());

            for beacon in beacons {
                let Some(color) = color_for_uuid(&beacon.uuid) else {
                    continue;
                };
                if !config.hydrometers.contains_key(color) {
                    debug!("Ignoring unconfigured {} tilt", color);
                    continue;
                }

                found = true;
                let reading = Reading {
                    epoch: now_epoch(),
                    gravity: beacon.minor as f64,
                    fahrenheit: beacon.major as f64,
                };
                info!(
                    "Got {}: sg={} temp={:.1}°F ({:.1}°C)",
                    color,
                    reading.gravity,
                    reading.fahrenheit,
                    to_celsius(reading.fahrenheit)
                );
                captured
                    .entry(color.to_string())
                    .or_default()
                    .push(reading);
            }
        }
    }

    if captured.is_empty() {
        warn!("No readings captured during this run!");
    }

    Ok(aggregate_readings(&captured, config, start_epoch))
}

/// Continuously scan and print every decoded beacon
///
/// Known Tilt colors are shown with their decoded temperature and gravity,
/// anything else with its raw major/minor fields. Runs until interrupted.
pub async fn watch_beacons<S>(source: &mut S) -> Result<(), ScanError>
where
    S: BeaconSource + ?Sized,
{
    loop {
        let beacons = distinct_by_uuid(source.scan().await?);
        println!();
        println!("beacons found: {}", beacons.len());
        for beacon in &beacons {
            println!("beacon {}", beacon.uuid);
            match color_for_uuid(&beacon.uuid) {
                Some(color) => {
                    println!("  color {}", color);
                    println!("  timestamp {}", iso_timestamp(now_epoch()));
                    println!("  temp {}", to_celsius(beacon.major as f64));
                    println!("  gravity {}", beacon.minor);
                }
                None => {
                    println!("  major {}", beacon.major);
                    println!("  minor {}", beacon.minor);
                }
            }
        }
        sleep(Duration::from_secs(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadingSettings;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use uuid::Uuid;

    const RED: &str = "a495bb10-c5b1-4b44-b512-1370f02d74de";
    const GREEN: &str = "a495bb20-c5b1-4b44-b512-1370f02d74de";

    struct Scripted {
        batches: VecDeque<Vec<Beacon>>,
        calls: u32,
    }

    impl Scripted {
        fn new(batches: Vec<Vec<Beacon>>) -> Self {
            Self {
                batches: batches.into(),
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl BeaconSource for Scripted {
        async fn scan(&mut self) -> Result<Vec<Beacon>, ScanError> {
            self.calls += 1;
            Ok(self.batches.pop_front().unwrap_or_default())
        }
    }

    fn beacon(uuid: &str, major: u16, minor: u16) -> Beacon {
        Beacon {
            uuid: Uuid::parse_str(uuid).unwrap(),
            major,
            minor,
        }
    }

    fn config(colors: &[&str], number: u32, wait_seconds: f64, give_up_minutes: f64) -> Config {
        Config {
            hydrometers: colors
                .iter()
                .map(|c| (c.to_string(), PathBuf::from(format!("{c}.csv"))))
                .collect(),
            readings: ReadingSettings {
                number,
                wait_seconds,
                give_up_minutes,
            },
            mail_to: Vec::new(),
            mail_from: None,
        }
    }

    #[tokio::test]
    async fn zero_give_up_skips_scanning_entirely() {
        // The deadline has already elapsed at run start, so no cycle may
        // scan; the run ends immediately with placeholder records.
        let mut source = Scripted::new(vec![vec![beacon(RED, 70, 1012)]]);
        let config = config(&["Red"], 3, 0.0, 0.0);

        let records = monitor_tilt(&mut source, &config).await.unwrap();

        assert_eq!(source.calls, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reading_count, 0);
        assert_eq!(records[0].gravity, None);
    }

    #[tokio::test]
    async fn aggregates_readings_across_cycles() {
        let mut source = Scripted::new(vec![
            vec![beacon(RED, 70, 1010)],
            vec![beacon(RED, 71, 1012)],
            vec![beacon(RED, 69, 1014)],
        ]);
        let config = config(&["Red"], 3, 0.0, 1.0);

        let records = monitor_tilt(&mut source, &config).await.unwrap();

        assert_eq!(source.calls, 3);
        let record = &records[0];
        assert_eq!(record.color, "Red");
        assert_eq!(record.reading_count, 3);
        assert_eq!(record.gravity, Some(1012.0));
        assert_eq!(record.fahrenheit, Some(70.0));
        assert_eq!(record.celsius, Some(21.1));
    }

    #[tokio::test]
    async fn duplicate_uuid_in_batch_yields_one_reading() {
        let mut source = Scripted::new(vec![vec![
            beacon(RED, 70, 1010),
            beacon(RED, 99, 1099),
        ]]);
        let config = config(&["Red"], 1, 0.0, 1.0);

        let records = monitor_tilt(&mut source, &config).await.unwrap();

        let record = &records[0];
        assert_eq!(record.reading_count, 1);
        assert_eq!(record.gravity, Some(1010.0));
        assert_eq!(record.fahrenheit, Some(70.0));
    }

    #[tokio::test]
    async fn unconfigured_color_is_ignored() {
        // The Green tilt does not satisfy the cycle, so polling continues
        // until the configured Red reports.
        let mut source = Scripted::new(vec![
            vec![beacon(GREEN, 65, 1040)],
            vec![beacon(RED, 70, 1012)],
        ]);
        let config = config(&["Red"], 1, 0.0, 1.0);

        let records = monitor_tilt(&mut source, &config).await.unwrap();

        assert_eq!(source.calls, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].color, "Red");
        assert_eq!(records[0].reading_count, 1);
        assert_eq!(records[0].gravity, Some(1012.0));
    }

    #[tokio::test]
    async fn polls_until_a_configured_color_is_found() {
        let mut source = Scripted::new(vec![
            Vec::new(),
            Vec::new(),
            vec![beacon(RED, 68, 1020)],
        ]);
        let config = config(&["Red"], 1, 0.0, 1.0);

        let records = monitor_tilt(&mut source, &config).await.unwrap();

        assert_eq!(source.calls, 3);
        assert_eq!(records[0].reading_count, 1);
        assert_eq!(records[0].gravity, Some(1020.0));
    }
}
