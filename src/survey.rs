/// Site survey: count every beacon heard over a scan period
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use log::info;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::models::{color_for_uuid, Beacon};
use crate::monitor::{BeaconSource, ScanError};
use crate::storage::StorageError;
use crate::utils::distinct_by_uuid;

/// Occurrence counts keyed by (uuid, major, minor), sorted for output.
pub type BeaconCounts = BTreeMap<(Uuid, u16, u16), u64>;

/// Fold one deduplicated batch into the counts.
///
/// Tilt hydrometers are excluded unless `include_tilts` is set; the survey
/// exists to see what else is broadcasting nearby.
pub fn tally(counts: &mut BeaconCounts, beacons: &[Beacon], include_tilts: bool) {
    for beacon in beacons {
        if include_tilts || color_for_uuid(&beacon.uuid).is_none() {
            *counts
                .entry((beacon.uuid, beacon.major, beacon.minor))
                .or_insert(0) += 1;
        }
    }
}

/// Scan repeatedly for the given number of minutes, counting observations.
pub async fn survey<S>(
    source: &mut S,
    minutes: u64,
    include_tilts: bool,
) -> Result<BeaconCounts, ScanError>
where
    S: BeaconSource + ?Sized,
{
    let deadline = Instant::now() + Duration::from_secs(minutes * 60);
    let mut counts = BeaconCounts::new();

    loop {
        let beacons = distinct_by_uuid(source.scan().await?);
        tally(&mut counts, &beacons, include_tilts);
        if Instant::now() >= deadline {
            break;
        }
        sleep(Duration::from_secs(1)).await;
    }

    info!("Survey heard {} distinct beacons", counts.len());
    Ok(counts)
}

/// Dump counts as CSV to a file, or aligned columns to stdout.
pub fn dump_counts(counts: &BeaconCounts, output: Option<&Path>) -> Result<(), StorageError> {
    match output {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)?;
            for ((uuid, major, minor), count) in counts {
                writer.write_record([
                    uuid.to_string(),
                    major.to_string(),
                    minor.to_string(),
                    count.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        None => {
            for ((uuid, major, minor), count) in counts {
                println!("{:>36} {:>5} {:>5} {:>5}", uuid, major, minor, count);
            }
        }
    }
    Ok(())
}
