/// Bluetooth Low Energy scanning and iBeacon decoding
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, error, warn};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::models::Beacon;
use crate::monitor::{BeaconSource, ScanError};

// iBeacon protocol constants
const APPLE_MANUFACTURER_ID: u16 = 0x004c; // Apple Inc. manufacturer ID
const IBEACON_TYPE: u8 = 0x02; // iBeacon indicator
const IBEACON_PAYLOAD_LEN: usize = 23; // type, length, UUID, major, minor, TX power
const SCAN_WINDOW_SECS: u64 = 10; // How long to actively scan per call

/// Decode an iBeacon manufacturer payload into a beacon observation
///
/// The 23-byte payload is structured as:
/// - Byte 0: type (0x02 for iBeacon)
/// - Byte 1: remaining length (0x15)
/// - Bytes 2-17: 128-bit proximity UUID
/// - Bytes 18-19: major (big-endian; Tilts encode temperature in °F)
/// - Bytes 20-21: minor (big-endian; Tilts encode specific gravity)
/// - Byte 22: calibrated TX power (unused here)
///
/// # Returns
/// Some(Beacon) if decoding succeeds, None if the payload is not an iBeacon
pub fn decode_ibeacon(data: &[u8]) -> Option<Beacon> {
    if data.len() != IBEACON_PAYLOAD_LEN || data[0] != IBEACON_TYPE || data[1] != 0x15 {
        if !data.is_empty() {
            debug!("Not an iBeacon payload: len={}, type={}", data.len(), data[0]);
        }
        return None;
    }

    let uuid = Uuid::from_slice(&data[2..18]).ok()?;
    let major = u16::from_be_bytes([data[18], data[19]]);
    let minor = u16::from_be_bytes([data[20], data[21]]);

    Some(Beacon { uuid, major, minor })
}

/// Beacon source backed by the default BlueZ adapter.
pub struct HciScanner {
    adapter: bluer::Adapter,
}

impl HciScanner {
    /// Open the default Bluetooth adapter and power it on
    ///
    /// Failure here is fatal for a run; callers are expected to exit.
    pub async fn open() -> Result<Self, ScanError> {
        let session = match bluer::Session::new().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create Bluetooth session: {}", e);
                return Err(e.into());
            }
        };

        let adapter = match session.default_adapter().await {
            Ok(adapter) => adapter,
            Err(e) => {
                error!("Failed to get default Bluetooth adapter: {}", e);
                return Err(e.into());
            }
        };

        if let Err(e) = adapter.set_powered(true).await {
            error!("Failed to power on adapter: {}", e);
            return Err(e.into());
        }

        Ok(Self { adapter })
    }
}

#[async_trait]
impl BeaconSource for HciScanner {
    /// Scan for one window and return every iBeacon observation found
    ///
    /// Deduplication is left to the caller; this returns raw observations
    /// in enumeration order.
    async fn scan(&mut self) -> Result<Vec<Beacon>, ScanError> {
        // Configure discovery filter for Low Energy devices only
        let filter = bluer::DiscoveryFilter {
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: false,
            ..Default::default()
        };

        // Apply the discovery filter (warn if it fails, but continue)
        if let Err(e) = self.adapter.set_discovery_filter(filter).await {
            warn!("Failed to set discovery filter: {}", e);
        }

        // Start device discovery in background
        let discovery_handle = {
            match self.adapter.discover_devices().await {
                Ok(discovery_stream) => tokio::spawn(async move {
                    let mut stream = discovery_stream;
                    while let Some(event) = stream.next().await {
                        debug!("Discovery event: {:?}", event);
                    }
                }),
                Err(e) => {
                    error!("Failed to start device discovery: {}", e);
                    return Err(e.into());
                }
            }
        };

        // Let discovery run for the scan window
        sleep(Duration::from_secs(SCAN_WINDOW_SECS)).await;
        discovery_handle.abort();

        let mut beacons = Vec::new();
        for addr in self.adapter.device_addresses().await? {
            let device = match self.adapter.device(addr) {
                Ok(device) => device,
                Err(_) => continue,
            };

            match device.manufacturer_data().await {
                Ok(Some(manufacturer_data)) => {
                    if let Some(payload) = manufacturer_data.get(&APPLE_MANUFACTURER_ID) {
                        if let Some(beacon) = decode_ibeacon(payload) {
                            debug!(
                                "Beacon from {}: uuid={} major={} minor={}",
                                addr, beacon.uuid, beacon.major, beacon.minor
                            );
                            beacons.push(beacon);
                        }
                    }
                }
                Ok(None) => {
                    debug!("No manufacturer data for {}", addr);
                }
                Err(e) => {
                    debug!("Failed to get manufacturer data for {}: {}", addr, e);
                }
            }
        }

        Ok(beacons)
    }
}
