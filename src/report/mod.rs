use crate::world::{BeaconId, Contact, Stone};
use serde::Deserialize;
use serde_json::Value;

mod decode;

pub use decode::{decode_json, decompress, parse_timestamp, DecodeError, ZLIB_MAGIC};

/// Periodic report published by a stone on `<sensor prefix><address>`
#[derive(Clone, Debug, Deserialize)]
pub struct SensorReport {
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub comment: String,

    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,

    pub data: Vec<ContactReport>,
}

/// One beacon observed by a stone during the report period
#[derive(Clone, Debug, Deserialize)]
pub struct ContactReport {
    pub mac: String,

    // Only beacons advertising iBeacon frames carry these
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub major: Option<u16>,
    #[serde(default)]
    pub minor: Option<u16>,

    pub min: i32,
    pub max: i32,
    pub avg: i32,
    #[serde(rename = "remoteRssi")]
    pub remote_rssi: i32,
}

/// Description change published on the name-update topic
#[derive(Clone, Debug, Deserialize)]
pub struct NameUpdate {
    pub mac: String,
    pub name: String,
    pub color: Value,
}

impl ContactReport {
    /// Beacon identity if all three fields were reported, zero identity otherwise
    pub fn beacon_id(&self) -> BeaconId {
        match (&self.uuid, self.major, self.minor) {
            (Some(uuid), Some(major), Some(minor)) => BeaconId::new(uuid.clone(), major, minor),
            _ => BeaconId::default(),
        }
    }

    pub fn into_contact(self, timestamp: i64) -> Contact {
        Contact {
            timestamp,
            beacon: self.beacon_id(),
            source_address: self.mac,
            rssi_min: self.min,
            rssi_max: self.max,
            rssi_avg: self.avg,
            tx_rssi: self.remote_rssi,
        }
    }
}

impl SensorReport {
    /// Decode a (possibly zlib-compressed) sensor payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        decode_json(payload)
    }

    /// Build the stone snapshot this report describes.
    ///
    /// Every contact is stamped with the report timestamp.
    pub fn into_stone(self, address: &str) -> Result<Stone, DecodeError> {
        if address.is_empty() {
            return Err(DecodeError::MissingStoneAddress);
        }

        let timestamp = parse_timestamp(&self.timestamp)?;
        let contacts: Vec<Contact> = self
            .data
            .into_iter()
            .map(|c| c.into_contact(timestamp))
            .collect();

        let mut stone = Stone::new(
            address,
            BeaconId::new(self.uuid, self.major, self.minor),
            self.comment,
        );
        stone.update(timestamp, contacts);
        Ok(stone)
    }
}

impl NameUpdate {
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        decode_json(payload)
    }
}
