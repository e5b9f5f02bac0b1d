/// Logical beacon identifier (iBeacon UUID + major + minor)
///
/// Independent of the physical address a beacon advertises from. The default
/// value (`""`, 0, 0) stands for "identity unknown".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BeaconId {
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
}

impl BeaconId {
    pub fn new(uuid: impl Into<String>, major: u16, minor: u16) -> Self {
        Self {
            uuid: uuid.into(),
            major,
            minor,
        }
    }
}

/// Most recent observation of one mobile beacon by one stone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    /// Unix epoch seconds of the report that carried this observation
    pub timestamp: i64,

    /// Physical (MAC) address of the observed beacon
    pub source_address: String,

    pub beacon: BeaconId,

    pub rssi_min: i32,
    pub rssi_max: i32,
    pub rssi_avg: i32,

    /// Calibrated TX power advertised by the beacon
    pub tx_rssi: i32,
}
