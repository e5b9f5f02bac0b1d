// Consumer-facing projections of the world state

use crate::world::{Contact, Description, Stone};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;


/// Stone configuration view, keyed by stone address
pub type StonesDocument = BTreeMap<String, StoneInfo>;

/// Age-relative view, keyed by stone address
pub type GraphDocument = BTreeMap<String, GraphNode>;

/// Description view, keyed by stone address
pub type NamesDocument = BTreeMap<String, NameInfo>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoneInfo {
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub comment: String,
    pub last_seen: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<ContactInfo>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContactInfo {
    pub mac: String,
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub rssi_avg: i32,
    pub rssi_tx: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphNode {
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub comment: String,
    pub age: i64,
    pub contacts: Vec<GraphEdge>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphEdge {
    pub mac: String,
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub age: i64,
    pub rssi_avg: i32,
    pub rssi_tx: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NameInfo {
    pub name: String,
    pub color: Value,
}

impl From<&Contact> for ContactInfo {
    fn from(c: &Contact) -> Self {
        Self {
            mac: c.source_address.clone(),
            uuid: c.beacon.uuid.clone(),
            major: c.beacon.major,
            minor: c.beacon.minor,
            rssi_avg: c.rssi_avg,
            rssi_tx: c.tx_rssi,
        }
    }
}

/// Current configuration of every stone, without timestamps on contacts.
///
/// With `include_contacts = false` each entry carries no `contacts` key at all.
pub fn aggregate_stones(
    stones: &BTreeMap<String, Stone>,
    include_contacts: bool,
) -> StonesDocument {
    stones
        .iter()
        .map(|(address, stone)| {
            let contacts = include_contacts
                .then(|| stone.contacts().iter().map(ContactInfo::from).collect());

            let info = StoneInfo {
                uuid: stone.beacon.uuid.clone(),
                major: stone.beacon.major,
                minor: stone.beacon.minor,
                comment: stone.comment.clone(),
                last_seen: stone.last_update(),
                contacts,
            };
            (address.clone(), info)
        })
        .collect()
}

/// Stones and contacts with ages relative to `now` (epoch seconds)
pub fn aggregate_graph(stones: &BTreeMap<String, Stone>, now: i64) -> GraphDocument {
    stones
        .iter()
        .map(|(address, stone)| {
            let contacts = stone
                .contacts()
                .iter()
                .map(|c| GraphEdge {
                    mac: c.source_address.clone(),
                    uuid: c.beacon.uuid.clone(),
                    major: c.beacon.major,
                    minor: c.beacon.minor,
                    age: now - c.timestamp,
                    rssi_avg: c.rssi_avg,
                    rssi_tx: c.tx_rssi,
                })
                .collect();

            let node = GraphNode {
                uuid: stone.beacon.uuid.clone(),
                major: stone.beacon.major,
                minor: stone.beacon.minor,
                comment: stone.comment.clone(),
                age: now - stone.last_update(),
                contacts,
            };
            (address.clone(), node)
        })
        .collect()
}

pub fn aggregate_descriptions(descriptions: &BTreeMap<String, Description>) -> NamesDocument {
    descriptions
        .iter()
        .map(|(address, d)| {
            (
                address.clone(),
                NameInfo {
                    name: d.name.clone(),
                    color: d.color.clone(),
                },
            )
        })
        .collect()
}
