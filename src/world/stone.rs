use super::beacon::{BeaconId, Contact};

/// Contacts older than this (relative to the latest report) are evicted
pub const CONTACT_WINDOW_SECS: i64 = 60;

/// A fixed scanning node and the contacts it observed recently
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stone {
    /// Stone address (topic suffix it reports on); identity key
    address: String,

    pub beacon: BeaconId,

    pub comment: String,

    /// Unix epoch seconds of the last applied report
    last_update: i64,

    /// At most one entry per source address, in arrival order
    contacts: Vec<Contact>,
}

impl Stone {
    /// Create a stone with no contacts and `last_update = 0`
    pub fn new(address: impl Into<String>, beacon: BeaconId, comment: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            beacon,
            comment: comment.into(),
            last_update: 0,
            contacts: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Apply a report taken at `timestamp`.
    ///
    /// Evicts contacts that fell out of the window ending at `timestamp`,
    /// replaces entries that share a source address with an incoming contact,
    /// then records `timestamp` as the last update.
    ///
    /// `timestamp` is trusted as-is: an older report still moves `last_update`
    /// backwards, and the next call's window is computed from its own timestamp.
    pub fn update(&mut self, timestamp: i64, recent: impl IntoIterator<Item = Contact>) {
        let horizon = timestamp - CONTACT_WINDOW_SECS;
        self.contacts.retain(|c| c.timestamp >= horizon);

        for contact in recent {
            self.contacts
                .retain(|c| c.source_address != contact.source_address);
            self.contacts.push(contact);
        }

        self.last_update = timestamp;
    }

    /// Split into the parts an upsert needs without cloning the contacts
    pub(crate) fn into_report(self) -> (String, i64, Vec<Contact>) {
        (self.address, self.last_update, self.contacts)
    }
}
