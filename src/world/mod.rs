// World state: stones, their recent contacts and human-readable descriptions

mod beacon;
mod stone;
mod store;

pub use beacon::{BeaconId, Contact};
pub use stone::{Stone, CONTACT_WINDOW_SECS};
pub use store::{Description, WorldSnapshot, WorldState};
