// Message ingestion: decode, merge into world state, republish snapshots

mod pipeline;
#[cfg(test)]
mod tests;

pub use pipeline::{Inbound, IngestionPipeline, ReportOutcome};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability to hand a serialized snapshot to the broker.
///
/// Delivery must be retained: the broker keeps the latest payload per topic
/// for subscribers that connect later.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        (**self).publish_retained(topic, payload).await
    }
}
