use super::client::topic_to_subject;
use crate::ingest::Publisher;
use anyhow::{Context, Result};
use async_nats::jetstream;
use async_trait::async_trait;
use tracing::debug;

/// Publishes snapshots into the retained JetStream stream
#[derive(Clone)]
pub struct JetStreamPublisher {
    jetstream: jetstream::Context,
}

impl JetStreamPublisher {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl Publisher for JetStreamPublisher {
    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let subject = topic_to_subject(topic);

        debug!(subject = %subject, bytes = payload.len(), "Publishing snapshot to NATS");

        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish snapshot to subject '{}'", subject))?
            .await
            .context("Failed to await publish ack")?;

        Ok(())
    }
}
