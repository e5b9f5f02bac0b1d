use super::client::topic_to_subject;
use crate::config::ChannelConfig;
use crate::ingest::{Inbound, IngestionPipeline, Publisher};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves NATS subjects to inbound message kinds
#[derive(Clone, Debug)]
pub struct SubjectRouter {
    /// Sensor subject prefix, including the trailing `.`
    sensor_prefix: String,
    name_updates: String,
}

impl SubjectRouter {
    pub fn new(channels: &ChannelConfig) -> Self {
        Self {
            sensor_prefix: topic_to_subject(&channels.sensor_prefix),
            name_updates: topic_to_subject(&channels.name_updates),
        }
    }

    pub fn route<'a>(&self, subject: &'a str) -> Option<Inbound<'a>> {
        if let Some(stone) = subject.strip_prefix(self.sensor_prefix.as_str()) {
            return Some(Inbound::Report(stone));
        }
        if subject == self.name_updates {
            return Some(Inbound::NameUpdate);
        }
        None
    }
}

/// Subscribe to sensor reports and name updates and feed them to `pipeline`
/// until `shutdown` resolves or the subscriptions end.
///
/// Messages are handled one at a time in arrival order.
pub async fn run_subscriber<P: Publisher>(
    pipeline: Arc<IngestionPipeline<P>>,
    client: async_nats::Client,
    channels: &ChannelConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let router = SubjectRouter::new(channels);

    let sensor_subject = topic_to_subject(&channels.sensor_topic());
    let name_subject = topic_to_subject(&channels.name_updates);

    let sensors = client
        .subscribe(sensor_subject.clone())
        .await
        .with_context(|| format!("Failed to subscribe to '{}'", sensor_subject))?;
    let names = client
        .subscribe(name_subject.clone())
        .await
        .with_context(|| format!("Failed to subscribe to '{}'", name_subject))?;

    info!(sensors = %sensor_subject, names = %name_subject, "Subscribed, processing messages...");

    let mut messages = futures::stream::select(sensors, names);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            next = messages.next() => {
                let Some(msg) = next else {
                    warn!("Subscription stream ended");
                    break;
                };

                match router.route(msg.subject.as_str()) {
                    Some(inbound) => {
                        pipeline
                            .handle(inbound, &msg.payload, Utc::now().timestamp())
                            .await;
                    }
                    None => warn!(subject = %msg.subject.as_str(), "Message on unexpected subject, ignoring"),
                }
            }
        }
    }

    client
        .flush()
        .await
        .context("Failed to flush NATS connection")?;
    Ok(())
}
