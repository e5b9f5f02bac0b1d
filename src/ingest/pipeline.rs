use super::Publisher;
use crate::aggregate::{aggregate_descriptions, aggregate_graph, aggregate_stones};
use crate::config::{AggregationConfig, ChannelConfig};
use crate::report::{DecodeError, NameUpdate, SensorReport};
use crate::world::WorldState;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Kind of inbound message, as resolved from its topic by the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Sensor report; carries the stone address taken from the topic suffix
    Report(&'a str),
    NameUpdate,
}

/// What a successfully merged report triggered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    Published,
    Throttled,
}

/// Decodes inbound messages into the world state and republishes snapshots
pub struct IngestionPipeline<P> {
    world: Arc<WorldState>,
    publisher: P,
    channels: ChannelConfig,
    settings: AggregationConfig,

    /// Epoch seconds of the last Stones/Graph publication
    last_published: Mutex<i64>,
}

impl<P: Publisher> IngestionPipeline<P> {
    pub fn new(
        world: Arc<WorldState>,
        publisher: P,
        channels: ChannelConfig,
        settings: AggregationConfig,
    ) -> Self {
        Self {
            world,
            publisher,
            channels,
            settings,
            last_published: Mutex::new(0),
        }
    }

    pub fn world(&self) -> &Arc<WorldState> {
        &self.world
    }

    /// Handle one inbound message; decode failures are logged and dropped
    pub async fn handle(&self, inbound: Inbound<'_>, payload: &[u8], now: i64) {
        let result = match inbound {
            Inbound::Report(stone) => self.handle_report(stone, payload, now).await.map(|_| ()),
            Inbound::NameUpdate => self.handle_name_update(payload).await,
        };

        if let Err(e) = result {
            warn!(
                kind = ?inbound,
                bytes = payload.len(),
                error = %e,
                "Could not decode message, dropping"
            );
        }
    }

    /// Merge a sensor report for `topic_suffix` and republish the stone and
    /// graph views unless the last publication is younger than the update
    /// interval.
    pub async fn handle_report(
        &self,
        topic_suffix: &str,
        payload: &[u8],
        now: i64,
    ) -> Result<ReportOutcome, DecodeError> {
        let stone = SensorReport::from_payload(payload)?.into_stone(topic_suffix)?;

        debug!(
            stone = %topic_suffix,
            contacts = stone.contacts().len(),
            timestamp = stone.last_update(),
            "Sensor report"
        );
        self.world.upsert_stone(stone);

        if !self.claim_publish_slot(now) {
            return Ok(ReportOutcome::Throttled);
        }

        let include_contacts = self.settings.stone_info_include_contacts;
        let (stones, graph) = self.world.read(|view| {
            (
                aggregate_stones(view.stones, include_contacts),
                aggregate_graph(view.stones, now),
            )
        });

        let stones = encode(&stones);
        let graph = encode(&graph);
        if let Some(stones) = stones {
            self.publish(&self.channels.stone_info, stones).await;
        }
        if let Some(graph) = graph {
            self.publish(&self.channels.graph_info, graph).await;
        }

        Ok(ReportOutcome::Published)
    }

    /// Store a description and republish the full description view
    pub async fn handle_name_update(&self, payload: &[u8]) -> Result<(), DecodeError> {
        let update = NameUpdate::from_payload(payload)?;

        info!(stone = %update.mac, name = %update.name, "Description update");
        self.world
            .upsert_description(&update.mac, update.name, update.color);

        let names = self
            .world
            .read(|view| aggregate_descriptions(view.descriptions));
        if let Some(names) = encode(&names) {
            self.publish(&self.channels.names, names).await;
        }

        Ok(())
    }

    /// Check the throttle and, if open, advance it to `now` in one step
    fn claim_publish_slot(&self, now: i64) -> bool {
        let mut last = self
            .last_published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if now - *last < self.settings.update_interval_seconds {
            return false;
        }
        *last = now;
        true
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) {
        let bytes = payload.len();
        match self.publisher.publish_retained(topic, payload).await {
            Ok(()) => debug!(topic = %topic, bytes, "Published snapshot"),
            Err(e) => error!(topic = %topic, error = %e, "Failed to publish snapshot"),
        }
    }
}

fn encode<T: Serialize>(document: &T) -> Option<Vec<u8>> {
    serde_json::to_vec(document)
        .map_err(|e| error!(error = %e, "Failed to serialize snapshot"))
        .ok()
}
