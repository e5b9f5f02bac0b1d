use super::*;
use crate::config::{AggregationConfig, ChannelConfig};
use crate::report::DecodeError;
use crate::world::WorldState;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

const T0: i64 = 1_707_656_400; // 2024-02-11T13:00:00Z

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    fn topics(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    fn last(&self, topic: &str) -> Option<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let value = serde_json::from_slice(&payload)?;
        self.sent.lock().unwrap().push((topic.to_string(), value));
        Ok(())
    }
}

struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish_retained(&self, _topic: &str, _payload: Vec<u8>) -> Result<()> {
        Err(anyhow!("broker unavailable"))
    }
}

fn pipeline(
    settings: AggregationConfig,
) -> (IngestionPipeline<Arc<RecordingPublisher>>, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let pipeline = IngestionPipeline::new(
        Arc::new(WorldState::new()),
        Arc::clone(&publisher),
        ChannelConfig::default(),
        settings,
    );
    (pipeline, publisher)
}

fn timestamp(epoch: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0)
        .unwrap()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

fn report(epoch: i64, macs: &[&str]) -> Vec<u8> {
    let data: Vec<Value> = macs
        .iter()
        .map(|mac| json!({"mac": mac, "min": -90, "max": -60, "avg": -75, "remoteRssi": -59}))
        .collect();

    serde_json::to_vec(&json!({
        "uuid": "f7826da6",
        "major": 1,
        "minor": 2,
        "comment": "lab",
        "timestamp": timestamp(epoch),
        "data": data
    }))
    .unwrap()
}

#[tokio::test]
async fn test_first_report_publishes_stones_and_graph() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    let outcome = pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();

    assert_eq!(outcome, ReportOutcome::Published);
    assert_eq!(
        publisher.topics(),
        vec!["Aggregated/Stones", "Aggregated/Graph"]
    );

    let stones = publisher.last("Aggregated/Stones").unwrap();
    assert_eq!(stones["s1"]["last_seen"], json!(T0));
    assert_eq!(stones["s1"]["contacts"][0]["mac"], json!("m1"));

    let graph = publisher.last("Aggregated/Graph").unwrap();
    assert_eq!(graph["s1"]["age"], json!(0));
}

#[tokio::test]
async fn test_reports_within_interval_publish_once() {
    let settings = AggregationConfig::default();
    let interval = settings.update_interval_seconds;
    let (pipeline, publisher) = pipeline(settings);

    pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();
    let second = pipeline
        .handle_report("s1", &report(T0 + interval - 1, &["m2"]), T0 + interval - 1)
        .await
        .unwrap();

    assert_eq!(second, ReportOutcome::Throttled);
    assert_eq!(publisher.topics().len(), 2);

    // The throttled report is still merged
    let stone = pipeline.world().get_stone("s1").unwrap();
    assert_eq!(stone.contacts().len(), 2);
}

#[tokio::test]
async fn test_report_after_interval_publishes_again() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();
    let outcome = pipeline
        .handle_report("s2", &report(T0 + 4, &["m1"]), T0 + 4)
        .await
        .unwrap();

    assert_eq!(outcome, ReportOutcome::Published);
    assert_eq!(publisher.topics().len(), 4);

    let graph = publisher.last("Aggregated/Graph").unwrap();
    assert_eq!(graph["s1"]["age"], json!(4));
    assert_eq!(graph["s2"]["age"], json!(0));
}

#[tokio::test]
async fn test_stone_view_without_contacts() {
    let (pipeline, publisher) = pipeline(AggregationConfig {
        stone_info_include_contacts: false,
        ..AggregationConfig::default()
    });

    pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();

    let stones = publisher.last("Aggregated/Stones").unwrap();
    assert!(stones["s1"].get("contacts").is_none());

    // Graph always carries contacts
    let graph = publisher.last("Aggregated/Graph").unwrap();
    assert_eq!(graph["s1"]["contacts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_compressed_report_is_accepted() {
    let (pipeline, _publisher) = pipeline(AggregationConfig::default());

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&report(T0, &["m1", "m2"])).unwrap();
    let payload = encoder.finish().unwrap();

    pipeline.handle_report("s1", &payload, T0).await.unwrap();
    assert_eq!(pipeline.world().get_stone("s1").unwrap().contacts().len(), 2);
}

#[tokio::test]
async fn test_malformed_report_leaves_world_unchanged() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());
    pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();
    let before = pipeline.world().get_all_stones();

    let valid = report(T0 + 10, &["m2"]);
    let truncated = &valid[..valid.len() - 5];
    let result = pipeline.handle_report("s1", truncated, T0 + 10).await;

    assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    assert_eq!(pipeline.world().get_all_stones(), before);
    assert_eq!(publisher.topics().len(), 2);
}

#[tokio::test]
async fn test_decode_error_does_not_consume_throttle() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    let _ = pipeline.handle_report("s1", b"not json", T0).await;
    let outcome = pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();

    assert_eq!(outcome, ReportOutcome::Published);
    assert_eq!(publisher.topics().len(), 2);
}

#[tokio::test]
async fn test_name_update_publishes_every_time() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    pipeline
        .handle_name_update(br##"{"mac": "s1", "name": "Lab", "color": "#ff0000"}"##)
        .await
        .unwrap();
    pipeline
        .handle_name_update(br##"{"mac": "s2", "name": "Hall", "color": "#00ff00"}"##)
        .await
        .unwrap();
    pipeline
        .handle_name_update(br##"{"mac": "s1", "name": "Workshop", "color": "#0000ff"}"##)
        .await
        .unwrap();

    assert_eq!(
        publisher.topics(),
        vec!["Aggregated/Names", "Aggregated/Names", "Aggregated/Names"]
    );
    assert_eq!(
        publisher.last("Aggregated/Names").unwrap(),
        json!({
            "s1": {"name": "Workshop", "color": "#0000ff"},
            "s2": {"name": "Hall", "color": "#00ff00"}
        })
    );
}

#[tokio::test]
async fn test_malformed_name_update_is_dropped() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    let result = pipeline.handle_name_update(br#"{"mac": "s1"}"#).await;

    assert!(result.is_err());
    assert!(pipeline.world().get_description("s1").is_none());
    assert!(publisher.topics().is_empty());
}

#[tokio::test]
async fn test_handle_routes_and_swallows_errors() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());

    pipeline
        .handle(Inbound::Report("s1"), &report(T0, &["m1"]), T0)
        .await;
    pipeline
        .handle(Inbound::NameUpdate, &[0x78, 0x9c, 0x00], T0)
        .await;
    pipeline
        .handle(
            Inbound::NameUpdate,
            br#"{"mac": "s1", "name": "Lab", "color": 3}"#,
            T0,
        )
        .await;

    assert_eq!(pipeline.world().stone_count(), 1);
    assert_eq!(
        publisher.topics(),
        vec!["Aggregated/Stones", "Aggregated/Graph", "Aggregated/Names"]
    );
}

#[tokio::test]
async fn test_publish_failure_keeps_state() {
    let pipeline = IngestionPipeline::new(
        Arc::new(WorldState::new()),
        FailingPublisher,
        ChannelConfig::default(),
        AggregationConfig::default(),
    );

    let outcome = pipeline
        .handle_report("s1", &report(T0, &["m1"]), T0)
        .await
        .unwrap();

    assert_eq!(outcome, ReportOutcome::Published);
    assert!(pipeline.world().get_stone("s1").is_some());
}

#[tokio::test]
async fn test_concurrent_reports_publish_once_per_interval() {
    let (pipeline, publisher) = pipeline(AggregationConfig::default());
    let pipeline = Arc::new(pipeline);

    let mut handles = vec![];
    for i in 0..8 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            let stone = format!("s{}", i);
            pipeline
                .handle_report(&stone, &report(T0, &["m1"]), T0)
                .await
                .unwrap()
        }));
    }

    let mut published = 0;
    for handle in handles {
        if handle.await.unwrap() == ReportOutcome::Published {
            published += 1;
        }
    }

    assert_eq!(published, 1);
    assert_eq!(publisher.topics().len(), 2);
    assert_eq!(pipeline.world().stone_count(), 8);
}
