use anyhow::{Context, Result};
use jelling::config::{load_config, AggregatorConfig};
use jelling::ingest::IngestionPipeline;
use jelling::nats::{run_subscriber, JetStreamPublisher, NatsClient};
use jelling::world::WorldState;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jelling=info,jelling_aggregator=info".into()),
        )
        .init();

    info!("Aggregator starting...");

    // Missing options fall back to defaults
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        None => {
            info!("No config file given, using defaults");
            AggregatorConfig::default()
        }
    };

    info!(
        update_interval_seconds = config.aggregator.update_interval_seconds,
        include_contacts = config.aggregator.stone_info_include_contacts,
        sensors = %config.channels.sensor_topic(),
        names = %config.channels.name_updates,
        "Configuration loaded"
    );

    let nats = NatsClient::connect(config.nats.clone())
        .await
        .context("Failed to initialize NATS client")?;
    nats.ensure_retained_stream(&config.channels.retained_topics())
        .await?;

    let world = Arc::new(WorldState::new());
    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&world),
        JetStreamPublisher::new(nats.jetstream().clone()),
        config.channels.clone(),
        config.aggregator.clone(),
    ));

    info!("Running...");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Interrupted, stopping...");
    };

    run_subscriber(pipeline, nats.client().clone(), &config.channels, shutdown).await?;

    info!(stones = world.stone_count(), "Done");
    Ok(())
}
