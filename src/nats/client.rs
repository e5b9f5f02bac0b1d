use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream};
use async_nats::ConnectOptions;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tls_required: bool,
    /// Extra root certificate (PEM) used to verify the server
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// JetStream stream holding the last snapshot of every output topic
    #[serde(default = "default_retained_stream")]
    pub retained_stream: String,
}

fn default_url() -> String {
    std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

fn default_client_name() -> String {
    "Aggregator".to_string()
}

fn default_retained_stream() -> String {
    "AGGREGATED".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            client_name: default_client_name(),
            user: None,
            password: None,
            tls_required: false,
            ca_cert: None,
            retained_stream: default_retained_stream(),
        }
    }
}

/// Map a slash-separated topic (`JellingStone/+`) to a NATS subject
/// (`JellingStone.*`). `#` becomes the multi-level wildcard `>`.
pub fn topic_to_subject(topic: &str) -> String {
    topic
        .chars()
        .map(|c| match c {
            '/' => '.',
            '+' => '*',
            '#' => '>',
            other => other,
        })
        .collect()
}

/// NATS client with JetStream
pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Connect to NATS and initialize JetStream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        info!(url = %config.url, tls = config.tls_required, "Connecting to NATS");

        let mut options = ConnectOptions::new()
            .name(&config.client_name)
            .require_tls(config.tls_required);

        if let Some(user) = &config.user {
            let password = config.password.clone().unwrap_or_default();
            options = options.user_and_password(user.clone(), password);
        }
        if let Some(ca_cert) = &config.ca_cert {
            options = options.add_root_certificates(ca_cert.clone());
        }

        let client = options
            .connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        Ok(Self {
            client,
            jetstream,
            config,
        })
    }

    /// Ensure the retained-snapshot stream exists for `topics`.
    ///
    /// The stream keeps one message per subject, so a late subscriber always
    /// finds the latest snapshot of every output topic.
    pub async fn ensure_retained_stream(&self, topics: &[String]) -> Result<()> {
        let name = &self.config.retained_stream;
        info!("Ensuring JetStream stream '{}' exists", name);

        if self.jetstream.get_stream(name).await.is_ok() {
            info!("Stream '{}' already exists", name);
            return Ok(());
        }

        let stream_config = stream::Config {
            name: name.clone(),
            subjects: topics.iter().map(|t| topic_to_subject(t)).collect(),
            max_messages_per_subject: 1,
            storage: stream::StorageType::File,
            retention: stream::RetentionPolicy::Limits,
            ..Default::default()
        };

        self.jetstream
            .create_stream(stream_config)
            .await
            .context("Failed to create retained snapshot stream")?;

        info!("Created JetStream stream '{}'", name);
        Ok(())
    }

    /// Get JetStream context for publishing
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Get underlying NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}
