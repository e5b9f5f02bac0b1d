use anyhow::{Context, Result};
use serde::Deserialize;

// Re-export existing config types
pub use crate::nats::NatsConfig;

/// Complete aggregator configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub aggregator: AggregationConfig,
}

/// Topic names, in broker-neutral slash form (`JellingStone/+`)
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Stones report on `<sensor_prefix><stone address>`
    #[serde(default = "default_sensor_prefix")]
    pub sensor_prefix: String,
    #[serde(default = "default_name_updates")]
    pub name_updates: String,
    #[serde(default = "default_stone_info")]
    pub stone_info: String,
    #[serde(default = "default_graph_info")]
    pub graph_info: String,
    #[serde(default = "default_names")]
    pub names: String,
}

fn default_sensor_prefix() -> String {
    "JellingStone/".to_string()
}

fn default_name_updates() -> String {
    "NameUpdate".to_string()
}

fn default_stone_info() -> String {
    "Aggregated/Stones".to_string()
}

fn default_graph_info() -> String {
    "Aggregated/Graph".to_string()
}

fn default_names() -> String {
    "Aggregated/Names".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            sensor_prefix: default_sensor_prefix(),
            name_updates: default_name_updates(),
            stone_info: default_stone_info(),
            graph_info: default_graph_info(),
            names: default_names(),
        }
    }
}

impl ChannelConfig {
    /// Wildcard topic matching every stone report
    pub fn sensor_topic(&self) -> String {
        format!("{}+", self.sensor_prefix)
    }

    /// Output topics that must be retained by the broker
    pub fn retained_topics(&self) -> Vec<String> {
        vec![
            self.stone_info.clone(),
            self.graph_info.clone(),
            self.names.clone(),
        ]
    }
}

/// Publication policy
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Minimum spacing between Stones/Graph snapshots (seconds)
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: i64,
    /// Whether the Stones view lists each stone's current contacts
    #[serde(default = "default_include_contacts")]
    pub stone_info_include_contacts: bool,
}

fn default_update_interval() -> i64 {
    4
}

fn default_include_contacts() -> bool {
    true
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            update_interval_seconds: default_update_interval(),
            stone_info_include_contacts: default_include_contacts(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AggregatorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: AggregatorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path))?;
    Ok(config)
}
