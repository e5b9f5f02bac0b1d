// Stones, contacts and the shared world state
pub mod world;

// Consumer-facing snapshot views
pub mod aggregate;

// Inbound message schemas and decoding
pub mod report;

// Ingestion pipeline and publish capability
pub mod ingest;

// Configuration loading
pub mod config;

// NATS transport binding
pub mod nats;
