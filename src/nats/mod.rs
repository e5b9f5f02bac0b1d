// NATS transport binding

mod client;
mod publisher;
mod subscriber;

pub use client::{topic_to_subject, NatsClient, NatsConfig};
pub use publisher::JetStreamPublisher;
pub use subscriber::{run_subscriber, SubjectRouter};
