// Observability for the routing layer
pub mod instance_id;
pub mod metrics;

// Re-export main API
pub use instance_id::broker_instance_id;
pub use metrics::BrokerMetrics;
