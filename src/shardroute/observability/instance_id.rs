//! Broker instance identity
//!
//! Routing snapshots carry the identity of the broker that produced them so
//! operators can tell brokers apart when diffing snapshots across a fleet.
//! Works across both Kubernetes (POD_NAME) and plain-host (HOSTNAME)
//! deployments.

use std::sync::OnceLock;
use uuid::Uuid;

static INSTANCE_ID: OnceLock<String> = OnceLock::new();

/// Get or generate this broker's instance identifier.
///
/// Resolution order: `POD_NAME`, `HOSTNAME`, `NODE_ID`, then `"unknown"`,
/// always suffixed with a short random tag so two brokers on the same host
/// stay distinguishable. The result is cached for the process lifetime.
pub fn broker_instance_id() -> String {
    INSTANCE_ID
        .get_or_init(|| {
            let base_id = std::env::var("POD_NAME")
                .or_else(|_| std::env::var("HOSTNAME"))
                .or_else(|_| std::env::var("NODE_ID"))
                .unwrap_or_else(|_| "unknown".to_string());

            let uuid_suffix = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(4)
                .collect::<String>();

            format!("{}-{}", base_id, uuid_suffix)
        })
        .clone()
}
