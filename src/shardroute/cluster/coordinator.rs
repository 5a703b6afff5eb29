//! Coordinator client abstraction
//!
//! The broker never talks to the state store directly; everything goes
//! through [`ClusterCoordinator`]. Implementations wrap a ZooKeeper-backed
//! store (or an in-memory map in tests) and are free to apply their own
//! connection handling and timeouts. All methods may suspend on network I/O,
//! so callers must not hold locks across them.

use async_trait::async_trait;

use super::types::{ExternalView, InstanceConfig, PropertyRecord, VersionStat};

/// State-store path of a table's external view record.
pub fn external_view_path(table_name: &str) -> String {
    format!("/EXTERNALVIEW/{}", table_name)
}

/// State-store path of an instance's configuration record.
pub fn instance_config_path(instance_name: &str) -> String {
    format!("/CONFIGS/PARTICIPANT/{}", instance_name)
}

/// Property-store path of a segment's metadata record.
pub fn segment_metadata_path(table_name: &str, segment_name: &str) -> String {
    format!("/SEGMENTS/{}/{}", table_name, segment_name)
}

/// Error type for coordinator access
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The state store could not be reached or the read failed
    #[error("coordinator unavailable reading '{path}': {reason}")]
    Unavailable { path: String, reason: String },

    /// The read did not complete within the implementation's deadline
    #[error("coordinator read timed out for '{path}'")]
    Timeout { path: String },

    /// The record exists but could not be decoded
    #[error("failed to decode record at '{path}': {reason}")]
    Decode { path: String, reason: String },
}

/// Read access to the coordinator's cluster state.
///
/// Change *notifications* are delivered out of band (see the change
/// mediator); this trait only covers fetching. Notification payloads are
/// deliberately not modeled: the routing layer always re-fetches the latest
/// state instead of trusting possibly stale payloads.
#[async_trait]
pub trait ClusterCoordinator: Send + Sync {
    /// Latest external view for a table, or `None` if the table has no
    /// external view record yet.
    async fn fetch_external_view(
        &self,
        table_name: &str,
    ) -> Result<Option<ExternalView>, CoordinatorError>;

    /// All instance configuration records in the cluster.
    async fn fetch_instance_configs(&self) -> Result<Vec<InstanceConfig>, CoordinatorError>;

    /// Batched version stats for a list of state-store paths. The result is
    /// positionally aligned with `paths`; a missing record yields `None`.
    async fn fetch_stats(
        &self,
        paths: &[String],
    ) -> Result<Vec<Option<VersionStat>>, CoordinatorError>;

    /// Raw property-store read, or `None` if the record does not exist.
    async fn read_property(&self, path: &str)
        -> Result<Option<PropertyRecord>, CoordinatorError>;
}
