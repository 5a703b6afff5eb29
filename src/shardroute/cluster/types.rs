//! Cluster state records published by the coordinator
//!
//! These mirror the records kept in the coordinator's state store: the
//! per-table external view (segment placement and replica states), the
//! per-instance configuration, version stats for cheap change detection, and
//! raw property-store records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Replica state of a segment on a particular server, as published in the
/// external view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentState {
    /// Segment is fully loaded and queryable.
    Online,
    /// Segment is still being consumed from the stream (realtime LLC only).
    Consuming,
    /// Segment is present but not serving.
    Offline,
    /// Segment was dropped from the server.
    Dropped,
    /// Server failed to load the segment.
    Error,
}

/// Per-table external view: the coordinator's snapshot of which servers host
/// which segments, and in what state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalView {
    pub table_name: String,
    /// Monotone record version assigned by the coordinator.
    pub version: i64,
    /// segment -> (server -> state)
    pub segment_states: BTreeMap<String, BTreeMap<String, SegmentState>>,
}

impl ExternalView {
    pub fn new(table_name: impl Into<String>, version: i64) -> Self {
        Self {
            table_name: table_name.into(),
            version,
            segment_states: BTreeMap::new(),
        }
    }

    /// Record the state of a segment replica on a server.
    pub fn set_state(
        &mut self,
        segment: impl Into<String>,
        server: impl Into<String>,
        state: SegmentState,
    ) {
        self.segment_states
            .entry(segment.into())
            .or_default()
            .insert(server.into(), state);
    }

    /// Replica states for one segment, if known.
    pub fn states_for(&self, segment: &str) -> Option<&BTreeMap<String, SegmentState>> {
        self.segment_states.get(segment)
    }

    /// Segments with at least one `ONLINE` replica.
    pub fn online_segments(&self) -> BTreeSet<&str> {
        self.segment_states
            .iter()
            .filter(|(_, states)| states.values().any(|s| *s == SegmentState::Online))
            .map(|(segment, _)| segment.as_str())
            .collect()
    }
}

/// Per-server configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub instance_name: String,
    pub enabled: bool,
    pub shutting_down: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Monotone record version assigned by the coordinator.
    pub version: i64,
}

impl InstanceConfig {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            enabled: true,
            shutting_down: false,
            tags: Vec::new(),
            version: 0,
        }
    }

    /// Whether this instance may appear in a routing plan.
    pub fn is_serving(&self) -> bool {
        self.enabled && !self.shutting_down
    }
}

/// Version-only stat for a state-store path, used for batched change
/// detection without fetching full records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStat {
    pub version: i64,
}

/// Raw property-store record: a flat bag of string fields under an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    #[serde(default)]
    pub simple_fields: BTreeMap<String, String>,
}

impl PropertyRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            simple_fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.simple_fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.simple_fields.get(key).map(|v| v.as_str())
    }
}
