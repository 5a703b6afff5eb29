//! Server-to-segment-set assignments
//!
//! [`SegmentSetMap`] is the value type of every routing plan: an immutable
//! mapping from server instance to the set of segments that server should
//! scan. The inner maps are ordered so equality, hashing, and the rendered
//! forms are deterministic, which lets builders deduplicate equivalent plans.

use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// One routing plan: server -> set of segments to scan.
///
/// Cloning is cheap (the assignment is `Arc`-shared), so the query path can
/// hand plans out without copying segment sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SegmentSetMap {
    routing: Arc<BTreeMap<String, BTreeSet<String>>>,
}

impl SegmentSetMap {
    /// The empty plan, returned when a table has no routable segments.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_assignments(routing: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self {
            routing: Arc::new(routing),
        }
    }

    /// The full server -> segment-set mapping.
    pub fn routing(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.routing
    }

    /// Servers participating in this plan.
    pub fn servers(&self) -> impl Iterator<Item = &String> {
        self.routing.keys()
    }

    /// Segments assigned to one server, if it participates.
    pub fn segments_for(&self, server: &str) -> Option<&BTreeSet<String>> {
        self.routing.get(server)
    }

    /// Number of participating servers.
    pub fn len(&self) -> usize {
        self.routing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routing.is_empty()
    }

    /// Total number of segment assignments across all servers.
    pub fn segment_count(&self) -> usize {
        self.routing.values().map(|segments| segments.len()).sum()
    }

    /// JSON rendering used by routing snapshots.
    pub fn to_json(&self) -> Value {
        let entries: serde_json::Map<String, Value> = self
            .routing
            .iter()
            .map(|(server, segments)| {
                let segments: Vec<Value> = segments.iter().map(|s| json!(s)).collect();
                (server.clone(), Value::Array(segments))
            })
            .collect();
        Value::Object(entries)
    }
}

impl fmt::Display for SegmentSetMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Incremental builder used by the routing table builders.
#[derive(Debug, Default)]
pub struct SegmentSetMapBuilder {
    routing: BTreeMap<String, BTreeSet<String>>,
}

impl SegmentSetMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, server: impl Into<String>, segment: impl Into<String>) {
        self.routing
            .entry(server.into())
            .or_default()
            .insert(segment.into());
    }

    pub fn assign_all<I, S>(&mut self, server: impl Into<String>, segments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.routing.entry(server.into()).or_default();
        for segment in segments {
            entry.insert(segment.into());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routing.is_empty()
    }

    pub fn build(self) -> SegmentSetMap {
        SegmentSetMap::from_assignments(self.routing)
    }
}
