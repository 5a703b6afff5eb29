//! Hybrid table time boundary
//!
//! A hybrid table is served by an offline and a realtime physical table at
//! once. The time boundary is the cutoff that splits the query domain: the
//! offline side answers `time <= boundary`, the realtime side answers
//! `time > boundary`. The boundary is derived from the offline side's segment
//! metadata: the maximum segment end time, minus one unit of that segment's
//! time granularity, so the realtime side always owns the newest partial
//! window.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::shardroute::cluster::{
    offline_table_name, raw_table_name, segment_metadata_path, ClusterCoordinator, ExternalView,
    PropertyRecord, TableType,
};

use super::error::{RoutingError, RoutingResult};

/// Time granularity of a table's time column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    fn millis_per_unit(&self) -> i64 {
        match self {
            TimeUnit::Days => 86_400_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Milliseconds => 1,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAYS" => Ok(TimeUnit::Days),
            "HOURS" => Ok(TimeUnit::Hours),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            other => Err(format!("unknown time unit '{}'", other)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Days => "DAYS",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Milliseconds => "MILLISECONDS",
        };
        write!(f, "{}", name)
    }
}

/// The cached boundary for one offline table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBoundaryInfo {
    pub time_column: String,
    pub time_value: i64,
    pub time_unit: TimeUnit,
}

/// Time metadata parsed from a segment's property record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTimeMetadata {
    pub time_column: String,
    pub end_time: i64,
    pub time_unit: TimeUnit,
}

impl SegmentTimeMetadata {
    pub const TIME_COLUMN_FIELD: &'static str = "time.column.name";
    pub const END_TIME_FIELD: &'static str = "end.time";
    pub const TIME_UNIT_FIELD: &'static str = "time.unit";

    /// Parse from a property record; `None` if any field is missing or
    /// unusable.
    pub fn from_record(record: &PropertyRecord) -> Option<Self> {
        let time_column = record.field(Self::TIME_COLUMN_FIELD)?.to_string();
        let end_time = record.field(Self::END_TIME_FIELD)?.parse::<i64>().ok()?;
        let time_unit = record.field(Self::TIME_UNIT_FIELD)?.parse::<TimeUnit>().ok()?;
        Some(Self {
            time_column,
            end_time,
            time_unit,
        })
    }

    fn end_millis(&self) -> i64 {
        self.end_time.saturating_mul(self.time_unit.millis_per_unit())
    }
}

/// Computes and caches time boundaries for hybrid tables.
pub struct TimeBoundaryService {
    coordinator: Arc<dyn ClusterCoordinator>,
    time_boundaries: RwLock<HashMap<String, TimeBoundaryInfo>>,
}

impl TimeBoundaryService {
    pub fn new(coordinator: Arc<dyn ClusterCoordinator>) -> Self {
        Self {
            coordinator,
            time_boundaries: RwLock::new(HashMap::new()),
        }
    }

    /// Recompute the boundary of the hybrid pair the external view belongs
    /// to. The view may be either side of the pair; for a realtime view the
    /// offline counterpart is fetched, since the boundary always derives from
    /// offline segments.
    pub async fn update(&self, external_view: &ExternalView) -> RoutingResult<()> {
        let offline_table = offline_table_name(raw_table_name(&external_view.table_name));

        let fetched;
        let offline_view = match TableType::from_table_name(&external_view.table_name) {
            Some(TableType::Offline) => external_view,
            _ => {
                fetched = self
                    .coordinator
                    .fetch_external_view(&offline_table)
                    .await?
                    .ok_or_else(|| RoutingError::TimeBoundaryFailure {
                        table_name: offline_table.clone(),
                        reason: "offline side has no external view".to_string(),
                    })?;
                &fetched
            }
        };

        let mut latest: Option<SegmentTimeMetadata> = None;
        for segment in offline_view.online_segments() {
            let path = segment_metadata_path(&offline_table, segment);
            let record = self.coordinator.read_property(&path).await?;
            match record.as_ref().and_then(SegmentTimeMetadata::from_record) {
                Some(metadata) => {
                    let is_newer = latest
                        .as_ref()
                        .map(|current| metadata.end_millis() > current.end_millis())
                        .unwrap_or(true);
                    if is_newer {
                        latest = Some(metadata);
                    }
                }
                None => {
                    warn!(
                        "Segment {} of table {} has no usable time metadata, skipping",
                        segment, offline_table
                    );
                }
            }
        }

        match latest {
            Some(metadata) => {
                let boundary = TimeBoundaryInfo {
                    time_column: metadata.time_column,
                    time_value: metadata.end_time - 1,
                    time_unit: metadata.time_unit,
                };
                info!(
                    "Updated time boundary for table {}: {} <= {} {}",
                    offline_table, boundary.time_column, boundary.time_value, boundary.time_unit
                );
                if let Ok(mut boundaries) = self.time_boundaries.write() {
                    boundaries.insert(offline_table, boundary);
                }
                Ok(())
            }
            None => {
                // Keep whatever boundary we had rather than un-splitting the
                // hybrid table.
                warn!(
                    "No segment time metadata found for table {}, keeping previous boundary",
                    offline_table
                );
                Ok(())
            }
        }
    }

    /// The cached boundary for an offline table, if any.
    pub fn get(&self, table_name: &str) -> Option<TimeBoundaryInfo> {
        self.time_boundaries
            .read()
            .ok()
            .and_then(|boundaries| boundaries.get(table_name).cloned())
    }

    /// Drop the cached boundary for a table.
    pub fn remove(&self, table_name: &str) {
        if let Ok(mut boundaries) = self.time_boundaries.write() {
            boundaries.remove(table_name);
        }
    }
}
