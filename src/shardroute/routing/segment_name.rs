//! Realtime segment name parsing
//!
//! Realtime segment identifiers are structured strings. High-level consumer
//! segments carry their consumer-group tag as the first `__`-separated
//! component:
//!
//! ```text
//! {groupId}__{partitionRange}__{sequenceNumber}
//! ```
//!
//! Low-level consumer segments identify a stream partition and a position
//! within it:
//!
//! ```text
//! {tableName}__{partitionId}__{sequenceNumber}__{creationTime}
//! ```

use super::error::RoutingError;

const SEPARATOR: &str = "__";

/// Parsed high-level consumer segment name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlcSegmentName {
    pub group_id: String,
    pub partition_range: String,
    pub sequence_number: String,
}

impl HlcSegmentName {
    pub fn parse(segment_name: &str) -> Result<Self, RoutingError> {
        let parts: Vec<&str> = segment_name.split(SEPARATOR).collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(RoutingError::MalformedSegmentName {
                segment_name: segment_name.to_string(),
                reason: "expected {groupId}__{partitionRange}__{sequenceNumber}".to_string(),
            });
        }
        Ok(Self {
            group_id: parts[0].to_string(),
            partition_range: parts[1].to_string(),
            sequence_number: parts[2].to_string(),
        })
    }
}

/// Parsed low-level consumer segment name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlcSegmentName {
    pub table_name: String,
    pub partition_id: u32,
    pub sequence_number: u32,
    pub creation_time: String,
}

impl LlcSegmentName {
    pub fn parse(segment_name: &str) -> Result<Self, RoutingError> {
        let parts: Vec<&str> = segment_name.split(SEPARATOR).collect();
        if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(RoutingError::MalformedSegmentName {
                segment_name: segment_name.to_string(),
                reason: "expected {tableName}__{partitionId}__{sequenceNumber}__{creationTime}"
                    .to_string(),
            });
        }
        let partition_id =
            parts[1]
                .parse::<u32>()
                .map_err(|_| RoutingError::MalformedSegmentName {
                    segment_name: segment_name.to_string(),
                    reason: format!("partition id '{}' is not numeric", parts[1]),
                })?;
        let sequence_number =
            parts[2]
                .parse::<u32>()
                .map_err(|_| RoutingError::MalformedSegmentName {
                    segment_name: segment_name.to_string(),
                    reason: format!("sequence number '{}' is not numeric", parts[2]),
                })?;
        Ok(Self {
            table_name: parts[0].to_string(),
            partition_id,
            sequence_number,
            creation_time: parts[3].to_string(),
        })
    }
}
