//! Routing-layer error types
//!
//! None of these are fatal to the broker. Query-path errors surface to the
//! caller; rebuild errors are logged, leave the last-known-good plans
//! published, and mark the table for a forced rebuild on the next change
//! observation.

use crate::shardroute::cluster::CoordinatorError;

/// Error type for routing operations
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// A request asked to force both HLC and LLC routing at once
    #[error("trying to force routing to both HLC and LLC for table '{table_name}'")]
    ConflictingRoutingOptions { table_name: String },

    /// A forced routing family has no plans for the table
    #[error("failed to route to {requested} for table '{table_name}': {reason}")]
    UnsatisfiableRoutingOption {
        table_name: String,
        requested: String,
        reason: String,
    },

    /// A routing table builder could not produce plans
    #[error("routing table build failed for table '{table_name}': {reason}")]
    BuilderFailure { table_name: String, reason: String },

    /// A realtime segment name did not match the expected structure
    #[error("malformed segment name '{segment_name}': {reason}")]
    MalformedSegmentName {
        segment_name: String,
        reason: String,
    },

    /// A coordinator read failed while rebuilding
    #[error("coordinator fetch failed")]
    CoordinatorFetch {
        #[from]
        source: CoordinatorError,
    },

    /// The time boundary could not be recomputed
    #[error("time boundary update failed for table '{table_name}': {reason}")]
    TimeBoundaryFailure { table_name: String, reason: String },

    /// Snapshot rendering failed
    #[error("failed to render routing snapshot")]
    SnapshotSerialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
