//! Broker-side routing for a distributed columnar analytics cluster
//!
//! This library maintains an in-memory routing plan for every table served by
//! a broker. It watches cluster state published by an external coordinator
//! (external views, instance configs) and answers, for each incoming query,
//! which server instances to contact and which segments each of them should
//! scan.

pub mod shardroute;

// Re-export main API
pub use shardroute::cluster::{
    ClusterCoordinator, CoordinatorError, ExternalView, InstanceConfig, PropertyRecord,
    SegmentState, TableType, VersionStat,
};
pub use shardroute::routing::{
    ClusterChangeMediator, RoutingConfig, RoutingError, RoutingLookupRequest, RoutingManager,
    SegmentSetMap,
};
