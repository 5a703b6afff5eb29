// Cluster state model and coordinator access
pub mod coordinator;
pub mod table_name;
pub mod types;

// Re-export main API
pub use coordinator::{
    external_view_path, instance_config_path, segment_metadata_path, ClusterCoordinator,
    CoordinatorError,
};
pub use table_name::{offline_table_name, raw_table_name, realtime_table_name, TableType};
pub use types::{ExternalView, InstanceConfig, PropertyRecord, SegmentState, VersionStat};
