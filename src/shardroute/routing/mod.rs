// Routing layer
pub mod builder;
pub mod config;
pub mod error;
pub mod manager;
pub mod mediator;
pub mod request;
pub mod segment_name;
pub mod segment_set;
pub mod selector;
pub mod time_boundary;

// Re-export main API
pub use builder::{
    BalancedRandomRoutingTableBuilder, HighLevelConsumerRoutingTableBuilder,
    LowLevelConsumerRoutingTableBuilder, RoutingTableBuilder,
};
pub use config::RoutingConfig;
pub use error::{RoutingError, RoutingResult};
pub use manager::RoutingManager;
pub use mediator::ClusterChangeMediator;
pub use request::{ForceFlags, RoutingLookupRequest};
pub use segment_name::{HlcSegmentName, LlcSegmentName};
pub use segment_set::{SegmentSetMap, SegmentSetMapBuilder};
pub use selector::{
    DefaultRoutingTableSelector, PercentageBasedRoutingTableSelector, RoutingSelectorConfig,
    RoutingTableSelector,
};
pub use time_boundary::{SegmentTimeMetadata, TimeBoundaryInfo, TimeBoundaryService, TimeUnit};
