//! Routing table builders
//!
//! A builder turns one `(external view, instance configs)` snapshot into a
//! list of equivalent routing plans for a table. The manager holds three
//! concrete builders and picks by table type: balanced-random for offline
//! tables, high-level consumer for realtime primaries, low-level consumer for
//! the realtime LLC family.
//!
//! Builders are pure in-memory computations. They never fail on empty input
//! (an empty plan list comes back instead), and any randomization draws from
//! an RNG seeded at builder construction so identical inputs and seeds yield
//! identical plans.

mod balanced_random;
mod high_level_consumer;
mod low_level_consumer;

pub use balanced_random::BalancedRandomRoutingTableBuilder;
pub use high_level_consumer::HighLevelConsumerRoutingTableBuilder;
pub use low_level_consumer::LowLevelConsumerRoutingTableBuilder;

use std::collections::HashMap;

use crate::shardroute::cluster::{ExternalView, InstanceConfig};

use super::error::RoutingResult;
use super::segment_set::SegmentSetMap;

/// Contract shared by all routing table builders.
pub trait RoutingTableBuilder: Send + Sync {
    fn compute_routing_table(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> RoutingResult<Vec<SegmentSetMap>>;
}

/// Index the instance configs by name for eligibility checks.
pub(crate) fn instances_by_name(
    instance_configs: &[InstanceConfig],
) -> HashMap<&str, &InstanceConfig> {
    instance_configs
        .iter()
        .map(|ic| (ic.instance_name.as_str(), ic))
        .collect()
}
