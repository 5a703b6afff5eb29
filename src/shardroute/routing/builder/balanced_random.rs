//! Balanced-random routing for offline tables
//!
//! Each plan assigns every routable segment to exactly one of its eligible
//! `ONLINE` replicas, always choosing among the servers with the lowest
//! segment count so far (random tie-break). Generating several such plans and
//! picking one at random per query spreads load approximately uniformly
//! across replicas.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::shardroute::cluster::{ExternalView, InstanceConfig, SegmentState};
use crate::shardroute::routing::config::RoutingConfig;
use crate::shardroute::routing::error::{RoutingError, RoutingResult};
use crate::shardroute::routing::segment_set::{SegmentSetMap, SegmentSetMapBuilder};

use super::{instances_by_name, RoutingTableBuilder};

pub struct BalancedRandomRoutingTableBuilder {
    routing_table_count: usize,
    rng: Mutex<SmallRng>,
}

impl BalancedRandomRoutingTableBuilder {
    pub fn new(config: &RoutingConfig) -> Self {
        let rng = match config.builder_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            routing_table_count: config.routing_table_count,
            rng: Mutex::new(rng),
        }
    }
}

impl RoutingTableBuilder for BalancedRandomRoutingTableBuilder {
    fn compute_routing_table(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> RoutingResult<Vec<SegmentSetMap>> {
        let instances = instances_by_name(instance_configs);
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| RoutingError::BuilderFailure {
                table_name: table_name.to_string(),
                reason: "builder RNG lock poisoned".to_string(),
            })?;

        let mut plans = Vec::new();
        let mut seen = HashSet::new();

        for _ in 0..self.routing_table_count {
            let mut assignment = SegmentSetMapBuilder::new();
            let mut load: HashMap<&str, usize> = HashMap::new();

            for (segment, states) in &external_view.segment_states {
                let mut candidates: Vec<&str> = states
                    .iter()
                    .filter(|(server, state)| {
                        **state == SegmentState::Online
                            && instances
                                .get(server.as_str())
                                .map(|ic| ic.is_serving())
                                .unwrap_or(false)
                    })
                    .map(|(server, _)| server.as_str())
                    .collect();

                if candidates.is_empty() {
                    // Partially unavailable table still routes what it can.
                    debug!(
                        "No eligible server for segment {} of table {}, skipping",
                        segment, table_name
                    );
                    continue;
                }

                let min_load = candidates
                    .iter()
                    .map(|server| load.get(server).copied().unwrap_or(0))
                    .min()
                    .unwrap_or(0);
                candidates.retain(|server| load.get(server).copied().unwrap_or(0) == min_load);

                let chosen = candidates[rng.gen_range(0..candidates.len())];
                *load.entry(chosen).or_insert(0) += 1;
                assignment.assign(chosen, segment.clone());
            }

            if assignment.is_empty() {
                continue;
            }
            let plan = assignment.build();
            if seen.insert(plan.clone()) {
                plans.push(plan);
            }
        }

        Ok(plans)
    }
}
