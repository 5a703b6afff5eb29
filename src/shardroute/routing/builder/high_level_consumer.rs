//! High-level consumer routing for realtime tables
//!
//! HLC segments are replicated as whole consumer groups: a server either
//! carries every segment of a group or is not usable for that group. A plan
//! therefore picks one covering server per group and assigns it the entire
//! group. Plans across groups combine by cross-product, enumerated
//! exhaustively while the product stays within the configured plan count and
//! sampled randomly beyond that.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use crate::shardroute::cluster::{ExternalView, InstanceConfig, SegmentState};
use crate::shardroute::routing::config::RoutingConfig;
use crate::shardroute::routing::error::{RoutingError, RoutingResult};
use crate::shardroute::routing::segment_name::{HlcSegmentName, LlcSegmentName};
use crate::shardroute::routing::segment_set::{SegmentSetMap, SegmentSetMapBuilder};

use super::{instances_by_name, RoutingTableBuilder};

pub struct HighLevelConsumerRoutingTableBuilder {
    plan_cap: usize,
    rng: Mutex<SmallRng>,
}

impl HighLevelConsumerRoutingTableBuilder {
    pub fn new(config: &RoutingConfig) -> Self {
        let rng = match config.builder_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            plan_cap: config.routing_table_count,
            rng: Mutex::new(rng),
        }
    }
}

/// One consumer group's segments and the servers that cover all of them.
struct GroupCandidates {
    segments: Vec<String>,
    servers: Vec<String>,
}

impl RoutingTableBuilder for HighLevelConsumerRoutingTableBuilder {
    fn compute_routing_table(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> RoutingResult<Vec<SegmentSetMap>> {
        let instances = instances_by_name(instance_configs);

        // group id -> segments of that group
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for segment in external_view.segment_states.keys() {
            match HlcSegmentName::parse(segment) {
                Ok(name) => groups.entry(name.group_id).or_default().push(segment),
                Err(_) => {
                    // LLC segments coexist in hybrid realtime views and belong
                    // to the other builder.
                    if LlcSegmentName::parse(segment).is_ok() {
                        continue;
                    }
                    debug!(
                        "Segment {} of table {} matches neither consumer naming scheme, skipping",
                        segment, table_name
                    );
                }
            }
        }

        // Per group, the servers holding every segment of the group ONLINE.
        let mut candidates: Vec<GroupCandidates> = Vec::new();
        for (group_id, segments) in &groups {
            let mut covering: Option<BTreeSet<&str>> = None;
            for segment in segments {
                let online: BTreeSet<&str> = external_view
                    .states_for(segment)
                    .map(|states| {
                        states
                            .iter()
                            .filter(|(server, state)| {
                                **state == SegmentState::Online
                                    && instances
                                        .get(server.as_str())
                                        .map(|ic| ic.is_serving())
                                        .unwrap_or(false)
                            })
                            .map(|(server, _)| server.as_str())
                            .collect()
                    })
                    .unwrap_or_default();
                covering = Some(match covering {
                    None => online,
                    Some(prev) => prev.intersection(&online).copied().collect(),
                });
            }
            let servers: Vec<String> = covering
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            if servers.is_empty() {
                debug!(
                    "No server covers all segments of group {} for table {}, skipping group",
                    group_id, table_name
                );
                continue;
            }
            candidates.push(GroupCandidates {
                segments: segments.iter().map(|s| s.to_string()).collect(),
                servers,
            });
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Cross-product of per-group server choices, capped.
        let combinations: usize = candidates
            .iter()
            .map(|group| group.servers.len())
            .try_fold(1usize, |acc, n| acc.checked_mul(n))
            .unwrap_or(usize::MAX);

        let mut plans = Vec::new();
        let mut seen = HashSet::new();

        if combinations <= self.plan_cap {
            // Exhaustive enumeration, odometer-style.
            let mut choice = vec![0usize; candidates.len()];
            loop {
                plans.push(materialize(&candidates, &choice));
                let mut position = candidates.len();
                loop {
                    if position == 0 {
                        return Ok(plans);
                    }
                    position -= 1;
                    choice[position] += 1;
                    if choice[position] < candidates[position].servers.len() {
                        break;
                    }
                    choice[position] = 0;
                }
            }
        }

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| RoutingError::BuilderFailure {
                table_name: table_name.to_string(),
                reason: "builder RNG lock poisoned".to_string(),
            })?;
        let mut attempts = 0;
        while plans.len() < self.plan_cap && attempts < self.plan_cap * 4 {
            attempts += 1;
            let choice: Vec<usize> = candidates
                .iter()
                .map(|group| rng.gen_range(0..group.servers.len()))
                .collect();
            let plan = materialize(&candidates, &choice);
            if seen.insert(plan.clone()) {
                plans.push(plan);
            }
        }
        Ok(plans)
    }
}

fn materialize(candidates: &[GroupCandidates], choice: &[usize]) -> SegmentSetMap {
    let mut builder = SegmentSetMapBuilder::new();
    for (group, index) in candidates.iter().zip(choice) {
        builder.assign_all(group.servers[*index].clone(), group.segments.clone());
    }
    builder.build()
}
