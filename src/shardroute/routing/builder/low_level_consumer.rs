//! Low-level consumer routing for realtime tables
//!
//! LLC segments form per-partition sequences: completed segments are ONLINE
//! on their replicas while the newest segment of each partition is still
//! CONSUMING on the server that ingests it. A plan assigns each completed
//! segment to one eligible ONLINE replica and the consuming segment to an
//! eligible CONSUMING server, so a query sees the whole partition up to its
//! current consumption point.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::shardroute::cluster::{ExternalView, InstanceConfig, SegmentState};
use crate::shardroute::routing::config::RoutingConfig;
use crate::shardroute::routing::error::{RoutingError, RoutingResult};
use crate::shardroute::routing::segment_name::{HlcSegmentName, LlcSegmentName};
use crate::shardroute::routing::segment_set::{SegmentSetMap, SegmentSetMapBuilder};

use super::{instances_by_name, RoutingTableBuilder};

pub struct LowLevelConsumerRoutingTableBuilder {
    routing_table_count: usize,
    rng: Mutex<SmallRng>,
}

impl LowLevelConsumerRoutingTableBuilder {
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

impl RoutingTableBuilder for LowLevelConsumerRoutingTableBuilder {
    fn compute_routing_table(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> RoutingResult<Vec<SegmentSetMap>> {
        let instances = instances_by_name(instance_configs);

        // partition -> segments ordered by sequence number
        let mut partitions: BTreeMap<u32, BTreeMap<u32, &str>> = BTreeMap::new();
        for segment in external_view.segment_states.keys() {
            match LlcSegmentName::parse(segment) {
                Ok(name) => {
                    partitions
                        .entry(name.partition_id)
                        .or_default()
                        .insert(name.sequence_number, segment);
                }
                Err(err) => {
                    // HLC segments coexist in hybrid realtime views and belong
                    // to the other builder. Anything else is a broken view.
                    if HlcSegmentName::parse(segment).is_ok() {
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        if partitions.is_empty() {
            return Ok(Vec::new());
        }

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

            for segments in partitions.values() {
                for segment in segments.values() {
                    let states = match external_view.states_for(segment) {
                        Some(states) => states,
                        None => continue,
                    };

                    let online: Vec<&str> = states
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

                    if !online.is_empty() {
                        // Completed segment: any eligible ONLINE replica.
                        let chosen = online[rng.gen_range(0..online.len())];
                        assignment.assign(chosen, (*segment).to_string());
                        continue;
                    }

                    // Consuming segment: the eligible CONSUMING server.
                    let consuming: Vec<&str> = states
                        .iter()
                        .filter(|(server, state)| {
                            **state == SegmentState::Consuming
                                && instances
                                    .get(server.as_str())
                                    .map(|ic| ic.is_serving())
                                    .unwrap_or(false)
                        })
                        .map(|(server, _)| server.as_str())
                        .collect();

                    if consuming.is_empty() {
                        debug!(
                            "Segment {} of table {} has no eligible replica, skipping",
                            segment, table_name
                        );
                        continue;
                    }
                    let chosen = consuming[rng.gen_range(0..consuming.len())];
                    assignment.assign(chosen, (*segment).to_string());
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoutingConfig {
        RoutingConfig::new().with_builder_seed(13)
    }

    fn ics(names: &[&str]) -> Vec<InstanceConfig> {
        names.iter().map(|n| InstanceConfig::new(*n)).collect()
    }

    fn llc_segment(partition: u32, seq: u32) -> String {
        format!("trades__{}__{}__20240601T0000Z", partition, seq)
    }

    #[test]
    fn test_empty_view_yields_no_plans() {
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let ev = ExternalView::new("t_REALTIME", 1);
        let plans = builder
            .compute_routing_table("t_REALTIME", &ev, &ics(&["srvA"]))
            .unwrap();
        assert!(plans.is_empty());
    }

    #[test]
    fn test_partition_routes_completed_and_consuming() {
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let mut ev = ExternalView::new("t_REALTIME", 1);
        let completed = llc_segment(0, 1);
        let consuming = llc_segment(0, 2);
        ev.set_state(completed.clone(), "srvA", SegmentState::Online);
        ev.set_state(completed.clone(), "srvB", SegmentState::Online);
        ev.set_state(consuming.clone(), "srvC", SegmentState::Consuming);

        let plans = builder
            .compute_routing_table("t_REALTIME", &ev, &ics(&["srvA", "srvB", "srvC"]))
            .unwrap();
        assert!(!plans.is_empty());
        for plan in &plans {
            let consuming_segments = plan.segments_for("srvC").unwrap();
            assert!(consuming_segments.contains(&consuming));
            let routed_completed = plan
                .segments_for("srvA")
                .map(|s| s.contains(&completed))
                .unwrap_or(false)
                || plan
                    .segments_for("srvB")
                    .map(|s| s.contains(&completed))
                    .unwrap_or(false);
            assert!(routed_completed);
        }
    }

    #[test]
    fn test_consuming_server_must_be_enabled() {
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let mut ev = ExternalView::new("t_REALTIME", 1);
        let consuming = llc_segment(0, 0);
        ev.set_state(consuming, "srvA", SegmentState::Consuming);

        let mut configs = ics(&["srvA"]);
        configs[0].enabled = false;

        let plans = builder
            .compute_routing_table("t_REALTIME", &ev, &configs)
            .unwrap();
        assert!(plans.is_empty());
    }

    #[test]
    fn test_online_replica_preferred_over_consuming() {
        // Once a segment is committed somewhere, the ONLINE copy is queried
        // even if another replica still reports CONSUMING.
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let mut ev = ExternalView::new("t_REALTIME", 1);
        let segment = llc_segment(0, 3);
        ev.set_state(segment.clone(), "srvA", SegmentState::Online);
        ev.set_state(segment.clone(), "srvB", SegmentState::Consuming);

        let plans = builder
            .compute_routing_table("t_REALTIME", &ev, &ics(&["srvA", "srvB"]))
            .unwrap();
        for plan in &plans {
            assert!(plan.segments_for("srvA").unwrap().contains(&segment));
            assert!(plan.segments_for("srvB").is_none());
        }
    }

    #[test]
    fn test_foreign_name_fails_build() {
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let mut ev = ExternalView::new("t_REALTIME", 1);
        ev.set_state("completely-opaque-name", "srvA", SegmentState::Online);
        let result = builder.compute_routing_table("t_REALTIME", &ev, &ics(&["srvA"]));
        assert!(matches!(
            result,
            Err(RoutingError::MalformedSegmentName { .. })
        ));
    }

    #[test]
    fn test_hlc_segments_are_ignored() {
        let builder = LowLevelConsumerRoutingTableBuilder::new(&config());
        let mut ev = ExternalView::new("t_REALTIME", 1);
        ev.set_state("grp0__0-3__1", "srvA", SegmentState::Online);
        let plans = builder
            .compute_routing_table("t_REALTIME", &ev, &ics(&["srvA"]))
            .unwrap();
        assert!(plans.is_empty());
    }
}
