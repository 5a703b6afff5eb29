//! Routing manager
//!
//! The hub of the routing layer. Holds the published routing plans for every
//! table the broker serves, rebuilds them when the coordinator reports
//! changed cluster state, and answers query-time lookups from the current
//! snapshot.
//!
//! The query path (`find_servers`) is synchronous and lock-light: plan lists
//! are immutable `Arc`s swapped atomically under a short write lock, so a
//! concurrent reader always observes a complete pre- or post-rebuild plan
//! list, never a torn one. Change processing is async (it fetches from the
//! coordinator) and is the only writer of the version and instance-config
//! caches.

use log::{debug, error, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::shardroute::cluster::{
    external_view_path, instance_config_path, offline_table_name, raw_table_name,
    realtime_table_name, ClusterCoordinator, ExternalView, InstanceConfig, TableType,
};
use crate::shardroute::observability::{broker_instance_id, BrokerMetrics};

use super::builder::{
    BalancedRandomRoutingTableBuilder, HighLevelConsumerRoutingTableBuilder,
    LowLevelConsumerRoutingTableBuilder, RoutingTableBuilder,
};
use super::config::RoutingConfig;
use super::error::{RoutingError, RoutingResult};
use super::request::RoutingLookupRequest;
use super::segment_set::SegmentSetMap;
use super::selector::RoutingTableSelector;
use super::time_boundary::TimeBoundaryService;

/// Sentinel version that never matches a real record version, forcing a
/// rebuild at the next change observation.
const INVALID_EXTERNAL_VIEW_VERSION: i64 = i64::MIN;

type PlanTable = RwLock<HashMap<String, Arc<Vec<SegmentSetMap>>>>;

pub struct RoutingManager {
    coordinator: Arc<dyn ClusterCoordinator>,
    offline_builder: BalancedRandomRoutingTableBuilder,
    hlc_builder: HighLevelConsumerRoutingTableBuilder,
    llc_builder: LowLevelConsumerRoutingTableBuilder,
    selector: Arc<dyn RoutingTableSelector>,
    time_boundary_service: Arc<TimeBoundaryService>,
    metrics: Option<Arc<BrokerMetrics>>,

    /// Published plans: offline tables, realtime HLC family, realtime LLC
    /// family. Values are immutable lists swapped wholesale.
    offline_plans: PlanTable,
    hlc_plans: PlanTable,
    llc_plans: PlanTable,

    /// Change-detection caches, touched only by change-processing tasks.
    last_known_ev_version: RwLock<HashMap<String, i64>>,
    last_known_ic_for_table: RwLock<HashMap<String, HashMap<String, InstanceConfig>>>,
    last_known_ic: RwLock<HashMap<String, InstanceConfig>>,
    tables_for_instance: Mutex<HashMap<String, HashSet<String>>>,

    query_rng: Mutex<SmallRng>,
    shutdown: AtomicBool,
}

impl RoutingManager {
    pub fn new(
        coordinator: Arc<dyn ClusterCoordinator>,
        selector: Arc<dyn RoutingTableSelector>,
        config: RoutingConfig,
    ) -> Self {
        let time_boundary_service = Arc::new(TimeBoundaryService::new(Arc::clone(&coordinator)));
        let query_rng = match config.builder_seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
            None => SmallRng::from_entropy(),
        };
        Self {
            coordinator,
            offline_builder: BalancedRandomRoutingTableBuilder::new(&config),
            hlc_builder: HighLevelConsumerRoutingTableBuilder::new(&config),
            llc_builder: LowLevelConsumerRoutingTableBuilder::new(&config),
            selector,
            time_boundary_service,
            metrics: None,
            offline_plans: RwLock::new(HashMap::new()),
            hlc_plans: RwLock::new(HashMap::new()),
            llc_plans: RwLock::new(HashMap::new()),
            last_known_ev_version: RwLock::new(HashMap::new()),
            last_known_ic_for_table: RwLock::new(HashMap::new()),
            last_known_ic: RwLock::new(HashMap::new()),
            tables_for_instance: Mutex::new(HashMap::new()),
            query_rng: Mutex::new(query_rng),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<BrokerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn start(&self) {
        info!("Starting routing manager");
    }

    /// Stop processing cluster changes. The query path keeps serving the
    /// last published snapshot.
    pub fn shutdown(&self) {
        info!("Shutting down routing manager");
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn time_boundary_service(&self) -> Arc<TimeBoundaryService> {
        Arc::clone(&self.time_boundary_service)
    }

    // ---- query path ----

    /// Pick one routing plan for the request's table: which servers to
    /// contact, and which segments each should scan.
    pub fn find_servers(&self, request: &RoutingLookupRequest) -> RoutingResult<SegmentSetMap> {
        let table_name = request.table_name.as_str();
        let force = request.force_flags()?;

        let plans = match TableType::from_table_name(table_name) {
            Some(TableType::Realtime) => {
                let hlc = self.published_plans(&self.hlc_plans, table_name);
                let llc = self.published_plans(&self.llc_plans, table_name);
                match (hlc, llc) {
                    (Some(hlc), Some(llc)) => {
                        // Both families live; follow the forced family or the
                        // selector, defaulting to HLC.
                        if !force.hlc
                            && (force.llc || self.selector.should_use_llc_routing(table_name))
                        {
                            Some(self.route_to_llc(table_name, llc))
                        } else {
                            Some(self.route_to_hlc(table_name, hlc))
                        }
                    }
                    (Some(hlc), None) => {
                        if force.llc {
                            return Err(RoutingError::UnsatisfiableRoutingOption {
                                table_name: table_name.to_string(),
                                requested: "LLC".to_string(),
                                reason: "table has only HLC segments".to_string(),
                            });
                        }
                        Some(self.route_to_hlc(table_name, hlc))
                    }
                    (None, Some(llc)) => {
                        if force.hlc {
                            return Err(RoutingError::UnsatisfiableRoutingOption {
                                table_name: table_name.to_string(),
                                requested: "HLC".to_string(),
                                reason: "table has only LLC segments".to_string(),
                            });
                        }
                        Some(self.route_to_llc(table_name, llc))
                    }
                    (None, None) => None,
                }
            }
            _ => self.published_plans(&self.offline_plans, table_name),
        };

        // Absent or empty plans are normal for a table with no routable
        // segments yet.
        let plans = match plans {
            Some(plans) => plans,
            None => return Ok(SegmentSetMap::empty()),
        };
        let index = match self.query_rng.lock() {
            Ok(mut rng) => rng.gen_range(0..plans.len()),
            Err(_) => 0,
        };
        Ok(plans[index].clone())
    }

    /// Whether any non-empty plan list is published for the table.
    pub fn routing_table_exists(&self, table_name: &str) -> bool {
        self.has_any_plans(table_name)
    }

    fn published_plans(
        &self,
        plan_table: &PlanTable,
        table_name: &str,
    ) -> Option<Arc<Vec<SegmentSetMap>>> {
        plan_table
            .read()
            .ok()
            .and_then(|plans| plans.get(table_name).cloned())
            .filter(|plans| !plans.is_empty())
    }

    fn has_any_plans(&self, table_name: &str) -> bool {
        self.published_plans(&self.offline_plans, table_name).is_some()
            || self.published_plans(&self.hlc_plans, table_name).is_some()
            || self.published_plans(&self.llc_plans, table_name).is_some()
    }

    fn route_to_hlc(
        &self,
        table_name: &str,
        plans: Arc<Vec<SegmentSetMap>>,
    ) -> Arc<Vec<SegmentSetMap>> {
        if let Some(metrics) = &self.metrics {
            metrics.record_hlc_query(table_name);
        }
        plans
    }

    fn route_to_llc(
        &self,
        table_name: &str,
        plans: Arc<Vec<SegmentSetMap>>,
    ) -> Arc<Vec<SegmentSetMap>> {
        if let Some(metrics) = &self.metrics {
            metrics.record_llc_query(table_name);
        }
        plans
    }

    // ---- table lifecycle ----

    /// Start serving a table. A table can be assigned to this broker before
    /// its external view exists; in that case only the invalid-version
    /// sentinel is recorded so the next observed view triggers a build.
    pub async fn mark_data_resource_online(
        &self,
        table_name: &str,
        external_view: Option<ExternalView>,
        instance_configs: Vec<InstanceConfig>,
    ) {
        match external_view {
            None => self.mark_rebuild_required(table_name),
            Some(external_view) => {
                self.build_routing_table(table_name, &external_view, &instance_configs)
                    .await;
            }
        }
    }

    /// Stop serving a table: drop its plans, caches, and time boundary, and
    /// release instances that referenced only this table.
    pub fn mark_data_resource_offline(&self, table_name: &str) {
        info!("Removing routing tables for table {}", table_name);
        for plan_table in [&self.offline_plans, &self.hlc_plans, &self.llc_plans] {
            if let Ok(mut plans) = plan_table.write() {
                plans.remove(table_name);
            }
        }
        if let Ok(mut versions) = self.last_known_ev_version.write() {
            versions.remove(table_name);
        }
        if let Ok(mut ic_for_table) = self.last_known_ic_for_table.write() {
            ic_for_table.remove(table_name);
        }
        self.time_boundary_service.remove(table_name);

        if let Ok(mut tables_for_instance) = self.tables_for_instance.lock() {
            let mut orphaned = Vec::new();
            for (instance_name, tables) in tables_for_instance.iter_mut() {
                tables.remove(table_name);
                if tables.is_empty() {
                    orphaned.push(instance_name.clone());
                }
            }
            for instance_name in &orphaned {
                tables_for_instance.remove(instance_name);
            }
            if let Ok(mut last_known) = self.last_known_ic.write() {
                for instance_name in &orphaned {
                    last_known.remove(instance_name);
                }
            }
        }
    }

    fn mark_rebuild_required(&self, table_name: &str) {
        if let Ok(mut versions) = self.last_known_ev_version.write() {
            versions.insert(table_name.to_string(), INVALID_EXTERNAL_VIEW_VERSION);
        }
    }

    // ---- rebuild path ----

    /// Rebuild and publish the routing plans for one table from a fresh
    /// external view. A primary build failure leaves the previously
    /// published plans in place and marks the table for a forced rebuild.
    pub async fn build_routing_table(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) {
        let start = Instant::now();
        if let Ok(mut versions) = self.last_known_ev_version.write() {
            versions.insert(table_name.to_string(), external_view.version);
        }
        let table_type = TableType::from_table_name(table_name);
        info!(
            "Computing routing table for table {} from external view v{}",
            table_name, external_view.version
        );

        if let Err(err) =
            self.build_and_publish(table_name, table_type, external_view, instance_configs)
        {
            error!(
                "Failed to compute routing table for table {}: {}",
                table_name, err
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_rebuild_failure(table_name);
            }
            self.mark_rebuild_required(table_name);
        }

        self.reconcile_time_boundary(table_name, table_type, external_view)
            .await;

        let elapsed = start.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.observe_update_time(elapsed);
        }
        info!(
            "Routing table update for table {} completed in {} ms",
            table_name,
            elapsed.as_millis()
        );
    }

    fn build_and_publish(
        &self,
        table_name: &str,
        table_type: Option<TableType>,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> RoutingResult<()> {
        let realtime = table_type == Some(TableType::Realtime);
        let mut relevant_configs: HashMap<String, InstanceConfig> = HashMap::new();

        let primary: &dyn RoutingTableBuilder = if realtime {
            &self.hlc_builder
        } else {
            &self.offline_builder
        };
        let plans = primary.compute_routing_table(table_name, external_view, instance_configs)?;
        collect_relevant_configs(&mut relevant_configs, instance_configs, &plans);

        let target = if realtime {
            &self.hlc_plans
        } else {
            &self.offline_plans
        };
        if let Ok(mut published) = target.write() {
            published.insert(table_name.to_string(), Arc::new(plans));
        }

        if realtime {
            self.selector.register_table(table_name);

            // The LLC family is best-effort: its failure must not unpublish
            // the primary plans just written.
            match self
                .llc_builder
                .compute_routing_table(table_name, external_view, instance_configs)
            {
                Ok(llc_plans) => {
                    collect_relevant_configs(&mut relevant_configs, instance_configs, &llc_plans);
                    if let Ok(mut published) = self.llc_plans.write() {
                        published.insert(table_name.to_string(), Arc::new(llc_plans));
                    }
                }
                Err(err) => {
                    error!(
                        "Failed to compute LLC routing table for table {}, ignoring: {}",
                        table_name, err
                    );
                }
            }
        }

        // Remember which instance configs went into these plans so change
        // detection can tell relevant from irrelevant updates.
        if let Ok(mut ic_for_table) = self.last_known_ic_for_table.write() {
            ic_for_table.insert(table_name.to_string(), relevant_configs.clone());
        }
        if let Ok(mut last_known) = self.last_known_ic.write() {
            for config in relevant_configs.values() {
                last_known.insert(config.instance_name.clone(), config.clone());
            }
        }
        if let Ok(mut tables_for_instance) = self.tables_for_instance.lock() {
            for instance_name in relevant_configs.keys() {
                tables_for_instance
                    .entry(instance_name.clone())
                    .or_default()
                    .insert(table_name.to_string());
            }
        }
        Ok(())
    }

    /// The boundary needs recomputing in exactly two situations: an offline
    /// side was (re)built while its realtime sibling is being served, or a
    /// realtime side appeared while the served offline sibling has no
    /// boundary yet.
    async fn reconcile_time_boundary(
        &self,
        table_name: &str,
        table_type: Option<TableType>,
        external_view: &ExternalView,
    ) {
        let needs_update = match table_type {
            Some(TableType::Offline) => {
                let realtime_sibling = realtime_table_name(raw_table_name(table_name));
                self.has_any_plans(&realtime_sibling)
            }
            Some(TableType::Realtime) => {
                let offline_sibling = offline_table_name(raw_table_name(table_name));
                self.has_any_plans(&offline_sibling)
                    && self.time_boundary_service.get(&offline_sibling).is_none()
            }
            None => false,
        };

        if !needs_update {
            debug!("No time boundary update needed for table {}", table_name);
            return;
        }

        let boundary_start = Instant::now();
        match self.time_boundary_service.update(external_view).await {
            Ok(()) => info!(
                "Computed time boundary for table {} in {} ms",
                table_name,
                boundary_start.elapsed().as_millis()
            ),
            Err(err) => error!(
                "Failed to update time boundary for table {}: {}",
                table_name, err
            ),
        }
    }

    // ---- change detection ----

    /// Whether a table's plans must be rebuilt for the given fresh state.
    /// Irrelevant instance-config updates (version bumps without an
    /// eligibility change) only refresh the caches.
    pub fn is_rebuild_required(
        &self,
        table_name: &str,
        external_view: &ExternalView,
        instance_configs: &[InstanceConfig],
    ) -> bool {
        let last_version = self
            .last_known_ev_version
            .read()
            .ok()
            .and_then(|versions| versions.get(table_name).copied());
        let last_version = match last_version {
            None => {
                info!(
                    "Routing table for table {} requires rebuild: newly added",
                    table_name
                );
                return true;
            }
            Some(version) => version,
        };

        if external_view.version != last_version
            || last_version == INVALID_EXTERNAL_VIEW_VERSION
        {
            info!(
                "Routing table for table {} requires rebuild: external view change (current v{}, last known v{})",
                table_name, external_view.version, last_version
            );
            return true;
        }

        let last_known = self
            .last_known_ic_for_table
            .read()
            .ok()
            .and_then(|ic_for_table| ic_for_table.get(table_name).cloned());
        let last_known = match last_known {
            Some(configs) if !configs.is_empty() => configs,
            _ => {
                info!(
                    "Routing table for table {} requires rebuild: no previous instance configs",
                    table_name
                );
                return true;
            }
        };

        let current_relevant: HashMap<&str, &InstanceConfig> = instance_configs
            .iter()
            .filter(|config| last_known.contains_key(&config.instance_name))
            .map(|config| (config.instance_name.as_str(), config))
            .collect();

        if current_relevant.len() != last_known.len() {
            info!(
                "Routing table for table {} requires rebuild: instance config count changed ({} -> {})",
                table_name,
                last_known.len(),
                current_relevant.len()
            );
            return true;
        }

        for (instance_name, previous) in &last_known {
            let current = match current_relevant.get(instance_name.as_str()) {
                Some(current) => *current,
                None => return true,
            };

            // Same record version, nothing to compare.
            if previous.version == current.version {
                continue;
            }

            if previous.enabled != current.enabled
                || previous.shutting_down != current.shutting_down
            {
                info!(
                    "Routing table for table {} requires rebuild: instance {} changed state (enabled {} -> {}, shutting down {} -> {})",
                    table_name,
                    instance_name,
                    previous.enabled,
                    current.enabled,
                    previous.shutting_down,
                    current.shutting_down
                );
                return true;
            }

            // New version but no eligibility change: refresh the caches so
            // the version diff doesn't re-trigger forever.
            self.refresh_cached_instance_config(current);
        }

        debug!(
            "Routing table for table {} does not require a rebuild",
            table_name
        );
        false
    }

    fn refresh_cached_instance_config(&self, config: &InstanceConfig) {
        if let Ok(mut last_known) = self.last_known_ic.write() {
            last_known.insert(config.instance_name.clone(), config.clone());
        }
        let tables: Vec<String> = self
            .tables_for_instance
            .lock()
            .ok()
            .and_then(|tables_for_instance| {
                tables_for_instance
                    .get(&config.instance_name)
                    .map(|tables| tables.iter().cloned().collect())
            })
            .unwrap_or_default();
        if let Ok(mut ic_for_table) = self.last_known_ic_for_table.write() {
            for table in tables {
                if let Some(configs) = ic_for_table.get_mut(&table) {
                    configs.insert(config.instance_name.clone(), config.clone());
                }
            }
        }
    }

    // ---- coalesced change handlers ----

    /// Walk every served table, compare external view versions against the
    /// coordinator's stats, and rebuild the tables that changed. Called by
    /// the change mediator; safe to call spuriously.
    pub async fn process_external_view_change(&self) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        let start = Instant::now();

        let tables_served: Vec<String> = self
            .last_known_ev_version
            .read()
            .ok()
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default();
        if tables_served.is_empty() {
            return;
        }

        let paths: Vec<String> = tables_served
            .iter()
            .map(|table_name| external_view_path(table_name))
            .collect();

        let stat_start = Instant::now();
        let stats = match self.coordinator.fetch_stats(&paths).await {
            Ok(stats) => stats,
            Err(err) => {
                error!("Failed to fetch external view stats: {}", err);
                return;
            }
        };
        let stat_ms = stat_start.elapsed().as_millis();

        let mut tables_changed = Vec::new();
        if let Ok(versions) = self.last_known_ev_version.read() {
            for (table_name, stat) in tables_served.iter().zip(&stats) {
                if let Some(stat) = stat {
                    let last_known = versions
                        .get(table_name)
                        .copied()
                        .unwrap_or(INVALID_EXTERNAL_VIEW_VERSION);
                    if stat.version != last_known {
                        tables_changed.push(table_name.clone());
                    }
                }
            }
        }

        let mut ic_fetch_ms = 0;
        let rebuild_start = Instant::now();
        if !tables_changed.is_empty() {
            let ic_start = Instant::now();
            let instance_configs = match self.coordinator.fetch_instance_configs().await {
                Ok(configs) => configs,
                Err(err) => {
                    error!("Failed to fetch instance configs: {}", err);
                    return;
                }
            };
            ic_fetch_ms = ic_start.elapsed().as_millis();

            for table_name in &tables_changed {
                // Change notifications may be stale or batched, so the
                // notification payload is ignored and the latest view fetched.
                match self.coordinator.fetch_external_view(table_name).await {
                    Ok(Some(external_view)) => {
                        self.build_routing_table(table_name, &external_view, &instance_configs)
                            .await;
                    }
                    Ok(None) => {
                        warn!(
                            "External view for table {} disappeared, marking for rebuild",
                            table_name
                        );
                        self.mark_rebuild_required(table_name);
                    }
                    Err(err) => {
                        error!(
                            "Failed to fetch external view for table {}: {}",
                            table_name, err
                        );
                        if let Some(metrics) = &self.metrics {
                            metrics.record_rebuild_failure(table_name);
                        }
                        self.mark_rebuild_required(table_name);
                    }
                }
            }
        }

        info!(
            "Processed external view change in {} ms (stat {} ms, IC fetch {} ms, rebuild {} ms), {} / {} routing tables rebuilt: {:?}",
            start.elapsed().as_millis(),
            stat_ms,
            ic_fetch_ms,
            rebuild_start.elapsed().as_millis(),
            tables_changed.len(),
            tables_served.len(),
            tables_changed
        );
    }

    /// Walk every instance referenced by some plan, diff config versions,
    /// and rebuild the affected tables whose relevant configs actually
    /// changed. Called by the change mediator; safe to call spuriously.
    pub async fn process_instance_config_change(&self) {
        if self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        let start = Instant::now();

        let instances_used: Vec<String> = self
            .tables_for_instance
            .lock()
            .ok()
            .map(|tables_for_instance| tables_for_instance.keys().cloned().collect())
            .unwrap_or_default();
        if instances_used.is_empty() {
            return;
        }

        let paths: Vec<String> = instances_used
            .iter()
            .map(|instance_name| instance_config_path(instance_name))
            .collect();

        let stat_start = Instant::now();
        let stats = match self.coordinator.fetch_stats(&paths).await {
            Ok(stats) => stats,
            Err(err) => {
                error!("Failed to fetch instance config stats: {}", err);
                return;
            }
        };
        let stat_ms = stat_start.elapsed().as_millis();

        let mut instances_changed = Vec::new();
        if let Ok(last_known) = self.last_known_ic.read() {
            for (instance_name, stat) in instances_used.iter().zip(&stats) {
                if let Some(stat) = stat {
                    match last_known.get(instance_name) {
                        Some(previous) if previous.version == stat.version => {}
                        _ => instances_changed.push(instance_name.clone()),
                    }
                }
            }
        }

        let mut affected_tables: HashSet<String> = HashSet::new();
        if let Ok(tables_for_instance) = self.tables_for_instance.lock() {
            for instance_name in &instances_changed {
                if let Some(tables) = tables_for_instance.get(instance_name) {
                    affected_tables.extend(tables.iter().cloned());
                }
            }
        }

        let mut rebuilt = 0;
        if !affected_tables.is_empty() {
            let instance_configs = match self.coordinator.fetch_instance_configs().await {
                Ok(configs) => configs,
                Err(err) => {
                    error!("Failed to fetch instance configs: {}", err);
                    return;
                }
            };

            for table_name in &affected_tables {
                let external_view = match self.coordinator.fetch_external_view(table_name).await {
                    Ok(Some(external_view)) => external_view,
                    Ok(None) => {
                        warn!(
                            "External view for table {} disappeared, marking for rebuild",
                            table_name
                        );
                        self.mark_rebuild_required(table_name);
                        continue;
                    }
                    Err(err) => {
                        error!(
                            "Failed to fetch external view for table {}: {}",
                            table_name, err
                        );
                        if let Some(metrics) = &self.metrics {
                            metrics.record_rebuild_failure(table_name);
                        }
                        self.mark_rebuild_required(table_name);
                        continue;
                    }
                };

                if self.is_rebuild_required(table_name, &external_view, &instance_configs) {
                    self.build_routing_table(table_name, &external_view, &instance_configs)
                        .await;
                    rebuilt += 1;
                }
            }
        }

        info!(
            "Processed instance config change in {} ms (stat {} ms), {} instances changed, {} / {} affected routing tables rebuilt",
            start.elapsed().as_millis(),
            stat_ms,
            instances_changed.len(),
            rebuilt,
            affected_tables.len()
        );
    }

    // ---- snapshots ----

    /// Human-readable JSON rendering of the published plans, optionally
    /// filtered by table name prefix.
    pub fn dump_snapshot(&self, table_prefix: Option<&str>) -> RoutingResult<String> {
        let snapshot = json!({
            "routingTableSnapshot": self.snapshot_entries(&[&self.offline_plans, &self.hlc_plans], table_prefix),
            "llcRoutingTableSnapshot": self.snapshot_entries(&[&self.llc_plans], table_prefix),
            "host": broker_instance_id(),
        });
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    fn snapshot_entries(
        &self,
        plan_tables: &[&PlanTable],
        table_prefix: Option<&str>,
    ) -> Vec<serde_json::Value> {
        let mut tables: Vec<(String, Arc<Vec<SegmentSetMap>>)> = Vec::new();
        for plan_table in plan_tables {
            if let Ok(published) = plan_table.read() {
                for (table_name, plans) in published.iter() {
                    let matches = table_prefix
                        .map(|prefix| table_name.starts_with(prefix))
                        .unwrap_or(true);
                    if matches {
                        tables.push((table_name.clone(), Arc::clone(plans)));
                    }
                }
            }
        }
        tables.sort_by(|a, b| a.0.cmp(&b.0));
        tables
            .into_iter()
            .map(|(table_name, plans)| {
                json!({
                    "tableName": table_name,
                    "routingTableEntries": plans.iter().map(|plan| plan.to_json()).collect::<Vec<_>>(),
                })
            })
            .collect()
    }
}

fn collect_relevant_configs(
    relevant: &mut HashMap<String, InstanceConfig>,
    instance_configs: &[InstanceConfig],
    plans: &[SegmentSetMap],
) {
    let mut planned_servers: HashSet<&str> = HashSet::new();
    for plan in plans {
        planned_servers.extend(plan.servers().map(|server| server.as_str()));
    }
    for config in instance_configs {
        if planned_servers.contains(config.instance_name.as_str()) {
            relevant.insert(config.instance_name.clone(), config.clone());
        }
    }
}
