//! Shared test fixtures: an in-memory cluster coordinator and record builders.

// Not every test target uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use shardroute::shardroute::cluster::{
    ClusterCoordinator, CoordinatorError, ExternalView, InstanceConfig, PropertyRecord,
    SegmentState, VersionStat,
};
use shardroute::shardroute::routing::SegmentTimeMetadata;

const EXTERNAL_VIEW_PREFIX: &str = "/EXTERNALVIEW/";
const INSTANCE_CONFIG_PREFIX: &str = "/CONFIGS/PARTICIPANT/";

/// In-memory coordinator backing the routing tests. Tracks fetch counts so
/// tests can assert which reads a change handler actually performed.
#[derive(Default)]
pub struct MockCoordinator {
    external_views: RwLock<HashMap<String, ExternalView>>,
    instance_configs: RwLock<HashMap<String, InstanceConfig>>,
    properties: RwLock<HashMap<String, PropertyRecord>>,
    failing_external_views: RwLock<HashSet<String>>,
    pub external_view_fetches: AtomicUsize,
    pub instance_config_fetches: AtomicUsize,
    pub stat_fetches: AtomicUsize,
}

impl MockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_external_view(&self, external_view: ExternalView) {
        self.external_views
            .write()
            .unwrap()
            .insert(external_view.table_name.clone(), external_view);
    }

    pub fn put_instance_config(&self, instance_config: InstanceConfig) {
        self.instance_configs
            .write()
            .unwrap()
            .insert(instance_config.instance_name.clone(), instance_config);
    }

    pub fn put_property(&self, path: impl Into<String>, record: PropertyRecord) {
        self.properties.write().unwrap().insert(path.into(), record);
    }

    /// Make subsequent external view fetches for a table fail.
    pub fn fail_external_view(&self, table_name: &str, failing: bool) {
        let mut failures = self.failing_external_views.write().unwrap();
        if failing {
            failures.insert(table_name.to_string());
        } else {
            failures.remove(table_name);
        }
    }

    pub fn external_view_fetch_count(&self) -> usize {
        self.external_view_fetches.load(Ordering::Relaxed)
    }

    pub fn stat_fetch_count(&self) -> usize {
        self.stat_fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ClusterCoordinator for MockCoordinator {
    async fn fetch_external_view(
        &self,
        table_name: &str,
    ) -> Result<Option<ExternalView>, CoordinatorError> {
        if self
            .failing_external_views
            .read()
            .unwrap()
            .contains(table_name)
        {
            return Err(CoordinatorError::Unavailable {
                path: format!("{}{}", EXTERNAL_VIEW_PREFIX, table_name),
                reason: "injected failure".to_string(),
            });
        }
        self.external_view_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self.external_views.read().unwrap().get(table_name).cloned())
    }

    async fn fetch_instance_configs(&self) -> Result<Vec<InstanceConfig>, CoordinatorError> {
        self.instance_config_fetches.fetch_add(1, Ordering::Relaxed);
        let mut configs: Vec<InstanceConfig> =
            self.instance_configs.read().unwrap().values().cloned().collect();
        configs.sort_by(|a, b| a.instance_name.cmp(&b.instance_name));
        Ok(configs)
    }

    async fn fetch_stats(
        &self,
        paths: &[String],
    ) -> Result<Vec<Option<VersionStat>>, CoordinatorError> {
        self.stat_fetches.fetch_add(1, Ordering::Relaxed);
        let external_views = self.external_views.read().unwrap();
        let instance_configs = self.instance_configs.read().unwrap();
        Ok(paths
            .iter()
            .map(|path| {
                if let Some(table_name) = path.strip_prefix(EXTERNAL_VIEW_PREFIX) {
                    external_views
                        .get(table_name)
                        .map(|ev| VersionStat { version: ev.version })
                } else if let Some(instance_name) = path.strip_prefix(INSTANCE_CONFIG_PREFIX) {
                    instance_configs
                        .get(instance_name)
                        .map(|ic| VersionStat { version: ic.version })
                } else {
                    None
                }
            })
            .collect())
    }

    async fn read_property(
        &self,
        path: &str,
    ) -> Result<Option<PropertyRecord>, CoordinatorError> {
        Ok(self.properties.read().unwrap().get(path).cloned())
    }
}

// ---- record builders ----

pub fn instance(name: &str, version: i64) -> InstanceConfig {
    let mut config = InstanceConfig::new(name);
    config.version = version;
    config
}

pub fn external_view(
    table_name: &str,
    version: i64,
    states: &[(&str, &str, SegmentState)],
) -> ExternalView {
    let mut ev = ExternalView::new(table_name, version);
    for (segment, server, state) in states {
        ev.set_state(*segment, *server, *state);
    }
    ev
}

pub fn hlc_segment(group: &str, sequence: u32) -> String {
    format!("{}__0-3__{}", group, sequence)
}

pub fn llc_segment(table: &str, partition: u32, sequence: u32) -> String {
    format!("{}__{}__{}__20240601T0000Z", table, partition, sequence)
}

pub fn segment_time_record(segment: &str, column: &str, end_time: i64, unit: &str) -> PropertyRecord {
    PropertyRecord::new(segment)
        .with_field(SegmentTimeMetadata::TIME_COLUMN_FIELD, column)
        .with_field(SegmentTimeMetadata::END_TIME_FIELD, end_time.to_string())
        .with_field(SegmentTimeMetadata::TIME_UNIT_FIELD, unit)
}
