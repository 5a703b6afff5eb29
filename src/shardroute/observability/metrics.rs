//! Prometheus metrics for the routing layer
//!
//! Query counters are labeled by table so operators can see which tables
//! route through which consumer family, and which tables keep failing to
//! rebuild. The registry is broker-owned; callers scrape it through
//! [`BrokerMetrics::export_text`].

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

const TABLE_LABEL: &[&str] = &["table"];

/// Counters and timers published by the routing manager.
pub struct BrokerMetrics {
    registry: Registry,
    hlc_query_count: IntCounterVec,
    llc_query_count: IntCounterVec,
    routing_table_rebuild_failures: IntCounterVec,
    routing_table_update_time: Histogram,
}

impl BrokerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let hlc_query_count = IntCounterVec::new(
            Opts::new(
                "shardroute_hlc_query_count",
                "Queries routed to high-level consumer plans",
            ),
            TABLE_LABEL,
        )?;
        registry.register(Box::new(hlc_query_count.clone()))?;

        let llc_query_count = IntCounterVec::new(
            Opts::new(
                "shardroute_llc_query_count",
                "Queries routed to low-level consumer plans",
            ),
            TABLE_LABEL,
        )?;
        registry.register(Box::new(llc_query_count.clone()))?;

        let routing_table_rebuild_failures = IntCounterVec::new(
            Opts::new(
                "shardroute_routing_table_rebuild_failures",
                "Routing table rebuilds that failed and were marked for retry",
            ),
            TABLE_LABEL,
        )?;
        registry.register(Box::new(routing_table_rebuild_failures.clone()))?;

        let routing_table_update_time = Histogram::with_opts(HistogramOpts::new(
            "shardroute_routing_table_update_time_seconds",
            "Wall time spent rebuilding a table's routing plans",
        ))?;
        registry.register(Box::new(routing_table_update_time.clone()))?;

        Ok(Self {
            registry,
            hlc_query_count,
            llc_query_count,
            routing_table_rebuild_failures,
            routing_table_update_time,
        })
    }

    pub fn record_hlc_query(&self, table_name: &str) {
        self.hlc_query_count.with_label_values(&[table_name]).inc();
    }

    pub fn record_llc_query(&self, table_name: &str) {
        self.llc_query_count.with_label_values(&[table_name]).inc();
    }

    pub fn record_rebuild_failure(&self, table_name: &str) {
        self.routing_table_rebuild_failures
            .with_label_values(&[table_name])
            .inc();
    }

    pub fn observe_update_time(&self, elapsed: Duration) {
        self.routing_table_update_time.observe(elapsed.as_secs_f64());
    }

    /// Current counter values, mostly for tests and debug endpoints.
    pub fn hlc_query_total(&self, table_name: &str) -> u64 {
        self.hlc_query_count.with_label_values(&[table_name]).get()
    }

    pub fn llc_query_total(&self, table_name: &str) -> u64 {
        self.llc_query_count.with_label_values(&[table_name]).get()
    }

    pub fn rebuild_failure_total(&self, table_name: &str) -> u64 {
        self.routing_table_rebuild_failures
            .with_label_values(&[table_name])
            .get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn export_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
