//! Per-table HLC/LLC routing policy
//!
//! When a realtime table has both consumer families published, the selector
//! decides which one serves a query that doesn't force a family. The default
//! policy sticks to HLC; the percentage-based policy shifts a configured
//! share of queries to LLC, which is how tables are migrated between consumer
//! models without a flag day.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Per-table policy choosing between HLC and LLC routing.
pub trait RoutingTableSelector: Send + Sync {
    /// Called whenever a realtime table's routing is (re)built.
    fn register_table(&self, table_name: &str);

    /// Whether this query for `table_name` should use LLC routing.
    fn should_use_llc_routing(&self, table_name: &str) -> bool;
}

/// Always routes to HLC.
#[derive(Debug, Default)]
pub struct DefaultRoutingTableSelector;

impl DefaultRoutingTableSelector {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingTableSelector for DefaultRoutingTableSelector {
    fn register_table(&self, _table_name: &str) {}

    fn should_use_llc_routing(&self, _table_name: &str) -> bool {
        false
    }
}

/// Configuration for [`PercentageBasedRoutingTableSelector`]
#[derive(Debug, Clone, Default)]
pub struct RoutingSelectorConfig {
    /// LLC share (0-100) applied to tables without an override.
    pub default_llc_percent: u8,
    /// Per-table overrides, keyed by physical realtime table name.
    pub table_llc_percent: HashMap<String, u8>,
}

impl RoutingSelectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_percent(mut self, percent: u8) -> Self {
        self.default_llc_percent = percent.min(100);
        self
    }

    pub fn with_table_percent(mut self, table_name: impl Into<String>, percent: u8) -> Self {
        self.table_llc_percent
            .insert(table_name.into(), percent.min(100));
        self
    }

    /// Load the default percentage from `SHARDROUTE_LLC_PERCENT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(percent) = std::env::var("SHARDROUTE_LLC_PERCENT") {
            if let Ok(percent) = percent.parse::<u8>() {
                config.default_llc_percent = percent.min(100);
            }
        }
        config
    }

    fn percent_for(&self, table_name: &str) -> u8 {
        self.table_llc_percent
            .get(table_name)
            .copied()
            .unwrap_or(self.default_llc_percent)
    }
}

/// Routes a configured percentage of queries to LLC.
pub struct PercentageBasedRoutingTableSelector {
    config: RoutingSelectorConfig,
    registered: RwLock<HashMap<String, u8>>,
    rng: Mutex<SmallRng>,
}

impl PercentageBasedRoutingTableSelector {
    pub fn new(config: RoutingSelectorConfig) -> Self {
        Self {
            config,
            registered: RwLock::new(HashMap::new()),
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }
}

impl RoutingTableSelector for PercentageBasedRoutingTableSelector {
    fn register_table(&self, table_name: &str) {
        let percent = self.config.percent_for(table_name);
        if let Ok(mut registered) = self.registered.write() {
            registered.insert(table_name.to_string(), percent);
        }
    }

    fn should_use_llc_routing(&self, table_name: &str) -> bool {
        let percent = self
            .registered
            .read()
            .ok()
            .and_then(|registered| registered.get(table_name).copied())
            .unwrap_or(0);
        match percent {
            0 => false,
            100.. => true,
            _ => {
                if let Ok(mut rng) = self.rng.lock() {
                    rng.gen_range(0..100u8) < percent
                } else {
                    false
                }
            }
        }
    }
}
