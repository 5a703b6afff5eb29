//! Routing manager configuration
//!
//! Supports layered configuration: defaults, explicit overrides through
//! builder methods, and environment variables for deployment
//! (`SHARDROUTE_ROUTING_TABLE_COUNT`, `SHARDROUTE_BUILDER_SEED`).

/// Configuration for the routing manager and its builders
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Number of alternative plans each builder targets per table. Also caps
    /// the HLC cross-product enumeration.
    pub routing_table_count: usize,
    /// Fixed RNG seed for the builders. `None` seeds from entropy;
    /// tests pin this for reproducible plan generation.
    pub builder_seed: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routing_table_count: 10,
            builder_seed: None,
        }
    }
}

impl RoutingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routing_table_count(mut self, count: usize) -> Self {
        self.routing_table_count = count.max(1);
        self
    }

    pub fn with_builder_seed(mut self, seed: u64) -> Self {
        self.builder_seed = Some(seed);
        self
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(count) = std::env::var("SHARDROUTE_ROUTING_TABLE_COUNT") {
            if let Ok(count) = count.parse::<usize>() {
                config.routing_table_count = count.max(1);
            }
        }
        if let Ok(seed) = std::env::var("SHARDROUTE_BUILDER_SEED") {
            if let Ok(seed) = seed.parse::<u64>() {
                config.builder_seed = Some(seed);
            }
        }
        config
    }
}
