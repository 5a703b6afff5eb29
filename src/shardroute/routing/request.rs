//! Routing lookup requests
//!
//! Carries the table name and any routing options supplied by the query
//! layer. Option strings are matched case-insensitively.

use super::error::RoutingError;

const FORCE_HLC: &str = "FORCE_HLC";
const FORCE_LLC: &str = "FORCE_LLC";

/// A single routing lookup from the query layer
#[derive(Debug, Clone)]
pub struct RoutingLookupRequest {
    pub table_name: String,
    pub routing_options: Vec<String>,
}

/// Force flags parsed out of a request's routing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceFlags {
    pub hlc: bool,
    pub llc: bool,
}

impl RoutingLookupRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            routing_options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.routing_options.push(option.into());
        self
    }

    /// Parse the force options. Requesting both families at once is a caller
    /// error and fails without touching any state.
    pub fn force_flags(&self) -> Result<ForceFlags, RoutingError> {
        let mut flags = ForceFlags::default();
        for option in &self.routing_options {
            if option.eq_ignore_ascii_case(FORCE_HLC) {
                flags.hlc = true;
            }
            if option.eq_ignore_ascii_case(FORCE_LLC) {
                flags.llc = true;
            }
        }
        if flags.hlc && flags.llc {
            return Err(RoutingError::ConflictingRoutingOptions {
                table_name: self.table_name.clone(),
            });
        }
        Ok(flags)
    }
}
