//! Table naming conventions
//!
//! A logical table is backed by up to two physical tables whose names carry a
//! type suffix: `trades_OFFLINE` and `trades_REALTIME`. The raw name
//! (`trades`) identifies the hybrid pair.

use std::fmt;

const OFFLINE_SUFFIX: &str = "_OFFLINE";
const REALTIME_SUFFIX: &str = "_REALTIME";

/// Physical table type, derived from the table name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    Offline,
    Realtime,
}

impl TableType {
    /// Parse the table type from a physical table name, if it carries a
    /// recognized suffix.
    pub fn from_table_name(table_name: &str) -> Option<TableType> {
        if table_name.ends_with(OFFLINE_SUFFIX) {
            Some(TableType::Offline)
        } else if table_name.ends_with(REALTIME_SUFFIX) {
            Some(TableType::Realtime)
        } else {
            None
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableType::Offline => write!(f, "OFFLINE"),
            TableType::Realtime => write!(f, "REALTIME"),
        }
    }
}

/// Strip the type suffix from a physical table name.
pub fn raw_table_name(table_name: &str) -> &str {
    table_name
        .strip_suffix(OFFLINE_SUFFIX)
        .or_else(|| table_name.strip_suffix(REALTIME_SUFFIX))
        .unwrap_or(table_name)
}

/// Physical offline table name for a raw table name.
pub fn offline_table_name(raw_name: &str) -> String {
    format!("{}{}", raw_name, OFFLINE_SUFFIX)
}

/// Physical realtime table name for a raw table name.
pub fn realtime_table_name(raw_name: &str) -> String {
    format!("{}{}", raw_name, REALTIME_SUFFIX)
}
