//! Active table context
//!
//! Holds the table name used when an operation does not name one. The
//! context is an explicit value shared by whoever builds actions; reads are
//! live, so a rename is visible to the next call.

use parking_lot::RwLock;

/// Table used before anything is configured
pub const DEFAULT_TABLE: &str = "Table1";

#[derive(Debug)]
pub struct TableContext {
    name: RwLock<String>,
}

impl TableContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: RwLock::new(name.into()),
        }
    }

    /// Currently active table name
    pub fn table_name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_table_name(&self, name: impl Into<String>) {
        let name = name.into();
        log::debug!("Active table set to {}", name);
        *self.name.write() = name;
    }

    /// Explicit name if given and non-empty, otherwise the active table
    pub fn resolve(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.table_name(),
        }
    }
}

impl Default for TableContext {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}
