//! Bridge configuration types
//!
//! This module defines the settings shared by the table operations, the
//! callback registry and the apply trigger. Every field has a default, so an
//! empty config section is valid.

use crate::context::DEFAULT_TABLE;
use crate::output::DEFAULT_SLOT_COUNT;
use crate::snapshot::DEFAULT_DATA_PATH;
use crate::types::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// UI element id the host listens on for action batches
pub const DEFAULT_UI_ELEMENT: &str = "grist";

/// Configuration for the bridge library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Table used when an operation names none
    #[serde(default = "default_table")]
    pub default_table: String,

    /// Output slots allocated per registered callback
    #[serde(default = "default_output_slots")]
    pub output_slots: usize,

    /// Capture callback output into slots (false = plain mode)
    #[serde(default = "default_true")]
    pub rich_display: bool,

    /// JSON data file kept in sync by the host
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// UI element id used in submission messages
    #[serde(default = "default_ui_element")]
    pub ui_element: String,

    /// Empty the queue when the apply prompt is built
    #[serde(default = "default_true")]
    pub clear_after_apply: bool,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_output_slots() -> usize {
    DEFAULT_SLOT_COUNT
}

fn default_true() -> bool {
    true
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_ui_element() -> String {
    DEFAULT_UI_ELEMENT.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_table: default_table(),
            output_slots: default_output_slots(),
            rich_display: true,
            data_path: default_data_path(),
            ui_element: default_ui_element(),
            clear_after_apply: true,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the default table
    pub fn with_default_table(mut self, table: impl Into<String>) -> Self {
        self.default_table = table.into();
        self
    }

    /// Builder method: set the number of output slots per callback
    pub fn with_output_slots(mut self, slots: usize) -> Self {
        self.output_slots = slots;
        self
    }

    /// Builder method: enable or disable output capture
    pub fn with_rich_display(mut self, enabled: bool) -> Self {
        self.rich_display = enabled;
        self
    }

    /// Builder method: set the data file path
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Builder method: set the UI element id
    pub fn with_ui_element(mut self, ui_element: impl Into<String>) -> Self {
        self.ui_element = ui_element.into();
        self
    }

    /// Builder method: keep queued actions after apply
    pub fn with_clear_after_apply(mut self, enabled: bool) -> Self {
        self.clear_after_apply = enabled;
        self
    }

    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.default_table.trim().is_empty() {
            return Err(BridgeError::Config("default_table must not be empty".into()));
        }
        // The last slot is reserved for the exhaustion marker
        if self.output_slots < 2 {
            return Err(BridgeError::Config("output_slots must be at least 2".into()));
        }
        if self.ui_element.is_empty() {
            return Err(BridgeError::Config("ui_element must not be empty".into()));
        }
        Ok(())
    }
}
