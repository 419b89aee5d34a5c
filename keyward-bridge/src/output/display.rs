//! Notebook display surface
//!
//! [`DisplayHost`] is what the notebook offers for showing output: updatable
//! display handles (rich display) and the shared ambient output stream.
//! A host without rich display returns no handles, which puts callback
//! wrappers into plain mode.

use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Something rendered into a display handle
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputValue {
    /// Cleared slot
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl OutputValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, OutputValue::Empty)
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Empty => Ok(()),
            OutputValue::Text(text) => f.write_str(text),
            OutputValue::Json(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for OutputValue {
    fn from(text: &str) -> Self {
        OutputValue::Text(text.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(text: String) -> Self {
        OutputValue::Text(text)
    }
}

impl From<Value> for OutputValue {
    fn from(value: Value) -> Self {
        OutputValue::Json(value)
    }
}

/// An updatable output area in the notebook
pub trait DisplayHandle: Send + Sync {
    /// Replace the handle's content
    fn update(&self, value: &OutputValue);
}

/// The notebook's output capabilities
pub trait DisplayHost: Send + Sync {
    /// Allocate a new display handle; `None` when rich display is unavailable
    fn create_handle(&self) -> Option<Arc<dyn DisplayHandle>>;

    /// Write to the shared output stream
    fn write_ambient(&self, text: &str);
}

/// Plain host: no display handles, ambient output goes to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutDisplay;

impl DisplayHost for StdoutDisplay {
    fn create_handle(&self) -> Option<Arc<dyn DisplayHandle>> {
        None
    }

    fn write_ambient(&self, text: &str) {
        println!("{}", text);
    }
}

/// Display handle keeping its latest content in memory
#[derive(Debug, Default)]
pub struct MemoryHandle {
    value: Mutex<OutputValue>,
}

impl MemoryHandle {
    pub fn value(&self) -> OutputValue {
        self.value.lock().clone()
    }
}

impl DisplayHandle for MemoryHandle {
    fn update(&self, value: &OutputValue) {
        *self.value.lock() = value.clone();
    }
}

/// In-memory host recording every handle and ambient line
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    rich: bool,
    handles: Mutex<Vec<Arc<MemoryHandle>>>,
    ambient: Mutex<Vec<String>>,
}

impl MemoryDisplay {
    /// Host with rich display support
    pub fn rich() -> Self {
        Self {
            rich: true,
            ..Self::default()
        }
    }

    /// Host without rich display support
    pub fn plain() -> Self {
        Self::default()
    }

    /// Current content of every allocated handle, in allocation order
    pub fn handle_values(&self) -> Vec<OutputValue> {
        self.handles.lock().iter().map(|h| h.value()).collect()
    }

    /// Non-empty handle contents, in allocation order
    pub fn shown(&self) -> Vec<OutputValue> {
        self.handle_values()
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect()
    }

    pub fn ambient(&self) -> Vec<String> {
        self.ambient.lock().clone()
    }
}

impl DisplayHost for MemoryDisplay {
    fn create_handle(&self) -> Option<Arc<dyn DisplayHandle>> {
        if !self.rich {
            return None;
        }
        let handle = Arc::new(MemoryHandle::default());
        self.handles.lock().push(Arc::clone(&handle));
        Some(handle)
    }

    fn write_ambient(&self, text: &str) {
        self.ambient.lock().push(text.to_string());
    }
}
