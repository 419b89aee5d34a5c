//! Keyward Bridge Library
//!
//! Glue between a notebook and a spreadsheet host. User code builds table
//! mutations (actions) that are queued and later submitted as one batch,
//! and registers callbacks that run when the host reports data changes.
//!
//! # Architecture
//!
//! - `builder` / `ops`: turn table operations into wire-format [`Action`]s
//!   and append them to the shared [`ActionQueue`]
//! - `submit`: wrap a batch in a UI element message and send it
//! - `callbacks`: subscribe to host events and dispatch them to named
//!   callbacks, in registration order
//! - `output`: capture each callback's output into its own display slots
//!
//! The host itself is reached only through the traits in `host`
//! ([`EventSource`], [`DataAccessor`]) and `output` ([`DisplayHost`]).
//!
//! # Example Usage
//!
//! ```no_run
//! use keyward_bridge::{BridgeConfig, KeywardApi, MemoryTransport};
//! use serde_json::json;
//!
//! let api = KeywardApi::from_config(&BridgeConfig::new().with_default_table("People"));
//!
//! let record = serde_json::from_value(json!({"Name": "Ada", "Age": 36})).unwrap();
//! api.add_record(record, None);
//! api.delete_records(vec![7, 8], None);
//!
//! let prompt = api.apply_button();
//! println!("{}", prompt); // "Apply 3 action(s) to Grist"
//!
//! if let Some(button) = prompt.button() {
//!     button.activate(&MemoryTransport::new()).unwrap();
//! }
//! ```

// Public modules
pub mod action;
pub mod api;
pub mod builder;
pub mod callbacks;
pub mod config;
pub mod context;
pub mod host;
pub mod ops;
pub mod output;
pub mod queue;
pub mod snapshot;
pub mod submit;
pub mod types;

// Re-export main types for convenience
pub use action::{Action, ActionVerb, ColumnData, ColumnInfo};
pub use api::KeywardApi;
pub use callbacks::{CallbackRegistry, DispatchReport};
pub use config::BridgeConfig;
pub use context::TableContext;
pub use host::{
    DataAccessor, EventKind, EventPayload, EventSource, HostEvent, JsonFileAccessor,
    LocalEventSource, MemoryAccessor,
};
pub use ops::{parse_operations, Operation, TableOps};
pub use output::{
    CallbackOutcome, DisplayHost, MemoryDisplay, OutputSink, OutputValue, RedirectGate,
    StdoutDisplay,
};
pub use queue::ActionQueue;
pub use snapshot::{Query, TableSnapshot};
pub use submit::{
    send_actions, ApplyButton, ApplyPrompt, MemoryTransport, MessageTransport, StdoutTransport,
    UiElementMessage,
};
pub use types::{BridgeError, Record, Result, RowId, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
