//! Host-facing interfaces
//!
//! The spreadsheet host is reached through two narrow traits: an
//! [`EventSource`] that callbacks subscribe to, and a [`DataAccessor`] used
//! to fetch fresh data when an event arrives. Both are async because every
//! round trip to the host is a suspension point.
//!
//! [`LocalEventSource`], [`MemoryAccessor`] and [`JsonFileAccessor`] are
//! in-process implementations for the CLI and for tests.

use crate::snapshot::TableSnapshot;
use crate::types::{record_id, Record, Result, RowId};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Kinds of host events callbacks can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Any change to the selected table
    RecordsChanged,
    /// The cursor moved to (or changed) a single record
    RecordChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RecordsChanged => "records-changed",
            EventKind::RecordChanged => "record-changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    RecordsChanged,
    /// Reference to the changed record; may be absent or empty
    RecordChanged(Option<Record>),
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::RecordsChanged => EventKind::RecordsChanged,
            HostEvent::RecordChanged(_) => EventKind::RecordChanged,
        }
    }
}

/// Data handed to callbacks after a dispatch fetch
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Full snapshot of the selected table (records-changed)
    Table(TableSnapshot),
    /// The single changed record (record-changed)
    Record(Record),
}

impl EventPayload {
    pub fn as_table(&self) -> Option<&TableSnapshot> {
        match self {
            EventPayload::Table(table) => Some(table),
            EventPayload::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            EventPayload::Record(record) => Some(record),
            EventPayload::Table(_) => None,
        }
    }
}

/// Receiver bound to an event subscription
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: HostEvent);
}

/// Source of host events
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Bind `handler` to every future event of `kind`
    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()>;
}

/// Fetches current data from the host
#[async_trait]
pub trait DataAccessor: Send + Sync {
    async fn fetch_selected_table(&self) -> Result<TableSnapshot>;

    /// `Ok(None)` when no record has this id
    async fn fetch_selected_record(&self, row_id: RowId) -> Result<Option<Record>>;
}

/// In-process event source: records subscriptions and fires events on demand
#[derive(Default)]
pub struct LocalEventSource {
    subscriptions: Mutex<Vec<(EventKind, Arc<dyn EventHandler>)>>,
}

impl LocalEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscriptions made for `kind`
    pub fn subscription_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Deliver `event` to every handler subscribed to its kind
    pub async fn fire(&self, event: HostEvent) {
        let kind = event.kind();
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        log::debug!("Firing {} to {} handler(s)", kind, handlers.len());
        for handler in handlers {
            handler.handle(event.clone()).await;
        }
    }
}

#[async_trait]
impl EventSource for LocalEventSource {
    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
        log::info!("Subscribed to {} events", kind);
        self.subscriptions.lock().push((kind, handler));
        Ok(())
    }
}

/// Accessor serving a snapshot held in memory
#[derive(Debug, Default)]
pub struct MemoryAccessor {
    table: RwLock<TableSnapshot>,
}

impl MemoryAccessor {
    pub fn new(table: TableSnapshot) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Replace the served snapshot
    pub fn set_table(&self, table: TableSnapshot) {
        *self.table.write() = table;
    }
}

#[async_trait]
impl DataAccessor for MemoryAccessor {
    async fn fetch_selected_table(&self) -> Result<TableSnapshot> {
        Ok(self.table.read().clone())
    }

    async fn fetch_selected_record(&self, row_id: RowId) -> Result<Option<Record>> {
        Ok(self.table.read().get(row_id).cloned())
    }
}

/// Accessor reading the host-synced JSON data file on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileAccessor {
    path: PathBuf,
}

impl JsonFileAccessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl DataAccessor for JsonFileAccessor {
    async fn fetch_selected_table(&self) -> Result<TableSnapshot> {
        Ok(TableSnapshot::load(&self.path))
    }

    async fn fetch_selected_record(&self, row_id: RowId) -> Result<Option<Record>> {
        let table = TableSnapshot::load(&self.path);
        Ok(table
            .into_rows()
            .into_iter()
            .find(|row| record_id(row) == Some(row_id)))
    }
}
