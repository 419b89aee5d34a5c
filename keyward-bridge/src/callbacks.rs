//! Callback registry and event dispatch
//!
//! Callbacks are registered per [`EventKind`] under a name. The first
//! registration for a kind subscribes one dispatcher to the host's event
//! source; later registrations only add handlers. Registering a name that
//! already exists replaces the old handler in place and prints a warning.
//!
//! On each event the dispatcher fetches fresh data from the
//! [`DataAccessor`] and runs every handler of that kind in registration
//! order, one at a time. Handler failures are contained by the redirection
//! wrapper, so one failing handler never stops the others.

use crate::config::BridgeConfig;
use crate::host::{DataAccessor, EventHandler, EventKind, EventPayload, EventSource, HostEvent};
use crate::output::{
    boxed_callback, CallbackFn, CallbackOutcome, DisplayHost, OutputSink, RedirectGate,
    RedirectedCallback,
};
use crate::types::{record_id, BridgeError, Result, Timestamp};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

/// Name a callback by its function identity
///
/// Fn items yield their own name (`on_change`). Closures all share the
/// name `{{closure}}`, so register closures with an explicit name.
pub fn callback_name<F>() -> String {
    let full = std::any::type_name::<F>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// Outcome of one dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub kind: EventKind,
    /// When the event was taken up for dispatch
    pub started_at: Timestamp,
    /// (callback name, outcome) in invocation order
    pub outcomes: Vec<(String, CallbackOutcome)>,
}

impl DispatchReport {
    fn skipped(kind: EventKind, started_at: Timestamp) -> Self {
        Self {
            kind,
            started_at,
            outcomes: Vec::new(),
        }
    }

    /// Names of the callbacks that ran
    pub fn invoked(&self) -> Vec<&str> {
        self.outcomes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                CallbackOutcome::Failed(trace) => Some((name.as_str(), trace.as_str())),
                CallbackOutcome::Completed => None,
            })
            .collect()
    }
}

struct RegistryInner {
    source: Arc<dyn EventSource>,
    accessor: Arc<dyn DataAccessor>,
    display: Arc<dyn DisplayHost>,
    gate: Arc<RedirectGate>,
    slot_count: usize,
    rich_display: bool,
    handlers: Mutex<HashMap<EventKind, Vec<Arc<RedirectedCallback>>>>,
    subscribed: Mutex<HashSet<EventKind>>,
}

impl RegistryInner {
    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<RedirectedCallback>> {
        self.handlers.lock().get(&kind).cloned().unwrap_or_default()
    }

    async fn dispatch(&self, event: HostEvent) -> Result<DispatchReport> {
        let kind = event.kind();
        let started_at = chrono::Utc::now();
        let payload = match event {
            HostEvent::RecordsChanged => {
                EventPayload::Table(self.accessor.fetch_selected_table().await?)
            }
            HostEvent::RecordChanged(reference) => {
                let Some(row_id) = reference.as_ref().and_then(record_id) else {
                    log::trace!("Ignoring {} without a record", kind);
                    return Ok(DispatchReport::skipped(kind, started_at));
                };
                match self.accessor.fetch_selected_record(row_id).await? {
                    Some(record) => EventPayload::Record(record),
                    None => {
                        log::debug!("Record {} not found, nothing to dispatch", row_id);
                        return Ok(DispatchReport::skipped(kind, started_at));
                    }
                }
            }
        };

        // Snapshot the handler list so registrations made by a running
        // callback apply from the next dispatch on.
        let handlers = self.handlers_for(kind);
        log::debug!("Dispatching {} to {} callback(s)", kind, handlers.len());

        let mut outcomes = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let outcome = handler.invoke(payload.clone()).await;
            outcomes.push((handler.name().to_string(), outcome));
        }

        Ok(DispatchReport {
            kind,
            started_at,
            outcomes,
        })
    }
}

/// Handler bound to the host event source, one per event kind
struct KindDispatcher {
    kind: EventKind,
    registry: Arc<RegistryInner>,
}

#[async_trait]
impl EventHandler for KindDispatcher {
    async fn handle(&self, event: HostEvent) {
        if event.kind() != self.kind {
            log::warn!("{} dispatcher received a {} event", self.kind, event.kind());
            return;
        }
        match self.registry.dispatch(event).await {
            Ok(report) => {
                for (name, trace) in report.failures() {
                    log::debug!("Callback {} reported: {}", name, trace.trim_end());
                }
            }
            Err(e) => log::error!("Failed to dispatch {}: {}", self.kind, e),
        }
    }
}

/// Registry of event callbacks
#[derive(Clone)]
pub struct CallbackRegistry {
    inner: Arc<RegistryInner>,
}

impl CallbackRegistry {
    /// Create a registry sharing the process-wide redirection gate
    pub fn new(
        source: Arc<dyn EventSource>,
        accessor: Arc<dyn DataAccessor>,
        display: Arc<dyn DisplayHost>,
        config: &BridgeConfig,
    ) -> Self {
        Self::with_gate(source, accessor, display, config, RedirectGate::global())
    }

    /// Create a registry with its own redirection gate
    pub fn with_gate(
        source: Arc<dyn EventSource>,
        accessor: Arc<dyn DataAccessor>,
        display: Arc<dyn DisplayHost>,
        config: &BridgeConfig,
        gate: Arc<RedirectGate>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                source,
                accessor,
                display,
                gate,
                slot_count: config.output_slots,
                rich_display: config.rich_display,
                handlers: Mutex::new(HashMap::new()),
                subscribed: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Register a callback under `name`
    pub async fn register<F, Fut>(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        callback: F,
    ) -> Result<Arc<RedirectedCallback>>
    where
        F: Fn(EventPayload, OutputSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_boxed(kind, name, boxed_callback(callback)).await
    }

    /// Register a fn item under its own name
    pub async fn register_fn<F, Fut>(&self, kind: EventKind, callback: F) -> Result<Arc<RedirectedCallback>>
    where
        F: Fn(EventPayload, OutputSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = callback_name::<F>();
        self.register(kind, name, callback).await
    }

    /// Register an already boxed callback
    pub async fn register_boxed(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        callback: Arc<CallbackFn>,
    ) -> Result<Arc<RedirectedCallback>> {
        let name = name.into();
        let inner = &self.inner;

        let wrapped = Arc::new(RedirectedCallback::new(
            name.clone(),
            callback,
            Arc::clone(&inner.display),
            Arc::clone(&inner.gate),
            inner.slot_count,
            inner.rich_display,
        ));

        self.ensure_subscribed(kind).await?;

        let replaced = {
            let mut handlers = inner.handlers.lock();
            let list = handlers.entry(kind).or_default();
            match list.iter_mut().find(|handler| handler.name() == name) {
                Some(existing) => {
                    *existing = Arc::clone(&wrapped);
                    true
                }
                None => {
                    list.push(Arc::clone(&wrapped));
                    false
                }
            }
        };

        if replaced {
            let warning = format!(
                "A callback named {} has already been registered, so I'm assuming you want \
                 to replace it. If not, please rename the function.\n",
                name
            );
            log::warn!("Replaced {} callback {}", kind, name);
            inner.display.write_ambient(&warning);
        } else {
            log::info!("Registered {} callback {}", kind, name);
        }

        Ok(wrapped)
    }

    /// Convenience for [`EventKind::RecordsChanged`]
    pub async fn on_records<F, Fut>(&self, name: impl Into<String>, callback: F) -> Result<Arc<RedirectedCallback>>
    where
        F: Fn(EventPayload, OutputSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(EventKind::RecordsChanged, name, callback).await
    }

    /// Convenience for [`EventKind::RecordChanged`]
    pub async fn on_record<F, Fut>(&self, name: impl Into<String>, callback: F) -> Result<Arc<RedirectedCallback>>
    where
        F: Fn(EventPayload, OutputSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(EventKind::RecordChanged, name, callback).await
    }

    async fn ensure_subscribed(&self, kind: EventKind) -> Result<()> {
        // Claim the subscription before awaiting so concurrent first
        // registrations cannot both subscribe.
        if !self.inner.subscribed.lock().insert(kind) {
            return Ok(());
        }

        let dispatcher = Arc::new(KindDispatcher {
            kind,
            registry: Arc::clone(&self.inner),
        });
        if let Err(e) = self.inner.source.subscribe(kind, dispatcher).await {
            self.inner.subscribed.lock().remove(&kind);
            return Err(BridgeError::Subscription(kind.to_string(), e.to_string()));
        }
        Ok(())
    }

    /// Fetch fresh data for `event` and run every matching callback
    pub async fn dispatch(&self, event: HostEvent) -> Result<DispatchReport> {
        self.inner.dispatch(event).await
    }

    /// Callback names for `kind`, in invocation order
    pub fn names(&self, kind: EventKind) -> Vec<String> {
        self.inner
            .handlers_for(kind)
            .iter()
            .map(|handler| handler.name().to_string())
            .collect()
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.inner.subscribed.lock().contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{LocalEventSource, MemoryAccessor};
    use crate::output::{MemoryDisplay, OutputValue};
    use crate::snapshot::TableSnapshot;
    use serde_json::json;

    struct Fixture {
        source: Arc<LocalEventSource>,
        accessor: Arc<MemoryAccessor>,
        display: Arc<MemoryDisplay>,
        registry: CallbackRegistry,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(LocalEventSource::new());
        let table = TableSnapshot::from_json(r#"[{"id": 1, "Name": "Ada"}, {"id": 2, "Name": "Brian"}]"#)
            .unwrap();
        let accessor = Arc::new(MemoryAccessor::new(table));
        let display = Arc::new(MemoryDisplay::rich());
        let registry = CallbackRegistry::with_gate(
            source.clone(),
            accessor.clone(),
            display.clone(),
            &BridgeConfig::new().with_output_slots(4),
            Arc::new(RedirectGate::new()),
        );
        Fixture {
            source,
            accessor,
            display,
            registry,
        }
    }

    async fn summarize(payload: EventPayload, out: OutputSink) -> anyhow::Result<()> {
        let rows = payload.as_table().map(TableSnapshot::len).unwrap_or(0);
        out.print(format!("{} rows", rows));
        Ok(())
    }

    #[tokio::test]
    async fn test_single_subscription_per_kind() {
        let f = fixture();
        f.registry.register_fn(EventKind::RecordsChanged, summarize).await.unwrap();
        f.registry
            .on_records("second", |_payload, _out| async { Ok::<(), anyhow::Error>(()) })
            .await
            .unwrap();

        assert_eq!(f.source.subscription_count(EventKind::RecordsChanged), 1);
        assert_eq!(f.source.subscription_count(EventKind::RecordChanged), 0);
        assert!(f.registry.is_subscribed(EventKind::RecordsChanged));
        assert_eq!(f.registry.names(EventKind::RecordsChanged), vec!["summarize", "second"]);
    }

    #[tokio::test]
    async fn test_fired_event_reaches_callbacks() {
        let f = fixture();
        f.registry.register_fn(EventKind::RecordsChanged, summarize).await.unwrap();

        f.source.fire(HostEvent::RecordsChanged).await;
        assert_eq!(f.display.shown(), vec![OutputValue::from("2 rows")]);
    }

    #[tokio::test]
    async fn test_dispatch_order_and_shared_payload() {
        let f = fixture();
        let seen: Arc<Mutex<Vec<(String, usize)>>> = Default::default();

        for name in ["first", "second"] {
            let seen = Arc::clone(&seen);
            f.registry
                .on_records(name, move |payload, _out| {
                    let seen = Arc::clone(&seen);
                    async move {
                        let rows = payload.as_table().map(TableSnapshot::len).unwrap_or(0);
                        seen.lock().push((name.to_string(), rows));
                        Ok::<(), anyhow::Error>(())
                    }
                })
                .await
                .unwrap();
        }

        let report = f.registry.dispatch(HostEvent::RecordsChanged).await.unwrap();
        assert_eq!(report.invoked(), vec!["first", "second"]);
        assert_eq!(
            *seen.lock(),
            vec![("first".to_string(), 2), ("second".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_failing_callback_does_not_stop_others() {
        let f = fixture();
        f.registry
            .on_records("broken", |_payload, _out| async {
                Err::<(), anyhow::Error>(anyhow::anyhow!("no such column"))
            })
            .await
            .unwrap();
        f.registry.register_fn(EventKind::RecordsChanged, summarize).await.unwrap();

        let report = f.registry.dispatch(HostEvent::RecordsChanged).await.unwrap();
        assert_eq!(report.invoked(), vec!["broken", "summarize"]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.outcomes[1].1, CallbackOutcome::Completed);

        let shown = f.display.shown();
        assert!(shown.iter().any(|v| v.to_string().contains("no such column")));
        assert!(shown.contains(&OutputValue::from("2 rows")));
    }

    #[tokio::test]
    async fn test_reregistering_replaces_and_warns() {
        let f = fixture();
        let hits: Arc<Mutex<Vec<&'static str>>> = Default::default();

        for label in ["old", "new"] {
            let hits = Arc::clone(&hits);
            f.registry
                .on_records("handler", move |_payload, _out| {
                    hits.lock().push(label);
                    async { Ok::<(), anyhow::Error>(()) }
                })
                .await
                .unwrap();
        }

        f.registry.dispatch(HostEvent::RecordsChanged).await.unwrap();
        assert_eq!(*hits.lock(), vec!["new"]);
        assert_eq!(f.registry.names(EventKind::RecordsChanged), vec!["handler"]);
        assert!(f.display.ambient()[0].contains("A callback named handler has already been registered"));
    }

    #[tokio::test]
    async fn test_record_changed_fetches_by_id() {
        let f = fixture();
        let names: Arc<Mutex<Vec<String>>> = Default::default();
        let sink = Arc::clone(&names);
        f.registry
            .on_record("cursor", move |payload, _out| {
                let sink = Arc::clone(&sink);
                async move {
                    if let Some(record) = payload.as_record() {
                        sink.lock().push(record["Name"].as_str().unwrap_or_default().to_string());
                    }
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await
            .unwrap();

        let reference = serde_json::from_value(json!({"id": 2})).unwrap();
        f.registry
            .dispatch(HostEvent::RecordChanged(Some(reference)))
            .await
            .unwrap();
        assert_eq!(*names.lock(), vec!["Brian".to_string()]);
    }

    #[tokio::test]
    async fn test_record_changed_noops() {
        let f = fixture();
        f.registry
            .on_record("cursor", |_payload, _out| async {
                Err::<(), anyhow::Error>(anyhow::anyhow!("should not run"))
            })
            .await
            .unwrap();

        let empty = f.registry.dispatch(HostEvent::RecordChanged(None)).await.unwrap();
        assert!(empty.outcomes.is_empty());

        let blank = serde_json::from_value(json!({})).unwrap();
        let report = f.registry.dispatch(HostEvent::RecordChanged(Some(blank))).await.unwrap();
        assert!(report.outcomes.is_empty());

        f.accessor.set_table(TableSnapshot::default());
        let missing = serde_json::from_value(json!({"id": 1})).unwrap();
        let report = f.registry.dispatch(HostEvent::RecordChanged(Some(missing))).await.unwrap();
        assert!(report.outcomes.is_empty());
    }

    /// Rejects the first subscription attempt, accepts later ones
    #[derive(Default)]
    struct FlakySource {
        attempts: std::sync::atomic::AtomicUsize,
        inner: LocalEventSource,
    }

    #[async_trait]
    impl EventSource for FlakySource {
        async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
            if self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                return Err(BridgeError::Host("event source not ready".into()));
            }
            self.inner.subscribe(kind, handler).await
        }
    }

    #[tokio::test]
    async fn test_failed_subscription_registers_nothing() {
        let source = Arc::new(FlakySource::default());
        let display = Arc::new(MemoryDisplay::rich());
        let registry = CallbackRegistry::with_gate(
            source.clone(),
            Arc::new(MemoryAccessor::default()),
            display.clone(),
            &BridgeConfig::new().with_output_slots(2),
            Arc::new(RedirectGate::new()),
        );

        let err = registry
            .on_records("handler", |_payload, _out| async { Ok::<(), anyhow::Error>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Subscription(..)));
        assert!(registry.names(EventKind::RecordsChanged).is_empty());
        assert!(!registry.is_subscribed(EventKind::RecordsChanged));

        // Retrying subscribes, and is a first registration, not a replacement
        registry
            .on_records("handler", |_payload, _out| async { Ok::<(), anyhow::Error>(()) })
            .await
            .unwrap();
        assert_eq!(registry.names(EventKind::RecordsChanged), vec!["handler"]);
        assert_eq!(source.inner.subscription_count(EventKind::RecordsChanged), 1);
        assert!(display.ambient().is_empty());
    }

    #[test]
    fn test_callback_name_of_fn_item() {
        fn on_change(_payload: EventPayload, _out: OutputSink) -> futures::future::Ready<anyhow::Result<()>> {
            futures::future::ready(Ok(()))
        }
        fn name_of<F>(_f: &F) -> String {
            callback_name::<F>()
        }
        assert_eq!(name_of(&on_change), "on_change");
    }
}
