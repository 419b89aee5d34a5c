//! Output redirection for callbacks
//!
//! A [`RedirectedCallback`] runs a user callback with an injected
//! [`OutputSink`]. While the callback runs, everything written to the sink
//! lands in the callback's own slot pool instead of the shared output
//! stream. Only one redirected invocation is active at a time, process-wide:
//! invocations queue on a [`RedirectGate`] permit, which is released on
//! every exit path.
//!
//! Failures (returned errors and panics) are caught here and turned into a
//! [`CallbackOutcome::Failed`] carrying the rendered error, which is also
//! written to the next free slot.

use super::display::{DisplayHost, OutputValue};
use super::slots::SlotPool;
use crate::host::EventPayload;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Future returned by a user callback
pub type CallbackFuture = BoxFuture<'static, anyhow::Result<()>>;

/// User callback: receives the fetched payload and an output sink
pub type CallbackFn = dyn Fn(EventPayload, OutputSink) -> CallbackFuture + Send + Sync;

/// Box a closure or async fn into a [`CallbackFn`]
pub fn boxed_callback<F, Fut>(f: F) -> Arc<CallbackFn>
where
    F: Fn(EventPayload, OutputSink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |payload: EventPayload, sink: OutputSink| -> CallbackFuture {
        f(payload, sink).boxed()
    })
}

/// Single-permit gate: at most one redirected invocation at a time
#[derive(Debug)]
pub struct RedirectGate {
    permits: Semaphore,
}

impl RedirectGate {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(1),
        }
    }

    /// The process-wide gate
    pub fn global() -> Arc<RedirectGate> {
        static GLOBAL: OnceLock<Arc<RedirectGate>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(RedirectGate::new())))
    }

    /// Wait for the permit; it is returned when the guard drops
    pub async fn enter(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.permits.acquire().await
    }

    /// True while some invocation holds the permit
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for RedirectGate {
    fn default() -> Self {
        Self::new()
    }
}

enum SinkTarget {
    Slots(Arc<SlotPool>),
    Ambient,
}

struct SinkInner {
    target: SinkTarget,
    attached: AtomicBool,
    host: Arc<dyn DisplayHost>,
}

/// Output handle given to callbacks
///
/// Writes go to the invocation's slots while the invocation is running.
/// A sink that outlives its invocation (e.g. moved into a spawned task)
/// writes to the ambient output instead.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<SinkInner>,
}

impl OutputSink {
    fn capturing(slots: Arc<SlotPool>, host: Arc<dyn DisplayHost>) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                target: SinkTarget::Slots(slots),
                attached: AtomicBool::new(true),
                host,
            }),
        }
    }

    /// Sink writing straight to the ambient output
    pub fn ambient(host: Arc<dyn DisplayHost>) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                target: SinkTarget::Ambient,
                attached: AtomicBool::new(false),
                host,
            }),
        }
    }

    /// Display a value
    pub fn emit(&self, value: impl Into<OutputValue>) {
        let value = value.into();
        match &self.inner.target {
            SinkTarget::Slots(slots) if self.is_capturing() => {
                slots.emit(&value);
            }
            _ => self.inner.host.write_ambient(&value.to_string()),
        }
    }

    /// Print a line of text
    pub fn print(&self, text: impl fmt::Display) {
        self.emit(OutputValue::Text(text.to_string()));
    }

    /// Print several items joined by `sep` and terminated by `end`
    ///
    /// A single item with the default `"\n"` terminator is shown as-is.
    pub fn print_items(&self, items: &[&dyn fmt::Display], sep: &str, end: &str) {
        if items.len() == 1 && end == "\n" {
            self.print(items[0]);
            return;
        }
        let joined = items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(sep);
        self.emit(OutputValue::Text(joined + end));
    }

    /// True while writes are captured into slots
    pub fn is_capturing(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    fn detach(&self) {
        self.inner.attached.store(false, Ordering::Release);
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("capturing", &self.is_capturing())
            .finish()
    }
}

/// Detaches the wrapped sink when dropped
struct DetachOnDrop(OutputSink);

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// Result of one callback invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed,
    /// Rendered error or panic message
    Failed(String),
}

impl CallbackOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CallbackOutcome::Failed(_))
    }
}

/// A user callback bound to its output slots
pub struct RedirectedCallback {
    name: String,
    callback: Arc<CallbackFn>,
    slots: Option<Arc<SlotPool>>,
    gate: Arc<RedirectGate>,
    host: Arc<dyn DisplayHost>,
}

impl RedirectedCallback {
    /// Wrap `callback`, allocating `slot_count` display handles from `host`
    ///
    /// Without rich display (or with `rich_display` off) the wrapper runs in
    /// plain mode: nothing is captured and failures go to the ambient output.
    pub fn new(
        name: impl Into<String>,
        callback: Arc<CallbackFn>,
        host: Arc<dyn DisplayHost>,
        gate: Arc<RedirectGate>,
        slot_count: usize,
        rich_display: bool,
    ) -> Self {
        let slots = if rich_display {
            SlotPool::allocate(host.as_ref(), slot_count).map(Arc::new)
        } else {
            None
        };
        Self {
            name: name.into(),
            callback,
            slots,
            gate,
            host,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when output is captured into slots
    pub fn is_redirecting(&self) -> bool {
        self.slots.is_some()
    }

    /// Run the callback once
    pub async fn invoke(&self, payload: EventPayload) -> CallbackOutcome {
        let Some(slots) = &self.slots else {
            return self.invoke_plain(payload).await;
        };

        let _permit = match self.gate.enter().await {
            Ok(permit) => permit,
            Err(e) => {
                log::error!("Output gate unavailable ({}), running {} uncaptured", e, self.name);
                return self.invoke_plain(payload).await;
            }
        };

        slots.reset();
        let sink = OutputSink::capturing(Arc::clone(slots), Arc::clone(&self.host));
        // Declared after the permit so it detaches first, even when this
        // future is dropped mid-callback.
        let attached = DetachOnDrop(sink.clone());
        let outcome = run_guarded(&self.name, self.callback.as_ref(), payload, sink).await;
        if let CallbackOutcome::Failed(trace) = &outcome {
            attached.0.emit(OutputValue::Text(trace.clone()));
        }
        drop(attached);
        outcome
    }

    async fn invoke_plain(&self, payload: EventPayload) -> CallbackOutcome {
        let sink = OutputSink::ambient(Arc::clone(&self.host));
        let outcome = run_guarded(&self.name, self.callback.as_ref(), payload, sink).await;
        if let CallbackOutcome::Failed(trace) = &outcome {
            self.host.write_ambient(trace);
        }
        outcome
    }
}

impl fmt::Debug for RedirectedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectedCallback")
            .field("name", &self.name)
            .field("redirecting", &self.is_redirecting())
            .finish()
    }
}

async fn run_guarded(
    name: &str,
    callback: &CallbackFn,
    payload: EventPayload,
    sink: OutputSink,
) -> CallbackOutcome {
    // The call itself happens inside the guarded future so a panic while
    // building the future is caught too.
    let call = async move { callback(payload, sink).await };
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => CallbackOutcome::Completed,
        Ok(Err(err)) => {
            log::warn!("Callback {} failed: {}", name, err);
            CallbackOutcome::Failed(render_error(name, &err))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            log::warn!("Callback {} panicked: {}", name, message);
            CallbackOutcome::Failed(format!("Error in callback `{}`: panicked: {}\n", name, message))
        }
    }
}

/// Error chain without any frames from the wrapper itself
fn render_error(name: &str, err: &anyhow::Error) -> String {
    let mut text = format!("Error in callback `{}`: {}\n", name, err);
    let causes: Vec<String> = err.chain().skip(1).map(|cause| cause.to_string()).collect();
    if !causes.is_empty() {
        text.push_str("\nCaused by:\n");
        for (i, cause) in causes.iter().enumerate() {
            text.push_str(&format!("    {}: {}\n", i, cause));
        }
    }
    text
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
