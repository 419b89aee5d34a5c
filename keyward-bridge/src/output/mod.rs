//! Callback output capture
//!
//! This module contains the notebook display surface, the fixed slot pool
//! each callback writes into, and the redirection wrapper that binds a
//! callback to its slots.

pub mod display;
pub mod redirect;
pub mod slots;

// Re-export key types for convenience
pub use display::{DisplayHandle, DisplayHost, MemoryDisplay, OutputValue, StdoutDisplay};
pub use redirect::{
    boxed_callback, CallbackFn, CallbackFuture, CallbackOutcome, OutputSink, RedirectGate,
    RedirectedCallback,
};
pub use slots::{SlotPool, DEFAULT_SLOT_COUNT, TOO_MANY_OUTPUTS};
