//! Fixed pool of output slots
//!
//! A wrapped callback owns one pool of pre-allocated display handles. Each
//! captured output takes the next slot. The last slot is reserved: once
//! reached, it shows [`TOO_MANY_OUTPUTS`] and further output is dropped.

use super::display::{DisplayHandle, DisplayHost, OutputValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// Default number of slots allocated per wrapped callback
pub const DEFAULT_SLOT_COUNT: usize = 45;

/// Marker written to the last slot on exhaustion
pub const TOO_MANY_OUTPUTS: &str = "Too many display calls!";

pub struct SlotPool {
    handles: Vec<Arc<dyn DisplayHandle>>,
    cursor: Mutex<usize>,
}

impl SlotPool {
    /// Allocate `count` handles from `host`
    ///
    /// Returns `None` when the host has no rich display.
    pub fn allocate(host: &dyn DisplayHost, count: usize) -> Option<Self> {
        let handles = (0..count.max(1))
            .map(|_| host.create_handle())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            handles,
            cursor: Mutex::new(0),
        })
    }

    /// Clear every slot and rewind the cursor
    pub fn reset(&self) {
        let mut cursor = self.cursor.lock();
        for handle in &self.handles {
            handle.update(&OutputValue::Empty);
        }
        *cursor = 0;
    }

    /// Write `value` into the next free slot
    ///
    /// Returns `false` when the pool is exhausted and the marker was shown
    /// instead.
    pub fn emit(&self, value: &OutputValue) -> bool {
        let mut cursor = self.cursor.lock();
        let last = self.handles.len() - 1;
        if *cursor == last {
            log::trace!("Output slots exhausted");
            self.handles[last].update(&OutputValue::from(TOO_MANY_OUTPUTS));
            return false;
        }
        self.handles[*cursor].update(value);
        *cursor += 1;
        true
    }

    pub fn capacity(&self) -> usize {
        self.handles.len()
    }

    /// Slots filled since the last reset
    pub fn used(&self) -> usize {
        *self.cursor.lock()
    }
}
