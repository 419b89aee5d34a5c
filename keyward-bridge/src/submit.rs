//! Submitting queued actions to the host
//!
//! Actions reach the host as one UI element message:
//!
//! ```json
//! {"ui_element": "grist", "model_id": null, "message": {"actions": [...]}}
//! ```
//!
//! [`ApplyPrompt`] is what the notebook shows for the current queue: a plain
//! "No pending actions" text, or an apply button that sends the batch when
//! activated.

use crate::action::Action;
use crate::queue::ActionQueue;
use crate::types::Result;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Text shown instead of a button when the queue is empty
pub const NO_PENDING_ACTIONS: &str = "No pending actions";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEnvelope {
    pub actions: Vec<Action>,
}

/// Message addressed to a host UI element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiElementMessage {
    pub ui_element: String,
    pub model_id: Option<String>,
    pub message: ActionEnvelope,
}

impl UiElementMessage {
    pub fn new(ui_element: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            ui_element: ui_element.into(),
            model_id: None,
            message: ActionEnvelope { actions },
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.message.actions
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Channel carrying messages to the host
pub trait MessageTransport: Send + Sync {
    fn send(&self, message: &UiElementMessage) -> Result<()>;
}

/// Writes each message to stdout as one JSON line
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutTransport;

impl MessageTransport for StdoutTransport {
    fn send(&self, message: &UiElementMessage) -> Result<()> {
        println!("{}", message.to_json()?);
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<Value>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent so far, as JSON
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }
}

impl MessageTransport for MemoryTransport {
    fn send(&self, message: &UiElementMessage) -> Result<()> {
        self.sent.lock().push(serde_json::to_value(message)?);
        Ok(())
    }
}

/// Send `actions` as one batch without touching the queue
///
/// Returns `false` and sends nothing when `actions` is empty.
pub fn send_actions(
    transport: &dyn MessageTransport,
    ui_element: &str,
    actions: Vec<Action>,
) -> Result<bool> {
    if actions.is_empty() {
        log::debug!("No actions to send");
        return Ok(false);
    }
    let count = actions.len();
    transport.send(&UiElementMessage::new(ui_element, actions))?;
    log::info!("Sent {} action(s) to {}", count, ui_element);
    Ok(true)
}

/// Button that submits a fixed batch of actions
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyButton {
    message: UiElementMessage,
}

impl ApplyButton {
    pub fn label(&self) -> String {
        format!("Apply {} action(s) to Grist", self.action_count())
    }

    pub fn action_count(&self) -> usize {
        self.message.actions().len()
    }

    pub fn message(&self) -> &UiElementMessage {
        &self.message
    }

    /// Send the batch; every activation resends the same batch
    pub fn activate(&self, transport: &dyn MessageTransport) -> Result<()> {
        transport.send(&self.message)?;
        log::info!(
            "Applied {} action(s) via {}",
            self.action_count(),
            self.message.ui_element
        );
        Ok(())
    }
}

/// What the notebook shows for the pending queue
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyPrompt {
    NoPending,
    Button(ApplyButton),
}

impl ApplyPrompt {
    /// Capture the queue into a prompt
    ///
    /// With `clear_after` the queue is emptied now, so later operations go
    /// into the next batch; otherwise the queue is left as is.
    pub fn build(queue: &ActionQueue, ui_element: &str, clear_after: bool) -> Self {
        let actions = if clear_after {
            queue.flush_and_clear()
        } else {
            queue.snapshot()
        };
        if actions.is_empty() {
            return ApplyPrompt::NoPending;
        }
        ApplyPrompt::Button(ApplyButton {
            message: UiElementMessage::new(ui_element, actions),
        })
    }

    pub fn label(&self) -> String {
        match self {
            ApplyPrompt::NoPending => NO_PENDING_ACTIONS.to_string(),
            ApplyPrompt::Button(button) => button.label(),
        }
    }

    pub fn button(&self) -> Option<&ApplyButton> {
        match self {
            ApplyPrompt::NoPending => None,
            ApplyPrompt::Button(button) => Some(button),
        }
    }
}

impl fmt::Display for ApplyPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
