//! Terminal output
//!
//! A display host that prints slot updates as they happen, and printers for
//! dispatch reports and submission messages.

use anyhow::Result;
use keyward_bridge::output::DisplayHandle;
use keyward_bridge::{CallbackOutcome, DispatchReport, DisplayHost, OutputValue, UiElementMessage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Rich display on a terminal: every handle is a numbered slot line
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    next_slot: AtomicUsize,
}

struct ConsoleSlot {
    index: usize,
}

impl DisplayHandle for ConsoleSlot {
    fn update(&self, value: &OutputValue) {
        // Resets are silent on a terminal
        if !value.is_empty() {
            println!("  [slot {:>2}] {}", self.index, value.to_string().trim_end());
        }
    }
}

impl DisplayHost for ConsoleDisplay {
    fn create_handle(&self) -> Option<Arc<dyn DisplayHandle>> {
        let index = self.next_slot.fetch_add(1, Ordering::Relaxed);
        Some(Arc::new(ConsoleSlot { index }))
    }

    fn write_ambient(&self, text: &str) {
        println!("{}", text.trim_end());
    }
}

/// One line per callback, plus the failure trace if any
pub fn format_dispatch(report: &DispatchReport) -> String {
    let mut text = format!(
        "{} at {}: {} callback(s)\n",
        report.kind,
        report.started_at.format("%H:%M:%S%.3f"),
        report.outcomes.len()
    );
    for (name, outcome) in &report.outcomes {
        match outcome {
            CallbackOutcome::Completed => text.push_str(&format!("  ✓ {}\n", name)),
            CallbackOutcome::Failed(trace) => {
                text.push_str(&format!("  ✗ {}\n", name));
                for line in trace.lines() {
                    text.push_str(&format!("      {}\n", line));
                }
            }
        }
    }
    text
}

pub fn print_dispatch(report: &DispatchReport) {
    print!("{}", format_dispatch(report));
}

/// Submission message as JSON
pub fn format_message(message: &UiElementMessage, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(message)?
    } else {
        message.to_json()?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_bridge::{Action, EventKind};

    #[test]
    fn test_format_dispatch_lists_outcomes() {
        let report = DispatchReport {
            kind: EventKind::RecordsChanged,
            started_at: chrono::Utc::now(),
            outcomes: vec![
                ("summarize".to_string(), CallbackOutcome::Completed),
                (
                    "broken".to_string(),
                    CallbackOutcome::Failed("Error in callback `broken`: boom\n".to_string()),
                ),
            ],
        };

        let text = format_dispatch(&report);
        assert!(text.starts_with("records-changed at "));
        assert!(text.contains("2 callback(s)"));
        assert!(text.contains("  ✓ summarize\n"));
        assert!(text.contains("  ✗ broken\n      Error in callback `broken`: boom\n"));
    }

    #[test]
    fn test_format_message_compact() {
        let message = UiElementMessage::new(
            "grist",
            vec![Action::RemoveTable {
                table: "Old".to_string(),
            }],
        );
        assert_eq!(
            format_message(&message, false).unwrap(),
            r#"{"ui_element":"grist","model_id":null,"message":{"actions":[["RemoveTable","Old"]]}}"#
        );
    }

    #[test]
    fn test_console_slots_are_numbered() {
        let display = ConsoleDisplay::default();
        assert!(display.create_handle().is_some());
        assert!(display.create_handle().is_some());
        assert_eq!(display.next_slot.load(Ordering::Relaxed), 2);
    }
}
