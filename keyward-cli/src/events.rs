//! Host events simulated from the command line

use anyhow::{Context, Result};
use keyward_bridge::{CallbackRegistry, DispatchReport, HostEvent, Record, RowId};
use serde_json::Value;

/// Events to fire for one run: a table change, then an optional cursor move
pub fn planned_events(record: Option<RowId>) -> Vec<HostEvent> {
    let mut events = vec![HostEvent::RecordsChanged];
    if let Some(row_id) = record {
        let mut reference = Record::new();
        reference.insert("id".to_string(), Value::from(row_id));
        events.push(HostEvent::RecordChanged(Some(reference)));
    }
    events
}

/// Dispatch each event in turn and collect the reports
pub async fn run_events(
    registry: &CallbackRegistry,
    events: Vec<HostEvent>,
) -> Result<Vec<DispatchReport>> {
    let mut reports = Vec::with_capacity(events.len());
    for event in events {
        let kind = event.kind();
        log::info!("Firing {}", kind);
        let report = registry
            .dispatch(event)
            .await
            .with_context(|| format!("Failed to dispatch {}", kind))?;
        reports.push(report);
    }
    Ok(reports)
}
