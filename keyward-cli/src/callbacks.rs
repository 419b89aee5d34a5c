//! Built-in callbacks
//!
//! The CLI registers these against the data file so a single run shows what
//! a notebook would: a table summary on every change, the selected record
//! on cursor moves, and optionally a batch of operations replayed on change.

use anyhow::Result;
use keyward_bridge::{
    CallbackRegistry, EventKind, EventPayload, KeywardApi, Operation, OutputSink,
};

/// Row count and column list of the changed table
pub async fn summarize_table(payload: EventPayload, out: OutputSink) -> anyhow::Result<()> {
    let Some(table) = payload.as_table() else {
        anyhow::bail!("expected a table payload");
    };
    out.print(format!("{} row(s)", table.len()));
    let columns = table.columns();
    if !columns.is_empty() {
        out.print(format!("Columns: {}", columns.join(", ")));
    }
    Ok(())
}

/// The record under the cursor
pub async fn show_record(payload: EventPayload, out: OutputSink) -> anyhow::Result<()> {
    let Some(record) = payload.as_record() else {
        anyhow::bail!("expected a record payload");
    };
    out.emit(serde_json::Value::Object(record.clone()));
    Ok(())
}

/// Register the built-in callbacks; `replay` operations run on every table change
pub async fn register_builtin(
    registry: &CallbackRegistry,
    api: &KeywardApi,
    replay: Vec<Operation>,
) -> Result<()> {
    registry
        .register_fn(EventKind::RecordsChanged, summarize_table)
        .await?;
    registry
        .register_fn(EventKind::RecordChanged, show_record)
        .await?;

    if !replay.is_empty() {
        let ops = api.ops().clone();
        registry
            .on_records("replay_operations", move |_payload, out| {
                let ops = ops.clone();
                let replay = replay.clone();
                async move {
                    let queued: usize = replay
                        .into_iter()
                        .map(|operation| operation.apply(&ops).len())
                        .sum();
                    out.print(format!("Queued {} action(s)", queued));
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
    }

    log::debug!(
        "Built-in callbacks: {:?}",
        registry.names(EventKind::RecordsChanged)
    );
    Ok(())
}
