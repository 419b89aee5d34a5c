//! Table operations
//!
//! [`TableOps`] is the entry point user code calls to mutate tables: each
//! method resolves the target table once (explicit name, else the active
//! table context), builds the actions and appends them to the shared queue.
//! [`Operation`] is the serializable form of the same calls, used to replay
//! batches from JSON.

use crate::action::{Action, ColumnData};
use crate::builder;
use crate::context::TableContext;
use crate::queue::ActionQueue;
use crate::types::{column_type, Record, RowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Builds actions against a table context and enqueues them
#[derive(Debug, Clone)]
pub struct TableOps {
    context: Arc<TableContext>,
    queue: Arc<ActionQueue>,
}

impl TableOps {
    pub fn new(context: Arc<TableContext>, queue: Arc<ActionQueue>) -> Self {
        Self { context, queue }
    }

    pub fn context(&self) -> &Arc<TableContext> {
        &self.context
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    fn push_all(&self, actions: &[Action]) {
        self.queue.extend(actions.iter().cloned());
    }

    fn push(&self, action: &Action) {
        self.queue.enqueue(action.clone());
    }

    pub fn add_record(&self, record: Record, table: Option<&str>) -> Action {
        let table = self.context.resolve(table);
        let action = Action::AddRecord { table, fields: record };
        self.push(&action);
        action
    }

    pub fn add_records<I>(&self, records: I, table: Option<&str>) -> Vec<Action>
    where
        I: IntoIterator<Item = Record>,
    {
        let table = self.context.resolve(table);
        let actions = builder::add_records(&table, records);
        self.push_all(&actions);
        actions
    }

    pub fn update_record(&self, row_id: RowId, updates: Record, table: Option<&str>) -> Action {
        let table = self.context.resolve(table);
        let action = builder::update_record(&table, row_id, updates);
        self.push(&action);
        action
    }

    /// Updates keyed by each record's own `id`; records without one are skipped
    pub fn update_records<I>(&self, updates: I, table: Option<&str>) -> Vec<Action>
    where
        I: IntoIterator<Item = Record>,
    {
        let table = self.context.resolve(table);
        let actions = builder::update_records(&table, updates);
        self.push_all(&actions);
        actions
    }

    pub fn delete_record(&self, row_id: RowId, table: Option<&str>) -> Action {
        let table = self.context.resolve(table);
        let action = Action::RemoveRecord { table, row_id };
        self.push(&action);
        action
    }

    pub fn delete_records<I>(&self, row_ids: I, table: Option<&str>) -> Vec<Action>
    where
        I: IntoIterator<Item = RowId>,
    {
        let table = self.context.resolve(table);
        let actions = builder::delete_records(&table, row_ids);
        self.push_all(&actions);
        actions
    }

    /// Table creation always names its table explicitly
    pub fn create_table<I, L, T>(&self, table: &str, columns: I) -> Vec<Action>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let actions = builder::create_table(table, columns);
        self.push_all(&actions);
        actions
    }

    pub fn remove_table(&self, table: &str) -> Action {
        let action = builder::remove_table(table);
        self.push(&action);
        action
    }

    pub fn add_column(
        &self,
        col_id: &str,
        col_type: Option<&str>,
        label: Option<&str>,
        table: Option<&str>,
    ) -> Action {
        let table = self.context.resolve(table);
        let col_type = col_type.unwrap_or(column_type::TEXT);
        let action = builder::add_column(&table, col_id, col_type, label);
        self.push(&action);
        action
    }

    pub fn remove_column(&self, col_id: &str, table: Option<&str>) -> Action {
        let table = self.context.resolve(table);
        let action = builder::remove_column(&table, col_id);
        self.push(&action);
        action
    }

    pub fn replace_table_data(&self, data: ColumnData, table: Option<&str>) -> Action {
        let table = self.context.resolve(table);
        let action = builder::replace_table_data(&table, data);
        self.push(&action);
        action
    }

    /// `None` (and nothing queued) when `records` is empty
    pub fn bulk_add_records(&self, records: &[Record], table: Option<&str>) -> Option<Action> {
        let table = self.context.resolve(table);
        let action = builder::bulk_add_records(&table, records)?;
        self.push(&action);
        Some(action)
    }
}

/// Either a single value or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn default_column_type() -> String {
    column_type::TEXT.to_string()
}

/// A table operation in serializable form
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Change the active table for the operations that follow
    SetTable { table: String },
    AddRecords {
        records: OneOrMany<Record>,
        #[serde(default)]
        table: Option<String>,
    },
    UpdateRecord {
        row_id: RowId,
        updates: Record,
        #[serde(default)]
        table: Option<String>,
    },
    UpdateRecords {
        updates: Vec<Record>,
        #[serde(default)]
        table: Option<String>,
    },
    DeleteRecords {
        row_ids: OneOrMany<RowId>,
        #[serde(default)]
        table: Option<String>,
    },
    CreateTable {
        table: String,
        /// label -> column type, in column order
        columns: Map<String, Value>,
    },
    RemoveTable { table: String },
    AddColumn {
        col_id: String,
        #[serde(default = "default_column_type")]
        col_type: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        table: Option<String>,
    },
    RemoveColumn {
        col_id: String,
        #[serde(default)]
        table: Option<String>,
    },
    ReplaceTableData {
        data: ColumnData,
        #[serde(default)]
        table: Option<String>,
    },
    BulkAddRecords {
        records: Vec<Record>,
        #[serde(default)]
        table: Option<String>,
    },
}

impl Operation {
    /// Run the operation, returning the actions it queued
    pub fn apply(self, ops: &TableOps) -> Vec<Action> {
        match self {
            Operation::SetTable { table } => {
                ops.context().set_table_name(table);
                Vec::new()
            }
            Operation::AddRecords { records, table } => {
                ops.add_records(records.into_vec(), table.as_deref())
            }
            Operation::UpdateRecord { row_id, updates, table } => {
                vec![ops.update_record(row_id, updates, table.as_deref())]
            }
            Operation::UpdateRecords { updates, table } => {
                ops.update_records(updates, table.as_deref())
            }
            Operation::DeleteRecords { row_ids, table } => {
                ops.delete_records(row_ids.into_vec(), table.as_deref())
            }
            Operation::CreateTable { table, columns } => {
                let columns = columns.into_iter().map(|(label, col_type)| {
                    let col_type = match col_type {
                        Value::String(name) => name,
                        other => other.to_string(),
                    };
                    (label, col_type)
                });
                ops.create_table(&table, columns)
            }
            Operation::RemoveTable { table } => vec![ops.remove_table(&table)],
            Operation::AddColumn { col_id, col_type, label, table } => vec![ops.add_column(
                &col_id,
                Some(&col_type),
                label.as_deref(),
                table.as_deref(),
            )],
            Operation::RemoveColumn { col_id, table } => {
                vec![ops.remove_column(&col_id, table.as_deref())]
            }
            Operation::ReplaceTableData { data, table } => {
                vec![ops.replace_table_data(data, table.as_deref())]
            }
            Operation::BulkAddRecords { records, table } => ops
                .bulk_add_records(&records, table.as_deref())
                .into_iter()
                .collect(),
        }
    }
}

/// Parse a JSON list of operations
pub fn parse_operations(json: &str) -> crate::types::Result<Vec<Operation>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionVerb;
    use serde_json::json;

    fn ops() -> TableOps {
        TableOps::new(Arc::new(TableContext::default()), Arc::new(ActionQueue::new()))
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_add_records_queue_order() {
        let ops = ops();
        ops.add_records(vec![record(json!({"n": 1})), record(json!({"n": 2}))], None);
        ops.add_record(record(json!({"n": 3})), None);

        let queued = ops.queue().snapshot();
        assert_eq!(queued.len(), 3);
        for (i, action) in queued.iter().enumerate() {
            assert_eq!(action.to_value(), json!(["AddRecord", "Table1", null, {"n": i + 1}]));
        }
    }

    #[test]
    fn test_context_read_live_per_call() {
        let ops = ops();
        ops.delete_record(1, None);
        ops.context().set_table_name("Other");
        let actions = ops.delete_records(vec![2, 3], None);

        assert!(actions.iter().all(|a| a.table() == "Other"));
        let tables: Vec<String> = ops
            .queue()
            .snapshot()
            .iter()
            .map(|a| a.table().to_string())
            .collect();
        assert_eq!(tables, vec!["Table1", "Other", "Other"]);
    }

    #[test]
    fn test_explicit_table_override() {
        let ops = ops();
        let action = ops.remove_column("Notes", Some("People"));
        assert_eq!(action.to_value(), json!(["RemoveColumn", "People", "Notes"]));
    }

    #[test]
    fn test_add_column_defaults_to_text() {
        let ops = ops();
        let action = ops.add_column("Notes", None, None, None);
        assert_eq!(
            action.to_value(),
            json!(["AddVisibleColumn", "Table1", "Notes",
                   {"type": "Text", "label": "Notes", "widgetOptions": "", "formula": ""}])
        );
    }

    #[test]
    fn test_empty_bulk_add_queues_nothing() {
        let ops = ops();
        assert!(ops.bulk_add_records(&[], None).is_none());
        assert!(ops.queue().is_empty());
    }

    #[test]
    fn test_replay_operations() {
        let ops = ops();
        let batch = parse_operations(
            r#"[
                {"op": "create_table", "table": "People", "columns": {"id": "Numeric", "Name": "Text"}},
                {"op": "set_table", "table": "People"},
                {"op": "add_records", "records": {"Name": "Ada"}},
                {"op": "delete_records", "row_ids": [3, 1, 2]},
                {"op": "add_column", "col_id": "Age", "col_type": "Numeric"},
                {"op": "replace_table_data", "data": {"Name": ["x", "y"]}},
                {"op": "bulk_add_records", "records": []}
            ]"#,
        )
        .unwrap();

        for operation in batch {
            operation.apply(&ops);
        }

        let verbs: Vec<ActionVerb> = ops.queue().snapshot().iter().map(Action::verb).collect();
        assert_eq!(
            verbs,
            vec![
                ActionVerb::AddTable,
                ActionVerb::AddVisibleColumn,
                ActionVerb::AddVisibleColumn,
                ActionVerb::AddRecord,
                ActionVerb::RemoveRecord,
                ActionVerb::RemoveRecord,
                ActionVerb::RemoveRecord,
                ActionVerb::AddVisibleColumn,
                ActionVerb::ReplaceTableData,
            ]
        );
        assert!(ops.queue().snapshot()[3..].iter().all(|a| a.table() == "People"));
    }
}
