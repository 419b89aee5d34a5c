//! High-level notebook API
//!
//! [`KeywardApi`] bundles a table context, a pending-action queue, a data
//! accessor and the submission settings behind one handle. Mutating methods
//! queue actions and return them; nothing reaches the host until the apply
//! prompt is activated.

use crate::action::{Action, ColumnData};
use crate::config::BridgeConfig;
use crate::context::TableContext;
use crate::host::{DataAccessor, JsonFileAccessor};
use crate::ops::TableOps;
use crate::queue::ActionQueue;
use crate::snapshot::{Query, TableSnapshot};
use crate::submit::ApplyPrompt;
use crate::types::{column_type, Record, Result, RowId};
use serde_json::Value;
use std::sync::Arc;

/// Column type for a set of sample values
///
/// Nulls are ignored. All booleans give `Bool`, all numbers give `Numeric`,
/// anything else (or no values at all) gives `Text`.
pub fn infer_column_type<'a, I>(values: I) -> &'static str
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut inferred: Option<&'static str> = None;
    for value in values {
        let current = match value {
            Value::Null => continue,
            Value::Bool(_) => column_type::BOOL,
            Value::Number(_) => column_type::NUMERIC,
            _ => return column_type::TEXT,
        };
        match inferred {
            Some(previous) if previous != current => return column_type::TEXT,
            _ => inferred = Some(current),
        }
    }
    inferred.unwrap_or(column_type::TEXT)
}

/// Notebook-facing handle over the bridge
#[derive(Clone)]
pub struct KeywardApi {
    ops: TableOps,
    accessor: Arc<dyn DataAccessor>,
    ui_element: String,
    clear_after_apply: bool,
}

impl KeywardApi {
    /// Create an API with its own table context and queue
    pub fn new(config: &BridgeConfig, accessor: Arc<dyn DataAccessor>) -> Self {
        let context = Arc::new(TableContext::new(config.default_table.clone()));
        let ops = TableOps::new(context, Arc::new(ActionQueue::new()));
        Self::with_ops(ops, accessor, config)
    }

    /// Create an API reading table data from `config.data_path`
    pub fn from_config(config: &BridgeConfig) -> Self {
        let accessor = Arc::new(JsonFileAccessor::new(config.data_path.clone()));
        Self::new(config, accessor)
    }

    /// Create an API sharing an existing context and queue
    pub fn with_ops(ops: TableOps, accessor: Arc<dyn DataAccessor>, config: &BridgeConfig) -> Self {
        Self {
            ops,
            accessor,
            ui_element: config.ui_element.clone(),
            clear_after_apply: config.clear_after_apply,
        }
    }

    pub fn ops(&self) -> &TableOps {
        &self.ops
    }

    pub fn table_name(&self) -> String {
        self.ops.context().table_name()
    }

    pub fn set_table_name(&self, name: impl Into<String>) {
        self.ops.context().set_table_name(name);
    }

    /// Current contents of the selected table
    pub async fn get_table(&self) -> Result<TableSnapshot> {
        self.accessor.fetch_selected_table().await
    }

    /// Rows of the selected table matching `query`
    pub async fn query(&self, query: &Query) -> Result<TableSnapshot> {
        Ok(self.get_table().await?.query(query))
    }

    pub fn add_record(&self, record: Record, table: Option<&str>) -> Action {
        self.ops.add_record(record, table)
    }

    pub fn add_records(&self, records: Vec<Record>, table: Option<&str>) -> Vec<Action> {
        self.ops.add_records(records, table)
    }

    pub fn bulk_add_records(&self, records: &[Record], table: Option<&str>) -> Option<Action> {
        self.ops.bulk_add_records(records, table)
    }

    pub fn update_record(&self, row_id: RowId, updates: Record, table: Option<&str>) -> Action {
        self.ops.update_record(row_id, updates, table)
    }

    pub fn update_records(&self, updates: Vec<Record>, table: Option<&str>) -> Vec<Action> {
        self.ops.update_records(updates, table)
    }

    pub fn delete_record(&self, row_id: RowId, table: Option<&str>) -> Action {
        self.ops.delete_record(row_id, table)
    }

    pub fn delete_records(&self, row_ids: Vec<RowId>, table: Option<&str>) -> Vec<Action> {
        self.ops.delete_records(row_ids, table)
    }

    pub fn create_table<I, L, T>(&self, table: &str, columns: I) -> Vec<Action>
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.ops.create_table(table, columns)
    }

    pub fn remove_table(&self, table: &str) -> Action {
        self.ops.remove_table(table)
    }

    pub fn add_column(
        &self,
        col_id: &str,
        col_type: Option<&str>,
        label: Option<&str>,
        table: Option<&str>,
    ) -> Action {
        self.ops.add_column(col_id, col_type, label, table)
    }

    pub fn remove_column(&self, col_id: &str, table: Option<&str>) -> Action {
        self.ops.remove_column(col_id, table)
    }

    pub fn replace_table_data(&self, data: ColumnData, table: Option<&str>) -> Action {
        self.ops.replace_table_data(data, table)
    }

    /// Create `table` with columns inferred from `records`, then add them
    pub fn create_from_records(&self, table: &str, records: &[Record]) -> Vec<Action> {
        let mut column_ids: Vec<&str> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !column_ids.contains(&key.as_str()) {
                    column_ids.push(key);
                }
            }
        }

        let columns: Vec<(String, &'static str)> = column_ids
            .iter()
            .map(|col_id| {
                let values = records.iter().filter_map(|record| record.get(*col_id));
                (col_id.to_string(), infer_column_type(values))
            })
            .collect();
        log::debug!("Inferred {} column(s) for {}", columns.len(), table);

        let mut actions = self.ops.create_table(table, columns);
        if !records.is_empty() {
            actions.extend(self.ops.add_records(records.iter().cloned(), Some(table)));
        }
        actions
    }

    pub fn pending_actions(&self) -> Vec<Action> {
        self.ops.queue().snapshot()
    }

    pub fn clear_pending_actions(&self) {
        self.ops.queue().clear();
    }

    /// Prompt for submitting everything queued so far
    pub fn apply_button(&self) -> ApplyPrompt {
        ApplyPrompt::build(self.ops.queue(), &self.ui_element, self.clear_after_apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionVerb;
    use crate::host::MemoryAccessor;
    use crate::submit::MemoryTransport;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn api() -> KeywardApi {
        let table = TableSnapshot::from_json(
            r#"[{"id": 1, "Name": "Ada", "Age": 36}, {"id": 2, "Name": "Brian", "Age": 41}]"#,
        )
        .unwrap();
        KeywardApi::new(
            &BridgeConfig::new().with_default_table("People"),
            Arc::new(MemoryAccessor::new(table)),
        )
    }

    #[test]
    fn test_infer_column_type() {
        assert_eq!(infer_column_type(&[json!(1), json!(2.5)]), "Numeric");
        assert_eq!(infer_column_type(&[json!(true), Value::Null]), "Bool");
        assert_eq!(infer_column_type(&[json!(1), json!("x")]), "Text");
        assert_eq!(infer_column_type(&[json!(1), json!(false)]), "Text");
        assert_eq!(infer_column_type(&[Value::Null]), "Text");
    }

    #[test]
    fn test_table_name_defaults_from_config() {
        let api = api();
        assert_eq!(api.table_name(), "People");
        api.add_record(record(json!({"Name": "Cleo"})), None);
        api.set_table_name("Teams");
        api.delete_record(4, None);

        let tables: Vec<String> = api.pending_actions().iter().map(|a| a.table().to_string()).collect();
        assert_eq!(tables, vec!["People", "Teams"]);
    }

    #[test]
    fn test_create_from_records() {
        let api = api();
        let records = vec![
            record(json!({"Name": "Ada", "Score": 9.5})),
            record(json!({"Name": "Brian", "Active": true})),
        ];

        let actions = api.create_from_records("Scores", &records);
        let verbs: Vec<ActionVerb> = actions.iter().map(Action::verb).collect();
        assert_eq!(
            verbs,
            vec![
                ActionVerb::AddTable,
                ActionVerb::AddVisibleColumn,
                ActionVerb::AddVisibleColumn,
                ActionVerb::AddVisibleColumn,
                ActionVerb::AddRecord,
                ActionVerb::AddRecord,
            ]
        );
        assert_eq!(
            actions[2].to_value(),
            json!(["AddVisibleColumn", "Scores", "Score", {
                "type": "Numeric", "label": "Score", "widgetOptions": "", "formula": ""
            }])
        );
        assert_eq!(actions[3].to_value()[3]["type"], "Bool");
        assert_eq!(api.pending_actions().len(), 6);
    }

    #[tokio::test]
    async fn test_query_uses_accessor() {
        let api = api();
        let result = api
            .query(&Query::new().filter("Name", "Brian").columns(["Age"]))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows()[0], record(json!({"id": 2, "Age": 41})));
    }

    #[test]
    fn test_apply_button_clears_queue() {
        let api = api();
        assert_eq!(api.apply_button(), ApplyPrompt::NoPending);

        api.remove_table("Old");
        api.remove_column("Tmp", None);
        let prompt = api.apply_button();
        assert_eq!(prompt.label(), "Apply 2 action(s) to Grist");
        assert!(api.pending_actions().is_empty());

        let transport = MemoryTransport::new();
        prompt.button().unwrap().activate(&transport).unwrap();
        assert_eq!(transport.sent()[0]["ui_element"], "grist");
    }

    #[test]
    fn test_clear_pending_actions() {
        let api = api();
        api.delete_records(vec![1, 2], None);
        api.clear_pending_actions();
        assert!(api.pending_actions().is_empty());
    }
}
