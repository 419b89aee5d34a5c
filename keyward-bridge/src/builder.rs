//! Action builders
//!
//! Pure functions translating a table operation into the primitive actions
//! the host applies. They take an already-resolved table name and never
//! touch the queue; [`crate::ops::TableOps`] resolves the table and enqueues.
//!
//! Nothing here validates column types or table existence. Malformed input
//! is passed through and left for the host to reject.

use crate::action::{Action, ColumnData, ColumnInfo};
use crate::types::{record_id, Record, RowId, ID_COLUMN};
use serde_json::Value;

/// Field id used instead of `id`, which the host reserves for row ids
pub const ID_FIELD_SENTINEL: &str = "ID_field";

/// One `AddRecord` per record, in input order
pub fn add_records<I>(table: &str, records: I) -> Vec<Action>
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .map(|fields| Action::AddRecord {
            table: table.to_string(),
            fields,
        })
        .collect()
}

pub fn update_record(table: &str, row_id: RowId, fields: Record) -> Action {
    Action::UpdateRecord {
        table: table.to_string(),
        row_id,
        fields,
    }
}

/// Build updates from records carrying their own `id`
///
/// The `id` key is stripped from the forwarded fields. Entries without an
/// integer id are skipped.
pub fn update_records<I>(table: &str, updates: I) -> Vec<Action>
where
    I: IntoIterator<Item = Record>,
{
    updates
        .into_iter()
        .filter_map(|mut fields| {
            let Some(row_id) = record_id(&fields) else {
                log::debug!("Skipping update without a row id: {:?}", fields);
                return None;
            };
            fields.shift_remove(ID_COLUMN);
            Some(update_record(table, row_id, fields))
        })
        .collect()
}

/// One `RemoveRecord` per id, preserving input order
pub fn delete_records<I>(table: &str, row_ids: I) -> Vec<Action>
where
    I: IntoIterator<Item = RowId>,
{
    row_ids
        .into_iter()
        .map(|row_id| Action::RemoveRecord {
            table: table.to_string(),
            row_id,
        })
        .collect()
}

/// Field id the host should use for a column label
///
/// Any label equal to `id` (ignoring case and surrounding whitespace) maps
/// to [`ID_FIELD_SENTINEL`].
pub fn field_id_for_label(label: &str) -> String {
    if label.trim().eq_ignore_ascii_case(ID_COLUMN) {
        ID_FIELD_SENTINEL.to_string()
    } else {
        label.to_string()
    }
}

/// `AddTable` followed by one `AddVisibleColumn` per (label, type) entry
pub fn create_table<I, L, T>(table: &str, columns: I) -> Vec<Action>
where
    I: IntoIterator<Item = (L, T)>,
    L: Into<String>,
    T: Into<String>,
{
    let mut actions = vec![Action::AddTable {
        table: table.to_string(),
    }];

    for (label, col_type) in columns {
        let label = label.into();
        actions.push(Action::AddVisibleColumn {
            table: table.to_string(),
            col_id: field_id_for_label(&label),
            info: ColumnInfo::new(col_type, label),
        });
    }

    actions
}

pub fn remove_table(table: &str) -> Action {
    Action::RemoveTable {
        table: table.to_string(),
    }
}

/// `AddVisibleColumn` for a single column; the label defaults to the column id
pub fn add_column(table: &str, col_id: &str, col_type: &str, label: Option<&str>) -> Action {
    Action::AddVisibleColumn {
        table: table.to_string(),
        col_id: col_id.to_string(),
        info: ColumnInfo::new(col_type, label.unwrap_or(col_id)),
    }
}

pub fn remove_column(table: &str, col_id: &str) -> Action {
    Action::RemoveColumn {
        table: table.to_string(),
        col_id: col_id.to_string(),
    }
}

pub fn replace_table_data(table: &str, columns: ColumnData) -> Action {
    Action::ReplaceTableData {
        table: table.to_string(),
        columns,
    }
}

/// Single column-major `BulkAddRecord` covering every key of every record
///
/// Columns appear in first-seen order. A record lacking a column gets an
/// explicit `null` in that column. Returns `None` for an empty batch.
pub fn bulk_add_records(table: &str, records: &[Record]) -> Option<Action> {
    if records.is_empty() {
        return None;
    }

    let mut column_ids: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !column_ids.contains(&key.as_str()) {
                column_ids.push(key);
            }
        }
    }

    let columns = column_ids
        .into_iter()
        .map(|col_id| {
            let values = records
                .iter()
                .map(|record| record.get(col_id).cloned().unwrap_or(Value::Null))
                .collect();
            (col_id, values)
        })
        .collect();

    Some(Action::BulkAddRecord {
        table: table.to_string(),
        row_count: records.len(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionVerb;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_add_records_in_order() {
        let actions = add_records(
            "T",
            vec![record(json!({"n": 1})), record(json!({"n": 2})), record(json!({"n": 3}))],
        );
        assert_eq!(actions.len(), 3);
        for (i, action) in actions.iter().enumerate() {
            assert_eq!(
                action.to_value(),
                json!(["AddRecord", "T", null, {"n": i + 1}])
            );
        }
    }

    #[test]
    fn test_update_records_strips_and_skips() {
        let actions = update_records(
            "T",
            vec![
                record(json!({"id": 5, "Name": "x"})),
                record(json!({"Name": "no id"})),
                record(json!({"id": 2, "Age": 3})),
            ],
        );
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].to_value(), json!(["UpdateRecord", "T", 5, {"Name": "x"}]));
        assert_eq!(actions[1].to_value(), json!(["UpdateRecord", "T", 2, {"Age": 3}]));
    }

    #[test]
    fn test_delete_records_preserves_order() {
        let actions = delete_records("T", vec![3, 1, 2]);
        let ids: Vec<RowId> = actions.iter().filter_map(Action::row_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(actions.iter().all(|a| a.verb() == ActionVerb::RemoveRecord));
    }

    #[test]
    fn test_create_table_rewrites_id_column() {
        let actions = create_table("T", vec![("id", "Numeric"), ("Name", "Text")]);
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], Action::AddTable { table: "T".into() });
        assert_eq!(
            actions[1].to_value(),
            json!(["AddVisibleColumn", "T", "ID_field",
                   {"type": "Numeric", "label": "id", "widgetOptions": "", "formula": ""}])
        );
        assert_eq!(
            actions[2].to_value(),
            json!(["AddVisibleColumn", "T", "Name",
                   {"type": "Text", "label": "Name", "widgetOptions": "", "formula": ""}])
        );
    }

    #[test]
    fn test_field_id_for_label() {
        assert_eq!(field_id_for_label(" ID "), ID_FIELD_SENTINEL);
        assert_eq!(field_id_for_label("Id"), ID_FIELD_SENTINEL);
        assert_eq!(field_id_for_label("identity"), "identity");
    }

    #[test]
    fn test_add_column_label_defaults_to_id() {
        let action = add_column("T", "Score", "Numeric", None);
        assert_eq!(
            action.to_value(),
            json!(["AddVisibleColumn", "T", "Score",
                   {"type": "Numeric", "label": "Score", "widgetOptions": "", "formula": ""}])
        );
        let labelled = add_column("T", "Score", "Numeric", Some("Final score"));
        match labelled {
            Action::AddVisibleColumn { info, .. } => assert_eq!(info.label, "Final score"),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_bulk_add_fills_missing_with_null() {
        let records = vec![record(json!({"a": 1})), record(json!({"b": 2}))];
        let action = bulk_add_records("T", &records).unwrap();
        assert_eq!(
            action.to_value(),
            json!(["BulkAddRecord", "T", [null, null], {"a": [1, null], "b": [null, 2]}])
        );
    }

    #[test]
    fn test_bulk_add_empty_is_none() {
        assert!(bulk_add_records("T", &[]).is_none());
    }
}
