//! Primitive mutation actions
//!
//! An [`Action`] is one discrete instruction for the spreadsheet host. The
//! host consumes actions as plain ordered JSON arrays (`[verb, table, ...]`),
//! so every variant serializes to an array whose shape is fixed by its verb.
//! Keeping the shapes in one enum means a verb can never be paired with the
//! wrong row selector or payload.

use crate::types::{Record, RowId};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Action verbs understood by the host's action-application engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionVerb {
    AddRecord,
    UpdateRecord,
    RemoveRecord,
    BulkAddRecord,
    AddTable,
    RemoveTable,
    AddVisibleColumn,
    RemoveColumn,
    ReplaceTableData,
}

impl ActionVerb {
    /// Wire name of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionVerb::AddRecord => "AddRecord",
            ActionVerb::UpdateRecord => "UpdateRecord",
            ActionVerb::RemoveRecord => "RemoveRecord",
            ActionVerb::BulkAddRecord => "BulkAddRecord",
            ActionVerb::AddTable => "AddTable",
            ActionVerb::RemoveTable => "RemoveTable",
            ActionVerb::AddVisibleColumn => "AddVisibleColumn",
            ActionVerb::RemoveColumn => "RemoveColumn",
            ActionVerb::ReplaceTableData => "ReplaceTableData",
        }
    }
}

impl fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column definition carried by `AddVisibleColumn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Host column type (e.g. "Text", "Numeric")
    #[serde(rename = "type")]
    pub col_type: String,
    /// Human readable column label
    pub label: String,
    #[serde(default)]
    pub widget_options: String,
    #[serde(default)]
    pub formula: String,
}

impl ColumnInfo {
    pub fn new(col_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            col_type: col_type.into(),
            label: label.into(),
            widget_options: String::new(),
            formula: String::new(),
        }
    }
}

/// Column-major table data: column id -> values, in column order
///
/// Used by `BulkAddRecord` and `ReplaceTableData`. Column order is kept as
/// inserted so the emitted payload is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ColumnData {
    columns: Vec<(String, Vec<Value>)>,
}

impl ColumnData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, replacing any existing column with the same id
    pub fn insert(&mut self, col_id: impl Into<String>, values: Vec<Value>) {
        let col_id = col_id.into();
        match self.columns.iter_mut().find(|(id, _)| *id == col_id) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((col_id, values)),
        }
    }

    pub fn get(&self, col_id: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(id, _)| id == col_id)
            .map(|(_, values)| values.as_slice())
    }

    /// Column ids in order
    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Map<String, Value>> for ColumnData {
    fn from(map: Map<String, Value>) -> Self {
        let columns = map
            .into_iter()
            .map(|(col_id, value)| match value {
                Value::Array(values) => (col_id, values),
                other => (col_id, vec![other]),
            })
            .collect();
        Self { columns }
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Value>)> for ColumnData {
    fn from_iter<T: IntoIterator<Item = (K, Vec<Value>)>>(iter: T) -> Self {
        let mut data = ColumnData::new();
        for (col_id, values) in iter {
            data.insert(col_id, values);
        }
        data
    }
}

impl Serialize for ColumnData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (col_id, values) in &self.columns {
            map.serialize_entry(col_id, values)?;
        }
        map.end()
    }
}

/// A single primitive mutation for the spreadsheet host
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `["AddRecord", table, null, fields]`
    AddRecord { table: String, fields: Record },
    /// `["UpdateRecord", table, row_id, fields]`
    UpdateRecord {
        table: String,
        row_id: RowId,
        fields: Record,
    },
    /// `["RemoveRecord", table, row_id]`
    RemoveRecord { table: String, row_id: RowId },
    /// `["BulkAddRecord", table, [null; row_count], columns]`
    BulkAddRecord {
        table: String,
        row_count: usize,
        columns: ColumnData,
    },
    /// `["AddTable", table, []]`
    AddTable { table: String },
    /// `["RemoveTable", table]`
    RemoveTable { table: String },
    /// `["AddVisibleColumn", table, col_id, info]`
    AddVisibleColumn {
        table: String,
        col_id: String,
        info: ColumnInfo,
    },
    /// `["RemoveColumn", table, col_id]`
    RemoveColumn { table: String, col_id: String },
    /// `["ReplaceTableData", table, [], columns]`
    ReplaceTableData { table: String, columns: ColumnData },
}

impl Action {
    pub fn verb(&self) -> ActionVerb {
        match self {
            Action::AddRecord { .. } => ActionVerb::AddRecord,
            Action::UpdateRecord { .. } => ActionVerb::UpdateRecord,
            Action::RemoveRecord { .. } => ActionVerb::RemoveRecord,
            Action::BulkAddRecord { .. } => ActionVerb::BulkAddRecord,
            Action::AddTable { .. } => ActionVerb::AddTable,
            Action::RemoveTable { .. } => ActionVerb::RemoveTable,
            Action::AddVisibleColumn { .. } => ActionVerb::AddVisibleColumn,
            Action::RemoveColumn { .. } => ActionVerb::RemoveColumn,
            Action::ReplaceTableData { .. } => ActionVerb::ReplaceTableData,
        }
    }

    /// Table the action targets
    pub fn table(&self) -> &str {
        match self {
            Action::AddRecord { table, .. }
            | Action::UpdateRecord { table, .. }
            | Action::RemoveRecord { table, .. }
            | Action::BulkAddRecord { table, .. }
            | Action::AddTable { table }
            | Action::RemoveTable { table }
            | Action::AddVisibleColumn { table, .. }
            | Action::RemoveColumn { table, .. }
            | Action::ReplaceTableData { table, .. } => table,
        }
    }

    /// Row id addressed by single-row actions
    pub fn row_id(&self) -> Option<RowId> {
        match self {
            Action::UpdateRecord { row_id, .. } | Action::RemoveRecord { row_id, .. } => {
                Some(*row_id)
            }
            _ => None,
        }
    }

    /// Convert to the host's array form
    pub fn to_value(&self) -> Value {
        // Serializing our own types into a Value cannot fail: all keys are strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let verb = self.verb().as_str();
        match self {
            Action::AddRecord { table, fields } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(&Value::Null)?;
                seq.serialize_element(fields)?;
                seq.end()
            }
            Action::UpdateRecord { table, row_id, fields } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(row_id)?;
                seq.serialize_element(fields)?;
                seq.end()
            }
            Action::RemoveRecord { table, row_id } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(row_id)?;
                seq.end()
            }
            Action::BulkAddRecord { table, row_count, columns } => {
                let row_ids: Vec<Option<RowId>> = vec![None; *row_count];
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(&row_ids)?;
                seq.serialize_element(columns)?;
                seq.end()
            }
            Action::AddTable { table } => {
                let no_columns: [Value; 0] = [];
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(&no_columns)?;
                seq.end()
            }
            Action::RemoveTable { table } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.end()
            }
            Action::AddVisibleColumn { table, col_id, info } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(col_id)?;
                seq.serialize_element(info)?;
                seq.end()
            }
            Action::RemoveColumn { table, col_id } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(col_id)?;
                seq.end()
            }
            Action::ReplaceTableData { table, columns } => {
                let no_rows: [RowId; 0] = [];
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(verb)?;
                seq.serialize_element(table)?;
                seq.serialize_element(&no_rows)?;
                seq.serialize_element(columns)?;
                seq.end()
            }
        }
    }
}
