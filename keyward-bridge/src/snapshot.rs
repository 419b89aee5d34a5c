//! Table snapshots
//!
//! A [`TableSnapshot`] is a row-oriented copy of a host table, as handed to
//! records-changed callbacks and returned by the data accessor. Snapshots
//! can be loaded from the JSON data file the host keeps in sync, which is
//! either a list of row objects or a column map.

use crate::types::{record_id, Record, Result, RowId, ID_COLUMN};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Default name of the host-synced data file
pub const DEFAULT_DATA_PATH: &str = "data.json";

/// Accepted on-disk layouts of the data file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableData {
    Rows(Vec<Record>),
    Columns(Map<String, Value>),
}

/// Row-oriented copy of a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableSnapshot {
    rows: Vec<Record>,
}

impl TableSnapshot {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Build from column-major data; shorter columns pad with `null`
    pub fn from_columns(columns: Map<String, Value>) -> Self {
        let num_rows = columns
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let rows = (0..num_rows)
            .map(|i| {
                columns
                    .iter()
                    .map(|(col_id, values)| {
                        let value = values
                            .as_array()
                            .and_then(|values| values.get(i))
                            .cloned()
                            .unwrap_or(Value::Null);
                        (col_id.clone(), value)
                    })
                    .collect()
            })
            .collect();

        Self { rows }
    }

    /// Parse either layout from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let data: TableData = serde_json::from_str(json)?;
        Ok(match data {
            TableData::Rows(rows) => Self::new(rows),
            TableData::Columns(columns) => Self::from_columns(columns),
        })
    }

    /// Load the data file, falling back to an empty snapshot
    ///
    /// A missing file is normal before the host's first sync. Any other
    /// failure is logged and also yields an empty snapshot.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(snapshot) => snapshot,
            Err(crate::types::BridgeError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No data file at {:?} yet", path);
                Self::default()
            }
            Err(e) => {
                log::error!("Error reading data: {}", e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column ids in first-seen order, excluding `id`
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if key != ID_COLUMN && !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    pub fn has_column(&self, col_id: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(col_id))
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().filter_map(record_id).collect()
    }

    pub fn get(&self, row_id: RowId) -> Option<&Record> {
        self.rows.iter().find(|row| record_id(row) == Some(row_id))
    }

    /// Run a [`Query`] over this snapshot
    pub fn query(&self, query: &Query) -> TableSnapshot {
        let mut rows: Vec<Record> = self
            .rows
            .iter()
            .filter(|row| {
                query.filters.iter().all(|(col_id, expected)| {
                    // Filters on columns the table lacks are ignored.
                    !self.has_column(col_id) || row.get(col_id) == Some(expected)
                })
            })
            .cloned()
            .collect();

        if let Some(columns) = &query.columns {
            let keep: Vec<&String> = columns.iter().filter(|c| self.has_column(c)).collect();
            for row in &mut rows {
                let projected: Record = keep
                    .iter()
                    .filter_map(|col_id| {
                        row.get(col_id.as_str())
                            .map(|value| ((*col_id).clone(), value.clone()))
                    })
                    .chain(
                        row.get(ID_COLUMN)
                            .map(|id| (ID_COLUMN.to_string(), id.clone())),
                    )
                    .collect();
                *row = projected;
            }
        }

        if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
            rows.truncate(limit);
        }

        TableSnapshot::new(rows)
    }
}

/// Equality filters, column projection and a row limit
///
/// Projection keeps the row id alongside the selected columns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<(String, Value)>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, col_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((col_id.into(), value.into()));
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn people() -> TableSnapshot {
        TableSnapshot::from_json(
            r#"[
                {"id": 1, "Name": "Ada", "Team": "A"},
                {"id": 2, "Name": "Brian", "Team": "B"},
                {"id": 3, "Name": "Cleo", "Team": "A"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns() {
        let snapshot =
            TableSnapshot::from_json(r#"{"id": [1, 2], "Name": ["Ada", "Brian"]}"#).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.row_ids(), vec![1, 2]);
        assert_eq!(snapshot.get(2).unwrap()["Name"], json!("Brian"));
        assert_eq!(snapshot.columns(), vec!["Name".to_string()]);
    }

    #[test]
    fn test_query_filters_and_limit() {
        let result = people().query(&Query::new().filter("Team", "A"));
        assert_eq!(result.row_ids(), vec![1, 3]);

        let limited = people().query(&Query::new().filter("Team", "A").limit(1));
        assert_eq!(limited.row_ids(), vec![1]);

        // Unknown filter columns are ignored; zero limit means no limit
        let all = people().query(&Query::new().filter("Missing", 1).limit(0));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_query_projection() {
        let result = people().query(&Query::new().columns(["Name", "Nope"]));
        assert_eq!(result.rows()[0], serde_json::from_value::<Record>(json!({"Name": "Ada", "id": 1})).unwrap());
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = TableSnapshot::load(&dir.path().join("data.json"));
        assert!(missing.is_empty());

        let bad_path = dir.path().join("bad.json");
        let mut file = fs::File::create(&bad_path).unwrap();
        file.write_all(b"not json").unwrap();
        assert!(TableSnapshot::load(&bad_path).is_empty());
        assert!(TableSnapshot::try_load(&bad_path).is_err());
    }

    #[test]
    fn test_load_rows_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"[{"id": 4, "Name": "Dora"}]"#).unwrap();
        let snapshot = TableSnapshot::load(&path);
        assert_eq!(snapshot.row_ids(), vec![4]);
    }
}
