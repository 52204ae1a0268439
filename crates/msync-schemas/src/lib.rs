//! msync-schemas
//!
//! Row shapes shared by every crate in the workspace. A dataset is a list of
//! [`DatasetRow`]s; each row carries an opaque [`RowHandle`] issued by the
//! store that produced it plus a bag of named cell values.
//!
//! Cell values are `serde_json::Value` so that null, text, and numeric cells
//! round-trip through the merge step unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single cell value. `Value::Null` is an empty cell.
pub type FieldValue = Value;

/// Opaque reference to one stored row.
///
/// Handles are minted by a `DatasetReader` and handed back unchanged to the
/// matching `DatasetWriter`. Callers never build one from a business key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowHandle {
    dataset: String,
    record_id: String,
}

impl RowHandle {
    pub fn new(dataset: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            record_id: record_id.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dataset, self.record_id)
    }
}

/// One row as read from a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub handle: RowHandle,
    pub fields: BTreeMap<String, FieldValue>,
}

impl DatasetRow {
    pub fn new(handle: RowHandle) -> Self {
        Self {
            handle,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter, mostly for fixtures.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Named-field access. Absent columns and empty cells both read as `None`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Cell value with empty cells surfaced as `Value::Null`.
    pub fn get_or_null(&self, name: &str) -> FieldValue {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Textual form of a key cell, `None` when the cell is empty.
    pub fn key_text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(key_text)
    }
}

/// Render a key cell as text for matching.
///
/// Strings are taken verbatim (no trimming); numbers and booleans use their
/// JSON rendering. Null yields `None`.
///
/// Matching compares this text, not the typed cell, so a numeric `1001`
/// matches the string `"1001"`. File-backed stores read every cell as a
/// string; only in-memory rows can mix the two.
pub fn key_text(v: &FieldValue) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// One destination assignment inside a [`FieldUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAssignment {
    pub field: String,
    pub value: FieldValue,
}

/// Ordered set of destination-field assignments for a single row write.
///
/// Order follows the configured transfer list so that audit output and
/// writer calls are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub assignments: Vec<FieldAssignment>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an assignment. A repeated field replaces the earlier value.
    pub fn assign(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        if let Some(existing) = self.assignments.iter_mut().find(|a| a.field == field) {
            existing.value = value;
            return;
        }
        self.assignments.push(FieldAssignment { field, value });
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.assignments
            .iter()
            .find(|a| a.field == field)
            .map(|a| &a.value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|a| a.field.as_str())
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Apply every assignment to `row` in order.
    pub fn apply_to(&self, row: &mut DatasetRow) {
        for a in &self.assignments {
            row.set(a.field.clone(), a.value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_cell_reads_as_none() {
        let row = DatasetRow::new(RowHandle::new("Manifest", "rec1"))
            .with_field("Sample ID", "S1")
            .with_field("comments", Value::Null);

        assert_eq!(row.get("Sample ID"), Some(&json!("S1")));
        assert_eq!(row.get("comments"), None);
        assert_eq!(row.get("not a column"), None);
        assert_eq!(row.get_or_null("comments"), Value::Null);
    }

    #[test]
    fn key_text_keeps_whitespace_and_renders_numbers() {
        assert_eq!(key_text(&json!(" S1 ")), Some(" S1 ".to_string()));
        assert_eq!(key_text(&json!(42)), Some("42".to_string()));
        assert_eq!(key_text(&Value::Null), None);
    }

    #[test]
    fn field_update_replaces_repeated_field() {
        let mut u = FieldUpdate::new();
        u.assign("comments", json!("first"));
        u.assign("Volume (ul)*", json!(12));
        u.assign("comments", json!("second"));

        assert_eq!(u.len(), 2);
        assert_eq!(u.get("comments"), Some(&json!("second")));
        assert_eq!(u.fields().collect::<Vec<_>>(), vec!["comments", "Volume (ul)*"]);
    }

    #[test]
    fn apply_to_only_touches_assigned_fields() {
        let mut row = DatasetRow::new(RowHandle::new("Manifest", "rec1"))
            .with_field("Sample ID", "S1")
            .with_field("Project", "curated");

        let mut u = FieldUpdate::new();
        u.assign("comments", json!("ok"));
        u.apply_to(&mut row);

        assert_eq!(row.get("Project"), Some(&json!("curated")));
        assert_eq!(row.get("comments"), Some(&json!("ok")));
    }

    #[test]
    fn row_handle_display() {
        assert_eq!(RowHandle::new("Manifest", "row-3").to_string(), "Manifest/row-3");
    }
}
