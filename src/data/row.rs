//! Row records as handed over by a data source
//!
//! A row is an opaque map from column name to JSON value. The grid never
//! interprets values beyond turning them into display text; ordering is the
//! data source's business (see `compare_values` for the in-memory source).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord {
    values: Map<String, Value>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly used by loaders and tests
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Display text for a cell. Missing columns and nulls render empty so a
    /// malformed row never takes the whole window down.
    pub fn cell_text(&self, column: &str) -> String {
        match self.values.get(column) {
            Some(value) => value_to_text(value),
            None => String::new(),
        }
    }

    /// True when any of the given columns contains `needle` (already lowercased)
    pub fn contains_text(&self, columns: &[String], needle_lower: &str) -> bool {
        columns
            .iter()
            .any(|column| self.cell_text(column).to_lowercase().contains(needle_lower))
    }
}

impl From<Map<String, Value>> for RowRecord {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Render a JSON value the way a cell shows it
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Nested values are rare in rows; show them compactly
        other => other.to_string(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total ordering over JSON values used when a data source sorts rows.
/// Order across types: Null < Boolean < Number < String < Array < Object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                // Compare actual numeric values when either side is a float
                _ => {
                    let a = a.as_f64().unwrap_or(f64::NAN);
                    let b = b.as_f64().unwrap_or(f64::NAN);
                    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare optional values, missing sorts first like Null
pub fn compare_optional_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text_for_missing_and_null() {
        let row = RowRecord::new().with("id", 1).with("name", Value::Null);
        assert_eq!(row.cell_text("id"), "1");
        assert_eq!(row.cell_text("name"), "");
        assert_eq!(row.cell_text("not_there"), "");
    }

    #[test]
    fn test_numeric_compare_mixes_ints_and_floats() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!(3), &json!(3.0)), Ordering::Equal);
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_values(&Value::Null, &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("a")), Ordering::Less);
        assert_eq!(
            compare_optional_values(None, Some(&json!("x"))),
            Ordering::Less
        );
    }

    #[test]
    fn test_contains_text_is_case_insensitive_on_lowered_needle() {
        let row = RowRecord::new().with("name", "Item 12").with("category", "B");
        let columns = vec!["name".to_string(), "category".to_string()];
        assert!(row.contains_text(&columns, "item 1"));
        assert!(!row.contains_text(&columns, "item 2"));
    }

    #[test]
    fn test_transparent_serde() {
        let row: RowRecord = serde_json::from_str(r#"{"id": 7, "name": "seven"}"#).unwrap();
        assert_eq!(row.cell_text("name"), "seven");
        assert_eq!(row.len(), 2);
    }
}
