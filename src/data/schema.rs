//! Payload shape check: `{ "data": { "pivot_data": [ {..}, .. ] } }`.

use serde_json::Value;

use crate::domain::RowList;
use crate::error::SchemaError;

/// Return the rows at `data.pivot_data`.
///
/// Every element must be a JSON object; anything else is a `SchemaError`.
pub fn validate(doc: &Value) -> Result<RowList, SchemaError> {
    let data = doc
        .get("data")
        .ok_or_else(|| schema_error("missing key 'data'"))?;
    let pivot = data
        .get("pivot_data")
        .ok_or_else(|| schema_error("missing key 'data.pivot_data'"))?;
    let items = pivot
        .as_array()
        .ok_or_else(|| schema_error(format!("'data.pivot_data' is {}, not a list", kind(pivot))))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_object()
                .cloned()
                .ok_or_else(|| schema_error(format!("row {idx} is {}, not an object", kind(item))))
        })
        .collect()
}

fn schema_error(reason: impl Into<String>) -> SchemaError {
    SchemaError { reason: reason.into() }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_nested_list() {
        let rows = validate(&json!({"data": {"pivot_data": [{"tahun": 2023}, {"tahun": 2024}]}})).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["tahun"], json!(2024));
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(validate(&json!({"data": {"pivot_data": []}})).unwrap().is_empty());
    }

    #[test]
    fn rejects_other_shapes() {
        let bad = [
            json!({}),
            json!({"data": {}}),
            json!({"data": []}),
            json!({"data": {"pivot_data": {"tahun": 2023}}}),
            json!({"data": {"pivot_data": null}}),
            json!({"data": {"pivot_data": [1, 2]}}),
            json!([{"data": {"pivot_data": []}}]),
        ];
        for doc in bad {
            assert!(validate(&doc).is_err(), "expected SchemaError for {doc}");
        }
    }

    #[test]
    fn reason_names_the_problem() {
        let err = validate(&json!({"data": {"rows": []}})).unwrap_err();
        assert!(err.reason.contains("pivot_data"));
    }
}
