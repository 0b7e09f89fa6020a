use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

pub const ROW_ID_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "logicalType", default)]
    pub logical_type: String,
}

/// Preview rows and typed columns for one sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridInfo {
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl GridInfo {
    pub fn new(data: Vec<Row>, fields: Vec<FieldDescriptor>) -> Self {
        Self { data, fields }
    }

    /// A grid is only drawn when it has both rows and columns.
    pub fn is_renderable(&self) -> bool {
        !self.data.is_empty() && !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridResponse {
    #[serde(default)]
    pub grids: Vec<GridInfo>,
}

/// Gives every row a zero-based `id` unless the first row already carries one.
///
/// Rows with a mix of present and missing ids are left as they are.
pub fn assign_row_ids(rows: &mut [Row]) {
    let needs_ids = rows
        .first()
        .is_some_and(|row| !row.contains_key(ROW_ID_FIELD));
    if !needs_ids {
        return;
    }
    for (idx, row) in rows.iter_mut().enumerate() {
        row.insert(ROW_ID_FIELD.to_string(), Value::from(idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_assign_row_ids_when_missing() {
        let mut rows = vec![row(json!({"a": 1})), row(json!({"a": 2}))];
        assign_row_ids(&mut rows);
        assert_eq!(rows[0]["id"], json!(0));
        assert_eq!(rows[1]["id"], json!(1));
    }

    #[test]
    fn test_assign_row_ids_keeps_existing() {
        let mut rows = vec![row(json!({"id": 10, "a": 1})), row(json!({"a": 2}))];
        assign_row_ids(&mut rows);
        assert_eq!(rows[0]["id"], json!(10));
        assert!(!rows[1].contains_key("id"));
    }

    #[test]
    fn test_is_renderable() {
        let field = FieldDescriptor {
            name: "a".to_string(),
            logical_type: "STRING".to_string(),
        };
        assert!(GridInfo::new(vec![row(json!({"a": 1}))], vec![field.clone()]).is_renderable());
        assert!(!GridInfo::new(vec![], vec![field]).is_renderable());
        assert!(!GridInfo::new(vec![row(json!({"a": 1}))], vec![]).is_renderable());
    }

    #[test]
    fn test_grid_response_deserialization() {
        let response: GridResponse = serde_json::from_value(json!({
            "grids": [{
                "data": [{"c1": "x"}],
                "fields": [{"name": "c1", "logicalType": "STRING", "ref": null}]
            }]
        }))
        .unwrap();
        assert_eq!(response.grids.len(), 1);
        assert_eq!(response.grids[0].fields[0].logical_type, "STRING");

        let empty: GridResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.grids.is_empty());
    }
}
