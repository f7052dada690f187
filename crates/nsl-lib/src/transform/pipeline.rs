use super::{format_value, summary_table, Table};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineResult {
    pub train_rows: Value,
    #[serde(default)]
    pub val_rows: Option<Value>,
    #[serde(default)]
    pub test_rows: Option<Value>,
    pub features_after_pipeline: Value,
    pub head: Vec<Map<String, Value>>,
}

pub fn summary(r: &PipelineResult) -> Table {
    let mut pairs: Vec<(&str, &Value)> = vec![("Train rows", &r.train_rows)];
    if let Some(v) = &r.val_rows {
        pairs.push(("Validation rows", v));
    }
    if let Some(v) = &r.test_rows {
        pairs.push(("Test rows", v));
    }
    pairs.push(("Features after pipeline", &r.features_after_pipeline));
    summary_table("Full pipeline", &pairs)
}

/// Header is the first record's keys cut to `limit`; every row is read in that key order.
pub fn head_table(r: &PipelineResult, limit: usize) -> Table {
    let keys: Vec<String> = r
        .head
        .first()
        .map(|first| first.keys().take(limit).cloned().collect())
        .unwrap_or_default();
    let mut table = Table::new("Transformed sample", keys.clone());
    for record in &r.head {
        table.push_row(
            keys.iter()
                .map(|key| record.get(key).map(format_value).unwrap_or_default())
                .collect(),
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(offset: usize) -> Value {
        let mut map = Map::new();
        for i in 0..12 {
            map.insert(format!("f{:02}", 11 - i), json!(offset * 100 + i));
        }
        Value::Object(map)
    }

    #[test]
    fn header_keeps_server_key_order_and_is_cut_to_nine() {
        let payload = json!({
            "train_rows": 75583,
            "features_after_pipeline": 122,
            "head": [record(0), record(1)]
        });
        let result: PipelineResult = serde_json::from_value(payload).unwrap();
        let table = head_table(&result, 9);
        assert_eq!(table.header.len(), 9);
        assert_eq!(table.header[0], "f11");
        assert_eq!(table.header[8], "f03");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0], "100");
        assert_eq!(table.rows[1][8], "108");
    }

    #[test]
    fn narrow_records_are_not_padded() {
        let result: PipelineResult = serde_json::from_value(json!({
            "train_rows": 1,
            "features_after_pipeline": 2,
            "head": [{"a": 1, "b": "x"}]
        }))
        .unwrap();
        let table = head_table(&result, 9);
        assert_eq!(table.header, ["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "x"]]);
    }

    #[test]
    fn summary_includes_optional_partitions() {
        let result: PipelineResult = serde_json::from_value(json!({
            "train_rows": 10,
            "test_rows": 3,
            "features_after_pipeline": 7,
            "head": []
        }))
        .unwrap();
        let table = summary(&result);
        let labels: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, ["Train rows", "Test rows", "Features after pipeline"]);
        assert!(head_table(&result, 9).header.is_empty());
    }
}
