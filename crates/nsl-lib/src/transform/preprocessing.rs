use super::{format_value, summary_table, Table};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const PREVIEW_FIELDS: [&str; 2] = ["src_bytes", "dst_bytes"];

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessingResult {
    pub rows: Value,
    pub head: Vec<Map<String, Value>>,
}

pub fn summary(r: &PreprocessingResult) -> Table {
    summary_table("Preprocessing", &[("Rows", &r.rows)])
}

/// First `limit` records reduced to the two byte counters. Absent fields render empty.
pub fn preview_table(r: &PreprocessingResult, limit: usize) -> Table {
    let header = PREVIEW_FIELDS.iter().map(|f| f.to_string()).collect();
    let mut table = Table::new("Scaled sample", header);
    for record in r.head.iter().take(limit) {
        table.push_row(
            PREVIEW_FIELDS
                .iter()
                .map(|field| record.get(*field).map(format_value).unwrap_or_default())
                .collect(),
        );
    }
    table
}
