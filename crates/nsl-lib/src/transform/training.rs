use super::{summary_table, Table};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingResult {
    pub accuracy: Value,
    pub train_samples: Value,
    pub test_samples: Value,
    pub features_after_encoding: Value,
}

pub fn summary(r: &TrainingResult) -> Table {
    summary_table(
        "Logistic regression",
        &[
            ("Accuracy", &r.accuracy),
            ("Train samples", &r.train_samples),
            ("Test samples", &r.test_samples),
            ("Features after encoding", &r.features_after_encoding),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageId;
    use crate::transform::decode;
    use serde_json::json;

    #[test]
    fn summary_lists_every_reported_figure() {
        let payload = json!({
            "accuracy": 0.9712,
            "train_samples": 100778,
            "test_samples": 25195,
            "features_after_encoding": 122,
            "model": "ignored"
        });
        let result: TrainingResult = decode(StageId::Training, &payload).unwrap();
        let table = summary(&result);
        assert_eq!(table.header, ["Metric", "Value"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["Accuracy", "0.9712"],
                vec!["Train samples", "100778"],
                vec!["Test samples", "25195"],
                vec!["Features after encoding", "122"],
            ]
        );
    }

    #[test]
    fn missing_field_is_a_shape_error() {
        let err = decode::<TrainingResult>(StageId::Training, &json!({"accuracy": 1})).unwrap_err();
        assert!(err.to_string().contains("train_samples"));
    }
}
