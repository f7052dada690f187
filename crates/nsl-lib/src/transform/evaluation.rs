use super::{format_value, summary_table, Table};
use crate::plot::{BarSeries, Figure, Series, CONFUSION_PALETTE};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationResult {
    pub metrics: Metrics,
    pub confusion_matrix: ConfusionMatrix,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metrics {
    pub accuracy: Value,
    pub precision: Value,
    pub recall: Value,
    pub f1: Value,
}

/// Binary counts with "attack" as the positive class.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: Value,
    pub fp: Value,
    #[serde(rename = "fn")]
    pub fn_: Value,
    pub tp: Value,
}

impl ConfusionMatrix {
    /// `[tn, fp, fn, tp]`.
    pub fn cells(&self) -> [&Value; 4] {
        [&self.tn, &self.fp, &self.fn_, &self.tp]
    }
}

pub fn confusion_figure(cm: &ConfusionMatrix) -> Figure {
    let mut fig = Figure::new(Some("Confusion matrix".to_string()));
    fig.add_series(Series::Bar(BarSeries {
        name: "count".to_string(),
        categories: vec!["TN".into(), "FP".into(), "FN".into(), "TP".into()],
        values: cm.cells().iter().map(|v| v.as_f64().unwrap_or(0.0)).collect(),
        colors: CONFUSION_PALETTE.to_vec(),
        opacity: 0.7,
    }));
    fig
}

pub fn metrics_table(m: &Metrics) -> Table {
    summary_table(
        "Metrics",
        &[
            ("Accuracy", &m.accuracy),
            ("Precision", &m.precision),
            ("Recall", &m.recall),
            ("F1", &m.f1),
        ],
    )
}

/// Rows are the actual class, columns the predicted class.
pub fn confusion_table(cm: &ConfusionMatrix) -> Table {
    let mut table = Table::new(
        "Confusion matrix",
        vec![String::new(), "Pred Normal".into(), "Pred Attack".into()],
    );
    table.push_row(vec![
        "Actual Normal".into(),
        format_value(&cm.tn),
        format_value(&cm.fp),
    ]);
    table.push_row(vec![
        "Actual Attack".into(),
        format_value(&cm.fn_),
        format_value(&cm.tp),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{AMBER, BLUE, GREEN, RED};
    use serde_json::json;

    fn result() -> EvaluationResult {
        serde_json::from_value(json!({
            "metrics": {"accuracy": 0.95, "precision": 0.9375, "recall": 0.957, "f1": 0.947},
            "confusion_matrix": {"tn": 50, "fp": 3, "fn": 2, "tp": 45}
        }))
        .unwrap()
    }

    #[test]
    fn chart_orders_cells_tn_fp_fn_tp() {
        let fig = confusion_figure(&result().confusion_matrix);
        let bar = fig.bar_series().next().unwrap();
        assert_eq!(bar.values, [50.0, 3.0, 2.0, 45.0]);
        assert_eq!(bar.categories, ["TN", "FP", "FN", "TP"]);
        assert_eq!(
            (0..4).map(|i| bar.color_at(i)).collect::<Vec<_>>(),
            [GREEN, RED, AMBER, BLUE]
        );
    }

    #[test]
    fn table_is_actual_by_predicted() {
        let table = confusion_table(&result().confusion_matrix);
        assert_eq!(table.header, ["", "Pred Normal", "Pred Attack"]);
        assert_eq!(table.rows[0], ["Actual Normal", "50", "3"]);
        assert_eq!(table.rows[1], ["Actual Attack", "2", "45"]);
    }

    #[test]
    fn metrics_are_shown_unformatted() {
        let table = metrics_table(&result().metrics);
        assert_eq!(table.rows[1], ["Precision", "0.9375"]);
        assert_eq!(table.rows[3], ["F1", "0.947"]);
    }
}
