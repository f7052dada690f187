use super::{format_value, summary_table, Table};
use crate::plot::{BarSeries, Figure, Series, SPLIT_PALETTE};
use crate::stage::ChartSlot;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct SplitResult {
    pub train_size: Value,
    pub val_size: Value,
    pub test_size: Value,
    pub histograms: Histograms,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Histograms {
    pub train: Histogram,
    pub val: Histogram,
    pub test: Histogram,
}

/// Labeled bins, in server order.
#[derive(Debug, Clone, Deserialize)]
pub struct Histogram {
    pub labels: Vec<Value>,
    pub values: Vec<f64>,
}

impl Histogram {
    fn categories(&self) -> Vec<String> {
        self.labels.iter().map(format_value).collect()
    }
}

fn partition_figure(label: &str, hist: &Histogram) -> Figure {
    let mut fig = Figure::new(Some(label.to_string()));
    fig.add_series(Series::Bar(BarSeries {
        name: label.to_string(),
        categories: hist.categories(),
        values: hist.values.clone(),
        colors: SPLIT_PALETTE.to_vec(),
        opacity: 0.8,
    }));
    fig
}

/// Row counts of the three partitions side by side.
pub fn sizes_figure(r: &SplitResult) -> Figure {
    let sizes = [&r.train_size, &r.val_size, &r.test_size];
    let mut fig = Figure::new(Some("Partition sizes".to_string())).with_axes("partition", "rows");
    fig.add_series(Series::Bar(BarSeries {
        name: "rows".to_string(),
        categories: vec!["Train".into(), "Validation".into(), "Test".into()],
        values: sizes.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect(),
        colors: SPLIT_PALETTE.to_vec(),
        opacity: 0.8,
    }));
    fig
}

pub fn figures(r: &SplitResult) -> Vec<(ChartSlot, Figure)> {
    vec![
        (ChartSlot::SplitTrain, partition_figure("Train", &r.histograms.train)),
        (ChartSlot::SplitVal, partition_figure("Validation", &r.histograms.val)),
        (ChartSlot::SplitTest, partition_figure("Test", &r.histograms.test)),
        (ChartSlot::SplitSizes, sizes_figure(r)),
    ]
}

pub fn sizes_table(r: &SplitResult) -> Table {
    summary_table(
        "Partition sizes",
        &[
            ("Train", &r.train_size),
            ("Validation", &r.val_size),
            ("Test", &r.test_size),
        ],
    )
}
