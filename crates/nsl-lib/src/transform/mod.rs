//! Pure mappings from stored stage results to bounded tables and figures.
//!
//! Every truncation is a positional prefix of the server's order.

pub mod correlation;
pub mod evaluation;
pub mod pipeline;
pub mod preprocessing;
pub mod split;
pub mod training;

use crate::error::PayloadError;
use crate::plot::Figure;
use crate::stage::{ChartSlot, StageId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HEATMAP_LIMIT: usize = 9;
pub const SCATTER_LIMIT_TABLE: usize = 20;
pub const SCATTER_LIMIT_CHART: usize = 100;
pub const PREPROCESSING_ROWS: usize = 10;
pub const PIPELINE_COLUMNS: usize = 9;

/// Display bounds applied by the transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub heatmap: usize,
    /// Paired scatter samples shown, both in the chart and in the table.
    pub scatter: usize,
    pub preprocessing_rows: usize,
    pub pipeline_columns: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            heatmap: HEATMAP_LIMIT,
            scatter: SCATTER_LIMIT_CHART,
            preprocessing_rows: PREPROCESSING_ROWS,
            pipeline_columns: PIPELINE_COLUMNS,
        }
    }
}

/// Rendered table: header plus already formatted cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            title: title.into(),
            header,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

pub fn format_fixed3(value: f64) -> String {
    format!("{value:.3}")
}

/// Display a JSON scalar as received from the server.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(stage: StageId, payload: &Value) -> Result<T, PayloadError> {
    T::deserialize(payload).map_err(|source| PayloadError::Shape {
        stage: stage.key(),
        source,
    })
}

pub(crate) fn summary_table(title: &str, pairs: &[(&str, &Value)]) -> Table {
    let mut table = Table::new(title, vec!["Metric".into(), "Value".into()]);
    for (label, value) in pairs {
        table.push_row(vec![label.to_string(), format_value(value)]);
    }
    table
}

/// Figures for every chart slot fed by `stage`.
pub fn figures_for(
    stage: StageId,
    payload: &Value,
    limits: &Limits,
) -> Result<Vec<(ChartSlot, Figure)>, PayloadError> {
    match stage {
        StageId::Training | StageId::Preprocessing | StageId::Pipeline => Ok(Vec::new()),
        StageId::Correlation => {
            let result: correlation::CorrelationResult = decode(stage, payload)?;
            let mut figures = vec![(
                ChartSlot::CorrHeatmap,
                correlation::heatmap_figure(&result.correlation, limits.heatmap),
            )];
            if let Some(scatter) = &result.scatter {
                figures.push((
                    ChartSlot::Scatter,
                    correlation::scatter_figure(scatter, limits.scatter),
                ));
            }
            Ok(figures)
        }
        StageId::Split => {
            let result: split::SplitResult = decode(stage, payload)?;
            Ok(split::figures(&result))
        }
        StageId::Evaluation => {
            let result: evaluation::EvaluationResult = decode(stage, payload)?;
            Ok(vec![(
                ChartSlot::Confusion,
                evaluation::confusion_figure(&result.confusion_matrix),
            )])
        }
    }
}

/// Tables shown for `stage`, in display order.
pub fn tables_for(stage: StageId, payload: &Value, limits: &Limits) -> Result<Vec<Table>, PayloadError> {
    match stage {
        StageId::Training => {
            let result: training::TrainingResult = decode(stage, payload)?;
            Ok(vec![training::summary(&result)])
        }
        StageId::Correlation => {
            let result: correlation::CorrelationResult = decode(stage, payload)?;
            let mut tables = vec![correlation::correlation_table(
                &result.correlation,
                limits.heatmap,
            )];
            if let Some(scatter) = &result.scatter {
                tables.push(correlation::scatter_table(scatter, limits.scatter));
            }
            Ok(tables)
        }
        StageId::Split => {
            let result: split::SplitResult = decode(stage, payload)?;
            Ok(vec![split::sizes_table(&result)])
        }
        StageId::Preprocessing => {
            let result: preprocessing::PreprocessingResult = decode(stage, payload)?;
            Ok(vec![
                preprocessing::summary(&result),
                preprocessing::preview_table(&result, limits.preprocessing_rows),
            ])
        }
        StageId::Pipeline => {
            let result: pipeline::PipelineResult = decode(stage, payload)?;
            Ok(vec![
                pipeline::summary(&result),
                pipeline::head_table(&result, limits.pipeline_columns),
            ])
        }
        StageId::Evaluation => {
            let result: evaluation::EvaluationResult = decode(stage, payload)?;
            Ok(vec![
                evaluation::metrics_table(&result.metrics),
                evaluation::confusion_table(&result.confusion_matrix),
            ])
        }
    }
}
