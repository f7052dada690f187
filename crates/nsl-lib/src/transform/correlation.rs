use super::{format_fixed3, Table};
use crate::plot::{BarSeries, Figure, ScatterSeries, Series, BLUE};
use serde::Deserialize;

pub const SCATTER_X: &str = "same_srv_rate";
pub const SCATTER_Y: &str = "dst_host_srv_count";

#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationResult {
    pub correlation: CorrelationMatrix,
    #[serde(default)]
    pub scatter: Option<ScatterData>,
}

/// Square correlation matrix; `null` cells come from constant columns.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScatterData {
    pub same_srv_rate: Vec<f64>,
    pub dst_host_srv_count: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    High,
    Medium,
    Low,
}

impl Strength {
    pub fn of(value: f64) -> Self {
        let magnitude = value.abs();
        if magnitude > 0.7 {
            Strength::High
        } else if magnitude > 0.4 {
            Strength::Medium
        } else {
            Strength::Low
        }
    }
}

/// Top-left `limit x limit` block in server order, with its labels.
pub fn heatmap_cells(m: &CorrelationMatrix, limit: usize) -> (Vec<String>, Vec<Vec<Option<f64>>>) {
    let labels: Vec<String> = m.columns.iter().take(limit).cloned().collect();
    let cells = m
        .matrix
        .iter()
        .take(limit)
        .map(|row| row.iter().take(limit).copied().collect())
        .collect();
    (labels, cells)
}

fn row_label(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("row {}", index + 1))
}

/// Grouped bars: one series per matrix row, categories are the column labels.
pub fn heatmap_figure(m: &CorrelationMatrix, limit: usize) -> Figure {
    let (labels, cells) = heatmap_cells(m, limit);
    let mut fig = Figure::new(Some(format!("Correlation matrix (top {limit} variables)")));
    for (i, row) in cells.iter().enumerate() {
        fig.add_series(Series::Bar(BarSeries {
            name: row_label(&labels, i),
            categories: labels.clone(),
            values: row.iter().map(|v| v.unwrap_or(0.0)).collect(),
            colors: vec![BLUE],
            opacity: 0.5 + i as f32 * 0.05,
        }));
    }
    fig
}

pub fn correlation_table(m: &CorrelationMatrix, limit: usize) -> Table {
    let (labels, cells) = heatmap_cells(m, limit);
    let mut header = vec!["Variable".to_string()];
    header.extend(labels.iter().cloned());
    let mut table = Table::new("Correlation table", header);
    for (i, row) in cells.iter().enumerate() {
        let mut out = vec![row_label(&labels, i)];
        out.extend(row.iter().map(|cell| match cell {
            Some(v) => format_fixed3(*v),
            None => "-".to_string(),
        }));
        table.push_row(out);
    }
    table
}

/// First `limit` paired samples; point `i` is `(x[i], y[i])`.
pub fn scatter_points(s: &ScatterData, limit: usize) -> Vec<[f64; 2]> {
    s.same_srv_rate
        .iter()
        .zip(&s.dst_host_srv_count)
        .take(limit)
        .map(|(x, y)| [*x, *y])
        .collect()
}

pub fn scatter_figure(s: &ScatterData, limit: usize) -> Figure {
    let points = scatter_points(s, limit);
    let mut fig = Figure::new(Some(format!("{SCATTER_X} vs {SCATTER_Y}")))
        .with_axes(SCATTER_X, SCATTER_Y);
    fig.add_series(Series::Scatter(ScatterSeries {
        name: format!("{SCATTER_X} vs {SCATTER_Y} ({} points)", points.len()),
        points,
        color: BLUE,
        opacity: 0.6,
        radius: 4.0,
    }));
    fig
}

pub fn scatter_table(s: &ScatterData, limit: usize) -> Table {
    let mut table = Table::new(
        format!("Scatter data (first {limit})"),
        vec![SCATTER_X.to_string(), SCATTER_Y.to_string()],
    );
    for [x, y] in scatter_points(s, limit) {
        table.push_row(vec![format_fixed3(x), y.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{SCATTER_LIMIT_CHART, SCATTER_LIMIT_TABLE};

    fn matrix(n: usize) -> CorrelationMatrix {
        CorrelationMatrix {
            columns: (0..n).map(|i| format!("c{i}")).collect(),
            matrix: (0..n)
                .map(|r| (0..n).map(|c| Some((r * 100 + c) as f64)).collect())
                .collect(),
        }
    }

    fn scatter(n: usize) -> ScatterData {
        ScatterData {
            same_srv_rate: (0..n).map(|i| i as f64 / 1000.0).collect(),
            dst_host_srv_count: (0..n).map(|i| (n - i) as f64).collect(),
        }
    }

    #[test]
    fn heatmap_is_top_left_nine_by_nine() {
        for n in [9, 10, 41] {
            let (labels, cells) = heatmap_cells(&matrix(n), 9);
            assert_eq!(labels.len(), 9);
            assert_eq!(labels[8], "c8");
            assert_eq!(cells.len(), 9);
            for (r, row) in cells.iter().enumerate() {
                assert_eq!(row.len(), 9);
                for (c, cell) in row.iter().enumerate() {
                    assert_eq!(*cell, Some((r * 100 + c) as f64));
                }
            }
        }
    }

    #[test]
    fn small_matrix_is_not_padded() {
        let fig = heatmap_figure(&matrix(3), 9);
        assert_eq!(fig.series.len(), 3);
        assert_eq!(fig.categories(), ["c0", "c1", "c2"]);
    }

    #[test]
    fn heatmap_rows_darken_with_index() {
        let fig = heatmap_figure(&matrix(9), 9);
        let opacities: Vec<f32> = fig.bar_series().map(|b| b.opacity).collect();
        assert!((opacities[0] - 0.5).abs() < 1e-6);
        assert!((opacities[8] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn correlation_table_formats_three_decimals() {
        let m = CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            matrix: vec![vec![Some(1.0), Some(-0.12345)], vec![None, Some(1.0)]],
        };
        let table = correlation_table(&m, 9);
        assert_eq!(table.header, ["Variable", "a", "b"]);
        assert_eq!(table.rows[0], ["a", "1.000", "-0.123"]);
        assert_eq!(table.rows[1], ["b", "-", "1.000"]);
    }

    #[test]
    fn scatter_length_is_min_of_limit_and_input() {
        for (n, k) in [(5, SCATTER_LIMIT_TABLE), (150, SCATTER_LIMIT_TABLE), (150, SCATTER_LIMIT_CHART), (0, 20)] {
            let data = scatter(n);
            let points = scatter_points(&data, k);
            assert_eq!(points.len(), n.min(k));
            for (i, p) in points.iter().enumerate() {
                assert_eq!(p[0], data.same_srv_rate[i]);
                assert_eq!(p[1], data.dst_host_srv_count[i]);
            }
        }
    }

    #[test]
    fn scatter_table_fixes_x_and_keeps_y() {
        let data = ScatterData {
            same_srv_rate: vec![1.0, 0.0624],
            dst_host_srv_count: vec![255.0, 3.0],
        };
        let table = scatter_table(&data, SCATTER_LIMIT_TABLE);
        assert_eq!(table.rows, vec![vec!["1.000", "255"], vec!["0.062", "3"]]);
    }

    #[test]
    fn strength_bands() {
        assert_eq!(Strength::of(-0.8), Strength::High);
        assert_eq!(Strength::of(0.5), Strength::Medium);
        assert_eq!(Strength::of(0.4), Strength::Low);
    }
}
