use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

/// 0xRRGGBB
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

pub const BLUE: Color = Color::rgb(59, 130, 246);
pub const GREEN: Color = Color::rgb(16, 185, 129);
pub const AMBER: Color = Color::rgb(245, 158, 11);
pub const RED: Color = Color::rgb(239, 68, 68);

/// Train / validation / test, cycled over the bars of a split chart.
pub const SPLIT_PALETTE: [Color; 3] = [BLUE, GREEN, AMBER];
/// tn, fp, fn, tp.
pub const CONFUSION_PALETTE: [Color; 4] = [GREEN, RED, AMBER, BLUE];

/// Categorical bars. Bar `i` is filled with `colors[i % colors.len()]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub name: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<Color>,
    pub opacity: f32,
}

impl BarSeries {
    pub fn color_at(&self, index: usize) -> Color {
        if self.colors.is_empty() {
            BLUE
        } else {
            self.colors[index % self.colors.len()]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub color: Color,
    pub opacity: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Bar(BarSeries),
    Scatter(ScatterSeries),
}

impl Series {
    pub fn name(&self) -> &str {
        match self {
            Series::Bar(s) => &s.name,
            Series::Scatter(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn bar_series(&self) -> impl Iterator<Item = &BarSeries> {
        self.series.iter().filter_map(|s| match s {
            Series::Bar(bar) => Some(bar),
            _ => None,
        })
    }

    /// Category labels of the first bar series.
    pub fn categories(&self) -> &[String] {
        self.bar_series()
            .next()
            .map(|bar| bar.categories.as_slice())
            .unwrap_or(&[])
    }

    /// Bounding box over every plotted value: `(x_min, x_max, y_min, y_max)`.
    /// Bar charts use the category index on x and include zero on y.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for series in &self.series {
            match series {
                Series::Scatter(scatter) => {
                    xs.extend(scatter.points.iter().map(|p| p[0]));
                    ys.extend(scatter.points.iter().map(|p| p[1]));
                }
                Series::Bar(bar) => {
                    xs.push(0.0);
                    xs.push(bar.values.len().max(1) as f64);
                    ys.push(0.0);
                    ys.extend(bar.values.iter().copied());
                }
            }
        }
        let finite = |v: &f64| v.is_finite();
        let x_min = xs.iter().copied().filter(finite).fold(f64::INFINITY, f64::min);
        let x_max = xs.iter().copied().filter(finite).fold(f64::NEG_INFINITY, f64::max);
        let y_min = ys.iter().copied().filter(finite).fold(f64::INFINITY, f64::min);
        let y_max = ys.iter().copied().filter(finite).fold(f64::NEG_INFINITY, f64::max);
        if x_min > x_max || y_min > y_max {
            return None;
        }
        Some((x_min, x_max, y_min, y_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_channels_round_trip() {
        assert_eq!(AMBER.0, 0xF59E0B);
        assert_eq!((RED.r(), RED.g(), RED.b()), (239, 68, 68));
    }

    #[test]
    fn bar_colors_cycle() {
        let bar = BarSeries {
            name: "train".into(),
            categories: vec!["tcp".into(), "udp".into(), "icmp".into(), "other".into()],
            values: vec![1.0, 2.0, 3.0, 4.0],
            colors: SPLIT_PALETTE.to_vec(),
            opacity: 0.7,
        };
        assert_eq!(bar.color_at(0), BLUE);
        assert_eq!(bar.color_at(3), BLUE);
        assert_eq!(bar.color_at(2), AMBER);
    }

    #[test]
    fn bounds_include_zero_for_bars() {
        let mut fig = Figure::new(None::<String>);
        fig.add_series(Series::Bar(BarSeries {
            name: "cm".into(),
            categories: vec!["a".into(), "b".into()],
            values: vec![3.0, 5.0],
            colors: vec![],
            opacity: 1.0,
        }));
        assert_eq!(fig.bounds(), Some((0.0, 2.0, 0.0, 5.0)));
        assert!(Figure::new(None::<String>).bounds().is_none());
    }
}
