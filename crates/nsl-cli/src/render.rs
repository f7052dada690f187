use anyhow::{Context, Result};
use log::debug;
use nsl_lib::plot::{Color, Figure, Series};
use nsl_lib::{ChartBackend, ChartSlot};
use plotters::prelude::*;
use plotters::style::Color as _;
use std::path::{Path, PathBuf};

/// Writes each drawn slot to `<dir>/<slot id>.png`. Without a directory nothing is rendered.
/// Files outlive their handles: destroying a chart leaves the last image on disk.
pub struct PngBackend {
    dir: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl PngBackend {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartBackend for PngBackend {
    type Instance = Option<PathBuf>;

    fn create(&mut self, slot: ChartSlot, figure: &Figure) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let path = dir.join(format!("{}.png", slot.id()));
        draw_png(&path, figure).with_context(|| format!("rendering {}", path.display()))?;
        debug!("wrote {}", path.display());
        self.written.push(path.clone());
        Ok(Some(path))
    }

    fn destroy(&mut self, slot: ChartSlot, instance: Option<PathBuf>) {
        if let Some(path) = instance {
            debug!("released {slot} ({})", path.display());
        }
    }
}

fn rgb(color: Color) -> RGBColor {
    RGBColor(color.r(), color.g(), color.b())
}

/// Widen a degenerate range so plotters gets a drawable span.
fn padded(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

pub fn draw_png(path: &Path, fig: &Figure) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (x_min, x_max) = padded(x_min, x_max);
    let (y_min, y_max) = padded(y_min, y_max);

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Chart".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let categories = fig.categories().to_vec();
    let mut mesh = chart.configure_mesh();
    if let Some(x) = &fig.x.label {
        mesh.x_desc(x.as_str());
    }
    if let Some(y) = &fig.y.label {
        mesh.y_desc(y.as_str());
    }
    if !categories.is_empty() {
        mesh.disable_x_mesh().x_labels(0);
    }
    mesh.draw()?;

    let groups = fig.bar_series().count().max(1) as f64;
    for (group, series) in fig.series.iter().enumerate() {
        match series {
            Series::Bar(bar) => {
                let width = 0.8 / groups;
                let offset = 0.1 + group as f64 * width;
                chart.draw_series(bar.values.iter().enumerate().map(|(i, value)| {
                    let x0 = i as f64 + offset;
                    let style = rgb(bar.color_at(i)).mix(bar.opacity as f64).filled();
                    Rectangle::new([(x0, 0.0), (x0 + width, *value)], style)
                }))?;
            }
            Series::Scatter(scatter) => {
                let style = rgb(scatter.color).mix(scatter.opacity as f64).filled();
                let radius = scatter.radius.round() as i32;
                chart.draw_series(
                    scatter
                        .points
                        .iter()
                        .map(|p| Circle::new((p[0], p[1]), radius, style)),
                )?;
            }
        }
    }

    chart.draw_series(categories.iter().enumerate().map(|(i, label)| {
        Text::new(label.clone(), (i as f64 + 0.1, y_min), ("sans-serif", 12))
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ranges_are_widened() {
        assert_eq!(padded(3.0, 3.0), (2.0, 4.0));
        let (lo, hi) = padded(0.0, 10.0);
        assert!(lo < 0.0 && hi > 10.0);
    }

    #[test]
    fn backend_without_dir_renders_nothing() {
        let mut backend = PngBackend::new(None);
        let fig = Figure::new(Some("x".to_string()));
        assert!(backend.create(ChartSlot::Scatter, &fig).unwrap().is_none());
        assert!(backend.written().is_empty());
    }
}
