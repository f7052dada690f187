use anyhow::Result;
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Plot, PlotUi, Points};
use log::debug;
use nsl_lib::plot::{Color, Figure, Series};
use nsl_lib::{ChartBackend, ChartSlot};

/// Bars of one series, already laid out on the category axis.
pub struct BarGroup {
    name: String,
    bars: Vec<Bar>,
}

pub struct PointCloud {
    name: String,
    points: Vec<[f64; 2]>,
    color: Color32,
    radius: f32,
}

/// Everything needed to paint one slot. The plot id changes with every draw so egui
/// starts the replacement with fresh zoom and pan state.
pub struct PlotModel {
    plot_id: String,
    bars: Vec<BarGroup>,
    points: Vec<PointCloud>,
    x_label: Option<String>,
    y_label: Option<String>,
}

impl PlotModel {
    pub fn show(&self, ui: &mut egui::Ui, height: f32) {
        let mut plot = Plot::new(&self.plot_id)
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false);
        if let Some(label) = &self.x_label {
            plot = plot.x_axis_label(label.clone());
        }
        if let Some(label) = &self.y_label {
            plot = plot.y_axis_label(label.clone());
        }
        plot.show(ui, |plot_ui| self.paint(plot_ui));
    }

    fn paint(&self, plot_ui: &mut PlotUi) {
        for group in &self.bars {
            plot_ui.bar_chart(BarChart::new(group.bars.clone()).name(&group.name));
        }
        for cloud in &self.points {
            plot_ui.points(
                Points::new(cloud.points.clone())
                    .color(cloud.color)
                    .radius(cloud.radius)
                    .name(&cloud.name),
            );
        }
    }
}

pub fn color32(color: Color, opacity: f32) -> Color32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

#[derive(Default)]
pub struct EguiBackend {
    serial: u64,
    live: usize,
}

impl EguiBackend {
    pub fn live(&self) -> usize {
        self.live
    }
}

impl ChartBackend for EguiBackend {
    type Instance = PlotModel;

    fn create(&mut self, slot: ChartSlot, figure: &Figure) -> Result<PlotModel> {
        self.serial += 1;
        self.live += 1;
        Ok(build_model(
            format!("{}-{}", slot.id(), self.serial),
            figure,
        ))
    }

    fn destroy(&mut self, slot: ChartSlot, instance: PlotModel) {
        self.live = self.live.saturating_sub(1);
        debug!("released plot {} for {slot}", instance.plot_id);
    }
}

fn build_model(plot_id: String, figure: &Figure) -> PlotModel {
    let groups = figure.bar_series().count().max(1);
    let width = 0.8 / groups as f64;
    let mut bars = Vec::new();
    let mut points = Vec::new();
    let mut group = 0;
    for series in &figure.series {
        match series {
            Series::Bar(bar) => {
                let shift = (group as f64 - (groups - 1) as f64 / 2.0) * width;
                let laid_out = bar
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let label = bar.categories.get(i).cloned().unwrap_or_default();
                        Bar::new(i as f64 + shift, *value)
                            .width(width)
                            .fill(color32(bar.color_at(i), bar.opacity))
                            .name(label)
                    })
                    .collect();
                bars.push(BarGroup {
                    name: bar.name.clone(),
                    bars: laid_out,
                });
                group += 1;
            }
            Series::Scatter(scatter) => points.push(PointCloud {
                name: scatter.name.clone(),
                points: scatter.points.clone(),
                color: color32(scatter.color, scatter.opacity),
                radius: scatter.radius,
            }),
        }
    }
    PlotModel {
        plot_id,
        bars,
        points,
        x_label: figure.x.label.clone(),
        y_label: figure.y.label.clone(),
    }
}
