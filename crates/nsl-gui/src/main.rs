mod charts;

use charts::EguiBackend;
use clap::Parser;
use eframe::{egui, egui::ViewportBuilder};
use log::{debug, error, warn};
use nsl_lib::download::{download_url, Partition};
use nsl_lib::transform::correlation::Strength;
use nsl_lib::{
    ActionId, ConfigError, Dashboard, DashboardConfig, HttpStageClient, SelectedFile, StageId,
    StageRunner, Table,
};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nsl-gui", version, about = "Desktop dashboard for the NSL-KDD analysis stages")]
struct Args {
    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Service root, overrides config and NSL_DASH_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
}

impl Args {
    fn resolve(&self) -> Result<DashboardConfig, ConfigError> {
        let mut config = DashboardConfig::resolve(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = match args.resolve() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}; falling back to defaults");
            DashboardConfig::default()
        }
    };
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1100.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "NSL-KDD Analysis Dashboard",
        native_options,
        Box::new(move |cc| Ok(Box::new(NslApp::new(config, cc.egui_ctx.clone())))),
    )
}

/// Deferred user intent, applied after the frame's panels release their borrows.
enum Command {
    Pick,
    Trigger(ActionId),
    Download(Partition),
}

struct NslApp {
    dashboard: Dashboard<EguiBackend>,
    runner: StageRunner,
    base_url: String,
    status: String,
}

impl NslApp {
    fn new(config: DashboardConfig, ctx: egui::Context) -> Self {
        let client = Arc::new(HttpStageClient::new(&config.base_url));
        let runner = StageRunner::new(client).with_notifier(move || ctx.request_repaint());
        Self {
            dashboard: Dashboard::new(EguiBackend::default(), config.limits()),
            runner,
            base_url: config.base_url,
            status: "No file selected".into(),
        }
    }

    fn pick_file(&mut self) {
        let Some(path) = FileDialog::new().add_filter("ARFF", &["arff"]).pick_file() else {
            return;
        };
        let candidate = SelectedFile::from_path(&path);
        match self.dashboard.select_file(Some(candidate)) {
            Ok(()) => self.status = format!("Selected {}", path.display()),
            Err(err) => debug!("selection rejected: {err}"),
        }
    }

    fn trigger(&mut self, action: ActionId) {
        if let Err(err) = self.runner.trigger(&mut self.dashboard, action) {
            debug!("{} not started: {err}", action.label());
        }
    }

    fn open_download(&mut self, partition: Partition) {
        let url = download_url(&self.base_url, partition);
        match open::that(&url) {
            Ok(()) => self.status = format!("Opened {url}"),
            Err(err) => {
                warn!("cannot open {url}: {err}");
                self.status = format!("Cannot open browser: {err}");
            }
        }
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::Pick => self.pick_file(),
            Command::Trigger(action) => self.trigger(action),
            Command::Download(partition) => self.open_download(partition),
        }
    }

    fn action_button(&self, ui: &mut egui::Ui, action: ActionId, commands: &mut Vec<Command>) {
        let session = self.dashboard.session();
        let loading = session.is_loading(action);
        let label = if loading {
            "Running...".to_string()
        } else {
            action.label().to_string()
        };
        let enabled = !loading && session.file().is_some();
        if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
            commands.push(Command::Trigger(action));
        }
    }

    fn show_controls(&self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        ui.heading("NSL-KDD analysis");
        ui.horizontal(|ui| {
            if ui.button("Choose ARFF file...").clicked() {
                commands.push(Command::Pick);
            }
            match self.dashboard.session().file() {
                Some(file) => {
                    ui.monospace(file.name());
                    if let Some(size) = file.size_label() {
                        ui.weak(size);
                    }
                }
                None => {
                    ui.weak("no file");
                }
            }
        });
        ui.horizontal_wrapped(|ui| {
            for stage in StageId::ORDER {
                self.action_button(ui, ActionId::Stage(stage), commands);
            }
            ui.separator();
            self.action_button(ui, ActionId::RunAll, commands);
            if self.dashboard.session().any_loading() {
                ui.spinner();
            }
        });
        if let Some(message) = self.dashboard.session().errors().current() {
            ui.colored_label(egui::Color32::from_rgb(239, 68, 68), message);
        }
    }

    fn show_stage(&self, ui: &mut egui::Ui, stage: StageId, commands: &mut Vec<Command>) {
        let Some(tables) = self.dashboard.tables(stage) else {
            ui.weak("Not run for this file yet.");
            return;
        };
        match tables {
            Ok(tables) => {
                for (index, table) in tables.iter().enumerate() {
                    let emphasise = stage == StageId::Correlation && index == 0;
                    show_table(ui, stage, index, table, emphasise);
                }
            }
            Err(err) => {
                ui.colored_label(egui::Color32::from_rgb(245, 158, 11), err.to_string());
            }
        }
        for slot in stage.slots() {
            if let Some(handle) = self.dashboard.charts().get(*slot) {
                if let Some(title) = &handle.figure().title {
                    ui.label(egui::RichText::new(title).strong());
                }
                handle.instance().show(ui, 220.0);
            }
        }
        if stage == StageId::Split {
            ui.horizontal(|ui| {
                for partition in Partition::ALL {
                    if ui.button(format!("Download {}", partition.label())).clicked() {
                        commands.push(Command::Download(partition));
                    }
                }
            });
        }
    }
}

fn show_table(ui: &mut egui::Ui, stage: StageId, index: usize, table: &Table, emphasise: bool) {
    ui.label(egui::RichText::new(&table.title).strong());
    egui::ScrollArea::horizontal()
        .id_salt((stage.key(), index))
        .show(ui, |ui| {
            egui::Grid::new((stage.key(), "table", index))
                .striped(true)
                .show(ui, |ui| {
                    for cell in &table.header {
                        ui.label(egui::RichText::new(cell).strong());
                    }
                    ui.end_row();
                    for row in &table.rows {
                        for (column, cell) in row.iter().enumerate() {
                            match cell.parse::<f64>() {
                                Ok(value) if emphasise && column > 0 => {
                                    let text = egui::RichText::new(cell);
                                    let text = match Strength::of(value) {
                                        Strength::High => text.strong(),
                                        Strength::Medium => text,
                                        Strength::Low => text.weak(),
                                    };
                                    ui.label(text);
                                }
                                _ => {
                                    ui.label(cell);
                                }
                            }
                        }
                        ui.end_row();
                    }
                });
        });
    ui.add_space(6.0);
}

impl Drop for NslApp {
    fn drop(&mut self) {
        self.dashboard.charts_mut().destroy_all();
    }
}

impl eframe::App for NslApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.runner.drain_into(&mut self.dashboard);
        let mut commands = Vec::new();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.show_controls(ui, &mut commands);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.separator();
                ui.weak(&self.base_url);
                if self.runner.pending() > 0 {
                    ui.separator();
                    ui.label(format!("{} request(s) in flight", self.runner.pending()));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for stage in StageId::ORDER {
                    egui::CollapsingHeader::new(stage.title())
                        .id_salt(stage.key())
                        .default_open(true)
                        .show(ui, |ui| self.show_stage(ui, stage, &mut commands));
                }
            });
        });

        for command in commands {
            self.run(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_flag_overrides_defaults() {
        let args = Args::try_parse_from(["nsl-gui", "--base-url", "http://ids.local:9000"]).unwrap();
        assert_eq!(args.resolve().unwrap().base_url, "http://ids.local:9000");
    }

    #[test]
    fn stray_arguments_are_rejected() {
        assert!(Args::try_parse_from(["nsl-gui", "settings.toml"]).is_err());
        let invalid = Args::try_parse_from(["nsl-gui", "--base-url", "ftp://x"]).unwrap();
        assert!(invalid.resolve().is_err());
    }
}
