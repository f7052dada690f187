mod view;

use std::{
    io::{self, Stdout},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, error};
use nsl_lib::{
    ActionId, Dashboard, DashboardConfig, HttpStageClient, MemoryBackend, SelectedFile, StageId,
    StageRunner, StageService,
};
use ratatui::{prelude::CrosstermBackend, Terminal};

#[derive(Parser)]
#[command(name = "nsl-tui", version, about = "Terminal dashboard for the NSL-KDD analysis stages")]
struct Args {
    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Service root, overrides config and NSL_DASH_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
}

impl Args {
    fn resolve(&self) -> Result<DashboardConfig> {
        let mut config = DashboardConfig::resolve(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Args::parse().resolve()?;
    let service = Arc::new(HttpStageClient::new(&config.base_url));
    let mut app = App::new(&config, service);

    let mut terminal = setup_terminal()?;
    let outcome = run(&mut terminal, &mut app);
    restore_terminal()?;
    outcome
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(150);
    while !app.should_quit {
        app.runner.drain_into(&mut app.dashboard);
        terminal.draw(|f| view::draw(f, app))?;
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("initializing terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

#[derive(Default)]
pub struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                true
            }
            KeyCode::Backspace => {
                if let Some(prev) = self.value[..self.cursor].chars().next_back() {
                    self.cursor -= prev.len_utf8();
                    self.value.remove(self.cursor);
                }
                true
            }
            KeyCode::Left => {
                if let Some(prev) = self.value[..self.cursor].chars().next_back() {
                    self.cursor -= prev.len_utf8();
                }
                true
            }
            KeyCode::Right => {
                if let Some(next) = self.value[self.cursor..].chars().next() {
                    self.cursor += next.len_utf8();
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.value.len();
                true
            }
            _ => false,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor_column(&self) -> u16 {
        self.value[..self.cursor].chars().count() as u16
    }
}

pub struct App {
    dashboard: Dashboard<MemoryBackend>,
    runner: StageRunner,
    path: TextField,
    editing: bool,
    /// Stage whose tables and charts fill the detail pane.
    viewing: StageId,
    base_url: String,
    status: String,
    should_quit: bool,
}

impl App {
    fn new(config: &DashboardConfig, service: Arc<dyn StageService>) -> Self {
        Self {
            dashboard: Dashboard::new(MemoryBackend::new(), config.limits()),
            runner: StageRunner::new(service),
            path: TextField::default(),
            editing: true,
            viewing: StageId::Training,
            base_url: config.base_url.clone(),
            status: "Type the path of an ARFF file and press Enter.".into(),
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.editing {
            match key.code {
                KeyCode::Enter => self.select_path(),
                KeyCode::Esc | KeyCode::Tab => self.editing = false,
                _ => {
                    self.path.handle_key(&key);
                }
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Char('f') => self.editing = true,
            KeyCode::Char('a') => self.trigger(ActionId::RunAll),
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                let stage = StageId::ORDER[index];
                self.viewing = stage;
                self.trigger(ActionId::Stage(stage));
            }
            KeyCode::Left | KeyCode::Up => self.step_view(StageId::ORDER.len() - 1),
            KeyCode::Right | KeyCode::Down => self.step_view(1),
            _ => {}
        }
    }

    fn step_view(&mut self, by: usize) {
        let next = (self.viewing.index() + by) % StageId::ORDER.len();
        self.viewing = StageId::ORDER[next];
    }

    fn select_path(&mut self) {
        let raw = self.path.value().trim();
        let candidate = (!raw.is_empty()).then(|| SelectedFile::from_path(raw));
        match self.dashboard.select_file(candidate) {
            Ok(()) => {
                self.status = "File selected. Press 1-6 for a stage, a to run all.".into();
                self.editing = false;
            }
            Err(err) => debug!("selection rejected: {err}"),
        }
    }

    fn trigger(&mut self, action: ActionId) {
        match self.runner.trigger(&mut self.dashboard, action) {
            Ok(()) => self.status = format!("{} started", action.label()),
            Err(err) => error!("{} not started: {err}", action.label()),
        }
    }
}
