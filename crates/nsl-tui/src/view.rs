use nsl_lib::plot::{BarSeries, Color as PlotColor, Figure, Series};
use nsl_lib::transform::correlation::Strength;
use nsl_lib::{ActionId, StageId, Table};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, List,
        ListItem, Paragraph, Row, Table as TableWidget, Wrap,
    },
    Frame,
};

use crate::App;

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let size = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);
    draw_input(f, layout[0], app);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(layout[1]);
    draw_stages(f, body[0], app);
    draw_detail(f, body[1], app);
    draw_status(f, layout[2], app);
}

fn draw_input(f: &mut Frame<'_>, area: Rect, app: &App) {
    let style = if app.editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let title = match app.dashboard.session().file() {
        Some(file) => match file.size_label() {
            Some(size) => format!("ARFF file (selected: {}, {size})", file.name()),
            None => format!("ARFF file (selected: {})", file.name()),
        },
        None => "ARFF file (Enter to select)".to_string(),
    };
    let paragraph = Paragraph::new(app.path.value())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
    if app.editing {
        let cursor_x = area.x + 1 + app.path.cursor_column();
        f.set_cursor(cursor_x.min(area.right().saturating_sub(2)), area.y + 1);
    }
}

fn draw_stages(f: &mut Frame<'_>, area: Rect, app: &App) {
    let session = app.dashboard.session();
    let mut items: Vec<ListItem> = StageId::ORDER
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let marker = if session.is_loading(ActionId::Stage(*stage)) {
                "..."
            } else if session.store().get(*stage).is_some() {
                "[x]"
            } else {
                "[ ]"
            };
            let style = if *stage == app.viewing {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(format!("{} {marker} {}", i + 1, stage.title()))).style(style)
        })
        .collect();
    let run_all = if session.is_loading(ActionId::RunAll) {
        "a ... Run all stages"
    } else {
        "a     Run all stages"
    };
    items.push(ListItem::new(""));
    items.push(ListItem::new(run_all));
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Stages"));
    f.render_widget(list, area);
}

fn draw_detail(f: &mut Frame<'_>, area: Rect, app: &App) {
    let stage = app.viewing;
    let block = Block::default().borders(Borders::ALL).title(stage.title());
    let tables = match app.dashboard.tables(stage) {
        None => {
            let hint = Paragraph::new("Not run for this file yet.")
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(hint, area);
            return;
        }
        Some(Err(err)) => {
            let message = Paragraph::new(err.to_string())
                .style(Style::default().fg(Color::Yellow))
                .block(block)
                .wrap(Wrap { trim: true });
            f.render_widget(message, area);
            return;
        }
        Some(Ok(tables)) => tables,
    };
    let inner = block.inner(area);
    f.render_widget(block, area);

    let figures: Vec<&Figure> = stage
        .slots()
        .iter()
        .filter_map(|slot| app.dashboard.figure(*slot))
        .collect();
    let sections = if figures.is_empty() {
        vec![inner]
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner)
            .to_vec()
    };
    draw_tables(f, sections[0], stage, &tables);
    if let Some(chart_area) = sections.get(1) {
        draw_figures(f, *chart_area, &figures);
    }
}

fn draw_tables(f: &mut Frame<'_>, area: Rect, stage: StageId, tables: &[Table]) {
    if tables.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = tables
        .iter()
        .map(|table| Constraint::Length(table.rows.len() as u16 + 3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    for (index, table) in tables.iter().enumerate() {
        let emphasise = stage == StageId::Correlation && index == 0;
        draw_table(f, chunks[index], table, emphasise);
    }
}

fn draw_table(f: &mut Frame<'_>, area: Rect, table: &Table, emphasise: bool) {
    let header = Row::new(table.header.clone()).style(Style::default().add_modifier(Modifier::BOLD));
    let rows = table.rows.iter().map(|row| {
        Row::new(row.iter().enumerate().map(|(column, cell)| {
            let style = match cell.parse::<f64>() {
                Ok(value) if emphasise && column > 0 => strength_style(value),
                _ => Style::default(),
            };
            Cell::from(cell.as_str()).style(style)
        }))
    });
    let widths: Vec<Constraint> = column_widths(table)
        .into_iter()
        .map(|w| Constraint::Length(w as u16))
        .collect();
    let widget = TableWidget::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .block(Block::default().title(table.title.as_str()));
    f.render_widget(widget, area);
}

fn strength_style(value: f64) -> Style {
    match Strength::of(value) {
        Strength::High => Style::default().add_modifier(Modifier::BOLD),
        Strength::Medium => Style::default(),
        Strength::Low => Style::default().add_modifier(Modifier::DIM),
    }
}

fn column_widths(table: &Table) -> Vec<usize> {
    let mut widths = vec![0; table.header.len()];
    for row in std::iter::once(&table.header).chain(&table.rows) {
        for (i, cell) in row.iter().enumerate() {
            if i >= widths.len() {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    widths
}

fn draw_figures(f: &mut Frame<'_>, area: Rect, figures: &[&Figure]) {
    let share = 100 / figures.len().max(1) as u16;
    let constraints: Vec<Constraint> = figures
        .iter()
        .map(|_| Constraint::Percentage(share))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);
    for (figure, chunk) in figures.iter().zip(chunks.iter()) {
        let scatter = figure
            .series
            .iter()
            .any(|series| matches!(series, Series::Scatter(_)));
        if scatter {
            draw_scatter(f, *chunk, figure);
        } else {
            draw_bars(f, *chunk, figure);
        }
    }
}

fn rgb(color: PlotColor) -> Color {
    Color::Rgb(color.r(), color.g(), color.b())
}

/// Bar heights must be unsigned integers, so fractional series are scaled by 100.
fn bar_scale(figure: &Figure) -> f64 {
    let fractional = figure
        .bar_series()
        .flat_map(|bar| bar.values.iter())
        .all(|v| v.abs() <= 1.0);
    if fractional {
        100.0
    } else {
        1.0
    }
}

fn bar_value(value: f64, scale: f64) -> u64 {
    if value.is_finite() {
        (value.abs() * scale).round() as u64
    } else {
        0
    }
}

fn bar_group<'a>(series: &'a BarSeries, scale: f64, grouped: bool) -> BarGroup<'a> {
    let bars: Vec<Bar> = series
        .values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let text = if scale > 1.0 {
                format!("{value:.2}")
            } else {
                format!("{value}")
            };
            let mut bar = Bar::default()
                .value(bar_value(*value, scale))
                .text_value(text)
                .style(Style::default().fg(rgb(series.color_at(i))));
            if let Some(category) = series.categories.get(i) {
                bar = bar.label(Line::from(category.as_str()));
            }
            bar
        })
        .collect();
    let group = BarGroup::default().bars(&bars);
    if grouped {
        group.label(Line::from(series.name.as_str()))
    } else {
        group
    }
}

fn draw_bars(f: &mut Frame<'_>, area: Rect, figure: &Figure) {
    let scale = bar_scale(figure);
    let count = figure.bar_series().count();
    let title = figure.title.clone().unwrap_or_default();
    let mut chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .bar_width(if count > 1 { 3 } else { 7 })
        .bar_gap(1)
        .group_gap(2);
    for series in figure.bar_series() {
        chart = chart.data(bar_group(series, scale, count > 1));
    }
    f.render_widget(chart, area);
}

fn draw_scatter(f: &mut Frame<'_>, area: Rect, figure: &Figure) {
    let points: Vec<Vec<(f64, f64)>> = figure
        .series
        .iter()
        .filter_map(|series| match series {
            Series::Scatter(scatter) => {
                Some(scatter.points.iter().map(|p| (p[0], p[1])).collect())
            }
            Series::Bar(_) => None,
        })
        .collect();
    let datasets: Vec<Dataset> = figure
        .series
        .iter()
        .filter_map(|series| match series {
            Series::Scatter(scatter) => Some(scatter),
            Series::Bar(_) => None,
        })
        .zip(points.iter())
        .map(|(scatter, data)| {
            Dataset::default()
                .name(scatter.name.as_str())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(rgb(scatter.color)))
                .data(data)
        })
        .collect();
    let (x_min, x_max, y_min, y_max) = figure.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let axis = |label: &Option<String>, low: f64, high: f64| {
        Axis::default()
            .title(label.clone().unwrap_or_default())
            .bounds([low, high])
            .labels(vec![
                Span::raw(format!("{low:.1}")),
                Span::raw(format!("{high:.1}")),
            ])
    };
    let title = figure.title.clone().unwrap_or_default();
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(axis(&figure.x.label, x_min, x_max))
        .y_axis(axis(&figure.y.label, y_min, y_max));
    f.render_widget(chart, area);
}

fn draw_status(f: &mut Frame<'_>, area: Rect, app: &App) {
    let session = app.dashboard.session();
    let line = match session.errors().current() {
        Some(message) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => {
            let mut text = format!("{}  |  {}", app.status, app.base_url);
            if app.runner.pending() > 0 {
                text.push_str(&format!("  |  {} request(s) in flight", app.runner.pending()));
            }
            Line::from(text)
        }
    };
    let status = Paragraph::new(line)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Status  (Tab path, 1-6 stage, a all, q quit)"),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(status, area);
}
