//! Ratatui-based terminal dashboard.
//!
//! Tabs show the balance sheet components, composition, growth, stress
//! indicators and foreign sector series. A settings panel toggles series,
//! edits the start date and API key, and picks the series for the growth
//! chart. Every settings change queues a new run on the worker thread; only
//! the newest run's result is ever shown.

use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs},
};

use crate::app::DashboardConfig;
use crate::app::pipeline::{RunError, RunOutput};
use crate::data::{SeriesRegistry, SeriesRole};
use crate::domain::{StressLevel, StressThreshold};
use crate::error::AppError;
use crate::report::{fmt_billions, fmt_pct, fmt_signed_billions, lag_label};

mod plotters_chart;
pub mod worker;

use plotters_chart::{ChartLine, TimeSeriesChart, day_number};
use worker::{Worker, WorkerContext, WorkerResponse};

const PALETTE: [RGBColor; 8] = [
    RGBColor(0x4e, 0x9a, 0xf1),
    RGBColor(0xf2, 0x8e, 0x2b),
    RGBColor(0x59, 0xc9, 0x5b),
    RGBColor(0xe1, 0x57, 0x59),
    RGBColor(0xb0, 0x7a, 0xd6),
    RGBColor(0x76, 0xd7, 0xd2),
    RGBColor(0xed, 0xc9, 0x48),
    RGBColor(0xff, 0x9d, 0xa7),
];
const ELEVATED_COLOR: RGBColor = RGBColor(0xed, 0xc9, 0x48);
const SEVERE_COLOR: RGBColor = RGBColor(0xe1, 0x57, 0x59);

/// Start the TUI.
pub fn run(config: DashboardConfig) -> Result<(), AppError> {
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Components,
    Composition,
    Growth,
    Stress,
    Foreign,
}

impl Tab {
    const ALL: [Tab; 5] = [Tab::Components, Tab::Composition, Tab::Growth, Tab::Stress, Tab::Foreign];

    fn title(self) -> &'static str {
        match self {
            Tab::Components => "Components",
            Tab::Composition => "Composition",
            Tab::Growth => "Growth",
            Tab::Stress => "Stress",
            Tab::Foreign => "Foreign",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// Rows of the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    StartDate,
    ApiKey,
    GrowthSeries,
    /// Index into the registry entries.
    Series(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Editing {
    StartDate,
    ApiKey,
}

struct App {
    config: DashboardConfig,
    worker: Worker,
    tab: Tab,
    selected_field: usize,
    editing: Option<Editing>,
    input: String,
    /// Index into the loaded display columns.
    growth_series: usize,
    run: Option<RunOutput>,
    pending: Option<u64>,
    status: String,
}

impl App {
    fn new(config: DashboardConfig) -> Result<Self, AppError> {
        let worker = Worker::spawn(WorkerContext {
            registry: config.registry.clone(),
            thresholds: config.thresholds.clone(),
            source: Box::new(config.client()?),
        })?;

        let mut app = Self {
            config,
            worker,
            tab: Tab::Components,
            selected_field: 0,
            editing: None,
            input: String::new(),
            growth_series: 0,
            run: None,
            pending: None,
            status: String::new(),
        };

        if app.config.credential.is_some() {
            app.request_run()?;
        } else {
            app.selected_field = 1;
            app.status = "No FRED API key: select 'API key' and press Enter to set one.".to_string();
        }
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.poll_worker() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply the newest worker result, if any. Returns true when state changed.
    fn poll_worker(&mut self) -> bool {
        let Some(resp) = self.worker.poll() else {
            return false;
        };
        if self.pending != Some(resp.run_id()) {
            return false;
        }
        self.pending = None;

        match resp {
            WorkerResponse::Finished { output, .. } => {
                self.status = run_status(&output);
                self.run = Some(*output);
                self.clamp_growth_series();
            }
            WorkerResponse::Failed { error, .. } => {
                self.status = match &error {
                    RunError::Unauthorized => {
                        "FRED rejected the API key: select 'API key' and enter a valid one.".to_string()
                    }
                    other => format!("Run failed: {other}"),
                };
                self.run = None;
            }
        }
        true
    }

    fn request_run(&mut self) -> Result<(), AppError> {
        if self.config.selection.is_empty() {
            self.worker.cancel();
            self.pending = None;
            self.run = None;
            self.status = "Select at least one series.".to_string();
            return Ok(());
        }
        match self.config.params() {
            Ok(params) => {
                let n = params.selection.len();
                self.pending = Some(self.worker.request(params)?);
                self.status = format!("Fetching {n} series from FRED...");
            }
            Err(err) => self.status = err.message().to_string(),
        }
        Ok(())
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::StartDate, Field::ApiKey, Field::GrowthSeries];
        fields.extend((0..self.config.registry.entries().len()).map(Field::Series));
        fields
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        if self.editing.is_some() {
            return self.handle_edit(code);
        }

        let fields = self.fields();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.tab = Tab::ALL[idx];
            }
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field + 1 < fields.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(fields[self.selected_field], -1),
            KeyCode::Right => self.adjust_field(fields[self.selected_field], 1),
            KeyCode::Enter | KeyCode::Char(' ') => match fields[self.selected_field] {
                Field::StartDate => {
                    self.editing = Some(Editing::StartDate);
                    self.input = self.config.start_date.to_string();
                    self.status = "Editing start date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
                }
                Field::ApiKey => {
                    self.editing = Some(Editing::ApiKey);
                    self.input.clear();
                    self.status = "Enter FRED API key. Enter to apply, Esc to cancel.".to_string();
                }
                Field::GrowthSeries => self.adjust_field(Field::GrowthSeries, 1),
                Field::Series(idx) => {
                    self.toggle_series(idx);
                    self.request_run()?;
                }
            },
            KeyCode::Char('r') => self.request_run()?,
            _ => {}
        }

        Ok(false)
    }

    fn handle_edit(&mut self, code: KeyCode) -> Result<bool, AppError> {
        let Some(editing) = self.editing else {
            return Ok(false);
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.input.clear();
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = None;
                let input = std::mem::take(&mut self.input);
                match editing {
                    Editing::StartDate => self.apply_start_date(input.trim())?,
                    Editing::ApiKey => self.apply_api_key(input.trim())?,
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => match editing {
                Editing::StartDate if c.is_ascii_digit() || c == '-' => self.input.push(c),
                Editing::ApiKey if c.is_ascii_alphanumeric() => self.input.push(c),
                _ => {}
            },
            _ => {}
        }
        Ok(false)
    }

    fn adjust_field(&mut self, field: Field, delta: i32) {
        if field != Field::GrowthSeries {
            return;
        }
        let n = self.run.as_ref().map_or(0, |r| r.display.columns.len());
        if n == 0 {
            return;
        }
        self.growth_series = if delta >= 0 {
            (self.growth_series + 1) % n
        } else {
            (self.growth_series + n - 1) % n
        };
    }

    fn apply_start_date(&mut self, input: &str) -> Result<(), AppError> {
        let date = match NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                self.status = format!("Invalid date '{input}': {e}");
                return Ok(());
            }
        };
        if date > Local::now().date_naive() {
            self.status = format!("Start date {date} is in the future.");
            return Ok(());
        }
        self.config.start_date = date;
        self.request_run()
    }

    fn apply_api_key(&mut self, input: &str) -> Result<(), AppError> {
        if input.is_empty() {
            self.status = "API key unchanged.".to_string();
            return Ok(());
        }
        self.config.credential = Some(input.to_string());
        self.request_run()
    }

    fn toggle_series(&mut self, idx: usize) {
        let Some(entry) = self.config.registry.entries().get(idx) else {
            return;
        };
        let label = entry.label.clone();
        self.config.selection = toggled_selection(&self.config.registry, &self.config.selection, &label);
    }

    fn clamp_growth_series(&mut self) {
        let n = self.run.as_ref().map_or(0, |r| r.display.columns.len());
        if self.growth_series >= n {
            self.growth_series = 0;
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let as_of = self
            .run
            .as_ref()
            .and_then(|r| r.display.last_date())
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let title = Line::from(vec![
            Span::styled("fedbs", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | Federal Reserve balance sheet | from {} | as of {as_of} ", self.config.start_date)),
        ]);

        let tabs = Tabs::new(Tab::ALL.iter().enumerate().map(|(i, t)| format!("{} {}", i + 1, t.title())))
            .select(self.tab.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(tabs, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(46)])
            .split(area);

        self.draw_tab(frame, chunks[0]);

        let settings_height = (self.fields().len() as u16 + 2).min(chunks[1].height / 2 + 4);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(settings_height)])
            .split(chunks[1]);

        self.draw_key_metrics(frame, side[0]);
        self.draw_settings(frame, side[1]);
    }

    fn draw_tab(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(run) = &self.run else {
            let block = Block::default().title(self.tab.title()).borders(Borders::ALL);
            let msg = if self.pending.is_some() {
                "Waiting for data..."
            } else {
                "No data loaded."
            };
            frame.render_widget(
                Paragraph::new(msg).style(Style::default().fg(Color::Yellow)).block(block),
                area,
            );
            return;
        };
        let registry = &self.config.registry;

        match self.tab {
            Tab::Components => {
                let lines = table_lines(&run.display, &run.display.columns);
                draw_chart(frame, area, "Balance sheet components", &lines, &[], "$B");
            }
            Tab::Composition => match &run.composition {
                Some(comp) => {
                    let lines = table_lines(comp, &comp.columns);
                    draw_chart(frame, area, "Composition (% of total assets)", &lines, &[], "%");
                }
                None => draw_message(
                    frame,
                    area,
                    self.tab.title(),
                    "Total Assets is needed for the composition view.",
                ),
            },
            Tab::Growth => {
                let Some(label) = run.display.columns.get(self.growth_series) else {
                    draw_message(frame, area, self.tab.title(), "No data available for growth analysis.");
                    return;
                };
                let lines: Vec<(String, Vec<(NaiveDate, f64)>)> = run
                    .growth
                    .lags
                    .iter()
                    .map(|&lag| (format!("{} growth", lag_label(lag)), run.growth.column_series(label, lag)))
                    .collect();
                draw_chart(frame, area, &format!("{label} growth rates"), &lines, &[], "%");
            }
            Tab::Stress => self.draw_stress(frame, area, run, registry),
            Tab::Foreign => {
                let cols = present_with_role(registry, run, SeriesRole::Foreign);
                if cols.is_empty() {
                    draw_message(
                        frame,
                        area,
                        self.tab.title(),
                        "Select 'Reverse Repo Foreign' and/or 'Securities in Custody' to view foreign sector activity.",
                    );
                } else {
                    let lines = table_lines(&run.display, &cols);
                    draw_chart(frame, area, "Foreign official sector", &lines, &[], "$B");
                }
            }
        }
    }

    fn draw_stress(&self, frame: &mut ratatui::Frame<'_>, area: Rect, run: &RunOutput, registry: &SeriesRegistry) {
        let cols = present_with_role(registry, run, SeriesRole::Stress);
        if cols.is_empty() {
            draw_message(
                frame,
                area,
                self.tab.title(),
                "Select 'Central Bank Liquidity Swaps' and/or 'Loans' to view stress indicators.",
            );
            return;
        }

        let constraints: Vec<Constraint> = cols
            .iter()
            .map(|_| Constraint::Ratio(1, cols.len() as u32))
            .collect();
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (col, pane) in cols.iter().zip(panes.iter()) {
            let lines = table_lines(&run.display, std::slice::from_ref(col));
            let reading = run.stress.iter().find(|r| &r.label == col);
            let title = match reading {
                Some(r) => format!("{col}: {} ({})", fmt_billions(r.value), r.level.display_name()),
                None => col.clone(),
            };
            let thresholds = self
                .config
                .thresholds
                .for_label(registry, col)
                .map(threshold_lines)
                .unwrap_or_default();
            draw_chart(frame, *pane, &title, &lines, &thresholds, "$B");
        }
    }

    fn draw_key_metrics(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Key Metrics").borders(Borders::ALL);
        let Some(run) = &self.run else {
            frame.render_widget(Paragraph::new("-").block(block), area);
            return;
        };

        let mut lines: Vec<Line> = Vec::new();
        if run.display.len() < 2 {
            lines.push(Line::from(Span::styled(
                "Insufficient data for metrics comparison",
                Style::default().fg(Color::Yellow),
            )));
        }
        for col in &run.display.columns {
            let Some(delta) = run.deltas.get(col) else {
                continue;
            };
            let color = if delta.absolute > 0.0 {
                Color::Green
            } else if delta.absolute < 0.0 {
                Color::Red
            } else {
                Color::Gray
            };
            lines.push(Line::from(Span::styled(col.clone(), Style::default().add_modifier(Modifier::BOLD))));
            lines.push(Line::from(vec![
                Span::raw(format!("  {:>10}  ", fmt_billions(delta.current))),
                Span::styled(
                    format!("{} ({})", fmt_signed_billions(delta.absolute), fmt_pct(delta.percent)),
                    Style::default().fg(color),
                ),
            ]));
        }

        if !run.stress.is_empty() {
            lines.push(Line::raw(""));
            for reading in &run.stress {
                lines.push(Line::from(vec![
                    Span::raw(format!("{}: ", reading.label)),
                    Span::styled(reading.level.display_name(), Style::default().fg(level_color(reading.level))),
                ]));
            }
        }

        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let selected: BTreeSet<&str> = self.config.selection.iter().map(String::as_str).collect();
        let growth_label = self
            .run
            .as_ref()
            .and_then(|r| r.display.columns.get(self.growth_series))
            .map(String::as_str)
            .unwrap_or("-");

        let items: Vec<ListItem> = self
            .fields()
            .into_iter()
            .map(|field| match field {
                Field::StartDate => {
                    let value = if self.editing == Some(Editing::StartDate) {
                        format!("{}_", self.input)
                    } else {
                        self.config.start_date.to_string()
                    };
                    ListItem::new(format!("Start date: {value}"))
                }
                Field::ApiKey => {
                    let value = if self.editing == Some(Editing::ApiKey) {
                        format!("{}_", mask_key(&self.input))
                    } else {
                        self.config.credential.as_deref().map_or("(not set)".to_string(), mask_key)
                    };
                    ListItem::new(format!("API key: {value}"))
                }
                Field::GrowthSeries => ListItem::new(format!("Growth series: < {growth_label} >")),
                Field::Series(idx) => {
                    let label = self.config.registry.entries().get(idx).map_or("", |e| e.label.as_str());
                    let mark = if selected.contains(label) { "[x]" } else { "[ ]" };
                    ListItem::new(format!("{mark} {label}"))
                }
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab/1-5 view  ↑/↓ select  Enter/Space edit or toggle  ←/→ growth series  r refresh  q quit";
        let mut lines = vec![Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ])];

        if let Some(run) = &self.run {
            if !run.failures.is_empty() {
                let failed: Vec<String> = run
                    .failures
                    .iter()
                    .map(|f| format!("{} ({})", f.label, f.error))
                    .collect();
                lines.push(Line::from(Span::styled(
                    format!("Failed: {}", failed.join(", ")),
                    Style::default().fg(Color::Red),
                )));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn run_status(run: &RunOutput) -> String {
    format!(
        "Loaded {} of {} series ({} weekly rows).",
        run.loaded(),
        run.requested.len(),
        run.display.len()
    )
}

/// Selection after toggling `label`, kept in registry order.
fn toggled_selection(registry: &SeriesRegistry, current: &[String], label: &str) -> Vec<String> {
    let mut set: BTreeSet<&str> = current.iter().map(String::as_str).collect();
    if !set.remove(label) {
        set.insert(label);
    }
    registry
        .labels()
        .into_iter()
        .filter(|l| set.contains(l))
        .map(str::to_string)
        .collect()
}

/// Loaded display columns with the given role, in registry order.
fn present_with_role(registry: &SeriesRegistry, run: &RunOutput, role: SeriesRole) -> Vec<String> {
    registry
        .labels_with_role(role)
        .into_iter()
        .filter(|l| run.display.has_column(l))
        .map(str::to_string)
        .collect()
}

fn table_lines(table: &crate::domain::Table, cols: &[String]) -> Vec<(String, Vec<(NaiveDate, f64)>)> {
    cols.iter().map(|c| (c.clone(), table.column_series(c))).collect()
}

fn threshold_lines(t: StressThreshold) -> Vec<(f64, RGBColor)> {
    vec![(t.elevated, ELEVATED_COLOR), (t.severe, SEVERE_COLOR)]
}

fn level_color(level: StressLevel) -> Color {
    match level {
        StressLevel::Normal => Color::Green,
        StressLevel::Elevated => Color::Yellow,
        StressLevel::Severe => Color::Red,
    }
}

fn to_ratatui(c: RGBColor) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Show only the last four characters of a key.
fn mask_key(key: &str) -> String {
    let n = key.chars().count();
    if n <= 4 {
        return "*".repeat(n);
    }
    let tail: String = key.chars().skip(n - 4).collect();
    format!("{}{tail}", "*".repeat(n - 4))
}

fn draw_message(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, msg: &str) {
    let p = Paragraph::new(msg)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(p, area);
}

/// Plot labeled date series in a bordered block with a one-line legend.
fn draw_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    series: &[(String, Vec<(NaiveDate, f64)>)],
    thresholds: &[(f64, RGBColor)],
    y_label: &str,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let lines: Vec<ChartLine> = series
        .iter()
        .enumerate()
        .map(|(i, (_, points))| ChartLine {
            points: points.iter().map(|&(d, v)| (day_number(d), v)).collect(),
            color: PALETTE[i % PALETTE.len()],
        })
        .collect();

    let levels: Vec<f64> = thresholds.iter().map(|&(v, _)| v).collect();
    let Some((x_bounds, y_bounds)) = plotters_chart::bounds(&lines, &levels) else {
        frame.render_widget(
            Paragraph::new("No observations in range.").style(Style::default().fg(Color::Yellow)),
            inner,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let widget = TimeSeriesChart {
        lines: &lines,
        thresholds,
        x_bounds,
        y_bounds,
        y_label,
    };
    frame.render_widget(widget, chunks[0]);

    let mut legend: Vec<Span> = Vec::new();
    for (i, (label, _)) in series.iter().enumerate() {
        legend.push(Span::styled("■ ", Style::default().fg(to_ratatui(PALETTE[i % PALETTE.len()]))));
        legend.push(Span::raw(format!("{label}  ")));
    }
    frame.render_widget(Paragraph::new(Line::from(legend)), chunks[1]);
}
