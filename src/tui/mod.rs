use std::f64::consts::TAU;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use tracing::{debug, warn};

use crate::core::{
    ComplianceStatus, DESCRIPTION, DashboardView, Distribution, EMPTY_FILTER_MESSAGE,
    FilteredPanel, HostDetail, HostSummary, NO_DATA_MESSAGE, NO_HOST_MESSAGE, SliceColor, TITLE,
    ViewBody,
};
use crate::engine::Engine;
use crate::session::{HostSelector, SessionState};

const RING_INNER: f64 = 0.55;
const RING_OUTER: f64 = 0.98;

pub fn run(engine: Engine, session: SessionState, color: bool) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter the alternate screen")?;

    let mut tui = Tui {
        terminal: Terminal::new(CrosstermBackend::new(stdout))
            .context("failed to initialize the terminal")?,
    };
    tui.terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        run_app(&mut tui.terminal, engine, session, color)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res,
        Err(_) => Err(anyhow::anyhow!(
            "the dashboard panicked (terminal state should have been restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Dashboard,
    Upload,
    Error,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Filters,
    Hosts,
    Details,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Filters => Focus::Hosts,
            Focus::Hosts => Focus::Details,
            Focus::Details => Focus::Filters,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Filters => Focus::Details,
            Focus::Hosts => Focus::Filters,
            Focus::Details => Focus::Hosts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterItem {
    Os(String),
    Status(ComplianceStatus),
}

struct App {
    color: bool,
    session: SessionState,
    view: Option<DashboardView>,
    error: Option<String>,

    screen: Screen,
    help_return_to: Screen,
    focus: Focus,

    filters_cursor: usize,
    hosts_state: TableState,
    detail_state: TableState,

    upload_input: String,
    passes: u64,
}

impl App {
    fn new(color: bool, session: SessionState) -> Self {
        let mut hosts_state = TableState::default();
        hosts_state.select(Some(0));
        let mut detail_state = TableState::default();
        detail_state.select(Some(0));

        Self {
            color,
            session,
            view: None,
            error: None,
            screen: Screen::Dashboard,
            help_return_to: Screen::Dashboard,
            focus: Focus::Hosts,
            filters_cursor: 0,
            hosts_state,
            detail_state,
            upload_input: String::new(),
            passes: 0,
        }
    }

    /// Re-runs the whole pipeline against the current session.
    fn refresh(&mut self, engine: &Engine) {
        match engine.pass(&self.session) {
            Ok(view) => {
                self.passes = self.passes.wrapping_add(1);
                debug!(pass = self.passes, "dashboard refreshed");
                self.view = Some(view);
                self.error = None;
                if self.screen == Screen::Error {
                    self.screen = Screen::Dashboard;
                }
                self.clamp_cursors();
            }
            Err(err) => {
                warn!(error = %err, "dashboard pass failed");
                let msg = err
                    .chain()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("\n  caused by: ");
                self.error = Some(msg);
                self.screen = Screen::Error;
            }
        }
    }

    fn filter_items(&self) -> Vec<FilterItem> {
        let Some(dashboard) = self.view.as_ref().and_then(|v| v.dashboard()) else {
            return Vec::new();
        };
        dashboard
            .observed_os
            .iter()
            .cloned()
            .map(FilterItem::Os)
            .chain(dashboard.observed_status.iter().copied().map(FilterItem::Status))
            .collect()
    }

    fn hosts(&self) -> &[HostSummary] {
        self.view.as_ref().map(|v| v.hosts()).unwrap_or(&[])
    }

    fn selected(&self) -> Option<&HostDetail> {
        self.view.as_ref().and_then(|v| v.selected())
    }

    fn clamp_cursors(&mut self) {
        let filters = self.filter_items().len();
        self.filters_cursor = self.filters_cursor.min(filters.saturating_sub(1));

        let hosts = self.hosts().len();
        let selected_row = self.selected().map(|d| d.row);
        match (hosts, selected_row) {
            (0, _) => self.hosts_state.select(None),
            (_, Some(row)) => self.hosts_state.select(Some(row)),
            (n, None) => {
                let cur = self.hosts_state.selected().unwrap_or(0);
                self.hosts_state.select(Some(cur.min(n - 1)));
            }
        }

        let records = self.selected().map(|d| d.records.len()).unwrap_or(0);
        if records == 0 {
            self.detail_state.select(None);
        } else {
            let cur = self.detail_state.selected().unwrap_or(0);
            self.detail_state.select(Some(cur.min(records - 1)));
        }
    }

    fn move_cursor(&mut self, delta: i32) {
        match self.focus {
            Focus::Filters => {
                let len = self.filter_items().len();
                if len == 0 {
                    return;
                }
                let next = (self.filters_cursor as i32 + delta).clamp(0, len as i32 - 1);
                self.filters_cursor = next as usize;
            }
            Focus::Hosts => {
                let len = self.hosts().len();
                Self::move_table_selection(&mut self.hosts_state, len, delta);
            }
            Focus::Details => {
                let len = self.selected().map(|d| d.records.len()).unwrap_or(0);
                Self::move_table_selection(&mut self.detail_state, len, delta);
            }
        }
    }

    fn move_table_selection(state: &mut TableState, len: usize, delta: i32) {
        if len == 0 {
            state.select(None);
            return;
        }
        let selected = state.selected().unwrap_or(0) as i32;
        let next = (selected + delta).clamp(0, (len as i32).saturating_sub(1));
        state.select(Some(next as usize));
    }

    fn toggle_filter_at_cursor(&mut self) -> bool {
        let Some(item) = self.filter_items().get(self.filters_cursor).cloned() else {
            return false;
        };
        match item {
            FilterItem::Os(os) => self.session.toggle_os(&os),
            FilterItem::Status(status) => self.session.toggle_status(status),
        }
        true
    }

    fn host_at_cursor(&self) -> Option<&HostSummary> {
        let idx = self.hosts_state.selected()?;
        self.hosts().get(idx)
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: Engine,
    session: SessionState,
    color: bool,
) -> Result<()> {
    let mut app = App::new(color, session);
    app.refresh(&engine);

    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &mut app)).context("failed to draw")?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("failed to poll for events")? {
            match event::read().context("failed to read event")? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press && handle_key(&mut app, &engine, key)? {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn open_help(app: &mut App) {
    app.help_return_to = app.screen;
    app.screen = Screen::Help;
}

fn open_upload(app: &mut App) {
    app.upload_input = app
        .session
        .upload()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    app.screen = Screen::Upload;
}

fn submit_upload(app: &mut App, engine: &Engine) {
    let input = app.upload_input.trim();
    let upload = if input.is_empty() {
        None
    } else {
        Some(PathBuf::from(input))
    };
    app.session.set_upload(upload);
    app.screen = Screen::Dashboard;
    app.refresh(engine);
}

fn handle_key(app: &mut App, engine: &Engine, key: KeyEvent) -> Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(true);
    }

    match app.screen {
        Screen::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.screen = app.help_return_to;
            }
            return Ok(false);
        }
        Screen::Upload => {
            match key.code {
                KeyCode::Enter => submit_upload(app, engine),
                KeyCode::Esc => app.screen = Screen::Dashboard,
                KeyCode::Backspace => {
                    app.upload_input.pop();
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.upload_input.clear();
                }
                KeyCode::Char(c) => {
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT)
                    {
                        app.upload_input.push(c);
                    }
                }
                _ => {}
            }
            return Ok(false);
        }
        Screen::Error => {
            match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('r') => app.refresh(engine),
                KeyCode::Char('u') => open_upload(app),
                KeyCode::Char('b') | KeyCode::Esc => app.screen = Screen::Dashboard,
                KeyCode::Char('?') => open_help(app),
                _ => {}
            }
            return Ok(false);
        }
        Screen::Dashboard => {}
    }

    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('?') => open_help(app),
        KeyCode::Char('u') => open_upload(app),
        KeyCode::Char('r') => app.refresh(engine),
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-10),
        KeyCode::PageDown => app.move_cursor(10),
        KeyCode::Char(' ') => match app.focus {
            Focus::Filters => {
                if app.toggle_filter_at_cursor() {
                    app.refresh(engine);
                }
            }
            Focus::Hosts => {
                if let Some(key) = app.host_at_cursor().map(|h| h.key()) {
                    app.session.toggle_host(&key);
                    app.refresh(engine);
                }
            }
            Focus::Details => {}
        },
        KeyCode::Enter => match app.focus {
            Focus::Filters => {
                if app.toggle_filter_at_cursor() {
                    app.refresh(engine);
                }
            }
            Focus::Hosts => {
                if let Some(key) = app.host_at_cursor().map(|h| h.key()) {
                    app.session.select_host(HostSelector::key(&key));
                    app.refresh(engine);
                }
            }
            Focus::Details => {}
        },
        KeyCode::Esc | KeyCode::Char('x') => {
            if app.session.selected_host().is_some() {
                app.session.clear_host();
                app.refresh(engine);
            }
        }
        _ => {}
    }

    Ok(false)
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let failure_lines = app
        .view
        .as_ref()
        .map(|v| v.failures.len().min(3))
        .unwrap_or(0);
    let failures_height = if failure_lines > 0 {
        failure_lines as u16 + 2
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(failures_height),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    if failures_height > 0 {
        draw_failures(f, chunks[1], app);
    }
    draw_footer(f, chunks[3], app);

    match app.screen {
        Screen::Dashboard => draw_dashboard(f, chunks[2], app),
        Screen::Upload => {
            draw_dashboard(f, chunks[2], app);
            draw_upload(f, chunks[2], app);
        }
        Screen::Error => draw_error(f, chunks[2], app),
        Screen::Help => draw_help(f, chunks[2], app),
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let right = format!("v{}", env!("CARGO_PKG_VERSION"));
    let line1 = Line::from(vec![
        Span::styled(TITLE, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(right, Style::default().fg(Color::DarkGray)),
    ]);

    let status = match app.view.as_ref() {
        Some(view) => {
            let rows: usize = view.sources.iter().map(|s| s.rows).sum();
            format!(
                "{}  |  {} file(s), {} row(s)",
                view.upload_message(),
                view.sources.len(),
                rows
            )
        }
        None => "Loading...".to_string(),
    };
    let line2 = Line::from(vec![
        Span::styled(DESCRIPTION, Style::default().add_modifier(Modifier::ITALIC)),
        Span::raw("  "),
        Span::styled(status, Style::default().fg(Color::DarkGray)),
    ]);

    let w = Paragraph::new(Text::from(vec![line1, line2]))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_failures(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let Some(view) = app.view.as_ref() else {
        return;
    };
    let mut lines: Vec<Line> = view
        .failures
        .iter()
        .take(3)
        .map(|fail| {
            Line::from(vec![
                Span::styled("Skipped ", Style::default().fg(Color::Yellow)),
                Span::raw(format!("{}: {}", fail.path, fail.error)),
            ])
        })
        .collect();
    if view.failures.len() > 3 {
        if let Some(last) = lines.last_mut() {
            last.spans
                .push(Span::raw(format!("  (+{} more)", view.failures.len() - 3)));
        }
    }
    let w = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Input errors"))
        .wrap(Wrap { trim: true });
    f.render_widget(w, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let (line1, line2) = match app.screen {
        Screen::Dashboard => {
            let line1 = match app.focus {
                Focus::Filters => "Space/Enter toggle filter | ↑↓/j/k move | Tab focus",
                Focus::Hosts => {
                    "Space toggle row | Enter select | Esc/x clear | ↑↓/j/k move | Tab focus"
                }
                Focus::Details => "↑↓/j/k scroll records | Esc/x clear | Tab focus",
            };
            (line1, "u upload | r reload | q quit | ? help | Ctrl-C force quit")
        }
        Screen::Upload => (
            "Enter load | Backspace delete | Ctrl-U clear | Esc cancel",
            "An empty path removes the upload",
        ),
        Screen::Error => (
            "r retry | u upload | b/Esc back",
            "q quit | Ctrl-C force quit | ? help",
        ),
        Screen::Help => ("Esc/? close", ""),
    };
    let w = Paragraph::new(Text::from(vec![Line::from(line1), Line::from(line2)]))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    f.render_widget(w, area);
}

fn draw_dashboard(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(area);

    draw_filters(f, chunks[0], app);

    let message = match app.view.as_ref().map(|v| &v.body) {
        None => Some("Loading..."),
        Some(ViewBody::NoData) => Some(NO_DATA_MESSAGE),
        Some(ViewBody::Dashboard(d)) => match d.panel {
            FilteredPanel::Empty => Some(EMPTY_FILTER_MESSAGE),
            FilteredPanel::Populated { .. } => None,
        },
    };
    if let Some(message) = message {
        let w = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        f.render_widget(w, chunks[1]);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    if let Some(dist) = app.view.as_ref().and_then(|v| v.distribution()) {
        draw_ring(f, top[0], dist, app.color);
    }
    draw_hosts(f, top[1], app);
    draw_detail(f, rows[1], app);
}

fn draw_filters(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let Some(dashboard) = app.view.as_ref().and_then(|v| v.dashboard()) else {
        let w = Paragraph::new("No filters yet.")
            .block(Block::default().borders(Borders::ALL).title("Filters"));
        f.render_widget(w, area);
        return;
    };

    let os_len = dashboard.observed_os.len();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(os_len as u16 + 2),
            Constraint::Length(dashboard.observed_status.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(area);

    let focused = app.focus == Focus::Filters;
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let os_items: Vec<ListItem> = dashboard
        .observed_os
        .iter()
        .map(|os| ListItem::new(checkbox_line(app.session.is_os_checked(os), os, Style::default())))
        .collect();
    let mut os_state = ListState::default();
    if focused && app.filters_cursor < os_len {
        os_state.select(Some(app.filters_cursor));
    }
    let list = List::new(os_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title("By OS"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, chunks[0], &mut os_state);

    let status_items: Vec<ListItem> = dashboard
        .observed_status
        .iter()
        .map(|s| {
            ListItem::new(checkbox_line(
                app.session.is_status_checked(*s),
                s.as_str(),
                status_style(*s, app.color),
            ))
        })
        .collect();
    let mut status_state = ListState::default();
    if focused && app.filters_cursor >= os_len {
        status_state.select(Some(app.filters_cursor - os_len));
    }
    let list = List::new(status_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title("By Status"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, chunks[1], &mut status_state);
}

fn checkbox_line(checked: bool, label: &str, style: Style) -> Line<'static> {
    let mark = if checked { "[x] " } else { "[ ] " };
    Line::from(vec![
        Span::raw(mark),
        Span::styled(label.to_string(), style),
    ])
}

fn draw_hosts(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let selected_row = app.selected().map(|d| d.row);
    let selection = app
        .selected()
        .map(|d| format!("Selection: {}", d.summary.selection_label()))
        .unwrap_or_else(|| "Selection: None".to_string());

    let header = Row::new(vec![
        "", "#", "Hostname", "OS", "pass", "total", "status", "ratio",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .hosts()
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let mark = if selected_row == Some(i) { "●" } else { " " };
            Row::new(vec![
                Cell::from(mark),
                Cell::from((i + 1).to_string()),
                Cell::from(h.hostname.clone()),
                Cell::from(h.os.clone()),
                Cell::from(h.pass_count.to_string()),
                Cell::from(h.total_controls.to_string()),
                Cell::from(h.status.as_str()).style(status_style(h.status, app.color)),
                Cell::from(h.compliance_ratio.clone()),
            ])
        })
        .collect();

    let border = if app.focus == Focus::Hosts {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let widths = [
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Min(10),
        Constraint::Length(10),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(11),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("Host Compliance Status ({selection})")),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, &mut app.hosts_state);
}

fn draw_detail(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let Some(detail) = app.selected().cloned() else {
        let text = Text::from(vec![
            Line::from("Select a host with Space or Enter in the host table."),
            Line::from(""),
            Line::from(Span::styled(
                NO_HOST_MESSAGE,
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ]);
        let w = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Host details"))
            .wrap(Wrap { trim: false });
        f.render_widget(w, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut widths: Vec<Constraint> = vec![Constraint::Length(4)];
    for (i, column) in detail.columns.iter().enumerate() {
        let w = detail
            .records
            .iter()
            .map(|r| r.get(i).map(|v| v.chars().count()).unwrap_or(0))
            .max()
            .unwrap_or(0)
            .max(column.chars().count())
            .min(24);
        widths.push(Constraint::Length(w as u16));
    }

    let mut header_cells = vec!["#".to_string()];
    header_cells.extend(detail.columns.iter().cloned());
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    let result_idx = detail.columns.iter().position(|c| c == "Result");
    let rows: Vec<Row> = detail
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut cells = vec![Cell::from((i + 1).to_string())];
            for (j, v) in r.iter().enumerate() {
                let mut cell = Cell::from(v.clone());
                if Some(j) == result_idx {
                    let outcome = crate::core::Outcome::parse(v);
                    cell = cell.style(slice_style(SliceColor::for_outcome(outcome), app.color));
                }
                cells.push(cell);
            }
            Row::new(cells)
        })
        .collect();

    let border = if app.focus == Focus::Details {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let title = format!(
        "Hostname: {} | Status: {} ({})",
        detail.summary.hostname, detail.summary.status, detail.summary.compliance_ratio
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, chunks[0], &mut app.detail_state);

    draw_ring(f, chunks[1], &detail.distribution, app.color);
}

/// Ring chart plus a legend with counts and percentages.
fn draw_ring(f: &mut ratatui::Frame, area: Rect, dist: &Distribution, color: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(dist.title.clone());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let legend_height = (dist.slices.len() as u16).min(inner.height.saturating_sub(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(legend_height)])
        .split(inner);
    let chart = chunks[0];
    if chart.width == 0 || chart.height == 0 {
        return;
    }

    let (x_half, y_half) = ring_bounds(chart.width, chart.height);
    let slices = ring_points(dist, chart.width, chart.height);
    let label = dist.center_label();
    let label_x = -(label.chars().count() as f64 / 2.0) * (2.0 * x_half / chart.width as f64);

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-x_half, x_half])
        .y_bounds([-y_half, y_half])
        .paint(|ctx| {
            for (i, coords) in slices.iter().enumerate() {
                if coords.is_empty() {
                    continue;
                }
                let color = slice_color(dist.slices[i].color, color);
                ctx.draw(&Points {
                    coords: coords.as_slice(),
                    color,
                });
            }
            ctx.print(
                label_x,
                0.0,
                Line::from(Span::styled(
                    label.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
            );
        });
    f.render_widget(canvas, chart);

    let legend: Vec<Line> = dist
        .slices
        .iter()
        .map(|s| {
            Line::from(vec![
                Span::styled("■ ", slice_style(s.color, color)),
                Span::raw(format!("{} {} ({})", s.label, s.count, s.percent_label())),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(Text::from(legend)), chunks[1]);
}

/// Half-extents of the canvas so that one data unit spans the same number of
/// braille dots horizontally and vertically.
fn ring_bounds(width: u16, height: u16) -> (f64, f64) {
    let dots_w = width.max(1) as f64 * 2.0;
    let dots_h = height.max(1) as f64 * 4.0;
    let aspect = dots_w / dots_h;
    if aspect >= 1.0 {
        (aspect, 1.0)
    } else {
        (1.0, 1.0 / aspect)
    }
}

/// Braille dot coordinates per slice, clockwise from twelve o'clock.
fn ring_points(dist: &Distribution, width: u16, height: u16) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = vec![Vec::new(); dist.slices.len()];
    if dist.total == 0 || dist.slices.is_empty() {
        return out;
    }

    let mut bounds = Vec::with_capacity(dist.slices.len());
    let mut acc = 0.0;
    for slice in &dist.slices {
        acc += slice.fraction();
        bounds.push(acc);
    }

    let (x_half, y_half) = ring_bounds(width, height);
    let dots_w = width.max(1) as usize * 2;
    let dots_h = height.max(1) as usize * 4;
    let step_x = 2.0 * x_half / dots_w as f64;
    let step_y = 2.0 * y_half / dots_h as f64;

    for i in 0..dots_w {
        let x = -x_half + (i as f64 + 0.5) * step_x;
        for j in 0..dots_h {
            let y = -y_half + (j as f64 + 0.5) * step_y;
            let r = (x * x + y * y).sqrt();
            if !(RING_INNER..=RING_OUTER).contains(&r) {
                continue;
            }
            let mut angle = x.atan2(y);
            if angle < 0.0 {
                angle += TAU;
            }
            let frac = angle / TAU;
            let idx = bounds
                .iter()
                .position(|b| frac < *b)
                .unwrap_or(dist.slices.len() - 1);
            out[idx].push((x, y));
        }
    }
    out
}

fn slice_color(color: SliceColor, enabled: bool) -> Color {
    match (color, enabled) {
        (SliceColor::Positive, true) => Color::Green,
        (SliceColor::Negative, true) => Color::Red,
        (SliceColor::Neutral, true) => Color::Gray,
        (SliceColor::Positive, false) => Color::White,
        (SliceColor::Negative, false) => Color::DarkGray,
        (SliceColor::Neutral, false) => Color::Gray,
    }
}

fn slice_style(color: SliceColor, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    Style::default().fg(slice_color(color, true))
}

fn status_style(status: ComplianceStatus, enabled: bool) -> Style {
    slice_style(SliceColor::for_status(status), enabled)
}

fn draw_upload(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let popup = centered_rect(70, 30, area);
    let input = truncate_chars(&app.upload_input, popup.width.saturating_sub(6) as usize);
    let text = Text::from(vec![
        Line::from("Path of a CSV file to load alongside the local files:"),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                input,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ]);
    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Upload CSV"))
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup);
    f.render_widget(w, popup);
}

fn draw_error(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let msg = app
        .error
        .as_deref()
        .unwrap_or("Unknown error.")
        .to_string();
    let w = Paragraph::new(msg)
        .block(Block::default().borders(Borders::ALL).title("Error"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, area);
}

fn draw_help(f: &mut ratatui::Frame, area: Rect, _app: &App) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "baseline dashboard",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Every change below re-reads the CSV files and recomputes the dashboard."),
        Line::from(""),
        Line::from("Focus:"),
        Line::from("  Tab / Shift-Tab : Filters → Hosts → Details"),
        Line::from("  ↑↓ / j/k        : move the cursor"),
        Line::from(""),
        Line::from("Filters:"),
        Line::from("  Space / Enter   : check or uncheck the OS / status value"),
        Line::from(""),
        Line::from("Hosts:"),
        Line::from("  Space           : select the row, or deselect it if already selected"),
        Line::from("  Enter           : select the row"),
        Line::from("  Esc / x         : clear the selection"),
        Line::from(""),
        Line::from("General:"),
        Line::from("  u               : load a CSV file by path (one upload per session)"),
        Line::from("  r               : reload"),
        Line::from("  q               : quit"),
        Line::from("  Ctrl-C          : force quit (any screen)"),
    ]);

    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    let popup = centered_rect(70, 70, area);
    f.render_widget(Clear, popup);
    f.render_widget(w, popup);
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    let mut s = String::new();
    for (i, ch) in input.chars().enumerate() {
        if i >= max_chars {
            s.push('…');
            break;
        }
        s.push(ch);
    }
    s
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HostSelection, UploadState};
    use crate::engine::EngineOptions;
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new() -> Self {
            let pid = std::process::id();
            let n = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!("baseline-tui-test-{pid}-{n}"));
            let _ = std::fs::remove_dir_all(&path);
            std::fs::create_dir_all(&path).expect("create temp dir");
            Self { path }
        }

        fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.path.join(name);
            std::fs::write(&path, contents).expect("write file");
            path
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn engine_for(dir: &TempDir) -> Engine {
        Engine::new(EngineOptions {
            dir: dir.path.clone(),
            patterns: vec!["*.csv".to_string()],
            show_progress: false,
        })
        .expect("engine")
    }

    fn example_dir() -> TempDir {
        let dir = TempDir::new();
        dir.write(
            "scan.csv",
            "Hostname,OS,Result,Control\nh1,linux,pass,c1\nh1,linux,fail,c2\nh2,win,pass,c1\n",
        );
        dir
    }

    fn press(app: &mut App, engine: &Engine, code: KeyCode) -> bool {
        handle_key(app, engine, KeyEvent::new(code, KeyModifiers::NONE)).expect("handle_key")
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).expect("terminal");
        terminal.draw(|f| draw(f, app)).expect("draw");
        let buf = terminal.backend().buffer();
        let mut s = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                s.push_str(buf.get(x, y).symbol());
            }
            s.push('\n');
        }
        s
    }

    fn started(engine: &Engine) -> App {
        let mut app = App::new(false, SessionState::new());
        app.refresh(engine);
        app
    }

    #[test]
    fn initial_pass_has_no_selection() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        assert_eq!(app.hosts().len(), 2);
        assert!(app.selected().is_none());
        let screen = render(&mut app);
        assert!(screen.contains(NO_HOST_MESSAGE), "{screen}");
        assert!(screen.contains("Selection: None"), "{screen}");
        assert!(screen.contains("comply 1 (50.0%)"), "{screen}");
    }

    #[test]
    fn space_on_host_row_selects_then_deselects() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);
        assert_eq!(app.focus, Focus::Hosts);

        assert!(!press(&mut app, &engine, KeyCode::Char(' ')));
        let detail = app.selected().expect("selected");
        assert_eq!(detail.summary.hostname, "h1");
        assert_eq!(detail.records.len(), 2);
        assert_eq!(detail.distribution.count_of("pass"), 1);
        assert_eq!(detail.distribution.count_of("fail"), 1);

        let screen = render(&mut app);
        assert!(screen.contains("Selection: h1/linux/not_comply"), "{screen}");
        assert!(screen.contains("2 controls"), "{screen}");

        press(&mut app, &engine, KeyCode::Char(' '));
        assert!(app.selected().is_none());
    }

    #[test]
    fn enter_selects_and_esc_clears() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::Down);
        press(&mut app, &engine, KeyCode::Enter);
        assert_eq!(app.selected().expect("selected").summary.hostname, "h2");
        press(&mut app, &engine, KeyCode::Enter);
        assert!(app.selected().is_some());

        press(&mut app, &engine, KeyCode::Esc);
        assert!(app.selected().is_none());
        assert!(app.session.selected_host().is_none());
    }

    #[test]
    fn toggling_os_filter_reruns_the_pass() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::BackTab);
        assert_eq!(app.focus, Focus::Filters);
        press(&mut app, &engine, KeyCode::Char(' '));

        assert!(!app.session.is_os_checked("linux"));
        let hosts: Vec<&str> = app.hosts().iter().map(|h| h.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["h2"]);
        assert!(app.passes >= 2);
    }

    #[test]
    fn unchecking_all_statuses_shows_empty_state() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);
        app.focus = Focus::Filters;

        // items: linux, win, not_comply, comply
        app.filters_cursor = 2;
        press(&mut app, &engine, KeyCode::Char(' '));
        app.filters_cursor = 3;
        press(&mut app, &engine, KeyCode::Char(' '));

        let view = app.view.as_ref().expect("view");
        assert!(matches!(
            view.dashboard().map(|d| &d.panel),
            Some(FilteredPanel::Empty)
        ));
        let screen = render(&mut app);
        assert!(screen.contains(EMPTY_FILTER_MESSAGE), "{screen}");
        assert!(!screen.contains("Compliance Status Distribution"), "{screen}");
    }

    #[test]
    fn selection_survives_unrelated_filter_changes() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::Char(' '));
        app.focus = Focus::Filters;
        app.filters_cursor = 1;
        press(&mut app, &engine, KeyCode::Char(' '));

        let view = app.view.as_ref().expect("view");
        assert_eq!(view.hosts().len(), 1);
        assert!(matches!(
            view.dashboard().map(|d| &d.panel),
            Some(FilteredPanel::Populated {
                selection: HostSelection::Selected(_),
                ..
            })
        ));
    }

    #[test]
    fn upload_prompt_loads_the_file() {
        let dir = example_dir();
        let uploads = TempDir::new();
        let upload = uploads.write("extra.data", "Hostname,OS,Result\nh3,mac,fail\n");
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::Char('u'));
        assert_eq!(app.screen, Screen::Upload);
        for c in upload.display().to_string().chars() {
            press(&mut app, &engine, KeyCode::Char(c));
        }
        press(&mut app, &engine, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Dashboard);
        let view = app.view.as_ref().expect("view");
        assert_eq!(view.upload, UploadState::Loaded);
        assert_eq!(view.hosts().len(), 3);
    }

    #[test]
    fn failed_upload_is_reported_not_fatal() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::Char('u'));
        for c in "/definitely/missing.csv".chars() {
            press(&mut app, &engine, KeyCode::Char(c));
        }
        press(&mut app, &engine, KeyCode::Enter);

        let view = app.view.as_ref().expect("view");
        assert_eq!(view.upload, UploadState::Failed);
        assert_eq!(view.failures.len(), 1);
        assert_eq!(view.hosts().len(), 2);
        let screen = render(&mut app);
        assert!(screen.contains("Input errors"), "{screen}");
    }

    #[test]
    fn empty_directory_shows_no_data() {
        let dir = TempDir::new();
        let engine = engine_for(&dir);
        let mut app = started(&engine);
        assert!(matches!(
            app.view.as_ref().map(|v| &v.body),
            Some(ViewBody::NoData)
        ));
        let screen = render(&mut app);
        assert!(screen.contains("No data loaded."), "{screen}");
    }

    #[test]
    fn missing_directory_opens_error_screen() {
        let dir = TempDir::new();
        let engine = Engine::new(EngineOptions {
            dir: dir.path.join("missing"),
            patterns: vec!["*.csv".to_string()],
            show_progress: false,
        })
        .expect("engine");
        let mut app = started(&engine);
        assert_eq!(app.screen, Screen::Error);
        assert!(app.error.as_deref().unwrap_or("").contains("working directory not found"));

        press(&mut app, &engine, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Dashboard);
    }

    #[test]
    fn q_quits_but_not_while_typing_upload() {
        let dir = example_dir();
        let engine = engine_for(&dir);
        let mut app = started(&engine);

        press(&mut app, &engine, KeyCode::Char('u'));
        assert!(!press(&mut app, &engine, KeyCode::Char('q')));
        assert_eq!(app.upload_input, "q");
        press(&mut app, &engine, KeyCode::Esc);
        assert!(press(&mut app, &engine, KeyCode::Char('q')));
    }

    #[test]
    fn ring_points_split_proportionally() {
        let rows = [
            HostSummary::from_counts(
                crate::core::HostKey {
                    hostname: "a".to_string(),
                    os: "linux".to_string(),
                },
                1,
                1,
            ),
            HostSummary::from_counts(
                crate::core::HostKey {
                    hostname: "b".to_string(),
                    os: "linux".to_string(),
                },
                0,
                1,
            ),
        ];
        let dist = Distribution::compliance(&rows);
        let points = ring_points(&dist, 40, 20);
        assert_eq!(points.len(), 2);
        let (a, b) = (points[0].len() as f64, points[1].len() as f64);
        assert!(a > 0.0 && b > 0.0);
        assert!((a - b).abs() / (a + b) < 0.05, "a={a} b={b}");
        for (x, y) in points.iter().flatten() {
            let r = (x * x + y * y).sqrt();
            assert!((RING_INNER..=RING_OUTER).contains(&r));
        }
    }

    #[test]
    fn ring_bounds_keep_dots_square() {
        let (x, y) = ring_bounds(40, 10);
        assert_eq!((x, y), (2.0, 1.0));
        let (x, y) = ring_bounds(10, 20);
        assert_eq!((x, y), (1.0, 4.0));
    }
}
