use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use raid_attendance::attendance_fetch::HttpAttendanceSource;
use raid_attendance::config::AppConfig;
use raid_attendance::controller::{Controller, ExternalTooltips};
use raid_attendance::feed;
use raid_attendance::model::{sort_label, AttendanceDataset, AttendanceRecord, Night, PctBand};
use raid_attendance::persist::SnapshotStore;
use raid_attendance::state::{phase_label, AppState, Delta};
use raid_attendance::tooltip::PresenceDetail;

const ROW_HEIGHT: u16 = 3;
const TOOLTIP_WIDTH: u16 = 56;

struct App {
    ctl: Controller,
    should_quit: bool,
    /// Screen rows of the last drawn list, mapped to visible row indices.
    row_hits: Vec<(Rect, usize)>,
}

impl App {
    fn new(ctl: Controller) -> Self {
        Self {
            ctl,
            should_quit: false,
            row_hits: Vec::new(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.ctl.state.search_active {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.ctl.state.search_active = false,
                KeyCode::Backspace => self.ctl.state.pop_query_char(),
                KeyCode::Char(c) => self.ctl.state.push_query_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => self.ctl.state.search_active = true,
            KeyCode::Esc => {
                if self.ctl.state.help_overlay {
                    self.ctl.state.help_overlay = false;
                } else {
                    self.ctl.hover_leave();
                }
            }
            KeyCode::Char('s') => self.ctl.state.cycle_sort(),
            KeyCode::Char('t') => self.ctl.state.toggle_threshold(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.ctl.refresh(),
            KeyCode::Char('c') | KeyCode::Char('C') => self.ctl.clear_cache(),
            KeyCode::Char('j') | KeyCode::Down => {
                self.ctl.hover_leave();
                self.ctl.state.select_next();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.ctl.hover_leave();
                self.ctl.state.select_prev();
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let anchor = self.selected_row_anchor();
                self.ctl.toggle_selected_tooltip(anchor.0, anchor.1);
            }
            KeyCode::Char('?') => self.ctl.state.help_overlay = !self.ctl.state.help_overlay,
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Moved) {
            return;
        }
        let hit = self
            .row_hits
            .iter()
            .find(|(rect, _)| contains(*rect, mouse.column, mouse.row))
            .map(|(_, idx)| *idx);
        match hit {
            Some(idx) if self.hovering(idx) => self.ctl.hover_move(mouse.column, mouse.row),
            // Hover leaves the selection alone so the list never scrolls
            // under the pointer.
            Some(idx) => self.ctl.hover_row(idx, mouse.column, mouse.row),
            None => self.ctl.hover_leave(),
        }
    }

    fn hovering(&self, idx: usize) -> bool {
        let state = &self.ctl.state;
        state.tooltip.is_visible()
            && state.visible_rows().get(idx).map(|r| r.name.as_str()) == state.tooltip.target()
    }

    fn selected_row_anchor(&self) -> (u16, u16) {
        self.row_hits
            .iter()
            .find(|(_, idx)| *idx == self.ctl.state.selected)
            .map(|(rect, _)| (rect.x + rect.width / 3, rect.y + 1))
            .unwrap_or((0, 0))
    }
}

/// Stand-in for an embedded tooltip widget: records the rescan in the log.
struct LoggedTooltipRefresh;

impl ExternalTooltips for LoggedTooltipRefresh {
    fn refresh_external_tooltips(&self, dataset: &AttendanceDataset) {
        tracing::debug!(players = dataset.records.len(), "external tooltips refreshed");
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let _log_guard = init_logging(&config);
    tracing::info!(endpoint = %config.endpoint, "starting attendance board");

    let store = match &config.cache_dir {
        Some(dir) => SnapshotStore::new(dir),
        None => SnapshotStore::disabled(),
    };
    let source = Arc::new(HttpAttendanceSource::new(
        config.endpoint.clone(),
        config.timeout,
    ));

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(source, tx, cmd_rx);

    let mut ctl = Controller::new(store, Some(cmd_tx))
        .with_external_tooltips(Box::new(LoggedTooltipRefresh));
    ctl.state.min_pct = config.min_pct;
    ctl.mount();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(ctl);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("terminal loop failed: {err}");
        eprintln!("error: {err}");
    }
    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let dir = config.cache_dir.as_ref()?;
    std::fs::create_dir_all(dir).ok()?;
    let appender = tracing_appender::rolling::daily(dir, "raid_attendance.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        app.ctl.drain(&rx);

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let state = &app.ctl.state;
    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_controls(frame, chunks[1], state);
    app.row_hits = render_board(frame, chunks[2], state);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[3]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[4]);

    if let Some(detail) = state.tooltip.detail() {
        render_tooltip(frame, state.tooltip.anchor(), detail);
    }

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let title = "⚡ Tempest Attendance";
    let weeks = state
        .dataset
        .weeks_covered()
        .map(|w| format!("Last {w} weeks"))
        .unwrap_or_else(|| "Recent raids".to_string());
    let range = state
        .dataset
        .date_range()
        .map(|(first, last)| format!(" ({first} → {last})"))
        .unwrap_or_default();
    format!("{title}\n{weeks}{range}, pulled from Warcraft Logs.")
}

fn render_controls(frame: &mut Frame, area: Rect, state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let cursor = if state.search_active { "_" } else { "" };
    let min = match state.view.min_threshold {
        Some(pct) => format!(">= {pct}%"),
        None => "off".to_string(),
    };
    let search_style = if state.search_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let left = Paragraph::new(vec![
        Line::styled(
            format!("Search: {}{cursor}", state.view.search_query),
            search_style,
        ),
        Line::from(format!(
            "Sort: {} | Min%: {min}",
            sort_label(state.view.sort_key)
        )),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(left, cols[0]);

    let button = if state.is_loading() {
        "Working…".to_string()
    } else {
        format!("[{}]", phase_label(state.phase))
    };
    let mut lines = vec![Line::from(format!(
        "{button} {}",
        state.status.as_deref().unwrap_or("")
    ))];
    if state.status.is_some()
        && let Some(at) = state.captured_at
    {
        let local = at.with_timezone(&Local);
        lines.push(Line::styled(
            format!("Updated {}", local.format("%-m/%-d/%y, %-I:%M %p")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let right = Paragraph::new(lines)
        .alignment(Alignment::Right)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(right, cols[1]);
}

fn render_board(frame: &mut Frame, area: Rect, state: &AppState) -> Vec<(Rect, usize)> {
    let block = Block::default()
        .title(legend_line())
        .borders(Borders::ALL);
    let list_area = block.inner(area);
    frame.render_widget(block, area);

    let rows = state.visible_rows();
    if rows.is_empty() {
        let msg = if state.dataset.records.is_empty() {
            "No cached data yet, press r to refresh."
        } else {
            "No matching players."
        };
        let empty = Paragraph::new(msg).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return Vec::new();
    }

    if list_area.height < ROW_HEIGHT {
        let empty = Paragraph::new("Board needs more height")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, list_area);
        return Vec::new();
    }

    let visible = (list_area.height / ROW_HEIGHT) as usize;
    let (start, end) = visible_range(state.selected, rows.len(), visible);
    let hovered = state.tooltip.target();

    let mut hits = Vec::with_capacity(end - start);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + (i as u16) * ROW_HEIGHT,
            width: list_area.width,
            height: ROW_HEIGHT,
        };
        let record = rows[idx];
        let active = idx == state.selected || hovered == Some(record.name.as_str());
        render_row(frame, row_area, record, active);
        hits.push((row_area, idx));
    }
    hits
}

fn render_row(frame: &mut Frame, area: Rect, record: &AttendanceRecord, active: bool) {
    let lines = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let pct = record.pct();
    let color = band_color(record.band());
    let name_style = if active {
        Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(5)])
        .split(lines[0]);
    frame.render_widget(Paragraph::new(record.name.as_str()).style(name_style), top[0]);
    frame.render_widget(
        Paragraph::new(format!("{pct}%"))
            .alignment(Alignment::Right)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        top[1],
    );

    let mut bar_style = Style::default().fg(color).bg(Color::Black);
    if active {
        bar_style = bar_style.add_modifier(Modifier::BOLD);
    }
    let gauge = Gauge::default()
        .gauge_style(bar_style)
        .percent(u16::from(pct))
        .label("");
    frame.render_widget(gauge, lines[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(lines[2]);
    let muted = Style::default().fg(Color::DarkGray);
    frame.render_widget(
        Paragraph::new(format!("{} / {} nights", record.attended, record.possible)).style(muted),
        bottom[0],
    );
    if let Some(night) = &record.last_seen_night {
        frame.render_widget(
            Paragraph::new(format!("last seen {night}"))
                .alignment(Alignment::Right)
                .style(muted),
            bottom[1],
        );
    }
}

fn render_tooltip(frame: &mut Frame, anchor: (u16, u16), detail: &PresenceDetail) {
    let screen = frame.size();
    let width = TOOLTIP_WIDTH.min(screen.width);
    let text = tooltip_lines(detail);
    let inner_width = width.saturating_sub(2).max(1) as usize;
    let height = text
        .iter()
        .map(|line| (line.width() / inner_width) as u16 + 1)
        .sum::<u16>()
        .saturating_add(2)
        .min(screen.height);

    let x = anchor.0.min(screen.width.saturating_sub(width));
    let y = anchor.1.min(screen.height.saturating_sub(height));
    let popup = Rect {
        x,
        y,
        width,
        height,
    };

    frame.render_widget(Clear, popup);
    let tooltip = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(tooltip, popup);
}

fn tooltip_lines(detail: &PresenceDetail) -> Vec<Line<'static>> {
    let join = |nights: &[Night]| {
        if nights.is_empty() {
            "—".to_string()
        } else {
            nights
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    };
    vec![
        Line::styled(
            detail.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from(vec![
            Span::styled("Present: ", Style::default().fg(Color::Green)),
            Span::raw(join(&detail.present)),
        ]),
        Line::from(vec![
            Span::styled("Missed: ", Style::default().fg(Color::Red)),
            Span::raw(join(&detail.missing)),
        ]),
    ]
}

fn legend_line() -> Line<'static> {
    Line::from(vec![
        Span::raw(" "),
        Span::styled("■", Style::default().fg(band_color(PctBand::High))),
        Span::raw(" 75%+  "),
        Span::styled("■", Style::default().fg(band_color(PctBand::Medium))),
        Span::raw(" 50-74%  "),
        Span::styled("■", Style::default().fg(band_color(PctBand::Low))),
        Span::raw(" < 50% "),
    ])
}

fn band_color(band: PctBand) -> Color {
    match band {
        PctBand::High => Color::Green,
        PctBand::Medium => Color::Yellow,
        PctBand::Low => Color::Red,
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No activity yet".to_string();
    }
    let start = state.logs.len().saturating_sub(1);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn footer_text(state: &AppState) -> String {
    if state.search_active {
        return "Type to filter | Backspace Delete | Enter/Esc Done".to_string();
    }
    "/ Search | s Sort | t Min% | r Refresh | c Clear cache | j/k Move | Enter Details | ? Help | q Quit"
        .to_string()
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Tempest Attendance - Help",
        "",
        "  /            Search players (case-insensitive)",
        "  s            Cycle sort: Top % / Name / Attended / Last Seen",
        "  t            Toggle minimum percentage filter",
        "  r            Refresh from the backend",
        "  c            Clear cached snapshot",
        "  j/k or ↑/↓   Move selection",
        "  Enter/Space  Show nights present/missed",
        "  mouse        Hover a row for its nights",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
