//! Ratatui-based terminal dashboard.
//!
//! One tab per view. Each tab shows the primary snapshot as a bar chart, the
//! shares and secondary panels as lists, and the trend as a Plotters chart.

use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::app::pipeline::{Dashboard, Derived, load_all};
use crate::config::Settings;
use crate::data::Fetcher;
use crate::debug::{DEFAULT_DEBUG_DIR, write_debug_bundle, write_error_bundle};
use crate::domain::{DatasetId, View};
use crate::error::{AppError, PipelineError};
use crate::report::{RAW_PREVIEW_CHARS, ViewReport, fmt_si, fmt_thousands, format_diagnostic, proportions};

mod plotters_chart;

use plotters_chart::{PALETTE, TrendChart, trend_lines};

/// Trend lines drawn per tab.
const TREND_LINES: usize = PALETTE.len();

/// Start the dashboard. All datasets are loaded before the terminal is taken
/// over, so a failed load exits with the diagnostic on stderr.
pub fn run(settings: &Settings, fetcher: Fetcher) -> Result<(), AppError> {
    let dashboard = load_all(&fetcher, settings).map_err(|e| crate::app::pipeline_failure(e, false))?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(settings.clone(), fetcher, dashboard);
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

struct App {
    settings: Settings,
    fetcher: Fetcher,
    /// A failed fetch on refresh replaces the whole dashboard.
    dashboard: Result<Dashboard, PipelineError>,
    view: View,
    /// Selected index into each view's years (most recent first), by tab.
    year_index: [usize; View::ALL.len()],
    status: String,
}

impl App {
    fn new(settings: Settings, fetcher: Fetcher, dashboard: Dashboard) -> Self {
        Self {
            settings,
            fetcher,
            dashboard: Ok(dashboard),
            view: View::ALL[0],
            year_index: [0; View::ALL.len()],
            status: "Data loaded.".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
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

    /// Returns `true` to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::Right => self.view = self.view.next(),
            KeyCode::BackTab | KeyCode::Left => self.view = self.view.prev(),
            KeyCode::Up => self.shift_year(-1),
            KeyCode::Down => self.shift_year(1),
            KeyCode::Char('r') => self.refresh(false),
            KeyCode::Char('R') => self.refresh(true),
            KeyCode::Char('d') => self.dump_debug(),
            _ => {}
        }
        false
    }

    fn tab(&self) -> usize {
        View::ALL.iter().position(|v| *v == self.view).unwrap_or(0)
    }

    /// Years of the current tab, most recent first.
    fn years(&self) -> Vec<i64> {
        match &self.dashboard {
            Ok(dash) => match dash.table(self.view) {
                Ok(Some(table)) => crate::report::available_years(&table.rows),
                _ => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }

    fn selected_year(&self) -> Option<i64> {
        let years = self.years();
        years.get(self.year_index[self.tab()]).or(years.last()).copied()
    }

    /// `-1` moves to a more recent year.
    fn shift_year(&mut self, delta: isize) {
        let years = self.years();
        if years.is_empty() {
            return;
        }
        let tab = self.tab();
        let cur = self.year_index[tab].min(years.len() - 1) as isize;
        let next = (cur + delta).clamp(0, years.len() as isize - 1) as usize;
        self.year_index[tab] = next;
        self.status = format!("tahun: {}", years[next]);
    }

    /// Re-run the combined load. The cache serves unexpired payloads unless
    /// `force` drops them first.
    fn refresh(&mut self, force: bool) {
        if force {
            for id in DatasetId::ALL {
                self.fetcher.invalidate(&self.settings.url_for(id));
            }
        }

        match load_all(&self.fetcher, &self.settings) {
            Ok(dash) => {
                self.dashboard = Ok(dash);
                self.status = if force { "Data re-fetched.".to_string() } else { "Data refreshed.".to_string() };
            }
            Err(e) => {
                self.status = format!("Refresh failed: {}", e.dataset());
                self.dashboard = Err(e);
            }
        }
    }

    fn dump_debug(&mut self) {
        let dir = Path::new(DEFAULT_DEBUG_DIR);
        let written = match &self.dashboard {
            Err(e) => write_error_bundle(dir, e),
            Ok(dash) => match self.view.dataset() {
                Some(id) => match dash.dataset(id) {
                    Some(d) => match &d.table {
                        Ok(table) => write_debug_bundle(dir, &table.spec.name, Some(d.raw.as_ref()), None),
                        Err(e) => write_error_bundle(dir, e),
                    },
                    None => Err(AppError::new(4, format!("{id} is not loaded"))),
                },
                None => match &dash.derived {
                    Ok(Derived::Ready { raw, table, .. }) => {
                        write_debug_bundle(dir, &table.spec.name, Some(raw.as_ref()), None)
                    }
                    Ok(Derived::Unavailable) => Err(AppError::new(4, "no source rows for this view")),
                    Err(e) => write_error_bundle(dir, e),
                },
            },
        };

        self.status = match written {
            Ok(path) => format!("Wrote debug bundle: {}", path.display()),
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(Line::from(vec![
            Span::styled("satudata", Style::default().fg(Color::Cyan)),
            Span::raw(" | Jumlah Penduduk Kabupaten Garut"),
        ]));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let tabs = Tabs::new(View::ALL.iter().map(|v| v.title()).collect::<Vec<_>>())
            .select(self.tab())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, rows[0]);

        let years = self.years();
        let selected = self.selected_year();
        let spans: Vec<Span> = years
            .iter()
            .map(|y| {
                let style = if Some(*y) == selected {
                    Style::default().fg(Color::Black).bg(Color::White)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Span::styled(format!(" {y} "), style)
            })
            .collect();
        let mut line = vec![Span::raw("Tahun: ")];
        line.extend(spans);
        frame.render_widget(Paragraph::new(Line::from(line)), rows[1]);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let dash = match &self.dashboard {
            Ok(dash) => dash,
            Err(e) => return draw_error(frame, area, "Gagal memuat dashboard", e),
        };

        match dash.report(self.view, self.selected_year()) {
            Err(e) => draw_error(frame, area, self.view.title(), e),
            Ok(None) => {
                let msg = Paragraph::new("Data kecamatan dan jenis kelamin tidak tersedia.")
                    .style(Style::default().fg(Color::Yellow))
                    .block(Block::default().title(self.view.title()).borders(Borders::ALL));
                frame.render_widget(msg, area);
            }
            Ok(Some(report)) => self.draw_report(frame, area, &report),
        }
    }

    fn draw_report(&self, frame: &mut ratatui::Frame<'_>, area: Rect, report: &ViewReport) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[0]);

        if report.is_empty() {
            let msg = Paragraph::new("Tidak ada data yang tersedia untuk tahun yang dipilih.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().title("Jumlah Penduduk").borders(Borders::ALL));
            frame.render_widget(msg, rows[0]);
        } else {
            draw_bars(frame, top[0], report);
            draw_panels(frame, top[1], report);
        }

        draw_trend(frame, rows[1], report);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab/←/→ view  ↑/↓ year  r refresh  R re-fetch  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_error(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, err: &PipelineError) {
    let p = Paragraph::new(Text::from(format_diagnostic(err, RAW_PREVIEW_CHARS)))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_bars(frame: &mut ratatui::Frame<'_>, area: Rect, report: &ViewReport) {
    let Some(primary) = report.primary() else {
        return;
    };
    let title = format!(
        "{} per {} ({})",
        primary.title,
        primary.snapshot.group_by.join(" x "),
        primary.snapshot.year
    );

    let bars: Vec<Bar> = primary
        .snapshot
        .entries
        .iter()
        .map(|e| {
            Bar::default()
                .value(e.total.max(0.0).round() as u64)
                .label(Line::from(e.label()))
                .text_value(fmt_thousands(e.total))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn draw_panels(frame: &mut ratatui::Frame<'_>, area: Rect, report: &ViewReport) {
    let mut items: Vec<ListItem> = Vec::new();

    for (idx, panel) in report.panels.iter().enumerate() {
        if idx > 0 {
            items.push(ListItem::new(""));
        }
        items.push(ListItem::new(Line::from(Span::styled(
            panel.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))));
        for share in proportions(&panel.snapshot) {
            items.push(ListItem::new(format!(
                "  {}: {} jiwa ({:.1}%)",
                share.label,
                fmt_thousands(share.total),
                share.percent
            )));
        }
        items.push(ListItem::new(Line::from(Span::styled(
            format!("  Total Keseluruhan: {} jiwa", fmt_thousands(panel.snapshot.total())),
            Style::default().fg(Color::Gray),
        ))));
    }

    let list = List::new(items).block(Block::default().title("Proporsi").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn draw_trend(frame: &mut ratatui::Frame<'_>, area: Rect, report: &ViewReport) {
    let block = Block::default()
        .title(format!("Tren per {}", report.trend.group_by.join(" x ")))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if report.trend.is_empty() {
        frame.render_widget(
            Paragraph::new("Tidak ada data yang tersedia.").style(Style::default().fg(Color::Yellow)),
            inner,
        );
        return;
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(24)])
        .split(inner);

    let (keys, lines, x_bounds, y_bounds) = trend_lines(&report.trend, TREND_LINES);
    frame.render_widget(
        TrendChart {
            lines: &lines,
            x_bounds,
            y_bounds,
            fmt_y: fmt_si,
        },
        cols[0],
    );

    let legend: Vec<ListItem> = keys
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let (r, g, b) = PALETTE[idx % PALETTE.len()];
            ListItem::new(Line::from(vec![
                Span::styled("━ ", Style::default().fg(Color::Rgb(r, g, b))),
                Span::raw(key.join(" / ")),
            ]))
        })
        .collect();
    frame.render_widget(List::new(legend), cols[1]);
}
