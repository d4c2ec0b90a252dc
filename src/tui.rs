use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use camino::Utf8PathBuf;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap,
};
use tracing::warn;

use crate::app::{App, LookupOutcome, ProgressEvent, ProgressSink, VariantReport, select_key};
use crate::domain::{KeyField, VariantEntry};
use crate::pages::{self, HelpPage, Notice, Tone};
use crate::store::VariantSource;
use crate::views::{GEO_HEADERS, MUTATION_HEADERS, SUMMARY_HEADERS};

const LOGS_MAX: usize = 200;
const TABS: &[&str] = &["Home", "Lookup", "About", "Help", "Logs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Lookup,
    About,
    Help,
    Logs,
}

impl View {
    fn index(self) -> usize {
        match self {
            View::Home => 0,
            View::Lookup => 1,
            View::About => 2,
            View::Help => 3,
            View::Logs => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Resolve,
    Query,
    Format,
    Export,
    Done,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Resolve => "Resolve",
            Phase::Query => "Query",
            Phase::Format => "Format",
            Phase::Export => "Export",
            Phase::Done => "Done",
        }
    }
}

#[derive(Debug, Clone)]
enum Banner {
    Warning(String),
    Error(String),
    Success(String),
}

#[derive(Debug)]
struct SessionState {
    status: String,
    phase: Phase,
    latency_ms: Option<u128>,
    logs: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<SessionState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = phase;
                state.status = payload.to_string();
            } else if let Some(latency) = parse_latency(&message) {
                state.latency_ms = Some(latency);
            } else {
                state.status = message.clone();
            }
            push_log(&mut state.logs, format!("[{}] {message}", timestamp()));
        }
    }
}

/// Interactive four-page browser over the variant store.
pub struct Tui {
    state: Arc<Mutex<SessionState>>,
    view: View,
    focus: KeyField,
    lineage_input: String,
    label_input: String,
    history: Vec<String>,
    history_index: Option<usize>,
    report: Option<VariantReport>,
    banner: Option<Banner>,
    variants: Vec<VariantEntry>,
    mutation_scroll: usize,
    log_scroll: u16,
    export_dir: Utf8PathBuf,
    help: Option<HelpPage>,
}

impl Tui {
    pub fn new(export_dir: Utf8PathBuf) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                status: "ready".to_string(),
                phase: Phase::Idle,
                latency_ms: None,
                logs: VecDeque::new(),
            })),
            view: View::Home,
            focus: KeyField::Lineage,
            lineage_input: String::new(),
            label_input: String::new(),
            history: Vec::new(),
            history_index: None,
            report: None,
            banner: None,
            variants: Vec::new(),
            mutation_scroll: 0,
            log_scroll: 0,
            export_dir,
            help: None,
        }
    }

    /// Runs the session until the user quits.
    pub fn run<S: VariantSource>(&mut self, app: &App<S>) -> miette::Result<()> {
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        self.help = Some(pages::help(app.assets()));
        match app.list(&sink) {
            Ok(result) => self.variants = result.variants,
            Err(err) => {
                warn!(error = %err, "variant listing unavailable");
                self.banner = Some(Banner::Error(err.to_string()));
            }
        }

        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal, app, &sink);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<S: VariantSource>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &App<S>,
        sink: &TuiProgress,
    ) -> miette::Result<()> {
        loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, &*self, &state))
                    .into_diagnostic()?;
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.handle_key(key) {
                        Action::Quit => return Ok(()),
                        Action::Submit => self.submit(app, sink),
                        Action::Export => self.export(app, sink),
                        Action::None => {}
                    }
                }
            }
        }
    }

    fn submit<S: VariantSource>(&mut self, app: &App<S>, sink: &TuiProgress) {
        let key = match select_key(&self.lineage_input, &self.label_input) {
            Ok(Some(key)) => key,
            Ok(None) => {
                self.banner = Some(Banner::Warning(
                    "Enter a Pango lineage or a WHO label".to_string(),
                ));
                return;
            }
            Err(err) => {
                self.banner = Some(Banner::Error(err.to_string()));
                return;
            }
        };
        self.history.push(key.to_string());
        self.history_index = None;
        self.mutation_scroll = 0;

        match app.lookup(&key, sink) {
            Ok(LookupOutcome::Found(report)) => {
                self.report = Some(*report);
                self.banner = None;
            }
            Ok(LookupOutcome::NotFound { message, .. }) => {
                self.report = None;
                self.banner = Some(Banner::Warning(message));
            }
            Err(err) => {
                self.report = None;
                self.banner = Some(Banner::Error(err.to_string()));
            }
        }
    }

    fn export<S: VariantSource>(&mut self, app: &App<S>, sink: &TuiProgress) {
        let Some(report) = self.report.as_ref() else {
            self.banner = Some(Banner::Warning("Nothing to export yet".to_string()));
            return;
        };
        self.banner = Some(match app.export_report(report, &self.export_dir, sink) {
            Ok(result) => Banner::Success(format!("Saved {}", result.path)),
            Err(err) => Banner::Error(err.to_string()),
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match key.code {
            KeyCode::F(1) => self.view = View::Home,
            KeyCode::F(2) => self.view = View::Lookup,
            KeyCode::F(3) => self.view = View::About,
            KeyCode::F(4) => self.view = View::Help,
            KeyCode::F(5) => self.view = View::Logs,
            KeyCode::F(6) if self.view == View::Lookup => return Action::Export,
            KeyCode::Esc => return Action::Quit,
            KeyCode::Char('q') if self.view != View::Lookup => return Action::Quit,
            KeyCode::PageUp => self.scroll(-5),
            KeyCode::PageDown => self.scroll(5),
            _ if self.view == View::Lookup => return self.handle_input_key(key),
            KeyCode::Left => self.view = cycle(self.view, -1),
            KeyCode::Right | KeyCode::Tab => self.view = cycle(self.view, 1),
            _ => {}
        }
        Action::None
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Enter => return Action::Submit,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    KeyField::Lineage => KeyField::Label,
                    KeyField::Label => KeyField::Lineage,
                };
            }
            KeyCode::Right => {
                if let Some(best) = self.best_match() {
                    let value = best.key_value(self.focus).to_string();
                    self.set_input_text(&value);
                }
            }
            KeyCode::Up => self.history_up(),
            KeyCode::Down => self.history_down(),
            KeyCode::Backspace => {
                self.input_mut().pop();
            }
            KeyCode::Char(ch) => {
                let input = self.input_mut();
                if input.chars().count() < pages::INPUT_MAX_CHARS {
                    input.push(ch);
                }
            }
            _ => {}
        }
        Action::None
    }

    fn input(&self) -> &str {
        match self.focus {
            KeyField::Lineage => &self.lineage_input,
            KeyField::Label => &self.label_input,
        }
    }

    fn input_mut(&mut self) -> &mut String {
        match self.focus {
            KeyField::Lineage => &mut self.lineage_input,
            KeyField::Label => &mut self.label_input,
        }
    }

    fn set_input_text(&mut self, value: &str) {
        *self.input_mut() = value.to_string();
    }

    fn scroll(&mut self, delta: i32) {
        match self.view {
            View::Logs => {
                let max = self.state.lock().map(|state| state.logs.len()).unwrap_or(0);
                let max_scroll = max.saturating_sub(1) as i32;
                self.log_scroll = (self.log_scroll as i32 + delta).clamp(0, max_scroll) as u16;
            }
            View::Lookup => {
                let max = self
                    .report
                    .as_ref()
                    .map(|report| report.mutations.rows.len())
                    .unwrap_or(0);
                let next = (self.mutation_scroll as i32 + delta).max(0) as usize;
                self.mutation_scroll = next.min(max.saturating_sub(1));
            }
            _ => {}
        }
    }

    fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_index {
            Some(index) if index > 0 => index - 1,
            Some(_) => 0,
            None => self.history.len().saturating_sub(1),
        };
        self.history_index = Some(next);
        if let Some(value) = self.history.get(next).cloned() {
            self.set_input_text(&value);
        }
    }

    fn history_down(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_index {
            Some(index) if index + 1 < self.history.len() => index + 1,
            _ => {
                self.history_index = None;
                self.set_input_text("");
                return;
            }
        };
        self.history_index = Some(next);
        if let Some(value) = self.history.get(next).cloned() {
            self.set_input_text(&value);
        }
    }

    /// Closest stored variant for the focused input, by subsequence match.
    fn best_match(&self) -> Option<&VariantEntry> {
        let needle = self.input().trim();
        if needle.is_empty() {
            return None;
        }
        let mut best: Option<(usize, &VariantEntry)> = None;
        for entry in &self.variants {
            if let Some(score) = fuzzy_score(needle, entry.key_value(self.focus)) {
                match best {
                    Some((best_score, _)) if score >= best_score => {}
                    _ => best = Some((score, entry)),
                }
            }
        }
        best.map(|(_, entry)| entry)
    }
}

enum Action {
    None,
    Submit,
    Export,
    Quit,
}

fn cycle(view: View, delta: isize) -> View {
    let views = [View::Home, View::Lookup, View::About, View::Help, View::Logs];
    let len = views.len() as isize;
    let next = (view.index() as isize + delta).rem_euclid(len);
    views[next as usize]
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &Tui, state: &SessionState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(2),
        ])
        .split(frame.area());

    frame.render_widget(draw_menu(tui.view), chunks[0]);
    match tui.view {
        View::Home => draw_home(frame, tui, chunks[1]),
        View::Lookup => draw_lookup(frame, tui, chunks[1]),
        View::About => draw_about(frame, chunks[1]),
        View::Help => draw_help(frame, tui, chunks[1]),
        View::Logs => frame.render_widget(draw_logs_view(state, tui.log_scroll), chunks[1]),
    }
    frame.render_widget(draw_status_line(tui, state), chunks[2]);
}

fn draw_menu(view: View) -> Tabs<'static> {
    Tabs::new(TABS.iter().map(|title| Line::from(*title)))
        .select(view.index())
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .title(Line::from(vec![
                    Span::styled(
                        "COVAR",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
                ])),
        )
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
}

fn draw_home(frame: &mut ratatui::Frame, tui: &Tui, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            pages::HOME_TITLE,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            pages::HOME_CAPTION,
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(format!("{} variants in the database", tui.variants.len())),
        Line::from(""),
    ];
    for entry in &tui.variants {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<12}", entry.lineage_code),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(format!("{:<10}", entry.who_label)),
            Span::styled(
                entry.monitoring_status.clone(),
                Style::default().fg(Color::Gray),
            ),
        ]));
    }
    let view = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(view, area);
}

fn draw_lookup(frame: &mut ratatui::Frame, tui: &Tui, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(area);

    let input_line = |field: KeyField, prompt: &'static str, value: &str| {
        let focused = tui.focus == field;
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Yellow)),
            Span::styled(format!("{prompt} "), Style::default().fg(Color::Gray)),
            Span::styled(value.to_string(), style.add_modifier(Modifier::BOLD)),
        ])
    };
    let suggestion = tui
        .best_match()
        .map(|entry| format!("match: {} ({})", entry.lineage_code, entry.who_label))
        .unwrap_or_else(|| "ready".to_string());
    let inputs = Paragraph::new(vec![
        input_line(KeyField::Lineage, pages::LINEAGE_PROMPT, &tui.lineage_input),
        input_line(KeyField::Label, pages::LABEL_PROMPT, &tui.label_input),
        Line::from(vec![
            Span::styled("= ", Style::default().fg(Color::DarkGray)),
            Span::styled(suggestion, Style::default().fg(Color::DarkGray)),
        ]),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(inputs, chunks[0]);

    let body = chunks[1];
    match (&tui.report, &tui.banner) {
        (Some(report), banner) => {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(if banner.is_some() { 1 } else { 0 }),
                    Constraint::Min(4),
                ])
                .split(body);
            if let Some(banner) = banner {
                frame.render_widget(draw_banner(banner), layout[0]);
            }
            draw_report(frame, report, tui.mutation_scroll, layout[1]);
        }
        (None, Some(banner)) => frame.render_widget(draw_banner(banner), body),
        (None, None) => {
            let hint = Paragraph::new(
                "Search by Pango lineage, or Tab to search by WHO label. Enter to look up.",
            )
            .style(Style::default().fg(Color::Gray));
            frame.render_widget(hint, body);
        }
    }
}

fn draw_report(frame: &mut ratatui::Frame, report: &VariantReport, scroll: usize, area: Rect) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(10),
        ])
        .split(area);

    let header = Row::new(SUMMARY_HEADERS.iter().map(|title| Cell::from(*title)))
        .style(Style::default().fg(Color::Yellow));
    let summary = Table::new(
        [Row::new(
            report
                .summary
                .cells()
                .into_iter()
                .map(|value| Cell::from(value.to_string())),
        )],
        [Constraint::Ratio(1, 5); 5],
    )
    .header(header)
    .block(section_block(&format!("{} :: General Info", report.title)));
    frame.render_widget(summary, sections[0]);

    let molecular = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(sections[1]);

    let rows = report
        .mutations
        .rows
        .iter()
        .skip(scroll)
        .map(|row| Row::new([row.nucleotide.clone(), row.amino_acid.clone()]));
    let mut title = format!("Molecular Info ({} mutations)", report.mutations.rows.len());
    if report.mutations.unpaired > 0 {
        title.push_str(&format!(", {} unpaired", report.mutations.unpaired));
    }
    let mutations = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .header(
            Row::new(MUTATION_HEADERS.iter().map(|title| Cell::from(*title)))
                .style(Style::default().fg(Color::Yellow)),
        )
        .block(section_block(&title));
    frame.render_widget(mutations, molecular[0]);

    let structure = &report.structure;
    let chart_state = if structure.chart.svg.is_some() {
        Span::styled("loaded", Style::default().fg(Color::Green))
    } else {
        Span::styled("missing", Style::default().fg(Color::Red))
    };
    let structure_lines = vec![
        Line::from(Span::styled(
            report.structure_caption.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("PDB: ", Style::default().fg(Color::Gray)),
            Span::styled(
                structure.viewer.structure_id.clone(),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Style: ", Style::default().fg(Color::Gray)),
            Span::raw(structure.viewer.style),
            Span::styled("   Spin: ", Style::default().fg(Color::Gray)),
            Span::raw(structure.viewer.spin),
        ]),
        Line::from(format!(
            "https://www.rcsb.org/3d-view/{}",
            structure.viewer.structure_id
        )),
        Line::from(""),
        Line::from(Span::styled(
            report.chart_caption.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::raw(structure.chart.path.clone()), Span::raw(" "), chart_state]),
        Line::from(""),
        Line::from(Span::styled(
            format!("F6: download {}", report.export_file_name),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let structure_view = Paragraph::new(structure_lines)
        .block(section_block("Structure"))
        .wrap(Wrap { trim: true });
    frame.render_widget(structure_view, molecular[1]);

    let epi = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(sections[2]);

    let geo_rows = report.geography.rows.iter().map(|row| {
        Row::new([
            row.country.clone(),
            row.percentage
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "n/a".to_string()),
        ])
    });
    let geo_table = Table::new(geo_rows, [Constraint::Percentage(60), Constraint::Percentage(40)])
        .header(
            Row::new(GEO_HEADERS.iter().map(|title| Cell::from(*title)))
                .style(Style::default().fg(Color::Yellow)),
        )
        .block(section_block("Epidemiological Info"));
    frame.render_widget(geo_table, epi[0]);

    let bars = report
        .geography
        .proportions()
        .into_iter()
        .map(|(country, share)| {
            let percent = (share * 100.0).round() as u64;
            Bar::default()
                .value(percent)
                .label(Line::from(country.to_string()))
                .text_value(format!("{percent}%"))
        })
        .collect::<Vec<_>>();
    let chart = BarChart::default()
        .block(section_block(&report.geography_caption))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(100)
        .bar_style(Style::default().fg(Color::Green))
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, epi[1]);
}

fn draw_about(frame: &mut ratatui::Frame, area: Rect) {
    let constraints = pages::ABOUT
        .iter()
        .map(|notice| Constraint::Length(notice.lines.len() as u16 + 2))
        .collect::<Vec<_>>();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    for (notice, chunk) in pages::ABOUT.iter().zip(chunks.iter()) {
        frame.render_widget(draw_notice(notice), *chunk);
    }
}

fn draw_help(frame: &mut ratatui::Frame, tui: &Tui, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pages::HOW_TO_USE.lines.len() as u16 + 2),
            Constraint::Min(4),
        ])
        .split(area);
    frame.render_widget(draw_notice(&pages::HOW_TO_USE), chunks[0]);

    let mut lines = vec![
        Line::from("F1 Home  F2 Lookup  F3 About  F4 Help  F5 Logs  F6 Download  Esc Quit"),
        Line::from("Lookup: Tab switches lineage/label, Right accepts the match, Up/Down history"),
        Line::from("PgUp/PgDown scroll the mutation table or the logs"),
        Line::from(""),
    ];
    let media = tui
        .help
        .as_ref()
        .map(|page| page.media.as_slice())
        .unwrap_or_default();
    for asset in media {
        let status = if asset.exists {
            Span::styled("available", Style::default().fg(Color::Green))
        } else {
            Span::styled("missing", Style::default().fg(Color::Red))
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", asset.name), Style::default().fg(Color::Gray)),
            Span::raw(format!("{} ", asset.path)),
            status,
        ]));
    }
    if let Some(page) = tui.help.as_ref() {
        lines.push(Line::from(Span::styled(
            format!("Video source: {}", page.media_source),
            Style::default().fg(Color::DarkGray),
        )));
    }
    let view = Paragraph::new(lines)
        .block(section_block("Keys & media"))
        .wrap(Wrap { trim: true });
    frame.render_widget(view, chunks[1]);
}

fn draw_notice(notice: &Notice) -> Paragraph<'static> {
    let color = match notice.tone {
        Tone::Info => Color::Blue,
        Tone::Warning => Color::Yellow,
        Tone::Error => Color::Red,
        Tone::Success => Color::Green,
    };
    let lines = notice
        .lines
        .iter()
        .map(|line| Line::from(format!("- {line}")))
        .collect::<Vec<_>>();
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(notice.title),
        )
        .wrap(Wrap { trim: true })
}

fn draw_banner(banner: &Banner) -> Paragraph<'static> {
    let (text, color) = match banner {
        Banner::Warning(message) => (format!("! {message}"), Color::Yellow),
        Banner::Error(message) => (format!("x {message}"), Color::Red),
        Banner::Success(message) => (message.clone(), Color::Green),
    };
    Paragraph::new(text).style(Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn section_block(title: &str) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(Span::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

fn draw_status_line(tui: &Tui, state: &SessionState) -> Paragraph<'static> {
    let latency = state
        .latency_ms
        .map(|v| format!("{v} ms"))
        .unwrap_or_else(|| "--".to_string());
    Paragraph::new(Line::from(vec![
        Span::styled("Phase: ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{:<8}", state.phase.label()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled("Latency: ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{latency:<8}")),
        Span::styled("Export dir: ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{}   ", tui.export_dir)),
        Span::styled(state.status.clone(), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::TOP))
}

fn draw_logs_view(state: &SessionState, scroll: u16) -> Paragraph<'static> {
    let total = state.logs.len();
    let visible = 20usize;
    let start = total.saturating_sub(scroll as usize + visible);
    let mut lines = Vec::with_capacity(visible + 1);
    lines.push(Line::from(Span::styled(
        "LOGS (scrollable)",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    for line in state.logs.iter().skip(start).take(visible) {
        lines.push(Line::from(line.clone()));
    }
    Paragraph::new(lines)
        .block(Block::default())
        .wrap(Wrap { trim: true })
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    let rest = message.strip_prefix("phase=")?;
    let (name, payload) = rest.split_once(';')?;
    let phase = match name {
        "Resolve" => Phase::Resolve,
        "Query" => Phase::Query,
        "Format" => Phase::Format,
        "Export" => Phase::Export,
        "Done" => Phase::Done,
        _ => return None,
    };
    Some((phase, payload.trim()))
}

fn parse_latency(message: &str) -> Option<u128> {
    message
        .split("latency_ms=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse::<u128>().ok())
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs();
    let mins = (secs / 60) % 60;
    let hours = (secs / 3600) % 24;
    let seconds = secs % 60;
    format!("{hours:02}:{mins:02}:{seconds:02}")
}

fn fuzzy_score(needle: &str, hay: &str) -> Option<usize> {
    let mut score = 0usize;
    let mut iter = hay.chars();
    for ch in needle.chars() {
        let mut found = false;
        for h in iter.by_ref() {
            score += 1;
            if h.eq_ignore_ascii_case(&ch) {
                found = true;
                break;
            }
        }
        if !found {
            return None;
        }
    }
    Some(score + hay.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_messages_are_parsed() {
        assert_eq!(
            parse_phase("phase=Query; no match for XYZ"),
            Some((Phase::Query, "no match for XYZ"))
        );
        assert_eq!(parse_phase("store.response latency_ms=3"), None);
        assert_eq!(parse_latency("store.response latency_ms=3"), Some(3));
    }

    #[test]
    fn fuzzy_prefers_tighter_matches() {
        let exact = fuzzy_score("ba2", "BA.2").unwrap();
        let loose = fuzzy_score("ba2", "BA.2.86.1").unwrap();
        assert!(exact < loose);
        assert_eq!(fuzzy_score("xyz", "BA.2"), None);
    }

    #[test]
    fn views_cycle_both_ways() {
        assert_eq!(cycle(View::Home, -1), View::Logs);
        assert_eq!(cycle(View::Logs, 1), View::Home);
        assert_eq!(cycle(View::Lookup, 1), View::About);
    }
}
