use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};

use fbref_scout::compare::render_text;
use fbref_scout::config::ScraperConfig;
use fbref_scout::dashboard::{DashboardState, Screen};
use fbref_scout::fetch::PageFetcher;
use fbref_scout::logging;
use fbref_scout::pipeline::Comparison;
use fbref_scout::worker::{self, Delta, WorkerCommand};

struct App {
    state: DashboardState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<WorkerCommand>>,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<WorkerCommand>>) -> Self {
        Self {
            state: DashboardState::new(),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(1) => self.state.set_screen(Screen::Scout),
            KeyCode::F(2) => self.state.set_screen(Screen::Compare),
            KeyCode::Tab | KeyCode::Down => self.state.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.state.focus_prev(),
            KeyCode::Left | KeyCode::Right => self.state.cycle_focused(),
            KeyCode::PageDown => self.state.scroll_stats(10),
            KeyCode::PageUp => self.state.scroll_stats(-10),
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Enter => self.submit(),
            KeyCode::Char(c) => self.state.input_char(c),
            _ => {}
        }
    }

    fn submit(&mut self) {
        if self.state.busy {
            self.state.push_log("[INFO] Still working on the previous request");
            return;
        }
        let cmd = match self.state.build_command() {
            Ok(cmd) => cmd,
            Err(msg) => {
                self.state.push_log(format!("[WARN] {msg}"));
                return;
            }
        };
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Worker unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Worker stopped; restart the dashboard");
        } else {
            self.state.busy = true;
            self.state.push_log("[INFO] Request sent");
        }
    }
}

fn main() -> io::Result<()> {
    let config = ScraperConfig::from_env();
    logging::init("off");

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let mut app = match PageFetcher::new(&config) {
        Ok(fetcher) => {
            worker::spawn_worker(fetcher, config, tx, cmd_rx);
            App::new(Some(cmd_tx))
        }
        Err(err) => {
            let mut app = App::new(None);
            app.state.push_log(format!("[WARN] HTTP client unavailable: {err}"));
            app
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            app.state.apply_delta(delta);
        }

        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
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

fn ui(frame: &mut Frame, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(20)])
        .split(chunks[1]);
    render_form(frame, body[0], state);
    match state.screen {
        Screen::Scout => render_scout(frame, body[1], state),
        Screen::Compare => render_compare(frame, body[1], state),
    }

    render_console(frame, chunks[2], state);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

fn header_text(state: &DashboardState) -> String {
    let tab = |screen: Screen, label: &str| {
        if state.screen == screen {
            format!("[{label}]")
        } else {
            format!(" {label} ")
        }
    };
    let status = if state.busy { " | working..." } else { "" };
    format!(
        "FBREF SCOUT  {} {}{}",
        tab(Screen::Scout, "F1 Scout"),
        tab(Screen::Compare, "F2 Compare"),
        status
    )
}

fn footer_text(state: &DashboardState) -> String {
    let edit = if state.focused_is_text() {
        "Type to edit"
    } else {
        "←/→/Space Cycle"
    };
    format!("Tab/↑/↓ Field | {edit} | Enter Run | PgUp/PgDn Scroll | F1/F2 Screen | Esc Quit")
}

fn render_form(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let mut lines = Vec::new();
    for field in state.fields() {
        let focused = *field == state.focus;
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if focused && state.focused_is_text() { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{:<12}", field.label()), style),
            Span::raw(format!("{}{cursor}", state.form.value(*field))),
        ]));
    }
    if let Some(err) = &state.last_error {
        lines.push(Line::raw(""));
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    let title = match state.screen {
        Screen::Scout => "Scout",
        Screen::Compare => "Compare",
    };
    let form = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(form, area);
}

fn render_scout(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let Some(result) = &state.scout_result else {
        let empty = Paragraph::new("Enter a player name and press Enter")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Passport"));
        frame.render_widget(empty, area);
        return;
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(3)])
        .split(area);

    let profile = &result.report.profile;
    let mut lines = profile
        .fields()
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label:<14}"), Style::default().fg(Color::Cyan)),
                Span::raw(value.to_string()),
            ])
        })
        .collect::<Vec<_>>();
    if let Some(path) = &result.passport {
        lines.push(Line::raw(format!("Passport      {}", path.display())));
    }
    if let Some(path) = &result.csv {
        lines.push(Line::raw(format!("CSV           {}", path.display())));
    }
    let passport = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Passport"));
    frame.render_widget(passport, sections[0]);

    let title = format!(
        "Stats | {} | {} | {}",
        result.request.competition.label(),
        result.request.season.label(),
        result.request.stat_type
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let stats = match &result.report.stats {
        Some(Ok(stats)) if !stats.is_empty() => stats,
        Some(Ok(_)) => {
            frame.render_widget(Paragraph::new("No season rows").block(block), sections[1]);
            return;
        }
        Some(Err(miss)) => {
            let msg = Paragraph::new(miss.message())
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(msg, sections[1]);
            return;
        }
        None => {
            let msg = match &result.stats_error {
                Some(err) => Paragraph::new(err.clone())
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true }),
                None => Paragraph::new("No stats requested"),
            };
            frame.render_widget(msg.block(block), sections[1]);
            return;
        }
    };

    let visible = sections[1].height.saturating_sub(3) as usize;
    let rows = stats
        .rows()
        .skip(state.stats_scroll)
        .take(visible)
        .map(|(season, category, stat, value)| {
            Row::new(vec![
                Cell::from(season.to_string()),
                Cell::from(category.to_string()),
                Cell::from(stat.to_string()),
                Cell::from(value.to_string()),
            ])
        })
        .collect::<Vec<_>>();
    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Min(6),
        ],
    )
    .header(
        Row::new(vec!["Season", "Category", "Stat", "Value"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    frame.render_widget(table, sections[1]);
}

fn render_compare(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let block = Block::default().borders(Borders::ALL).title("Comparison");
    let Some(result) = &state.compare_result else {
        let empty = Paragraph::new("Enter two player names and press Enter")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let lines = match &result.comparison {
        Comparison::Chart(chart) => {
            let label_width = chart
                .rows
                .iter()
                .map(|row| row.label.chars().count())
                .max()
                .unwrap_or(0);
            let spare = (area.width as usize).saturating_sub(label_width + 24);
            let mut lines = vec![Line::styled(
                chart.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            lines.extend(render_text(chart, (spare / 2).clamp(4, 40)).into_iter().map(Line::raw));
            if let Some(path) = &result.svg {
                lines.push(Line::raw(format!("SVG: {}", path.display())));
            }
            lines
        }
        Comparison::NothingInCommon => vec![Line::styled(
            format!(
                "{} and {} share no numeric stat",
                result.players[0], result.players[1]
            ),
            Style::default().fg(Color::Yellow),
        )],
        Comparison::Missing { player, miss } => vec![Line::styled(
            format!("No stats for {player}: {}", miss.message()),
            Style::default().fg(Color::Yellow),
        )],
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_console(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = state
        .logs
        .iter()
        .skip(state.logs.len().saturating_sub(visible))
        .map(|line| {
            let style = if line.starts_with("[WARN]") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::styled(line.clone(), style)
        })
        .collect::<Vec<_>>();
    let console = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Console"));
    frame.render_widget(console, area);
}
