use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::execute;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use league_roasted::api::{HttpBackend, RoastBackend};
use league_roasted::config::{AppConfig, StoreKind};
use league_roasted::fake_backend::FakeBackend;
use league_roasted::model::{AnalysisRequest, CardStyle, StatLine};
use league_roasted::orchestrator::{self, Orchestrator};
use league_roasted::persist::{KeyValueStore, MemoryStore, SessionFileStore};
use league_roasted::session_cache::{SessionCache, cache_key};
use league_roasted::share;
use league_roasted::state::{self, AppState, Delta, Screen, ViewState, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
    tx: mpsc::Sender<Delta>,
}

impl App {
    fn new(config: AppConfig, orchestrator: Arc<Orchestrator>, tx: mpsc::Sender<Delta>) -> Self {
        let mut state = AppState::new();
        state.comparison_enabled = config.comparison_enabled;
        Self {
            state,
            should_quit: false,
            config,
            orchestrator,
            tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }
        match self.state.screen {
            Screen::Search => self.on_search_key(key),
            Screen::Results => self.on_results_key(key),
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit(false),
            KeyCode::F(5) => self.submit(true),
            KeyCode::F(1) => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => {
                if self.state.is_loading() {
                    self.cancel();
                } else if self.state.result().is_some() {
                    self.state.screen = Screen::Results;
                }
            }
            _ if self.state.is_loading() => {}
            KeyCode::Tab => self.state.region = self.state.region.next(),
            KeyCode::BackTab => self.state.region = self.state.region.prev(),
            KeyCode::Down => self.state.cycle_pro_target(true),
            KeyCode::Up => self.state.cycle_pro_target(false),
            KeyCode::Backspace => {
                self.state.input.pop();
            }
            KeyCode::Char(c) => self.state.input.push(c),
            _ => {}
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc if self.state.is_loading() => self.cancel(),
            KeyCode::Char('n') | KeyCode::Char('/') | KeyCode::Esc => {
                self.state.screen = Screen::Search
            }
            KeyCode::Char('l') | KeyCode::Right => self.state.next_card(),
            KeyCode::Char('h') | KeyCode::Left => self.state.prev_card(),
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c.to_digit(10).unwrap_or(1) as usize - 1;
                self.state.go_to_card(idx);
            }
            KeyCode::Char('r') => self.roast_again(),
            KeyCode::Char('f') => self.refresh_last_search(),
            KeyCode::Char('s') => self.share_current_card(),
            _ => {}
        }
    }

    fn submit(&mut self, force_refresh: bool) {
        if self.state.is_loading() {
            self.state.push_log("[INFO] Analysis already running (Esc cancels)");
            return;
        }
        let name = self.state.input.trim().to_string();
        if name.is_empty() {
            self.state.push_log("[INFO] Enter a summoner name (Name#TAG)");
            return;
        }
        let target = self.state.selected_pro().map(|t| t.player.id.clone());
        let request = AnalysisRequest::new(name, self.state.region)
            .with_comparison(target)
            .forced(force_refresh);
        self.start(request);
    }

    fn start(&mut self, request: AnalysisRequest) {
        let generation =
            orchestrator::spawn_analysis(self.orchestrator.clone(), request, self.tx.clone());
        apply_delta(&mut self.state, Delta::Started { generation });
    }

    fn roast_again(&mut self) {
        if self.state.is_loading() {
            return;
        }
        if self.orchestrator.cache().last_search().is_none() {
            self.state.push_log("[INFO] Nothing to roast again yet");
            return;
        }
        let generation = orchestrator::spawn_roast_again(self.orchestrator.clone(), self.tx.clone());
        apply_delta(&mut self.state, Delta::Started { generation });
    }

    fn refresh_last_search(&mut self) {
        if self.state.is_loading() {
            return;
        }
        let Some(last) = self.orchestrator.cache().last_search() else {
            self.state.push_log("[INFO] Nothing to refresh yet");
            return;
        };
        self.start(AnalysisRequest::new(last.summoner_name, last.region).forced(true));
    }

    fn cancel(&mut self) {
        let generation = self.orchestrator.cancel();
        apply_delta(&mut self.state, Delta::Cancelled { generation });
        self.state.push_log("[INFO] Analysis cancelled");
    }

    fn share_current_card(&mut self) {
        let Some(result) = self.state.result() else {
            return;
        };
        let key = self
            .orchestrator
            .cache()
            .last_search()
            .map(|s| cache_key(&s.summoner_name, s.region))
            .unwrap_or_else(|| "player".to_string());
        let msg = match share::export_card(
            &self.config.export_dir,
            &key,
            result,
            self.state.card_index,
        ) {
            Ok(path) => format!("[INFO] Card saved to {}", path.display()),
            Err(err) => format!("[WARN] Share failed: {err:#}"),
        };
        self.state.push_log(msg);
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = AppConfig::from_env();

    let (tx, rx) = mpsc::channel();
    let mut boot_logs = Vec::new();

    let store: Arc<dyn KeyValueStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => match SessionFileStore::open_default() {
            Ok(store) => {
                boot_logs.push(format!("[INFO] Session store: {}", store.path().display()));
                Arc::new(store)
            }
            Err(err) => {
                boot_logs.push(format!("[WARN] Session file unavailable ({err:#}), using memory"));
                Arc::new(MemoryStore::new())
            }
        },
    };
    let backend: Arc<dyn RoastBackend> = if config.offline {
        boot_logs.push("[INFO] Offline mode: using canned roasts".to_string());
        Arc::new(FakeBackend::default())
    } else {
        let http = HttpBackend::from_config(&config).map_err(|err| io::Error::other(format!("{err:#}")))?;
        boot_logs.push(format!("[INFO] Backend: {}", config.api_base));
        Arc::new(http)
    };
    let orchestrator = Arc::new(Orchestrator::new(backend, SessionCache::new(store)));
    if config.comparison_enabled {
        orchestrator::spawn_pro_directory_fetch(orchestrator.clone(), tx.clone());
    }

    let mut app = App::new(config, orchestrator, tx);
    for msg in boot_logs {
        app.state.push_log(msg);
    }

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
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

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

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text())
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_search_form(frame, chunks[1], &app.state);

    match &app.state.view {
        ViewState::Idle => render_idle(frame, chunks[2]),
        ViewState::Loading {
            progress,
            rate_limit,
        } => render_loading(frame, chunks[2], progress, rate_limit.as_deref()),
        ViewState::Failed(error) => render_error(frame, chunks[2], error),
        ViewState::Success(_) => render_results(frame, chunks[2], &app.state),
    }

    render_console(frame, chunks[3], &app.state);

    let footer = Paragraph::new(footer_text(&app.state))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[4]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text() -> String {
    let line1 = "  LEAGUE ROASTED | 2025 SEASON RECAP".to_string();
    let line2 = "  Your ranked stats, but make it hurt.".to_string();
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Search => {
            "Enter Roast me | F5 Fresh stats | Tab Region | ↑/↓ Pro | Esc Cancel/Results | F1 Help | Ctrl+C Quit".to_string()
        }
        Screen::Results => {
            "←/→ Card | 1-9 Jump | r Roast again | f Fresh | s Share | n New search | ? Help | q Quit".to_string()
        }
    }
}

fn render_search_form(frame: &mut Frame, area: Rect, state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(36),
        ])
        .split(area);

    let focused = state.screen == Screen::Search && !state.is_loading();
    let input_style = if focused {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_text = if state.input.is_empty() {
        "Enter Summoner Name (e.g., Name#TAG)".to_string()
    } else if focused {
        format!("{}_", state.input)
    } else {
        state.input.clone()
    };
    let input = Paragraph::new(input_text)
        .style(input_style)
        .block(Block::default().title("Summoner").borders(Borders::ALL));
    frame.render_widget(input, cols[0]);

    let region = Paragraph::new(state.region.label())
        .block(Block::default().title("Region").borders(Borders::ALL));
    frame.render_widget(region, cols[1]);

    let pro_text = if !state.comparison_enabled {
        "disabled".to_string()
    } else {
        state
            .selected_pro()
            .map(|t| t.label())
            .unwrap_or_else(|| "none (year review)".to_string())
    };
    let pro = Paragraph::new(pro_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Compare with pro").borders(Borders::ALL));
    frame.render_widget(pro, cols[2]);
}

fn render_idle(frame: &mut Frame, area: Rect) {
    let text = "Type a Riot ID, pick a region and press Enter.";
    let idle = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(idle, area);
}

fn render_loading(frame: &mut Frame, area: Rect, progress: &str, rate_limit: Option<&str>) {
    let mut lines = vec![
        Line::from(""),
        Line::styled(progress.to_string(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(advisory) = rate_limit {
        lines.push(Line::styled(
            advisory.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "This may take 1-2 minutes",
        Style::default().fg(Color::DarkGray),
    ));
    let loading = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().title("Roasting").borders(Borders::ALL));
    frame.render_widget(loading, area);
}

fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = format!("Error: {error}");
    let error_box = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Error").borders(Borders::ALL));
    frame.render_widget(error_box, area);
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(result) = state.result() else {
        return;
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    let heading = Paragraph::new(format!(
        "{}\nCurrent Rank: {}",
        result.headline(),
        result.your_rank
    ))
    .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(heading, sections[0]);

    let Some(card) = state.current_card() else {
        let empty = Paragraph::new("No postcards generated")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, sections[1]);
        return;
    };

    let accent = match card.style() {
        CardStyle::Default => Color::Yellow,
        CardStyle::Comparison => Color::Cyan,
        CardStyle::Other(_) => Color::Magenta,
    };
    let mut lines = Vec::new();
    if state.card_index == 0
        && result.is_pro_comparison()
        && let Some(pro) = &result.pro_info
    {
        lines.push(Line::styled(
            format!("{} - {}", pro.name, pro.team),
            Style::default().fg(Color::Cyan),
        ));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(card.content.clone()));
    match card.stat_line() {
        Some(StatLine::Single(stat)) => {
            lines.push(Line::from(""));
            lines.push(Line::styled(
                stat,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ));
        }
        Some(StatLine::Pair { yours, pro }) => {
            let pro_label = result
                .pro_info
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Pro".to_string());
            lines.push(Line::from(""));
            lines.push(Line::styled(
                format!("You {yours}   VS   {pro_label} {pro}"),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ));
        }
        None => {}
    }

    let title = format!(
        " {} | {} ",
        card.title,
        state.card_position_label().unwrap_or_default()
    );
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        );
    frame.render_widget(body, sections[1]);

    let dots: String = (0..result.postcards.len())
        .map(|i| if i == state.card_index { "● " } else { "○ " })
        .collect();
    let nav = Paragraph::new(dots.trim_end().to_string()).alignment(Alignment::Center);
    frame.render_widget(nav, sections[2]);
}

fn render_console(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(start)
        .map(|msg| {
            let style = if msg.starts_with("[WARN]") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::styled(msg.clone(), style)
        })
        .collect();
    let console = Paragraph::new(lines).block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "League Roasted - Help",
        "",
        "Search:",
        "  type         Summoner name (Name#TAG)",
        "  Tab/S-Tab    Cycle region",
        "  ↑/↓          Pick pro to compare (when enabled)",
        "  Enter        Roast (reuses cached stats)",
        "  F5           Roast with fresh stats",
        "  Esc          Cancel / back to results",
        "",
        "Results:",
        "  ←/→ or h/l   Previous / next card",
        "  1-9          Jump to card",
        "  r            Roast me again",
        "  f            Refetch stats and roast",
        "  s            Save this card as text",
        "  n            New search",
        "  q / Ctrl+C   Quit",
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
