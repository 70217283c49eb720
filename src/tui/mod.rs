//! Interactive terminal UI
//!
//! A small input/loading/results state machine. Key handling is pure
//! (no terminal access) so the transitions are unit-testable; the event
//! loop owns the terminal and the async search task.

use crate::api::ApiClient;
use crate::connectors::SearchHit;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiState {
    Input,
    Loading,
    Results,
}

type SearchOutcome = std::result::Result<Vec<SearchHit>, String>;

/// UI state machine.
struct App {
    input: String,
    state: UiState,
    results: Vec<SearchHit>,
    cursor: usize,
    error: Option<String>,
    quit: bool,
    /// Query submitted on the last Enter; consumed by the event loop.
    pending_query: Option<String>,
}

impl App {
    fn new() -> Self {
        Self {
            input: String::new(),
            state: UiState::Input,
            results: Vec::new(),
            cursor: 0,
            error: None,
            quit: false,
            pending_query: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if self.state == UiState::Input {
                    self.quit = true;
                } else {
                    self.state = UiState::Input;
                }
            }
            KeyCode::Enter => {
                if self.state == UiState::Input && !self.input.trim().is_empty() {
                    self.error = None;
                    self.state = UiState::Loading;
                    self.pending_query = Some(self.input.clone());
                }
            }
            KeyCode::Up => {
                if self.state == UiState::Results && self.cursor > 0 {
                    self.cursor -= 1;
                }
            }
            KeyCode::Down => {
                if self.state == UiState::Results && self.cursor + 1 < self.results.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Backspace => {
                if self.state == UiState::Input {
                    self.input.pop();
                }
            }
            KeyCode::Char(c) => {
                if self.state == UiState::Input {
                    self.input.push(c);
                }
            }
            _ => {}
        }
    }

    fn apply_outcome(&mut self, outcome: SearchOutcome) {
        match outcome {
            Ok(results) => {
                self.results = results;
                self.cursor = 0;
                self.state = UiState::Results;
            }
            Err(message) => {
                self.error = Some(message);
                self.state = UiState::Input;
            }
        }
    }
}

/// Run the TUI against the given API client until the user quits.
pub async fn run(client: ApiClient) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    stdout
        .execute(EnterAlternateScreen)
        .context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let result = event_loop(&mut terminal, client).await;

    // Restore the terminal even when the loop failed.
    let _ = disable_raw_mode();
    let _ = terminal.backend_mut().execute(LeaveAlternateScreen);

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: ApiClient,
) -> Result<()> {
    let client = Arc::new(client);
    let (tx, mut rx) = mpsc::unbounded_channel::<SearchOutcome>();
    let mut app = App::new();

    while !app.quit {
        terminal.draw(|frame| draw(frame, &app))?;

        if let Some(query) = app.pending_query.take() {
            let client = Arc::clone(&client);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = client
                    .search(&query, None)
                    .await
                    .map_err(|err| err.to_string());
                let _ = tx.send(outcome);
            });
        }

        if event::poll(Duration::from_millis(50)).context("poll events")? {
            if let Event::Key(key) = event::read().context("read event")? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        while let Ok(outcome) = rx.try_recv() {
            app.apply_outcome(outcome);
        }
    }

    Ok(())
}

fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Search your knowledge base"),
    );
    frame.render_widget(input, chunks[0]);

    match app.state {
        UiState::Loading => {
            frame.render_widget(Paragraph::new("Searching..."), chunks[1]);
        }
        UiState::Results if app.results.is_empty() => {
            frame.render_widget(Paragraph::new("No results found."), chunks[1]);
        }
        UiState::Results => {
            let items: Vec<ListItem> = app
                .results
                .iter()
                .enumerate()
                .map(|(i, hit)| {
                    let selected = i == app.cursor;
                    let marker = if selected { "> " } else { "  " };
                    let title_style = if selected {
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().add_modifier(Modifier::BOLD)
                    };

                    let mut lines = vec![Line::from(vec![
                        Span::raw(marker),
                        Span::styled(hit.title.clone(), title_style),
                    ])];
                    lines.push(Line::from(Span::styled(
                        format!("  {}", hit.url),
                        Style::default().fg(Color::DarkGray),
                    )));
                    lines.push(Line::from(Span::styled(
                        format!("  [{}]", hit.source),
                        Style::default().fg(Color::Magenta),
                    )));
                    ListItem::new(lines)
                })
                .collect();

            let list =
                List::new(items).block(Block::default().title(format!(
                    "{} results",
                    app.results.len()
                )));
            frame.render_widget(list, chunks[1]);
        }
        UiState::Input => {
            if let Some(ref error) = app.error {
                frame.render_widget(
                    Paragraph::new(format!("Error: {error}"))
                        .style(Style::default().fg(Color::Red)),
                    chunks[1],
                );
            }
        }
    }

    let hint = match app.state {
        UiState::Results => "esc: back | ctrl+c: quit | up/down: navigate",
        _ => "enter: search | esc: quit | ctrl+c: quit",
    };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}
