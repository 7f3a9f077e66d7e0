use crate::commands::{Dispatcher, Outcome};
use crate::config::{Paths, UserConfig};
use crate::search::SearchClient;
use crate::session::{History, LogBuffer};
use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::{execute, terminal};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const TITLE: &str = "Ubunolia";
const CAPTION: &str = "Tab to switch focus to upper frame.";

/// Which pane receives directional keys. Text entry always goes to the
/// input line regardless of focus.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Focus {
    Log,
    Input,
}

struct App {
    dispatcher: Dispatcher,
    log: Arc<LogBuffer>,
    history: History,
    input: String,
    focus: Focus,
    redraw_rx: Receiver<()>,
    should_exit: bool,
}

pub fn run(root: Option<PathBuf>) -> Result<()> {
    let paths = Paths::new(root)?;
    let config = UserConfig::load(&paths)?;
    let client = SearchClient::new(&config)?;
    let log = Arc::new(LogBuffer::new(config.log_capacity()));
    let (redraw_tx, redraw_rx) = mpsc::channel();
    let history = History::new(config.history_capacity());
    let dispatcher = Dispatcher::new(config, client, Arc::clone(&log), redraw_tx);

    let mut app = App {
        dispatcher,
        log,
        history,
        input: String::new(),
        focus: Focus::Input,
        redraw_rx,
        should_exit: false,
    };
    app.log
        .append("Type `connect` to start streaming, `help` for commands.");

    let mut terminal = enter_terminal()?;
    let res = run_loop(&mut terminal, &mut app);
    exit_terminal(&mut terminal)?;
    res
}

fn run_loop(terminal: &mut TuiTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|f| draw_ui(f, app))?;
    loop {
        let mut dirty = false;
        // Redraws for off-thread appends are explicitly requested by the
        // poller through this channel; the loop never scans the log itself.
        while app.redraw_rx.try_recv().is_ok() {
            dirty = true;
        }
        if crossterm::event::poll(Duration::from_millis(100))? {
            loop {
                if let Event::Key(key) = crossterm::event::read()? {
                    handle_key(key, app);
                    dirty = true;
                }
                if !crossterm::event::poll(Duration::from_millis(0))? {
                    break;
                }
            }
        }
        if app.should_exit {
            break;
        }
        if dirty {
            terminal.draw(|f| draw_ui(f, app))?;
        }
    }
    Ok(())
}

fn handle_key(key: KeyEvent, app: &mut App) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_exit = true;
        return;
    }

    match key.code {
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Log => Focus::Input,
                Focus::Input => Focus::Log,
            };
        }
        KeyCode::Enter => app.commit_line(),
        KeyCode::Up => match app.focus {
            Focus::Input => {
                app.input = app.history.previous().unwrap_or_default().to_string();
            }
            Focus::Log => app.log.scroll(-1),
        },
        KeyCode::Down => match app.focus {
            Focus::Input => {
                app.input = app.history.next_entry().unwrap_or_default().to_string();
            }
            Focus::Log => app.log.scroll(1),
        },
        KeyCode::PageUp => {
            if app.focus == Focus::Log {
                app.log.scroll(-10);
            }
        }
        KeyCode::PageDown => {
            if app.focus == Focus::Log {
                app.log.scroll(10);
            }
        }
        KeyCode::End => {
            if app.focus == Focus::Log {
                app.log.scroll_to_end();
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.input.push(ch);
            }
        }
        _ => {}
    }
}

impl App {
    /// Commit the current input line: record it, dispatch it, and render
    /// whatever came back (or the failure) into the log pane. Any handler
    /// error becomes a single `Error: ...` line; the session stays alive.
    fn commit_line(&mut self) {
        let line = self.input.trim().to_string();
        self.input.clear();
        if line.is_empty() {
            return;
        }
        self.history.push(line.clone());

        match self.dispatcher.dispatch(&line) {
            Ok(Outcome::Exit) => self.should_exit = true,
            Ok(Outcome::Output(text)) => {
                for out in text.lines().filter(|out| !out.is_empty()) {
                    self.log.append(out);
                }
            }
            Err(err) => self.log.append(format!("Error: {err}")),
        }
    }
}

fn draw_ui(f: &mut Frame, app: &App) {
    let regions = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Min(1),    // log pane
            Constraint::Length(1), // caption
            Constraint::Length(1), // input line
        ])
        .split(f.size());

    let reversed = Style::default().add_modifier(Modifier::REVERSED);
    f.render_widget(Paragraph::new(TITLE).style(reversed), regions[0]);

    let (lines, cursor) = app.log.snapshot();
    let items: Vec<ListItem> = lines
        .iter()
        .map(|line| {
            let style = if line.starts_with("Error: ") {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(line.clone()).style(style)
        })
        .collect();
    let mut list = List::new(items);
    if app.focus == Focus::Log {
        list = list.highlight_style(reversed);
    }
    let mut state = ListState::default();
    if !lines.is_empty() {
        state.select(Some(cursor));
    }
    f.render_stateful_widget(list, regions[1], &mut state);

    f.render_widget(Paragraph::new(CAPTION).style(reversed), regions[2]);
    f.render_widget(Paragraph::new(app.input.as_str()), regions[3]);
    if app.focus == Focus::Input {
        let max = regions[3].width.saturating_sub(1) as usize;
        let x = regions[3].x + app.input.len().min(max) as u16;
        f.set_cursor(x, regions[3].y);
    }
}

fn enter_terminal() -> Result<TuiTerminal> {
    terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn exit_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
