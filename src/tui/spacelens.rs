use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use super::barlist::bar_list_lines;
use crate::common::format::{format_path, format_size};
use crate::common::CancelToken;
use crate::scanner::spacelens::{analyze, total_size, SpaceLensNode};

/// Rows taken by the header, path line, blank lines and footer
const CHROME_ROWS: usize = 7;
const MIN_VISIBLE_ROWS: usize = 4;

/// Navigation input, decoupled from the terminal library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    DrillIn,
    DrillOut,
    Quit,
}

impl Key {
    pub fn from_event(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Quit),
            KeyCode::Char('q') | KeyCode::Esc => Some(Key::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Key::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Key::Down),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => Some(Key::DrillIn),
            KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => Some(Key::DrillOut),
            _ => None,
        }
    }
}

/// What the event loop must do after a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Start sizing the children of this directory
    Load(PathBuf),
    Quit,
}

/// Navigation state of the disk-usage browser.
///
/// Pure: keys go in, effects come out, and the caller performs the
/// directory walk and hands its result back via [`finish_loading`].
///
/// [`finish_loading`]: SpaceLensState::finish_loading
#[derive(Debug, Clone)]
pub struct SpaceLensState {
    path: PathBuf,
    nodes: Vec<SpaceLensNode>,
    cursor: usize,
    scroll_offset: usize,
    loading: bool,
    error: Option<String>,
    height: usize,
}

impl SpaceLensState {
    /// Starts in the loading state for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            nodes: Vec::new(),
            cursor: 0,
            scroll_offset: 0,
            loading: true,
            error: None,
            height: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn nodes(&self) -> &[SpaceLensNode] {
        &self.nodes
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Terminal height changed
    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.ensure_visible();
    }

    pub fn visible_lines(&self) -> usize {
        self.height
            .saturating_sub(CHROME_ROWS)
            .max(MIN_VISIBLE_ROWS)
    }

    pub fn handle(&mut self, key: Key) -> Effect {
        match key {
            Key::Quit => Effect::Quit,
            Key::Up if !self.loading => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.ensure_visible();
                }
                Effect::None
            }
            Key::Down if !self.loading => {
                if self.cursor + 1 < self.nodes.len() {
                    self.cursor += 1;
                    self.ensure_visible();
                }
                Effect::None
            }
            Key::DrillIn if !self.loading => match self.nodes.get(self.cursor) {
                Some(node) if node.is_dir => {
                    let target = node.path.clone();
                    self.enter(target)
                }
                _ => Effect::None,
            },
            // A top-level directory has no parent to browse
            Key::DrillOut => match self.path.parent() {
                Some(parent) if parent.components().any(|c| matches!(c, Component::Normal(_))) => {
                    let target = parent.to_path_buf();
                    self.enter(target)
                }
                _ => Effect::None,
            },
            _ => Effect::None,
        }
    }

    fn enter(&mut self, path: PathBuf) -> Effect {
        self.path = path.clone();
        self.nodes.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
        self.loading = true;
        self.error = None;
        Effect::Load(path)
    }

    /// Deliver the sizing result for `path`.
    ///
    /// Returns false and changes nothing when the user has already moved
    /// somewhere else.
    pub fn finish_loading(&mut self, path: &Path, result: Result<Vec<SpaceLensNode>, String>) -> bool {
        if !self.loading || path != self.path {
            return false;
        }
        self.loading = false;
        match result {
            Ok(nodes) => self.nodes = nodes,
            Err(e) => self.error = Some(e),
        }
        self.cursor = 0;
        self.scroll_offset = 0;
        true
    }

    /// Keep the cursor inside `[scroll_offset, scroll_offset + visible)`
    fn ensure_visible(&mut self) {
        let visible = self.visible_lines();
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        }
        if self.cursor >= self.scroll_offset + visible {
            self.scroll_offset = self.cursor + 1 - visible;
        }
    }
}

/// A directory walk running on a background thread
struct PendingLoad {
    cancel: CancelToken,
}

type LoadResult = (PathBuf, Result<Vec<SpaceLensNode>, String>);

fn spawn_load(path: PathBuf, tx: mpsc::Sender<LoadResult>) -> PendingLoad {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    std::thread::spawn(move || {
        let result = analyze(&path, &token).map_err(|e| e.to_string());
        if token.is_cancelled() {
            return;
        }
        // The receiver is gone once the browser has quit
        let _ = tx.send((path, result));
    });
    PendingLoad { cancel }
}

/// Run the interactive Space Lens browser rooted at `path`
pub fn run_spacelens(path: &Path) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let result = match Terminal::new(backend) {
        Ok(mut terminal) => event_loop(&mut terminal, path),
        Err(e) => Err(e.into()),
    };

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, path: &Path) -> Result<()> {
    let (tx, rx) = mpsc::channel::<LoadResult>();
    let mut state = SpaceLensState::new(path);
    let mut pending = Some(spawn_load(path.to_path_buf(), tx.clone()));

    loop {
        while let Ok((loaded, result)) = rx.try_recv() {
            if state.finish_loading(&loaded, result) {
                pending = None;
            }
        }

        let height = terminal.size()?.height as usize;
        state.set_height(height);
        terminal.draw(|frame| draw(frame, &state))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => continue,
        };
        let Some(key) = Key::from_event(key.code, key.modifiers) else {
            continue;
        };

        match state.handle(key) {
            Effect::None => {}
            Effect::Load(next) => {
                if let Some(old) = pending.take() {
                    old.cancel.cancel();
                }
                pending = Some(spawn_load(next, tx.clone()));
            }
            Effect::Quit => {
                if let Some(old) = pending.take() {
                    old.cancel.cancel();
                }
                return Ok(());
            }
        }
    }
}

fn draw(frame: &mut Frame, state: &SpaceLensState) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(Line::from(Span::styled(
        " Space Lens",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(header, chunks[0]);

    let location = if state.is_loading() {
        format_path(state.path())
    } else {
        format!(
            "{} ({})",
            format_path(state.path()),
            format_size(total_size(state.nodes()))
        )
    };
    frame.render_widget(
        Paragraph::new(format!(" {}", location)).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );

    let body: Vec<Line> = if state.is_loading() {
        vec![Line::from("  Analyzing...")]
    } else if let Some(err) = state.error() {
        vec![Line::styled(format!("  {}", err), Style::default().fg(Color::Red))]
    } else {
        bar_list_lines(
            state.nodes(),
            area.width as usize,
            state.visible_lines(),
            state.cursor(),
            state.scroll_offset(),
        )
    };
    frame.render_widget(Paragraph::new(body), chunks[2]);

    let help = " ↑/↓ navigate | enter/→ drill in | ←/h go up | q quit";
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}
