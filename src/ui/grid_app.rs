// Terminal host for a single grid
// Owns the terminal, the event loop and the filter/find inputs

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tracing::{debug, info};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::config::config::Config;
use crate::handlers::navigation::NavigationHandler;
use crate::state::events::GridEvent;
use crate::state::grid::Grid;
use crate::ui::actions::{Action, ActionResult, NavigateAction};
use crate::ui::grid_renderer::{column_at, render_grid, GridLayout};
use crate::ui::render_context::GridRenderContext;
use crate::utils::logging::LogRingBuffer;

/// Longest the loop sleeps waiting for input
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LOG_PANEL_HEIGHT: u16 = 10;
const MOUSE_SCROLL_ROWS: isize = 3;

const HELP_TEXT: &str = "↑↓/jk move  PgUp/PgDn page  Home/End  ←→/hl column  s sort  1-9 sort column  / filter  f find  n next  Ctrl+R reload  Ctrl+L logs  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Filter,
    Find,
}

pub struct GridApp {
    grid: Grid,
    config: Config,
    navigation: NavigationHandler,
    mode: InputMode,
    input: Input,
    last_find: String,
    message: Option<String>,
    show_logs: bool,
    show_help: bool,
    log_buffer: Option<LogRingBuffer>,
    /// Layout of the last frame, for mouse hit testing
    layout: Option<GridLayout>,
}

impl GridApp {
    pub fn new(grid: Grid, config: Config, log_buffer: Option<LogRingBuffer>) -> Self {
        let navigation = NavigationHandler::new(config.keybindings.vim_mode);
        Self {
            grid,
            config,
            navigation,
            mode: InputMode::Browse,
            input: Input::default(),
            last_find: String::new(),
            message: None,
            show_logs: false,
            show_help: false,
            log_buffer,
            layout: None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Must be called inside a tokio runtime; fetches are spawned onto it
    pub fn run(mut self) -> Result<()> {
        enable_raw_mode().map_err(|e| anyhow::anyhow!("Failed to enable raw mode: {}", e))?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(anyhow::anyhow!("Failed to setup terminal: {}", e));
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                let _ = disable_raw_mode();
                return Err(anyhow::anyhow!("Failed to create terminal: {}", e));
            }
        };

        let res = self.run_app(&mut terminal);

        // Always restore terminal, even on error
        self.grid.unmount();
        let _ = disable_raw_mode();
        let _ = execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = terminal.show_cursor();

        res.map_err(|e| anyhow::anyhow!("TUI error: {}", e))
    }

    fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.grid.mount();
        info!(target: "grid", "Grid app started");

        loop {
            let events = self.grid.tick();
            self.note_events(&events);

            self.draw(terminal)?;

            // Wake up early when the filter debounce is about to fire
            let timeout = self
                .grid
                .sort_filter()
                .time_until_filter()
                .map_or(POLL_INTERVAL, |remaining| remaining.min(POLL_INTERVAL));

            if event::poll(timeout)? {
                let exit = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse);
                        false
                    }
                    _ => false,
                };
                if exit {
                    break;
                }
            }
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let size = terminal.size()?;
        let areas = AppAreas::new(Rect::new(0, 0, size.width, size.height), self.show_logs);
        let layout = GridLayout::new(areas.grid, self.grid.config().filterable);
        self.grid.resize(layout.visible_rows());
        self.layout = Some(layout);

        terminal.draw(|f| self.ui(f, &areas))?;
        Ok(())
    }

    fn ui(&self, f: &mut Frame, areas: &AppAreas) {
        let ctx = GridRenderContext::from_grid(&self.grid, &self.config.display);
        render_grid(f, areas.grid, &ctx);

        if self.mode == InputMode::Filter {
            if let Some(filter_area) = self.layout.and_then(|layout| layout.filter) {
                f.set_cursor_position((
                    filter_area.x + 1 + self.input.visual_cursor() as u16,
                    filter_area.y + 1,
                ));
            }
        }

        if let Some(logs_area) = areas.logs {
            self.render_logs(f, logs_area);
        }
        self.render_status_line(f, areas.status);
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .log_buffer
            .as_ref()
            .map(|buffer| buffer.get_recent(area.height.saturating_sub(2) as usize))
            .unwrap_or_default()
            .iter()
            .map(|entry| Line::from(entry.format_for_display()))
            .collect();

        let logs = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Logs"))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(logs, area);
    }

    fn render_status_line(&self, f: &mut Frame, area: Rect) {
        let (mode_label, mode_color) = match self.mode {
            InputMode::Browse => ("BROWSE", Color::Cyan),
            InputMode::Filter => ("FILTER", Color::Yellow),
            InputMode::Find => ("FIND", Color::Magenta),
        };
        let mut spans = vec![Span::styled(
            format!(" {} ", mode_label),
            Style::default()
                .fg(Color::Black)
                .bg(mode_color)
                .add_modifier(Modifier::BOLD),
        )];

        if self.mode == InputMode::Find {
            spans.push(Span::raw(format!(" Find: {}", self.input.value())));
        } else if self.show_help {
            spans.push(Span::raw(format!(" {}", HELP_TEXT)));
        } else if let Some(message) = &self.message {
            spans.push(Span::raw(format!(" {}", message)));
        } else {
            spans.push(Span::styled(
                " ? for help",
                Style::default().fg(Color::DarkGray),
            ));
        }

        f.render_widget(Paragraph::new(Line::from(spans)), area);

        if self.mode == InputMode::Find {
            f.set_cursor_position((
                area.x + mode_label.len() as u16 + 9 + self.input.visual_cursor() as u16,
                area.y,
            ));
        }
    }

    fn note_events(&mut self, events: &[GridEvent]) {
        for event in events {
            debug!(target: "grid", "Grid event: {:?}", event);
            match event {
                GridEvent::EndReached { row } => {
                    self.message = Some(format!("Last row is {}", row + 1));
                }
                GridEvent::Exhausted { total } => {
                    self.message = Some(format!("All {} rows loaded", total));
                }
                GridEvent::FetchFailed { .. } | GridEvent::RowsLoaded { .. } => {}
            }
        }
    }

    /// Handle one key press. Returns true when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            InputMode::Browse => match self.navigation.handle_key(key) {
                Some(action) => self.dispatch(action) == ActionResult::Exit,
                None => false,
            },
            InputMode::Filter => {
                self.handle_filter_key(key);
                false
            }
            InputMode::Find => {
                self.handle_find_key(key);
                false
            }
        }
    }

    pub fn dispatch(&mut self, action: Action) -> ActionResult {
        match action {
            Action::Navigate(navigate) => self.grid.navigate(navigate),
            Action::Sort(column) => {
                let sorted = match column {
                    Some(index) => self.grid.toggle_sort_at(index),
                    None => self.grid.toggle_sort_selected(),
                };
                self.message = Some(match (sorted, self.grid.sort()) {
                    (false, _) => "Column is not sortable".to_string(),
                    (true, Some(key)) => format!("Sorted by {}", key),
                    (true, None) => "Sort cleared".to_string(),
                });
            }
            Action::StartFilter => {
                if !self.grid.config().filterable {
                    return ActionResult::NotHandled;
                }
                let text = self.grid.sort_filter().input_text().to_string();
                let cursor = text.chars().count();
                self.input = Input::new(text).with_cursor(cursor);
                self.mode = InputMode::Filter;
            }
            Action::ClearFilter => {
                if self.grid.clear_filter() {
                    self.message = Some("Filter cleared".to_string());
                }
            }
            Action::Refresh => {
                self.grid.reload();
                self.message = Some("Reloading".to_string());
            }
            Action::StartFind => {
                if !self.grid.config().findable {
                    return ActionResult::NotHandled;
                }
                self.input = Input::default();
                self.mode = InputMode::Find;
            }
            Action::FindNext => {
                if self.last_find.is_empty() {
                    return ActionResult::NotHandled;
                }
                let text = self.last_find.clone();
                self.find(&text);
            }
            Action::ToggleLogs => self.show_logs = !self.show_logs,
            Action::ShowHelp => self.show_help = !self.show_help,
            Action::Quit => return ActionResult::Exit,
        }
        ActionResult::Handled
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.grid.apply_filter_now(self.input.value());
                self.mode = InputMode::Browse;
            }
            KeyCode::Esc => {
                // Leave the input; typed text still applies after the debounce
                self.mode = InputMode::Browse;
            }
            _ => {
                if self.input.handle_event(&Event::Key(key)).is_some() {
                    self.grid.set_filter(self.input.value());
                }
            }
        }
    }

    fn handle_find_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let text = self.input.value().to_string();
                self.mode = InputMode::Browse;
                if !text.trim().is_empty() {
                    self.last_find = text.clone();
                    self.find(&text);
                }
            }
            KeyCode::Esc => self.mode = InputMode::Browse,
            _ => {
                self.input.handle_event(&Event::Key(key));
            }
        }
    }

    fn find(&mut self, text: &str) {
        self.message = match self.grid.find_next(text) {
            Some(row) => Some(format!("'{}' found at row {}", text.trim(), row + 1)),
            None => self.grid.status().map(str::to_string),
        };
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.grid.scroll(MOUSE_SCROLL_ROWS),
            MouseEventKind::ScrollUp => self.grid.scroll(-MOUSE_SCROLL_ROWS),
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(layout) = self.layout else {
                    return;
                };
                if mouse.row == layout.header_y() {
                    let ctx = GridRenderContext::from_grid(&self.grid, &self.config.display);
                    if let Some(index) = column_at(&layout, &ctx, mouse.column) {
                        self.dispatch(Action::Sort(Some(index)));
                    }
                } else if let Some(row) =
                    layout.row_at(mouse.row, self.grid.viewport().scroll_offset())
                {
                    let focused = self.grid.focused_row();
                    let action = if row >= focused {
                        NavigateAction::Down(row - focused)
                    } else {
                        NavigateAction::Up(focused - row)
                    };
                    self.grid.navigate(action);
                }
            }
            _ => {}
        }
    }
}

/// Regions of the whole screen
struct AppAreas {
    grid: Rect,
    logs: Option<Rect>,
    status: Rect,
}

impl AppAreas {
    fn new(area: Rect, show_logs: bool) -> Self {
        let mut constraints = vec![Constraint::Min(6)];
        if show_logs {
            constraints.push(Constraint::Length(LOG_PANEL_HEIGHT));
        }
        constraints.push(Constraint::Length(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        Self {
            grid: chunks[0],
            logs: show_logs.then(|| chunks[1]),
            status: chunks[chunks.len() - 1],
        }
    }
}
