use std::{
    cell::Cell,
    fs::File,
    io,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quire_tui::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use quire_tui::document::{BlockType, Mark};
use quire_tui::editor::{Editor, has_block, has_mark};
use quire_tui::format::{self, DocumentFormat};
use quire_tui::hover_menu::{MenuPlacement, MenuSize, ScrollOffset, SelectionRect, place_menu};
use quire_tui::render::{RenderResult, render_document};
use quire_tui::selection::{Point, Selection};
use quire_tui::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;

/// A terminal rich-text editor that stores documents as HTML
#[derive(Parser, Debug)]
#[command(name = "quire", version, about, long_about = None)]
struct Cli {
    /// Document to edit (.html, .md or .ftml)
    #[arg(value_name = "FILE", required_unless_present_any = ["save", "clear"])]
    file: Option<PathBuf>,

    /// Print the document in the given format and exit
    #[arg(long, value_enum, value_name = "FORMAT")]
    export: Option<ExportFormat>,

    /// Hide the serialized HTML preview pane
    #[arg(long)]
    no_preview: bool,

    /// Number of undo steps to keep
    #[arg(long, value_name = "N")]
    history_limit: Option<usize>,

    /// Write debug logs to a file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Html,
    Markdown,
    Ftml,
}

impl From<ExportFormat> for DocumentFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Html => DocumentFormat::Html,
            ExportFormat::Markdown => DocumentFormat::Markdown,
            ExportFormat::Ftml => DocumentFormat::Ftml,
        }
    }
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_override_path())?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(effective.log_file.as_deref())?;

    let Some(path) = cli.file else {
        return Ok(());
    };

    if let Some(export) = cli.export {
        let loaded = format::load(&path)?;
        let output = format::render(export.into(), &loaded.document)?;
        println!("{output}");
        return Ok(());
    }

    run(path, &effective)
}

/// Logs go to `log_file` when given and are dropped otherwise, since the
/// terminal belongs to the editor.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }
    Ok(())
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let max_padding = width.saturating_sub(1) / 2;
    let left_padding = (width.saturating_sub(100) / 2 + 4).min(max_padding);
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn run(path: PathBuf, flags: &ConfigFlags) -> Result<()> {
    let loaded = format::load(&path)?;
    info!(path = %path.display(), format = %loaded.format, "document loaded");
    let mut app = App::new(loaded, path, flags);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )
    .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum ToolbarAction {
    Mark(Mark),
    Block(BlockType),
}

const TOOLBAR: [(&str, ToolbarAction); 8] = [
    ("B", ToolbarAction::Mark(Mark::Bold)),
    ("I", ToolbarAction::Mark(Mark::Italic)),
    ("U", ToolbarAction::Mark(Mark::Underline)),
    ("H1", ToolbarAction::Block(BlockType::HeadingOne)),
    ("H2", ToolbarAction::Block(BlockType::HeadingTwo)),
    ("\"", ToolbarAction::Block(BlockType::BlockQuote)),
    ("•", ToolbarAction::Block(BlockType::BulletedList)),
    ("1.", ToolbarAction::Block(BlockType::NumberedList)),
];

#[derive(Default)]
struct Viewport {
    text_area: Rect,
    height: usize,
}

struct App {
    editor: Editor,
    theme: Theme,
    file_path: PathBuf,
    document_format: DocumentFormat,
    dirty: Rc<Cell<bool>>,
    show_preview: bool,
    scroll_top: usize,
    follow_cursor: bool,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
    last_render: Option<RenderResult>,
    viewport: Viewport,
    preferred_column: Option<u16>,
    mouse_anchor: Option<Point>,
}

impl App {
    fn new(loaded: format::Loaded, path: PathBuf, flags: &ConfigFlags) -> Self {
        let dirty = Rc::new(Cell::new(false));
        let on_change_dirty = Rc::clone(&dirty);
        let mut editor = Editor::from_document(loaded.document)
            .with_on_change(move |_| on_change_dirty.set(true));
        if let Some(limit) = flags.history_limit {
            editor = editor.with_history_limit(limit);
        }

        Self {
            editor,
            theme: Theme::new(),
            file_path: path,
            document_format: loaded.format,
            dirty,
            show_preview: !flags.no_preview,
            scroll_top: 0,
            follow_cursor: true,
            should_quit: false,
            status_message: loaded.status.map(|msg| (msg, Instant::now())),
            last_render: None,
            viewport: Viewport::default(),
            preferred_column: None,
            mouse_anchor: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let main_area = vertical[0];
        let status_area = vertical[1];

        let (editor_area, preview_area) = if self.show_preview {
            let horizontal = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(main_area);
            (horizontal[0], Some(horizontal[1]))
        } else {
            (main_area, None)
        };

        let (wrap_width, left_padding) = editor_wrap_configuration(editor_area.width as usize);
        let state = self.editor.state();
        let render = render_document(
            &state.document,
            Some(&state.selection),
            wrap_width,
            self.theme.selection_style(),
        );

        let viewport_height = editor_area.height as usize;
        self.adjust_scroll(&render, viewport_height);
        let text_area = Rect {
            x: editor_area.x + left_padding as u16,
            width: editor_area.width.saturating_sub(left_padding as u16),
            ..editor_area
        };

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
            && text_area.width > 0
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        if let Some(preview_area) = preview_area {
            let preview = Paragraph::new(self.editor.serialized().to_string())
                .style(self.theme.preview_style())
                .wrap(Wrap { trim: false })
                .block(Block::default().title("HTML").borders(Borders::LEFT));
            frame.render_widget(preview, preview_area);
        }

        self.render_hover_menu(frame, &render, text_area);

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line).style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        self.viewport = Viewport {
            text_area,
            height: viewport_height,
        };
        self.last_render = Some(render);
    }

    fn render_hover_menu(&self, frame: &mut Frame, render: &RenderResult, text_area: Rect) {
        let state = self.editor.state();
        let buttons: Vec<Span<'static>> = TOOLBAR
            .iter()
            .map(|(label, action)| {
                let active = match *action {
                    ToolbarAction::Mark(mark) => has_mark(state, mark),
                    ToolbarAction::Block(block) => has_block(state, block),
                };
                let style = if active {
                    self.theme.menu_active_style()
                } else {
                    self.theme.menu_style()
                };
                Span::styled(format!(" {label} "), style)
            })
            .collect();
        let content_width: usize = buttons.iter().map(|span| span.width()).sum();
        let size = MenuSize {
            width: content_width as i32 + 2,
            height: 3,
        };

        let rect = render
            .selection_rect(state.selection.anchor, state.selection.focus)
            .map(|rect| SelectionRect {
                top: rect.top - self.scroll_top as i32 + i32::from(text_area.y),
                left: rect.left + i32::from(text_area.x),
                ..rect
            });
        let Some(MenuPlacement::Visible { top, left }) =
            place_menu(state, Some(size), rect, ScrollOffset::default())
        else {
            return;
        };

        // The terminal cannot draw off-screen, so flip below the selection
        // when there is no room above and keep the menu inside the frame.
        let frame_area = frame.area();
        let top = if top < i32::from(frame_area.y) {
            rect.map(|rect| rect.top + rect.height).unwrap_or(top)
        } else {
            top
        };
        let min_left = i32::from(frame_area.x);
        let min_top = i32::from(frame_area.y);
        let max_left = (i32::from(frame_area.right()) - size.width).max(min_left);
        let max_top = (i32::from(frame_area.bottom()) - size.height).max(min_top);
        let menu_area = Rect {
            x: left.clamp(min_left, max_left) as u16,
            y: top.clamp(min_top, max_top) as u16,
            width: (size.width as u16).min(frame_area.width),
            height: (size.height as u16).min(frame_area.height),
        };

        frame.render_widget(Clear, menu_area);
        let menu = Paragraph::new(Line::from(buttons)).block(
            Block::default()
                .borders(Borders::ALL)
                .style(self.theme.menu_style()),
        );
        frame.render_widget(menu, menu_area);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let position = self.cursor_position_text();
        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let filename = self.file_path.display().to_string();
        let marker = if self.dirty.get() { "*" } else { "" };
        let state = self.editor.state();
        let block_name = state
            .focus_block()
            .map(|block| BlockType::from(block.kind).name())
            .unwrap_or_default();
        let word_count = state.document.text().split_whitespace().count();

        // Ordered from least to most important
        let all_shortcuts = ["Alt+1-8:Format", "F2:Preview", "^Z:Undo", "^S:Save", "^Q:Quit"];

        let mut spans = vec![
            Span::raw(format!("{position} ")),
            Span::styled(format!("{filename}{marker}"), self.theme.filename_style()),
            Span::raw(format!(
                " {} {block_name}, {word_count} words",
                self.document_format
            )),
        ];

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let min_padding = 1;
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn cursor_position_text(&self) -> String {
        let focus = self.editor.selection().focus;
        let block = self
            .editor
            .document()
            .block_index(focus.key)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        format!("{}:{}", block, focus.offset + 1)
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.follow_cursor
            && let Some(cursor) = render.cursor
        {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }

    fn scroll_top_for_cursor(
        &self,
        cursor_line: usize,
        viewport: usize,
        max_scroll: usize,
    ) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }
        scroll.min(max_scroll)
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key)?,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::FocusGained => self.editor.set_focused(true),
            Event::FocusLost => self.editor.set_focused(false),
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        self.follow_cursor = true;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
            }
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::F(2) => {
                self.show_preview = !self.show_preview;
            }
            KeyCode::Char(digit @ '1'..='8') if key.modifiers.contains(KeyModifiers::ALT) => {
                let index = digit as usize - '1' as usize;
                self.apply_toolbar(TOOLBAR[index].1);
            }
            KeyCode::Up if !ctrl => self.move_vertical(-1, shift, 1),
            KeyCode::Down if !ctrl => self.move_vertical(1, shift, 1),
            KeyCode::PageUp => {
                let lines = self.viewport.height.max(1);
                self.move_vertical(-1, shift, lines);
            }
            KeyCode::PageDown => {
                let lines = self.viewport.height.max(1);
                self.move_vertical(1, shift, lines);
            }
            _ => {
                self.preferred_column = None;
                if !self.editor.handle_key(&key) {
                    tracing::debug!(code = ?key.code, "key not handled");
                }
            }
        }
        Ok(())
    }

    fn apply_toolbar(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::Mark(mark) => self.editor.toggle_mark(mark),
            ToolbarAction::Block(block) => self.editor.toggle_block(block),
        };
    }

    fn move_vertical(&mut self, delta: isize, extend: bool, lines: usize) {
        let Some(render) = &self.last_render else {
            return;
        };
        let selection = self.editor.selection();
        let mut target = selection.focus;
        let column = self
            .preferred_column
            .or_else(|| render.position_of(target).map(|position| position.column));
        for _ in 0..lines {
            let Some(origin) = render.position_of(target) else {
                break;
            };
            let probe = column.unwrap_or(origin.column);
            let next = render
                .vertical_neighbor(target, delta)
                .and_then(|point| render.position_of(point))
                .and_then(|position| render.point_at(position.line, probe));
            match next {
                Some(point) => target = point,
                None => break,
            }
        }
        self.preferred_column = column;

        let next = if extend {
            Selection::new(selection.anchor, target)
        } else {
            Selection::collapsed(target)
        };
        self.editor.select(next);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.follow_cursor = false;
                self.scroll_top = self.scroll_top.saturating_sub(MOUSE_SCROLL_LINES);
            }
            MouseEventKind::ScrollDown => {
                self.follow_cursor = false;
                self.scroll_top = self.scroll_top.saturating_add(MOUSE_SCROLL_LINES);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(point) = self.point_at_mouse(mouse.column, mouse.row) {
                    self.mouse_anchor = Some(point);
                    self.preferred_column = None;
                    self.editor.select(Selection::collapsed(point));
                    self.editor.set_focused(true);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let (Some(anchor), Some(point)) =
                    (self.mouse_anchor, self.point_at_mouse(mouse.column, mouse.row))
                {
                    self.editor.select(Selection::new(anchor, point));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.mouse_anchor = None;
            }
            _ => {}
        }
    }

    fn point_at_mouse(&self, column: u16, row: u16) -> Option<Point> {
        let render = self.last_render.as_ref()?;
        let area = self.viewport.text_area;
        if row < area.y || row >= area.bottom() {
            return None;
        }
        let line = self.scroll_top + (row - area.y) as usize;
        let column = column.saturating_sub(area.x);
        // Blank separator lines resolve to the line above.
        (0..=line)
            .rev()
            .find_map(|line| render.point_at(line, column))
    }

    fn save(&mut self) {
        match format::save(&self.file_path, self.document_format, self.editor.document()) {
            Ok(()) => {
                self.dirty.set(false);
                info!(path = %self.file_path.display(), "document saved");
                self.set_status("Saved");
            }
            Err(err) => {
                warn!(error = %err, "save failed");
                self.set_status(format!("Save failed: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_tui::document::Document;
    use quire_tui::editor::Command;

    fn app() -> App {
        let loaded = format::Loaded {
            document: Document::new(),
            format: DocumentFormat::Html,
            status: None,
        };
        App::new(loaded, PathBuf::from("notes.html"), &ConfigFlags::default())
    }

    #[test]
    fn focus_events_toggle_editor_focus() {
        let mut app = app();
        app.editor.handle_key(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        app.editor.dispatch(Command::SelectAll);
        let menu = Some(MenuSize {
            width: 10,
            height: 1,
        });
        let rect = Some(SelectionRect::default());

        app.handle_event(Event::FocusLost).unwrap();
        assert!(app.editor.state().is_blurred());
        assert_eq!(
            place_menu(app.editor.state(), menu, rect, ScrollOffset::default()),
            Some(MenuPlacement::Hidden)
        );

        app.handle_event(Event::FocusGained).unwrap();
        assert!(!app.editor.state().is_blurred());
        assert!(matches!(
            place_menu(app.editor.state(), menu, rect, ScrollOffset::default()),
            Some(MenuPlacement::Visible { .. })
        ));
    }
}
