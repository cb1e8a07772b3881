use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};
use sidenote_config::Config;
use sidenote_engine::surface::{CellMetrics, Viewport};
use sidenote_engine::{
    EditableSurface, Editor, EditorConfig, GridSurface, Point, Rect as TextRect, Rgba,
    SelectionState, Span, SurfaceEvent, TextGeometry, io,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use std::{
    env,
    io::{Stdout, stdout},
    process,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct App {
    editor: Editor<GridSurface>,
    record_path: PathBuf,
    version: u64,
    caret: usize,
    /// Where a shift-selection started
    mark: Option<usize>,
    frame_requested: Rc<Cell<bool>>,
    dirty: Rc<Cell<bool>>,
    status: Rc<RefCell<String>>,
}

impl App {
    fn new(record_path: PathBuf, config: EditorConfig) -> Result<Self> {
        let frame_requested = Rc::new(Cell::new(false));
        let requester = {
            let flag = frame_requested.clone();
            move || flag.set(true)
        };

        let surface = GridSurface::new(
            Viewport::new(Point::new(0.0, 0.0), 80.0, 24.0),
            CellMetrics::terminal(),
        );
        let mut editor = Editor::new(surface, config, requester)?;

        let mut version = 0;
        if record_path.exists() {
            let record = io::read_record(&record_path)?;
            version = record.version;
            editor.load_record(record);
        }

        let dirty = Rc::new(Cell::new(false));
        let status = Rc::new(RefCell::new(format!("Opened {}", record_path.display())));

        let flag = dirty.clone();
        editor.on_content_change(move |_| flag.set(true));

        let sink = status.clone();
        editor.on_highlight_click(move |event| {
            *sink.borrow_mut() = format!("Clicked highlight {}", event.highlight_id);
        });

        let sink = status.clone();
        let flag = dirty.clone();
        editor.on_highlight_updated(move |event| {
            flag.set(true);
            *sink.borrow_mut() = format!(
                "Highlight {} now quotes {:?}",
                event.highlight_id, event.new_exact
            );
        });

        Ok(Self {
            editor,
            record_path,
            version,
            caret: 0,
            mark: None,
            frame_requested,
            dirty,
            status,
        })
    }

    fn set_status(&self, message: impl Into<String>) {
        *self.status.borrow_mut() = message.into();
    }

    fn selection_span(&self) -> Span {
        match self.mark {
            Some(mark) => Span::new(mark.min(self.caret), mark.max(self.caret)),
            None => Span::caret(self.caret),
        }
    }

    fn sync_selection(&mut self) {
        let span = self.selection_span();
        self.editor
            .edit_surface(|s| s.set_selection(SelectionState::Range(span)));
        self.ensure_caret_visible();
    }

    fn move_caret(&mut self, to: usize, extend: bool) {
        if extend {
            self.mark.get_or_insert(self.caret);
        } else {
            self.mark = None;
        }
        self.caret = to.min(self.editor.surface().len());
        self.sync_selection();
    }

    fn previous_offset(&self) -> usize {
        let content = self.editor.content();
        content
            .get(..self.caret)
            .and_then(|before| before.chars().next_back())
            .map_or(self.caret, |c| self.caret - c.len_utf8())
    }

    fn next_offset(&self) -> usize {
        let content = self.editor.content();
        content
            .get(self.caret..)
            .and_then(|after| after.chars().next())
            .map_or(self.caret, |c| self.caret + c.len_utf8())
    }

    fn move_rows(&mut self, rows: isize, extend: bool) {
        let surface = self.editor.surface();
        let (column, row) = surface.cell_for_offset(self.caret);
        let target = surface.offset_for_cell(column, row.saturating_add_signed(rows));
        self.move_caret(target, extend);
    }

    fn move_to_row_edge(&mut self, end: bool, extend: bool) {
        let surface = self.editor.surface();
        let (_, row) = surface.cell_for_offset(self.caret);
        let column = if end { usize::MAX } else { 0 };
        let target = surface.offset_for_cell(column, row);
        self.move_caret(target, extend);
    }

    fn ensure_caret_visible(&mut self) {
        let surface = self.editor.surface();
        let (_, row) = surface.cell_for_offset(self.caret);
        let first = surface.scroll().y as usize;
        let visible = surface.visible_rows().max(1);

        let first = if row < first {
            row
        } else if row >= first + visible {
            row + 1 - visible
        } else {
            return;
        };
        self.editor
            .edit_surface(|s| s.scroll_to(Point::new(0.0, first as f32)));
    }

    fn insert(&mut self, text: &str) {
        self.sync_selection();
        if let Some(inserted) = self.editor.insert_at_cursor(text) {
            self.mark = None;
            self.caret = inserted.end;
            self.ensure_caret_visible();
        }
    }

    fn delete(&mut self, forward: bool) {
        let span = match self.mark {
            Some(_) => self.selection_span(),
            None if forward => Span::new(self.caret, self.next_offset()),
            None => Span::new(self.previous_offset(), self.caret),
        };
        if span.is_empty() {
            return;
        }
        let removed = self.editor.edit_surface(|s| s.replace(span, ""));
        self.mark = None;
        self.caret = removed.start;
        self.sync_selection();
    }

    fn highlight_selection(&mut self) {
        self.sync_selection();
        match self.editor.add_highlight_from_selection() {
            Some(highlight) => {
                self.mark = None;
                self.dirty.set(true);
                self.set_status(format!("Highlighted {:?}", highlight.anchor.exact));
            }
            None => self.set_status("Select some text first (shift + arrows)"),
        }
    }

    fn remove_highlight_at_caret(&mut self) {
        let surface = self.editor.surface();
        let (column, row) = surface.cell_for_offset(self.caret);
        // Overlay rects are container-relative with scroll already applied
        let point = Point::new(
            column as f32 + 0.5,
            row as f32 - surface.scroll().y + 0.5,
        );
        let Some(id) = self.editor.overlay().hit_test(point).map(str::to_string) else {
            self.set_status("No highlight under the caret");
            return;
        };
        if let Some(highlight) = self.editor.remove_highlight(&id) {
            self.dirty.set(true);
            self.set_status(format!("Removed highlight {:?}", highlight.anchor.exact));
        }
    }

    fn save(&mut self) -> Result<()> {
        let record = self.editor.to_record(self.version + 1);
        io::write_record(&self.record_path, &record)?;
        self.version = record.version;
        self.dirty.set(false);
        self.set_status(format!(
            "Saved version {} to {}",
            self.version,
            self.record_path.display()
        ));
        Ok(())
    }

    fn export_html(&mut self) -> Result<()> {
        let path = self.record_path.with_extension("html");
        std::fs::write(&path, self.editor.export_html())?;
        self.set_status(format!("Exported {}", path.display()));
        Ok(())
    }

    /// Keep the surface's viewport in step with the terminal layout.
    fn fit(&mut self, area: Rect) {
        let origin = Point::new(f32::from(area.x), f32::from(area.y));
        let (width, height) = (f32::from(area.width), f32::from(area.height));
        self.editor.edit_surface(|s| {
            s.move_to(origin);
            s.resize(width, height);
        });
    }

    fn run_pending_frame(&mut self) {
        if self.frame_requested.replace(false) {
            self.editor.on_animation_frame();
        }
    }

    /// Returns false when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.kind != KeyEventKind::Press {
            return Ok(true);
        }
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('h') => self.highlight_selection(),
                KeyCode::Char('d') => self.remove_highlight_at_caret(),
                KeyCode::Char('s') => self.save()?,
                KeyCode::Char('e') => self.export_html()?,
                _ => {}
            }
            return Ok(true);
        }

        match key.code {
            KeyCode::Esc => return Ok(false),
            KeyCode::Char(c) => self.insert(&c.to_string()),
            KeyCode::Enter => self.insert("\n"),
            KeyCode::Tab => self.insert("    "),
            KeyCode::Backspace => self.delete(false),
            KeyCode::Delete => self.delete(true),
            KeyCode::Left => self.move_caret(self.previous_offset(), shift),
            KeyCode::Right => self.move_caret(self.next_offset(), shift),
            KeyCode::Up => self.move_rows(-1, shift),
            KeyCode::Down => self.move_rows(1, shift),
            KeyCode::Home => self.move_to_row_edge(false, shift),
            KeyCode::End => self.move_to_row_edge(true, shift),
            KeyCode::PageUp => self.scroll(-10),
            KeyCode::PageDown => self.scroll(10),
            _ => {}
        }
        Ok(true)
    }

    fn scroll(&mut self, rows: isize) {
        self.editor.edit_surface(|s| s.scroll_rows(rows));
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let point = Point::new(f32::from(mouse.column), f32::from(mouse.row));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.editor.click_at(point).is_some() {
                    return;
                }
                let surface = self.editor.surface();
                let origin = surface.origin();
                let column = (point.x - origin.x).max(0.0) as usize;
                let row = (point.y - origin.y + surface.scroll().y).max(0.0) as usize;
                let target = surface.offset_for_cell(column, row);
                self.move_caret(target, false);
            }
            MouseEventKind::Moved => {
                self.editor.hover_at(Some(point));
            }
            MouseEventKind::ScrollUp => self.scroll(-3),
            MouseEventKind::ScrollDown => self.scroll(3),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let record_path = match (args.len(), &config) {
        (2, _) => PathBuf::from(&args[1]),
        (1, Some(config)) => default_record(config)?,
        (1, None) => {
            eprintln!("Error: No note provided and no config file found");
            eprintln!("Usage: {} <note.json>", args[0]);
            eprintln!(
                "Or create a config file at {}",
                Config::config_path().display()
            );
            process::exit(1);
        }
        _ => {
            eprintln!("Usage: {} [note.json]", args[0]);
            process::exit(1);
        }
    };

    let editor_config = match config.as_ref().map(Config::editor_config).transpose() {
        Ok(editor_config) => editor_config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    log::info!("opening {}", record_path.display());
    let mut app = App::new(record_path, editor_config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() {
    let builder = &mut env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);

    let log_path = env::temp_dir().join("sidenote.log");
    match std::fs::File::create(&log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Warning: cannot write {}: {e}", log_path.display()),
    }
    builder.init();
}

/// First note in the configured directory, or a fresh scratch note.
fn default_record(config: &Config) -> Result<PathBuf> {
    if let Err(e) = io::validate_notes_dir(&config.notes_path) {
        eprintln!(
            "Error: Notes path '{}' from config file '{}' is invalid: {e}",
            config.notes_path.display(),
            Config::config_path().display()
        );
        process::exit(1);
    }
    let existing = io::list_records(&config.notes_path)?;
    Ok(existing
        .into_iter()
        .next()
        .unwrap_or_else(|| config.record_path("scratch")))
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.run_pending_frame();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(FRAME_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if !app.handle_key(key)? {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            Event::Resize(..) => app.editor.handle_event(SurfaceEvent::Resize),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let title = format!(
        "{}{}",
        file_name(&app.record_path),
        if app.dirty.get() { " *" } else { "" }
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(chunks[0]);
    app.fit(inner);

    let surface = app.editor.surface();
    let content = surface.content();
    let first_row = surface.scroll().y as usize;
    let lines: Vec<Line> = surface
        .visual_lines()
        .iter()
        .skip(first_row)
        .take(usize::from(inner.height))
        .map(|line| Line::raw(content[line.span.start..line.span.end].to_string()))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    // Native selection first, overlay on top of it
    if let Some(selected) = app.editor.selection()
        && let Ok(rects) = surface.line_rects(selected.span)
    {
        for rect in rects {
            paint(f.buffer_mut(), inner, rect, |cell| {
                cell.set_style(Style::default().add_modifier(Modifier::REVERSED));
            });
        }
    }

    let origin = surface.origin();
    for painted in app.editor.overlay().painted() {
        let rect = painted.element.rect.translate(origin.x, origin.y);
        let color = to_color(painted.fill);
        paint(f.buffer_mut(), inner, rect, |cell| {
            cell.set_bg(color).set_fg(Color::Black);
        });
    }

    let (column, row) = surface.cell_for_offset(app.caret);
    if let (Ok(x), Ok(y)) = (
        u16::try_from(column),
        u16::try_from(row.saturating_sub(first_row)),
    ) && x < inner.width
        && y < inner.height
    {
        f.set_cursor_position((inner.x + x, inner.y + y));
    }

    let help = format!(
        "Esc: Quit | Shift+arrows: Select | ^H: Highlight | ^D: Unhighlight | ^S: Save | ^E: Export | {}",
        app.status.borrow()
    );
    f.render_widget(Paragraph::new(help), chunks[1]);
}

/// Apply `style` to every cell of a viewport rect, clipped to `area`.
fn paint(buf: &mut Buffer, area: Rect, rect: TextRect, style: impl Fn(&mut ratatui::buffer::Cell)) {
    let left = rect.x.floor().max(f32::from(area.x)) as u16;
    let top = rect.y.floor().max(f32::from(area.y)) as u16;
    let right = rect.right().ceil().min(f32::from(area.right())) as u16;
    let bottom = rect.bottom().ceil().min(f32::from(area.bottom())) as u16;

    for y in top..bottom {
        for x in left..right {
            if let Some(cell) = buf.cell_mut((x, y)) {
                style(cell);
            }
        }
    }
}

fn to_color(rgba: Rgba) -> Color {
    Color::Rgb(rgba.r, rgba.g, rgba.b)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
