use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use dirtree::render_tree::{row_at, visible_rows, RenderRow};
use dirtree::{Config, InputTarget, LayoutConfig, TreeController};
use indextree::NodeId;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect as UiRect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::{Frame, Terminal};
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

/// One terminal line per row, two cells of indent per level.
const TERMINAL_LAYOUT: LayoutConfig = LayoutConfig {
    row_height: 1.0,
    indent: 2.0,
};

const NEW_ENTRY_NAME: &str = "new item";

#[derive(Parser, Debug)]
#[command(name = "dirtree-tui", about = "Collapsible directory tree in the terminal")]
struct Args {
    /// JSON config file
    #[arg(long, default_value = "dirtree.json")]
    config: PathBuf,

    /// Append logs to this file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Whitespace-separated paths to build at startup
    #[arg(long)]
    paths: Option<String>,
}

struct InputState {
    target: InputTarget,
    buffer: String,
}

struct App {
    controller: TreeController,
    rows: Vec<RenderRow>,
    selected: Option<NodeId>,
    input: Option<InputState>,
    status: String,
    scroll: u16,
    tree_area: Option<UiRect>,
    should_quit: bool,
}

impl App {
    fn new(controller: TreeController) -> Self {
        let mut app = Self {
            controller,
            rows: Vec::new(),
            selected: None,
            input: None,
            status: String::from("Ready"),
            scroll: 0,
            tree_area: None,
            should_quit: false,
        };
        app.refresh_rows();
        app.selected = Some(app.controller.root());
        app
    }

    fn refresh_rows(&mut self) {
        self.rows = visible_rows(self.controller.tree());
        let selection_alive = self
            .selected
            .is_some_and(|id| self.rows.iter().any(|row| row.id == id));
        if !selection_alive {
            self.selected = Some(self.controller.root());
        }
    }

    fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.rows.iter().position(|row| row.id == id)
    }

    fn selected_row(&self) -> Option<&RenderRow> {
        self.selected_index().map(|i| &self.rows[i])
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(current) = self.selected_index() else {
            return;
        };
        let last = self.rows.len().saturating_sub(1) as isize;
        let next = (current as isize + delta).clamp(0, last) as usize;
        self.selected = self.rows.get(next).map(|row| row.id);
    }

    fn begin_input(&mut self, target: InputTarget) {
        let buffer = match target {
            InputTarget::Rename(id) => self
                .controller
                .tree()
                .node(id)
                .map(|node| node.display_name().to_string())
                .unwrap_or_default(),
            InputTarget::PathBatch => String::new(),
        };
        self.input = Some(InputState { target, buffer });
    }

    fn commit_input(&mut self) {
        let Some(input) = self.input.take() else {
            return;
        };
        let applied = self.controller.commit_input(input.target, &input.buffer);
        self.status = match (input.target, applied) {
            (InputTarget::Rename(_), true) => format!("Renamed to {}", input.buffer.trim()),
            (InputTarget::Rename(_), false) => {
                String::from("Rename rejected: a folder with children must keep a trailing /")
            }
            (InputTarget::PathBatch, _) => String::from("Paths added"),
        };
        self.refresh_rows();
    }

    fn toggle_selected(&mut self) {
        if let Some(id) = self.selected {
            self.controller.tree_mut().toggle_open(id);
            self.refresh_rows();
        }
    }

    fn add_to_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        match self.controller.tree_mut().add_child(id, NEW_ENTRY_NAME) {
            Some(child) => {
                self.refresh_rows();
                self.selected = Some(child);
                self.begin_input(InputTarget::Rename(child));
            }
            None => self.status = String::from("Only folders can hold entries"),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        let parent = self.controller.tree().parent(id);
        if parent.is_none() {
            self.status = String::from("The root cannot be deleted");
            return;
        }
        self.controller.tree_mut().mark_for_deletion(id);
        self.selected = parent;
        self.refresh_rows();
        self.status = String::from("Deleted");
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        if self.input.is_some() {
            match key.code {
                KeyCode::Enter => self.commit_input(),
                KeyCode::Esc => self.input = None,
                KeyCode::Backspace => {
                    if let Some(input) = self.input.as_mut() {
                        input.buffer.pop();
                    }
                }
                KeyCode::Char(ch) => {
                    if let Some(input) = self.input.as_mut() {
                        input.buffer.push(ch);
                    }
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('+') | KeyCode::Char('a') => self.add_to_selected(),
            KeyCode::Char('-') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('e') => {
                if let Some(id) = self.selected {
                    self.begin_input(InputTarget::Rename(id));
                }
            }
            KeyCode::Char('/') | KeyCode::Char('b') => self.begin_input(InputTarget::PathBatch),
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        let Some(area) = self.tree_area else {
            return;
        };
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !point_in_rect(area, event.column, event.row) {
                    return;
                }
                let y = (event.row - area.y).saturating_add(self.scroll) as f32;
                let Some(row) = row_at(&self.rows, y) else {
                    return;
                };
                let id = row.id;
                if self.selected == Some(id) {
                    self.toggle_selected();
                } else {
                    self.selected = Some(id);
                }
            }
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            _ => {}
        }
    }

    /// Keep the selected row inside the visible band of `height` lines.
    fn follow_selection(&mut self, height: u16) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let y = row.y as u16;
        if y < self.scroll {
            self.scroll = y;
        } else if height > 0 && y >= self.scroll.saturating_add(height) {
            self.scroll = y.saturating_sub(height - 1);
        }
    }
}

fn point_in_rect(rect: UiRect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn row_marker(row: &RenderRow) -> &'static str {
    match (row.can_toggle, row.is_open) {
        (true, true) => "▾ ",
        (true, false) => "▸ ",
        _ => "  ",
    }
}

struct TreeWidget<'a> {
    rows: &'a [RenderRow],
    selected: Option<NodeId>,
    scroll: u16,
}

impl Widget for TreeWidget<'_> {
    fn render(self, area: UiRect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for row in self.rows {
            let top = row.y as u16;
            if top < self.scroll || top - self.scroll >= area.height {
                continue;
            }
            let y = area.y + (top - self.scroll);
            let x = area.x.saturating_add(row.x as u16);
            if x >= area.x.saturating_add(area.width) {
                continue;
            }

            let is_selected = self.selected == Some(row.id);
            let base = if row.is_dir {
                Style::default().fg(Color::Rgb(120, 170, 230)).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Rgb(224, 224, 224))
            };
            let style = if is_selected {
                base.bg(Color::Rgb(70, 70, 90))
            } else {
                base
            };

            let label = format!("{}{}", row_marker(row), row.name);
            let width = (area.x + area.width - x) as usize;
            buf.set_stringn(x, y, label, width, style);
        }
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let split = Layout::horizontal([Constraint::Min(30), Constraint::Length(42)]).split(root);
    let left = split[0];
    let right = split[1];

    let tree_block = Block::default().title(" Tree ").borders(Borders::ALL);
    let tree_inner = tree_block.inner(left);
    frame.render_widget(tree_block, left);
    app.tree_area = Some(tree_inner);
    app.follow_selection(tree_inner.height);
    frame.render_widget(
        TreeWidget {
            rows: &app.rows,
            selected: app.selected,
            scroll: app.scroll,
        },
        tree_inner,
    );

    let right_rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Min(9),
    ])
    .split(right);

    let (input_title, input_text, input_style) = match app.input.as_ref() {
        Some(input) => {
            let title = match input.target {
                InputTarget::Rename(_) => " Name (Enter to apply) ",
                InputTarget::PathBatch => " Paths (Enter to build) ",
            };
            (title, input.buffer.as_str(), Style::default().fg(Color::Yellow))
        }
        None => (" Input ", "", Style::default().fg(Color::Gray)),
    };
    frame.render_widget(
        Paragraph::new(input_text)
            .style(input_style)
            .block(Block::default().title(input_title).borders(Borders::ALL)),
        right_rows[0],
    );

    let selected = app
        .selected_row()
        .map(|row| row.name.clone())
        .unwrap_or_else(|| "(none)".to_string());
    let status_lines = vec![
        Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(Color::Gray)),
            Span::raw(selected),
        ]),
        Line::from(vec![
            Span::styled("Rows: ", Style::default().fg(Color::Gray)),
            Span::raw(app.rows.len().to_string()),
            Span::raw("  "),
            Span::styled("Passes: ", Style::default().fg(Color::Gray)),
            Span::raw(app.controller.layout_passes().to_string()),
        ]),
        Line::from(app.status.as_str()),
    ];
    frame.render_widget(
        Paragraph::new(status_lines).block(Block::default().title(" Status ").borders(Borders::ALL)),
        right_rows[1],
    );

    let help_lines = vec![
        Line::from("j/k or arrows: move"),
        Line::from("Enter/space/click: open or close"),
        Line::from("+ or a: add entry   -: delete"),
        Line::from("e: rename   / or b: add paths"),
        Line::from("Names ending in / are folders"),
        Line::from("q: quit"),
    ];
    frame.render_widget(
        Paragraph::new(help_lines).block(Block::default().title(" Controls ").borders(Borders::ALL)),
        right_rows[2],
    );
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> std::io::Result<()> {
    loop {
        terminal.draw(|frame| {
            draw_ui(frame, app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn main() -> dirtree::Result<()> {
    let args = Args::parse();
    if let Some(log_file) = args.log_file.as_deref() {
        dirtree::logging::init(Some(log_file))?;
    }

    let mut config = Config::load_or_default(&args.config)?;
    config.layout = TERMINAL_LAYOUT;
    let mut controller = TreeController::initialize(&config);
    if let Some(paths) = args.paths.as_deref() {
        controller.build_from_path_batch(paths);
    }
    let mut app = App::new(controller);

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result?;
    Ok(())
}
