use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use joint_transfers::{
    rebuild_rows, render_host_page, Config, HostDocument, PageDocument, PanelView, RowExtractor,
    RowSpec, SelectionSession, SelectionStore,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

/// One table line: a host row plus the state of its injected checkbox
#[derive(Debug, Clone, PartialEq)]
pub struct RowLine {
    pub id: String,
    pub date: String,
    pub description: String,
    pub category: String,
    pub amount: String,
    /// `None` while the row has no control (host rebuilt, not refreshed yet)
    pub control: Option<bool>,
}

pub struct App {
    pub doc: PageDocument,
    pub session: SelectionSession,
    pub rows: Vec<RowSpec>,
    pub state: TableState,
    pub rebuilds: usize,
    pub show_panel: bool,
    pub last_event: String,
}

impl App {
    pub fn new(config: Config, rows: Vec<RowSpec>) -> Result<Self> {
        let mut doc = PageDocument::new();
        render_host_page(&mut doc, &config.schema, &rows)?;

        let mut session = SelectionSession::new(config);
        session.mark_ready(&mut doc);

        let mut app = Self {
            doc,
            session,
            rows,
            state: TableState::default(),
            rebuilds: 0,
            show_panel: true,
            last_event: "Ready".to_string(),
        };
        if app.line_count() > 0 {
            app.state.select(Some(0));
        }

        Ok(app)
    }

    pub fn lines(&self) -> Vec<RowLine> {
        let schema = &self.session.config().schema;
        RowExtractor::new(schema)
            .extract(&self.doc)
            .rows
            .into_iter()
            .map(|extracted| {
                let control = self
                    .doc
                    .select_first(extracted.node, &schema.control)
                    .map(|c| self.doc.checked(c));
                RowLine {
                    id: extracted.row.id,
                    date: extracted.row.date,
                    description: extracted.row.description,
                    category: extracted.row.category,
                    amount: extracted.row.amount,
                    control,
                }
            })
            .collect()
    }

    /// Rows the table actually shows; skipped host rows are not navigable
    fn line_count(&self) -> usize {
        let schema = &self.session.config().schema;
        RowExtractor::new(schema).extract(&self.doc).rows.len()
    }

    fn selected_row_id(&self) -> Option<String> {
        let lines = self.lines();
        self.state
            .selected()
            .and_then(|i| lines.get(i))
            .map(|line| line.id.clone())
    }

    /// Click the checkbox of the highlighted row
    pub fn click_control(&mut self) {
        let Some(id) = self.selected_row_id() else {
            return;
        };
        let schema = self.session.config().schema.clone();
        let control = self
            .doc
            .element_by_id(&id)
            .and_then(|row| self.doc.select_first(row, &schema.control));

        self.last_event = match control {
            Some(control) => {
                let outcome = self.session.dispatch_click(&mut self.doc, control);
                match outcome.toggled {
                    Some((row_id, result)) => format!("Toggled {} ({:?})", row_id, result),
                    None => "Click swallowed".to_string(),
                }
            }
            None => format!("Row {} has no checkbox - press f to refresh", id),
        };
    }

    /// Click the row body, which belongs to the host page
    pub fn click_row(&mut self) {
        let Some(id) = self.selected_row_id() else {
            return;
        };
        if let Some(row) = self.doc.element_by_id(&id) {
            let outcome = self.session.dispatch_click(&mut self.doc, row);
            self.last_event = format!("Host handled {} click(s) on {}", outcome.host_handlers_run, id);
        }
    }

    /// Simulate the host page re-rendering its rows
    pub fn rebuild_host(&mut self) {
        let schema = self.session.config().schema.clone();
        match rebuild_rows(&mut self.doc, &schema, &self.rows) {
            Ok(_) => {
                self.rebuilds += 1;
                self.last_event = "Host rebuilt its rows - checkboxes lost".to_string();
            }
            Err(err) => self.last_event = format!("Rebuild failed: {}", err),
        }
    }

    /// Press the injected refresh button
    pub fn press_refresh(&mut self) {
        let class = self.session.config().schema.refresh.clone();
        if let Some(button) = self.doc.select_first(self.doc.root(), &class) {
            self.session.dispatch_click(&mut self.doc, button);
            self.last_event = "Refreshed".to_string();
        }
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection(&mut self.doc);
        self.last_event = "Selection cleared".to_string();
    }

    pub fn toggle_panel(&mut self) {
        self.show_panel = !self.show_panel;
    }

    pub fn next(&mut self) {
        let len = self.line_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.line_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.line_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn last(&mut self) {
        let len = self.line_count();
        if len > 0 {
            self.state.select(Some(len - 1));
        }
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char(' ') => app.click_control(),
                KeyCode::Enter => app.click_row(),
                KeyCode::Char('r') => app.rebuild_host(),
                KeyCode::Char('f') => app.press_refresh(),
                KeyCode::Char('x') => app.clear_selection(),
                KeyCode::Char('p') => app.toggle_panel(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Rows + panel
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_panel {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let spans = vec![
        Span::styled(
            "Joint Transfers",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Rows: {}", app.rows.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Selected: {}", app.session.store().len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Host rebuilds: {}", app.rebuilds),
            Style::default().fg(Color::Red),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["", "Date", "Description", "Category", "Amount"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let lines = app.lines();
    let rows = lines.iter().map(|line| {
        let (mark, color) = match line.control {
            Some(true) => ("[x]", Color::Green),
            Some(false) => ("[ ]", Color::White),
            None => (" - ", Color::DarkGray),
        };

        let cells = vec![
            Cell::from(mark).style(Style::default().fg(color)),
            Cell::from(line.date.clone()),
            Cell::from(truncate(&line.description, 30)),
            Cell::from(truncate(&line.category, 18)),
            Cell::from(line.amount.clone()),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(12),
            Constraint::Length(32),
            Constraint::Length(20),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Transactions "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_panel(f: &mut Frame, area: Rect, app: &App) {
    let content = match PanelView::read(&app.doc, &app.session.config().schema) {
        Some(view) => {
            let mut lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled(
                        format!("  {} ", view.title),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(view.total, Style::default().fg(Color::Green)),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  Items:",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                )),
            ];
            for item in view.items {
                lines.push(Line::from(format!("  • {}", item)));
            }
            lines
        }
        None => vec![Line::from("  No summary panel on the page")],
    };

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Summary Panel "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let spans = vec![
        Span::styled(format!(" {} ", app.last_event), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        key("Space"),
        Span::raw(" Select | "),
        key("Enter"),
        Span::raw(" Row click | "),
        key("r"),
        Span::raw(" Host rebuild | "),
        key("f"),
        Span::raw(" Refresh | "),
        key("x"),
        Span::raw(" Clear | "),
        key("p"),
        Span::raw(" Panel | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(
            Config::default(),
            vec![
                RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00"),
                RowSpec::new("b", "01/03/2025", "Groceries", "Food", "$5.50"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_space_selects_highlighted_row() {
        let mut app = app();
        app.next();
        app.click_control();

        let lines = app.lines();
        assert_eq!(lines[0].control, Some(false));
        assert_eq!(lines[1].control, Some(true));
        assert_eq!(app.session.summary().total, 5.5);
    }

    #[test]
    fn test_rebuild_then_refresh_restores_boxes() {
        let mut app = app();
        app.click_control();
        app.rebuild_host();

        assert!(app.lines().iter().all(|l| l.control.is_none()));

        app.press_refresh();

        let marks: Vec<_> = app.lines().iter().map(|l| l.control).collect();
        assert_eq!(marks, vec![Some(true), Some(false)]);
        assert_eq!(app.rebuilds, 1);
    }

    #[test]
    fn test_row_click_goes_to_host() {
        let mut app = app();
        app.click_row();

        assert!(app.session.store().is_empty());
        assert_eq!(app.last_event, "Host handled 1 click(s) on a");
    }

    #[test]
    fn test_navigation_skips_unreadable_host_rows() {
        let mut app = App::new(
            Config::default(),
            vec![
                RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00"),
                RowSpec::new("", "01/03/2025", "No id", "Misc", "$1.00"),
            ],
        )
        .unwrap();

        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.last();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(0));

        app.click_control();

        assert_eq!(app.last_event, "Toggled a (Added)");
        assert_eq!(app.session.summary().total, 10.0);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("Café de Flore", 8), "Café ...");
        assert_eq!(truncate("short", 8), "short");
    }
}
