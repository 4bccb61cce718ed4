// 🖥️ Ledger viewer - browse the month sections of one ledger store

use crate::ledger::{Workbook, Worksheet, COLUMN_COUNT, COLUMN_HEADERS, DATA_START_ROW};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
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

const PAGE_SIZE: usize = 20;

/// One non-blank data row of a section
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    /// Row number in the section (1-indexed)
    pub row: u32,
    pub cells: Vec<String>,
}

impl LedgerRow {
    fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }
}

pub fn section_rows(ws: &Worksheet) -> Vec<LedgerRow> {
    ws.rows()
        .filter(|row| *row >= DATA_START_ROW && !ws.is_row_blank(*row, COLUMN_COUNT))
        .map(|row| LedgerRow {
            row,
            cells: (1..=COLUMN_COUNT).map(|col| ws.value_text(row, col)).collect(),
        })
        .collect()
}

pub struct App {
    pub title: String,
    pub sections: Vec<(String, Vec<LedgerRow>)>,
    pub current_section: usize,
    pub state: TableState,
    pub show_detail: bool,
}

impl App {
    pub fn new(title: impl Into<String>, workbook: &Workbook) -> Self {
        let sections = workbook
            .sheets()
            .iter()
            .map(|ws| (ws.name().to_string(), section_rows(ws)))
            .collect();

        let mut app = Self {
            title: title.into(),
            sections,
            current_section: 0,
            state: TableState::default(),
            show_detail: false,
        };
        app.reset_selection();
        app
    }

    /// Start on the section with this name (case-insensitive), if present
    pub fn with_section(mut self, name: &str) -> Self {
        if let Some(idx) = self.sections.iter().position(|(n, _)| n.eq_ignore_ascii_case(name)) {
            self.current_section = idx;
            self.reset_selection();
        }
        self
    }

    pub fn section_name(&self) -> &str {
        self.sections
            .get(self.current_section)
            .map(|(name, _)| name.as_str())
            .unwrap_or("")
    }

    pub fn rows(&self) -> &[LedgerRow] {
        self.sections
            .get(self.current_section)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_row(&self) -> Option<&LedgerRow> {
        self.state.selected().and_then(|i| self.rows().get(i))
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    fn reset_selection(&mut self) {
        let selected = if self.rows().is_empty() { None } else { Some(0) };
        self.state.select(selected);
    }

    pub fn next_section(&mut self) {
        if self.sections.is_empty() {
            return;
        }
        self.current_section = (self.current_section + 1) % self.sections.len();
        self.reset_selection();
    }

    pub fn previous_section(&mut self) {
        if self.sections.is_empty() {
            return;
        }
        self.current_section = if self.current_section == 0 {
            self.sections.len() - 1
        } else {
            self.current_section - 1
        };
        self.reset_selection();
    }

    pub fn next(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.rows().is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_SIZE));
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

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab | KeyCode::Right => app.next_section(),
                KeyCode::BackTab | KeyCode::Left => app.previous_section(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.rows().is_empty() {
                        app.state.select(Some(app.rows().len() - 1));
                    }
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Section tabs
            Constraint::Min(0),    // Rows
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![Span::styled(
        format!("{}  ", app.title),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];

    for (i, (name, rows)) in app.sections.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }
        let style = if i == app.current_section {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else if rows.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Gray)
        };
        tab_spans.push(Span::styled(short_name(name), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = std::iter::once("ROW")
        .chain(COLUMN_HEADERS.iter().copied())
        .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.rows().iter().map(|r| {
        let cells = vec![
            Cell::from(r.row.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(r.cell(0).to_string()),
            Cell::from(truncate(r.cell(1), 20)),
            Cell::from(r.cell(2).to_string()).style(Style::default().fg(Color::Red)),
            Cell::from(r.cell(3).to_string()).style(Style::default().fg(Color::Green)),
            Cell::from(r.cell(4).to_string()),
            Cell::from(r.cell(5).to_string()).style(Style::default().fg(Color::Cyan)),
            Cell::from(truncate(r.cell(6), 28)),
            Cell::from(truncate(r.cell(7), 28)),
        ];
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(11),
            Constraint::Length(21),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(29),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", app.section_name())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.rows().len();

    let status_spans = vec![
        Span::styled(format!(" Row: {}/{} ", selected, total), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Month | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Movement ");

    let Some(row) = app.selected_row() else {
        f.render_widget(Paragraph::new("No row selected").block(block), area);
        return;
    };

    let label_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let width = area.width.saturating_sub(4) as usize;

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Row: ", label_style),
            Span::raw(row.row.to_string()),
        ]),
    ];
    for (idx, header) in COLUMN_HEADERS.iter().enumerate() {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(format!("  {}:", header), label_style)));
        for line in wrap_text(row.cell(idx), width.max(10)).lines() {
            content.push(Line::from(format!("    {}", line)));
        }
    }

    f.render_widget(Paragraph::new(content).block(block), area);
}

/// "SEPTIEMBRE" → "SEP"
fn short_name(name: &str) -> String {
    name.chars().take(3).collect()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}
