use crate::matrix::{AgreementMatrix, Highlight, Status};
use crate::month::Month;
use crate::pipeline::RunReport;
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
use std::collections::BTreeSet;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Steps,
    Rows,
    Views,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    AllRows,
    NeedsReview,
    Done,
    Unset,
    Highlighted,
}

impl FilterType {
    fn name(&self) -> &'static str {
        match self {
            FilterType::None | FilterType::AllRows => "ALL",
            FilterType::NeedsReview => "?",
            FilterType::Done => "Done",
            FilterType::Unset => "UNSET",
            FilterType::Highlighted => "HIGHLIGHTED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterState {
    pub active_filter: FilterType,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Steps => Page::Rows,
            Page::Rows => Page::Views,
            Page::Views => Page::Steps,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Steps => Page::Views,
            Page::Rows => Page::Steps,
            Page::Views => Page::Rows,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Steps => "Run Steps",
            Page::Rows => "Rows",
            Page::Views => "Views",
        }
    }
}

pub struct App {
    pub matrix: AgreementMatrix,
    pub report: RunReport,
    highlighted: BTreeSet<Highlight>,
    /// Matrix row indices shown under the active filter
    pub visible_rows: Vec<usize>,
    pub state: TableState,
    pub current_page: Page,
    pub steps_state: TableState,
    pub show_detail: bool,
    pub filter_state: FilterState,
}

impl App {
    pub fn new(matrix: AgreementMatrix, report: RunReport) -> Self {
        let mut state = TableState::default();
        if matrix.rows() > 0 {
            state.select(Some(0));
        }

        let mut steps_state = TableState::default();
        steps_state.select(Some(0));

        let highlighted = report.highlights.iter().copied().collect();
        let visible_rows = (0..matrix.rows()).collect();

        Self {
            matrix,
            report,
            highlighted,
            visible_rows,
            state,
            current_page: Page::Rows,
            steps_state,
            show_detail: false,
            filter_state: FilterState {
                active_filter: FilterType::None,
            },
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Matrix row index under the cursor
    pub fn selected_row(&self) -> Option<usize> {
        self.state.selected().and_then(|i| self.visible_rows.get(i).copied())
    }

    pub fn is_highlighted(&self, row: usize, slot: usize) -> bool {
        self.highlighted.contains(&Highlight::new(row, slot))
    }

    pub fn highlight_count(&self, row: usize) -> usize {
        self.highlighted
            .range(Highlight::new(row, 0)..Highlight::new(row + 1, 0))
            .count()
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.filter_state.active_filter = filter;

        let rows = 0..self.matrix.rows();
        self.visible_rows = match filter {
            FilterType::None | FilterType::AllRows => rows.collect(),
            FilterType::NeedsReview => rows
                .filter(|&r| self.matrix.status(r) == Status::Review)
                .collect(),
            FilterType::Done => rows
                .filter(|&r| self.matrix.status(r) == Status::Done)
                .collect(),
            FilterType::Unset => rows
                .filter(|&r| self.matrix.status(r) == Status::Unset)
                .collect(),
            FilterType::Highlighted => rows.filter(|&r| self.highlight_count(r) > 0).collect(),
        };

        // Reset selection to first item
        if !self.visible_rows.is_empty() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(FilterType::None);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.visible_rows.len();
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
        let len = self.visible_rows.len();
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
        let len = self.visible_rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn stats(&self) -> ReviewStats {
        ReviewStats {
            total: self.matrix.rows(),
            done: self.report.done_rows,
            review: self.report.review_rows,
            unset: self.report.unset_rows,
            highlighted_rows: (0..self.matrix.rows())
                .filter(|&r| self.highlight_count(r) > 0)
                .count(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ReviewStats {
    pub total: usize,
    pub done: usize,
    pub review: usize,
    pub unset: usize,
    pub highlighted_rows: usize,
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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Rows;
                }
                KeyCode::Char(n @ '1'..='5') if app.current_page == Page::Views => {
                    let filter = match n {
                        '1' => FilterType::AllRows,
                        '2' => FilterType::NeedsReview,
                        '3' => FilterType::Highlighted,
                        '4' => FilterType::Done,
                        _ => FilterType::Unset,
                    };
                    app.apply_filter(filter);
                    app.current_page = Page::Rows;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.visible_rows.is_empty() {
                        app.state.select(Some(app.visible_rows.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Rows {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(55), // Row list
                Constraint::Percentage(45), // Slot detail
            ])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Steps => render_steps(f, chunks[1], app),
            Page::Rows => render_table(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Done => Color::Green,
        Status::Review => Color::Yellow,
        Status::Unset => Color::DarkGray,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();

    let pages = [Page::Steps, Page::Rows, Page::Views];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", stats.total),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", stats.done),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("? {}", stats.review),
        Style::default().fg(Color::Yellow),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Account", "Brand", "MRR", "Filled", "Flagged", "Status"]
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

    let width = app.matrix.width();
    let rows: Vec<Row> = app
        .visible_rows
        .iter()
        .map(|&r| {
            let entity = app.matrix.entity(r);
            let filled = app.matrix.row(r).iter().filter(|v| v.is_some()).count();
            let flagged = app.highlight_count(r);
            let color = status_color(entity.status);

            let cells = vec![
                Cell::from(truncate(&entity.account_id, 20)),
                Cell::from(truncate(&entity.brand, 16)),
                Cell::from(entity.mrr.map(|m| format!("{:.2}", m)).unwrap_or_default()),
                Cell::from(format!("{}/{}", filled, width)),
                Cell::from(if flagged > 0 { flagged.to_string() } else { String::new() })
                    .style(Style::default().fg(Color::Yellow)),
                Cell::from(entity.status.label()).style(Style::default().fg(color)),
            ];

            Row::new(cells).height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Rows "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.visible_rows.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if !matches!(
        app.filter_state.active_filter,
        FilterType::None | FilterType::AllRows
    ) {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", app.filter_state.active_filter.name()),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Slots | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Fast | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
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

fn render_steps(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Step", "Cells Filled", "Rows Marked", "Highlights"]
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

    let rows: Vec<Row> = app
        .report
        .steps
        .iter()
        .map(|step| {
            Row::new(vec![
                Cell::from(step.step.name()),
                Cell::from(step.cells_filled.to_string()),
                Cell::from(step.rows_marked.to_string()),
                Cell::from(step.highlights.len().to_string()),
            ])
            .height(1)
        })
        .collect();

    let title = format!(" Run {} - {} ", short_id(&app.report.run_id), app.report.summary());
    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.steps_state);
}

fn short_id(run_id: &str) -> &str {
    run_id.get(..8).unwrap_or(run_id)
}

fn view_line(key: char, label: &str, count: usize, color: Color, active: bool) -> Line<'static> {
    Line::from(vec![
        Span::raw("  ║ "),
        if active {
            Span::styled("→", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::raw(" ")
        },
        Span::styled(key.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(format!(". {:<26}", label)),
        Span::styled(format!("{:>6} rows", count), Style::default().fg(color)),
        Span::raw("        ║"),
    ])
}

fn render_views(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();
    let active = app.filter_state.active_filter;
    let hint = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);
    let key = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::ITALIC);

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Quick Views & Filters",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("  ╔══════════════════════════════════════════════════╗"),
        view_line('1', "All rows", stats.total, Color::White, active == FilterType::AllRows),
        Line::from("  ╠══════════════════════════════════════════════════╣"),
        view_line('2', "Needs review (?)", stats.review, Color::Yellow, active == FilterType::NeedsReview),
        view_line(
            '3',
            "With highlighted cells",
            stats.highlighted_rows,
            Color::Yellow,
            active == FilterType::Highlighted,
        ),
        view_line('4', "Done", stats.done, Color::Green, active == FilterType::Done),
        view_line('5', "No status", stats.unset, Color::DarkGray, active == FilterType::Unset),
        Line::from("  ╚══════════════════════════════════════════════════╝"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Hint: ", key),
            Span::styled("Press ", hint),
            Span::styled("1-5", key),
            Span::styled(" to filter, ", hint),
            Span::styled("c", key),
            Span::styled(" to clear", hint),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views - Quick Access Filters "),
    );

    f.render_widget(paragraph, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Slots ");

    let row = match app.selected_row() {
        Some(r) => r,
        None => {
            f.render_widget(Paragraph::new("No row selected").block(block), area);
            return;
        }
    };

    let entity = app.matrix.entity(row);
    let field = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut content = vec![
        Line::from(vec![
            Span::styled("  Account: ", field),
            Span::raw(entity.account_id.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Brand: ", field),
            Span::raw(entity.brand.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Churn: ", field),
            Span::raw(entity.churn_date.map(|d| d.to_string()).unwrap_or_default()),
        ]),
        Line::from(vec![
            Span::styled("  Status: ", field),
            Span::styled(
                entity.status.label(),
                Style::default().fg(status_color(entity.status)),
            ),
        ]),
        Line::from("  ─────────────────────────────────────"),
    ];

    for (slot, value) in app.matrix.row(row).iter().enumerate() {
        let label = Month::of(app.matrix.labels()[slot]).to_string();
        let (text, style) = match value {
            Some(date) if app.is_highlighted(row, slot) => (
                date.to_string(),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ),
            Some(date) => (date.to_string(), Style::default().fg(Color::White)),
            None => ("—".to_string(), Style::default().fg(Color::DarkGray)),
        };
        content.push(Line::from(vec![
            Span::styled(format!("  {}  ", label), Style::default().fg(Color::DarkGray)),
            Span::styled(text, style),
        ]));
    }

    f.render_widget(Paragraph::new(content).block(block), area);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::matrix::EntityRow;
    use crate::pipeline::Pipeline;
    use chrono::NaiveDate;

    fn reviewed_app() -> App {
        let a = NaiveDate::from_ymd_opt(2021, 1, 1);
        let b = NaiveDate::from_ymd_opt(2021, 6, 1);
        let mut matrix = AgreementMatrix::for_months(
            Month::new(2021, 1).unwrap(),
            Month::new(2021, 8).unwrap(),
        );
        // Complete, long run
        matrix.push_row(EntityRow::new("done"), vec![a; 8]).unwrap();
        // Short trailing run of a different value
        matrix
            .push_row(EntityRow::new("flagged"), vec![a, a, a, a, a, a, b, b])
            .unwrap();
        // Nothing observed
        matrix.push_row(EntityRow::new("empty"), vec![None; 8]).unwrap();

        let (matrix, report) = Pipeline::new(PipelineConfig::default()).apply(matrix);
        App::new(matrix, report)
    }

    #[test]
    fn test_filters_select_rows_by_status() {
        let mut app = reviewed_app();
        assert_eq!(app.visible_rows, vec![0, 1, 2]);

        app.apply_filter(FilterType::Done);
        assert_eq!(app.visible_rows, vec![0, 1]);

        app.apply_filter(FilterType::Highlighted);
        assert_eq!(app.visible_rows, vec![1]);
        assert_eq!(app.selected_row(), Some(1));

        app.apply_filter(FilterType::Unset);
        assert_eq!(app.visible_rows, vec![2]);

        app.apply_filter(FilterType::NeedsReview);
        assert!(app.visible_rows.is_empty());
        assert_eq!(app.selected_row(), None);

        app.clear_filter();
        assert_eq!(app.visible_rows.len(), 3);
    }

    #[test]
    fn test_highlight_lookup() {
        let app = reviewed_app();

        assert!(app.is_highlighted(1, 6));
        assert!(app.is_highlighted(1, 7));
        assert!(!app.is_highlighted(1, 5));
        assert_eq!(app.highlight_count(1), 2);
        assert_eq!(app.highlight_count(0), 0);
        assert_eq!(app.stats().highlighted_rows, 1);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = reviewed_app();

        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(2));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_page_cycle() {
        let mut app = reviewed_app();
        assert_eq!(app.current_page, Page::Rows);

        app.next_page();
        assert_eq!(app.current_page, Page::Views);
        app.next_page();
        app.next_page();
        assert_eq!(app.current_page, Page::Rows);
        app.previous_page();
        assert_eq!(app.current_page, Page::Steps);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ñññññññññ", 6), "ñññ...");
    }
}
