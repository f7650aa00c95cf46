use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset as ChartDataset, GraphType, Paragraph, Row,
        Table, TableState,
    },
    Frame, Terminal,
};
use std::io;

use visa_bulletin::calendar::{display_optional, from_millis};
use visa_bulletin::config::ChartConfig;
use visa_bulletin::{
    build_chart, display_date, ChartOptions, ChartSelection, Dataset, DateType, Lookback, Rgb,
    Series, SeriesEntry, SeriesKind, SortKey, TableQuery,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Table,
    Chart,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Table => Page::Chart,
            Page::Chart => Page::Table,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Table => "Table",
            Page::Chart => "Chart",
        }
    }
}

pub struct App {
    pub dataset: Dataset,
    pub current_page: Page,

    // Table page
    pub query: TableQuery,
    pub rows: Vec<usize>,
    pub state: TableState,

    // Chart page
    pub selection: ChartSelection,
    pub country_idx: usize,
    pub category_idx: usize,
    pub date_type: DateType,
    pub estimate_enabled: bool,
    pub lookback: Lookback,
    pub chart: Vec<Series>,

    pub message: Option<String>,
}

impl App {
    pub fn new(dataset: Dataset, chart_config: &ChartConfig) -> Result<Self> {
        let mut app = Self {
            dataset,
            current_page: Page::Table,
            query: TableQuery::default(),
            rows: Vec::new(),
            state: TableState::default(),
            selection: chart_config.selection(),
            country_idx: 0,
            category_idx: 0,
            date_type: chart_config.date_type,
            estimate_enabled: chart_config.estimate,
            lookback: chart_config.lookback()?,
            chart: Vec::new(),
            message: None,
        };

        app.refresh_rows();
        app.refresh_chart();
        Ok(app)
    }

    // ========================================================================
    // TABLE PAGE
    // ========================================================================

    fn refresh_rows(&mut self) {
        self.rows = self.query.indices(&self.dataset);

        // Reset selection to first item
        if !self.rows.is_empty() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn cycle_country_filter(&mut self) {
        let current = self.query.filter.country.as_deref();
        self.query.filter.country = next_label(self.dataset.countries(), current);
        self.refresh_rows();
    }

    pub fn cycle_category_filter(&mut self) {
        let current = self.query.filter.category.as_deref();
        self.query.filter.category = next_label(self.dataset.categories(), current);
        self.refresh_rows();
    }

    pub fn cycle_sort(&mut self) {
        self.query.sort = self.query.sort.next();
        self.refresh_rows();
    }

    pub fn toggle_order(&mut self) {
        self.query.descending = !self.query.descending;
        self.refresh_rows();
    }

    pub fn clear_filter(&mut self) {
        self.query.filter = Default::default();
        self.refresh_rows();
    }

    pub fn next(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(20));
        self.state.select(Some(i));
    }

    pub fn last_row(&mut self) {
        if !self.rows.is_empty() {
            self.state.select(Some(self.rows.len() - 1));
        }
    }

    // ========================================================================
    // CHART PAGE
    // ========================================================================

    /// Recompute every series; called after any chart-affecting change
    fn refresh_chart(&mut self) {
        let options = ChartOptions {
            date_type: self.date_type,
            estimate: self.estimate_enabled.then_some(self.lookback),
        };
        self.chart = build_chart(&self.dataset, self.selection.entries(), &options);
    }

    pub fn picked_country(&self) -> Option<&str> {
        self.dataset.countries().get(self.country_idx).map(String::as_str)
    }

    pub fn picked_category(&self) -> Option<&str> {
        self.dataset.categories().get(self.category_idx).map(String::as_str)
    }

    pub fn next_country(&mut self, forward: bool) {
        self.country_idx = step(self.country_idx, self.dataset.countries().len(), forward);
    }

    pub fn next_category(&mut self, forward: bool) {
        self.category_idx = step(self.category_idx, self.dataset.categories().len(), forward);
    }

    pub fn add_picked(&mut self) {
        let (Some(country), Some(category)) = (self.picked_country(), self.picked_category()) else {
            return;
        };
        let entry = SeriesEntry::new(country, category);
        let label = format!("{}/{}", entry.country, entry.category);

        if self.selection.add(entry) {
            self.message = Some(format!("Added {}", label));
            self.refresh_chart();
        } else {
            self.message = Some(format!("{} is already on the chart", label));
        }
    }

    pub fn reset_chart(&mut self) {
        self.selection.reset();
        self.message = Some("Chart reset".to_string());
        self.refresh_chart();
    }

    pub fn toggle_date_type(&mut self) {
        self.date_type = self.date_type.toggle();
        self.refresh_chart();
    }

    pub fn toggle_estimate(&mut self) {
        self.estimate_enabled = !self.estimate_enabled;
        self.refresh_chart();
    }

    pub fn cycle_lookback(&mut self) {
        self.lookback = self.lookback.next();
        if self.estimate_enabled {
            self.refresh_chart();
        }
    }
}

/// None -> first -> ... -> last -> None
fn next_label(labels: &[String], current: Option<&str>) -> Option<String> {
    match current {
        None => labels.first().cloned(),
        Some(cur) => {
            let pos = labels.iter().position(|l| l == cur)?;
            labels.get(pos + 1).cloned()
        }
    }
}

fn step(idx: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (idx + 1) % len
    } else {
        (idx + len - 1) % len
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "Dashboard stopped");
        return Err(err.into());
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab | KeyCode::BackTab => app.current_page = app.current_page.next(),
            _ => match app.current_page {
                Page::Table => handle_table_key(app, key.code),
                Page::Chart => handle_chart_key(app, key.code, key.modifiers),
            },
        }
    }
}

fn handle_table_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Down | KeyCode::Char('j') => app.next(),
        KeyCode::Up | KeyCode::Char('k') => app.previous(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Home => app.state.select(Some(0)),
        KeyCode::End => app.last_row(),
        KeyCode::Char('f') => app.cycle_country_filter(),
        KeyCode::Char('g') => app.cycle_category_filter(),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('o') => app.toggle_order(),
        KeyCode::Char('c') => app.clear_filter(),
        _ => {}
    }
}

fn handle_chart_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let forward = !modifiers.contains(KeyModifiers::SHIFT);
    match code {
        KeyCode::Right => app.next_country(true),
        KeyCode::Left => app.next_country(false),
        KeyCode::Down => app.next_category(true),
        KeyCode::Up => app.next_category(false),
        KeyCode::Char('n') | KeyCode::Char('N') => app.next_country(forward),
        KeyCode::Char('m') | KeyCode::Char('M') => app.next_category(forward),
        KeyCode::Enter | KeyCode::Char('a') => app.add_picked(),
        KeyCode::Char('r') => app.reset_chart(),
        KeyCode::Char('d') => app.toggle_date_type(),
        KeyCode::Char('e') => app.toggle_estimate(),
        KeyCode::Char('l') => app.cycle_lookback(),
        _ => {}
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

    match app.current_page {
        Page::Table => render_table(f, chunks[1], app),
        Page::Chart => render_chart_page(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Table, Page::Chart].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let (prefix, style) = if *page == app.current_page {
            (
                "Showing ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
        } else {
            ("Show ", Style::default().fg(Color::DarkGray))
        };

        tab_spans.push(Span::styled(format!("{}{}", prefix, page.title()), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Records: {}", app.dataset.len()),
        Style::default().fg(Color::White),
    ));

    if let Some((min, max)) = app.dataset.date_range() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("{} → {}", display_date(min, false), display_date(max, false)),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = SortKey::ALL.iter().map(|key| {
        let label = if *key == app.query.sort {
            let arrow = if app.query.descending { "▼" } else { "▲" };
            format!("{} {}", key.header(), arrow)
        } else {
            key.header().to_string()
        };
        Cell::from(label).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let records = app.dataset.records();
    let rows = app.rows.iter().map(|&idx| {
        let record = &records[idx];
        let cells = vec![
            Cell::from(display_date(record.date, false)),
            Cell::from(truncate(&record.category, 28)),
            Cell::from(truncate(&record.country, 32)),
            cutoff_cell(display_optional(record.filing_date, true)),
            cutoff_cell(display_optional(record.final_action_date, true)),
        ];
        Row::new(cells).height(1)
    });

    let mut title = String::from(" Visa Bulletin ");
    if let Some(country) = &app.query.filter.country {
        title.push_str(&format!("· Country: {} ", country));
    }
    if let Some(category) = &app.query.filter.category {
        title.push_str(&format!("· Category: {} ", category));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(30),
            Constraint::Length(34),
            Constraint::Length(18),
            Constraint::Length(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn cutoff_cell(text: String) -> Cell<'static> {
    if text.is_empty() {
        Cell::from("—").style(Style::default().fg(Color::DarkGray))
    } else {
        Cell::from(text).style(Style::default().fg(Color::Green))
    }
}

fn render_chart_page(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    render_chart_controls(f, chunks[0], app);
    render_chart(f, chunks[1], app);
}

fn render_chart_controls(f: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Yellow);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

    let estimate_text = if app.estimate_enabled {
        format!("on ({}y)", app.lookback.years())
    } else {
        format!("off ({}y)", app.lookback.years())
    };

    let picker = Line::from(vec![
        Span::raw(" Country "),
        Span::styled("←/→", key),
        Span::raw(": "),
        Span::styled(app.picked_country().unwrap_or("-").to_string(), value),
        Span::raw("   Category "),
        Span::styled("↑/↓", key),
        Span::raw(": "),
        Span::styled(app.picked_category().unwrap_or("-").to_string(), value),
        Span::raw("   "),
        Span::styled("a", key),
        Span::raw(" Add  "),
        Span::styled("r", key),
        Span::raw(" Reset"),
    ]);

    let toggles = Line::from(vec![
        Span::raw(" "),
        Span::styled("d", key),
        Span::raw(" Showing: "),
        Span::styled(app.date_type.label(), value),
        Span::raw("   "),
        Span::styled("e", key),
        Span::raw(" Estimate: "),
        Span::styled(estimate_text, value),
        Span::raw("   "),
        Span::styled("l", key),
        Span::raw(" Lookback   "),
        Span::styled(
            app.message.clone().unwrap_or_default(),
            Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
        ),
    ]);

    let controls = Paragraph::new(vec![picker, toggles]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Series "),
    );

    f.render_widget(controls, area);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" {} ", app.date_type.label()));

    let Some(([x_min, x_max], [y_min, y_max])) = chart_bounds(&app.chart) else {
        let empty = Paragraph::new("  No data to plot. Pick a country and category, then press a.")
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let datasets: Vec<ChartDataset> = app
        .chart
        .iter()
        .filter(|s| !s.points.is_empty())
        .map(|s| {
            // Dots stand in for a dashed line
            let marker = match s.kind {
                SeriesKind::Estimate => Marker::Dot,
                _ => Marker::Braille,
            };
            ChartDataset::default()
                .name(s.name.clone())
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(to_color(s.color)))
                .data(&s.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Bulletin")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(axis_labels(x_min, x_max)),
        )
        .y_axis(
            Axis::default()
                .title("Cutoff")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(axis_labels(y_min, y_max)),
        )
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}

/// ([x_min, x_max], [y_min, y_max]) over every plotted point
fn chart_bounds(series: &[Series]) -> Option<([f64; 2], [f64; 2])> {
    let mut points = series.iter().flat_map(|s| s.points.iter());
    let &(x, y) = points.next()?;
    let mut bounds = ([x, x], [y, y]);

    for &(x, y) in points {
        bounds.0[0] = bounds.0[0].min(x);
        bounds.0[1] = bounds.0[1].max(x);
        bounds.1[0] = bounds.1[0].min(y);
        bounds.1[1] = bounds.1[1].max(y);
    }

    Some(bounds)
}

fn axis_labels(min: f64, max: f64) -> Vec<Span<'static>> {
    [min, (min + max) / 2.0, max]
        .iter()
        .map(|&v| {
            let text = from_millis(v).map(|dt| display_date(dt, false)).unwrap_or_default();
            Span::raw(text)
        })
        .collect()
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    match app.current_page {
        Page::Table => {
            let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Row: {}/{} ", selected, app.rows.len()),
                Style::default().fg(Color::Cyan),
            ));

            if app.query.filter.is_active() {
                status_spans.push(Span::raw(" | "));
                status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(" Clear filters"));
            }

            for (k, label) in [
                ("f", " Country"),
                ("g", " Category"),
                ("s", " Sort"),
                ("o", " Order"),
                ("↑/↓", " Nav"),
            ] {
                status_spans.push(Span::raw(" | "));
                status_spans.push(Span::styled(k, Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(label));
            }
        }
        Page::Chart => {
            status_spans.push(Span::styled(
                format!(" Series: {} ", app.selection.len()),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
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
