use std::io;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::Line;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph,
};

use crate::figure::{Figure, Panel, PanelKind};

const COLORS: [Color; 8] = [
    Color::Blue,
    Color::Yellow,
    Color::Green,
    Color::Red,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::Gray,
];

const PAGE_SIZE: usize = 6;

pub fn show_figure(figure: &Figure) -> miette::Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode().into_diagnostic()?;
    stdout.execute(EnterAlternateScreen).into_diagnostic()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).into_diagnostic()?;
    terminal.clear().into_diagnostic()?;

    let result = view_loop(&mut terminal, figure);

    disable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
    result
}

fn view_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    figure: &Figure,
) -> miette::Result<()> {
    let pages = figure.panels.len().div_ceil(PAGE_SIZE).max(1);
    let mut page = 0usize;
    loop {
        terminal
            .draw(|frame| draw_figure(frame, figure, page))
            .into_diagnostic()?;

        if event::poll(Duration::from_millis(120)).into_diagnostic()? {
            if let Event::Key(key) = event::read().into_diagnostic()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Right | KeyCode::PageDown => page = (page + 1) % pages,
                    KeyCode::Left | KeyCode::PageUp => page = (page + pages - 1) % pages,
                    _ => {}
                }
            }
        }
    }
}

fn draw_figure(frame: &mut ratatui::Frame, figure: &Figure, page: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let title = Paragraph::new(Line::from(figure.title.clone()))
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(title, chunks[0]);

    let panels: Vec<&Panel> = figure
        .panels
        .iter()
        .skip(page * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    for (panel, area) in panels.iter().zip(grid(chunks[1], panels.len(), figure.columns)) {
        draw_panel(frame, panel, area);
    }

    let pages = figure.panels.len().div_ceil(PAGE_SIZE).max(1);
    let hint = if pages > 1 {
        format!("page {}/{pages}  ←/→ switch  q quit", page + 1)
    } else {
        "q quit".to_string()
    };
    frame.render_widget(
        Paragraph::new(Line::from(hint)).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn grid(area: Rect, count: usize, columns: usize) -> Vec<Rect> {
    let columns = columns.clamp(1, count.max(1));
    let rows = count.div_ceil(columns).max(1);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);
    row_areas
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
                .split(*row)
                .to_vec()
        })
        .take(count)
        .collect()
}

fn draw_panel(frame: &mut ratatui::Frame, panel: &Panel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(panel.title.clone());
    if panel.is_empty() {
        let empty = Paragraph::new(Line::from("no data"))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }
    match panel.kind {
        PanelKind::Bar => draw_bars(frame, panel, block, area),
        PanelKind::Line | PanelKind::Scatter => draw_chart(frame, panel, block, area),
    }
}

fn draw_bars(frame: &mut ratatui::Frame, panel: &Panel, block: Block, area: Rect) {
    let series_count = panel.series.len().max(1);
    let groups = panel.x_ticks.len().max(1);
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width = (inner_width / (groups * (series_count + 1))).clamp(1, 8) as u16;

    let mut chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(1);
    for (position, label) in &panel.x_ticks {
        let bars: Vec<Bar> = panel
            .series
            .iter()
            .enumerate()
            .map(|(index, series)| {
                let value = series
                    .points
                    .iter()
                    .find(|(x, _)| x == position)
                    .map(|(_, y)| y.max(0.0).round() as u64)
                    .unwrap_or(0);
                Bar::default()
                    .value(value)
                    .style(Style::default().fg(COLORS[index % COLORS.len()]))
            })
            .collect();
        chart = chart.data(BarGroup::default().label(Line::from(label.clone())).bars(&bars));
    }
    frame.render_widget(chart, area);
}

fn draw_chart(frame: &mut ratatui::Frame, panel: &Panel, block: Block, area: Rect) {
    let (x_min, x_max, y_min, y_max) = panel.bounds();
    let graph_type = match panel.kind {
        PanelKind::Line => GraphType::Line,
        _ => GraphType::Scatter,
    };
    let datasets: Vec<Dataset> = panel
        .series
        .iter()
        .enumerate()
        .map(|(index, series)| {
            Dataset::default()
                .name(series.name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(COLORS[index % COLORS.len()]))
                .data(&series.points)
        })
        .collect();

    let x_labels: Vec<String> = if panel.x_ticks.is_empty() {
        vec![format!("{x_min:.0}"), format!("{x_max:.0}")]
    } else {
        panel.x_ticks.iter().map(|(_, label)| label.clone()).collect()
    };
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(panel.x_label.clone())
                .bounds([x_min, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(panel.y_label.clone())
                .bounds([y_min, y_max])
                .labels(vec![format!("{y_min:.0}"), format!("{y_max:.0}")]),
        );
    frame.render_widget(chart, area);
}
