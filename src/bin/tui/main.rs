mod app;

use std::io;
use std::time::Duration;

use app::{
    feed_url, format_clock_ms, format_countdown, format_date, format_score, run_feed, truncate, AppState,
    ConnectionStatus, FeedEvent,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
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
use tokio::sync::mpsc;

/// Upper bound on how long a key poll blocks, so feed pushes and the
/// countdown redraw promptly.
const INPUT_POLL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url.clone());

    // Initial fetch before rendering
    app.refresh(&client).await;

    let (feed_tx, mut feed_rx) = mpsc::channel(16);
    let feed = tokio::spawn(run_feed(feed_url(&base_url), feed_tx));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut listing_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, &mut feed_rx, &mut listing_state).await;

    feed.abort();

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    feed_rx: &mut mpsc::Receiver<FeedEvent>,
    listing_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        while let Ok(event) = feed_rx.try_recv() {
            app.apply_feed(event);
        }

        terminal.draw(|f| render(f, app, listing_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO)
            .min(INPUT_POLL);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.listing.items.len().saturating_sub(1);
                            let next = listing_state.selected().map_or(0, |i| (i + 1).min(max));
                            listing_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = listing_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            listing_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, listing_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, listing_state, chunks[1]);
    render_footer(f, chunks[2]);
}

fn status_span(label: &str, status: &ConnectionStatus) -> Span<'static> {
    let (text, color) = match status {
        ConnectionStatus::Connected => (format!("● {label}"), Color::Green),
        ConnectionStatus::Connecting => (format!("◌ {label}"), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {label}: {}", truncate(e, 30)), Color::Red),
    };
    Span::styled(text, Style::default().fg(color))
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let supplier = if app.health.supplier_ok {
        Span::styled("supplier ok", Style::default().fg(Color::Green))
    } else {
        Span::styled("supplier down", Style::default().fg(Color::Red))
    };

    let title_spans = vec![
        Span::styled(
            " Launch Rotation  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        status_span("api", &app.status),
        Span::raw("  "),
        status_span("feed", &app.feed_status),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "epoch {} since {} UTC",
                app.listing.epoch,
                format_clock_ms(app.listing.epoch_started_at_ms)
            ),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("next rotation {}", format_countdown(app.countdown_ms())),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "{}P {}p {}b",
                app.health.premium_entries, app.health.primary_entries, app.health.boosted_entries
            ),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        supplier,
    ];

    let header_line = Line::from(title_spans);
    let paragraph = Paragraph::new(header_line)
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, listing_state: &mut TableState, area: Rect) {
    // Horizontal split: listing (65%) | winners (35%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_listing_table(f, app, listing_state, halves[0]);
    render_winners_table(f, app, halves[1]);
}

fn tier_color(tier: &str) -> Color {
    match tier {
        "premium" => Color::Magenta,
        "boosted" => Color::Yellow,
        "primary" => Color::White,
        _ => Color::DarkGray,
    }
}

fn render_listing_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Launch", "Tier", "Score", "Date"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .listing
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let e = &item.entry;
            let label = if e.name.is_empty() { &e.id } else { &e.name };
            let color = tier_color(&e.listing_tier);

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(label, 32)).style(Style::default().fg(color)),
                Cell::from(e.listing_tier.clone()).style(Style::default().fg(color)),
                Cell::from(format_score(e.score)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_date(&e.effective_date).to_string())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" LISTING ({}) ", app.listing.items.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_winners_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["Rank", "Launch", "Score"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .winners
        .winners
        .iter()
        .map(|w| {
            let label = if w.entry.name.is_empty() { &w.entry.id } else { &w.entry.name };
            let rank_color = match w.rank {
                1 => Color::Yellow,
                2 => Color::White,
                _ => Color::LightRed,
            };
            Row::new(vec![
                Cell::from(format!("#{}", w.rank)).style(Style::default().fg(rank_color)),
                Cell::from(truncate(label, 24)),
                Cell::from(format_score(w.entry.score)).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let window = &app.winners.window;
    let title = if window.start.is_empty() {
        " LAST WEEK ".to_string()
    } else {
        format!(" LAST WEEK {} → {} ", format_date(&window.start), format_date(&window.end))
    };

    let table = Table::new(
        rows,
        [Constraint::Length(5), Constraint::Min(10), Constraint::Length(6)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll listing  "),
        Span::styled("auto-refresh: 2s, listing: live", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
