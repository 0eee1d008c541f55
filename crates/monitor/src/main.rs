use std::sync::Arc;
use std::{io, time::Duration};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Row, Table},
};
use tokio::time::interval;

use stormview_client::HttpTransport;
use stormview_common::{DEFAULT_API_URL, DEFAULT_RESYNC_SECS, DEFAULT_TICK_MS, DEFAULT_TIMEOUT_MS};
use stormview_engine::{EngineConfig, KeyPreview, PreviewSync, Snapshot, Ttl};

#[derive(Parser, Debug)]
#[command(name = "stormview-monitor", about = "Live key preview TUI for StormView")]
struct Args {
    #[arg(long, default_value = DEFAULT_API_URL)]
    api: String,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,
    #[arg(long, default_value_t = DEFAULT_RESYNC_SECS)]
    resync_secs: u64,
}

struct App {
    api: String,
    snapshot: Snapshot,
    /// Último erro de refresh publicado pelo engine.
    error: Option<String>,
    synced: bool,
}

impl App {
    fn new(api: String) -> Self {
        Self {
            api,
            snapshot: Snapshot::empty(),
            error: None,
            synced: false,
        }
    }

    fn on_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.synced = true;
    }

    /// O erro fica visível até um refresh seguinte dar certo.
    fn status(&self) -> String {
        match &self.error {
            Some(error) => format!("erro: {error}"),
            None if !self.synced => "sincronizando...".into(),
            None => format!("{} chaves", self.snapshot.len()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs vão para stderr; redirecione com 2>arquivo e RUST_LOG.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "off".into()),
        )
        .init();

    let args = Args::parse();
    let transport = Arc::new(HttpTransport::new(
        &args.api,
        Duration::from_millis(args.timeout_ms),
    )?);
    let config = EngineConfig {
        tick: Duration::from_millis(args.tick_ms),
        resync: Duration::from_secs(args.resync_secs.max(1)),
    };
    let sync = Arc::new(PreviewSync::new(transport, &config));
    tracing::info!("monitor conectado a {} (resync a cada {:?})", args.api, config.resync);
    let resync = sync.spawn_resync();
    let mut snapshots = sync.subscribe();
    let mut errors = sync.errors();

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(args.api.clone());
    let mut redraw = interval(Duration::from_millis(100));

    // UI Loop
    loop {
        terminal.draw(|f| ui(f, &app))?;

        // Handle Input (Non-blocking check)
        if event::poll(Duration::from_millis(0))?
            && let Event::Key(key) = event::read()?
        {
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('r') => {
                    // Falhas chegam pelo canal de erros do engine.
                    let sync = Arc::clone(&sync);
                    tokio::spawn(async move {
                        if let Ok(outcome) = sync.refresh().await {
                            tracing::debug!("refresh manual: {outcome:?}");
                        }
                    });
                }
                _ => {}
            }
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                app.on_snapshot(snapshots.borrow_and_update().clone());
            }
            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                app.error = errors.borrow_and_update().clone();
            }
            _ = redraw.tick() => {}
        }
    }

    resync.abort();

    // Restore Terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn ttl_style(ttl: &Ttl) -> Style {
    match ttl {
        Ttl::Remaining(0) => Style::default().fg(Color::Red),
        Ttl::Remaining(n) if *n <= 5 => Style::default().fg(Color::Yellow),
        Ttl::Remaining(_) => Style::default().fg(Color::Green),
        Ttl::Persistent | Ttl::NotApplicable(_) => Style::default().fg(Color::Gray),
    }
}

/// Colunas de uma linha da tabela: chave, valor, TTL.
fn row_cells(entry: &KeyPreview) -> [String; 3] {
    let value = entry.value.clone().unwrap_or_else(|| "(nil)".into());
    [entry.key.clone(), value, entry.ttl.to_string()]
}

fn ui(f: &mut Frame, app: &App) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(size);

    // Header
    let title = Paragraph::new(format!(
        "StormView - {} | {} | [r] refresh [q] sair",
        app.api,
        app.status()
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(title, chunks[0]);

    let rows = app.snapshot.iter().map(|entry| {
        let style = ttl_style(&entry.ttl);
        Row::new(row_cells(entry)).style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(50),
            Constraint::Percentage(20),
        ],
    )
    .header(
        Row::new(["Key", "Value", "TTL"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title("Keys").borders(Borders::ALL));

    f.render_widget(table, chunks[1]);
}
