//! memview - browse Memtime time-tracking data in the terminal
//!
//! A terminal UI application that shows clients, projects and tasks as a
//! lazily loaded tree, lists time entries page by page, and creates or edits
//! time entries.

use std::io;
use std::panic;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tracing::info;

use memview::app::App;
use memview::cli::{Cli, StartupConfig};
use memview::data::MemtimeClient;
use memview::logging;
use memview::ui;
use memview::worker::Worker;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Hands queued requests to the worker and finished results to the app
fn pump(app: &mut App, worker: &mut Worker) {
    while let Some(message) = worker.try_recv() {
        app.handle_message(message);
    }
    for request in app.take_requests() {
        worker.dispatch(request);
    }
}

/// Main event loop, runs until the app asks to quit
fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    worker: &mut Worker,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        pump(app, worker);
        app.tick(Instant::now());

        terminal.draw(|f| ui::render(f, app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Values from .env become visible to clap's env fallbacks
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let _log_guard = logging::init(config.log_level.as_deref());
    info!(base_url = %config.base_url, page_size = config.page_size, "starting memview");

    let client = MemtimeClient::new(config.base_url.clone(), config.api_key.clone())?;
    let mut worker = Worker::new(client);
    let mut app = App::with_startup_config(&config);

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &mut worker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("memview exited");
    result
}
