//! Terminal front end shared by both binaries.

use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, Stdout},
    sync::Mutex,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::Backend, backend::CrosstermBackend};
use swing_data::{TickerClient, TickerSource};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::ScannerConfig,
    widget::{ScannerView, render_scanner},
    worker::{RefreshRequest, Scanner, ScannerHandle, spawn_scanner},
};

pub const DEFAULT_LOG_FILE: &str = "swing-scanner.log";

/// Input poll period, also the redraw period while idle.
const UI_TICK: Duration = Duration::from_millis(250);

/// Initialise `tracing` to a log file (`SCANNER_LOG_FILE`); stdout belongs to the TUI.
pub fn init_logging() -> io::Result<()> {
    let path =
        std::env::var("SCANNER_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

/// Run the scanner UI until the user quits.
pub async fn run(config: ScannerConfig) -> Result<(), Box<dyn Error>> {
    let client = TickerClient::new(config.client_config())?;
    info!(
        title = %config.title,
        url = %client.url(),
        mode = %config.signal.mode,
        refresh = %config.refresh,
        "starting scanner UI"
    );

    let scanner = Scanner::from_config(client, &config);
    let mut view = ScannerView::new(&config);

    // Restore the terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal_state();
        original_hook(panic_info);
    }));

    // The worker is only spawned once the terminal is ready
    let mut terminal = setup_terminal()?;
    let result = run_session(&mut terminal, scanner, &mut view, read_key).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("scanner UI closed");
    result
}

/// Raw mode plus alternate screen; undone again if any step fails.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;

    let terminal = (|| {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        Terminal::new(CrosstermBackend::new(stdout))
    })();

    if terminal.is_err() {
        restore_terminal_state();
    }
    terminal
}

fn restore_terminal_state() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Next key press within `timeout`, if any.
fn read_key(timeout: Duration) -> io::Result<Option<KeyCode>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(key.code));
        }
    }
    Ok(None)
}

/// Spawn the worker, drive the UI, and always stop the worker afterwards.
async fn run_session<B, Source, Input>(
    terminal: &mut Terminal<B>,
    scanner: Scanner<Source>,
    view: &mut ScannerView,
    input: Input,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    Source: TickerSource + 'static,
    Input: FnMut(Duration) -> io::Result<Option<KeyCode>>,
{
    let mut handle = spawn_scanner(scanner);
    let result = event_loop(terminal, &mut handle, view, input);
    handle.shutdown().await;
    result
}

fn event_loop<B, Input>(
    terminal: &mut Terminal<B>,
    handle: &mut ScannerHandle,
    view: &mut ScannerView,
    mut input: Input,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    Input: FnMut(Duration) -> io::Result<Option<KeyCode>>,
{
    let mut last_draw: Option<Instant> = None;

    loop {
        let mut dirty = last_draw.is_none_or(|at| at.elapsed() >= UI_TICK);
        loop {
            match handle.reports.try_recv() {
                Ok(report) => {
                    view.apply(report);
                    dirty = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("scanner worker exited");
                    return Ok(());
                }
            }
        }

        if dirty {
            terminal.draw(|f| render_scanner(f, view))?;
            last_draw = Some(Instant::now());
        }

        let Some(code) = input(UI_TICK)? else {
            continue;
        };
        let request = match code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('r') => RefreshRequest::Refresh,
            KeyCode::Char('R') => RefreshRequest::ForceRefresh,
            _ => continue,
        };
        if !handle.request(request) {
            warn!(?request, "refresh request dropped");
        }
    }

    Ok(())
}
