//! Terminal User Interface for the Pinch onboarding tour
//!
//! Renders mock product pages and walks the tour over them:
//! - Tooltip anchored to on-screen widgets, retried until they mount
//! - Dialog sub-steps gated on the dialog opening
//! - Mouse or keyboard drag of the tooltip
//! - Auto-refresh when the profile database changes on disk

pub mod app;
pub mod events;
pub mod msg; // TEA message types (what happened)
pub mod screen; // Rendered frame as an anchor document
pub mod state; // Pure state transformations (functional core)
pub mod ui;
pub mod update; // TEA update function (state transitions)

use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::prelude::*;

use app::App;
use events::{dispatch, handle_event};
use msg::Msg;

/// Run the TUI application
pub fn run(app: App) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app, ensuring cleanup happens even on error
    let result = run_app_inner(&mut terminal, app);

    // Restore terminal - this MUST run even if app fails
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    );
    let _ = terminal.show_cursor();

    result
}

fn run_app_inner<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> Result<(), Box<dyn std::error::Error>> {
    // Setup file watcher for auto-refresh
    let (tx, rx) = mpsc::channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if event.kind.is_modify() {
                    let _ = tx.send(());
                }
            }
        },
        Config::default(),
    )?;

    // Ephemeral runs have no database to watch
    if let Some(path) = app.watch_path() {
        watcher.watch(path, RecursiveMode::NonRecursive)?;
    }

    run_event_loop(terminal, &mut app, rx)
}

fn run_event_loop<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    file_change_rx: mpsc::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI; anchors that moved get re-resolved
        let previous = app.screen.clone();
        let completed = terminal.draw(|f| ui::draw(f, app))?;
        let bounds = completed.area;
        app.frame_drawn(&previous);

        // Handle input with timeout, shortened for pending retries
        let mut timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if let Some(deadline) = app.session.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }
        if poll(timeout)? {
            match read()? {
                Event::Key(key) => {
                    if handle_event(app, key) {
                        return Ok(()); // Quit signal
                    }
                }
                Event::Mouse(mouse) => {
                    app.handle_mouse(mouse, bounds);
                }
                Event::Resize(width, height) => {
                    dispatch(app, Msg::Resize(width, height));
                }
                _ => {}
            }
        }

        // Check for file changes (non-blocking)
        if file_change_rx.try_recv().is_ok() {
            app.reload_profile();
        }

        if last_tick.elapsed() >= tick_rate || app.session.next_deadline().is_some() {
            app.tick();
            last_tick = Instant::now();
        }
    }
}
