//! Interactive terminal front end: pick files, upload them, convert and save the archive.

mod app;
mod draw;
mod event;
mod input;
mod transfer;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::Event;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::TransferClient;

use self::app::App;
use self::draw::draw;
use self::event::{TransferEvent, TuiProgress};
use self::input::{add_initial_paths, handle_input, handle_paste};
use self::transfer::handle_transfer_event;

/// RAII guard that ensures terminal cleanup on drop.
/// Restores terminal to normal mode even if a panic occurs.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            EnterAlternateScreen,
            crossterm::event::EnableBracketedPaste
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(
            io::stdout(),
            crossterm::event::DisableBracketedPaste,
            LeaveAlternateScreen
        );
    }
}

/// Runs the interactive TUI until the user quits.
///
/// `initial_paths` are selected and uploaded as the first batch.
///
/// # Errors
/// Returns an error if terminal setup fails or TUI operations encounter I/O errors.
#[allow(clippy::unused_async)]
pub async fn run(client: TransferClient, initial_paths: &[PathBuf]) -> io::Result<()> {
    let _terminal_guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TransferEvent>();
    let client = client.with_progress(Arc::new(TuiProgress {
        tx: event_tx.clone(),
    }));
    let mut app = App::new(client, event_tx);

    if !initial_paths.is_empty() {
        add_initial_paths(&mut app, initial_paths);
    }

    loop {
        terminal.draw(|f| draw(f, &app))?;

        if crossterm::event::poll(Duration::from_millis(100))? {
            match crossterm::event::read()? {
                Event::Key(key) => handle_input(&mut app, key),
                Event::Paste(text) => handle_paste(&mut app, &text),
                _ => {}
            }
        }

        // Drain transfer events (non-blocking)
        while let Ok(event) = event_rx.try_recv() {
            handle_transfer_event(&mut app, event);
        }

        if app.should_quit {
            if !app.convert_enabled() {
                log::warn!("Quitting with a transfer still in flight");
            }
            break;
        }
    }

    terminal.show_cursor()?;
    Ok(())
}
