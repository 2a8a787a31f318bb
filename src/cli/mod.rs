//! TUI front-end entry (Ratatui + Crossterm)
//! - Talks to the store in-process through [`api::Client`]
//! - Sets up the terminal and drives the draw/input loop

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::backend::AppState;

pub mod api;
pub mod input;
pub mod state;
pub mod ui;
pub mod util;

pub async fn run(state: AppState) -> Result<()> {
    let mut app = state::App::new(api::Client::new(state));

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = app.api.sign_out().await {
        tracing::warn!(error = %e, "could not close session on exit");
    }
    outcome
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut state::App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        app.sync_feed();
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = app.handle_key(key).await {
                    tracing::error!(error = %e, "key handling failed");
                    app.status = format!("Error: {e}");
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.quit {
            break;
        }
    }
    Ok(())
}
