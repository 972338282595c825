//! Terminal UI for the chat view

pub mod chat;
pub mod composer;
pub mod log;

use crate::client::AssistantClient;
use crate::config::Config;
use crate::storage::FileStore;
use anyhow::{Context, Result};
use chat::{ChatView, ViewAction};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

/// Launch the chat view and run until the user exits
pub async fn run(config: Config) -> Result<()> {
    let client = AssistantClient::new(config.clone())?;
    let store = FileStore::new(config.store_dir())?;
    let mut view = ChatView::new(client, Box::new(store));

    // One thread per session, requested before the UI takes over
    view.initialize().await;

    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = run_loop(&mut terminal, &mut view);

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to restore cursor")?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut ChatView,
) -> Result<()> {
    loop {
        view.process_stream_events();
        terminal.draw(|frame| view.render(frame))?;

        // Short poll so stream deltas render as they arrive
        if event::poll(Duration::from_millis(50)).context("Failed to poll terminal events")? {
            match event::read().context("Failed to read terminal event")? {
                Event::Key(key) => {
                    if view.handle_key(key) == ViewAction::Exit {
                        return Ok(());
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
}
