//! Interactive front-end.
//!
//! Consumes the scanner's streamed results and drives the destructive
//! pipelines from user selections. The pipelines stay in the library; this
//! module owns only presentation and the event loop.

pub mod app;
pub mod events;
pub mod view;

use std::io;
use std::path::Path;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::scanner::ScanOptions;
use app::App;
use events::handle_events;

/// Run the interactive session over a streaming scan of `root`.
pub fn run(root: &Path, opts: ScanOptions, dry_run: bool) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(root.to_path_buf(), opts, dry_run);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| view::render(f, app))?;
        handle_events(app)?;
        if app.should_quit {
            break;
        }
    }
    Ok(())
}
