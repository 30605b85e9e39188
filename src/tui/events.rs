//! Keyboard handling for the TUI event loop.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{App, SortBy, Status};

/// Drain pipeline messages, then wait up to one tick for a key press.
pub fn handle_events(app: &mut App) -> Result<()> {
    app.drain_messages();

    if !event::poll(Duration::from_millis(100))? {
        return Ok(());
    }
    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind == KeyEventKind::Release {
        return Ok(());
    }

    // The gg latch only survives consecutive presses of 'g'.
    if key.code != KeyCode::Char('g') {
        app.last_g = false;
    }

    if app.filtering {
        return handle_filter_input(app, key);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => handle_quit(app),
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            handle_quit(app)
        }
        _ => match app.status {
            Status::Ready => handle_ready(app, key),
            Status::ConfirmDelete => handle_confirm_delete(app, key),
            Status::ConfirmArchive => handle_confirm_archive(app, key),
            Status::Done | Status::ArchiveDone => {
                // any key returns to the list
                app.status = Status::Ready;
                Ok(())
            }
            Status::Scanning => handle_scanning(app, key),
            Status::Deleting | Status::Archiving => Ok(()),
        },
    }
}

/// Quit is context-sensitive: it backs out of confirms, cancels running
/// operations, and only then leaves the program.
fn handle_quit(app: &mut App) -> Result<()> {
    match app.status {
        Status::ConfirmDelete | Status::ConfirmArchive => {
            app.status = Status::Ready;
        }
        Status::Deleting | Status::Archiving => {
            // keep waiting for the terminal summary
            app.cancel_running();
        }
        Status::Scanning => {
            app.cancel_running();
            app.should_quit = true;
        }
        _ => {
            app.should_quit = true;
        }
    }
    Ok(())
}

fn handle_scanning(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.code == KeyCode::Char('?') {
        app.show_help = !app.show_help;
    }
    Ok(())
}

fn handle_ready(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('?') => app.show_help = !app.show_help,
        KeyCode::Char('/') => app.filtering = true,
        KeyCode::Up | KeyCode::Char('k') => {
            app.cursor = app.cursor.saturating_sub(1);
            app.adjust_scroll();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let visible = app.view_indexes().len();
            if app.cursor + 1 < visible {
                app.cursor += 1;
            }
            app.adjust_scroll();
        }
        KeyCode::Char('f') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let visible = app.view_indexes().len();
            app.cursor = (app.cursor + app.list_height).min(visible.saturating_sub(1));
            app.adjust_scroll();
        }
        KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.cursor = app.cursor.saturating_sub(app.list_height);
            app.adjust_scroll();
        }
        KeyCode::Home => {
            app.cursor = 0;
            app.adjust_scroll();
        }
        KeyCode::End | KeyCode::Char('G') => {
            app.cursor = app.view_indexes().len().saturating_sub(1);
            app.adjust_scroll();
        }
        KeyCode::Char('g') => {
            if app.last_g {
                app.cursor = 0;
                app.adjust_scroll();
                app.last_g = false;
            } else {
                app.last_g = true;
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('x') => app.toggle_delete_mark(),
        KeyCode::Char('z') => app.toggle_archive_mark(),
        KeyCode::Char('A') | KeyCode::Char('X') => app.mark_all_delete(),
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.mark_all_delete()
        }
        KeyCode::Char('Z') => app.mark_all_archive(),
        KeyCode::Char('R') => app.invert_marks(),
        KeyCode::Char('s') => {
            app.sort_by = match app.sort_by {
                SortBy::Size => SortBy::Path,
                SortBy::Path => SortBy::Size,
            };
            app.apply_sort();
        }
        KeyCode::Char('r') => {
            app.sort_reverse = !app.sort_reverse;
            app.apply_sort();
        }
        KeyCode::Enter | KeyCode::Char('d') => {
            if app.marked_delete_count() > 0 {
                app.status = Status::ConfirmDelete;
            } else if app.marked_archive_count() > 0 {
                app.status = Status::ConfirmArchive;
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_filter_input(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            app.filtering = false;
            app.adjust_scroll();
        }
        KeyCode::Esc => {
            app.filter.clear();
            app.filtering = false;
            app.cursor = 0;
            app.scroll = 0;
        }
        KeyCode::Backspace => {
            app.filter.pop();
            app.cursor = 0;
            app.scroll = 0;
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.filter.push(c);
            app.cursor = 0;
            app.scroll = 0;
        }
        _ => {}
    }
    Ok(())
}

fn handle_confirm_delete(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.start_deletion(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.status = Status::Ready,
        _ => {}
    }
    Ok(())
}

fn handle_confirm_archive(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.start_archival(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.status = Status::Ready,
        _ => {}
    }
    Ok(())
}
