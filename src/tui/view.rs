//! Rendering for the TUI.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Status};
use crate::util::{human_bytes, human_bytes_compact};

pub fn render(f: &mut Frame, app: &mut App) {
    let show_gauge = matches!(app.status, Status::Deleting | Status::Archiving);
    let constraints = if show_gauge {
        vec![
            Constraint::Length(2), // header
            Constraint::Min(0),    // list
            Constraint::Length(3), // gauge
            Constraint::Length(1), // help bar
        ]
    } else {
        vec![
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ]
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    app.list_height = chunks[1].height as usize;
    app.adjust_scroll();

    render_header(f, chunks[0], app);
    render_list(f, chunks[1], app);
    if show_gauge {
        render_gauge(f, chunks[2], app);
        render_help_bar(f, chunks[3]);
    } else {
        render_help_bar(f, chunks[2]);
    }

    match app.status {
        Status::ConfirmDelete => render_confirm_delete(f, app),
        Status::ConfirmArchive => render_confirm_archive(f, app),
        Status::Done => render_done(f, app),
        Status::ArchiveDone => render_archive_done(f, app),
        _ => {}
    }
    if app.show_help {
        render_help_overlay(f);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            if app.scanning { "Scanning " } else { "Found " },
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("{}", app.items.len())),
        Span::raw("  Total: "),
        Span::styled(
            human_bytes(app.total_size),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  Del: "),
        Span::styled(
            human_bytes(app.marked_delete_size),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  Zip: "),
        Span::styled(
            human_bytes(app.marked_archive_size),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if app.scanning {
        spans.push(Span::raw(format!(
            "  Elapsed: {:.1}s",
            app.started.elapsed().as_secs_f64()
        )));
    }
    if app.filtering || !app.filter.is_empty() {
        let suffix = if app.filtering { "_" } else { "" };
        spans.push(Span::styled(
            format!("  /{}{} ({})", app.filter, suffix, app.view_indexes().len()),
            Style::default().fg(Color::Magenta),
        ));
    }
    if app.dry_run {
        spans.push(Span::styled(
            "  [dry-run]",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    let mut lines = vec![Line::from(spans)];
    if let Some(err) = &app.scan_err {
        lines.push(Line::from(Span::styled(
            format!("scan errors: {}", err),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("root: {}", app.root.display()),
            Style::default().fg(Color::DarkGray),
        )));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn render_list(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view_indexes();
    if view.is_empty() {
        let message = if app.scanning {
            "Scanning..."
        } else if app.filter.is_empty() {
            "No node_modules found."
        } else {
            "No matches for the current filter."
        };
        f.render_widget(Paragraph::new(message), area);
        return;
    }

    let height = area.height as usize;
    let end = (app.scroll + height).min(view.len());
    let mut lines = Vec::with_capacity(end.saturating_sub(app.scroll));
    for (row, &idx) in view[app.scroll..end].iter().enumerate() {
        let item = &app.items[idx];
        let at_cursor = app.scroll + row == app.cursor;

        let cursor = if at_cursor {
            Span::styled(">", Style::default().fg(Color::Magenta))
        } else {
            Span::raw(" ")
        };
        let mark = if item.marked_delete {
            Span::styled("[x]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else if item.marked_archive {
            Span::styled("[z]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            Span::styled("[ ]", Style::default().fg(Color::DarkGray))
        };
        let size = Span::styled(
            format!("{:>10}", human_bytes_compact(item.size)),
            Style::default().fg(size_color(item.size)),
        );
        let path_style = if item.marked_delete {
            Style::default().fg(Color::Green)
        } else if item.marked_archive {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let mut spans = vec![
            cursor,
            Span::raw(" "),
            mark,
            Span::raw(" "),
            size,
            Span::raw(" "),
            Span::styled(item.display.clone(), path_style),
        ];
        if let Some(err) = &item.error {
            spans.push(Span::styled(
                format!("  ({})", err),
                Style::default().fg(Color::Red),
            ));
        }
        lines.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(lines), area);
}

/// Size column color, graded by magnitude.
fn size_color(bytes: u64) -> Color {
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * MB;
    match bytes {
        b if b >= 8 * GB => Color::Red,
        b if b >= 2 * GB => Color::LightRed,
        b if b >= GB => Color::Yellow,
        b if b >= 256 * MB => Color::Green,
        b if b >= 64 * MB => Color::Gray,
        _ => Color::DarkGray,
    }
}

fn render_gauge(f: &mut Frame, area: Rect, app: &App) {
    let (title, label, color) = match app.status {
        Status::Deleting => {
            let mode = if app.dry_run { " [dry-run]" } else { "" };
            (
                format!("Deleting{}", mode),
                format!(
                    "{}/{}  {}",
                    app.op_completed, app.op_total, app.op_last_path
                ),
                Color::Red,
            )
        }
        _ => (
            "Compressing".to_string(),
            format!(
                "{}/{}  {} -> {}  ({})",
                app.op_completed,
                app.op_total,
                app.op_last_path,
                app.op_last_dest,
                human_bytes(app.op_written)
            ),
            Color::Blue,
        ),
    };
    let percent = if app.op_total > 0 {
        (app.op_completed * 100 / app.op_total).min(100) as u16
    } else {
        0
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(color).bg(Color::Black))
        .percent(percent)
        .label(label);
    f.render_widget(gauge, area);
}

fn render_help_bar(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        " ?:help  space/x:[x]  z:[z]  A/Z:all  R:invert  s/r:sort  /:filter  d/enter:go  q:quit",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(help, area);
}

fn popup_area(f: &Frame, width_pct: u16, height: u16) -> Rect {
    let area = f.area();
    let max_width = area.width.saturating_sub(4).max(10);
    let width = (area.width * width_pct / 100).max(40).min(max_width);
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height.min(area.height))
}

fn render_confirm_delete(f: &mut Frame, app: &App) {
    let area = popup_area(f, 60, 7);
    f.render_widget(Clear, area);
    let mode = if app.dry_run { " (dry-run)" } else { "" };
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Delete ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "{} directories, freeing ~{}{}?",
                app.marked_delete_count(),
                human_bytes(app.marked_delete_size),
                mode
            )),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Y]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes  "),
            Span::styled("[N/Esc]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ];
    let popup = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Confirm Delete "),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(popup, area);
}

fn render_confirm_archive(f: &mut Frame, app: &App) {
    let area = popup_area(f, 60, 8);
    f.render_widget(Clear, area);
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Compress ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "{} directories (~{}) to .tar.gz?",
                app.marked_archive_count(),
                human_bytes(app.marked_archive_size)
            )),
        ]),
        Line::from("Originals are deleted after a verified archive."),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Y]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes  "),
            Span::styled("[N/Esc]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ];
    let popup = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Confirm Compress "),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(popup, area);
}

fn render_done(f: &mut Frame, app: &App) {
    let mut text = vec![Line::from(vec![Span::styled(
        format!(
            "Delete complete{}. Freed {}. Failures: {}",
            if app.dry_run { " (dry-run; nothing removed)" } else { "" },
            human_bytes(app.op_freed),
            app.op_failures.len()
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )])];
    push_failures(&mut text, app);
    render_summary_popup(f, " Delete Summary ", text);
}

fn render_archive_done(f: &mut Frame, app: &App) {
    let mut text = vec![Line::from(vec![Span::styled(
        format!(
            "Compress complete. Written {}. Failures: {}",
            human_bytes(app.op_written),
            app.op_failures.len()
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )])];
    push_failures(&mut text, app);
    render_summary_popup(f, " Compress Summary ", text);
}

fn push_failures(text: &mut Vec<Line>, app: &App) {
    for failure in app.op_failures.iter().take(10) {
        text.push(Line::from(Span::styled(
            format!(" - {}: {}", failure.path.display(), failure.error),
            Style::default().fg(Color::Red),
        )));
    }
    if app.op_failures.len() > 10 {
        text.push(Line::from(format!(
            " ... and {} more",
            app.op_failures.len() - 10
        )));
    }
    text.push(Line::from(""));
    text.push(Line::from("Press q to quit or any key to return."));
}

fn render_summary_popup(f: &mut Frame, title: &str, text: Vec<Line>) {
    let height = (text.len() as u16 + 2).min(f.area().height);
    let area = popup_area(f, 70, height);
    f.render_widget(Clear, area);
    let popup = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: true });
    f.render_widget(popup, area);
}

fn render_help_overlay(f: &mut Frame) {
    let lines: Vec<Line> = [
        "Help (press ? to close):",
        "  up/k, down/j     Move cursor",
        "  ctrl+f / ctrl+b  Page down / up",
        "  Home/End, gg/G   Jump to top / bottom",
        "  space/x          Toggle delete mark [x]",
        "  z                Toggle compress mark [z]",
        "  A / X / ctrl+a   Mark all visible [x]",
        "  Z                Mark all visible [z]",
        "  R                Invert marks (z->., x->., .->x)",
        "  s                Toggle sort field (size/path)",
        "  r                Reverse sort",
        "  /                Filter (Enter keeps, Esc clears)",
        "  d/enter          Delete [x] or compress [z] selection",
        "  q/esc/ctrl+c     Quit; cancels whatever is running",
    ]
    .iter()
    .map(|s| Line::from(*s))
    .collect();
    let height = (lines.len() as u16 + 2).min(f.area().height);
    let area = popup_area(f, 60, height);
    f.render_widget(Clear, area);
    let popup = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Keys "));
    f.render_widget(popup, area);
}
