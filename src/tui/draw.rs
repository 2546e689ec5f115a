//! All drawing / rendering functions.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};

use crate::format::truncate_name;
use crate::{TransferPhase, format_bytes, format_duration};

use super::app::{App, Popup};

const NAME_WIDTH: usize = 40;

pub fn draw(frame: &mut ratatui::Frame, app: &App) {
    draw_main(frame, app);
    match app.popup {
        Popup::None => {}
        Popup::Session => draw_session_popup(frame, app),
        Popup::Help => draw_help_popup(frame),
    }
}

fn draw_main(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let busy = !app.convert_enabled();
    let accent = if busy { Color::Yellow } else { Color::Cyan };

    let outer = Block::default()
        .title(" luna ")
        .title_alignment(Alignment::Left)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let server = format!(" {} ", app.client.config().base_url);
    let right_x = area
        .x
        .saturating_add(area.width)
        .saturating_sub(u16::try_from(server.len()).unwrap_or(u16::MAX) + 1);
    if right_x > area.x + 8 {
        frame.render_widget(
            Paragraph::new(server).style(Style::default().fg(accent)),
            Rect::new(
                right_x,
                area.y,
                area.width.saturating_sub(right_x - area.x),
                1,
            ),
        );
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Path input bar
            Constraint::Length(3), // Transfer phase
            Constraint::Min(5),    // Selected files
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Controls bar
        ])
        .split(inner);

    let input_style = if app.popup == Popup::None {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.path_input.as_str())
        .block(
            Block::default()
                .title(" Add file(s): type, paste or drop paths, Enter to upload ")
                .borders(Borders::ALL)
                .border_style(input_style),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(input, chunks[0]);

    let phase = Paragraph::new(Line::from(build_phase_line(app)))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(phase, chunks[1]);

    draw_file_list(frame, app, chunks[2]);

    let status = if let Some(err) = &app.last_error {
        Span::styled(format!(" {err}"), Style::default().fg(Color::Red))
    } else {
        Span::styled(format!(" {}", app.status), Style::default().fg(Color::Cyan))
    };
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[3]);

    let controls = if app.convert_enabled() {
        "c:convert  d:remove  X:clear  s:session  ?:help  q:quit"
    } else {
        "c:(busy)  d:remove  X:clear  s:session  ?:help  q:quit"
    };
    let controls_bar = Paragraph::new(controls)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(controls_bar, chunks[4]);
}

fn build_phase_line(app: &App) -> Vec<Span<'static>> {
    let state = app.client.state();
    let mut spans = Vec::new();

    let (label, color) = if app.is_converting() {
        let elapsed = app
            .convert_started
            .map(|t| format!(" {}", format_duration(t.elapsed())))
            .unwrap_or_default();
        (
            format!(
                " Converting{elapsed}, {} received",
                format_bytes(app.archive_received)
            ),
            Color::Yellow,
        )
    } else if app.is_uploading() {
        (" Uploading...".to_string(), Color::Yellow)
    } else {
        match state.phase() {
            TransferPhase::Ready(_) => (" Ready to convert".to_string(), Color::Green),
            _ if state.is_delivered() => (" Archive saved".to_string(), Color::Green),
            _ => (" Waiting for files".to_string(), Color::DarkGray),
        }
    };
    spans.push(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));

    spans.push(Span::styled("  |  ", Style::default().fg(Color::DarkGray)));
    match state.session() {
        Some(id) => spans.push(Span::styled(
            format!("session {id}"),
            Style::default().fg(Color::White),
        )),
        None => spans.push(Span::styled(
            "no session",
            Style::default().fg(Color::DarkGray),
        )),
    }

    if let Some(path) = &app.last_archive {
        spans.push(Span::styled("  |  ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            path.display().to_string(),
            Style::default().fg(Color::Green),
        ));
    }
    spans
}

fn draw_file_list(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .files
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let selected = app.file_list_state.selected() == Some(i);
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let marker = if selected { ">" } else { " " };
            let name = truncate_name(&f.name, NAME_WIDTH);
            ListItem::new(format!(
                "{marker} {name:<NAME_WIDTH$}  {:>10}",
                format_bytes(f.size)
            ))
            .style(style)
        })
        .collect();

    let title = format!(
        " Selected: {} file(s), {} ",
        app.files.len(),
        format_bytes(app.files.total_size())
    );
    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_stateful_widget(list, area, &mut app.file_list_state.clone());
}

fn draw_session_popup(frame: &mut ratatui::Frame, app: &App) {
    let area = centered_rect(56, 16, frame.area());
    frame.render_widget(Clear, area);

    let title = app
        .client
        .session()
        .map_or_else(|| " Session ".to_string(), |id| format!(" Session {id} "));
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    if app.remote.loading {
        let loading = Paragraph::new(" Loading...").style(Style::default().fg(Color::Yellow));
        frame.render_widget(loading, chunks[0]);
    } else if let Some(err) = &app.remote.error {
        let error = Paragraph::new(format!(" {err}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(error, chunks[0]);
    } else if app.remote.files.is_empty() {
        let empty = Paragraph::new(" The server holds no files for this session")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, chunks[0]);
    } else {
        let items: Vec<ListItem> = app
            .remote
            .files
            .iter()
            .map(|name| ListItem::new(format!(" {}", truncate_name(name, 50))))
            .collect();
        frame.render_widget(List::new(items), chunks[0]);
    }

    let help = Paragraph::new(" r:refresh  P:purge server copy  Esc:close")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);
}

fn draw_help_popup(frame: &mut ratatui::Frame) {
    let area = centered_rect(60, 14, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let lines = vec![
        Line::from(" Type or paste file paths, then press Enter."),
        Line::from(" Each batch is uploaded as soon as it is added."),
        Line::from(""),
        Line::from(" c       convert everything uploaded this session"),
        Line::from(" d/Del   remove the highlighted file from the list"),
        Line::from(" X       clear the list (server copies stay)"),
        Line::from(" s       show files stored on the server"),
        Line::from(" Up/Down move the highlight"),
        Line::from(" q/Esc   quit"),
        Line::from(""),
        Line::from(Span::styled(
            " Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Returns a centered rectangle of the given size within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
