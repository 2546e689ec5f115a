//! Keyboard and paste input handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{SelectedFile, extract_paths};

use super::app::{App, Popup};
use super::transfer::{start_convert, start_list_remote, start_purge_remote, start_upload};

pub fn handle_input(app: &mut App, key: KeyEvent) {
    // Global quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.popup {
        Popup::Session => handle_session_input(app, key),
        Popup::Help => app.popup = Popup::None,
        Popup::None => handle_main_input(app, key),
    }
}

fn handle_session_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') if !app.remote.loading => start_list_remote(app),
        KeyCode::Char('P') if !app.remote.loading => start_purge_remote(app),
        KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q' | 's') => {
            app.popup = Popup::None;
        }
        _ => {}
    }
}

fn handle_main_input(app: &mut App, key: KeyEvent) {
    let idle_input = app.path_input.is_empty();
    match key.code {
        KeyCode::Enter => submit_paths(app),
        KeyCode::Char('c') if idle_input => start_convert(app),
        KeyCode::Char('s') if idle_input => start_list_remote(app),
        KeyCode::Char('?') if idle_input => app.popup = Popup::Help,
        KeyCode::Char('d') | KeyCode::Delete if idle_input => {
            if let Some(selected) = app.file_list_state.selected()
                && let Some(removed) = app.files.remove_at(selected)
            {
                log::info!("Removed {} from the selection", removed.name);
                app.clamp_selection();
            }
        }
        KeyCode::Char('X') if idle_input => {
            app.files.clear();
            app.clamp_selection();
            app.report_status("Selection cleared".to_string());
        }
        KeyCode::Up if idle_input => {
            let len = app.files.len();
            if len > 0 {
                let i = app.file_list_state.selected().unwrap_or(0);
                app.file_list_state
                    .select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
        }
        KeyCode::Down if idle_input => {
            let len = app.files.len();
            if len > 0 {
                let i = app.file_list_state.selected().unwrap_or(0);
                app.file_list_state.select(Some((i + 1) % len));
            }
        }
        KeyCode::Char('q') if idle_input => {
            app.should_quit = true;
        }
        KeyCode::Esc => {
            if idle_input {
                app.should_quit = true;
            } else {
                app.path_input.clear();
            }
        }
        KeyCode::Char(c) => {
            app.path_input.push(c);
        }
        KeyCode::Backspace => {
            app.path_input.pop();
        }
        _ => {}
    }
}

pub fn handle_paste(app: &mut App, text: &str) {
    if app.popup != Popup::None {
        return;
    }
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() > 1 {
        // One path per line; quote each so spaces inside a line survive.
        for line in lines {
            if !app.path_input.is_empty() {
                app.path_input.push(' ');
            }
            app.path_input.push_str(&quote_line(line));
        }
    } else {
        app.path_input.push_str(text.trim_end_matches(['\n', '\r']));
    }
}

fn quote_line(line: &str) -> String {
    let already_quoted = line.len() >= 2
        && ((line.starts_with('"') && line.ends_with('"'))
            || (line.starts_with('\'') && line.ends_with('\'')));
    if already_quoted || line.contains('"') {
        line.to_string()
    } else {
        format!("\"{line}\"")
    }
}

/// Adds every readable file named in the input bar and uploads that batch.
fn submit_paths(app: &mut App) {
    let paths = extract_paths(&app.path_input);
    if paths.is_empty() {
        return;
    }
    app.path_input.clear();

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for path in paths {
        match SelectedFile::from_path(&path) {
            Ok(file) => accepted.push(file),
            Err(e) => rejected.push(format!("{}: {e}", path.display())),
        }
    }

    let batch = app.files.add(accepted);
    if !batch.is_empty() {
        app.clamp_selection();
        start_upload(app, batch);
    }
    if !rejected.is_empty() {
        app.report_error(format!("Skipped {}", rejected.join("; ")));
    }
}

/// Selects the files given on the command line and uploads them.
pub fn add_initial_paths(app: &mut App, paths: &[std::path::PathBuf]) {
    for path in paths {
        if !app.path_input.is_empty() {
            app.path_input.push(' ');
        }
        app.path_input.push_str(&quote_line(&path.to_string_lossy()));
    }
    submit_paths(app);
}
