mod actions;
mod render;
mod session;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::metadata::MetadataProvider;
use crate::progress::ProgressStore;
use crate::storage::SlotStorage;

use super::format::{describe_content_key, truncate};

use self::actions::{refresh_items, status_error, status_info};
pub(crate) use self::actions::{ActionOutcome, run_selected_action};
use self::render::draw_tui;
use self::session::ScreenGuard;

#[cfg(test)]
pub(crate) use self::actions::refresh_items as refresh_tui_items;
#[cfg(test)]
pub(crate) use self::render::popup_rect_for_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TuiAction {
    Resume,
    Next,
    Previous,
}

impl TuiAction {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Resume => "RESUME",
            Self::Next => "NEXT",
            Self::Previous => "PREVIOUS",
        }
    }

    pub(crate) fn move_left(self) -> Self {
        match self {
            Self::Resume | Self::Next => Self::Resume,
            Self::Previous => Self::Next,
        }
    }

    pub(crate) fn move_right(self) -> Self {
        match self {
            Self::Resume => Self::Next,
            Self::Next | Self::Previous => Self::Previous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListView {
    History,
    ContinueWatching,
}

impl ListView {
    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::History => "History",
            Self::ContinueWatching => "Continue Watching",
        }
    }

    pub(crate) fn toggle(self) -> Self {
        match self {
            Self::History => Self::ContinueWatching,
            Self::ContinueWatching => Self::History,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct PendingUnwatch {
    pub(super) content_key: String,
}

#[derive(Debug, Clone)]
pub(super) struct PendingNotice {
    pub(super) title: &'static str,
    pub(super) message: String,
}

pub(crate) fn initial_status(has_items: bool, metadata_error: Option<&str>) -> String {
    if let Some(err) = metadata_error {
        return status_error(&format!("metadata unavailable: {err}"));
    }
    if has_items {
        status_info("Ready.")
    } else {
        status_info("No progress recorded yet. Run `watchmark update <key> <pos> <dur>`.")
    }
}

pub(crate) fn run_tui<S: SlotStorage>(
    store: &ProgressStore<S>,
    provider: Option<&dyn MetadataProvider>,
    metadata_error: Option<&str>,
) -> Result<()> {
    let guard = ScreenGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut view = ListView::History;
    let mut items = Vec::new();
    let mut table_state = TableState::default();
    refresh_items(store, view, &mut items, &mut table_state, None);
    let mut action = TuiAction::Resume;
    let mut pending_unwatch = None::<PendingUnwatch>;
    let mut pending_notice = None::<PendingNotice>;
    let mut status = initial_status(!items.is_empty(), metadata_error);

    loop {
        terminal.draw(|frame| {
            draw_tui(
                frame,
                &items,
                &mut table_state,
                view,
                action,
                &status,
                pending_unwatch.as_ref(),
                pending_notice.as_ref(),
                store.config().watched_threshold,
            )
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if pending_notice.is_some() {
            pending_notice = None;
            continue;
        }

        if let Some(dialog) = pending_unwatch.as_ref() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let content_key = dialog.content_key.clone();
                    pending_unwatch = None;
                    store.mark_unwatched(&content_key);
                    status = status_info(&format!(
                        "Marked unwatched: {}",
                        describe_content_key(&content_key)
                    ));
                    refresh_items(store, view, &mut items, &mut table_state, None);
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_unwatch = None;
                    status = status_info("Unwatch canceled.");
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Char('c') => {
                view = view.toggle();
                refresh_items(store, view, &mut items, &mut table_state, None);
                status = status_info(&format!("Showing {}.", view.title().to_lowercase()));
            }
            KeyCode::Char('r') => {
                let selected = table_state
                    .selected()
                    .and_then(|idx| items.get(idx))
                    .map(|item| item.content_key.clone());
                refresh_items(store, view, &mut items, &mut table_state, selected.as_deref());
                status = status_info("Reloaded.");
            }
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected()
                    && !items.is_empty()
                {
                    let next = (selected + 1).min(items.len().saturating_sub(1));
                    table_state.select(Some(next));
                }
            }
            KeyCode::Left => action = action.move_left(),
            KeyCode::Right => action = action.move_right(),
            KeyCode::Char('d') => {
                let Some(item) = table_state.selected().and_then(|idx| items.get(idx)) else {
                    status = status_error("Unwatch failed: no entry selected.");
                    continue;
                };
                pending_unwatch = Some(PendingUnwatch {
                    content_key: item.content_key.clone(),
                });
                status = status_info("Confirm unwatch: y/Enter to remove, n/Esc to cancel.");
            }
            KeyCode::Enter => {
                let Some(item) = table_state.selected().and_then(|idx| items.get(idx)) else {
                    continue;
                };
                match run_selected_action(store, provider, item, action) {
                    Ok(ActionOutcome::Status(message)) => status = status_info(&message),
                    Ok(ActionOutcome::Notice { title, message }) => {
                        pending_notice = Some(PendingNotice {
                            title,
                            message: format!(
                                "{message}\n\n{}\n\nPress any key to continue.",
                                truncate(&describe_content_key(&item.content_key), 50)
                            ),
                        });
                        status = status_info(&message);
                    }
                    Err(err) => {
                        status = status_error(&format!(
                            "{} failed for {}: {err:#}",
                            action.label(),
                            describe_content_key(&item.content_key)
                        ))
                    }
                }
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    guard.restore()
}
