use anyhow::{Result, anyhow};
use ratatui::widgets::TableState;

use crate::metadata::MetadataProvider;
use crate::navigation::{resolve_next, resolve_previous};
use crate::progress::{ProgressStore, WatchProgressRecord};
use crate::storage::SlotStorage;

use super::super::format::{describe_content_key, format_resume_text};
use super::{ListView, TuiAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActionOutcome {
    Status(String),
    Notice {
        title: &'static str,
        message: String,
    },
}

pub(crate) fn refresh_items<S: SlotStorage>(
    store: &ProgressStore<S>,
    view: ListView,
    items: &mut Vec<WatchProgressRecord>,
    table_state: &mut TableState,
    preferred_key: Option<&str>,
) {
    *items = match view {
        ListView::History => store.all(),
        ListView::ContinueWatching => store.continue_watching(),
    };
    if items.is_empty() {
        table_state.select(None);
        return;
    }

    if let Some(key) = preferred_key
        && let Some(idx) = items.iter().position(|item| item.content_key == key)
    {
        table_state.select(Some(idx));
        return;
    }

    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(crate) fn run_selected_action<S: SlotStorage>(
    store: &ProgressStore<S>,
    provider: Option<&dyn MetadataProvider>,
    item: &WatchProgressRecord,
    action: TuiAction,
) -> Result<ActionOutcome> {
    match action {
        TuiAction::Resume => {
            let record = store.get(&item.content_key).unwrap_or_else(|| item.clone());
            Ok(ActionOutcome::Status(format!(
                "{}: {}",
                describe_content_key(&record.content_key),
                format_resume_text(&record)
            )))
        }
        TuiAction::Next => {
            let provider = provider.ok_or_else(no_metadata_source)?;
            Ok(match resolve_next(provider, &item.content_key)? {
                Some(next) => ActionOutcome::Status(format!(
                    "Next up: {} ({})",
                    describe_content_key(&next.to_string()),
                    watched_suffix(store, &next.to_string())
                )),
                None => ActionOutcome::Notice {
                    title: "No More Episodes",
                    message: "No next episode available.".to_string(),
                },
            })
        }
        TuiAction::Previous => {
            let provider = provider.ok_or_else(no_metadata_source)?;
            Ok(match resolve_previous(provider, &item.content_key)? {
                Some(previous) => ActionOutcome::Status(format!(
                    "Previous: {} ({})",
                    describe_content_key(&previous.to_string()),
                    watched_suffix(store, &previous.to_string())
                )),
                None => ActionOutcome::Notice {
                    title: "No Earlier Episodes",
                    message: "No previous episode available.".to_string(),
                },
            })
        }
    }
}

fn watched_suffix<S: SlotStorage>(store: &ProgressStore<S>, key: &str) -> String {
    if store.is_watched(key) {
        return "watched".to_string();
    }
    match store.get(key) {
        Some(record) => format_resume_text(&record),
        None => "not started".to_string(),
    }
}

fn no_metadata_source() -> anyhow::Error {
    anyhow!("no metadata source: start with --catalog <file> or set TMDB_API_KEY")
}
