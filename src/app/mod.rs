mod format;
mod tui;


use std::env;

use anyhow::{Context, Result, anyhow};

use crate::cli::{Cli, Command};
use crate::config::TrackerConfig;
use crate::episode_key::{default_season, traversal_seasons};
use crate::metadata::{MetadataProvider, StaticCatalog, TmdbProvider};
use crate::navigation::{resolve_next, resolve_previous};
use crate::paths::database_file_path;
use crate::progress::{ProgressStore, WatchProgressRecord};
use crate::storage::{SlotStorage, SqliteSlots};

use self::format::{
    describe_content_key, format_clock, format_last_watched_display, format_resume_text, truncate,
};

pub fn run(cli: Cli) -> Result<()> {
    run_with_store(cli, open_store)
}

pub(crate) fn run_with_store<S, F>(cli: Cli, open_store: F) -> Result<()>
where
    S: SlotStorage,
    F: Fn() -> Result<ProgressStore<S>>,
{
    let catalog = cli.catalog.clone();
    let provider = || metadata_provider(catalog.as_deref());

    match cli.command {
        Some(Command::Update {
            key,
            position,
            duration,
        }) => println!("{}", run_update(&open_store()?, &key, position, duration)),
        Some(Command::List) => println!(
            "{}",
            render_records(&open_store()?.all(), "No progress recorded yet.")
        ),
        Some(Command::Show { key }) => println!("{}", run_show(&open_store()?, &key)),
        Some(Command::Continue) => println!(
            "{}",
            render_records(&open_store()?.continue_watching(), "Nothing to continue.")
        ),
        Some(Command::Unwatch { key }) => println!("{}", run_unwatch(&open_store()?, &key)),
        Some(Command::Watched { show_id, total }) => {
            println!("{}", run_watched(&open_store()?, &show_id, total))
        }
        Some(Command::Next { key }) => println!("{}", run_next(provider()?.as_ref(), &key)?),
        Some(Command::Previous { key }) => {
            println!("{}", run_previous(provider()?.as_ref(), &key)?)
        }
        Some(Command::Seasons { show_id }) => {
            println!("{}", run_seasons(provider()?.as_ref(), &show_id)?)
        }
        Some(Command::Tui) | None => {
            let store = open_store()?;
            let (provider, metadata_error) = match provider() {
                Ok(provider) => (Some(provider), None),
                Err(err) if catalog.is_some() => {
                    let message = format!("{err:#}");
                    tracing::warn!(error = %message, "failed to load metadata catalog");
                    (None, Some(message))
                }
                Err(err) => {
                    tracing::debug!(error = %err, "no metadata source configured");
                    (None, None)
                }
            };
            tui::run_tui(&store, provider.as_deref(), metadata_error.as_deref())?
        }
    }

    Ok(())
}

fn open_store() -> Result<ProgressStore<SqliteSlots>> {
    let db_path = database_file_path()?;
    let slots = SqliteSlots::open(&db_path)?;
    slots
        .migrate()
        .with_context(|| format!("failed to prepare database at {}", db_path.display()))?;
    Ok(ProgressStore::new(slots, TrackerConfig::from_env()))
}

fn metadata_provider(catalog: Option<&std::path::Path>) -> Result<Box<dyn MetadataProvider>> {
    if let Some(path) = catalog {
        return Ok(Box::new(StaticCatalog::load(path)?));
    }
    let api_key = env::var("TMDB_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("no metadata source: pass --catalog <file> or set TMDB_API_KEY"))?;
    let base_url = env::var("TMDB_BASE_URL").ok();
    Ok(Box::new(TmdbProvider::new(&api_key, base_url.as_deref())))
}

pub(crate) fn run_update<S: SlotStorage>(
    store: &ProgressStore<S>,
    key: &str,
    position: f64,
    duration: f64,
) -> String {
    store.update(key, position, duration);
    match store.get(key) {
        Some(record) if record.completed => {
            format!("{}: finished ({}%)", describe_content_key(key), record.percent_complete)
        }
        Some(record) => format!(
            "{}: {}% ({})",
            describe_content_key(key),
            record.percent_complete,
            format_resume_text(&record)
        ),
        None => format!("{}: progress could not be saved", describe_content_key(key)),
    }
}

pub(crate) fn run_show<S: SlotStorage>(store: &ProgressStore<S>, key: &str) -> String {
    match store.get(key) {
        Some(record) => format!(
            "Title: {}\nKey: {}\nProgress: {}% ({})\nLast watched: {}",
            describe_content_key(&record.content_key),
            record.content_key,
            record.percent_complete,
            format_resume_text(&record),
            format_last_watched_display(&record.last_watched_at)
        ),
        None => format!("No progress recorded for {key}."),
    }
}

pub(crate) fn run_unwatch<S: SlotStorage>(store: &ProgressStore<S>, key: &str) -> String {
    let was_tracked = store.is_watched(key) || store.get(key).is_some();
    store.mark_unwatched(key);
    if was_tracked {
        format!("Marked unwatched: {}", describe_content_key(key))
    } else {
        format!("Nothing tracked for {key}.")
    }
}

pub(crate) fn run_watched<S: SlotStorage>(
    store: &ProgressStore<S>,
    show_id: &str,
    total: Option<u32>,
) -> String {
    let watched = store.watched_for_show(show_id);
    let mut out = if watched.is_empty() {
        format!("No watched episodes for {show_id}.")
    } else {
        let lines = watched
            .iter()
            .map(|key| format!("  {}", describe_content_key(key)))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Watched episodes for {show_id}:\n{lines}")
    };
    if let Some(total) = total {
        out.push_str(&format!(
            "\nCompletion: {}% ({} of {total})",
            store.show_completion_percent(show_id, total),
            watched.len()
        ));
    }
    out
}

pub(crate) fn run_next(provider: &dyn MetadataProvider, key: &str) -> Result<String> {
    let next = resolve_next(provider, key)
        .with_context(|| format!("cannot resolve the episode after '{key}'"))?;
    Ok(match next {
        Some(next) => next.to_string(),
        None => "No next episode available.".to_string(),
    })
}

pub(crate) fn run_previous(provider: &dyn MetadataProvider, key: &str) -> Result<String> {
    let previous = resolve_previous(provider, key)
        .with_context(|| format!("cannot resolve the episode before '{key}'"))?;
    Ok(match previous {
        Some(previous) => previous.to_string(),
        None => "No previous episode available.".to_string(),
    })
}

pub(crate) fn run_seasons(provider: &dyn MetadataProvider, show_id: &str) -> Result<String> {
    let seasons = provider
        .season_list(show_id)
        .with_context(|| format!("cannot load seasons for '{show_id}'"))?;
    if seasons.is_empty() {
        return Ok(format!("No seasons listed for {show_id}."));
    }

    let default = default_season(&seasons).map(|season| season.season_number);
    let in_order = traversal_seasons(&seasons);
    let mut out = format!("{:<8} {:<10} {:<8}", "SEASON", "EPISODES", "");
    for season in &seasons {
        let mut notes = Vec::new();
        if Some(season.season_number) == default {
            notes.push("default");
        }
        if !in_order.contains(season) {
            notes.push("special");
        }
        out.push_str(&format!(
            "\n{:<8} {:<10} {}",
            season.season_number,
            season.episode_count,
            notes.join(", ")
        ));
    }
    Ok(out)
}

pub(crate) fn render_records(records: &[WatchProgressRecord], empty_message: &str) -> String {
    if records.is_empty() {
        return empty_message.to_string();
    }

    let mut out = format!(
        "{:<32} {:<24} {:<10} {:<6} {:<18}",
        "KEY", "TITLE", "POSITION", "PCT", "LAST WATCHED"
    );
    for record in records {
        let pct = if record.completed {
            "done".to_string()
        } else {
            format!("{}%", record.percent_complete)
        };
        out.push_str(&format!(
            "\n{:<32} {:<24} {:<10} {:<6} {:<18}",
            truncate(&record.content_key, 32),
            truncate(&describe_content_key(&record.content_key), 24),
            format_clock(record.position_seconds),
            pct,
            format_last_watched_display(&record.last_watched_at)
        ));
    }
    out
}
