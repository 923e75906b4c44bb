use chrono::{DateTime, Local};

use crate::episode_key::parse_episode_key;
use crate::progress::WatchProgressRecord;

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

pub(crate) fn format_last_watched_display(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub(crate) fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub(crate) fn describe_content_key(key: &str) -> String {
    match parse_episode_key(key) {
        Ok(parsed) => format!(
            "{} S{:02}E{:02}",
            parsed.show_id, parsed.season, parsed.episode
        ),
        Err(_) => key.to_string(),
    }
}

pub(crate) fn format_resume_text(record: &WatchProgressRecord) -> String {
    if record.completed {
        return "finished".to_string();
    }
    if record.duration_seconds > 0.0 {
        format!(
            "resume at {} of {}",
            format_clock(record.position_seconds),
            format_clock(record.duration_seconds)
        )
    } else {
        format!("resume at {}", format_clock(record.position_seconds))
    }
}

pub(crate) fn build_progress_gauge(record: &WatchProgressRecord) -> (f64, String) {
    let ratio = (f64::from(record.percent_complete) / 100.0).clamp(0.0, 1.0);
    (ratio, format!("{}%", record.percent_complete))
}
