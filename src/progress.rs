use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::episode_key::{is_episode_key, parse_episode_key};
use crate::storage::{PROGRESS_SLOT, SlotStorage, WATCHED_SLOT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgressRecord {
    pub content_key: String,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub percent_complete: u8,
    pub completed: bool,
    pub last_watched_at: String,
}

impl WatchProgressRecord {
    pub fn last_watched(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_watched_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

pub fn percent_complete(position_seconds: f64, duration_seconds: f64) -> u8 {
    let position = sanitize_seconds(position_seconds);
    let duration = sanitize_seconds(duration_seconds);
    if duration <= 0.0 {
        return 0;
    }
    (position / duration * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sanitize_seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub struct ProgressStore<S> {
    storage: S,
    config: TrackerConfig,
}

impl<S: SlotStorage> ProgressStore<S> {
    pub fn new(storage: S, config: TrackerConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn all(&self) -> Vec<WatchProgressRecord> {
        let mut records = self.read_records();
        sort_most_recent_first(&mut records);
        records
    }

    pub fn get(&self, content_key: &str) -> Option<WatchProgressRecord> {
        self.read_records()
            .into_iter()
            .find(|record| record.content_key == content_key)
    }

    pub fn update(&self, content_key: &str, position_seconds: f64, duration_seconds: f64) {
        self.update_at(content_key, position_seconds, duration_seconds, Utc::now());
    }

    pub(crate) fn update_at(
        &self,
        content_key: &str,
        position_seconds: f64,
        duration_seconds: f64,
        now: DateTime<Utc>,
    ) {
        let percent = percent_complete(position_seconds, duration_seconds);
        let completed = percent > self.config.watched_threshold;
        let record = WatchProgressRecord {
            content_key: content_key.to_string(),
            position_seconds: sanitize_seconds(position_seconds),
            duration_seconds: sanitize_seconds(duration_seconds),
            percent_complete: percent,
            completed,
            last_watched_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let mut records = self.read_records();
        records.retain(|existing| existing.content_key != content_key);
        // Newest goes first so ties on the timestamp still favour the latest write.
        records.insert(0, record);
        sort_most_recent_first(&mut records);
        records.truncate(self.config.history_cap);
        // The watched set only follows a history write that actually landed.
        if !self.write_json(PROGRESS_SLOT, &records) {
            return;
        }

        tracing::debug!(key = %content_key, percent, completed, "recorded playback progress");

        if completed && is_episode_key(content_key) {
            let mut watched = self.read_watched();
            if watched.insert(content_key.to_string()) {
                self.write_json(WATCHED_SLOT, &watched);
            }
        }
    }

    pub fn mark_unwatched(&self, episode_key: &str) {
        let mut records = self.read_records();
        let before = records.len();
        records.retain(|record| record.content_key != episode_key);
        if records.len() != before && !self.write_json(PROGRESS_SLOT, &records) {
            return;
        }

        let mut watched = self.read_watched();
        if watched.remove(episode_key) {
            self.write_json(WATCHED_SLOT, &watched);
        }
    }

    pub fn is_watched(&self, episode_key: &str) -> bool {
        self.read_watched().contains(episode_key)
    }

    pub fn watched_for_show(&self, show_id: &str) -> BTreeSet<String> {
        self.read_watched()
            .into_iter()
            .filter(|key| {
                parse_episode_key(key)
                    .map(|parsed| parsed.show_id == show_id)
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn show_completion_percent(&self, show_id: &str, total_episode_count: u32) -> u8 {
        if total_episode_count == 0 {
            return 0;
        }
        let watched = self.watched_for_show(show_id).len() as f64;
        (watched / f64::from(total_episode_count) * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8
    }

    pub fn continue_watching(&self) -> Vec<WatchProgressRecord> {
        self.all()
            .into_iter()
            .filter(|record| !record.completed && record.position_seconds > 0.0)
            .take(self.config.continue_watching_limit)
            .collect()
    }

    fn read_records(&self) -> Vec<WatchProgressRecord> {
        self.read_json(PROGRESS_SLOT).unwrap_or_default()
    }

    fn read_watched(&self) -> BTreeSet<String> {
        self.read_json::<Vec<String>>(WATCHED_SLOT)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, slot: &str) -> Option<T> {
        let raw = match self.storage.read_slot(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(slot, error = %err, "storage read failed, treating slot as empty");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(slot, error = %err, "corrupt storage slot, treating as empty");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, slot: &str, value: &T) -> bool {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(slot, error = %err, "failed to serialize storage slot");
                return false;
            }
        };
        match self.storage.write_slot(slot, &payload) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(slot, error = %err, "storage write failed, update discarded");
                false
            }
        }
    }
}

fn sort_most_recent_first(records: &mut [WatchProgressRecord]) {
    // Stable, so equal timestamps keep their relative order. Unparseable stamps sink.
    records.sort_by(|left, right| right.last_watched().cmp(&left.last_watched()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::episode_key::episode_key;
    use crate::storage::MemorySlots;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn store(slots: &MemorySlots) -> ProgressStore<&MemorySlots> {
        ProgressStore::new(slots, TrackerConfig::default())
    }

    #[test]
    fn percent_complete_rounds_and_clamps() {
        assert_eq!(percent_complete(95.0, 100.0), 95);
        assert_eq!(percent_complete(1.0, 3.0), 33);
        assert_eq!(percent_complete(2.0, 3.0), 67);
        assert_eq!(percent_complete(150.0, 100.0), 100);
        assert_eq!(percent_complete(30.0, 0.0), 0);
        assert_eq!(percent_complete(-5.0, 100.0), 0);
        assert_eq!(percent_complete(f64::NAN, 100.0), 0);
    }

    #[test]
    fn completion_threshold_marks_episode_watched() {
        let slots = MemorySlots::new();
        let store = store(&slots);

        store.update("episode-show1-1-1", 95.0, 100.0);
        let done = store.get("episode-show1-1-1").expect("record should exist");
        assert!(done.completed);
        assert_eq!(done.percent_complete, 95);
        assert!(store.is_watched("episode-show1-1-1"));

        store.update("episode-show1-1-2", 50.0, 100.0);
        let half = store.get("episode-show1-1-2").expect("record should exist");
        assert!(!half.completed);
        assert!(!store.is_watched("episode-show1-1-2"));
    }

    #[test]
    fn exactly_ninety_percent_is_not_completed() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update("episode-show1-1-3", 90.0, 100.0);
        let record = store.get("episode-show1-1-3").expect("record should exist");
        assert!(!record.completed);
        assert!(!store.is_watched("episode-show1-1-3"));
    }

    #[test]
    fn completed_movies_are_not_added_to_watched_episodes() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update("movie-550", 139.0 * 60.0, 139.0 * 60.0);
        assert!(store.get("movie-550").expect("record").completed);
        assert!(!store.is_watched("movie-550"));
        assert_eq!(slots.raw(WATCHED_SLOT), None);
    }

    #[test]
    fn repeated_updates_keep_a_single_record() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        let t0 = base_time();

        store.update_at("movie-1", 10.0, 100.0, t0);
        store.update_at("movie-2", 10.0, 100.0, t0 + Duration::seconds(1));
        store.update_at("movie-1", 40.0, 100.0, t0 + Duration::seconds(2));

        let all = store.all();
        assert_eq!(all.len(), 2);
        let matching = all
            .iter()
            .filter(|record| record.content_key == "movie-1")
            .collect::<Vec<_>>();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].position_seconds, 40.0);
        assert_eq!(all[0].content_key, "movie-1");
    }

    #[test]
    fn history_is_capped_and_sorted_newest_first() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        let t0 = base_time();

        for idx in 0..130 {
            store.update_at(
                &format!("movie-{idx}"),
                5.0,
                100.0,
                t0 + Duration::seconds(idx),
            );
        }

        let all = store.all();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].content_key, "movie-129");
        assert_eq!(all[99].content_key, "movie-30");
        assert!(
            all.windows(2)
                .all(|pair| pair[0].last_watched() >= pair[1].last_watched())
        );
        assert!(store.get("movie-29").is_none());
    }

    #[test]
    fn same_timestamp_updates_put_latest_write_first() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        let t0 = base_time();
        store.update_at("movie-a", 5.0, 100.0, t0);
        store.update_at("movie-b", 5.0, 100.0, t0);
        assert_eq!(store.all()[0].content_key, "movie-b");
    }

    #[test]
    fn mark_unwatched_is_idempotent() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        let key = episode_key("show1", 1, 1);
        store.update(&key, 99.0, 100.0);
        assert!(store.is_watched(&key));

        store.mark_unwatched(&key);
        let once_progress = slots.raw(PROGRESS_SLOT);
        let once_watched = slots.raw(WATCHED_SLOT);
        store.mark_unwatched(&key);

        assert_eq!(slots.raw(PROGRESS_SLOT), once_progress);
        assert_eq!(slots.raw(WATCHED_SLOT), once_watched);
        assert!(!store.is_watched(&key));
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn mark_unwatched_on_unknown_key_is_a_no_op() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.mark_unwatched("episode-nothing-1-1");
        assert_eq!(slots.raw(PROGRESS_SLOT), None);
        assert_eq!(slots.raw(WATCHED_SLOT), None);
    }

    #[test]
    fn corrupt_slots_read_as_empty() {
        let slots = MemorySlots::new()
            .with_slot(PROGRESS_SLOT, "{not valid")
            .with_slot(WATCHED_SLOT, "[1, 2");
        let store = store(&slots);

        assert!(store.all().is_empty());
        assert!(store.get("anything").is_none());
        assert!(!store.is_watched("episode-a-1-1"));

        store.update("episode-a-1-1", 100.0, 100.0);
        assert_eq!(store.all().len(), 1);
        assert!(store.is_watched("episode-a-1-1"));
    }

    #[test]
    fn failed_writes_are_swallowed() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update("movie-1", 10.0, 100.0);

        slots.set_fail_writes(true);
        store.update("movie-2", 10.0, 100.0);
        store.mark_unwatched("movie-1");

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content_key, "movie-1");
    }

    #[test]
    fn lost_history_write_keeps_episode_out_of_watched_set() {
        let slots = MemorySlots::new();
        slots.set_failing_slot(Some(PROGRESS_SLOT));
        let store = store(&slots);

        store.update("episode-show1-1-1", 95.0, 100.0);

        assert!(store.get("episode-show1-1-1").is_none());
        assert!(!store.is_watched("episode-show1-1-1"));
        assert_eq!(slots.raw(WATCHED_SLOT), None);
    }

    #[test]
    fn unwatch_keeps_watched_set_when_history_removal_fails() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update("episode-show1-1-1", 95.0, 100.0);

        slots.set_failing_slot(Some(PROGRESS_SLOT));
        store.mark_unwatched("episode-show1-1-1");
        assert!(store.get("episode-show1-1-1").is_some());
        assert!(store.is_watched("episode-show1-1-1"));

        slots.set_failing_slot(None);
        store.mark_unwatched("episode-show1-1-1");
        assert!(store.get("episode-show1-1-1").is_none());
        assert!(!store.is_watched("episode-show1-1-1"));
    }

    #[test]
    fn watched_for_show_matches_exact_show_ids_only() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        for key in [
            episode_key("tv-1", 1, 1),
            episode_key("tv-1", 1, 2),
            episode_key("tv-12", 1, 1),
            episode_key("1", 1, 1),
        ] {
            store.update(&key, 100.0, 100.0);
        }

        let watched = store.watched_for_show("tv-1");
        assert_eq!(
            watched.into_iter().collect::<Vec<_>>(),
            vec!["episode-tv-1-1-1".to_string(), "episode-tv-1-1-2".to_string()]
        );
        assert_eq!(store.watched_for_show("1").len(), 1);
        assert!(store.watched_for_show("tv").is_empty());
    }

    #[test]
    fn show_completion_percent_rounds_watched_share() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update(&episode_key("show1", 1, 1), 100.0, 100.0);
        store.update(&episode_key("show1", 1, 2), 100.0, 100.0);

        assert_eq!(store.show_completion_percent("show1", 3), 67);
        assert_eq!(store.show_completion_percent("show1", 2), 100);
        assert_eq!(store.show_completion_percent("show1", 1), 100);
        assert_eq!(store.show_completion_percent("show1", 0), 0);
        assert_eq!(store.show_completion_percent("other", 10), 0);
    }

    #[test]
    fn continue_watching_skips_finished_and_unstarted_records() {
        let slots = MemorySlots::new();
        let config = TrackerConfig {
            continue_watching_limit: 2,
            ..TrackerConfig::default()
        };
        let store = ProgressStore::new(&slots, config);
        let t0 = base_time();

        store.update_at("movie-done", 100.0, 100.0, t0);
        store.update_at("movie-zero", 0.0, 100.0, t0 + Duration::seconds(1));
        store.update_at("movie-a", 20.0, 100.0, t0 + Duration::seconds(2));
        store.update_at("movie-b", 30.0, 100.0, t0 + Duration::seconds(3));
        store.update_at("movie-c", 40.0, 100.0, t0 + Duration::seconds(4));

        let keys = store
            .continue_watching()
            .into_iter()
            .map(|record| record.content_key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["movie-c".to_string(), "movie-b".to_string()]);
    }

    #[test]
    fn records_serialize_with_camel_case_fields() {
        let slots = MemorySlots::new();
        let store = store(&slots);
        store.update_at("movie-7", 12.5, 50.0, base_time());

        let raw = slots.raw(PROGRESS_SLOT).expect("progress slot written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        let first = &value[0];
        assert_eq!(first["contentKey"], "movie-7");
        assert_eq!(first["positionSeconds"], 12.5);
        assert_eq!(first["percentComplete"], 25);
        assert_eq!(first["completed"], false);
        assert_eq!(first["lastWatchedAt"], "2026-03-01T20:00:00.000Z");
    }
}
