use std::env;
use std::str::FromStr;

pub const DEFAULT_WATCHED_THRESHOLD: u8 = 90;
pub const DEFAULT_HISTORY_CAP: usize = 100;
pub const DEFAULT_CONTINUE_WATCHING_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub watched_threshold: u8,
    pub history_cap: usize,
    pub continue_watching_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            watched_threshold: DEFAULT_WATCHED_THRESHOLD,
            history_cap: DEFAULT_HISTORY_CAP,
            continue_watching_limit: DEFAULT_CONTINUE_WATCHING_LIMIT,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            watched_threshold: read_setting(
                &lookup,
                "WATCHMARK_WATCHED_THRESHOLD",
                defaults.watched_threshold,
            )
            .min(100),
            history_cap: read_setting(&lookup, "WATCHMARK_HISTORY_CAP", defaults.history_cap)
                .max(1),
            continue_watching_limit: read_setting(
                &lookup,
                "WATCHMARK_CONTINUE_LIMIT",
                defaults.continue_watching_limit,
            ),
        }
    }
}

fn read_setting<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(setting = name, value = %raw, "ignoring invalid setting, using default");
            default
        }
    }
}
