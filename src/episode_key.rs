use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const EPISODE_TAG: &str = "episode";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub show_id: String,
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn new(show_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            show_id: show_id.into(),
            season,
            episode,
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{EPISODE_TAG}-{}-{}-{}",
            self.show_id, self.season, self.episode
        )
    }
}

impl FromStr for EpisodeKey {
    type Err = ParseError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        parse_episode_key(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInfo {
    pub season_number: u32,
    pub episode_count: u32,
}

pub fn episode_key(show_id: &str, season: u32, episode: u32) -> String {
    EpisodeKey::new(show_id, season, episode).to_string()
}

pub fn parse_episode_key(key: &str) -> Result<EpisodeKey, ParseError> {
    let tokens = key.split('-').collect::<Vec<_>>();
    if tokens.first() != Some(&EPISODE_TAG) || tokens.len() < 4 {
        return Err(ParseError::InvalidFormat(key.to_string()));
    }

    // Show ids may contain hyphens; season and episode are always the last two tokens.
    let last = tokens.len() - 1;
    let show_id = tokens[1..last - 1].join("-");
    if show_id.is_empty() {
        return Err(ParseError::InvalidFormat(key.to_string()));
    }

    let season = parse_number(tokens[last - 1], key)?;
    let episode = parse_number(tokens[last], key)?;
    Ok(EpisodeKey {
        show_id,
        season,
        episode,
    })
}

pub fn is_episode_key(key: &str) -> bool {
    parse_episode_key(key).is_ok()
}

fn parse_number(token: &str, key: &str) -> Result<u32, ParseError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidNumeric(key.to_string()));
    }
    token
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidNumeric(key.to_string()))
}

pub fn next_episode(
    show_id: &str,
    season: u32,
    episode: u32,
    season_episode_count: u32,
    next_season: Option<u32>,
) -> Option<EpisodeKey> {
    if episode < season_episode_count {
        return Some(EpisodeKey::new(show_id, season, episode + 1));
    }
    next_season.map(|number| EpisodeKey::new(show_id, number, 1))
}

pub fn previous_episode(
    show_id: &str,
    season: u32,
    episode: u32,
    previous_season: Option<SeasonInfo>,
) -> Option<EpisodeKey> {
    if episode > 1 {
        return Some(EpisodeKey::new(show_id, season, episode - 1));
    }
    previous_season
        .filter(|prev| prev.episode_count > 0)
        .map(|prev| EpisodeKey::new(show_id, prev.season_number, prev.episode_count))
}

pub fn default_season(seasons: &[SeasonInfo]) -> Option<SeasonInfo> {
    seasons
        .iter()
        .find(|season| season.season_number > 0)
        .or_else(|| seasons.first())
        .copied()
}

pub fn traversal_seasons(seasons: &[SeasonInfo]) -> Vec<SeasonInfo> {
    let mut ordered = seasons
        .iter()
        .filter(|season| season.season_number > 0)
        .copied()
        .collect::<Vec<_>>();
    if ordered.is_empty() {
        ordered = seasons.to_vec();
    }
    ordered.sort_by_key(|season| season.season_number);
    ordered.dedup_by_key(|season| season.season_number);
    ordered
}

pub fn season_after(seasons: &[SeasonInfo], current: u32) -> Option<SeasonInfo> {
    traversal_seasons(seasons)
        .into_iter()
        .find(|season| season.season_number > current)
}

pub fn season_before(seasons: &[SeasonInfo], current: u32) -> Option<SeasonInfo> {
    traversal_seasons(seasons)
        .into_iter()
        .rev()
        .find(|season| season.season_number < current)
}
