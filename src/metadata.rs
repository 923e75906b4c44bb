use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::episode_key::SeasonInfo;
use crate::error::MetadataError;
use crate::http::{RetryPolicy, get_text_with_retries};

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

pub trait MetadataProvider {
    fn season_episode_count(&self, show_id: &str, season: u32) -> Result<u32, MetadataError>;
    fn season_list(&self, show_id: &str) -> Result<Vec<SeasonInfo>, MetadataError>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    shows: HashMap<String, Vec<SeasonInfo>>,
}

impl StaticCatalog {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_show(mut self, show_id: &str, seasons: Vec<SeasonInfo>) -> Self {
        self.shows.insert(show_id.to_string(), seasons);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let shows: HashMap<String, Vec<SeasonInfo>> =
            serde_json::from_str(raw).context("catalog must map show ids to season lists")?;
        Ok(Self { shows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid catalog {}", path.display()))
    }
}

impl MetadataProvider for StaticCatalog {
    fn season_episode_count(&self, show_id: &str, season: u32) -> Result<u32, MetadataError> {
        self.season_list(show_id)?
            .into_iter()
            .find(|info| info.season_number == season)
            .map(|info| info.episode_count)
            .ok_or_else(|| MetadataError::UnknownSeason {
                show_id: show_id.to_string(),
                season,
            })
    }

    fn season_list(&self, show_id: &str) -> Result<Vec<SeasonInfo>, MetadataError> {
        self.shows
            .get(show_id)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownShow(show_id.to_string()))
    }
}

pub struct TmdbProvider {
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
}

impl TmdbProvider {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(TMDB_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.trim().to_string(),
            policy: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn get_json(&self, path: &str) -> Result<Value, MetadataError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(path, "fetching tmdb metadata");
        let raw = get_text_with_retries(&url, &[("api_key", self.api_key.clone())], &self.policy)?;
        serde_json::from_str(&raw).map_err(|err| MetadataError::Payload(err.to_string()))
    }
}

impl MetadataProvider for TmdbProvider {
    fn season_episode_count(&self, show_id: &str, season: u32) -> Result<u32, MetadataError> {
        let tv_id = tmdb_tv_id(show_id)?;
        let value = self.get_json(&format!("/tv/{tv_id}/season/{season}"))?;
        let episodes = value
            .get("episodes")
            .and_then(Value::as_array)
            .ok_or_else(|| MetadataError::Payload("season has no episode list".to_string()))?;
        Ok(episodes.len() as u32)
    }

    fn season_list(&self, show_id: &str) -> Result<Vec<SeasonInfo>, MetadataError> {
        let tv_id = tmdb_tv_id(show_id)?;
        let value = self.get_json(&format!("/tv/{tv_id}"))?;
        parse_tmdb_seasons(&value)
    }
}

pub(crate) fn tmdb_tv_id(show_id: &str) -> Result<u64, MetadataError> {
    show_id
        .rsplit('-')
        .next()
        .filter(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|tail| tail.parse::<u64>().ok())
        .ok_or_else(|| MetadataError::UnsupportedShowId(show_id.to_string()))
}

pub(crate) fn parse_tmdb_seasons(value: &Value) -> Result<Vec<SeasonInfo>, MetadataError> {
    let seasons = value
        .get("seasons")
        .and_then(Value::as_array)
        .ok_or_else(|| MetadataError::Payload("show has no season list".to_string()))?;

    Ok(seasons
        .iter()
        .filter_map(|season| {
            let season_number = season.get("season_number")?.as_u64()?;
            let episode_count = season
                .get("episode_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Some(SeasonInfo {
                season_number: u32::try_from(season_number).ok()?,
                episode_count: u32::try_from(episode_count).unwrap_or(u32::MAX),
            })
        })
        .collect())
}
