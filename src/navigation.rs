use thiserror::Error;

use crate::episode_key::{
    EpisodeKey, next_episode, parse_episode_key, previous_episode, season_after, season_before,
};
use crate::error::{MetadataError, ParseError};
use crate::metadata::MetadataProvider;

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

pub fn resolve_next(
    provider: &dyn MetadataProvider,
    key: &str,
) -> Result<Option<EpisodeKey>, NavigationError> {
    let current = parse_episode_key(key)?;
    let seasons = provider.season_list(&current.show_id)?;
    let count = provider.season_episode_count(&current.show_id, current.season)?;
    let following = season_after(&seasons, current.season).map(|season| season.season_number);

    let next = next_episode(
        &current.show_id,
        current.season,
        current.episode,
        count,
        following,
    );
    tracing::debug!(key, next = ?next.as_ref().map(ToString::to_string), "resolved next episode");
    Ok(next)
}

pub fn resolve_previous(
    provider: &dyn MetadataProvider,
    key: &str,
) -> Result<Option<EpisodeKey>, NavigationError> {
    let current = parse_episode_key(key)?;
    let previous_season = if current.episode > 1 {
        None
    } else {
        let seasons = provider.season_list(&current.show_id)?;
        match season_before(&seasons, current.season) {
            // Season lists can lag behind; ask for the real count of the season we land in.
            Some(mut season) => {
                season.episode_count =
                    provider.season_episode_count(&current.show_id, season.season_number)?;
                Some(season)
            }
            None => None,
        }
    };

    let previous = previous_episode(
        &current.show_id,
        current.season,
        current.episode,
        previous_season,
    );
    tracing::debug!(
        key,
        previous = ?previous.as_ref().map(ToString::to_string),
        "resolved previous episode"
    );
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode_key::SeasonInfo;
    use crate::metadata::StaticCatalog;

    fn season(season_number: u32, episode_count: u32) -> SeasonInfo {
        SeasonInfo {
            season_number,
            episode_count,
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_show("tv-7", vec![season(0, 2), season(1, 3), season(2, 4)])
            .with_show("specials", vec![season(0, 2)])
    }

    #[test]
    fn next_moves_within_and_across_seasons() {
        let catalog = catalog();
        assert_eq!(
            resolve_next(&catalog, "episode-tv-7-1-2").expect("resolve"),
            Some(EpisodeKey::new("tv-7", 1, 3))
        );
        assert_eq!(
            resolve_next(&catalog, "episode-tv-7-1-3").expect("resolve"),
            Some(EpisodeKey::new("tv-7", 2, 1))
        );
        assert_eq!(resolve_next(&catalog, "episode-tv-7-2-4").expect("resolve"), None);
    }

    #[test]
    fn next_from_specials_enters_first_regular_season() {
        let catalog = catalog();
        assert_eq!(
            resolve_next(&catalog, "episode-tv-7-0-2").expect("resolve"),
            Some(EpisodeKey::new("tv-7", 1, 1))
        );
    }

    #[test]
    fn previous_moves_within_and_across_seasons() {
        let catalog = catalog();
        assert_eq!(
            resolve_previous(&catalog, "episode-tv-7-2-3").expect("resolve"),
            Some(EpisodeKey::new("tv-7", 2, 2))
        );
        assert_eq!(
            resolve_previous(&catalog, "episode-tv-7-2-1").expect("resolve"),
            Some(EpisodeKey::new("tv-7", 1, 3))
        );
        assert_eq!(
            resolve_previous(&catalog, "episode-tv-7-1-1").expect("resolve"),
            None
        );
    }

    #[test]
    fn specials_only_show_navigates_inside_season_zero() {
        let catalog = catalog();
        assert_eq!(
            resolve_next(&catalog, "episode-specials-0-1").expect("resolve"),
            Some(EpisodeKey::new("specials", 0, 2))
        );
        assert_eq!(
            resolve_next(&catalog, "episode-specials-0-2").expect("resolve"),
            None
        );
    }

    #[test]
    fn malformed_keys_and_unknown_shows_are_typed_errors() {
        let catalog = catalog();
        assert!(matches!(
            resolve_next(&catalog, "movie-550"),
            Err(NavigationError::Parse(ParseError::InvalidFormat(_)))
        ));
        assert!(matches!(
            resolve_previous(&catalog, "episode-tv-7-x-1"),
            Err(NavigationError::Parse(ParseError::InvalidNumeric(_)))
        ));
        assert!(matches!(
            resolve_next(&catalog, "episode-tv-8-1-1"),
            Err(NavigationError::Metadata(MetadataError::UnknownShow(_)))
        ));
    }
}
