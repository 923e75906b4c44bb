use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid episode key format: {0}")]
    InvalidFormat(String),

    #[error("invalid season or episode number in key: {0}")]
    InvalidNumeric(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open storage: {0}")]
    Open(String),

    #[error("failed to read slot {slot}: {reason}")]
    Read { slot: String, reason: String },

    #[error("failed to write slot {slot}: {reason}")]
    Write { slot: String, reason: String },
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("unknown show: {0}")]
    UnknownShow(String),

    #[error("unknown season {season} for show {show_id}")]
    UnknownSeason { show_id: String, season: u32 },

    #[error("show id {0} has no numeric provider id")]
    UnsupportedShowId(String),

    #[error("metadata request failed: {0}")]
    Http(#[from] crate::http::HttpError),

    #[error("malformed metadata payload: {0}")]
    Payload(String),
}
