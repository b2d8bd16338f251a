// src/error.rs
use thiserror::Error;

/// Catalog reads (show list, show detail).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status}")]
    Status { status: u16 },

    #[error("show {id} not found")]
    NotFound { id: String },

    #[error("invalid show id `{id}`")]
    InvalidId { id: String },

    #[error("malformed catalog payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Show not found".into(),
            Self::InvalidId { .. } => "Invalid Show ID".into(),
            Self::Transport(_) => {
                "Failed to load shows. Please check your connection and try again.".into()
            }
            Self::Status { .. } | Self::Decode(_) => {
                "Failed to load shows. Please try again later.".into()
            }
        }
    }
}

/// Identity provider failures. Expected rejections are values, not panics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credential: {reason}")]
    InvalidCredential { reason: String },

    #[error("identity provider rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("identity provider unreachable: {reason}")]
    Transport { reason: String },
}

impl AuthError {
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidCredential { reason }
            | Self::Rejected { reason }
            | Self::Transport { reason } => reason,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            reason: err.to_string(),
        }
    }
}

/// Row store failures (remote REST or local SQLite).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("row store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("favorite already exists")]
    Duplicate,

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("no authenticated user")]
    Unauthenticated,

    #[error("loading favorites failed: {source}")]
    Fetch {
        #[source]
        source: StoreError,
    },

    #[error("toggling favorite {show_id} failed: {source}")]
    Toggle {
        show_id: String,
        #[source]
        source: StoreError,
    },

    #[error("a toggle for {show_id} is already in flight")]
    TogglePending { show_id: String },
}

impl FavoritesError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "You must be logged in to add favorites.".into(),
            Self::Fetch { .. } => "Error fetching favorites. Please try again later.".into(),
            Self::Toggle { .. } => "Error updating favorites. Please try again later.".into(),
            Self::TogglePending { .. } => "Still saving your last change to this show.".into(),
        }
    }
}

/// Wiring the application context together.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("auth_url is not configured; sign-in and favorites are unavailable")]
    MissingAuthUrl,

    #[error(transparent)]
    Catalog(#[from] FetchError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_reason_is_exposed_for_every_variant() {
        let errs = [
            AuthError::InvalidCredential { reason: "a".into() },
            AuthError::Rejected { reason: "b".into() },
            AuthError::Transport { reason: "c".into() },
        ];
        let reasons: Vec<&str> = errs.iter().map(AuthError::reason).collect();
        assert_eq!(reasons, ["a", "b", "c"]);
    }

    #[test]
    fn favorites_messages_match_user_copy() {
        assert_eq!(
            FavoritesError::Unauthenticated.user_message(),
            "You must be logged in to add favorites."
        );
        let fetch = FavoritesError::Fetch {
            source: StoreError::Duplicate,
        };
        assert_eq!(
            fetch.user_message(),
            "Error fetching favorites. Please try again later."
        );
    }

    #[test]
    fn fetch_not_found_has_short_message() {
        let err = FetchError::NotFound { id: "42".into() };
        assert_eq!(err.user_message(), "Show not found");
        assert_eq!(err.to_string(), "show 42 not found");
    }
}
