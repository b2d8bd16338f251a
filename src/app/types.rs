// src/app/types.rs
use crate::app::data::{FavoriteRow, Show, ShowDetail, User};
use crate::error::{AuthError, FetchError, StoreError};

// ---- cross-thread messages ----
pub enum FavoritesMsg {
    Loaded {
        user_id: String,
        generation: u64,
        result: Result<Vec<FavoriteRow>, StoreError>,
    },
    Toggled {
        row: FavoriteRow,
        action: ToggleAction,
        result: Result<(), StoreError>,
    },
}

pub enum CatalogMsg {
    Shows(Result<Vec<Show>, FetchError>),
    Detail {
        id: String,
        result: Result<ShowDetail, FetchError>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOp {
    Login,
    SignUp,
    Logout,
}

pub enum AuthMsg {
    /// Session query; `seq` is the notification count when it was issued.
    Session {
        seq: u64,
        result: Result<Option<User>, AuthError>,
    },
    Done {
        op: AuthOp,
        result: Result<(), AuthError>,
    },
}

// ---- state ----
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleAction {
    Added,
    Removed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Result of a load that settled (success or failure).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}
