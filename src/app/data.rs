// src/app/data.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type GenreId = u32;

static GENRES: Lazy<BTreeMap<GenreId, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (1, "Personal Growth"),
        (2, "True Crime and Investigative Journalism"),
        (3, "History"),
        (4, "Comedy"),
        (5, "Entertainment"),
        (6, "Business"),
        (7, "Fiction"),
        (8, "News"),
        (9, "Kids and Family"),
    ])
});

pub fn genre_name(id: GenreId) -> Option<&'static str> {
    GENRES.get(&id).copied()
}

/// Names for the mapped ids, in input order. Unmapped ids are skipped.
pub fn genre_names(ids: &[GenreId]) -> Vec<&'static str> {
    ids.iter().filter_map(|id| genre_name(*id)).collect()
}

pub fn all_genres() -> impl Iterator<Item = (GenreId, &'static str)> {
    GENRES.iter().map(|(id, name)| (*id, *name))
}

/// Case-insensitive reverse lookup in the genre table.
pub fn genre_id(name: &str) -> Option<GenreId> {
    let name = name.trim();
    all_genres()
        .find(|(_, known)| known.eq_ignore_ascii_case(name))
        .map(|(id, _)| id)
}

/// Genre ids from loosely typed JSON: numbers, numeric strings, or genre
/// names. Anything else is skipped.
pub fn genre_ids_from_values(raw: &[Value]) -> Vec<GenreId> {
    raw.iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|n| GenreId::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok().or_else(|| genre_id(s)),
            _ => None,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Show {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub updated: Option<DateTime<Utc>>,
    pub genres: Vec<GenreId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    pub title: String,
    pub description: String,
    pub episode: u32,
    pub file: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Season {
    pub id: String,
    pub title: String,
    pub episodes: Vec<Episode>,
}

/// `GET /id/{id}`: the show plus its seasons. Detail genres are free-form labels.
#[derive(Clone, Debug, PartialEq)]
pub struct ShowDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub updated: Option<DateTime<Utc>>,
    pub genre_labels: Vec<String>,
    pub seasons: Vec<Season>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One row of the `favorites` relation, display columns denormalised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRow {
    pub user_id: String,
    pub show_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_genres")]
    pub genres: Vec<GenreId>,
}

// Remote rows carry explicit nulls for display columns that were never filled.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// Rows written by other clients may hold genre names instead of ids.
fn lenient_genres<'de, D>(d: D) -> Result<Vec<GenreId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(genre_ids_from_values(&raw))
}

impl FavoriteRow {
    pub fn for_show(user_id: &str, show: &Show) -> Self {
        Self {
            user_id: user_id.to_string(),
            show_id: show.id.clone(),
            title: show.title.clone(),
            image: show.image.clone(),
            description: show.description.clone(),
            genres: show.genres.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}
