// src/app/catalog.rs
//! Read-only catalog client: `GET /shows` and `GET /id/{id}`.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::data::{genre_ids_from_values, Episode, Season, Show, ShowDetail};
use super::utils::{build_http_client, parse_updated, trim_base};
use crate::error::FetchError;

#[derive(Debug, Deserialize)]
struct RawShow {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    genres: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEpisode {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    episode: u32,
    #[serde(default)]
    file: String,
}

#[derive(Debug, Deserialize)]
struct RawSeason {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    episodes: Vec<RawEpisode>,
}

#[derive(Debug, Deserialize)]
struct RawShowDetail {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    genres: Vec<Value>,
    #[serde(default)]
    seasons: Vec<RawSeason>,
}

fn genre_labels(raw: &[Value]) -> Vec<String> {
    raw.iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

impl From<RawShow> for Show {
    fn from(raw: RawShow) -> Self {
        Self {
            genres: genre_ids_from_values(&raw.genres),
            updated: parse_updated(raw.updated.as_deref()),
            id: raw.id,
            title: raw.title,
            description: raw.description,
            image: raw.image,
        }
    }
}

fn season_from_raw(raw: RawSeason, position: usize) -> Season {
    let id = match raw.id {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => raw
            .season
            .map(|n| n.to_string())
            .unwrap_or_else(|| (position + 1).to_string()),
    };
    Season {
        id,
        title: raw.title,
        episodes: raw
            .episodes
            .into_iter()
            .map(|e| Episode {
                title: e.title,
                description: e.description,
                episode: e.episode,
                file: e.file,
            })
            .collect(),
    }
}

pub fn parse_show_list(body: &str) -> Result<Vec<Show>, FetchError> {
    let raw: Vec<RawShow> = serde_json::from_str(body)?;
    Ok(raw.into_iter().map(Show::from).collect())
}

pub fn parse_show_detail(body: &str) -> Result<ShowDetail, FetchError> {
    let raw: RawShowDetail = serde_json::from_str(body)?;
    Ok(ShowDetail {
        genre_labels: genre_labels(&raw.genres),
        updated: parse_updated(raw.updated.as_deref()),
        seasons: raw
            .seasons
            .into_iter()
            .enumerate()
            .map(|(i, s)| season_from_raw(s, i))
            .collect(),
        id: raw.id,
        title: raw.title,
        description: raw.description,
        image: raw.image,
    })
}

/// Catalog ids are numeric strings.
pub fn is_valid_show_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Read access to the catalog. [`CatalogClient`] is the HTTP source.
pub trait CatalogSource: Send + Sync {
    fn fetch_shows(&self) -> Result<Vec<Show>, FetchError>;
    fn fetch_show(&self, id: &str) -> Result<ShowDetail, FetchError>;
}

pub struct CatalogClient {
    base_url: String,
    http: Client,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: trim_base(base_url),
            http: build_http_client("podshelf/catalog")?,
        })
    }

    pub fn shows_url(&self) -> String {
        format!("{}/shows", self.base_url)
    }

    pub fn show_url(&self, id: &str) -> String {
        format!("{}/id/{}", self.base_url, urlencoding::encode(id))
    }

    pub fn fetch_shows(&self) -> Result<Vec<Show>, FetchError> {
        let url = self.shows_url();
        let resp = self.http.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            warn!("GET {url} -> {status}");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let shows = parse_show_list(&resp.text()?)?;
        info!("Fetched {} shows from catalog", shows.len());
        Ok(shows)
    }

    pub fn fetch_show(&self, id: &str) -> Result<ShowDetail, FetchError> {
        if !is_valid_show_id(id) {
            return Err(FetchError::InvalidId { id: id.to_string() });
        }
        let url = self.show_url(id);
        let resp = self.http.get(&url).send()?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound { id: id.to_string() }),
            status if !status.is_success() => {
                warn!("GET {url} -> {status}");
                Err(FetchError::Status {
                    status: status.as_u16(),
                })
            }
            _ => {
                let detail = parse_show_detail(&resp.text()?)?;
                info!(
                    "Fetched show {} ({} seasons)",
                    detail.id,
                    detail.seasons.len()
                );
                Ok(detail)
            }
        }
    }
}

impl CatalogSource for CatalogClient {
    fn fetch_shows(&self) -> Result<Vec<Show>, FetchError> {
        CatalogClient::fetch_shows(self)
    }

    fn fetch_show(&self, id: &str) -> Result<ShowDetail, FetchError> {
        CatalogClient::fetch_show(self, id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"[
        {"id":"10716","title":"Something Was Wrong","description":"d","seasons":14,
         "image":"https://img/1.jpg","genres":[1,2],"updated":"2022-11-03T07:00:00.000Z"},
        {"id":"5675","title":"This Is Actually Happening","image":"https://img/2.jpg",
         "genres":["5", "x", 99],"updated":"not a date"}
    ]"#;

    const DETAIL: &str = r#"{
        "id":"10716","title":"Something Was Wrong","description":"d","image":"i",
        "genres":["All","Featured"],"updated":"2022-11-03T07:00:00.000Z",
        "seasons":[
            {"season":1,"title":"Season 1","episodes":[
                {"title":"Ep 1","description":"one","episode":1,"file":"https://a/1.mp3"},
                {"title":"Ep 2","description":"two","episode":2,"file":"https://a/2.mp3"}]},
            {"title":"Bonus","episodes":[]}
        ]
    }"#;

    #[test]
    fn maps_list_records() {
        let shows = parse_show_list(LIST).unwrap();
        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].genres, vec![1, 2]);
        assert!(shows[0].updated.is_some());
        assert_eq!(shows[1].genres, vec![5, 99]);
        assert_eq!(shows[1].updated, None);
        assert_eq!(shows[1].description, "");
    }

    #[test]
    fn maps_detail_with_season_ids() {
        let detail = parse_show_detail(DETAIL).unwrap();
        assert_eq!(detail.genre_labels, vec!["All", "Featured"]);
        assert_eq!(detail.seasons.len(), 2);
        assert_eq!(detail.seasons[0].id, "1");
        assert_eq!(detail.seasons[1].id, "2");
        assert_eq!(detail.seasons[0].episodes[1].file, "https://a/2.mp3");
    }

    #[test]
    fn rejects_non_numeric_ids_without_request() {
        let client = CatalogClient::new("http://127.0.0.1:9/").unwrap();
        assert!(matches!(
            client.fetch_show("abc"),
            Err(FetchError::InvalidId { .. })
        ));
        assert!(matches!(client.fetch_show(""), Err(FetchError::InvalidId { .. })));
        assert_eq!(client.show_url("42"), "http://127.0.0.1:9/id/42");
        assert_eq!(client.shows_url(), "http://127.0.0.1:9/shows");
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        assert!(matches!(
            parse_show_list("{\"not\":\"a list\"}"),
            Err(FetchError::Decode(_))
        ));
    }
}
