// src/app/utils.rs
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::debug;

/// One blocking client per remote collaborator. No request timeout is set;
/// the transport default applies.
pub(crate) fn build_http_client(agent: &'static str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(agent)
        .default_headers({
            let mut h = HeaderMap::new();
            h.insert(ACCEPT, HeaderValue::from_static("application/json"));
            h
        })
        .build()
}

/// Catalog timestamps look like `2022-11-03T07:00:00.000Z`.
pub(crate) fn parse_updated(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(err) => {
            debug!("unparseable timestamp {raw:?}: {err}");
            None
        }
    }
}

/// `column=eq.value` filter for the REST row store.
pub(crate) fn eq_filter(column: &str, value: &str) -> String {
    format!("{column}=eq.{}", urlencoding::encode(value))
}

pub(crate) fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Truncate a response body for logs and error values.
pub(crate) fn clip(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_catalog_timestamps() {
        let ts = parse_updated(Some("2022-11-03T07:00:00.000Z")).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2022, 11, 3, 7));
        assert_eq!(parse_updated(Some("yesterday")), None);
        assert_eq!(parse_updated(Some("  ")), None);
        assert_eq!(parse_updated(None), None);
    }

    #[test]
    fn eq_filter_encodes_values() {
        assert_eq!(eq_filter("user_id", "a b&c"), "user_id=eq.a%20b%26c");
    }

    #[test]
    fn clip_keeps_short_bodies() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdef", 3), "abc…");
    }
}
