// src/app/store/store_rest.rs
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{RowStore, FAVORITES_TABLE};
use crate::app::data::FavoriteRow;
use crate::app::identity::TokenCell;
use crate::app::utils::{build_http_client, clip, eq_filter, trim_base};
use crate::error::StoreError;

/// PostgREST-style row store (`/rest/v1/favorites`). Requests carry the
/// signed-in user's access token when there is one, else the anon key.
pub struct RestRowStore {
    base_url: String,
    anon_key: Option<String>,
    token: TokenCell,
    http: Client,
}

impl RestRowStore {
    pub fn new(base_url: &str, anon_key: Option<String>, token: TokenCell) -> Result<Self, StoreError> {
        Ok(Self {
            base_url: trim_base(base_url),
            anon_key,
            token,
            http: build_http_client("podshelf/rows")?,
        })
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, FAVORITES_TABLE)
    }

    pub fn list_url(&self, user_id: &str) -> String {
        format!("{}?select=*&{}", self.table_url(), eq_filter("user_id", user_id))
    }

    pub fn delete_url(&self, user_id: &str, show_id: &str) -> String {
        format!(
            "{}?{}&{}",
            self.table_url(),
            eq_filter("user_id", user_id),
            eq_filter("show_id", show_id)
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let mut req = req;
        if let Some(key) = &self.anon_key {
            req = req.header("apikey", key);
        }
        let bearer = self.token.get().or_else(|| self.anon_key.clone());
        match bearer {
            Some(b) => req.bearer_auth(b),
            None => req,
        }
    }

    fn check(resp: Response, what: &str) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Duplicate);
        }
        let body = clip(&resp.text().unwrap_or_default(), 200);
        warn!("row store {what} -> {status}: {body}");
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl RowStore for RestRowStore {
    fn list(&self, user_id: &str) -> Result<Vec<FavoriteRow>, StoreError> {
        let resp = self.authorize(self.http.get(self.list_url(user_id))).send()?;
        let body = Self::check(resp, "select")?.text()?;
        let rows: Vec<FavoriteRow> = serde_json::from_str(&body)?;
        debug!("row store returned {} favorites", rows.len());
        Ok(rows)
    }

    fn insert(&self, row: &FavoriteRow) -> Result<(), StoreError> {
        let req = self
            .http
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(&[row]);
        let resp = self.authorize(req).send()?;
        Self::check(resp, "insert")?;
        Ok(())
    }

    fn delete(&self, user_id: &str, show_id: &str) -> Result<(), StoreError> {
        let resp = self
            .authorize(self.http.delete(self.delete_url(user_id, show_id)))
            .send()?;
        Self::check(resp, "delete")?;
        Ok(())
    }
}
