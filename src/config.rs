use std::{env, fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_CATALOG_URL: &str = "https://podcast-api.netlify.app";
pub const LOCAL_DB_DIR: &str = "db";
pub const LOCAL_FAVORITES_DB_FILE: &str = "favorites.db";
pub const SEARCH_DEBOUNCE_MS: u64 = 300;
pub const NOTICE_SECS: u64 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowStoreKind {
    Remote,
    Sqlite,
}

impl RowStoreKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "rest" => Some(Self::Remote),
            "sqlite" | "local" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog_url: String,
    pub auth_url: Option<String>,
    pub anon_key: Option<String>,
    pub row_store: RowStoreKind,
    pub sqlite_path: PathBuf,
    pub search_debounce_ms: u64,
    pub notice_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            auth_url: None,
            anon_key: None,
            row_store: RowStoreKind::Sqlite,
            sqlite_path: local_favorites_db_path(),
            search_debounce_ms: SEARCH_DEBOUNCE_MS,
            notice_secs: NOTICE_SECS,
        }
    }
}

impl AppConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_secs)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    catalog_url: Option<String>,
    #[serde(alias = "supabase_url")]
    auth_url: Option<String>,
    anon_key: Option<String>,
    row_store: Option<String>,
    sqlite_path: Option<String>,
    search_debounce_ms: Option<u64>,
    notice_secs: Option<u64>,
}

pub fn config_path() -> PathBuf {
    env::var_os("PODSHELF_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

pub fn load_config() -> AppConfig {
    let cfg_path = config_path();
    let mut cfg = match fs::read_to_string(&cfg_path) {
        Ok(raw) => {
            let cfg = parse_config(&raw);
            info!("Loaded config from {}", cfg_path.display());
            cfg
        }
        Err(_) => {
            info!("No {} found; using defaults", cfg_path.display());
            AppConfig::default()
        }
    };

    if let Some(key) = env::var("PODSHELF_ANON_KEY").ok().filter(|k| !k.is_empty()) {
        cfg.anon_key = Some(key);
    }
    cfg
}

/// Merge a `config.json` body onto the defaults. Bad input never fails the load.
pub fn parse_config(raw: &str) -> AppConfig {
    let mut cfg = AppConfig::default();

    let parsed = match serde_json::from_str::<RawConfig>(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Failed to parse config ({err}). Using defaults.");
            return cfg;
        }
    };

    if let Some(url) = parsed.catalog_url.filter(|u| !u.trim().is_empty()) {
        cfg.catalog_url = url.trim_end_matches('/').to_string();
    }
    if let Some(url) = parsed.auth_url.filter(|u| !u.trim().is_empty()) {
        cfg.auth_url = Some(url.trim_end_matches('/').to_string());
        cfg.row_store = RowStoreKind::Remote;
    }
    if parsed.anon_key.is_some() {
        cfg.anon_key = parsed.anon_key;
    }
    if let Some(mode) = parsed.row_store {
        match RowStoreKind::from_str(&mode) {
            Some(kind) => cfg.row_store = kind,
            None => warn!("Unknown row_store `{mode}` in config; keeping {:?}.", cfg.row_store),
        }
    }
    if cfg.row_store == RowStoreKind::Remote && cfg.auth_url.is_none() {
        warn!("row_store is remote but auth_url is not set; falling back to sqlite.");
        cfg.row_store = RowStoreKind::Sqlite;
    }
    if let Some(path) = parsed.sqlite_path.filter(|p| !p.trim().is_empty()) {
        cfg.sqlite_path = PathBuf::from(path);
    }
    if let Some(ms) = parsed.search_debounce_ms {
        cfg.search_debounce_ms = ms;
    }
    if let Some(secs) = parsed.notice_secs {
        cfg.notice_secs = secs.max(1);
    }

    cfg
}

pub fn local_favorites_db_path() -> PathBuf {
    PathBuf::from(LOCAL_DB_DIR).join(LOCAL_FAVORITES_DB_FILE)
}
