// src/app/mod.rs: application context (catalog, session, favorites, browse state)

// ---- Standard lib imports ----
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ---- Crates ----
use tracing::{debug, info, warn};

// ---- Local modules ----
pub mod auth;
pub mod browse;
pub mod catalog;
pub mod data;
pub mod detail;
pub mod favorites;
pub mod filters;
pub mod identity;
pub mod notify;
pub mod search;
pub mod store;
pub mod types;
pub(crate) mod utils;

use crate::app::auth::AuthSession;
use crate::app::browse::Browser;
use crate::app::catalog::{CatalogClient, CatalogSource};
use crate::app::data::{Credentials, Show, User};
use crate::app::detail::ShowViewer;
use crate::app::favorites::FavoritesReconciler;
use crate::app::identity::{IdentityProvider, RestIdentityProvider, TokenCell};
use crate::app::store::{RestRowStore, RowStore, SqliteRowStore};
use crate::app::types::{CatalogMsg, ToggleAction};
use crate::config::{AppConfig, RowStoreKind};
use crate::error::{AuthError, FavoritesError, FetchError, MountError};

const MAX_CATALOG_PER_TICK: usize = 8;
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Everything the front end holds for one mounted session. Passed explicitly;
/// there is no global.
pub struct AppContext {
    config: AppConfig,
    catalog: Arc<dyn CatalogSource>,
    catalog_tx: Sender<CatalogMsg>,
    catalog_rx: Option<Receiver<CatalogMsg>>,
    auth: AuthSession,
    favorites: FavoritesReconciler,
    browser: Browser,
    viewer: Option<ShowViewer>,
    // id of the detail request whose answer we still want
    pending_show: Option<String>,
    show_error: Option<String>,
}

impl AppContext {
    /// Build the catalog client, the REST identity provider and the configured
    /// row store. The session query runs in the background; see [`Self::tick`].
    pub fn mount(config: AppConfig) -> Result<Self, MountError> {
        let auth_url = config.auth_url.clone().ok_or(MountError::MissingAuthUrl)?;
        let token = TokenCell::default();

        let catalog: Arc<dyn CatalogSource> = Arc::new(CatalogClient::new(&config.catalog_url)?);
        let provider: Arc<dyn IdentityProvider> = Arc::new(RestIdentityProvider::new(
            &auth_url,
            config.anon_key.clone(),
            token.clone(),
        )?);
        let store: Arc<dyn RowStore> = match config.row_store {
            RowStoreKind::Remote => {
                Arc::new(RestRowStore::new(&auth_url, config.anon_key.clone(), token)?)
            }
            RowStoreKind::Sqlite => Arc::new(SqliteRowStore::open(&config.sqlite_path)?),
        };
        info!("Mounting with {:?} row store", config.row_store);
        Ok(Self::from_parts(config, catalog, provider, store))
    }

    pub fn from_parts(
        config: AppConfig,
        catalog: Arc<dyn CatalogSource>,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn RowStore>,
    ) -> Self {
        let (catalog_tx, catalog_rx) = mpsc::channel();
        let favorites = FavoritesReconciler::new(store, config.notice_ttl());
        let browser = Browser::new(config.search_debounce());
        Self {
            config,
            catalog,
            catalog_tx,
            catalog_rx: Some(catalog_rx),
            auth: AuthSession::start(provider),
            favorites,
            browser,
            viewer: None,
            pending_show: None,
            show_error: None,
        }
    }

    // ---- accessors ----
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn favorites(&self) -> &FavoritesReconciler {
        &self.favorites
    }

    pub fn favorites_mut(&mut self) -> &mut FavoritesReconciler {
        &mut self.favorites
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    pub fn viewer(&self) -> Option<&ShowViewer> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut ShowViewer> {
        self.viewer.as_mut()
    }

    pub fn is_show_loading(&self) -> bool {
        self.pending_show.is_some()
    }

    /// User-facing message of the last failed detail request.
    pub fn show_error(&self) -> Option<&str> {
        self.show_error.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.catalog_rx.is_some()
    }

    /// Gate for private views.
    pub fn require_user(&self) -> Result<User, FavoritesError> {
        self.auth.user().cloned().ok_or(FavoritesError::Unauthenticated)
    }

    // ---- per-tick ----
    /// Drain auth results, favorites and catalog completions, then apply a
    /// settled search term. Returns true when anything changed. A torn-down
    /// context never changes.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let auth_changes = self.auth.poll();
        if auth_changes > 0 {
            self.sync_user();
        }
        let done = self.favorites.poll(now);
        let fetched = self.poll_catalog();
        let searched = self.browser.tick(now);
        auth_changes > 0 || done > 0 || fetched > 0 || searched
    }

    /// Tick until `done` holds or `deadline` passes. Returns whether `done` held.
    pub fn run_until(&mut self, deadline: Instant, done: impl Fn(&Self) -> bool) -> bool {
        loop {
            self.tick(Instant::now());
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_STEP);
        }
    }

    /// Keep the favorites owner in step with the session user.
    fn sync_user(&mut self) {
        let current = self.auth.user().map(|u| u.id.clone());
        if current.as_deref() == self.favorites.user_id() {
            return;
        }
        match current {
            Some(user_id) => {
                debug!("session user is now {user_id}; loading favorites");
                self.favorites.request_load(&user_id);
            }
            None => {
                debug!("session ended; clearing favorites");
                self.favorites.clear();
            }
        }
    }

    // ---- catalog ----
    /// Blocking show list fetch.
    pub fn load_shows(&mut self) -> Result<usize, FetchError> {
        self.browser.set_loading();
        let result = self.catalog.fetch_shows();
        self.apply_shows(result)
    }

    /// Blocking detail fetch.
    pub fn open_show(&mut self, id: &str) -> Result<&mut ShowViewer, FetchError> {
        self.pending_show = None;
        self.show_error = None;
        let detail = self.catalog.fetch_show(id)?;
        Ok(self.viewer.insert(ShowViewer::new(detail)))
    }

    /// Fetch the show list on a worker; it lands on a later [`Self::tick`].
    pub fn request_shows(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.browser.set_loading();
        let catalog = Arc::clone(&self.catalog);
        let tx = self.catalog_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(CatalogMsg::Shows(catalog.fetch_shows()));
        });
    }

    /// Fetch one show on a worker. Only the most recent request is applied.
    pub fn request_show(&mut self, id: &str) {
        if !self.is_mounted() {
            return;
        }
        self.pending_show = Some(id.to_string());
        self.show_error = None;
        let catalog = Arc::clone(&self.catalog);
        let tx = self.catalog_tx.clone();
        let id = id.to_string();
        thread::spawn(move || {
            let result = catalog.fetch_show(&id);
            let _ = tx.send(CatalogMsg::Detail { id, result });
        });
    }

    fn poll_catalog(&mut self) -> usize {
        let done: Vec<CatalogMsg> = match &self.catalog_rx {
            Some(rx) => rx.try_iter().take(MAX_CATALOG_PER_TICK).collect(),
            None => return 0,
        };
        let mut applied = 0usize;
        for msg in done {
            match msg {
                CatalogMsg::Shows(result) => {
                    let _ = self.apply_shows(result);
                    applied += 1;
                }
                CatalogMsg::Detail { id, result } => {
                    if self.pending_show.as_deref() != Some(id.as_str()) {
                        debug!("dropping stale detail for show {id}");
                        continue;
                    }
                    self.pending_show = None;
                    match result {
                        Ok(detail) => self.viewer = Some(ShowViewer::new(detail)),
                        Err(err) => {
                            warn!("Error fetching show {id}: {err}");
                            self.show_error = Some(err.user_message());
                        }
                    }
                    applied += 1;
                }
            }
        }
        applied
    }

    fn apply_shows(&mut self, result: Result<Vec<Show>, FetchError>) -> Result<usize, FetchError> {
        match result {
            Ok(shows) => {
                let n = shows.len();
                self.browser.set_shows(shows);
                Ok(n)
            }
            Err(err) => {
                warn!("Error fetching shows: {err}");
                self.browser.set_failed(err.user_message());
                Err(err)
            }
        }
    }

    // ---- session ----
    pub fn login(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.auth.login(creds)
    }

    pub fn sign_up(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.auth.sign_up(creds)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.auth.logout()?;
        self.sync_user();
        Ok(())
    }

    /// Background variants; failures show up in [`AuthSession::error`].
    pub fn request_login(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.auth.request_login(creds)
    }

    pub fn request_sign_up(&mut self, creds: &Credentials) -> Result<(), AuthError> {
        self.auth.request_sign_up(creds)
    }

    pub fn request_logout(&mut self) -> Result<(), AuthError> {
        self.auth.request_logout()
    }

    // ---- favorites ----
    /// Blocking toggle for the session user.
    pub fn toggle_favorite(&mut self, show: &Show, now: Instant) -> Result<ToggleAction, FavoritesError> {
        let user_id = self.auth.user().map(|u| u.id.clone());
        self.favorites.toggle_favorite(user_id.as_deref(), show, now)
    }

    /// Background toggle; the result lands on a later [`Self::tick`].
    pub fn request_toggle(&mut self, show: &Show, now: Instant) -> Result<ToggleAction, FavoritesError> {
        let user_id = self.auth.user().map(|u| u.id.clone());
        self.favorites.request_toggle(user_id.as_deref(), show, now)
    }

    /// Unsubscribe and stop timers. In-flight work finishes into dropped
    /// channels and is never applied.
    pub fn teardown(&mut self) {
        self.auth.teardown();
        self.favorites.teardown();
        self.browser.teardown();
        self.catalog_rx = None;
        self.pending_show = None;
        info!("Application context torn down");
    }
}
