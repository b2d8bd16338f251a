// src/app/favorites.rs
//! Per-user favorites mirrored from the row store.
//!
//! Local state changes only after the store confirms (confirm-then-update),
//! so there is never anything to roll back. Every toggle attempt leaves a
//! notice. Background requests complete through [`FavoritesReconciler::poll`];
//! completions for a user that is no longer current are dropped, and after
//! [`FavoritesReconciler::teardown`] nothing is applied at all.
//!
//! A background load snapshots the store at some point before its result is
//! applied. Toggles confirmed while it is outstanding are journaled and
//! replayed on top of the snapshot, and only the newest load is applied.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::data::{FavoriteRow, Show};
use super::notify::{Notice, Notifier};
use super::store::RowStore;
use super::types::{FavoritesMsg, LoadState, ToggleAction};
use crate::error::{FavoritesError, StoreError};

const MSG_ADDED: &str = "Show added to favorites successfully.";
const MSG_REMOVED: &str = "Show removed from favorites.";
const MSG_ALREADY: &str = "Show is already in your favorites.";
const MAX_DONE_PER_POLL: usize = 32;

pub struct FavoritesReconciler {
    store: Arc<dyn RowStore>,
    user_id: Option<String>,
    ids: HashSet<String>,
    rows: Vec<FavoriteRow>,
    load: LoadState,
    in_flight: HashSet<String>,
    load_gen: u64,
    since_load: Vec<(FavoriteRow, ToggleAction)>,
    notices: Notifier,
    done_tx: Sender<FavoritesMsg>,
    done_rx: Option<Receiver<FavoritesMsg>>,
}

impl FavoritesReconciler {
    pub fn new(store: Arc<dyn RowStore>, notice_ttl: Duration) -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            store,
            user_id: None,
            ids: HashSet::new(),
            rows: Vec::new(),
            load: LoadState::Idle,
            in_flight: HashSet::new(),
            load_gen: 0,
            since_load: Vec::new(),
            notices: Notifier::new(notice_ttl),
            done_tx,
            done_rx: Some(done_rx),
        }
    }

    // ---- reads ----
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn rows(&self) -> &[FavoriteRow] {
        &self.rows
    }

    pub fn is_favorite(&self, show_id: &str) -> bool {
        self.ids.contains(show_id)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_pending(&self, show_id: &str) -> bool {
        self.in_flight.contains(show_id)
    }

    pub fn notice(&mut self, now: Instant) -> Option<&Notice> {
        self.notices.current(now)
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.dismiss();
    }

    /// Forget the current user (logout). In-flight completions for them are ignored.
    pub fn clear(&mut self) {
        self.user_id = None;
        self.ids.clear();
        self.rows.clear();
        self.in_flight.clear();
        self.since_load.clear();
        self.load_gen += 1;
        self.load = LoadState::Idle;
    }

    /// Stop applying completions. Workers still running finish into a
    /// dropped channel.
    pub fn teardown(&mut self) {
        self.done_rx = None;
        self.clear();
    }

    fn adopt_user(&mut self, user_id: &str) {
        if self.user_id.as_deref() != Some(user_id) {
            self.clear();
            self.user_id = Some(user_id.to_string());
        }
    }

    // ---- load ----
    pub fn load_favorites(&mut self, user_id: &str) -> Result<&HashSet<String>, FavoritesError> {
        self.adopt_user(user_id);
        self.begin_load();
        let result = self.store.list(user_id);
        self.settle_load(user_id, result)?;
        Ok(&self.ids)
    }

    pub fn request_load(&mut self, user_id: &str) {
        self.adopt_user(user_id);
        let generation = self.begin_load();

        let store = Arc::clone(&self.store);
        let tx = self.done_tx.clone();
        let user_id = user_id.to_string();
        thread::spawn(move || {
            let result = store.list(&user_id);
            let _ = tx.send(FavoritesMsg::Loaded {
                user_id,
                generation,
                result,
            });
        });
    }

    /// Supersede any outstanding load. Toggles confirmed before this point
    /// are already in the store the new load will read.
    fn begin_load(&mut self) -> u64 {
        self.load_gen += 1;
        self.since_load.clear();
        self.load = LoadState::Loading;
        self.load_gen
    }

    fn settle_load(
        &mut self,
        user_id: &str,
        result: Result<Vec<FavoriteRow>, StoreError>,
    ) -> Result<(), FavoritesError> {
        match result {
            Ok(rows) => {
                self.ids = rows.iter().map(|r| r.show_id.clone()).collect();
                self.rows = rows;
                for (row, action) in std::mem::take(&mut self.since_load) {
                    debug!("replaying {action:?} of {} over loaded favorites", row.show_id);
                    match action {
                        ToggleAction::Added => self.insert_local(row),
                        ToggleAction::Removed => self.remove_local(&row.show_id),
                    }
                }
                self.load = LoadState::Ready;
                info!("Loaded {} favorites for user {user_id}", self.ids.len());
                Ok(())
            }
            Err(source) => {
                warn!("Error fetching favorites: {source}");
                self.ids.clear();
                self.rows.clear();
                self.since_load.clear();
                let err = FavoritesError::Fetch { source };
                self.load = LoadState::Failed(err.user_message());
                Err(err)
            }
        }
    }

    // ---- toggle ----
    fn begin_toggle(
        &mut self,
        user_id: Option<&str>,
        show: &Show,
        now: Instant,
    ) -> Result<(FavoriteRow, ToggleAction), FavoritesError> {
        let Some(user_id) = user_id else {
            let err = FavoritesError::Unauthenticated;
            self.notices.error(err.user_message(), now);
            return Err(err);
        };
        if self.in_flight.contains(&show.id) {
            let err = FavoritesError::TogglePending {
                show_id: show.id.clone(),
            };
            self.notices.error(err.user_message(), now);
            return Err(err);
        }
        self.adopt_user(user_id);
        let action = if self.ids.contains(&show.id) {
            ToggleAction::Removed
        } else {
            ToggleAction::Added
        };
        Ok((FavoriteRow::for_show(user_id, show), action))
    }

    fn call_store(store: &dyn RowStore, row: &FavoriteRow, action: ToggleAction) -> Result<(), StoreError> {
        match action {
            ToggleAction::Added => store.insert(row),
            ToggleAction::Removed => store.delete(&row.user_id, &row.show_id),
        }
    }

    /// Blocking toggle: remote call first, local set after confirmation.
    pub fn toggle_favorite(
        &mut self,
        user_id: Option<&str>,
        show: &Show,
        now: Instant,
    ) -> Result<ToggleAction, FavoritesError> {
        let (row, action) = self.begin_toggle(user_id, show, now)?;
        let result = Self::call_store(self.store.as_ref(), &row, action);
        self.settle_toggle(row, action, result, now)
    }

    /// Background toggle. A second toggle for the same show is refused until
    /// the first one has been settled by [`Self::poll`].
    pub fn request_toggle(
        &mut self,
        user_id: Option<&str>,
        show: &Show,
        now: Instant,
    ) -> Result<ToggleAction, FavoritesError> {
        let (row, action) = self.begin_toggle(user_id, show, now)?;
        self.in_flight.insert(row.show_id.clone());

        let store = Arc::clone(&self.store);
        let tx = self.done_tx.clone();
        thread::spawn(move || {
            let result = Self::call_store(store.as_ref(), &row, action);
            let _ = tx.send(FavoritesMsg::Toggled { row, action, result });
        });
        Ok(action)
    }

    fn settle_toggle(
        &mut self,
        row: FavoriteRow,
        action: ToggleAction,
        result: Result<(), StoreError>,
        now: Instant,
    ) -> Result<ToggleAction, FavoritesError> {
        match (action, result) {
            (ToggleAction::Added, Ok(())) => {
                self.journal(&row, action);
                self.insert_local(row);
                self.notices.info(MSG_ADDED, now);
                Ok(action)
            }
            (ToggleAction::Added, Err(StoreError::Duplicate)) => {
                debug!("favorite {} already stored; adopting", row.show_id);
                self.journal(&row, action);
                self.insert_local(row);
                self.notices.info(MSG_ALREADY, now);
                Ok(action)
            }
            (ToggleAction::Removed, Ok(())) => {
                self.journal(&row, action);
                self.remove_local(&row.show_id);
                self.notices.info(MSG_REMOVED, now);
                Ok(action)
            }
            (_, Err(source)) => {
                warn!("Error toggling favorite {}: {source}", row.show_id);
                let err = FavoritesError::Toggle {
                    show_id: row.show_id,
                    source,
                };
                self.notices.error(err.user_message(), now);
                Err(err)
            }
        }
    }

    fn insert_local(&mut self, row: FavoriteRow) {
        if self.ids.insert(row.show_id.clone()) {
            self.rows.push(row);
        }
    }

    fn remove_local(&mut self, show_id: &str) {
        self.ids.remove(show_id);
        self.rows.retain(|r| r.show_id != show_id);
    }

    fn journal(&mut self, row: &FavoriteRow, action: ToggleAction) {
        if self.load == LoadState::Loading {
            self.since_load.push((row.clone(), action));
        }
    }

    // ---- completions ----
    /// Drain finished background work. Returns how many completions were
    /// received, including stale ones that were dropped.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut drained = 0usize;
        while drained < MAX_DONE_PER_POLL {
            let Some(rx) = &self.done_rx else {
                break;
            };
            let msg = match rx.try_recv() {
                Ok(msg) => msg,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            drained += 1;

            match msg {
                FavoritesMsg::Loaded {
                    user_id,
                    generation,
                    result,
                } => {
                    if self.user_id.as_deref() != Some(user_id.as_str()) || generation != self.load_gen {
                        debug!("dropping superseded favorites load for {user_id}");
                        continue;
                    }
                    let _ = self.settle_load(&user_id, result);
                }
                FavoritesMsg::Toggled { row, action, result } => {
                    if self.user_id.as_deref() != Some(row.user_id.as_str())
                        || !self.in_flight.remove(&row.show_id)
                    {
                        debug!("dropping stale toggle for {}", row.show_id);
                        continue;
                    }
                    let _ = self.settle_toggle(row, action, result, now);
                }
            }
        }
        drained
    }
}
