// src/app/store/mod.rs
//! The `favorites` relation, keyed by `(user_id, show_id)`.

use crate::app::data::FavoriteRow;
use crate::error::StoreError;

pub mod store_rest;
pub mod store_sqlite;

pub use store_rest::RestRowStore;
pub use store_sqlite::SqliteRowStore;

pub const FAVORITES_TABLE: &str = "favorites";

/// Row-level access to favorites. Implementations must report an existing
/// `(user_id, show_id)` pair on insert as [`StoreError::Duplicate`].
pub trait RowStore: Send + Sync {
    fn list(&self, user_id: &str) -> Result<Vec<FavoriteRow>, StoreError>;
    fn insert(&self, row: &FavoriteRow) -> Result<(), StoreError>;
    fn delete(&self, user_id: &str, show_id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::{Receiver, Sender};
    use std::sync::{mpsc, Mutex};

    use super::RowStore;
    use crate::app::data::FavoriteRow;
    use crate::error::StoreError;

    /// In-memory store that counts calls, can fail on demand, and can hold
    /// each call until the test releases it.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub rows: Mutex<Vec<FavoriteRow>>,
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
        gate: Mutex<Option<Receiver<()>>>,
        list_gate: Mutex<Option<Receiver<()>>>,
        list_parked: AtomicBool,
    }

    impl FakeStore {
        pub fn with_rows(rows: Vec<FavoriteRow>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        /// Every following call blocks until one `()` is sent per call.
        pub fn gated(&self) -> Sender<()> {
            let (tx, rx) = mpsc::channel();
            *self.gate.lock().unwrap() = Some(rx);
            tx
        }

        /// `list` takes its snapshot, then waits for one `()` before replying.
        pub fn gated_list(&self) -> Sender<()> {
            let (tx, rx) = mpsc::channel();
            *self.list_gate.lock().unwrap() = Some(rx);
            tx
        }

        /// True once a gated `list` has taken its snapshot.
        pub fn list_parked(&self) -> bool {
            self.list_parked.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn ids(&self, user_id: &str) -> Vec<String> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id == user_id)
                .map(|r| r.show_id.clone())
                .collect()
        }

        fn enter(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.gate.lock().unwrap().as_ref() {
                let _ = rx.recv();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(())
        }
    }

    impl RowStore for FakeStore {
        fn list(&self, user_id: &str) -> Result<Vec<FavoriteRow>, StoreError> {
            self.enter()?;
            let snapshot: Vec<FavoriteRow> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect();
            if let Some(rx) = self.list_gate.lock().unwrap().as_ref() {
                self.list_parked.store(true, Ordering::SeqCst);
                let _ = rx.recv();
            }
            Ok(snapshot)
        }

        fn insert(&self, row: &FavoriteRow) -> Result<(), StoreError> {
            self.enter()?;
            let mut rows = self.rows.lock().unwrap();
            if rows
                .iter()
                .any(|r| r.user_id == row.user_id && r.show_id == row.show_id)
            {
                return Err(StoreError::Duplicate);
            }
            rows.push(row.clone());
            Ok(())
        }

        fn delete(&self, user_id: &str, show_id: &str) -> Result<(), StoreError> {
            self.enter()?;
            self.rows
                .lock()
                .unwrap()
                .retain(|r| !(r.user_id == user_id && r.show_id == show_id));
            Ok(())
        }
    }
}
