// src/app/store/store_sqlite.rs
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};
use tracing::{info, warn};

use super::RowStore;
use crate::app::data::{FavoriteRow, GenreId};
use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS favorites (
  user_id     TEXT NOT NULL,
  show_id     TEXT NOT NULL,
  title       TEXT NOT NULL DEFAULT '',
  image       TEXT NOT NULL DEFAULT '',
  description TEXT NOT NULL DEFAULT '',
  genres      TEXT NOT NULL DEFAULT '[]',
  created_at  TEXT NOT NULL,
  UNIQUE (user_id, show_id)
);
CREATE INDEX IF NOT EXISTS favorites_user ON favorites (user_id);
"#;

/// Local stand-in for the remote row store.
pub struct SqliteRowStore {
    conn: Mutex<Connection>,
}

impl SqliteRowStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("failed to create db dir {}: {e}", parent.display());
            }
        }
        let conn = Connection::open(path)?;
        let _ = conn.busy_timeout(Duration::from_secs(5));
        info!("Opened favorites db {}", path.display());
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

impl RowStore for SqliteRowStore {
    fn list(&self, user_id: &str) -> Result<Vec<FavoriteRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, show_id, title, image, description, genres
             FROM favorites WHERE user_id = ?1 ORDER BY rowid",
        )?;
        let raw = stmt
            .query_map([user_id], |row| {
                Ok((
                    FavoriteRow {
                        user_id: row.get(0)?,
                        show_id: row.get(1)?,
                        title: row.get(2)?,
                        image: row.get(3)?,
                        description: row.get(4)?,
                        genres: Vec::new(),
                    },
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(mut fav, genres)| -> Result<FavoriteRow, StoreError> {
                fav.genres = serde_json::from_str::<Vec<GenreId>>(&genres)?;
                Ok(fav)
            })
            .collect()
    }

    fn insert(&self, row: &FavoriteRow) -> Result<(), StoreError> {
        let genres = serde_json::to_string(&row.genres)?;
        let res = self.conn().execute(
            "INSERT INTO favorites (user_id, show_id, title, image, description, genres, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.user_id,
                row.show_id,
                row.title,
                row.image,
                row.description,
                genres,
                Utc::now().to_rfc3339(),
            ],
        );
        match res {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, user_id: &str, show_id: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND show_id = ?2",
            [user_id, show_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, show: &str) -> FavoriteRow {
        FavoriteRow {
            user_id: user.into(),
            show_id: show.into(),
            title: format!("Show {show}"),
            image: String::new(),
            description: String::new(),
            genres: vec![1, 4],
        }
    }

    #[test]
    fn unique_pair_is_enforced() {
        let store = SqliteRowStore::in_memory().unwrap();
        store.insert(&row("u1", "s1")).unwrap();
        assert!(matches!(store.insert(&row("u1", "s1")), Err(StoreError::Duplicate)));
        store.insert(&row("u2", "s1")).unwrap();
        assert_eq!(store.list("u1").unwrap().len(), 1);
    }

    #[test]
    fn list_is_scoped_and_keeps_genres() {
        let store = SqliteRowStore::in_memory().unwrap();
        store.insert(&row("u1", "a")).unwrap();
        store.insert(&row("u1", "b")).unwrap();
        store.insert(&row("u2", "c")).unwrap();
        let rows = store.list("u1").unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.show_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(rows[0].genres, vec![1, 4]);
        assert_eq!(rows[1].title, "Show b");
    }

    #[test]
    fn delete_is_keyed_and_idempotent() {
        let store = SqliteRowStore::in_memory().unwrap();
        store.insert(&row("u1", "a")).unwrap();
        store.insert(&row("u2", "a")).unwrap();
        store.delete("u1", "a").unwrap();
        store.delete("u1", "a").unwrap();
        assert!(store.list("u1").unwrap().is_empty());
        assert_eq!(store.list("u2").unwrap().len(), 1);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("favorites.db");
        {
            let store = SqliteRowStore::open(&path).unwrap();
            store.insert(&row("u1", "s9")).unwrap();
        }
        let store = SqliteRowStore::open(&path).unwrap();
        assert_eq!(store.list("u1").unwrap()[0].show_id, "s9");
    }
}
