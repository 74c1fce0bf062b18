//! SQLite storage backend with pragma configuration.
//!
//! Opens the database, applies the pragmas needed for concurrent access (WAL
//! mode), runs migrations, and stores every cache entry as one row keyed by
//! its storage location.

use super::backend::StorageBackend;
use super::hash::CacheKey;
use super::migrations;
use crate::Error;
use async_trait::async_trait;
use std::path::Path;
use tokio_rusqlite::{Connection, params, rusqlite};

/// SQLite-backed cache storage.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteBackend {
    pub(crate) conn: Connection,
}

impl SqliteBackend {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error> {
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let mut stmt = conn.prepare("SELECT body FROM cache_entries WHERE key = ?1")?;

                match stmt.query_row(params![key], |row| row.get(0)) {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), Error> {
        let key = key.as_str().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, body, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        body = excluded.body,
                        updated_at = excluded.updated_at",
                    params![key, bytes, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn exists(&self, key: &CacheKey) -> Result<bool, Error> {
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_entries WHERE key = ?1)",
                    params![key],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }
}
