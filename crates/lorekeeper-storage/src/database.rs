// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps exactly one `tokio_rusqlite::Connection`; query functions
//! take `&Database` and go through [`Database::connection`]. Do NOT open
//! additional connections for writes.

use std::path::Path;

use lorekeeper_config::model::StorageConfig;
use lorekeeper_core::LorekeeperError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Convert a tokio-rusqlite error into [`LorekeeperError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error) -> LorekeeperError {
    LorekeeperError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database holding memories and embeddings.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database described by `config`.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, LorekeeperError> {
        Self::open(Path::new(&config.database_path), config.wal_mode).await
    }

    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &Path, wal_mode: bool) -> Result<Self, LorekeeperError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LorekeeperError::Storage {
                    source: Box::new(e),
                })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, LorekeeperError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    /// The single connection all queries run through.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Verify the connection still answers queries.
    pub async fn ping(&self) -> Result<(), LorekeeperError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), LorekeeperError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), LorekeeperError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA synchronous = NORMAL;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| LorekeeperError::Storage {
                source: Box::new(e),
            })?;
        debug!("migrations applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'memor%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["memories", "memory_embeddings"]);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = Database::open_in_memory().await.unwrap();
        let result = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO memory_embeddings (memory_id, embedding, dimensions) VALUES (42, x'00000000', 1)",
                    [],
                )
            })
            .await;
        assert!(result.is_err(), "orphan embedding insert must fail");
    }

    #[tokio::test]
    async fn file_database_opens_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lore.db");

        let db = Database::open(&path, true).await.unwrap();
        db.ping().await.unwrap();
        db.close().await.unwrap();

        // Re-opening must not re-apply migrations destructively.
        let db = Database::open(&path, true).await.unwrap();
        db.ping().await.unwrap();
        assert!(path.exists());
    }
}
