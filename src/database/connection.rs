//! SQLite connection management for the reader's persistent store.
//!
//! Provides the [`Database`] struct that wraps a `rusqlite::Connection`
//! and runs schema migrations on open.

use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Owns the SQLite connection backing the key-value store.
///
/// Every storage area (`local`, `sync`) shares the one `kv_store` table; opening
/// the database guarantees that table and its index exist.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Arguments
    /// * `path` - File system path of the settings database, usually `achroma.db`
    ///   inside the host's data directory.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for tests; the data is discarded when the `Database` is dropped.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Applies every migration newer than the recorded schema version.
    ///
    /// Already-applied versions are skipped, so this runs on every open.
    fn run_migrations(&self) -> Result<(), rusqlite::Error> {
        migrations::run_all(&self.conn)
    }

    /// Returns a reference to the underlying `rusqlite::Connection`.
    ///
    /// The SQLite storage area issues its queries through this handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
