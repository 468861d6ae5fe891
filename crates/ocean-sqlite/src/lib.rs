//! SQLite implementation of the Ocean Notes storage provider.
//!
//! Notes live in one table; `position` records the order the store wrote them
//! in, so a reload hands back the list exactly as it was saved.

mod migrations;

pub use migrations::{get_pending_migrations, Migration, MIGRATIONS, SCHEMA_VERSION};

use log::{debug, warn};
use ocean_core::{Error, Note, StorageProvider};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

/// SQLite-backed storage provider.
pub struct SqliteProvider {
    conn: Connection,
}

impl SqliteProvider {
    /// Open a database at the given path and run any pending migrations.
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create database dir: {}", e)))?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        let provider = Self { conn };
        provider.run_migrations()?;
        Ok(provider)
    }

    /// Open an in-memory database and run migrations.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        let provider = Self { conn };
        provider.run_migrations()?;
        Ok(provider)
    }

    /// Current schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i64, Error> {
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM _ocean_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Run any pending database migrations.
    fn run_migrations(&self) -> Result<(), Error> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS _ocean_meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;

        let current_version = self.schema_version()?;
        if current_version > SCHEMA_VERSION {
            return Err(Error::Storage(format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            )));
        }
        if current_version == SCHEMA_VERSION {
            return Ok(());
        }

        for migration in get_pending_migrations(current_version) {
            debug!("applying migration {} ({})", migration.version, migration.name);
            for statement in migration.statements {
                self.conn.execute(statement, []).map_err(|e| {
                    Error::Storage(format!("Migration {} failed: {}", migration.name, e))
                })?;
            }
        }

        self.conn
            .execute(
                "INSERT OR REPLACE INTO _ocean_meta (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(())
    }

    fn try_list(&self) -> Result<Vec<Note>, Error> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, content, updated_at, pinned FROM notes
                 ORDER BY position ASC",
            )
            .map_err(|e| Error::Storage(e.to_string()))?;

        let notes = stmt
            .query_map([], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    updated_at: row.get(3)?,
                    pinned: row.get::<_, i64>(4)? != 0,
                })
            })
            .map_err(|e| Error::Storage(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(notes)
    }

    fn try_set(&self, notes: &[Note]) -> Result<(), Error> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Storage(e.to_string()))?;

        tx.execute("DELETE FROM notes", [])
            .map_err(|e| Error::Storage(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO notes (id, title, content, updated_at, pinned, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| Error::Storage(e.to_string()))?;

            for (position, note) in notes.iter().enumerate() {
                stmt.execute(params![
                    note.id,
                    note.title,
                    note.content,
                    note.updated_at,
                    note.pinned as i64,
                    position as i64
                ])
                .map_err(|e| Error::Storage(format!("Failed to write note {}: {}", note.id, e)))?;
            }
        }

        tx.commit().map_err(|e| Error::Storage(e.to_string()))
    }
}

impl StorageProvider for SqliteProvider {
    fn list_notes(&self) -> Vec<Note> {
        match self.try_list() {
            Ok(notes) => notes,
            Err(e) => {
                warn!("failed to load notes from sqlite: {}", e);
                Vec::new()
            }
        }
    }

    fn set_notes(&self, notes: &[Note]) {
        if let Err(e) = self.try_set(notes) {
            warn!("dropping write of {} notes: {}", notes.len(), e);
        }
    }
}
