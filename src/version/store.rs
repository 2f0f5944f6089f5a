//! Current and updated version state

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::CURRENT_VERSION_KEY;
use crate::version::error::StoreError;

/// Durable string slots keyed by name
#[cfg_attr(test, automock)]
pub trait VersionSlot: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: settings table
    &["CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL)"],
];

/// [`VersionSlot`] backed by a SQLite database file
pub struct SqliteSlot {
    conn: Mutex<Connection>,
}

impl SqliteSlot {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening version database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode so several clients can share the file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::apply_migrations(&conn)?;
        debug!("Version database ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }
}

impl VersionSlot for SqliteSlot {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        let result = conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        });

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            (key, value),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-process [`VersionSlot`]; values are lost with the process
#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// The version the client runs (durable) and the latest version seen from
/// the server (this process only).
pub struct VersionStore<S: VersionSlot> {
    slot: S,
    updated: Mutex<Option<String>>,
}

impl<S: VersionSlot> VersionStore<S> {
    pub fn new(slot: S) -> Self {
        Self {
            slot,
            updated: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Result<Option<String>, StoreError> {
        self.slot.get(CURRENT_VERSION_KEY)
    }

    /// `None` clears the stored version
    pub fn set_current(&self, value: Option<&str>) -> Result<(), StoreError> {
        match value {
            Some(value) => self.slot.set(CURRENT_VERSION_KEY, value),
            None => self.slot.remove(CURRENT_VERSION_KEY),
        }
    }

    /// `None` until a latest-version check has completed
    pub fn updated(&self) -> Result<Option<String>, StoreError> {
        let updated = self.updated.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(updated.clone())
    }

    pub fn set_updated(&self, value: Option<String>) -> Result<(), StoreError> {
        let mut updated = self.updated.lock().map_err(|_| StoreError::LockPoisoned)?;
        *updated = value;
        Ok(())
    }

    /// Whether the server reported a version other than the current one.
    ///
    /// Also true before any check when a current version is stored, so run a
    /// check first for a meaningful answer.
    pub fn did_update(&self) -> Result<bool, StoreError> {
        Ok(self.updated()? != self.current()?)
    }
}
