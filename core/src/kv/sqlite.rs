use super::KeyValueStore;
use crate::clock::{SharedClock, SystemClock};
use crate::error::{LumaError, LumaResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-backed substrate: one `kv_entry` row per key. `updated_at` is
/// stamped from the clock, the system clock unless `with_clock` says otherwise.
pub struct SqliteKv {
    conn: Mutex<Connection>,
    clock: SharedClock,
}

impl SqliteKv {
    pub fn open(path: &str) -> LumaResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::warn!("SqliteKv: WAL not enabled for {path}: {e}");
        }
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LumaResult<Self> {
        Ok(Self::from_connection(Connection::open(":memory:")?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp rows from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LumaResult<()> {
        self.lock("migrate")?
            .execute_batch(include_str!("../../../migrations/001_kv.sql"))?;
        Ok(())
    }

    fn lock(&self, context: &str) -> LumaResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LumaError::Storage(format!("SqliteKv: lock poisoned during {context}")))
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> LumaResult<Option<String>> {
        let conn = self.lock("get")?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entry WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> LumaResult<()> {
        let conn = self.lock("set")?;
        conn.execute(
            "INSERT INTO kv_entry (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, self.clock.now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> LumaResult<()> {
        let conn = self.lock("remove")?;
        conn.execute("DELETE FROM kv_entry WHERE key = ?1", params![key])?;
        Ok(())
    }
}
