#[cfg(test)]
use std::cell::{Cell, RefCell};
#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StorageError;

pub const PROGRESS_SLOT: &str = "watch_progress";
pub const WATCHED_SLOT: &str = "watched_episodes";

pub trait SlotStorage {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError>;
    fn write_slot(&self, slot: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: SlotStorage + ?Sized> SlotStorage for &T {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        (**self).read_slot(slot)
    }

    fn write_slot(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        (**self).write_slot(slot, value)
    }
}

pub struct SqliteSlots {
    conn: Connection,
}

impl SqliteSlots {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                StorageError::Open(format!(
                    "failed to create database directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path).map_err(|err| {
            StorageError::Open(format!(
                "failed to open database at {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|err| StorageError::Open(err.to_string()))?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS storage_slots (
                    slot TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
            )
            .map_err(|err| StorageError::Open(format!("failed to migrate database: {err}")))
    }
}

impl SlotStorage for SqliteSlots {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT value FROM storage_slots WHERE slot = ?1",
                params![slot],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| StorageError::Read {
                slot: slot.to_string(),
                reason: err.to_string(),
            })
    }

    fn write_slot(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                r#"
                INSERT INTO storage_slots (slot, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(slot) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![slot, value, now],
            )
            .map(|_| ())
            .map_err(|err| StorageError::Write {
                slot: slot.to_string(),
                reason: err.to_string(),
            })
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
    failing_slot: RefCell<Option<String>>,
}

#[cfg(test)]
impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(self, slot: &str, value: &str) -> Self {
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), value.to_string());
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn set_failing_slot(&self, slot: Option<&str>) {
        *self.failing_slot.borrow_mut() = slot.map(str::to_string);
    }

    pub fn raw(&self, slot: &str) -> Option<String> {
        self.slots.borrow().get(slot).cloned()
    }
}

#[cfg(test)]
impl SlotStorage for MemorySlots {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.borrow().get(slot).cloned())
    }

    fn write_slot(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() || self.failing_slot.borrow().as_deref() == Some(slot) {
            return Err(StorageError::Write {
                slot: slot.to_string(),
                reason: "storage quota exceeded".to_string(),
            });
        }
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_slots_read_back_latest_write() {
        let slots = SqliteSlots::open_in_memory().expect("open in-memory db");
        slots.migrate().expect("migrate");

        assert_eq!(slots.read_slot(PROGRESS_SLOT).expect("read"), None);
        slots.write_slot(PROGRESS_SLOT, "[]").expect("first write");
        slots.write_slot(PROGRESS_SLOT, "[1]").expect("second write");
        assert_eq!(
            slots.read_slot(PROGRESS_SLOT).expect("read").as_deref(),
            Some("[1]")
        );
        assert_eq!(slots.read_slot(WATCHED_SLOT).expect("read"), None);
    }

    #[test]
    fn sqlite_slots_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("watchmark.db");
        {
            let slots = SqliteSlots::open(&path).expect("open");
            slots.migrate().expect("migrate");
            slots
                .write_slot(WATCHED_SLOT, r#"["episode-a-1-1"]"#)
                .expect("write");
        }
        let reopened = SqliteSlots::open(&path).expect("reopen");
        reopened.migrate().expect("migrate again");
        assert_eq!(
            reopened.read_slot(WATCHED_SLOT).expect("read").as_deref(),
            Some(r#"["episode-a-1-1"]"#)
        );
    }

    #[test]
    fn sqlite_slots_report_write_errors_before_migration() {
        let slots = SqliteSlots::open_in_memory().expect("open in-memory db");
        let err = slots
            .write_slot(PROGRESS_SLOT, "[]")
            .expect_err("missing table should fail");
        assert!(matches!(err, StorageError::Write { .. }));
    }

    #[test]
    fn memory_slots_can_simulate_write_failures() {
        let slots = MemorySlots::new().with_slot(PROGRESS_SLOT, "[]");
        slots.set_fail_writes(true);
        assert!(slots.write_slot(PROGRESS_SLOT, "[1]").is_err());
        assert_eq!(slots.raw(PROGRESS_SLOT).as_deref(), Some("[]"));

        slots.set_fail_writes(false);
        slots.write_slot(PROGRESS_SLOT, "[1]").expect("write");
        assert_eq!(slots.raw(PROGRESS_SLOT).as_deref(), Some("[1]"));

        slots.set_failing_slot(Some(WATCHED_SLOT));
        assert!(slots.write_slot(WATCHED_SLOT, "[]").is_err());
        slots.write_slot(PROGRESS_SLOT, "[2]").expect("other slot still writable");
        assert_eq!(slots.raw(WATCHED_SLOT), None);
    }
}
