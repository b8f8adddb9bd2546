//! SQLite-backed stable snapshot storage

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::schema::run_migrations;
use crate::error::{Error, Result};
use crate::session::{SnapshotStore, StableSnapshot};

/// Snapshot store over a single SQLite connection.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("snapshot database lock poisoned".to_string()))
    }
}

/// Raw column values, decoded outside the rusqlite row closure.
struct SnapshotRow {
    snapshot_date: String,
    initial_by_category: String,
    initial_by_sub_category: String,
    completed_by_category: String,
    completed_by_sub_category: String,
    due_card_ids: String,
}

fn read_row(row: &Row) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        snapshot_date: row.get(0)?,
        initial_by_category: row.get(1)?,
        initial_by_sub_category: row.get(2)?,
        completed_by_category: row.get(3)?,
        completed_by_sub_category: row.get(4)?,
        due_card_ids: row.get(5)?,
    })
}

impl SnapshotRow {
    fn decode(self) -> Result<StableSnapshot> {
        let date = self
            .snapshot_date
            .parse::<NaiveDate>()
            .map_err(|e| Error::Storage(format!("bad snapshot date {:?}: {}", self.snapshot_date, e)))?;

        Ok(StableSnapshot {
            date,
            initial_due_count_by_category: serde_json::from_str::<BTreeMap<String, u32>>(&self.initial_by_category)?,
            initial_due_count_by_sub_category: serde_json::from_str(&self.initial_by_sub_category)?,
            completed_count_by_category: serde_json::from_str(&self.completed_by_category)?,
            completed_count_by_sub_category: serde_json::from_str(&self.completed_by_sub_category)?,
            due_card_ids: serde_json::from_str::<BTreeSet<String>>(&self.due_card_ids)?,
        })
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, user_id: &str, date: NaiveDate) -> Result<Option<StableSnapshot>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                r#"
        SELECT snapshot_date, initial_by_category, initial_by_sub_category,
               completed_by_category, completed_by_sub_category, due_card_ids
        FROM stable_snapshots
        WHERE user_id = ?1 AND snapshot_date = ?2
        "#,
                params![user_id, date.to_string()],
                read_row,
            )
            .optional()?;

        row.map(SnapshotRow::decode).transpose()
    }

    fn save(&self, user_id: &str, snapshot: &StableSnapshot) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
      INSERT INTO stable_snapshots
        (user_id, snapshot_date, initial_by_category, initial_by_sub_category,
         completed_by_category, completed_by_sub_category, due_card_ids, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(user_id, snapshot_date) DO UPDATE SET
        initial_by_category = excluded.initial_by_category,
        initial_by_sub_category = excluded.initial_by_sub_category,
        completed_by_category = excluded.completed_by_category,
        completed_by_sub_category = excluded.completed_by_sub_category,
        due_card_ids = excluded.due_card_ids,
        updated_at = excluded.updated_at
      "#,
            params![
                user_id,
                snapshot.date.to_string(),
                serde_json::to_string(&snapshot.initial_due_count_by_category)?,
                serde_json::to_string(&snapshot.initial_due_count_by_sub_category)?,
                serde_json::to_string(&snapshot.completed_count_by_category)?,
                serde_json::to_string(&snapshot.completed_count_by_sub_category)?,
                serde_json::to_string(&snapshot.due_card_ids)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn prune_before(&self, date: NaiveDate) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM stable_snapshots WHERE snapshot_date < ?1",
            params![date.to_string()],
        )?;
        if removed > 0 {
            tracing::debug!("Pruned {} stale stable snapshots", removed);
        }
        Ok(removed)
    }
}
