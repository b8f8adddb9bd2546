use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS stable_snapshots (
      user_id TEXT NOT NULL,
      snapshot_date TEXT NOT NULL,
      -- JSON objects: label -> count
      initial_by_category TEXT NOT NULL,
      initial_by_sub_category TEXT NOT NULL,
      completed_by_category TEXT NOT NULL DEFAULT '{}',
      completed_by_sub_category TEXT NOT NULL DEFAULT '{}',
      -- JSON array of card ids counted as due
      due_card_ids TEXT NOT NULL DEFAULT '[]',
      updated_at TEXT NOT NULL,
      PRIMARY KEY (user_id, snapshot_date)
    );

    CREATE INDEX IF NOT EXISTS idx_stable_snapshots_date ON stable_snapshots(snapshot_date);
    "#,
    )
}
