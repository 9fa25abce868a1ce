//! SQL DDL for all assistant tables.
//!
//! Defines `tasks`, `task_completions`, `radar_items`, `knowledge_items`,
//! `knowledge_chunks`, and `schema_meta`. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Agenda: one-off and recurring tasks
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    notes TEXT,
    priority INTEGER NOT NULL DEFAULT 3 CHECK(priority BETWEEN 1 AND 5),
    kind TEXT NOT NULL CHECK(kind IN ('one_off','recurring')),
    due_date TEXT,
    start_date TEXT,
    rrule TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (
        (kind = 'one_off' AND due_date IS NOT NULL AND start_date IS NULL AND rrule IS NULL)
        OR (kind = 'recurring' AND due_date IS NULL
            AND start_date IS NOT NULL AND rrule IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
CREATE INDEX IF NOT EXISTS idx_tasks_kind ON tasks(kind);
CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
CREATE INDEX IF NOT EXISTS idx_tasks_start_date ON tasks(start_date);

-- Done markers, one per (owner, task, occurrence date)
CREATE TABLE IF NOT EXISTS task_completions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    occurrence_date TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    UNIQUE(owner, task_id, occurrence_date)
);

CREATE INDEX IF NOT EXISTS idx_completions_owner ON task_completions(owner);
CREATE INDEX IF NOT EXISTS idx_completions_task ON task_completions(task_id);
CREATE INDEX IF NOT EXISTS idx_completions_date ON task_completions(occurrence_date);

-- Radar: unscheduled prioritized notes
CREATE TABLE IF NOT EXISTS radar_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    notes TEXT,
    priority INTEGER NOT NULL DEFAULT 3 CHECK(priority BETWEEN 1 AND 5),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_radar_owner ON radar_items(owner);

-- Knowledge base: one row per ingested JSON file
CREATE TABLE IF NOT EXISTS knowledge_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT 'localfs',
    file_path TEXT NOT NULL,
    folder_date TEXT,
    content_text TEXT,
    content_hash TEXT,
    raw_json TEXT,
    last_synced_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(owner, source, file_path)
);

CREATE INDEX IF NOT EXISTS idx_knowledge_owner ON knowledge_items(owner);
CREATE INDEX IF NOT EXISTS idx_knowledge_folder ON knowledge_items(folder_date);
CREATE INDEX IF NOT EXISTS idx_knowledge_updated ON knowledge_items(updated_at);

-- Bounded slices of knowledge text, optionally embedded (little-endian f32 blob)
CREATE TABLE IF NOT EXISTS knowledge_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    item_id INTEGER NOT NULL REFERENCES knowledge_items(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    text_hash TEXT,
    embedding BLOB,
    embedding_model TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_owner ON knowledge_chunks(owner);
CREATE INDEX IF NOT EXISTS idx_chunks_item ON knowledge_chunks(item_id);
CREATE INDEX IF NOT EXISTS idx_chunks_text_hash ON knowledge_chunks(text_hash);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "tasks",
            "task_completions",
            "radar_items",
            "knowledge_items",
            "knowledge_chunks",
            "schema_meta",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }

        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn task_shape_is_enforced() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        // one-off with a rule attached violates the fixed record shape
        let err = conn.execute(
            "INSERT INTO tasks \
             (owner, title, priority, kind, due_date, rrule, created_at, updated_at) \
             VALUES ('default', 'x', 3, 'one_off', '2024-01-01', 'FREQ=DAILY', 'now', 'now')",
            [],
        );
        assert!(err.is_err());
    }
}
