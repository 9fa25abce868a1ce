//! Forward-only schema migrations.
//!
//! `schema_meta.schema_version` starts at 1 (the tables in [`super::schema`])
//! and each step in [`MIGRATIONS`] moves it up by one inside a transaction.
//!
//! History:
//! - v1: tasks, completions, radar, knowledge items and chunks.
//! - v2: database-wide embedding model record. Backfilled from the newest
//!   embedded chunk; left unset until vectors exist.

use rusqlite::{Connection, OptionalExtension};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

type Step = fn(&Connection) -> rusqlite::Result<()>;

/// `(target version, step)` in ascending order.
const MIGRATIONS: &[(u32, Step)] = &[(2, track_embedding_model)];

pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let value: String = conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    Ok(value.parse().unwrap_or(0))
}

/// Model that produced the stored vectors, once any chunk has been embedded.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get(0),
    )
    .optional()
}

/// Record the model of the vectors just written.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES ('embedding_model', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [model],
    )?;
    Ok(())
}

/// The stored model when it differs from `configured`; `None` when they match
/// or nothing has been embedded yet.
pub fn embedding_model_mismatch(
    conn: &Connection,
    configured: &str,
) -> rusqlite::Result<Option<String>> {
    Ok(get_embedding_model(conn)?.filter(|stored| stored != configured))
}

/// Apply every step above the stored version.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = get_schema_version(conn)?;

    for &(target, step) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!(from = target - 1, to = target, "running migration");
        let tx = conn.unchecked_transaction()?;
        step(&tx)?;
        tx.execute(
            "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
            [target.to_string()],
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn track_embedding_model(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_chunks_model ON knowledge_chunks(embedding_model);
         INSERT OR IGNORE INTO schema_meta (key, value)
             SELECT 'embedding_model', embedding_model FROM knowledge_chunks
             WHERE embedding IS NOT NULL AND embedding_model IS NOT NULL
             ORDER BY id DESC LIMIT 1;",
    )
}
