mod helpers;

use assistant::db;
use assistant::db::migrations::{
    embedding_model_mismatch, get_embedding_model, get_schema_version, run_migrations,
    set_embedding_model, CURRENT_SCHEMA_VERSION,
};

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(get_embedding_model(&conn).unwrap(), None);
}

#[test]
fn fresh_db_reports_no_model_mismatch_for_any_configured_model() {
    let dir = tempfile::tempdir().unwrap();
    let conn = db::open_database(dir.path().join("assistant.db")).unwrap();
    assert_eq!(embedding_model_mismatch(&conn, "text-embedding-3-large").unwrap(), None);
    assert_eq!(embedding_model_mismatch(&conn, "nomic-embed-text").unwrap(), None);

    set_embedding_model(&conn, "text-embedding-3-large").unwrap();
    assert_eq!(embedding_model_mismatch(&conn, "text-embedding-3-large").unwrap(), None);
    assert_eq!(
        embedding_model_mismatch(&conn, "nomic-embed-text").unwrap().as_deref(),
        Some("text-embedding-3-large")
    );
}

#[test]
fn migrations_are_idempotent() {
    let conn = helpers::test_db();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn v1_database_upgrades() {
    db::load_sqlite_vec();
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 1);
    assert!(get_embedding_model(&conn).unwrap().is_none());

    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(get_embedding_model(&conn).unwrap().is_none());
}

#[test]
fn on_disk_database_is_created_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("assistant.db");

    {
        let conn = db::open_database(&path).unwrap();
        conn.execute(
            "INSERT INTO radar_items (owner, title, priority, created_at, updated_at)
             VALUES ('default', 'persisted', 3, 'now', 'now')",
            [],
        )
        .unwrap();
        set_embedding_model(&conn, "custom-model").unwrap();
    }
    assert!(path.exists());

    let conn = db::open_database(&path).unwrap();
    let journal: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
    assert_eq!(journal.to_lowercase(), "wal");
    assert_eq!(get_embedding_model(&conn).unwrap().as_deref(), Some("custom-model"));

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.radar_count, 1);
    assert_eq!(report.task_count, 0);
    assert!(!report.sqlite_vec_version.is_empty());
}

#[test]
fn health_counts_embedded_chunks() {
    let conn = helpers::test_db();
    let item = helpers::insert_item(&conn, "a.json", None, "text", "2025-01-01T00:00:00Z");
    conn.execute(
        "INSERT INTO knowledge_chunks
             (owner, item_id, chunk_index, text, embedding, created_at, updated_at)
         VALUES ('default', ?1, 0, 'a', X'0000803F', 'now', 'now'),
                ('default', ?1, 1, 'b', NULL, 'now', 'now')",
        [item],
    )
    .unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.knowledge_item_count, 1);
    assert_eq!(report.knowledge_chunk_count, 2);
    assert_eq!(report.embedded_chunk_count, 1);
}

#[test]
fn deleting_an_item_cascades_to_chunks() {
    let conn = helpers::test_db();
    let item = helpers::insert_item(&conn, "a.json", None, "text", "2025-01-01T00:00:00Z");
    conn.execute(
        "INSERT INTO knowledge_chunks (owner, item_id, chunk_index, text, created_at, updated_at)
         VALUES ('default', ?1, 0, 'a', 'now', 'now')",
        [item],
    )
    .unwrap();

    conn.execute("DELETE FROM knowledge_items WHERE id = ?1", [item]).unwrap();
    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM knowledge_chunks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 0);
}
