//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use crate::config::AssistantConfig;
use crate::db;

pub fn doctor(config: &AssistantConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `assistant serve` or `assistant sync` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;
    let stored_model = db::migrations::get_embedding_model(&conn)?;
    let mismatch = db::migrations::embedding_model_mismatch(&conn, &config.embedding.model)?;

    println!("Assistant Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!("Owner:             {}", config.storage.owner);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", stored_model.as_deref().unwrap_or("(nothing embedded yet)"));
    println!("  Configured:      {}", config.embedding.model);
    if mismatch.is_some() {
        println!("  WARNING: model mismatch!");
        println!("  POST /knowledge/embed with force=true to refresh vectors.");
    } else if stored_model.is_some() {
        println!("  Status:          OK (match)");
    }
    println!();
    println!("Providers:");
    println!("  Chat:            {}", key_status(config.chat.api_key.as_deref()));
    println!("  Embeddings:      {}", key_status(config.embedding.api_key.as_deref()));
    println!();
    println!("Row counts:");
    println!("  Tasks:           {}", report.task_count);
    println!("  Completions:     {}", report.completion_count);
    println!("  Radar items:     {}", report.radar_count);
    println!("  Knowledge items: {}", report.knowledge_item_count);
    println!(
        "  Chunks:          {} ({} embedded)",
        report.knowledge_chunk_count, report.embedded_chunk_count
    );
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED");
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or delete the database and run `assistant sync` to rebuild it.");
    }

    Ok(())
}

fn key_status(key: Option<&str>) -> &'static str {
    match key {
        Some(k) if !k.trim().is_empty() => "configured",
        _ => "disabled (no API key)",
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
