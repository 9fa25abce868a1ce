//! Local directory sync: walk the knowledge directory for JSON files and
//! upsert each one whose content hash changed.
//!
//! Files are visited in sorted path order. A failure on one file is recorded
//! in the result and the walk continues.

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::flatten::{compact_json, flatten_json, sha256_hex};
use super::types::{SyncError, SyncResult, LOCAL_SOURCE};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Created,
    Updated,
    Unchanged,
}

pub fn sync_local(
    conn: &Connection,
    owner: &str,
    dir: &Path,
    dry_run: bool,
) -> AppResult<SyncResult> {
    sync_local_with_progress(conn, owner, dir, dry_run, |_| {})
}

/// Same as [`sync_local`], calling `progress` with each relative path before it is processed.
pub fn sync_local_with_progress(
    conn: &Connection,
    owner: &str,
    dir: &Path,
    dry_run: bool,
    mut progress: impl FnMut(&str),
) -> AppResult<SyncResult> {
    if !dir.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "knowledge directory not found: {}",
            dir.display()
        )));
    }

    let mut result = SyncResult {
        ok: true,
        scanned_files: 0,
        created: 0,
        updated: 0,
        unchanged: 0,
        errors: 0,
        knowledge_dir: dir.display().to_string(),
        errors_detail: Vec::new(),
    };

    let (files, walk_errors) = collect_json_files(dir);
    for e in walk_errors {
        warn!(file = %e.file, error = %e.error, "knowledge directory walk failed");
        result.errors += 1;
        result.errors_detail.push(e);
    }

    for path in files {
        result.scanned_files += 1;
        let rel = relative_path(dir, &path);
        progress(&rel);

        match sync_file(conn, owner, dir, &path, &rel, dry_run) {
            Ok(FileOutcome::Created) => result.created += 1,
            Ok(FileOutcome::Updated) => result.updated += 1,
            Ok(FileOutcome::Unchanged) => result.unchanged += 1,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "knowledge file sync failed");
                result.errors += 1;
                result.errors_detail.push(SyncError {
                    file: path.display().to_string(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    info!(
        dir = %dir.display(),
        scanned = result.scanned_files,
        created = result.created,
        updated = result.updated,
        unchanged = result.unchanged,
        errors = result.errors,
        dry_run,
        "knowledge sync finished"
    );
    Ok(result)
}

fn sync_file(
    conn: &Connection,
    owner: &str,
    root: &Path,
    path: &Path,
    rel: &str,
    dry_run: bool,
) -> anyhow::Result<FileOutcome> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&contents).context("invalid JSON")?;
    let raw = compact_json(&doc)?;
    let content_hash = sha256_hex(&raw);

    let existing: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT id, content_hash FROM knowledge_items
             WHERE owner = ?1 AND source = ?2 AND file_path = ?3",
            params![owner, LOCAL_SOURCE, rel],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((_, Some(stored))) = &existing {
        if *stored == content_hash {
            debug!(file = rel, "unchanged");
            return Ok(FileOutcome::Unchanged);
        }
    }

    if dry_run {
        return Ok(if existing.is_some() {
            FileOutcome::Updated
        } else {
            FileOutcome::Created
        });
    }

    let text = flatten_json(&doc);
    let folder_date = folder_label(root, path);
    let now = now_timestamp();

    match existing {
        Some((id, _)) => {
            conn.execute(
                "UPDATE knowledge_items
                 SET folder_date = ?1, content_text = ?2, content_hash = ?3, raw_json = ?4,
                     last_synced_at = ?5, updated_at = ?5
                 WHERE id = ?6",
                params![folder_date, text, content_hash, raw, now, id],
            )?;
            debug!(item_id = id, file = rel, "knowledge item updated");
            Ok(FileOutcome::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO knowledge_items
                 (owner, source, file_path, folder_date, content_text, content_hash, raw_json,
                  last_synced_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)",
                params![owner, LOCAL_SOURCE, rel, folder_date, text, content_hash, raw, now],
            )?;
            debug!(item_id = conn.last_insert_rowid(), file = rel, "knowledge item created");
            Ok(FileOutcome::Created)
        }
    }
}

/// All `*.json` entries under `root`, sorted by path, plus the entries the
/// walk could not read. Symlinks are listed, not followed, so a dangling one
/// fails when read.
fn collect_json_files(root: &Path) -> (Vec<PathBuf>, Vec<SyncError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        match entry {
            Ok(e) if e.file_type().is_dir() => {}
            Ok(e) => {
                let path = e.into_path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    files.push(path);
                }
            }
            Err(e) => errors.push(SyncError {
                file: e.path().unwrap_or(root).display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    files.sort();
    (files, errors)
}

/// Path relative to `root`, `/`-separated.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of the containing folder, or `None` for files directly in `root`.
fn folder_label(root: &Path, path: &Path) -> Option<String> {
    let parent = path.parent()?;
    if parent == root {
        return None;
    }
    parent.file_name().map(|n| n.to_string_lossy().into_owned())
}
