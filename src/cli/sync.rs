//! CLI `sync` command: ingest the knowledge directory from the terminal.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::config::AssistantConfig;
use crate::knowledge::sync::sync_local_with_progress;

pub fn sync(config: &AssistantConfig, dry_run: bool) -> Result<()> {
    let conn = super::open(config)?;
    let dir = config.resolved_knowledge_dir();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {pos} files  {msg}")
            .context("invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = sync_local_with_progress(&conn, &config.storage.owner, &dir, dry_run, |rel| {
        pb.inc(1);
        pb.set_message(rel.to_string());
    });
    pb.finish_and_clear();
    let result = result.with_context(|| format!("sync of {} failed", dir.display()))?;

    if dry_run {
        println!("Dry run: nothing was written.");
    }
    println!("Knowledge dir:     {}", result.knowledge_dir);
    println!("Scanned files:     {}", result.scanned_files);
    println!("  Created:         {}", result.created);
    println!("  Updated:         {}", result.updated);
    println!("  Unchanged:       {}", result.unchanged);
    println!("  Errors:          {}", result.errors);

    if !result.errors_detail.is_empty() {
        println!();
        println!("Errors:");
        for e in &result.errors_detail {
            println!("  {}: {}", e.file, e.error);
        }
    }

    Ok(())
}
