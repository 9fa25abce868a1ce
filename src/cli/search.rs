use anyhow::Result;

use crate::config::AssistantConfig;
use crate::knowledge::search::{keyword_search, normalize_search_limit};

/// Run a keyword search over the knowledge base from the terminal.
pub fn search(config: &AssistantConfig, query: &str, limit: i64) -> Result<()> {
    let conn = super::open(config)?;
    let limit = normalize_search_limit(limit) as usize;
    let matches = keyword_search(&conn, &config.storage.owner, query, limit)?;

    if matches.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", matches.len());

    for (i, m) in matches.iter().enumerate() {
        println!(
            "  {}. #{} {} [{}]",
            i + 1,
            m.record.id,
            m.record.file_path,
            m.record.folder_date.as_deref().unwrap_or("-"),
        );
        println!("     {}", super::preview(&m.snippet, 160));
        println!();
    }

    Ok(())
}
