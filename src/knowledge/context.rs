//! Bounded context block assembled from retrieved records.

use super::flatten::truncate_chars;
use super::types::ContextRecord;

pub const DEFAULT_CONTEXT_CHARS: usize = 6000;
pub const MAX_BODY_CHARS: usize = 2000;
const SEPARATOR: &str = "\n---\n";

/// Render records as `[MEMORY ...]` sections joined by `---`.
///
/// Each body is cut to [`MAX_BODY_CHARS`]. Records are added in order until the
/// next one would push the running size past `max_chars`; that record and all
/// after it are left out.
pub fn build_context_block(records: &[ContextRecord], max_chars: usize) -> String {
    let mut pieces: Vec<String> = Vec::new();
    let mut total = 0;

    for record in records {
        let header = format!(
            "[MEMORY id={} file={} folder={}]\n",
            record.id,
            record.file_path,
            record.folder_date.as_deref().unwrap_or("-")
        );
        let body = truncate_chars(&record.content_text, MAX_BODY_CHARS).trim();
        let piece = format!("{header}{body}\n");
        let len = piece.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        pieces.push(piece);
    }

    pieces.join(SEPARATOR).trim().to_string()
}
