//! Turns arbitrary JSON documents into line-oriented searchable text.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Arrays longer than this are cut when flattening.
pub const MAX_LIST_ITEMS: usize = 50;

/// Upper bound on flattened text, in characters.
pub const MAX_TEXT_CHARS: usize = 200_000;

/// Flatten `value` into one line per non-empty scalar.
///
/// Each line carries the path that led to it: `key: ` for object members and
/// `[i] ` for array elements, e.g. `steps: [0] title: Grant access`.
pub fn flatten_json(value: &Value) -> String {
    let mut lines = Vec::new();
    walk(value, String::new(), &mut lines);
    let text = lines.join("\n");
    truncate_chars(&text, MAX_TEXT_CHARS).to_string()
}

fn walk(value: &Value, prefix: String, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, format!("{prefix}{key}: "), lines);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().take(MAX_LIST_ITEMS).enumerate() {
                walk(child, format!("{prefix}[{i}] "), lines);
            }
        }
        Value::Null => {}
        Value::String(s) => push_scalar(&prefix, s, lines),
        Value::Bool(b) => push_scalar(&prefix, &b.to_string(), lines),
        Value::Number(n) => push_scalar(&prefix, &n.to_string(), lines),
    }
}

fn push_scalar(prefix: &str, raw: &str, lines: &mut Vec<String>) {
    let text = raw.replace('\n', " ");
    let text = text.trim();
    if !text.is_empty() {
        lines.push(format!("{prefix}{text}"));
    }
}

/// Compact serialization, member order preserved.
pub fn compact_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Lower-case hex SHA-256 digest.
pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// The longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
