//! Line-level decoding of conversation logs.
//!
//! Message text has appeared in several shapes over time:
//!
//! - `{"message": {"content": "text"}}`
//! - `{"message": {"content": [{"type": "text", "text": "..."}, ...]}}`
//! - `{"content": "text"}` or `{"message": "text"}` on older and system records
//!
//! [`parse_record_line`] collapses all of them into [`ConversationRecord::content`] so
//! nothing downstream ever inspects the raw shape.

use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{ConversationRecord, RecordKind};
use crate::utils::safe_open_file;

const CONTENT_TYPE_TEXT: &str = "text";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type", default)]
    record_type: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default)]
    leaf_uuid: Option<String>,
    #[serde(default)]
    cwd: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    custom_title: Option<Value>,
    #[serde(default)]
    is_sidechain: Option<bool>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_optional_timestamp")]
    timestamp: Option<DateTime<Utc>>,
}

impl From<RawRecord> for ConversationRecord {
    fn from(raw: RawRecord) -> Self {
        let content = normalize_content(raw.message.as_ref(), raw.content.as_ref());
        Self {
            kind: RecordKind::from_type(raw.record_type.as_deref()),
            record_id: raw.uuid.filter(|s| !s.is_empty()),
            parent_record_id: raw.parent_uuid.filter(|s| !s.is_empty()),
            leaf_id: raw.leaf_uuid.filter(|s| !s.is_empty()),
            cwd: raw.cwd.as_ref().and_then(non_empty_str),
            content,
            summary: raw.summary.as_ref().and_then(non_empty_str),
            custom_title: raw.custom_title.as_ref().and_then(non_empty_str),
            is_sidechain: raw.is_sidechain,
            timestamp: raw.timestamp,
        }
    }
}

/// Decode one log line into a normalized record
///
/// # Errors
///
/// Fails if the line is not a JSON object or a recognized field has the wrong type
/// (for example a numeric `uuid`).
pub fn parse_record_line(line: &str) -> serde_json::Result<ConversationRecord> {
    serde_json::from_str::<RawRecord>(line).map(ConversationRecord::from)
}

/// Read the `cwd` recorded on the first line of a log file, if any
///
/// Only the first line is read; this is the cheap verification step used when a project
/// directory name cannot be decoded unambiguously.
pub fn read_first_line_cwd(path: &Path) -> Option<String> {
    let file = safe_open_file(path).ok()?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line).ok()?;
    parse_record_line(first_line.trim()).ok()?.cwd
}

fn normalize_content(message: Option<&Value>, content: Option<&Value>) -> Option<String> {
    let from_message = match message {
        Some(Value::Object(map)) => map.get("content").and_then(text_from_value),
        Some(Value::String(s)) => non_empty(s),
        _ => None,
    };
    from_message.or_else(|| content.and_then(text_from_value))
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(map) => {
                        let is_text = map.get("type").and_then(Value::as_str)
                            == Some(CONTENT_TYPE_TEXT);
                        if is_text { map.get("text").and_then(Value::as_str) } else { None }
                    }
                    _ => None,
                })
                .filter(|s| !s.trim().is_empty())
                .collect();
            if parts.is_empty() { None } else { Some(parts.join("\n")) }
        }
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s.to_string()) }
}
