use std::fs;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{ConversationMetadata, RecordKind};
use crate::parsers::record::parse_record_line;
use crate::parsers::title::{choose_title, clean_title, is_continuation_text};
use crate::utils::{conversation_id_for, safe_open_file};

/// Record identifiers seen in one conversation, collected during the metadata pass
///
/// Kept alongside the metadata so a full scan can build the cross-reference index and
/// resolve parents without reading any file a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordLinks {
    /// Every `uuid` in file order
    pub record_ids: Vec<String>,
    /// Every `parentUuid` in file order
    pub parent_refs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedConversation {
    pub metadata: ConversationMetadata,
    pub links: RecordLinks,
}

/// Parse one conversation log into its metadata
///
/// `source_directory` is the already-decoded project path for the log's directory.
/// Filesystem-derived fields are always refreshed. With `extract_content == false` every
/// content-derived field (and `parent_id`) is carried over from `previous` and the file is
/// never opened. With `extract_content == true` the file is read line by line; malformed
/// lines are logged and skipped without aborting the file.
///
/// # Errors
///
/// Returns an error if the file has no usable stem, cannot be stat'ed, or cannot be opened
/// or read (I/O failure, not a malformed line).
pub fn parse_conversation_file(
    path: &Path,
    source_directory: &str,
    extract_content: bool,
    previous: Option<&ConversationMetadata>,
) -> Result<ParsedConversation> {
    let id = conversation_id_for(path)
        .with_context(|| format!("Log file has no usable name: {}", path.display()))?;

    let stat =
        fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    let last_modified_at: DateTime<Utc> = stat
        .modified()
        .with_context(|| format!("Failed to read mtime of {}", path.display()))?
        .into();
    let birth_time: Option<DateTime<Utc>> = stat.created().ok().map(Into::into);

    let mut metadata = match previous {
        Some(prev) if !extract_content => prev.clone(),
        _ => ConversationMetadata::new(&id, path),
    };
    metadata.id = id;
    metadata.file_path = path.to_path_buf();
    metadata.created_at = match previous {
        // No birth time on this filesystem: keep what the content pass settled on
        Some(prev) if birth_time.is_none() && !extract_content => prev.created_at,
        _ => creation_time(birth_time, None, last_modified_at),
    };
    metadata.last_modified_at = last_modified_at;
    metadata.file_size_bytes = stat.len();
    metadata.source_directory = source_directory.to_string();

    if !extract_content {
        return Ok(ParsedConversation { metadata, links: RecordLinks::default() });
    }

    let (links, first_timestamp) = extract_content_fields(path, &mut metadata, previous)?;
    metadata.created_at = creation_time(birth_time, first_timestamp, last_modified_at);
    Ok(ParsedConversation { metadata, links })
}

/// Birth time when the filesystem records one, else the first record's timestamp, else mtime
fn creation_time(
    birth_time: Option<DateTime<Utc>>,
    first_record: Option<DateTime<Utc>>,
    last_modified_at: DateTime<Utc>,
) -> DateTime<Utc> {
    birth_time.or(first_record).unwrap_or(last_modified_at)
}

fn extract_content_fields(
    path: &Path,
    metadata: &mut ConversationMetadata,
    previous: Option<&ConversationMetadata>,
) -> Result<(RecordLinks, Option<DateTime<Utc>>)> {
    let file = safe_open_file(path)?;
    let reader = BufReader::new(file);

    let mut links = RecordLinks::default();
    let mut record_count = 0;
    let mut skipped_count = 0;
    let mut leaf_id = None;
    let mut first_summary_seen = false;
    let mut parent_leaf_id = None;
    let mut summary = None;
    let mut first_user_text = None;
    let mut is_continuation = false;
    let mut is_sidechain = None;
    let mut embedded_name = None;
    let mut first_timestamp = None;

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                debug!(file = %path.display(), line = line_num + 1, "skipping non-UTF-8 line");
                skipped_count += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let record = match parse_record_line(&line) {
            Ok(record) => record,
            Err(e) => {
                debug!(file = %path.display(), line = line_num + 1, error = %e, "skipping malformed line");
                skipped_count += 1;
                continue;
            }
        };
        record_count += 1;

        if let Some(record_id) = &record.record_id {
            links.record_ids.push(record_id.clone());
        }
        if let Some(parent_ref) = &record.parent_record_id {
            links.parent_refs.push(parent_ref.clone());
        }
        if record.leaf_id.is_some() {
            leaf_id = record.leaf_id.clone();
        }
        if is_sidechain.is_none() {
            is_sidechain = record.is_sidechain;
        }
        if first_timestamp.is_none() {
            first_timestamp = record.timestamp;
        }
        if record.content.as_deref().is_some_and(is_continuation_text) {
            is_continuation = true;
        }

        match record.kind {
            RecordKind::Summary if !first_summary_seen => {
                first_summary_seen = true;
                parent_leaf_id = record.leaf_id;
                summary = record.summary;
            }
            RecordKind::User if first_user_text.is_none() => {
                first_user_text = record.content;
            }
            RecordKind::CustomTitle if embedded_name.is_none() => {
                embedded_name = record.custom_title;
            }
            _ => {}
        }
    }

    if skipped_count > 0 {
        debug!(
            file = %path.display(),
            records = record_count,
            skipped = skipped_count,
            "parsed conversation with skipped lines"
        );
    }

    let cleaned = first_user_text.as_deref().and_then(clean_title);
    metadata.title = choose_title(cleaned, summary.as_deref(), is_continuation);
    metadata.summary = summary;
    metadata.is_continuation_summary = is_continuation;
    metadata.is_sidechain = is_sidechain.unwrap_or(false);
    metadata.record_count = record_count;
    metadata.leaf_id = leaf_id;
    metadata.parent_leaf_id = parent_leaf_id;
    metadata.custom_name = embedded_name.or_else(|| previous.and_then(|p| p.custom_name.clone()));

    Ok((links, first_timestamp))
}
