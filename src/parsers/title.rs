//! Title extraction and continuation-boilerplate cleanup.
//!
//! When a conversation is resumed after running out of context, its first user message is
//! a generated preamble rather than something the user typed. The cleanup is a cascade:
//! each step only runs if the previous one failed to produce a usable title.

/// Text that marks a record as a generated continuation summary
pub const CONTINUATION_MARKER: &str = "continued from a previous conversation";

/// Opening sentence of the generated continuation preamble
pub const CONTINUATION_PREFIX: &str = "This session is being continued from a previous conversation";

const ANALYSIS_LABEL: &str = "Analysis:";
const SUMMARY_LABEL: &str = "Summary:";

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Whether a piece of content carries the continuation marker
pub fn is_continuation_text(text: &str) -> bool {
    text.contains(CONTINUATION_MARKER)
}

/// Clean the first user message into a title
///
/// Text that does not start with the continuation preamble is returned trimmed. Otherwise,
/// in order: the segment after `Analysis:` (up to `Summary:`), the segment after
/// `Summary:`, everything after the first line. `None` when nothing usable remains.
pub fn clean_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with(CONTINUATION_PREFIX) {
        return non_empty(trimmed);
    }

    if let Some(start) = trimmed.find(ANALYSIS_LABEL) {
        let after = &trimmed[start + ANALYSIS_LABEL.len()..];
        let segment = match after.find(SUMMARY_LABEL) {
            Some(end) => &after[..end],
            None => after,
        };
        if let Some(title) = non_empty(segment) {
            return Some(title);
        }
    }

    if let Some(start) = trimmed.find(SUMMARY_LABEL)
        && let Some(title) = non_empty(&trimmed[start + SUMMARY_LABEL.len()..])
    {
        return Some(title);
    }

    trimmed.split_once('\n').and_then(|(_, rest)| non_empty(rest))
}

/// Pick the final title from the cleaned first message and the summary record
///
/// Falls back to the summary when no title was found, prefers the summary for continuation
/// conversations whose title still carries the marker, and finally strips any leftover
/// marker sentence.
pub fn choose_title(
    cleaned: Option<String>,
    summary: Option<&str>,
    is_continuation: bool,
) -> Option<String> {
    let mut title = cleaned.or_else(|| summary.map(str::to_string));

    if is_continuation
        && let Some(summary) = summary
        && title.as_deref().is_some_and(is_continuation_text)
    {
        title = Some(summary.to_string());
    }

    if let Some(current) = title.as_deref()
        && is_continuation_text(current)
    {
        title = strip_marker_sentence(current);
    }

    title.map(|t| truncate_title(&collapse_whitespace(&t)))
}

/// Remove the sentence containing the continuation marker
fn strip_marker_sentence(text: &str) -> Option<String> {
    let Some(marker_at) = text.find(CONTINUATION_MARKER) else {
        return non_empty(text);
    };

    let sentence_start = text[..marker_at]
        .rfind(['.', '!', '?', '\n'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let after_marker = marker_at + CONTINUATION_MARKER.len();
    let sentence_end = text[after_marker..]
        .find(['.', '!', '?', '\n', ':'])
        .map(|i| after_marker + i + 1)
        .unwrap_or(text.len());

    let mut remaining = String::with_capacity(text.len());
    remaining.push_str(text[..sentence_start].trim_end());
    if !remaining.is_empty() {
        remaining.push(' ');
    }
    remaining.push_str(text[sentence_end..].trim_start());
    non_empty(&remaining)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_title(text: &str) -> String {
    if text.chars().count() <= MAX_TITLE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_TITLE_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
