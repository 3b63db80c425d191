use chrono::{DateTime, Utc};

/// Discriminator of a log line (`type` field)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    User,
    Assistant,
    Summary,
    System,
    CustomTitle,
    Other(String),
}

impl RecordKind {
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("user") => Self::User,
            Some("assistant") => Self::Assistant,
            Some("summary") => Self::Summary,
            Some("system") => Self::System,
            Some("custom-title") => Self::CustomTitle,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

/// One decoded line of a conversation log
///
/// Exists only while a single file is being parsed. `content` is already normalized to
/// plain text regardless of which historical message shape the line used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub kind: RecordKind,
    pub record_id: Option<String>,
    pub parent_record_id: Option<String>,
    pub leaf_id: Option<String>,
    pub cwd: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub custom_title: Option<String>,
    pub is_sidechain: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
}
