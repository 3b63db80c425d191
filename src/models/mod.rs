//! Data models for the conversation scanner.
//!
//! - [`ConversationRecord`] - One decoded log line, ephemeral during parsing
//! - [`ConversationMetadata`] - Cached per-file metadata, one entry per log file
//! - [`ConversationNode`] - Nested forest node handed to callers
//! - [`ProjectLogFile`] - A discovered log file and its encoded project directory
//!
//! Serialization of the cached shapes lives here; the cache document itself is in
//! [`crate::index_storage`].

pub mod conversation;
pub mod project;
pub mod record;

pub use conversation::{
    ConversationMap, ConversationMetadata, ConversationNode, UNKNOWN_SOURCE_DIRECTORY,
};
pub use project::ProjectLogFile;
pub use record::{ConversationRecord, RecordKind};
