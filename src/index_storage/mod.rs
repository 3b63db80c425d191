//! Persistent conversation cache
//!
//! - `conversation-cache.json`: known ids, last scan time and per-id metadata
//! - `conversation-cache.json.lock`: advisory lock held by a running scan
//! - `conversation-names.json`: user display-name overrides
//!
//! Default location: a per-Claude-dir subdirectory of the platform cache directory
//! - macOS: `~/Library/Caches/conversation-scanner/<hash>/`
//! - Linux: `~/.cache/conversation-scanner/<hash>/`
//! - Windows: `%LOCALAPPDATA%\conversation-scanner\<hash>\`

pub mod display_names;
pub mod lock;
pub mod metadata;
pub mod persistence;

pub use display_names::{DisplayNames, NameOverrides};
pub use lock::CacheLock;
pub use metadata::ConversationCache;
pub use persistence::CacheStore;
