//! JSONL parsers for conversation logs
//!
//! # Error Handling Strategy
//!
//! - **Individual line failures**: Malformed JSON lines are logged at `debug` and skipped.
//!   A bad line never aborts the file, and only valid lines count toward `record_count`.
//!
//! - **File failures**: A file that cannot be stat'ed, opened or read returns an error with
//!   the path in its context. The scanner logs it and leaves that conversation out of the
//!   pass.
//!
//! - **Shape normalization**: Every historical message shape is collapsed into a single
//!   text payload in [`record`], so the metadata pass in [`conversation`] never branches
//!   on the raw layout.

pub mod conversation;
pub mod deserializers;
pub mod record;
pub mod title;

pub use conversation::{ParsedConversation, RecordLinks, parse_conversation_file};
pub use record::{parse_record_line, read_first_line_cwd};
