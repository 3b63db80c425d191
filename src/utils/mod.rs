pub mod environment;
pub mod paths;
pub mod terminal;

pub use environment::get_claude_dir;
pub use paths::{
    conversation_id_for, encode_project_dir, is_log_file, naive_decode,
    safe_open_file, validate_path_not_symlink,
};
