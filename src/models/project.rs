use std::path::PathBuf;

/// A conversation log discovered under `projects/`, paired with its encoded directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLogFile {
    pub id: String,
    pub log_path: PathBuf,
    pub encoded_dir: String,
}
