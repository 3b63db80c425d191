use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Separator Claude substitutes for `/`, `_` and `.` in project directory names
pub const ENCODED_SEPARATOR: char = '-';

/// Extension of conversation log files
pub const LOG_FILE_EXTENSION: &str = "jsonl";

/// Encodes a file system path into Claude's flattened project directory format
///
/// Lossy: `/`, `_` and `.` all become `-`, which is why decoding is a best guess.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use conversation_scanner::encode_project_dir;
///
/// assert_eq!(encode_project_dir(Path::new("/Users/foo/my_app")), "-Users-foo-my-app");
/// ```
pub fn encode_project_dir(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if matches!(c, '/' | '_' | '.') { ENCODED_SEPARATOR } else { c })
        .collect()
}

/// Naively decodes a flattened project directory name by mapping every separator to `/`
///
/// Returns `None` when the name carries no path information at all (empty or only
/// separators).
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use conversation_scanner::naive_decode;
///
/// assert_eq!(naive_decode("-Users-foo-bar"), Some(PathBuf::from("/Users/foo/bar")));
/// assert_eq!(naive_decode("---"), None);
/// ```
pub fn naive_decode(encoded: &str) -> Option<PathBuf> {
    if encoded.chars().all(|c| c == ENCODED_SEPARATOR) {
        return None;
    }

    let decoded: String =
        encoded.chars().map(|c| if c == ENCODED_SEPARATOR { '/' } else { c }).collect();

    if decoded.starts_with('/') {
        Some(PathBuf::from(decoded))
    } else {
        Some(PathBuf::from(format!("/{}", decoded)))
    }
}

/// Whether a path looks like a conversation log file (`*.jsonl`)
pub fn is_log_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LOG_FILE_EXTENSION)
}

/// Conversation id for a log file: its file stem
pub fn conversation_id_for(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().to_string()).filter(|s| !s.is_empty())
}

/// Rejects symlinks so discovery never follows links out of the projects tree
///
/// # Errors
///
/// Returns an error if the path cannot be inspected or is a symbolic link.
pub fn validate_path_not_symlink(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

    if metadata.file_type().is_symlink() {
        bail!("Path is a symbolic link: {}", path.display());
    }

    Ok(())
}

/// Opens a log file for reading without following a final symlink
///
/// On unix this uses `O_NOFOLLOW`, so a file swapped for a symlink between discovery and
/// open fails here instead of being read.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a regular file.
pub fn safe_open_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }

    let file =
        options.open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
    if !metadata.is_file() {
        bail!("Not a regular file: {}", path.display());
    }

    Ok(file)
}
