use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::ProjectLogFile;
use crate::utils::{conversation_id_for, is_log_file, validate_path_not_symlink};

/// Name of the directory under the Claude dir holding one subdirectory per project
pub const PROJECTS_DIR_NAME: &str = "projects";

/// Discover every conversation log under `<claude_dir>/projects/*/`
///
/// Returns a flat list of log files paired with their encoded project directory name,
/// sorted by path. Returns an empty Vec if the projects directory doesn't exist (not an
/// error).
///
/// Skipped silently: non-directory entries at the top level and non-`.jsonl` files.
/// Skipped with a warning: symlinked project directories or log files, unreadable project
/// directories, and log files whose id was already seen in another project directory.
///
/// # Errors
///
/// Returns an error only if the projects directory exists but cannot be read.
pub fn discover_log_files(claude_dir: &Path) -> Result<Vec<ProjectLogFile>> {
    let projects_dir = claude_dir.join(PROJECTS_DIR_NAME);

    if !projects_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&projects_dir)
        .with_context(|| format!("Failed to read projects directory: {}", projects_dir.display()))?;

    let mut project_dirs: Vec<_> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!(error = %e, "failed to read entry in projects directory");
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect();
    project_dirs.sort();

    let mut logs = Vec::new();
    let mut seen_ids = HashSet::new();

    for project_dir in project_dirs {
        let Some(encoded_dir) = project_dir.file_name().map(|n| n.to_string_lossy().to_string())
        else {
            continue;
        };

        if let Err(e) = validate_path_not_symlink(&project_dir) {
            warn!(project = %encoded_dir, error = %e, "skipping project directory (symlink not allowed)");
            continue;
        }

        let files = match fs::read_dir(&project_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %project_dir.display(), error = %e, "failed to read project directory");
                continue;
            }
        };

        let mut log_paths: Vec<_> =
            files.flatten().map(|file| file.path()).filter(|path| is_log_file(path)).collect();
        log_paths.sort();

        for log_path in log_paths {
            if let Err(e) = validate_path_not_symlink(&log_path) {
                warn!(file = %log_path.display(), error = %e, "skipping log file (symlink not allowed)");
                continue;
            }
            if !log_path.is_file() {
                continue;
            }
            let Some(id) = conversation_id_for(&log_path) else {
                continue;
            };
            if !seen_ids.insert(id.clone()) {
                warn!(file = %log_path.display(), id = %id, "duplicate conversation id, ignoring");
                continue;
            }

            logs.push(ProjectLogFile { id, log_path, encoded_dir: encoded_dir.clone() });
        }
    }

    Ok(logs)
}
