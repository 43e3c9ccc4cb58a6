//! File and directory operations.

use crate::system::{FileOperations, OpOutcome};
use std::fs;
use std::path::Path;
use tracing::error;

/// Direct filesystem implementation of [`FileOperations`].
#[derive(Default)]
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }
}

impl FileOperations for FileManager {
    fn create_directory(&self, path: &str) -> OpOutcome {
        match fs::create_dir_all(path) {
            Ok(()) => OpOutcome::ok(format!("Directory created: {path}")),
            Err(e) => {
                error!("Failed to create directory {}: {}", path, e);
                OpOutcome::fail(e.to_string())
            }
        }
    }

    fn create_file(&self, path: &str) -> OpOutcome {
        // Touch semantics: an existing file is left alone.
        match fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(_) => OpOutcome::ok(format!("File created: {path}")),
            Err(e) => {
                error!("Failed to create file {}: {}", path, e);
                OpOutcome::fail(e.to_string())
            }
        }
    }

    fn move_path(&self, source: &str, dest: &str) -> OpOutcome {
        match fs::rename(source, dest) {
            Ok(()) => OpOutcome::ok(format!("Moved {source} to {dest}")),
            Err(e) => {
                error!("Failed to move {} to {}: {}", source, dest, e);
                OpOutcome::fail(e.to_string())
            }
        }
    }

    fn delete_path(&self, path: &str) -> OpOutcome {
        let target = Path::new(path);
        let result = if target.is_dir() {
            fs::remove_dir_all(target).map(|()| format!("Directory deleted: {path}"))
        } else {
            fs::remove_file(target).map(|()| format!("File deleted: {path}"))
        };

        match result {
            Ok(message) => OpOutcome::ok(message),
            Err(e) => {
                error!("Failed to delete {}: {}", path, e);
                OpOutcome::fail(e.to_string())
            }
        }
    }

    fn find(&self, pattern: &str, directory: &str) -> OpOutcome {
        let needle = pattern.to_lowercase();
        let mut matches = Vec::new();
        if let Err(e) = find_recursive(Path::new(directory), &needle, &mut matches, 0) {
            error!("Find failed in {}: {}", directory, e);
            return OpOutcome::fail(e.to_string());
        }

        if matches.is_empty() {
            OpOutcome::ok(format!("No matches for '{pattern}' in {directory}"))
        } else {
            matches.truncate(20);
            OpOutcome::ok(format!("Found:\n{}", matches.join("\n")))
        }
    }

    fn list_directory(&self, path: &str) -> OpOutcome {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to list {}: {}", path, e);
                return OpOutcome::fail(e.to_string());
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let suffix = if entry.path().is_dir() { "/" } else { "" };
                format!("{}{suffix}", entry.file_name().to_string_lossy())
            })
            .collect();
        names.sort();

        if names.is_empty() {
            OpOutcome::ok(format!("{path} is empty"))
        } else {
            OpOutcome::ok(names.join("\n"))
        }
    }
}

const MAX_FIND_DEPTH: usize = 3;

fn find_recursive(
    dir: &Path,
    needle: &str,
    matches: &mut Vec<String>,
    depth: usize,
) -> std::io::Result<()> {
    if depth > MAX_FIND_DEPTH || matches.len() >= 20 {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().to_lowercase().contains(needle) {
            matches.push(path.display().to_string());
        }
        if path.is_dir() {
            // Unreadable subdirectories are skipped, not fatal.
            let _ = find_recursive(&path, needle, matches, depth + 1);
        }
    }
    Ok(())
}
