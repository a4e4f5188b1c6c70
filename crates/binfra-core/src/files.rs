//! SQL DDL file discovery and statement splitting.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Errors from file discovery and splitting.
#[derive(Error, Debug)]
pub enum FilesError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to walk directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("File not found in mapping: {0}")]
    NotFound(String),
}

/// Map file names under `root` to their full paths, recursively.
///
/// A file name that appears in more than one directory is disambiguated by
/// prefixing the parent directory: `directory_filename.sql`.
pub fn file_mapping(root: impl AsRef<Path>) -> Result<HashMap<String, PathBuf>, FilesError> {
    let mut mapping: HashMap<String, PathBuf> = HashMap::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path().to_path_buf();

        if mapping.contains_key(&file_name) {
            let directory = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|d| d.to_string_lossy().to_string())
                .unwrap_or_default();
            mapping.insert(format!("{}_{}", directory, file_name), path);
        } else {
            mapping.insert(file_name, path);
        }
    }

    Ok(mapping)
}

/// Read a SQL file and split it into individual statements.
///
/// Statements are split on `;`, trimmed, and re-terminated; empty fragments
/// are dropped.
pub fn sql_commands(path: impl AsRef<Path>) -> Result<Vec<String>, FilesError> {
    let contents = fs::read_to_string(path)?;

    let commands = contents
        .split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("{};", fragment))
        .collect();

    Ok(commands)
}

/// Split the file registered under `name` in a [`file_mapping`].
pub fn sql_commands_by_name(
    name: &str,
    mapping: &HashMap<String, PathBuf>,
) -> Result<Vec<String>, FilesError> {
    let path = mapping
        .get(name)
        .ok_or_else(|| FilesError::NotFound(name.to_string()))?;
    sql_commands(path)
}
