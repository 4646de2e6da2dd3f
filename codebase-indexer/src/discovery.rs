use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use coderag_code_chunker::Language;
use log::debug;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// Source files under `root`, as sorted `/`-separated relative paths.
///
/// Skipped directories are never descended into, unknown languages are
/// ignored and unreadable entries are logged and passed over.
pub fn discover_files(root: &Path, config: &IndexerConfig) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(IndexerError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !config.skips_dir(&entry.file_name().to_string_lossy())
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() || !Language::from_path(entry.path()).is_known() {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative_path_string(relative));
        }
    }

    files.sort();
    Ok(files)
}

fn relative_path_string(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_discovery() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();

        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("src/nested/lib.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/app.py"), "def main(): pass").unwrap();
        fs::write(root.join("README.md"), "ignored").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "ignored").unwrap();
        fs::write(root.join(".git/hook.py"), "ignored").unwrap();

        let files = discover_files(root, &IndexerConfig::default()).unwrap();
        assert_eq!(files, vec!["main.go", "src/app.py", "src/nested/lib.rs"]);
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(matches!(
            discover_files(&missing, &IndexerConfig::default()),
            Err(IndexerError::InvalidPath(_))
        ));
    }
}
