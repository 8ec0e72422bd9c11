//! Batch reading of selected files with per-file failure isolation.

use indexmap::IndexMap;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::resolve_relative;
use crate::utils::file_detection::is_text_file;

/// Reads selected files relative to a project root.
pub struct FileContentLoader {
    root: PathBuf,
    max_file_size: u64,
}

impl FileContentLoader {
    pub fn new(root: impl Into<PathBuf>, max_file_size_mb: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size: max_file_size_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Reads every path, in request order. Never fails as a whole.
    ///
    /// Directories are left out of the result. Any per-file problem becomes
    /// a placeholder string in that file's entry.
    pub fn read_many(&self, relative_paths: &[String]) -> IndexMap<String, String> {
        let results: Vec<Option<(String, String)>> = relative_paths
            .par_iter()
            .map(|relative| self.read_one(relative))
            .collect();

        results.into_iter().flatten().collect()
    }

    fn read_one(&self, relative: &str) -> Option<(String, String)> {
        let absolute = match resolve_relative(&self.root, relative) {
            Ok((_, absolute)) => absolute,
            Err(e) => return Some((relative.to_string(), format!("[ERROR READING FILE: {e}]"))),
        };

        let metadata = match fs::metadata(&absolute) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Failed to stat {:?}: {}", absolute, e);
                return Some((relative.to_string(), format!("[ERROR READING FILE: {e}]")));
            }
        };
        if metadata.is_dir() {
            tracing::debug!("Skipping directory in content request: {}", relative);
            return None;
        }

        Some((relative.to_string(), self.read_file_content(&absolute, metadata.len())))
    }

    fn read_file_content(&self, path: &Path, len: u64) -> String {
        if len > self.max_file_size {
            return format!("[FILE TOO LARGE: {len} bytes - CONTENT SKIPPED]");
        }
        if !is_text_file(path).unwrap_or(false) {
            return "[BINARY FILE - CONTENT SKIPPED]".to_string();
        }

        match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                format!("[ERROR READING FILE: {e}]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_read_many_skips_directories_and_keeps_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        fs::create_dir(dir.path().join("missingDir")).unwrap();

        let loader = FileContentLoader::new(dir.path(), 20);
        let contents = loader.read_many(&paths(&["b.txt", "missingDir/", "a.txt"]));

        let keys: Vec<_> = contents.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b.txt", "a.txt"]);
        assert_eq!(contents["a.txt"], "alpha");
        assert_eq!(contents["b.txt"], "beta");
    }

    #[test]
    fn test_missing_file_yields_placeholder_without_aborting_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ok.rs"), "fn ok() {}").unwrap();

        let loader = FileContentLoader::new(dir.path(), 20);
        let contents = loader.read_many(&paths(&["gone.rs", "ok.rs", "../escape.rs"]));

        assert!(contents["gone.rs"].starts_with("[ERROR READING FILE:"));
        assert_eq!(contents["ok.rs"], "fn ok() {}");
        assert!(contents["../escape.rs"].contains("escapes the project root"));
    }

    #[test]
    fn test_huge_size_limit_saturates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();

        let loader = FileContentLoader::new(dir.path(), u64::MAX);

        assert_eq!(loader.max_file_size, u64::MAX);
        assert_eq!(loader.read_many(&paths(&["a.txt"]))["a.txt"], "alpha");
    }

    #[test]
    fn test_binary_and_oversized_files_get_placeholders() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("image.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(dir.path().join("big.txt"), vec![b'a'; 2 * 1024 * 1024]).unwrap();

        let loader = FileContentLoader::new(dir.path(), 1);
        let contents = loader.read_many(&paths(&["image.png", "big.txt"]));

        assert_eq!(contents["image.png"], "[BINARY FILE - CONTENT SKIPPED]");
        assert!(contents["big.txt"].starts_with("[FILE TOO LARGE:"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_yields_placeholder() {
        use std::os::unix::fs::PermissionsExt;
        if crate::utils::test_helpers::running_as_root() {
            return;
        }
        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let contents = FileContentLoader::new(dir.path(), 20).read_many(&paths(&["locked.txt"]));

        assert!(contents["locked.txt"].starts_with("[ERROR READING FILE:"));
    }
}
