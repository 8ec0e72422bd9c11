pub mod error;
pub mod file_loader;
pub mod ignore;
pub mod library;
pub mod prompt;
pub mod tree;
pub mod tree_generator;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

pub use error::CoreError;
pub use file_loader::FileContentLoader;
pub use ignore::{IgnoreFilter, IgnoreSource};
pub use library::{JsonPromptStore, PromptStore, SavedPrompt};
pub use prompt::{PromptAssembler, PromptContext, TiktokenCounter, TokenCounter, TokenStatus};
pub use tree::DirectoryTreeBuilder;
pub use tree_generator::TreeGenerator;

/// Whether a tree entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of the project tree as exposed to the UI.
///
/// `path` is POSIX-style and relative to the project root. `children` is only
/// ever `Some` for directories, and only once that level has been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
            has_children: false,
            children: None,
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<String>, has_children: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            has_children,
            children: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Sibling order used everywhere: directories first, then by name
/// case-insensitively, with a case-sensitive tie break.
pub fn compare_entries(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    match (a.is_directory(), b.is_directory()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

pub fn sort_entries(entries: &mut [TreeEntry]) {
    entries.sort_by(compare_entries);
}

/// Joins a POSIX relative parent path and a child name.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Normalizes a UI-supplied relative path into the POSIX form used as a
/// cache key.
///
/// Leading `./`, trailing slashes and backslashes are tolerated; absolute
/// paths and `..` components are rejected.
pub fn clean_relative(relative: &str) -> Result<String, CoreError> {
    let normalized = relative.replace('\\', "/");
    let trimmed = normalized.trim_matches('/');
    let mut parts = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            _ => return Err(CoreError::OutsideRoot(relative.to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// [`clean_relative`], plus the absolute path under `root`.
pub fn resolve_relative(root: &Path, relative: &str) -> Result<(String, PathBuf), CoreError> {
    let clean = clean_relative(relative)?;
    let absolute = clean
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part));
    Ok((clean, absolute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_entries_puts_directories_first() {
        let mut entries = vec![
            TreeEntry::directory("dirB", "dirB", false),
            TreeEntry::file("fileA", "fileA"),
            TreeEntry::directory("dirA", "dirA", false),
            TreeEntry::file("fileB", "fileB"),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["dirA", "dirB", "fileA", "fileB"]);
    }

    #[test]
    fn test_sort_is_case_insensitive() {
        let mut entries = vec![
            TreeEntry::file("b.rs", "b.rs"),
            TreeEntry::file("A.rs", "A.rs"),
            TreeEntry::file("a.rs", "a.rs"),
        ];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A.rs", "a.rs", "b.rs"]);
    }

    #[test]
    fn test_resolve_relative_normalizes_and_rejects_parent_dirs() {
        let root = Path::new("/project");
        let (clean, abs) = resolve_relative(root, "./src/components/").unwrap();
        assert_eq!(clean, "src/components");
        assert_eq!(abs, PathBuf::from("/project/src/components"));

        let (clean, abs) = resolve_relative(root, "").unwrap();
        assert_eq!(clean, "");
        assert_eq!(abs, PathBuf::from("/project"));

        assert!(matches!(
            resolve_relative(root, "../secret"),
            Err(CoreError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_tree_entry_serializes_with_wire_names() {
        let entry = TreeEntry::directory("src", "src", true);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "directory");
        assert_eq!(json["hasChildren"], true);
        assert!(json.get("children").is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sorted_siblings_keep_directories_before_files(
                raw in proptest::collection::vec(("[a-zA-Z]{1,6}", any::<bool>()), 0..24)
            ) {
                let mut entries: Vec<TreeEntry> = raw
                    .iter()
                    .map(|(name, is_dir)| if *is_dir {
                        TreeEntry::directory(name.clone(), name.clone(), false)
                    } else {
                        TreeEntry::file(name.clone(), name.clone())
                    })
                    .collect();
                sort_entries(&mut entries);

                let first_file = entries.iter().position(|e| !e.is_directory()).unwrap_or(entries.len());
                prop_assert!(entries[first_file..].iter().all(|e| !e.is_directory()));
                for pair in entries.windows(2) {
                    prop_assert_ne!(compare_entries(&pair[0], &pair[1]), Ordering::Greater);
                }
            }
        }
    }
}
