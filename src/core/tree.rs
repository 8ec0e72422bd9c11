//! Ignore-aware directory listing in three modes: full, one level, and
//! depth-bounded.

use std::fs;
use std::path::{Path, PathBuf};

use super::{join_relative, resolve_relative, sort_entries, CoreError, EntryKind, IgnoreFilter, TreeEntry};

/// Lists a project directory while applying an [`IgnoreFilter`].
pub struct DirectoryTreeBuilder {
    root: PathBuf,
    filter: IgnoreFilter,
}

/// A raw, already-filtered directory entry before it becomes a `TreeEntry`.
struct ListedEntry {
    name: String,
    path: String,
    kind: EntryKind,
    /// Symlinked directories are listed but never descended into.
    is_symlink: bool,
}

impl DirectoryTreeBuilder {
    pub fn new(root: impl Into<PathBuf>, filter: IgnoreFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filter(&self) -> &IgnoreFilter {
        &self.filter
    }

    /// Walks the whole tree, populating `children` at every directory level.
    ///
    /// Ignored directories are pruned without being read. A read error on a
    /// subdirectory leaves it with an empty listing; only an unreadable root
    /// is an error.
    pub fn build_full(&self) -> Result<Vec<TreeEntry>, CoreError> {
        let listed = self.list_level("", &self.root)?;
        Ok(self.build_recursive(listed, None, 1))
    }

    /// Lists only the immediate children of `directory` (relative, `""` for
    /// the root). Child directories report whether they contain at least one
    /// non-ignored entry, without being expanded.
    pub fn expand_one(&self, directory: &str) -> Result<Vec<TreeEntry>, CoreError> {
        let (relative, absolute) = resolve_relative(&self.root, directory)?;
        if !absolute.is_dir() {
            return Err(CoreError::NotADirectory(absolute));
        }
        let listed = self.list_level(&relative, &absolute)?;
        let mut entries: Vec<TreeEntry> = listed
            .into_iter()
            .map(|item| match item.kind {
                EntryKind::File => TreeEntry::file(item.name, item.path),
                EntryKind::Directory => {
                    let has_children =
                        !item.is_symlink && self.has_visible_child(&item.path);
                    TreeEntry::directory(item.name, item.path, has_children)
                }
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Like [`build_full`](Self::build_full) but stops after `max_depth`
    /// levels. Directories on the boundary appear without children.
    pub fn build_bounded(&self, max_depth: usize) -> Result<Vec<TreeEntry>, CoreError> {
        if max_depth == 0 {
            return Ok(Vec::new());
        }
        let listed = self.list_level("", &self.root)?;
        Ok(self.build_recursive(listed, Some(max_depth), 1))
    }

    fn build_recursive(
        &self,
        listed: Vec<ListedEntry>,
        max_depth: Option<usize>,
        depth: usize,
    ) -> Vec<TreeEntry> {
        let mut entries: Vec<TreeEntry> = listed
            .into_iter()
            .map(|item| match item.kind {
                EntryKind::File => TreeEntry::file(item.name, item.path),
                EntryKind::Directory => {
                    let at_boundary = max_depth.is_some_and(|max| depth >= max);
                    if at_boundary {
                        return TreeEntry::directory(item.name, item.path, false);
                    }
                    let children = if item.is_symlink {
                        Vec::new()
                    } else {
                        let absolute = self.root.join(&item.path);
                        match self.list_level(&item.path, &absolute) {
                            Ok(sub) => self.build_recursive(sub, max_depth, depth + 1),
                            Err(e) => {
                                tracing::debug!("Skipping unreadable directory: {}", e);
                                Vec::new()
                            }
                        }
                    };
                    TreeEntry {
                        name: item.name,
                        path: item.path,
                        kind: EntryKind::Directory,
                        has_children: !children.is_empty(),
                        children: Some(children),
                    }
                }
            })
            .collect();
        sort_entries(&mut entries);
        entries
    }

    /// Reads one directory level and drops ignored entries.
    fn list_level(&self, relative: &str, absolute: &Path) -> Result<Vec<ListedEntry>, CoreError> {
        let read_dir =
            fs::read_dir(absolute).map_err(|e| CoreError::Io(e, absolute.to_path_buf()))?;

        let mut listed = Vec::new();
        for entry in read_dir.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let is_symlink = file_type.is_symlink();
            let is_dir = if is_symlink {
                fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false)
            } else {
                file_type.is_dir()
            };

            let path = join_relative(relative, &name);
            if self.filter.is_ignored(&path, is_dir) {
                continue;
            }
            listed.push(ListedEntry {
                name,
                path,
                kind: if is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                is_symlink,
            });
        }
        Ok(listed)
    }

    fn has_visible_child(&self, relative: &str) -> bool {
        let absolute = self.root.join(relative);
        match self.list_level(relative, &absolute) {
            Ok(listed) => !listed.is_empty(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn project(files: &[&str], dirs: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        for d in dirs {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        for f in files {
            let path = dir.path().join(f);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        dir
    }

    fn builder(dir: &TempDir) -> DirectoryTreeBuilder {
        DirectoryTreeBuilder::new(dir.path(), IgnoreFilter::load(dir.path()))
    }

    fn names(entries: &[TreeEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_build_full_nests_and_sorts() {
        let dir = project(&["b.txt", "a.txt", "src/main.rs", "src/util/mod.rs"], &[]);
        let tree = builder(&dir).build_full().unwrap();

        assert_eq!(names(&tree), ["src", "a.txt", "b.txt"]);
        let src = &tree[0];
        assert!(src.has_children);
        let children = src.children.as_ref().unwrap();
        assert_eq!(names(children), ["util", "main.rs"]);
        assert_eq!(children[0].path, "src/util");
        assert_eq!(children[0].children.as_ref().unwrap()[0].path, "src/util/mod.rs");
    }

    #[test]
    fn test_build_full_never_descends_into_ignored_directories() {
        let dir = project(&["node_modules/pkg/index.js", "src/lib.rs"], &[]);
        fs::write(dir.path().join(".promptignore"), "src/\n!src/lib.rs\n").unwrap();

        let tree = builder(&dir).build_full().unwrap();

        // `.promptignore` itself is a visible file; the ignored dirs are gone.
        assert_eq!(names(&tree), [".promptignore"]);
    }

    #[test]
    fn test_directory_with_only_ignored_entries_reports_no_children() {
        let dir = project(&["logs/a.log", "logs/b.log", "main.rs"], &[]);

        let full = builder(&dir).build_full().unwrap();
        let logs = full.iter().find(|e| e.name == "logs").unwrap();
        assert!(!logs.has_children);
        assert_eq!(logs.children.as_deref(), Some(&[][..]));

        let level = builder(&dir).expand_one("").unwrap();
        let logs = level.iter().find(|e| e.name == "logs").unwrap();
        assert!(!logs.has_children);
        assert!(logs.children.is_none());
    }

    #[test]
    fn test_expand_one_lists_single_level() {
        let dir = project(&["src/main.rs", "src/deep/x.rs", "README.md"], &["src/empty"]);
        let b = builder(&dir);

        let root = b.expand_one("").unwrap();
        assert_eq!(names(&root), ["src", "README.md"]);
        assert!(root[0].has_children);
        assert!(root[0].children.is_none());

        let src = b.expand_one("src/").unwrap();
        assert_eq!(names(&src), ["deep", "empty", "main.rs"]);
        assert_eq!(src[0].path, "src/deep");
        assert!(src[0].has_children);
        assert!(!src[1].has_children);
    }

    #[test]
    fn test_expand_one_rejects_paths_outside_root() {
        let dir = project(&["a.txt"], &[]);
        assert!(matches!(
            builder(&dir).expand_one("../"),
            Err(CoreError::OutsideRoot(_))
        ));
        assert!(matches!(
            builder(&dir).expand_one("a.txt"),
            Err(CoreError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_build_bounded_stops_at_depth() {
        let dir = project(&["top.txt", "a/mid.txt", "a/b/deep.txt"], &[]);
        let b = builder(&dir);

        let one = b.build_bounded(1).unwrap();
        assert_eq!(names(&one), ["a", "top.txt"]);
        assert!(!one[0].has_children);
        assert!(one[0].children.is_none());

        let two = b.build_bounded(2).unwrap();
        let a_children = two[0].children.as_ref().unwrap();
        assert_eq!(names(a_children), ["b", "mid.txt"]);
        assert!(a_children[0].children.is_none());

        assert!(b.build_bounded(0).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_does_not_abort_siblings() {
        use std::os::unix::fs::PermissionsExt;
        if crate::utils::test_helpers::running_as_root() {
            return;
        }
        let dir = project(&["locked/secret.txt", "open/file.txt"], &[]);
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let tree = builder(&dir).build_full();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let tree = tree.unwrap();
        assert_eq!(names(&tree), ["locked", "open"]);
        assert_eq!(tree[0].children.as_deref(), Some(&[][..]));
        assert_eq!(names(tree[1].children.as_ref().unwrap()), ["file.txt"]);
    }
}
