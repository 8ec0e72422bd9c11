//! Ignore-pattern handling for tree listings.
//!
//! Rules come from the project's ignore file (`.promptignore`, else
//! `.gitignore`), followed by any extra patterns from the configuration, and
//! finally the built-in list. Evaluation follows gitignore semantics: the last
//! matching rule decides, so the built-ins always win.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Project-specific ignore file, preferred when present.
pub const PROJECT_IGNORE_FILE: &str = ".promptignore";
/// Version-control ignore file used as the fallback.
pub const VCS_IGNORE_FILE: &str = ".gitignore";

/// Always appended after file-based rules; cannot be negated by the user.
pub const BUILTIN_IGNORE_PATTERNS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    ".vscode",
    ".idea",
    "*.log",
    ".DS_Store",
    "Thumbs.db",
    "__pycache__",
    "*.pyc",
];

/// Which rule source ended up active for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreSource {
    /// Rules were read from this file.
    File(PathBuf),
    /// No ignore file exists; only built-ins apply.
    BuiltinOnly,
    /// An ignore file exists but could not be used.
    Degraded { path: PathBuf, reason: String },
}

impl fmt::Display for IgnoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreSource::File(path) => write!(
                f,
                "Using {} for ignore patterns (plus built-in exclusions).",
                display_name(path)
            ),
            IgnoreSource::BuiltinOnly => write!(
                f,
                "No {PROJECT_IGNORE_FILE} or {VCS_IGNORE_FILE} found. Using built-in exclusions only."
            ),
            IgnoreSource::Degraded { path, reason } => write!(
                f,
                "Could not use {} ({reason}). Using built-in exclusions only.",
                display_name(path)
            ),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Answers "is this relative path excluded?" for one project root.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    matcher: Gitignore,
    source: IgnoreSource,
}

impl IgnoreFilter {
    /// Loads the filter for `root` with no extra configured patterns.
    pub fn load(root: &Path) -> Self {
        Self::load_with_extra(root, &[])
    }

    /// Loads the filter for `root`, appending `extra` patterns between the
    /// file-based rules and the built-ins. Never fails.
    pub fn load_with_extra(root: &Path, extra: &[String]) -> Self {
        let candidate = [PROJECT_IGNORE_FILE, VCS_IGNORE_FILE]
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file());

        let (file_rules, source) = match candidate {
            None => (Vec::new(), IgnoreSource::BuiltinOnly),
            Some(path) => match fs::read_to_string(&path) {
                Ok(content) => {
                    let lines: Vec<String> = content.lines().map(str::to_string).collect();
                    (lines, IgnoreSource::File(path))
                }
                Err(e) => {
                    tracing::warn!("Failed to read ignore file {:?}: {}", path, e);
                    let reason = e.to_string();
                    (Vec::new(), IgnoreSource::Degraded { path, reason })
                }
            },
        };

        match Self::build(root, &file_rules, extra) {
            Ok(matcher) => Self { matcher, source },
            Err(e) => {
                let path = match &source {
                    IgnoreSource::File(path) => path.clone(),
                    _ => root.join(PROJECT_IGNORE_FILE),
                };
                tracing::warn!(
                    "Malformed ignore rules in {:?}: {}. Falling back to built-in exclusions.",
                    path,
                    e
                );
                let matcher = Self::build(root, &[], &[]).unwrap_or_else(|e| {
                    tracing::error!("Failed to build built-in ignore rules: {}", e);
                    Gitignore::empty()
                });
                Self {
                    matcher,
                    source: IgnoreSource::Degraded {
                        path,
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn build(
        root: &Path,
        file_rules: &[String],
        extra: &[String],
    ) -> Result<Gitignore, ignore::Error> {
        let mut builder = GitignoreBuilder::new(root);
        // Blank lines and `#` comments are skipped by the builder itself.
        for line in file_rules.iter().chain(extra) {
            builder.add_line(None, line)?;
        }
        for pattern in BUILTIN_IGNORE_PATTERNS {
            builder.add_line(None, pattern)?;
        }
        builder.build()
    }

    /// Returns `true` if `relative_path` (POSIX, relative to the root) or any
    /// of its ancestor directories is excluded. The root itself never is.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        let trimmed = relative_path.trim_matches('/');
        if trimmed.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(Path::new(trimmed), is_dir)
            .is_ignore()
    }

    /// The rule source that ended up active.
    pub fn source(&self) -> &IgnoreSource {
        &self.source
    }

    /// Human-readable description for the `getIgnoreInfo` notification.
    pub fn describe(&self) -> String {
        self.source.to_string()
    }
}
