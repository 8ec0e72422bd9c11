//! Defines the central, mutable state of one prompt panel.

use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use super::expansion::ExpansionCache;
use super::protocol::HostMessage;
use crate::config::PanelConfig;
use crate::core::prompt::TokenEstimate;
use crate::core::{PromptAssembler, PromptContext, SavedPrompt, TiktokenCounter, TokenCounter};

/// Selected file paths, unique, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFileSet {
    paths: IndexSet<String>,
}

impl SelectedFileSet {
    /// Returns `false` if the path was already selected.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.shift_remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.paths.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }
}

impl FromIterator<String> for SelectedFileSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Holds the complete, mutable state of a panel.
///
/// Wrapped in an `Arc<Mutex<...>>` and shared between the IPC handler, the
/// host tasks and the event loop. Every mutation is followed by a re-render.
pub struct PanelState {
    pub config: PanelConfig,
    pub project_root: Option<PathBuf>,
    pub main_prompt: String,
    pub selection: SelectedFileSet,
    pub expansion: ExpansionCache,
    /// Directories currently shown open. Independent of load state.
    pub expanded_dirs: HashSet<String>,
    pub context: PromptContext,
    pub include_tree: bool,
    pub tree_depth: usize,
    pub search_query: String,
    pub saved_prompts: BTreeMap<String, SavedPrompt>,
    pub status_message: String,
    pub tokenizer: Arc<dyn TokenCounter>,
    /// Bumped on every project switch. Host work records the value it
    /// started under so late responses for an old root can be dropped.
    pub project_generation: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new(PanelConfig::default(), None, Arc::new(TiktokenCounter))
    }
}

impl PanelState {
    pub fn new(
        config: PanelConfig,
        project_root: Option<PathBuf>,
        tokenizer: Arc<dyn TokenCounter>,
    ) -> Self {
        let status_message = match &project_root {
            Some(root) => format!("Project: {}", root.display()),
            None => "No project folder open.".to_string(),
        };
        Self {
            include_tree: config.include_tree_by_default,
            tree_depth: config.default_tree_depth.max(1),
            config,
            project_root,
            main_prompt: String::new(),
            selection: SelectedFileSet::default(),
            expansion: ExpansionCache::default(),
            expanded_dirs: HashSet::new(),
            context: PromptContext::default(),
            search_query: String::new(),
            saved_prompts: BTreeMap::new(),
            status_message,
            tokenizer,
            project_generation: 0,
        }
    }

    /// Switches to another project, dropping everything tied to the old one.
    /// The prompt text and saved prompts survive.
    pub fn reset_project(&mut self, root: Option<PathBuf>) {
        tracing::info!("Switching project root to {:?}", root);
        self.config.last_directory = root.clone();
        self.status_message = match &root {
            Some(root) => format!("Project: {}", root.display()),
            None => "No project folder open.".to_string(),
        };
        self.project_root = root;
        self.project_generation += 1;
        self.selection.clear();
        self.expansion.clear();
        self.expanded_dirs.clear();
        self.context = PromptContext::default();
        self.search_query.clear();
    }

    /// Folds a response produced under `generation` into the state. Returns
    /// `false` when it belongs to a project that is no longer open.
    pub fn apply_host_response(&mut self, generation: u64, message: HostMessage) -> bool {
        if message.is_project_scoped() && generation != self.project_generation {
            tracing::debug!("Dropping response from a previous project");
            return false;
        }
        self.apply_host_message(message);
        true
    }

    /// Folds a host response into the state.
    pub fn apply_host_message(&mut self, message: HostMessage) {
        match message {
            // Listings are replaced in place; other loaded or in-flight
            // directories and the open/closed flags are left alone.
            HostMessage::FileTree(items) => self.expansion.load_tree(items),
            HostMessage::ExpandDirectory(listing) => {
                self.expansion.complete(&listing.parent_path, listing.items);
            }
            HostMessage::FileContents(contents) => self.merge_file_contents(contents),
            HostMessage::CodebaseTree(tree) => {
                self.context.tree_structure = Some(tree);
            }
            HostMessage::PromptSaved(saved) => {
                self.status_message = if saved {
                    "Prompt saved.".to_string()
                } else {
                    "Prompt could not be saved.".to_string()
                };
            }
            HostMessage::PromptList(prompts) => {
                self.saved_prompts = prompts;
            }
        }
    }

    /// Rebuilds `context.files` in selection order. Paths missing from
    /// `contents` keep their previous content; deselected paths are dropped,
    /// so a late response for an old selection cannot resurrect them.
    fn merge_file_contents(&mut self, mut contents: IndexMap<String, String>) {
        let previous = std::mem::take(&mut self.context.files);
        self.context.files = self
            .selection
            .iter()
            .filter_map(|path| {
                contents
                    .swap_remove(path)
                    .or_else(|| previous.get(path).cloned())
                    .map(|content| (path.clone(), content))
            })
            .collect();
    }

    /// The tree summary, only when inclusion is switched on.
    pub fn active_tree(&self) -> Option<&str> {
        if self.include_tree {
            self.context.tree_structure.as_deref()
        } else {
            None
        }
    }

    pub fn assemble_prompt(&self) -> String {
        PromptAssembler::assemble_parts(&self.main_prompt, &self.context.files, self.active_tree())
    }

    pub fn estimate_tokens(&self, text: &str) -> TokenEstimate {
        PromptAssembler::estimate_tokens(
            self.tokenizer.as_ref(),
            text,
            self.config.token_thresholds(),
        )
    }

    /// Restores prompt text, selection and depth from the library. Returns
    /// `false` when no prompt has that name.
    pub fn restore_saved_prompt(&mut self, name: &str) -> bool {
        let Some(record) = self.saved_prompts.get(name).cloned() else {
            return false;
        };
        self.main_prompt = record.prompt;
        self.selection = record.files.into_iter().collect();
        self.tree_depth = record.depth.max(1);
        let selection = &self.selection;
        self.context.files.retain(|path, _| selection.contains(path));
        self.context.tree_structure = None;
        self.status_message = format!("Loaded prompt '{name}'.");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn test_selection_keeps_insertion_order_and_uniqueness() {
        let mut selection = SelectedFileSet::default();
        assert!(selection.insert("b.rs"));
        assert!(selection.insert("a.rs"));
        assert!(!selection.insert("b.rs"));
        assert_eq!(selection.to_vec(), ["b.rs", "a.rs"]);
    }

    #[test]
    fn test_file_contents_follow_selection_order() {
        let mut state = PanelState::default();
        state.selection = ["b.rs".to_string(), "a.rs".to_string()].into_iter().collect();

        state.apply_host_message(HostMessage::FileContents(contents(&[
            ("a.rs", "A"),
            ("b.rs", "B"),
            ("stale.rs", "S"),
        ])));

        let keys: Vec<_> = state.context.files.keys().cloned().collect();
        assert_eq!(keys, ["b.rs", "a.rs"]);
    }

    #[test]
    fn test_late_partial_response_keeps_known_content() {
        let mut state = PanelState::default();
        state.selection = ["a.rs".to_string()].into_iter().collect();
        state.apply_host_message(HostMessage::FileContents(contents(&[("a.rs", "A")])));

        state.selection.insert("b.rs");
        state.apply_host_message(HostMessage::FileContents(contents(&[("b.rs", "B")])));

        assert_eq!(state.context.files, contents(&[("a.rs", "A"), ("b.rs", "B")]));
    }

    #[test]
    fn test_tree_is_only_assembled_when_included() {
        let mut state = PanelState::default();
        state.main_prompt = "Q".to_string();
        state.apply_host_message(HostMessage::CodebaseTree("root/\n".to_string()));

        state.include_tree = false;
        assert_eq!(state.assemble_prompt(), "Q");

        state.include_tree = true;
        assert!(state.assemble_prompt().contains("## Codebase Tree"));
    }

    #[test]
    fn test_restore_saved_prompt() {
        let mut state = PanelState::default();
        state.saved_prompts.insert(
            "review".to_string(),
            SavedPrompt {
                prompt: "Review this".to_string(),
                files: vec!["src/lib.rs".to_string()],
                depth: 3,
            },
        );

        assert!(state.restore_saved_prompt("review"));
        assert!(!state.restore_saved_prompt("missing"));

        assert_eq!(state.main_prompt, "Review this");
        assert_eq!(state.selection.to_vec(), ["src/lib.rs"]);
        assert_eq!(state.tree_depth, 3);
    }

    #[test]
    fn test_tree_refresh_keeps_loaded_and_in_flight_directories() {
        use crate::app::expansion::{ExpansionRequest, LoadState};
        use crate::app::protocol::DirectoryListing;
        use crate::core::TreeEntry;

        let mut state = PanelState::default();
        state.apply_host_message(HostMessage::FileTree(vec![
            TreeEntry::directory("docs", "docs", true),
            TreeEntry::directory("src", "src", true),
        ]));
        state.expanded_dirs.insert("src".to_string());
        state.apply_host_message(HostMessage::ExpandDirectory(DirectoryListing {
            items: vec![TreeEntry::file("lib.rs", "src/lib.rs")],
            parent_path: "src".to_string(),
        }));
        let ExpansionRequest::Pending { issue_request: true, .. } = state.expansion.request("docs")
        else {
            panic!("expected a fresh load of docs");
        };

        state.apply_host_message(HostMessage::FileTree(vec![
            TreeEntry::directory("docs", "docs", true),
            TreeEntry::directory("src", "src", true),
            TreeEntry::file("new.txt", "new.txt"),
        ]));

        assert_eq!(state.expansion.state("src"), LoadState::Loaded);
        assert!(state.expanded_dirs.contains("src"));
        assert_eq!(state.expansion.listing("").map(<[_]>::len), Some(3));
        assert_eq!(state.expansion.state("docs"), LoadState::InFlight);
        assert!(matches!(
            state.expansion.request("docs"),
            ExpansionRequest::Pending { issue_request: false, .. }
        ));
    }

    #[test]
    fn test_responses_from_previous_project_are_dropped() {
        use crate::core::TreeEntry;

        let mut state = PanelState::default();
        state.reset_project(Some(PathBuf::from("/old")));
        let old_generation = state.project_generation;
        state.reset_project(Some(PathBuf::from("/new")));

        let applied = state.apply_host_response(
            old_generation,
            HostMessage::FileTree(vec![TreeEntry::file("old_only.txt", "old_only.txt")]),
        );

        assert!(!applied);
        assert!(state.expansion.listing("").is_none());
        assert!(state.apply_host_response(old_generation, HostMessage::PromptSaved(true)));
        assert!(state.apply_host_response(
            state.project_generation,
            HostMessage::CodebaseTree("new/\n".to_string())
        ));
        assert_eq!(state.context.tree_structure.as_deref(), Some("new/\n"));
    }

    #[test]
    fn test_reset_project_clears_project_scoped_state() {
        let mut state = PanelState::default();
        state.main_prompt = "keep me".to_string();
        state.selection.insert("a.rs");
        state.expanded_dirs.insert("src".to_string());

        state.reset_project(Some(PathBuf::from("/tmp/other")));

        assert!(state.selection.is_empty());
        assert!(state.expanded_dirs.is_empty());
        assert_eq!(state.main_prompt, "keep me");
        assert_eq!(state.config.last_directory, Some(PathBuf::from("/tmp/other")));
    }
}
