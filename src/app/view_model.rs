//! Responsible for transforming the `PanelState` into a `UiState` view model.
//!
//! `render` is pure: the same state always yields the same description, and
//! the final prompt and token estimate are recomputed from scratch each time.

use serde::Serialize;

use super::expansion::LoadState;
use super::state::PanelState;
use crate::core::prompt::TokenStatus;
use crate::core::TreeEntry;

/// Upper bound on rows in the file search dropdown.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Characters of file content shown in a context preview.
pub const PREVIEW_CHARS: usize = 200;

/// A serializable representation of the panel for the UI.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UiState {
    pub project_root: Option<String>,
    pub is_tree_loading: bool,
    pub tree: Vec<TreeNodeView>,
    pub search_query: String,
    pub search_results: Vec<SearchResultView>,
    pub selected_files: Vec<SelectedFileView>,
    pub main_prompt: String,
    pub include_tree: bool,
    pub tree_depth: usize,
    pub tree_preview: Option<String>,
    pub final_prompt: String,
    pub token_count: Option<usize>,
    pub token_label: String,
    pub token_status: TokenStatus,
    pub saved_prompts: Vec<String>,
    pub status_message: String,
}

/// A single node in the file tree as the UI draws it.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TreeNodeView {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub has_children: bool,
    pub is_expanded: bool,
    pub is_loading: bool,
    pub is_selected: bool,
    pub children: Vec<TreeNodeView>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SearchResultView {
    pub name: String,
    pub path: String,
    pub is_selected: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectedFileView {
    pub name: String,
    pub path: String,
    /// `None` until the content has arrived.
    pub preview: Option<String>,
}

/// Creates the complete `UiState` from the current `PanelState`.
pub fn render(state: &PanelState) -> UiState {
    let final_prompt = state.assemble_prompt();
    let estimate = state.estimate_tokens(&final_prompt);

    UiState {
        project_root: state
            .project_root
            .as_ref()
            .map(|root| root.display().to_string()),
        is_tree_loading: state.expansion.state("") == LoadState::InFlight,
        tree: build_tree_nodes(state, ""),
        search_query: state.search_query.clone(),
        search_results: search_results(state),
        selected_files: selected_files(state),
        main_prompt: state.main_prompt.clone(),
        include_tree: state.include_tree,
        tree_depth: state.tree_depth,
        tree_preview: state.active_tree().map(str::to_string),
        final_prompt,
        token_count: estimate.count,
        token_label: estimate.label(),
        token_status: estimate.status,
        saved_prompts: state.saved_prompts.keys().cloned().collect(),
        status_message: state.status_message.clone(),
    }
}

/// Builds the visible tree from cached listings. Collapsed directories keep
/// their cache entry but render no children.
fn build_tree_nodes(state: &PanelState, directory: &str) -> Vec<TreeNodeView> {
    let Some(listing) = state.expansion.listing(directory) else {
        return Vec::new();
    };
    listing
        .iter()
        .map(|entry| {
            let is_expanded = entry.is_directory() && state.expanded_dirs.contains(&entry.path);
            let children = if is_expanded {
                build_tree_nodes(state, &entry.path)
            } else {
                Vec::new()
            };
            TreeNodeView {
                name: entry.name.clone(),
                path: entry.path.clone(),
                is_directory: entry.is_directory(),
                has_children: entry.has_children,
                is_expanded,
                is_loading: is_expanded
                    && state.expansion.state(&entry.path) == LoadState::InFlight,
                is_selected: state.selection.contains(&entry.path),
                children,
            }
        })
        .collect()
}

/// Case-insensitive substring match on the path of every known file.
fn search_results(state: &PanelState) -> Vec<SearchResultView> {
    let query = state.search_query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    state
        .expansion
        .known_files()
        .into_iter()
        .filter(|entry| entry.path.to_lowercase().contains(&query))
        .take(MAX_SEARCH_RESULTS)
        .map(|entry: &TreeEntry| SearchResultView {
            name: entry.name.clone(),
            path: entry.path.clone(),
            is_selected: state.selection.contains(&entry.path),
        })
        .collect()
}

fn selected_files(state: &PanelState) -> Vec<SelectedFileView> {
    state
        .selection
        .iter()
        .map(|path| SelectedFileView {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.clone(),
            preview: state.context.files.get(path).map(|c| truncate_preview(c)),
        })
        .collect()
}

/// First [`PREVIEW_CHARS`] characters, with `...` appended when cut.
pub fn truncate_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::protocol::{DirectoryListing, HostMessage};
    use crate::core::{CoreError, TokenCounter};
    use std::sync::Arc;

    struct CharCounter;

    impl TokenCounter for CharCounter {
        fn count_tokens(&self, text: &str) -> Result<usize, CoreError> {
            Ok(text.chars().count())
        }
    }

    fn state() -> PanelState {
        let mut state = PanelState::new(Default::default(), None, Arc::new(CharCounter));
        state.apply_host_message(HostMessage::FileTree(vec![
            TreeEntry::directory("src", "src", true),
            TreeEntry::file("README.md", "README.md"),
        ]));
        state.apply_host_message(HostMessage::ExpandDirectory(DirectoryListing {
            items: vec![TreeEntry::file("Main.rs", "src/Main.rs")],
            parent_path: "src".to_string(),
        }));
        state
    }

    #[test]
    fn test_collapsed_directory_renders_without_children() {
        let mut state = state();

        let ui = render(&state);
        assert!(!ui.tree[0].is_expanded);
        assert!(ui.tree[0].children.is_empty());

        state.expanded_dirs.insert("src".to_string());
        let ui = render(&state);
        assert_eq!(ui.tree[0].children[0].path, "src/Main.rs");
    }

    #[test]
    fn test_search_matches_known_files_case_insensitively() {
        let mut state = state();
        assert!(render(&state).search_results.is_empty());

        state.search_query = "MAIN".to_string();
        let results = render(&state).search_results;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "src/Main.rs");
    }

    #[test]
    fn test_render_reflects_current_prompt_and_tokens() {
        let mut state = state();
        state.main_prompt = "Hello".to_string();

        let ui = render(&state);

        assert_eq!(ui.final_prompt, "Hello");
        assert_eq!(ui.token_count, Some(5));
        assert_eq!(ui.token_label, "5 tokens");
        assert_eq!(ui.token_status, TokenStatus::Neutral);
    }

    #[test]
    fn test_preview_is_truncated_with_ellipsis() {
        let long = "é".repeat(PREVIEW_CHARS + 10);
        let preview = truncate_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
        assert_eq!(truncate_preview("short"), "short");
    }
}
