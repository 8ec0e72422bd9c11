//! Generates an ASCII representation of a directory tree.

use super::TreeEntry;

/// A utility struct for rendering `TreeEntry` listings as text.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeGenerator;

impl TreeGenerator {
    /// Renders an already sorted, depth-bounded tree under a `root_name/` line.
    ///
    /// Entries whose `children` were not loaded are rendered as leaves.
    pub fn generate_tree(root_name: &str, entries: &[TreeEntry]) -> String {
        let mut result = format!("{root_name}/\n");
        Self::render_children(entries, &mut result, "");
        result
    }

    /// Recursively renders the children of a tree node.
    fn render_children(children: &[TreeEntry], result: &mut String, prefix: &str) {
        for (i, node) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;

            let connector = if is_last { "└── " } else { "├── " };
            let icon = if node.is_directory() { "📁 " } else { "📄 " };

            result.push_str(&format!("{prefix}{connector}{icon}{}\n", node.name));

            if let Some(grandchildren) = node.children.as_deref() {
                if !grandchildren.is_empty() {
                    let new_prefix = if is_last {
                        format!("{prefix}    ")
                    } else {
                        format!("{prefix}│   ")
                    };
                    Self::render_children(grandchildren, result, &new_prefix);
                }
            }
        }
    }
}
