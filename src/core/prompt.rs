//! Final prompt assembly and token estimation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

use super::CoreError;

/// Selected file contents plus the optional tree summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    /// Path → content, in selection order.
    pub files: IndexMap<String, String>,
    pub tree_structure: Option<String>,
}

/// Opaque tokenizer collaborator.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, CoreError>;
}

/// Production tokenizer backed by the `o200k_base` BPE.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenCounter;

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, CoreError> {
        static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();
        let bpe = BPE.get_or_init(|| match tiktoken_rs::o200k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                tracing::error!("Failed to load o200k_base BPE: {}", e);
                None
            }
        });
        bpe.as_ref()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
            .ok_or_else(|| CoreError::Tokenizer("o200k_base BPE unavailable".to_string()))
    }
}

/// How the token count should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Neutral,
    Warning,
    Error,
    /// The tokenizer failed; no count is shown.
    Unavailable,
}

/// Display thresholds, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenThresholds {
    pub warning: usize,
    pub error: usize,
}

impl TokenStatus {
    pub fn classify(count: usize, thresholds: TokenThresholds) -> Self {
        if count > thresholds.error {
            TokenStatus::Error
        } else if count > thresholds.warning {
            TokenStatus::Warning
        } else {
            TokenStatus::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEstimate {
    pub count: Option<usize>,
    pub status: TokenStatus,
}

impl TokenEstimate {
    pub fn label(&self) -> String {
        match self.count {
            Some(count) => format!("{count} tokens"),
            None => "error counting tokens".to_string(),
        }
    }
}

/// Stateless prompt assembly.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Concatenates the main prompt with the context sections.
    ///
    /// With no files and no tree the main prompt is returned unchanged.
    pub fn assemble(main_prompt: &str, context: &PromptContext) -> String {
        Self::assemble_parts(main_prompt, &context.files, context.tree_structure.as_deref())
    }

    /// Same as [`assemble`](Self::assemble), taking the parts by reference so
    /// callers can drop the tree without cloning the file map.
    pub fn assemble_parts(
        main_prompt: &str,
        files: &IndexMap<String, String>,
        tree_structure: Option<&str>,
    ) -> String {
        let tree_structure = tree_structure.filter(|tree| !tree.is_empty());
        let mut out = main_prompt.to_string();

        if !files.is_empty() {
            push_section(&mut out, "Related Files");
            for (path, content) in files {
                let fence = fence_for(content);
                let language = language_from_path(Path::new(path));
                out.push_str(&format!("\n### {path}\n{fence}{language}\n"));
                push_block(&mut out, content, &fence);
            }
        }

        if let Some(tree) = tree_structure {
            push_section(&mut out, "Codebase Tree");
            let fence = fence_for(tree);
            out.push_str(&format!("\n{fence}\n"));
            push_block(&mut out, tree, &fence);
        }

        out
    }

    /// Counts tokens for `text`. A tokenizer failure yields
    /// [`TokenStatus::Unavailable`] rather than an error.
    pub fn estimate_tokens(
        counter: &dyn TokenCounter,
        text: &str,
        thresholds: TokenThresholds,
    ) -> TokenEstimate {
        match counter.count_tokens(text) {
            Ok(count) => TokenEstimate {
                count: Some(count),
                status: TokenStatus::classify(count, thresholds),
            },
            Err(e) => {
                tracing::warn!("{}", e);
                TokenEstimate {
                    count: None,
                    status: TokenStatus::Unavailable,
                }
            }
        }
    }
}

fn push_section(out: &mut String, title: &str) {
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str("## ");
    out.push_str(title);
    out.push('\n');
}

fn push_block(out: &mut String, content: &str, fence: &str) {
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(fence);
    out.push('\n');
}

/// A backtick fence longer than any run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Fence language hint for a file path; empty when unknown.
pub fn language_from_path(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()) {
        Some("rs") => "rust",
        Some("js") | Some("mjs") | Some("cjs") | Some("jsx") => "javascript",
        Some("ts") | Some("tsx") => "typescript",
        Some("py") => "python",
        Some("html") | Some("htm") => "html",
        Some("css") => "css",
        Some("json") => "json",
        Some("md") => "markdown",
        Some("toml") => "toml",
        Some("yaml") | Some("yml") => "yaml",
        Some("sh") => "shell",
        Some("go") => "go",
        Some("java") => "java",
        Some("c") | Some("h") => "c",
        Some("cpp") | Some("hpp") | Some("cxx") | Some("hxx") => "cpp",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count_tokens(&self, text: &str) -> Result<usize, CoreError> {
            Ok(text.split_whitespace().count())
        }
    }

    struct BrokenCounter;

    impl TokenCounter for BrokenCounter {
        fn count_tokens(&self, _text: &str) -> Result<usize, CoreError> {
            Err(CoreError::Tokenizer("boom".to_string()))
        }
    }

    const THRESHOLDS: TokenThresholds = TokenThresholds {
        warning: 10,
        error: 20,
    };

    fn context(files: &[(&str, &str)], tree: Option<&str>) -> PromptContext {
        PromptContext {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            tree_structure: tree.map(str::to_string),
        }
    }

    #[test]
    fn test_assemble_without_context_is_the_main_prompt() {
        assert_eq!(PromptAssembler::assemble("Hello", &PromptContext::default()), "Hello");
        assert_eq!(
            PromptAssembler::assemble("Hello", &context(&[], Some(""))),
            "Hello"
        );
    }

    #[test]
    fn test_assemble_layout() {
        let ctx = context(&[("src/x.ts", "let a = 1;"), ("notes.txt", "hi\n")], Some("root/\n"));

        let text = PromptAssembler::assemble("Explain this", &ctx);

        assert_eq!(
            text,
            "Explain this\n\n## Related Files\n\
             \n### src/x.ts\n```typescript\nlet a = 1;\n```\n\
             \n### notes.txt\n```\nhi\n```\n\
             \n## Codebase Tree\n\n```\nroot/\n```\n"
        );
    }

    #[test]
    fn test_assemble_tree_only_has_no_files_header() {
        let text = PromptAssembler::assemble("Q", &context(&[], Some("tree")));
        assert!(!text.contains("Related Files"));
        assert!(text.contains("## Codebase Tree"));
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let ctx = context(&[("x.ts", "content")], Some("tree"));
        let first = PromptAssembler::assemble("p", &ctx);
        let second = PromptAssembler::assemble("p", &ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fence_grows_past_embedded_backticks() {
        let ctx = context(&[("README.md", "```rust\nfn x() {}\n```")], None);
        let text = PromptAssembler::assemble("", &ctx);
        assert!(text.contains("````markdown\n```rust"));
        assert!(text.ends_with("```\n````\n"));
    }

    #[test]
    fn test_token_count_increases_when_a_file_is_added() {
        let before = PromptAssembler::assemble("Review", &PromptContext::default());
        let after = PromptAssembler::assemble("Review", &context(&[("a.rs", "fn main() {}")], None));

        let before = PromptAssembler::estimate_tokens(&TiktokenCounter, &before, THRESHOLDS);
        let after = PromptAssembler::estimate_tokens(&TiktokenCounter, &after, THRESHOLDS);
        assert!(after.count.unwrap() > before.count.unwrap());
    }

    #[test]
    fn test_token_status_thresholds() {
        let estimate = |n: usize| {
            PromptAssembler::estimate_tokens(&WordCounter, &"w ".repeat(n), THRESHOLDS).status
        };
        assert_eq!(estimate(10), TokenStatus::Neutral);
        assert_eq!(estimate(11), TokenStatus::Warning);
        assert_eq!(estimate(21), TokenStatus::Error);
    }

    #[test]
    fn test_tokenizer_failure_is_reported_as_unavailable() {
        let estimate = PromptAssembler::estimate_tokens(&BrokenCounter, "text", THRESHOLDS);
        assert_eq!(estimate.status, TokenStatus::Unavailable);
        assert_eq!(estimate.label(), "error counting tokens");
    }
}
