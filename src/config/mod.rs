pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::prompt::TokenThresholds;

/// How `getFileTree` answers: the whole tree at once, or only the root level
/// with deeper levels loaded on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMode {
    Lazy,
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    /// Patterns appended after the project's ignore file, before the built-ins.
    pub extra_ignore_patterns: Vec<String>,
    pub tree_mode: TreeMode,
    pub default_tree_depth: usize,
    pub include_tree_by_default: bool,
    pub token_warning_threshold: usize,
    pub token_error_threshold: usize,
    pub max_file_size_mb: u64,
    pub window_size: (f64, f64),
    pub window_position: (f64, f64),
    pub last_directory: Option<PathBuf>,
}

impl PanelConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn token_thresholds(&self) -> TokenThresholds {
        TokenThresholds {
            warning: self.token_warning_threshold,
            error: self.token_error_threshold,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            extra_ignore_patterns: Vec::new(),
            tree_mode: TreeMode::Lazy,
            default_tree_depth: 2,
            include_tree_by_default: false,
            token_warning_threshold: 32_000,
            token_error_threshold: 128_000,
            max_file_size_mb: 20,
            window_size: (1100.0, 800.0),
            window_position: (100.0, 100.0),
            last_directory: None,
        }
    }
}
