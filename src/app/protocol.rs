//! Host request/response vocabulary.
//!
//! Every [`HostCommand`] is answered by at most one [`HostMessage`]; commands
//! with side effects only (`copyToClipboard`, `getIgnoreInfo`) answer with a
//! notification instead.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{SavedPrompt, TreeEntry};

/// A host operation, already parsed from its IPC payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    GetFileTree,
    ExpandDirectory { directory_path: String },
    GetFileContent { files: Vec<String> },
    GetCodebaseTree { depth: usize },
    CopyToClipboard { text: String },
    GetIgnoreInfo,
    SavePrompt { name: String, record: SavedPrompt },
    LoadPrompts,
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::GetFileTree => "getFileTree",
            HostCommand::ExpandDirectory { .. } => "expandDirectory",
            HostCommand::GetFileContent { .. } => "getFileContent",
            HostCommand::GetCodebaseTree { .. } => "getCodebaseTree",
            HostCommand::CopyToClipboard { .. } => "copyToClipboard",
            HostCommand::GetIgnoreInfo => "getIgnoreInfo",
            HostCommand::SavePrompt { .. } => "savePrompt",
            HostCommand::LoadPrompts => "loadPrompts",
        }
    }
}

/// A host response, posted back to the UI and folded into the panel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum HostMessage {
    FileTree(Vec<TreeEntry>),
    ExpandDirectory(DirectoryListing),
    FileContents(IndexMap<String, String>),
    CodebaseTree(String),
    PromptSaved(bool),
    PromptList(BTreeMap<String, SavedPrompt>),
}

impl HostMessage {
    /// Whether the response describes files of one particular project root.
    /// The prompt library is global and is not.
    pub fn is_project_scoped(&self) -> bool {
        !matches!(self, HostMessage::PromptSaved(_) | HostMessage::PromptList(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub items: Vec<TreeEntry>,
    /// Echo of the requested directory, used to match the response.
    pub parent_path: String,
}

/// What executing a [`HostCommand`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    Message(HostMessage),
    /// A transient, human-readable confirmation.
    Notice(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandDirectoryPayload {
    pub directory_path: String,
}

#[derive(Debug, Deserialize)]
pub struct GetFileContentPayload {
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetCodebaseTreePayload {
    pub depth: usize,
}

#[derive(Debug, Deserialize)]
pub struct CopyToClipboardPayload {
    pub text: String,
}

/// Missing fields are filled from the live panel state.
#[derive(Debug, Deserialize)]
pub struct SavePromptPayload {
    pub name: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub depth: Option<usize>,
}
