//! Executes host commands against the filesystem and external collaborators.
//!
//! A [`Host`] is a snapshot of what a command needs (root, config, services)
//! so it can run on a blocking worker without holding the state lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::clipboard::ClipboardService;
use super::file_dialog::DialogService;
use super::protocol::{DirectoryListing, HostCommand, HostMessage, HostOutcome};
use crate::config::{PanelConfig, TreeMode};
use crate::core::{
    clean_relative, CoreError, DirectoryTreeBuilder, FileContentLoader, IgnoreFilter,
    PromptStore, TreeGenerator,
};

/// External collaborators shared by every panel.
#[derive(Clone)]
pub struct HostServices {
    pub clipboard: Arc<dyn ClipboardService>,
    pub prompts: Arc<dyn PromptStore>,
    pub dialog: Arc<dyn DialogService>,
}

pub struct Host {
    root: Option<PathBuf>,
    config: PanelConfig,
    services: HostServices,
}

impl Host {
    pub fn new(root: Option<PathBuf>, config: PanelConfig, services: HostServices) -> Self {
        Self {
            root,
            config,
            services,
        }
    }

    fn root(&self) -> Result<&Path, CoreError> {
        self.root.as_deref().ok_or(CoreError::NoProjectRoot)
    }

    fn ignore_filter(&self, root: &Path) -> IgnoreFilter {
        IgnoreFilter::load_with_extra(root, &self.config.extra_ignore_patterns)
    }

    fn tree_builder(&self) -> Result<DirectoryTreeBuilder, CoreError> {
        let root = self.root()?;
        Ok(DirectoryTreeBuilder::new(root, self.ignore_filter(root)))
    }

    pub fn execute(&self, command: HostCommand) -> Result<HostOutcome, CoreError> {
        tracing::info!("Executing host command '{}'", command.name());
        match command {
            HostCommand::GetFileTree => {
                let builder = self.tree_builder()?;
                let tree = match self.config.tree_mode {
                    TreeMode::Lazy => builder.expand_one("")?,
                    TreeMode::Full => builder.build_full()?,
                };
                Ok(HostOutcome::Message(HostMessage::FileTree(tree)))
            }
            HostCommand::ExpandDirectory { directory_path } => {
                let builder = self.tree_builder()?;
                let parent_path = clean_relative(&directory_path)?;
                let items = builder.expand_one(&parent_path)?;
                Ok(HostOutcome::Message(HostMessage::ExpandDirectory(
                    DirectoryListing { items, parent_path },
                )))
            }
            HostCommand::GetFileContent { files } => {
                let loader = FileContentLoader::new(self.root()?, self.config.max_file_size_mb);
                let contents = loader.read_many(&files);
                tracing::info!("Read {} of {} requested paths", contents.len(), files.len());
                Ok(HostOutcome::Message(HostMessage::FileContents(contents)))
            }
            HostCommand::GetCodebaseTree { depth } => {
                let builder = self.tree_builder()?;
                let entries = builder.build_bounded(depth)?;
                let root = builder.root();
                let root_name = root
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                Ok(HostOutcome::Message(HostMessage::CodebaseTree(
                    TreeGenerator::generate_tree(&root_name, &entries),
                )))
            }
            HostCommand::CopyToClipboard { text } => {
                self.services.clipboard.write_text(&text)?;
                Ok(HostOutcome::Notice("Prompt copied to clipboard!".to_string()))
            }
            HostCommand::GetIgnoreInfo => {
                let root = self.root()?;
                Ok(HostOutcome::Notice(self.ignore_filter(root).describe()))
            }
            HostCommand::SavePrompt { name, record } => {
                self.services.prompts.save_prompt(&name, record)?;
                Ok(HostOutcome::Message(HostMessage::PromptSaved(true)))
            }
            HostCommand::LoadPrompts => Ok(HostOutcome::Message(HostMessage::PromptList(
                self.services.prompts.load_prompts()?,
            ))),
        }
    }
}
