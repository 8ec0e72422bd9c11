//! Saved prompt library: named records of prompt text, selection and depth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::CoreError;

fn default_depth() -> usize {
    1
}

/// One saved prompt, keyed by its unique name in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub prompt: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_depth")]
    pub depth: usize,
}

/// Key-value persistence for saved prompts.
pub trait PromptStore: Send + Sync {
    fn load_prompts(&self) -> Result<BTreeMap<String, SavedPrompt>, CoreError>;

    /// Inserts or replaces the record stored under `name`.
    fn save_prompt(&self, name: &str, record: SavedPrompt) -> Result<(), CoreError>;
}

/// Stores the whole library as one pretty-printed JSON object.
#[derive(Debug)]
pub struct JsonPromptStore {
    path: PathBuf,
    // Serializes read-modify-write cycles from concurrent save tasks.
    write_lock: Mutex<()>,
}

impl JsonPromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Where a corrupt library is moved before it gets overwritten.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Reads the library. `None` means the file exists but does not parse.
    fn read_library(&self) -> Result<Option<BTreeMap<String, SavedPrompt>>, CoreError> {
        if !self.path.exists() {
            return Ok(Some(BTreeMap::new()));
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| CoreError::Io(e, self.path.clone()))?;
        match serde_json::from_str(&content) {
            Ok(library) => Ok(Some(library)),
            Err(e) => {
                tracing::warn!("Saved prompt library at {:?} is corrupt: {}", self.path, e);
                Ok(None)
            }
        }
    }
}

impl PromptStore for JsonPromptStore {
    fn load_prompts(&self) -> Result<BTreeMap<String, SavedPrompt>, CoreError> {
        Ok(self.read_library()?.unwrap_or_default())
    }

    fn save_prompt(&self, name: &str, record: SavedPrompt) -> Result<(), CoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut library = match self.read_library()? {
            Some(library) => library,
            None => {
                let backup = self.backup_path();
                fs::rename(&self.path, &backup).map_err(|e| CoreError::Io(e, backup.clone()))?;
                tracing::warn!("Moved corrupt prompt library to {:?}", backup);
                BTreeMap::new()
            }
        };
        library.insert(name.to_string(), record);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::Io(e, parent.to_path_buf()))?;
        }
        let json = serde_json::to_string_pretty(&library)?;
        fs::write(&self.path, json).map_err(|e| CoreError::Io(e, self.path.clone()))?;
        tracing::info!("Saved prompt '{}' to {:?}", name, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(prompt: &str, files: &[&str], depth: usize) -> SavedPrompt {
        SavedPrompt {
            prompt: prompt.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            depth,
        }
    }

    #[test]
    fn test_missing_library_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonPromptStore::new(dir.path().join("prompts.json"));
        assert!(store.load_prompts().unwrap().is_empty());
    }

    #[test]
    fn test_save_prompt_upserts_by_name() {
        let dir = tempdir().unwrap();
        let store = JsonPromptStore::new(dir.path().join("nested/prompts.json"));

        store.save_prompt("review", record("v1", &["a.rs"], 2)).unwrap();
        store.save_prompt("docs", record("write docs", &[], 1)).unwrap();
        store.save_prompt("review", record("v2", &["b.rs"], 3)).unwrap();

        let library = store.load_prompts().unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library["review"], record("v2", &["b.rs"], 3));
    }

    #[test]
    fn test_legacy_records_without_depth_default_to_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, r#"{"old": {"prompt": "hi", "files": ["x.ts"]}}"#).unwrap();

        let library = JsonPromptStore::new(&path).load_prompts().unwrap();
        assert_eq!(library["old"].depth, 1);
    }

    #[test]
    fn test_corrupt_library_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonPromptStore::new(&path).load_prompts().unwrap().is_empty());
    }

    #[test]
    fn test_saving_over_corrupt_library_keeps_a_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonPromptStore::new(&path);

        store.save_prompt("fresh", record("new", &[], 1)).unwrap();

        assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), "{ not json");
        let library = store.load_prompts().unwrap();
        assert_eq!(library.keys().collect::<Vec<_>>(), ["fresh"]);
    }
}
