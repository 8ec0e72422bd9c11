//! Per-directory load state for lazy tree expansion.
//!
//! A directory is Unloaded (absent from the map), `InFlight` while a host
//! listing is pending, or `Loaded` once a listing arrived. Loaded entries are
//! never evicted during a session; collapsing is purely visual.

use std::collections::HashMap;
use tokio::sync::oneshot;

use crate::core::TreeEntry;

/// A cache slot. Waiters of an in-flight load are resolved on completion.
#[derive(Debug)]
pub enum DirectoryLoad {
    InFlight(Vec<oneshot::Sender<Vec<TreeEntry>>>),
    Loaded(Vec<TreeEntry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    InFlight,
    Loaded,
}

/// What a caller asking for a listing gets back.
#[derive(Debug)]
pub enum ExpansionRequest {
    Cached(Vec<TreeEntry>),
    /// The listing will arrive on `receiver`. Only the first caller for an
    /// unloaded directory gets `issue_request == true`.
    Pending {
        receiver: oneshot::Receiver<Vec<TreeEntry>>,
        issue_request: bool,
    },
}

/// Directory path (root is `""`) to its load state.
#[derive(Debug, Default)]
pub struct ExpansionCache {
    entries: HashMap<String, DirectoryLoad>,
}

impl ExpansionCache {
    pub fn state(&self, path: &str) -> LoadState {
        match self.entries.get(path) {
            None => LoadState::Unloaded,
            Some(DirectoryLoad::InFlight(_)) => LoadState::InFlight,
            Some(DirectoryLoad::Loaded(_)) => LoadState::Loaded,
        }
    }

    pub fn listing(&self, path: &str) -> Option<&[TreeEntry]> {
        match self.entries.get(path) {
            Some(DirectoryLoad::Loaded(items)) => Some(items),
            _ => None,
        }
    }

    /// Registers interest in `path`'s listing, joining an in-flight load if
    /// there is one.
    pub fn request(&mut self, path: &str) -> ExpansionRequest {
        match self.entries.get_mut(path) {
            Some(DirectoryLoad::Loaded(items)) => ExpansionRequest::Cached(items.clone()),
            Some(DirectoryLoad::InFlight(waiters)) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                ExpansionRequest::Pending {
                    receiver: rx,
                    issue_request: false,
                }
            }
            None => {
                let (tx, rx) = oneshot::channel();
                self.entries
                    .insert(path.to_string(), DirectoryLoad::InFlight(vec![tx]));
                ExpansionRequest::Pending {
                    receiver: rx,
                    issue_request: true,
                }
            }
        }
    }

    /// Moves an unloaded directory to in-flight without waiting on it.
    /// Returns whether the caller must issue the host request.
    pub fn begin(&mut self, path: &str) -> bool {
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries
            .insert(path.to_string(), DirectoryLoad::InFlight(Vec::new()));
        true
    }

    /// Stores a listing and wakes everyone waiting on it. A late response
    /// for an already loaded directory replaces the listing.
    pub fn complete(&mut self, path: &str, mut items: Vec<TreeEntry>) {
        for item in &mut items {
            item.children = None;
        }
        let previous = self
            .entries
            .insert(path.to_string(), DirectoryLoad::Loaded(items.clone()));
        if let Some(DirectoryLoad::InFlight(waiters)) = previous {
            tracing::debug!("Resolving {} waiter(s) for '{}'", waiters.len(), path);
            for waiter in waiters {
                // The waiter may have given up; nothing to do then.
                let _ = waiter.send(items.clone());
            }
        }
    }

    /// Drops an in-flight load so it can be retried. Waiters observe a
    /// closed channel.
    pub fn fail(&mut self, path: &str) {
        if matches!(self.entries.get(path), Some(DirectoryLoad::InFlight(_))) {
            self.entries.remove(path);
        }
    }

    /// Seeds the cache from an eagerly built tree: the root listing and every
    /// nested directory whose children were populated.
    pub fn load_tree(&mut self, root_items: Vec<TreeEntry>) {
        let mut pending = vec![(String::new(), root_items)];
        while let Some((path, mut items)) = pending.pop() {
            for item in &mut items {
                if let Some(children) = item.children.take() {
                    pending.push((item.path.clone(), children));
                }
            }
            self.complete(&path, items);
        }
    }

    /// Looks up an entry through its parent's listing.
    pub fn find(&self, path: &str) -> Option<&TreeEntry> {
        let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
        self.listing(parent)?.iter().find(|entry| entry.path == path)
    }

    /// Every file in a loaded listing, sorted by path.
    pub fn known_files(&self) -> Vec<&TreeEntry> {
        let mut files: Vec<&TreeEntry> = self
            .entries
            .values()
            .filter_map(|load| match load {
                DirectoryLoad::Loaded(items) => Some(items),
                DirectoryLoad::InFlight(_) => None,
            })
            .flatten()
            .filter(|entry| !entry.is_directory())
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
