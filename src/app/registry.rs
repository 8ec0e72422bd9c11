//! Open panels, keyed by session id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::state::PanelState;

/// Whether `reveal_or_create` built a new panel or returned an open one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOpen {
    Created,
    Revealed,
}

#[derive(Default)]
pub struct PanelRegistry {
    panels: HashMap<String, Arc<Mutex<PanelState>>>,
}

impl PanelRegistry {
    /// Returns the panel for `session_id`, creating it with `create` if none
    /// is open.
    pub fn reveal_or_create<F>(
        &mut self,
        session_id: &str,
        create: F,
    ) -> (Arc<Mutex<PanelState>>, PanelOpen)
    where
        F: FnOnce() -> PanelState,
    {
        if let Some(existing) = self.panels.get(session_id) {
            tracing::info!("Revealing existing panel '{}'", session_id);
            return (existing.clone(), PanelOpen::Revealed);
        }
        tracing::info!("Creating panel '{}'", session_id);
        let panel = Arc::new(Mutex::new(create()));
        self.panels.insert(session_id.to_string(), panel.clone());
        (panel, PanelOpen::Created)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<PanelState>>> {
        self.panels.get(session_id).cloned()
    }

    /// Forgets a closed panel. Returns whether one was open.
    pub fn dispose(&mut self, session_id: &str) -> bool {
        self.panels.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}
