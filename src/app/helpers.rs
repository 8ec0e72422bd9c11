//! Contains helper functions to reduce boilerplate code in other `app` modules.

use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::PanelState;
use super::view_model::render;

/// Locks the panel state, recovering from a poisoned mutex.
pub fn lock_state(state: &Arc<Mutex<PanelState>>) -> MutexGuard<'_, PanelState> {
    state.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Panel state mutex was poisoned; recovering.");
        poisoned.into_inner()
    })
}

/// Renders the current state and publishes it as a `StateUpdate`.
pub fn notify<P: EventProxy>(state: &Arc<Mutex<PanelState>>, proxy: &P) {
    with_state_and_notify(state, proxy, |_| {});
}

/// A helper function that locks the `PanelState`, performs a mutation,
/// and then automatically sends a `StateUpdate` event to the UI.
pub fn with_state_and_notify<F, R, P: EventProxy>(
    state: &Arc<Mutex<PanelState>>,
    proxy: &P,
    update_fn: F,
) -> R
where
    F: FnOnce(&mut PanelState) -> R,
{
    let mut state_guard = lock_state(state);

    let result = update_fn(&mut state_guard);

    let ui_state = render(&state_guard);
    proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
    result
}

/// Parses an IPC payload, reporting a malformed one to the UI.
pub fn parse_payload<T: DeserializeOwned, P: EventProxy>(
    command: &str,
    payload: serde_json::Value,
    proxy: &P,
) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Invalid payload for '{}': {}", command, e);
            proxy.send_event(UserEvent::ShowError(format!(
                "Invalid request '{command}': {e}"
            )));
            None
        }
    }
}
