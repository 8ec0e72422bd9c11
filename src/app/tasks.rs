//! Spawned host round trips.
//!
//! Filesystem and clipboard work runs on the blocking pool; results are
//! posted back as events and folded into the panel state.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::events::UserEvent;
use super::expansion::ExpansionRequest;
use super::helpers::{lock_state, notify, with_state_and_notify};
use super::host::{Host, HostServices};
use super::protocol::{HostCommand, HostOutcome};
use super::proxy::EventProxy;
use super::state::PanelState;
use crate::core::{clean_relative, CoreError, TreeEntry};

/// Runs one host command in the background and reports its outcome.
pub fn dispatch_host_command<P: EventProxy>(
    command: HostCommand,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_host_command(command, &proxy, &state, services).await;
    })
}

async fn run_host_command<P: EventProxy>(
    command: HostCommand,
    proxy: &P,
    state: &Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let (host, generation) = {
        let guard = lock_state(state);
        let host = Host::new(guard.project_root.clone(), guard.config.clone(), services);
        (host, guard.project_generation)
    };
    let name = command.name();
    let loading = match &command {
        HostCommand::GetFileTree => Some(String::new()),
        HostCommand::ExpandDirectory { directory_path } => clean_relative(directory_path).ok(),
        _ => None,
    };

    let result = tokio::task::spawn_blocking(move || host.execute(command))
        .await
        .map_err(CoreError::from)
        .and_then(|result| result);

    match result {
        Ok(HostOutcome::Message(message)) => {
            let applied = lock_state(state).apply_host_response(generation, message.clone());
            if !applied {
                tracing::info!("Host command '{}' finished for a closed project", name);
                return;
            }
            tracing::info!("Host command '{}' completed", name);
            proxy.send_event(UserEvent::Host(message));
            notify(state, proxy);
        }
        Ok(HostOutcome::Notice(text)) => {
            proxy.send_event(UserEvent::ShowInfo(text));
        }
        Err(e) => {
            tracing::error!("Host command '{}' failed: {}", name, e);
            if let Some(directory) = loading {
                let current = with_state_and_notify(state, proxy, |s| {
                    let current = s.project_generation == generation;
                    if current {
                        s.expansion.fail(&directory);
                        s.expanded_dirs.remove(&directory);
                    }
                    current
                });
                if !current {
                    return;
                }
            }
            proxy.send_event(UserEvent::ShowError(e.to_string()));
        }
    }
}

/// Expands `directory` and waits for its listing.
///
/// Concurrent calls for the same unloaded directory share one host round
/// trip; a loaded directory is answered from the cache.
pub async fn expand_directory<P: EventProxy>(
    directory: &str,
    proxy: &P,
    state: &Arc<Mutex<PanelState>>,
    services: &HostServices,
) -> Result<Vec<TreeEntry>, CoreError> {
    let path = clean_relative(directory)?;
    let request = {
        let mut guard = lock_state(state);
        if !path.is_empty() {
            guard.expanded_dirs.insert(path.clone());
        }
        guard.expansion.request(&path)
    };

    match request {
        ExpansionRequest::Cached(items) => {
            notify(state, proxy);
            Ok(items)
        }
        ExpansionRequest::Pending {
            receiver,
            issue_request,
        } => {
            if issue_request {
                notify(state, proxy);
                dispatch_host_command(
                    HostCommand::ExpandDirectory {
                        directory_path: path.clone(),
                    },
                    proxy.clone(),
                    state.clone(),
                    services.clone(),
                );
            } else {
                tracing::debug!("Joining in-flight expansion of '{}'", path);
            }
            receiver
                .await
                .map_err(|_| CoreError::ExpansionAborted(path))
        }
    }
}

/// Fetches contents for the whole current selection, if it is not empty.
pub fn refresh_selection<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) -> Option<JoinHandle<()>> {
    let files = lock_state(&state).selection.to_vec();
    if files.is_empty() {
        return None;
    }
    Some(dispatch_host_command(
        HostCommand::GetFileContent { files },
        proxy,
        state,
        services,
    ))
}

/// Fetches the codebase tree at the panel's current depth.
pub fn refresh_codebase_tree<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) -> JoinHandle<()> {
    let depth = lock_state(&state).tree_depth;
    dispatch_host_command(HostCommand::GetCodebaseTree { depth }, proxy, state, services)
}
