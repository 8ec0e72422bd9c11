//! Contains all the command handlers that are callable from the frontend via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! Handlers mutate the `PanelState` through `with_state_and_notify` and hand
//! anything touching the filesystem or clipboard to `tasks`.

use serde::Deserialize;
use std::sync::{Arc, Mutex};

use super::events::UserEvent;
use super::helpers::{lock_state, notify, parse_payload, with_state_and_notify};
use super::host::HostServices;
use super::protocol::{
    CopyToClipboardPayload, ExpandDirectoryPayload, GetCodebaseTreePayload,
    GetFileContentPayload, HostCommand, SavePromptPayload,
};
use super::proxy::EventProxy;
use super::state::PanelState;
use super::tasks::{self, dispatch_host_command};
use crate::core::{clean_relative, CoreError, SavedPrompt};

#[derive(Debug, Deserialize)]
struct PathPayload {
    path: String,
}

#[derive(Debug, Deserialize)]
struct PromptTextPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    query: String,
}

#[derive(Debug, Deserialize)]
struct IncludeTreePayload {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct TreeDepthPayload {
    depth: usize,
}

#[derive(Debug, Deserialize)]
struct SavedPromptNamePayload {
    name: String,
}

/// First contact from the UI: render, then load the library and, with a
/// project open, the tree, the codebase summary and the selection.
pub fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<PanelState>>, services: HostServices) {
    let (has_root, include_tree) = {
        let guard = lock_state(&state);
        (guard.project_root.is_some(), guard.include_tree)
    };
    notify(&state, &proxy);

    dispatch_host_command(
        HostCommand::LoadPrompts,
        proxy.clone(),
        state.clone(),
        services.clone(),
    );
    if has_root {
        get_file_tree(proxy.clone(), state.clone(), services.clone());
        if include_tree {
            tasks::refresh_codebase_tree(proxy.clone(), state.clone(), services.clone());
        }
        tasks::refresh_selection(proxy, state, services);
    }
}

/// Opens the native folder picker and switches the panel to the chosen project.
pub fn select_project<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(path) = services.dialog.pick_project_root() else {
        tracing::info!("User cancelled project selection.");
        return;
    };
    if !path.is_dir() {
        proxy.send_event(UserEvent::ShowError(format!(
            "Not a directory: {}",
            path.display()
        )));
        return;
    }

    let include_tree = with_state_and_notify(&state, &proxy, |s| {
        s.reset_project(Some(path));
        s.include_tree
    });
    get_file_tree(proxy.clone(), state.clone(), services.clone());
    if include_tree {
        tasks::refresh_codebase_tree(proxy, state, services);
    }
}

/// Loads the root listing. The root shows as loading until the first
/// listing arrives; a reload keeps the current tree on screen meanwhile.
pub fn get_file_tree<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    with_state_and_notify(&state, &proxy, |s| s.expansion.begin(""));
    dispatch_host_command(HostCommand::GetFileTree, proxy, state, services);
}

/// Loads one directory level and marks it expanded.
pub fn expand_directory<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) =
        parse_payload::<ExpandDirectoryPayload, _>("expandDirectory", payload, &proxy)
    else {
        return;
    };
    spawn_expansion(payload.directory_path, proxy, state, services);
}

fn spawn_expansion<P: EventProxy>(
    directory: String,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    tokio::spawn(async move {
        match tasks::expand_directory(&directory, &proxy, &state, &services).await {
            Ok(items) => {
                tracing::debug!("'{}' expanded with {} entries", directory, items.len());
            }
            // Reported by the failing round trip, or the project was switched.
            Err(CoreError::ExpansionAborted(_)) => {}
            Err(e) => {
                tracing::warn!("Failed to expand '{}': {}", directory, e);
                proxy.send_event(UserEvent::ShowError(e.to_string()));
            }
        }
    });
}

/// Collapses an open directory (visual only) or expands a closed one.
pub fn toggle_expansion<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) = parse_payload::<PathPayload, _>("toggleExpansion", payload, &proxy) else {
        return;
    };
    let path = match clean_relative(&payload.path) {
        Ok(path) => path,
        Err(e) => {
            proxy.send_event(UserEvent::ShowError(e.to_string()));
            return;
        }
    };

    let collapsed = {
        let mut guard = lock_state(&state);
        guard.expanded_dirs.remove(&path)
    };
    if collapsed {
        notify(&state, &proxy);
    } else {
        spawn_expansion(path, proxy, state, services);
    }
}

/// Explicit content request. Results are kept for selected files only.
pub fn get_file_content<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    if let Some(payload) =
        parse_payload::<GetFileContentPayload, _>("getFileContent", payload, &proxy)
    {
        let command = HostCommand::GetFileContent {
            files: payload.files,
        };
        dispatch_host_command(command, proxy, state, services);
    }
}

fn is_directory(state: &PanelState, path: &str) -> bool {
    match state.expansion.find(path) {
        Some(entry) => entry.is_directory(),
        None => state
            .project_root
            .as_ref()
            .is_some_and(|root| root.join(path).is_dir()),
    }
}

/// Adds a file to the selection, or removes it if already selected.
/// Adding re-fetches the contents of the whole selection.
pub fn toggle_selection<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) = parse_payload::<PathPayload, _>("toggleSelection", payload, &proxy) else {
        return;
    };
    let path = match clean_relative(&payload.path) {
        Ok(path) if !path.is_empty() => path,
        Ok(_) => return,
        Err(e) => {
            proxy.send_event(UserEvent::ShowError(e.to_string()));
            return;
        }
    };

    if is_directory(&lock_state(&state), &path) {
        proxy.send_event(UserEvent::ShowError(format!(
            "'{path}' is a directory. Only files can be selected."
        )));
        return;
    }

    let added = with_state_and_notify(&state, &proxy, |s| {
        if s.selection.remove(&path) {
            s.context.files.shift_remove(&path);
            false
        } else {
            s.selection.insert(path.clone())
        }
    });
    if added {
        tasks::refresh_selection(proxy, state, services);
    }
}

pub fn remove_file<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
) {
    let Some(payload) = parse_payload::<PathPayload, _>("removeFile", payload, &proxy) else {
        return;
    };
    let path = match clean_relative(&payload.path) {
        Ok(path) => path,
        Err(e) => {
            proxy.send_event(UserEvent::ShowError(e.to_string()));
            return;
        }
    };
    with_state_and_notify(&state, &proxy, |s| {
        s.selection.remove(&path);
        s.context.files.shift_remove(&path);
    });
}

pub fn clear_selection<P: EventProxy>(proxy: P, state: Arc<Mutex<PanelState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.selection.clear();
        s.context.files.clear();
    });
}

/// Re-reads every selected file from disk.
pub fn refresh_selection<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    if tasks::refresh_selection(proxy.clone(), state, services).is_none() {
        proxy.send_event(UserEvent::ShowInfo("No files selected.".to_string()));
    }
}

pub fn update_prompt<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
) {
    if let Some(payload) = parse_payload::<PromptTextPayload, _>("updatePrompt", payload, &proxy) {
        with_state_and_notify(&state, &proxy, |s| s.main_prompt = payload.text);
    }
}

pub fn update_search<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
) {
    if let Some(payload) = parse_payload::<SearchPayload, _>("updateSearch", payload, &proxy) {
        with_state_and_notify(&state, &proxy, |s| s.search_query = payload.query);
    }
}

/// Switches tree inclusion. Switching off keeps the selected files; switching
/// on fetches the tree if none is cached.
pub fn set_include_tree<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) = parse_payload::<IncludeTreePayload, _>("setIncludeTree", payload, &proxy)
    else {
        return;
    };
    let needs_tree = with_state_and_notify(&state, &proxy, |s| {
        s.include_tree = payload.enabled;
        payload.enabled && s.context.tree_structure.is_none()
    });
    if needs_tree {
        tasks::refresh_codebase_tree(proxy, state, services);
    }
}

/// Changes the tree depth. The cached tree is dropped and, when included,
/// fetched again.
pub fn set_tree_depth<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) = parse_payload::<TreeDepthPayload, _>("setTreeDepth", payload, &proxy) else {
        return;
    };
    let include_tree = with_state_and_notify(&state, &proxy, |s| {
        s.tree_depth = payload.depth.max(1);
        s.context.tree_structure = None;
        s.include_tree
    });
    if include_tree {
        tasks::refresh_codebase_tree(proxy, state, services);
    }
}

pub fn get_codebase_tree<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    if let Some(payload) =
        parse_payload::<GetCodebaseTreePayload, _>("getCodebaseTree", payload, &proxy)
    {
        let depth = payload.depth.max(1);
        lock_state(&state).tree_depth = depth;
        let command = HostCommand::GetCodebaseTree { depth };
        dispatch_host_command(command, proxy, state, services);
    }
}

pub fn copy_to_clipboard<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    if let Some(payload) =
        parse_payload::<CopyToClipboardPayload, _>("copyToClipboard", payload, &proxy)
    {
        let command = HostCommand::CopyToClipboard { text: payload.text };
        dispatch_host_command(command, proxy, state, services);
    }
}

/// Copies the freshly assembled final prompt.
pub fn copy_prompt<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let text = lock_state(&state).assemble_prompt();
    dispatch_host_command(HostCommand::CopyToClipboard { text }, proxy, state, services);
}

pub fn get_ignore_info<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    dispatch_host_command(HostCommand::GetIgnoreInfo, proxy, state, services);
}

/// Saves a named prompt. Fields missing from the payload come from the
/// live panel: raw prompt text, current selection and depth.
pub fn save_prompt<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) = parse_payload::<SavePromptPayload, _>("savePrompt", payload, &proxy) else {
        return;
    };
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        proxy.send_event(UserEvent::ShowError("Prompt name cannot be empty.".to_string()));
        return;
    }

    let record = with_state_and_notify(&state, &proxy, |s| {
        let record = SavedPrompt {
            prompt: payload.prompt.unwrap_or_else(|| s.main_prompt.clone()),
            files: payload.files.unwrap_or_else(|| s.selection.to_vec()),
            depth: payload.depth.unwrap_or(s.tree_depth),
        };
        s.saved_prompts.insert(name.clone(), record.clone());
        record
    });
    dispatch_host_command(
        HostCommand::SavePrompt { name, record },
        proxy,
        state,
        services,
    );
}

pub fn load_prompts<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    dispatch_host_command(HostCommand::LoadPrompts, proxy, state, services);
}

/// Restores a saved prompt and re-fetches what it refers to.
pub fn select_saved_prompt<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
    services: HostServices,
) {
    let Some(payload) =
        parse_payload::<SavedPromptNamePayload, _>("selectSavedPrompt", payload, &proxy)
    else {
        return;
    };
    let (restored, include_tree) = with_state_and_notify(&state, &proxy, |s| {
        (s.restore_saved_prompt(&payload.name), s.include_tree)
    });
    if !restored {
        proxy.send_event(UserEvent::ShowError(format!(
            "No saved prompt named '{}'.",
            payload.name
        )));
        return;
    }
    if include_tree {
        tasks::refresh_codebase_tree(proxy.clone(), state.clone(), services.clone());
    }
    tasks::refresh_selection(proxy, state, services);
}
