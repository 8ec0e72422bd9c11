//! The panel application: IPC dispatch, state, view-model and host tasks.

pub mod clipboard;
pub mod commands;
pub mod events;
pub mod expansion;
pub mod file_dialog;
pub mod helpers;
pub mod host;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod state;
pub mod tasks;
pub mod view_model;

use std::sync::{Arc, Mutex};
use wry::WebView;

use events::{IpcMessage, UserEvent};
use host::HostServices;
use proxy::EventProxy;
use state::PanelState;

/// Parses an IPC message from the WebView and routes it to its handler.
pub fn handle_ipc_message<P: EventProxy>(
    message: String,
    services: HostServices,
    proxy: P,
    state: Arc<Mutex<PanelState>>,
) {
    let msg: IpcMessage = match serde_json::from_str(&message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!("Failed to parse IPC message: {} ({})", e, message);
            return;
        }
    };
    tracing::info!("IPC command received: {}", msg.command);

    match msg.command.as_str() {
        "initialize" => commands::initialize(proxy, state, services),
        "selectProject" => commands::select_project(proxy, state, services),
        "getFileTree" => commands::get_file_tree(proxy, state, services),
        "expandDirectory" => commands::expand_directory(msg.payload, proxy, state, services),
        "toggleExpansion" => commands::toggle_expansion(msg.payload, proxy, state, services),
        "getFileContent" => commands::get_file_content(msg.payload, proxy, state, services),
        "toggleSelection" => commands::toggle_selection(msg.payload, proxy, state, services),
        "removeFile" => commands::remove_file(msg.payload, proxy, state),
        "clearSelection" => commands::clear_selection(proxy, state),
        "refreshSelection" => commands::refresh_selection(proxy, state, services),
        "updatePrompt" => commands::update_prompt(msg.payload, proxy, state),
        "updateSearch" => commands::update_search(msg.payload, proxy, state),
        "setIncludeTree" => commands::set_include_tree(msg.payload, proxy, state, services),
        "setTreeDepth" => commands::set_tree_depth(msg.payload, proxy, state, services),
        "getCodebaseTree" => commands::get_codebase_tree(msg.payload, proxy, state, services),
        "copyToClipboard" => commands::copy_to_clipboard(msg.payload, proxy, state, services),
        "copyPrompt" => commands::copy_prompt(proxy, state, services),
        "getIgnoreInfo" => commands::get_ignore_info(proxy, state, services),
        "savePrompt" => commands::save_prompt(msg.payload, proxy, state, services),
        "loadPrompts" => commands::load_prompts(proxy, state, services),
        "selectSavedPrompt" => commands::select_saved_prompt(msg.payload, proxy, state, services),
        unknown => tracing::warn!("Unknown IPC command received: {}", unknown),
    }
}

/// Forwards a backend event to the matching `window.*` function in the WebView.
pub fn handle_user_event(event: UserEvent, webview: &WebView) {
    let script = match event {
        UserEvent::StateUpdate(ui_state) => {
            serde_json::to_string(&ui_state).map(|json| format!("window.render({json});"))
        }
        UserEvent::Host(message) => serde_json::to_string(&message)
            .map(|json| format!("window.onHostMessage && window.onHostMessage({json});")),
        UserEvent::ShowInfo(text) => serde_json::to_string(&text)
            .map(|json| format!("window.showNotification('info', {json});")),
        UserEvent::ShowError(text) => serde_json::to_string(&text)
            .map(|json| format!("window.showNotification('error', {json});")),
    };

    match script {
        Ok(script) => {
            if let Err(e) = webview.evaluate_script(&script) {
                tracing::error!("Failed to evaluate script in WebView: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize event for WebView: {}", e),
    }
}
