#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::{Context, Result};
use prompt_builder::app::{self, clipboard::SystemClipboard, events::UserEvent};
use prompt_builder::app::file_dialog::NativeDialogService;
use prompt_builder::app::helpers::lock_state;
use prompt_builder::app::host::HostServices;
use prompt_builder::app::registry::PanelRegistry;
use prompt_builder::app::state::PanelState;
use prompt_builder::config::{self, PanelConfig};
use prompt_builder::core::{JsonPromptStore, TiktokenCounter};
use std::path::PathBuf;
use std::sync::Arc;
use tao::{
    event::{Event, StartCause, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder},
    window::WindowBuilder,
};
use tracing_subscriber::EnvFilter;
use wry::WebViewBuilder;

const SESSION_ID: &str = "main";

/// Project root from the first CLI argument, else the last one used.
fn initial_project_root(config: &PanelConfig) -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.last_directory.clone())
        .filter(|path| path.is_dir())
        .and_then(|path| path.canonicalize().ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PanelConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        PanelConfig::default()
    });
    let (width, height) = config.window_size;
    let (pos_x, pos_y) = config.window_position;

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let window = WindowBuilder::new()
        .with_title("Prompt Builder")
        .with_inner_size(tao::dpi::LogicalSize::new(width, height))
        .with_position(tao::dpi::LogicalPosition::new(pos_x, pos_y))
        .with_min_inner_size(tao::dpi::LogicalSize::new(720, 480))
        .build(&event_loop)
        .context("Failed to build window")?;
    let window = Arc::new(window);

    let prompt_library = config::settings::get_prompt_library_path()
        .context("Could not determine config directory")?;
    let services = HostServices {
        clipboard: Arc::new(SystemClipboard),
        prompts: Arc::new(JsonPromptStore::new(prompt_library)),
        dialog: Arc::new(NativeDialogService),
    };

    let mut registry = PanelRegistry::default();
    let root = initial_project_root(&config);
    let (state, opened) = registry.reveal_or_create(SESSION_ID, || {
        let mut state = PanelState::new(config, None, Arc::new(TiktokenCounter));
        state.reset_project(root);
        state
    });
    tracing::debug!("Panel '{}': {:?}", SESSION_ID, opened);

    let proxy = event_loop.create_proxy();
    let ipc_state = state.clone();
    let ipc_proxy = proxy.clone();
    let ipc_services = services.clone();
    let ipc_handler = move |message: String| {
        app::handle_ipc_message(
            message,
            ipc_services.clone(),
            ipc_proxy.clone(),
            ipc_state.clone(),
        );
    };

    let webview = WebViewBuilder::new(&*window)
        .with_html(include_str!("ui/index.html"))
        .with_devtools(cfg!(debug_assertions))
        .with_ipc_handler(ipc_handler)
        .build()
        .context("Failed to build WebView")?;

    let window_for_events = window.clone();
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => {
                tracing::info!("Application initialized.");
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    tracing::info!("Close requested. Saving final window state...");
                    let mut state_guard = lock_state(&state);
                    let size = window_for_events.inner_size();
                    let position = window_for_events.outer_position().unwrap_or_default();
                    state_guard.config.window_size = (size.width.into(), size.height.into());
                    state_guard.config.window_position = (position.x.into(), position.y.into());

                    if let Err(e) = config::settings::save_config(&state_guard.config, None) {
                        tracing::error!("Failed to save config on exit: {}", e);
                    }
                    registry.dispose(SESSION_ID);
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    lock_state(&state).config.window_size = (size.width.into(), size.height.into());
                }
                WindowEvent::Moved(position) => {
                    lock_state(&state).config.window_position = (position.x.into(), position.y.into());
                }
                _ => (),
            },
            Event::UserEvent(user_event) => {
                app::handle_user_event(user_event, &webview);
            }
            _ => (),
        }
    });
}
