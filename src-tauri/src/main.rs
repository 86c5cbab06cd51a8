#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod host;
mod webview;

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use deskshell_core::bridge::{
    Bridge, BridgeClient, Host, MaximizeTracker, NativeTheme, PushEvent, push_event,
};
use deskshell_core::config::{ShellConfig, load_config};
use deskshell_core::logging::{LoggingDestination, init_logging};
use deskshell_core::settings::{Settings, Theme};
use deskshell_core::storage::FileStorage;
use deskshell_core::store::{ImportOutcome, SettingsStore, StoreOptions};
use serde::Serialize;
use serde_json::Value;
use tauri::menu::{Menu, MenuItem, Submenu};
use tauri::webview::{NewWindowResponse, PageLoadEvent};
use tauri::{
    App, AppHandle, Manager, RunEvent, State, WebviewUrl, WebviewWindowBuilder, Window,
    WindowEvent,
};
use tracing::{debug, info, warn};

use crate::host::{MAIN_WINDOW, TauriHost, is_app_url, open_link_externally};
use crate::webview::{TauriEvents, WebviewAppearance};

const ABOUT_MENU_ID: &str = "about";

struct ShellState {
    bridge: Arc<Bridge>,
    host: Arc<TauriHost>,
    client: BridgeClient,
    store: SettingsStore,
    events: TauriEvents,
    tracker: Mutex<MaximizeTracker>,
}

impl ShellState {
    fn sync_native_theme(&self, theme: Theme) {
        if let Err(err) = self.host.set_native_theme(native_theme(theme)) {
            warn!(error = %err, "Failed to update native theme");
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsSnapshot {
    settings: Settings,
    has_unsaved_changes: bool,
    is_loading: bool,
}

fn native_theme(theme: Theme) -> NativeTheme {
    match theme {
        Theme::Light => NativeTheme::Light,
        Theme::Dark => NativeTheme::Dark,
        Theme::Auto => NativeTheme::System,
    }
}

#[tauri::command]
async fn bridge_invoke(
    state: State<'_, ShellState>,
    channel: String,
    args: Option<Vec<Value>>,
) -> Result<Value, String> {
    state
        .bridge
        .invoke(&channel, args.unwrap_or_default())
        .await
        .map_err(|err| err.to_string())
}

#[tauri::command]
async fn settings_get(state: State<'_, ShellState>) -> Result<SettingsSnapshot, String> {
    Ok(SettingsSnapshot {
        settings: state.store.settings(),
        has_unsaved_changes: state.store.has_unsaved_changes(),
        is_loading: state.store.is_loading(),
    })
}

#[tauri::command]
async fn settings_update_field(
    state: State<'_, ShellState>,
    key: String,
    value: Value,
) -> Result<Settings, String> {
    state
        .store
        .update_field(&key, value)
        .map_err(|err| err.to_string())?;
    let settings = state.store.settings();
    if key == "theme" {
        state.sync_native_theme(settings.theme);
    }
    Ok(settings)
}

#[tauri::command]
async fn settings_update_nested(
    state: State<'_, ShellState>,
    group: String,
    field: String,
    value: Value,
) -> Result<Settings, String> {
    state
        .store
        .update_nested(&group, &field, value)
        .map_err(|err| err.to_string())?;
    Ok(state.store.settings())
}

#[tauri::command]
async fn settings_reset(state: State<'_, ShellState>) -> Result<Settings, String> {
    state.store.reset();
    let settings = state.store.settings();
    state.sync_native_theme(settings.theme);
    Ok(settings)
}

#[tauri::command]
async fn settings_save(state: State<'_, ShellState>) -> Result<bool, String> {
    Ok(state.store.save_and_notify(&state.client).await)
}

#[tauri::command]
async fn settings_export(state: State<'_, ShellState>) -> Result<bool, String> {
    Ok(state.store.export_to_file(&state.client).await)
}

#[tauri::command]
async fn settings_import_file(state: State<'_, ShellState>) -> Result<ImportOutcome, String> {
    Ok(state.store.import_from_file(&state.client).await)
}

#[tauri::command]
async fn settings_import_json(
    state: State<'_, ShellState>,
    text: String,
) -> Result<Settings, String> {
    state
        .store
        .import_json(&text)
        .map_err(|err| err.to_string())?;
    let settings = state.store.settings();
    state.sync_native_theme(settings.theme);
    Ok(settings)
}

fn setup_shell(app: &mut App, config: &ShellConfig) -> anyhow::Result<()> {
    let handle = app.handle().clone();

    let about = MenuItem::with_id(app, ABOUT_MENU_ID, "About", true, None::<&str>)?;
    let help = Submenu::with_items(app, "Help", true, &[&about])?;
    let menu = Menu::default(&handle)?;
    menu.append(&help)?;
    app.set_menu(menu)?;

    let host = Arc::new(TauriHost::new(handle.clone()));
    let bridge = Bridge::install(Arc::clone(&host) as Arc<dyn Host>);
    let client = BridgeClient::connected(Arc::clone(&bridge));

    let options = StoreOptions::default().with_autosave_delay(config.autosave.delay());
    let store = SettingsStore::new(
        Arc::new(FileStorage::new(config.storage_directory())),
        options,
        Some(Arc::new(WebviewAppearance::new(handle.clone()))),
    );
    let report = store.initialize();
    if let Some(error) = &report.error {
        warn!(error = %error, "Starting from default settings");
    }
    let initial_theme = store.settings().theme;

    app.manage(ShellState {
        bridge,
        host,
        client,
        store,
        events: TauriEvents::new(handle.clone()),
        tracker: Mutex::new(MaximizeTracker::default()),
    });

    let theme = match native_theme(initial_theme) {
        NativeTheme::System => None,
        NativeTheme::Light => Some(tauri::Theme::Light),
        NativeTheme::Dark => Some(tauri::Theme::Dark),
    };
    let window = &config.window;
    WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
        .title(&window.title)
        .inner_size(f64::from(window.width), f64::from(window.height))
        .min_inner_size(f64::from(window.min_width), f64::from(window.min_height))
        .theme(theme)
        .on_navigation(|url| {
            if is_app_url(url) {
                return true;
            }
            open_link_externally(url);
            false
        })
        .on_new_window(|url, _features| {
            open_link_externally(&url);
            NewWindowResponse::Deny
        })
        .build()
        .context("failed to create the main window")?;

    info!(
        title = %window.title,
        width = window.width,
        height = window.height,
        "Main window created"
    );
    Ok(())
}

fn handle_window_event(window: &Window, event: &WindowEvent) {
    if window.label() != MAIN_WINDOW {
        return;
    }
    let Some(state) = window.try_state::<ShellState>() else {
        return;
    };

    match event {
        WindowEvent::Resized(_) => {
            let Ok(maximized) = window.is_maximized() else {
                return;
            };
            let change = state
                .tracker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(maximized);
            if let Some(change) = change {
                push_event(&state.events, change);
            }
        }
        WindowEvent::Focused(focused) => {
            push_event(&state.events, PushEvent::WindowFocus(*focused));
        }
        WindowEvent::Destroyed => {
            if cfg!(target_os = "macos") {
                debug!("Main window closed, keeping the app alive");
                return;
            }
            state.bridge.teardown();
            state.store.flush_pending();
        }
        _ => {}
    }
}

fn handle_menu_event(app: &AppHandle, id: &str) {
    if id != ABOUT_MENU_ID {
        return;
    }
    if let Some(state) = app.try_state::<ShellState>() {
        push_event(&state.events, PushEvent::ShowAbout);
    }
}

fn main() -> anyhow::Result<()> {
    if let Err(err) = init_logging(LoggingDestination::FileOnly) {
        eprintln!("[Deskshell] Logging disabled: {err}");
    }

    let load = load_config();
    for warning in &load.warnings {
        warn!(warning = %warning, "Shell config adjusted");
    }
    let config = load.config;

    let app = tauri::Builder::default()
        .setup(move |app| {
            setup_shell(app, &config)?;
            Ok(())
        })
        .on_menu_event(|app, event| handle_menu_event(app, event.id().0.as_str()))
        .on_page_load(|webview, payload| {
            if payload.event() != PageLoadEvent::Finished {
                return;
            }
            if let Some(state) = webview.try_state::<ShellState>() {
                state.store.apply_appearance();
            }
        })
        .on_window_event(handle_window_event)
        .invoke_handler(tauri::generate_handler![
            bridge_invoke,
            settings_get,
            settings_update_field,
            settings_update_nested,
            settings_reset,
            settings_save,
            settings_export,
            settings_import_file,
            settings_import_json
        ])
        .build(tauri::generate_context!())
        .context("failed to build the Tauri application")?;

    app.run(|handle, event| {
        if let RunEvent::Exit = event {
            if let Some(state) = handle.try_state::<ShellState>() {
                state.store.flush_pending();
            }
            info!("Deskshell exiting");
        }
    });
    Ok(())
}
