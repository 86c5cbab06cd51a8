use deskshell_core::appearance::{AppearanceSink, ThemeClass, font_size_style};
use deskshell_core::bridge::EventSink;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager};
use tracing::warn;

use crate::host::MAIN_WINDOW;

/// Applies theme and font size to the main window's document root.
pub struct WebviewAppearance {
    app: AppHandle,
}

impl WebviewAppearance {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn eval(&self, script: &str) {
        let Some(window) = self.app.get_webview_window(MAIN_WINDOW) else {
            return;
        };
        if let Err(err) = window.eval(script) {
            warn!(error = %err, "Failed to update document appearance");
        }
    }
}

impl AppearanceSink for WebviewAppearance {
    fn apply_theme(&self, class: ThemeClass) {
        let stale: Vec<String> = ThemeClass::ALL
            .iter()
            .map(|class| format!("'{}'", class.as_str()))
            .collect();
        self.eval(&format!(
            "(() => {{ const root = document.documentElement; root.classList.remove({}); root.classList.add('{}'); }})();",
            stale.join(", "),
            class.as_str()
        ));
    }

    fn apply_font_size(&self, px: u32) {
        self.eval(&format!(
            "document.documentElement.style.fontSize = '{}';",
            font_size_style(px)
        ));
    }

    fn prefers_dark(&self) -> bool {
        self.app
            .get_webview_window(MAIN_WINDOW)
            .and_then(|window| window.theme().ok())
            .is_some_and(|theme| theme == tauri::Theme::Dark)
    }
}

/// Forwards push notifications to every webview as Tauri events.
pub struct TauriEvents {
    app: AppHandle,
}

impl TauriEvents {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEvents {
    fn emit(&self, event: &str, payload: Value) {
        if let Err(err) = self.app.emit(event, payload) {
            warn!(event, error = %err, "Failed to emit event");
        }
    }
}
