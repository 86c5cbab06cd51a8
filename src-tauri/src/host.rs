use std::path::{Path, PathBuf};

use deskshell_core::bridge::{
    FileFilter, Host, HostError, MessageBoxKind, MessageBoxOptions, MessageBoxResult, NativeTheme,
    OpenDialogOptions, OpenDialogProperty, OpenDialogResult, RuntimeVersions, SaveDialogOptions,
    SaveDialogResult, parse_external_url,
};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tauri::{AppHandle, Manager, WebviewWindow};
use tracing::{debug, info, warn};
use url::Url;

pub const MAIN_WINDOW: &str = "main";

/// `rustc --version` of the toolchain that built this binary.
const RUSTC_VERSION: &str = env!("DESKSHELL_RUSTC_VERSION");

/// Whether `url` points at the bundled front-end rather than the outside world.
pub fn is_app_url(url: &Url) -> bool {
    match url.scheme() {
        "tauri" | "about" | "data" | "blob" => true,
        "http" | "https" => url.host_str() == Some("tauri.localhost"),
        _ => false,
    }
}

/// Hands a link the webview wanted to open itself to the system opener.
///
/// Returns whether the URL passed the scheme allowlist and was opened.
pub fn open_link_externally(url: &Url) -> bool {
    let url = match parse_external_url(url.as_str()) {
        Ok(url) => url,
        Err(reason) => {
            warn!(url = %url, reason = %reason, "Blocked link from the webview");
            return false;
        }
    };
    match open::that(url.as_str()) {
        Ok(()) => {
            info!(url = %url, "Opened link in the system browser");
            true
        }
        Err(err) => {
            warn!(url = %url, error = %err, "Failed to open link");
            false
        }
    }
}

/// [`Host`] backed by the main Tauri window, `rfd` dialogs and the OS opener.
///
/// Bridge handlers run on the blocking pool, so the synchronous `rfd`
/// dialogs here never stall the async runtime.
pub struct TauriHost {
    app: AppHandle,
}

impl TauriHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn window(&self) -> Option<WebviewWindow> {
        self.app.get_webview_window(MAIN_WINDOW)
    }

    fn with_window(
        &self,
        action: impl FnOnce(&WebviewWindow) -> tauri::Result<()>,
    ) -> Result<(), HostError> {
        match self.window() {
            Some(window) => action(&window).map_err(HostError::platform),
            None => Ok(()),
        }
    }
}

impl Host for TauriHost {
    fn app_version(&self) -> String {
        self.app.package_info().version.to_string()
    }

    fn versions(&self) -> RuntimeVersions {
        RuntimeVersions {
            runtime: RUSTC_VERSION.to_string(),
            host: tauri::VERSION.to_string(),
            webview: tauri::webview_version().unwrap_or_else(|_| "unknown".to_string()),
        }
    }

    fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> Result<Option<MessageBoxResult>, HostError> {
        if self.window().is_none() {
            return Ok(None);
        }

        let mut description = options.message.clone();
        if let Some(detail) = options.detail.as_deref() {
            description.push_str("\n\n");
            description.push_str(detail);
        }

        let mut dialog = MessageDialog::new()
            .set_level(message_level(options.kind))
            .set_description(description)
            .set_buttons(message_buttons(&options.buttons));
        if let Some(title) = options.title.as_deref() {
            dialog = dialog.set_title(title);
        }

        let answer = dialog.show();
        debug!(answer = ?answer, "Message box closed");
        Ok(Some(MessageBoxResult {
            response: response_index(&options, answer),
            checkbox_checked: false,
        }))
    }

    fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> Result<Option<OpenDialogResult>, HostError> {
        if self.window().is_none() {
            return Ok(None);
        }

        let dialog = file_dialog(
            options.title.as_deref(),
            options.default_path.as_deref(),
            &options.filters,
        );
        let multiple = options.has(OpenDialogProperty::MultiSelections);
        let picked: Vec<PathBuf> = match (options.has(OpenDialogProperty::OpenDirectory), multiple)
        {
            (true, true) => dialog.pick_folders().unwrap_or_default(),
            (true, false) => dialog.pick_folder().into_iter().collect(),
            (false, true) => dialog.pick_files().unwrap_or_default(),
            (false, false) => dialog.pick_file().into_iter().collect(),
        };

        Ok(Some(OpenDialogResult::picked(
            picked
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
        )))
    }

    fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<Option<SaveDialogResult>, HostError> {
        if self.window().is_none() {
            return Ok(None);
        }

        let dialog = file_dialog(
            options.title.as_deref(),
            options.default_path.as_deref(),
            &options.filters,
        );
        Ok(Some(match dialog.save_file() {
            Some(path) => SaveDialogResult::picked(path.to_string_lossy()),
            None => SaveDialogResult::canceled(),
        }))
    }

    fn minimize(&self) -> Result<(), HostError> {
        self.with_window(|window| window.minimize())
    }

    fn maximize(&self) -> Result<(), HostError> {
        self.with_window(|window| window.maximize())
    }

    fn unmaximize(&self) -> Result<(), HostError> {
        self.with_window(|window| window.unmaximize())
    }

    fn is_maximized(&self) -> Result<bool, HostError> {
        match self.window() {
            Some(window) => window.is_maximized().map_err(HostError::platform),
            None => Ok(false),
        }
    }

    fn close(&self) -> Result<(), HostError> {
        self.with_window(|window| window.close())
    }

    fn set_native_theme(&self, theme: NativeTheme) -> Result<(), HostError> {
        let theme = match theme {
            NativeTheme::System => None,
            NativeTheme::Light => Some(tauri::Theme::Light),
            NativeTheme::Dark => Some(tauri::Theme::Dark),
        };
        self.with_window(|window| window.set_theme(theme))
    }

    fn open_external(&self, url: &Url) -> Result<(), HostError> {
        open::that(url.as_str())?;
        Ok(())
    }
}

fn file_dialog(title: Option<&str>, default_path: Option<&str>, filters: &[FileFilter]) -> FileDialog {
    let mut dialog = FileDialog::new();
    if let Some(title) = title {
        dialog = dialog.set_title(title);
    }
    if let Some(path) = default_path.map(Path::new) {
        if path.is_dir() {
            dialog = dialog.set_directory(path);
        } else {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                dialog = dialog.set_directory(parent);
            }
            if let Some(name) = path.file_name() {
                dialog = dialog.set_file_name(name.to_string_lossy());
            }
        }
    }
    for filter in filters {
        dialog = dialog.add_filter(filter.name.as_str(), filter.extensions.as_slice());
    }
    dialog
}

fn message_level(kind: MessageBoxKind) -> MessageLevel {
    match kind {
        MessageBoxKind::Error => MessageLevel::Error,
        MessageBoxKind::Warning => MessageLevel::Warning,
        MessageBoxKind::None | MessageBoxKind::Info | MessageBoxKind::Question => {
            MessageLevel::Info
        }
    }
}

/// Native dialogs offer at most three buttons; extra labels are dropped.
fn message_buttons(labels: &[String]) -> MessageButtons {
    match labels {
        [] => MessageButtons::Ok,
        [only] => MessageButtons::OkCustom(only.clone()),
        [ok, cancel] => MessageButtons::OkCancelCustom(ok.clone(), cancel.clone()),
        [yes, no, cancel, ..] => {
            MessageButtons::YesNoCancelCustom(yes.clone(), no.clone(), cancel.clone())
        }
    }
}

fn response_index(options: &MessageBoxOptions, answer: MessageDialogResult) -> usize {
    let last = options.buttons.len().saturating_sub(1);
    match answer {
        MessageDialogResult::Custom(label) => options
            .buttons
            .iter()
            .position(|button| *button == label)
            .unwrap_or(last),
        MessageDialogResult::Ok | MessageDialogResult::Yes => 0,
        MessageDialogResult::No => last.min(1),
        MessageDialogResult::Cancel => options.cancel_id.unwrap_or(last),
    }
}
