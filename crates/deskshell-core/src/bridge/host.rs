//! Capabilities the privileged host process provides to the bridge.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::dialog::{
    MessageBoxOptions, MessageBoxResult, OpenDialogOptions, OpenDialogResult, SaveDialogOptions,
    SaveDialogResult,
};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Platform(String),
}

impl HostError {
    pub fn platform(message: impl ToString) -> Self {
        HostError::Platform(message.to_string())
    }
}

/// Versions of the runtime pieces the shell is built from.
///
/// Field names on the wire stay `node`/`electron`/`chrome` so existing
/// front-ends keep reading them: they carry the language runtime, the host
/// framework and the embedded webview respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersions {
    #[serde(rename = "node")]
    pub runtime: String,
    #[serde(rename = "electron")]
    pub host: String,
    #[serde(rename = "chrome")]
    pub webview: String,
}

/// Theme used for native window chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeTheme {
    System,
    Light,
    Dark,
}

impl NativeTheme {
    /// Accepts the values the front-end sends; `auto` means follow the system.
    pub fn from_request(value: &str) -> Option<Self> {
        match value {
            "system" | "auto" => Some(NativeTheme::System),
            "light" => Some(NativeTheme::Light),
            "dark" => Some(NativeTheme::Dark),
            _ => None,
        }
    }
}

/// Platform identifier in the `process.platform` vocabulary.
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Privileged operations backing the bridge channels.
///
/// Window operations are no-ops and dialogs answer `Ok(None)` when the host
/// has no window.
pub trait Host: Send + Sync {
    fn app_version(&self) -> String;

    fn platform(&self) -> String {
        current_platform().to_string()
    }

    fn versions(&self) -> RuntimeVersions;

    fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> Result<Option<MessageBoxResult>, HostError>;

    fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> Result<Option<OpenDialogResult>, HostError>;

    fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<Option<SaveDialogResult>, HostError>;

    fn minimize(&self) -> Result<(), HostError>;

    fn maximize(&self) -> Result<(), HostError>;

    fn unmaximize(&self) -> Result<(), HostError>;

    fn is_maximized(&self) -> Result<bool, HostError>;

    fn close(&self) -> Result<(), HostError>;

    fn set_native_theme(&self, theme: NativeTheme) -> Result<(), HostError>;

    /// Writes UTF-8 text, replacing any existing file.
    fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        fs::write(path, content)?;
        Ok(())
    }

    fn open_external(&self, url: &Url) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_and_system_map_to_system() {
        assert_eq!(NativeTheme::from_request("auto"), Some(NativeTheme::System));
        assert_eq!(NativeTheme::from_request("system"), Some(NativeTheme::System));
        assert_eq!(NativeTheme::from_request("dark"), Some(NativeTheme::Dark));
        assert_eq!(NativeTheme::from_request("sepia"), None);
    }

    #[test]
    fn versions_keep_front_end_field_names() {
        let versions = RuntimeVersions {
            runtime: "1.90.0".to_string(),
            host: "2.1.0".to_string(),
            webview: "2.44".to_string(),
        };
        let value = serde_json::to_value(&versions).unwrap();
        assert_eq!(value["node"], "1.90.0");
        assert_eq!(value["electron"], "2.1.0");
        assert_eq!(value["chrome"], "2.44");
    }

    #[test]
    fn platform_uses_process_vocabulary() {
        let platform = current_platform();
        assert_ne!(platform, "macos");
        assert_ne!(platform, "windows");
        assert!(!platform.is_empty());
    }
}
