//! Front-end facing handle to the bridge.
//!
//! Code running without the desktop host (a plain browser, a headless test)
//! holds a detached client: every call then resolves to its fallback value
//! instead of failing.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::Channel;
use super::dialog::{
    MessageBoxOptions, MessageBoxResult, OpenDialogOptions, OpenDialogResult, SaveDialogOptions,
    SaveDialogResult,
};
use super::dispatch::{Bridge, OpResult};
use super::host::RuntimeVersions;

const BRIDGE_UNAVAILABLE: &str = "desktop bridge is not available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub version: String,
    pub runtime_version: String,
    pub host_version: String,
    pub webview_version: String,
}

#[derive(Debug, Clone, Default)]
pub struct BridgeClient {
    bridge: Option<Arc<Bridge>>,
}

impl BridgeClient {
    pub fn connected(bridge: Arc<Bridge>) -> Self {
        Self {
            bridge: Some(bridge),
        }
    }

    pub fn detached() -> Self {
        Self { bridge: None }
    }

    pub fn is_available(&self) -> bool {
        self.bridge.as_ref().is_some_and(|bridge| bridge.is_installed())
    }

    async fn call<T: DeserializeOwned>(&self, channel: Channel, args: Vec<Value>) -> Option<T> {
        let bridge = self.bridge.as_ref()?;
        let value = bridge.invoke(channel.as_str(), args).await.ok()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(channel = %channel, error = %err, "Unexpected bridge response shape");
                None
            }
        }
    }

    async fn call_op(&self, channel: Channel, args: Vec<Value>) -> OpResult {
        if self.bridge.is_none() {
            return OpResult::failed(BRIDGE_UNAVAILABLE);
        }
        self.call(channel, args)
            .await
            .unwrap_or_else(|| OpResult::failed(format!("{channel} did not answer")))
    }

    pub async fn get_version(&self) -> Option<String> {
        self.call(Channel::AppGetVersion, Vec::new()).await
    }

    pub async fn get_platform(&self) -> Option<String> {
        self.call(Channel::AppGetPlatform, Vec::new()).await
    }

    pub async fn get_versions(&self) -> Option<RuntimeVersions> {
        self.call(Channel::AppGetVersions, Vec::new()).await
    }

    pub async fn system_info(&self) -> Option<SystemInfo> {
        let (platform, version, versions) = tokio::join!(
            self.get_platform(),
            self.get_version(),
            self.get_versions()
        );
        let versions = versions?;
        Some(SystemInfo {
            platform: platform?,
            version: version?,
            runtime_version: versions.runtime,
            host_version: versions.host,
            webview_version: versions.webview,
        })
    }

    pub async fn show_message_box(&self, options: &MessageBoxOptions) -> Option<MessageBoxResult> {
        let args = vec![serde_json::to_value(options).ok()?];
        self.call::<Option<MessageBoxResult>>(Channel::DialogShowMessageBox, args)
            .await
            .flatten()
    }

    pub async fn show_open_dialog(&self, options: &OpenDialogOptions) -> Option<OpenDialogResult> {
        let args = vec![serde_json::to_value(options).ok()?];
        self.call::<Option<OpenDialogResult>>(Channel::DialogShowOpenDialog, args)
            .await
            .flatten()
    }

    pub async fn show_save_dialog(&self, options: &SaveDialogOptions) -> Option<SaveDialogResult> {
        let args = vec![serde_json::to_value(options).ok()?];
        self.call::<Option<SaveDialogResult>>(Channel::DialogShowSaveDialog, args)
            .await
            .flatten()
    }

    pub async fn minimize_window(&self) {
        let _: Option<Value> = self.call(Channel::WindowMinimize, Vec::new()).await;
    }

    pub async fn maximize_window(&self) {
        let _: Option<Value> = self.call(Channel::WindowMaximize, Vec::new()).await;
    }

    pub async fn close_window(&self) {
        let _: Option<Value> = self.call(Channel::WindowClose, Vec::new()).await;
    }

    pub async fn is_window_maximized(&self) -> bool {
        self.call(Channel::WindowIsMaximized, Vec::new())
            .await
            .unwrap_or(false)
    }

    pub async fn update_theme(&self, theme: &str) {
        let _: Option<Value> = self
            .call(Channel::ThemeUpdate, vec![Value::from(theme)])
            .await;
    }

    pub async fn write_file(&self, path: &str, content: &str) -> OpResult {
        self.call_op(
            Channel::FsWriteFile,
            vec![Value::from(path), Value::from(content)],
        )
        .await
    }

    pub async fn open_external(&self, url: &str) -> OpResult {
        self.call_op(Channel::ShellOpenExternal, vec![Value::from(url)])
            .await
    }
}
