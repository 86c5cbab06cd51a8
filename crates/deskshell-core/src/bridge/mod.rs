//! The named-channel boundary between the front-end and the privileged host.

pub mod client;
pub mod dialog;
pub mod dispatch;
pub mod events;
pub mod host;

use std::fmt;
use std::str::FromStr;

pub use client::{BridgeClient, SystemInfo};
pub use dialog::{
    FileFilter, MessageBoxKind, MessageBoxOptions, MessageBoxResult, OpenDialogOptions,
    OpenDialogProperty, OpenDialogResult, SaveDialogOptions, SaveDialogResult,
};
pub use dispatch::{Bridge, BridgeError, OpResult, parse_external_url};
pub use events::{EventHub, EventSink, MaximizeTracker, NoopEventSink, PushEvent, push_event};
pub use host::{Host, HostError, NativeTheme, RuntimeVersions, current_platform};

/// Every request/response channel the host answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    AppGetVersion,
    AppGetPlatform,
    AppGetVersions,
    DialogShowMessageBox,
    DialogShowOpenDialog,
    DialogShowSaveDialog,
    WindowMinimize,
    WindowMaximize,
    WindowClose,
    WindowIsMaximized,
    ThemeUpdate,
    FsWriteFile,
    ShellOpenExternal,
}

impl Channel {
    pub const ALL: [Channel; 13] = [
        Channel::AppGetVersion,
        Channel::AppGetPlatform,
        Channel::AppGetVersions,
        Channel::DialogShowMessageBox,
        Channel::DialogShowOpenDialog,
        Channel::DialogShowSaveDialog,
        Channel::WindowMinimize,
        Channel::WindowMaximize,
        Channel::WindowClose,
        Channel::WindowIsMaximized,
        Channel::ThemeUpdate,
        Channel::FsWriteFile,
        Channel::ShellOpenExternal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::AppGetVersion => "app:getVersion",
            Channel::AppGetPlatform => "app:getPlatform",
            Channel::AppGetVersions => "app:getVersions",
            Channel::DialogShowMessageBox => "dialog:showMessageBox",
            Channel::DialogShowOpenDialog => "dialog:showOpenDialog",
            Channel::DialogShowSaveDialog => "dialog:showSaveDialog",
            Channel::WindowMinimize => "window:minimize",
            Channel::WindowMaximize => "window:maximize",
            Channel::WindowClose => "window:close",
            Channel::WindowIsMaximized => "window:isMaximized",
            Channel::ThemeUpdate => "theme:update",
            Channel::FsWriteFile => "fs:writeFile",
            Channel::ShellOpenExternal => "shell:openExternal",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == name)
            .ok_or_else(|| format!("unknown channel '{name}'"))
    }
}
