#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use deskshell_core::bridge::{
    Bridge, BridgeClient, Host, HostError, MessageBoxOptions, MessageBoxResult, NativeTheme,
    OpenDialogOptions, OpenDialogResult, RuntimeVersions, SaveDialogOptions, SaveDialogResult,
};
use url::Url;

/// Scriptable host that records every privileged call.
#[derive(Default)]
pub struct FakeHost {
    pub headless: bool,
    pub maximized: Mutex<bool>,
    pub minimized: AtomicUsize,
    pub closed: AtomicUsize,
    pub theme: Mutex<Option<NativeTheme>>,
    pub message_boxes: Mutex<Vec<MessageBoxOptions>>,
    pub save_answer: Mutex<Option<SaveDialogResult>>,
    pub save_requests: Mutex<Vec<SaveDialogOptions>>,
    pub open_answer: Mutex<Option<OpenDialogResult>>,
    pub written: Mutex<Vec<(PathBuf, String)>>,
    pub fail_writes: AtomicBool,
    pub opened: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A host whose window is gone: dialogs answer nothing.
    pub fn headless() -> Arc<Self> {
        Arc::new(Self {
            headless: true,
            ..Self::default()
        })
    }

    pub fn answer_save(&self, answer: SaveDialogResult) {
        *self.save_answer.lock().unwrap() = Some(answer);
    }

    pub fn answer_open(&self, answer: OpenDialogResult) {
        *self.open_answer.lock().unwrap() = Some(answer);
    }

    pub fn titles(&self) -> Vec<String> {
        self.message_boxes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|options| options.title.clone())
            .collect()
    }

    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.written.lock().unwrap().clone()
    }
}

impl Host for FakeHost {
    fn app_version(&self) -> String {
        "1.2.3".to_string()
    }

    fn platform(&self) -> String {
        "linux".to_string()
    }

    fn versions(&self) -> RuntimeVersions {
        RuntimeVersions {
            runtime: "1.85.0".to_string(),
            host: "2.0.0".to_string(),
            webview: "webkitgtk-2.44".to_string(),
        }
    }

    fn show_message_box(
        &self,
        options: MessageBoxOptions,
    ) -> Result<Option<MessageBoxResult>, HostError> {
        if self.headless {
            return Ok(None);
        }
        self.message_boxes.lock().unwrap().push(options);
        Ok(Some(MessageBoxResult::default()))
    }

    fn show_open_dialog(
        &self,
        _options: OpenDialogOptions,
    ) -> Result<Option<OpenDialogResult>, HostError> {
        if self.headless {
            return Ok(None);
        }
        Ok(Some(
            self.open_answer
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(OpenDialogResult::canceled),
        ))
    }

    fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<Option<SaveDialogResult>, HostError> {
        if self.headless {
            return Ok(None);
        }
        self.save_requests.lock().unwrap().push(options);
        Ok(Some(
            self.save_answer
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(SaveDialogResult::canceled),
        ))
    }

    fn minimize(&self) -> Result<(), HostError> {
        self.minimized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn maximize(&self) -> Result<(), HostError> {
        *self.maximized.lock().unwrap() = true;
        Ok(())
    }

    fn unmaximize(&self) -> Result<(), HostError> {
        *self.maximized.lock().unwrap() = false;
        Ok(())
    }

    fn is_maximized(&self) -> Result<bool, HostError> {
        Ok(!self.headless && *self.maximized.lock().unwrap())
    }

    fn close(&self) -> Result<(), HostError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_native_theme(&self, theme: NativeTheme) -> Result<(), HostError> {
        *self.theme.lock().unwrap() = Some(theme);
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HostError::platform("EACCES: permission denied"));
        }
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));
        Ok(())
    }

    fn open_external(&self, url: &Url) -> Result<(), HostError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub fn connect(host: &Arc<FakeHost>) -> (Arc<Bridge>, BridgeClient) {
    let bridge = Bridge::install(Arc::clone(host) as Arc<dyn Host>);
    let client = BridgeClient::connected(Arc::clone(&bridge));
    (bridge, client)
}
