//! Channel table and request dispatch.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::Channel;
use super::host::{Host, HostError, NativeTheme};

const ALLOWED_URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    #[error("no handler is registered for '{0}'")]
    NotRegistered(Channel),
    #[error("invalid arguments for '{channel}': {reason}")]
    BadArguments { channel: Channel, reason: String },
    #[error("'{channel}' failed: {source}")]
    Host {
        channel: Channel,
        #[source]
        source: HostError,
    },
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("handler for '{0}' did not complete")]
    Aborted(Channel),
}

/// Uniform answer of the channels that touch the filesystem or the OS shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

type Handler = fn(&dyn Host, &[Value]) -> Result<Value, BridgeError>;

/// Host-side dispatch table from channel name to handler.
pub struct Bridge {
    host: Arc<dyn Host>,
    handlers: RwLock<HashMap<Channel, Handler>>,
}

impl Bridge {
    /// Registers a handler for every channel.
    pub fn install(host: Arc<dyn Host>) -> Arc<Self> {
        let handlers: HashMap<Channel, Handler> = Channel::ALL
            .into_iter()
            .map(|channel| (channel, handler_for(channel)))
            .collect();
        info!(channels = handlers.len(), "Bridge handlers installed");
        Arc::new(Self {
            host,
            handlers: RwLock::new(handlers),
        })
    }

    /// Removes every handler; later calls answer [`BridgeError::NotRegistered`].
    pub fn teardown(&self) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = handlers.len();
        handlers.clear();
        info!(removed, "Bridge handlers removed");
    }

    pub fn is_installed(&self) -> bool {
        !self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Registered channels in table order.
    pub fn channels(&self) -> Vec<Channel> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Channel::ALL
            .into_iter()
            .filter(|channel| handlers.contains_key(channel))
            .collect()
    }

    /// Handles one request. The handler runs on the blocking pool, so native
    /// dialogs waiting on the user do not hold up other calls.
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let channel: Channel = name
            .parse()
            .map_err(|_| BridgeError::UnknownChannel(name.to_string()))?;
        let handler = self.handler(channel)?;
        let host = Arc::clone(&self.host);
        let started = Instant::now();

        let outcome = match tokio::task::spawn_blocking(move || handler(host.as_ref(), &args)).await
        {
            Ok(result) => result,
            Err(err) => {
                error!(channel = %channel, error = %err, "Bridge handler panicked or was cancelled");
                Err(BridgeError::Aborted(channel))
            }
        };

        match &outcome {
            Ok(_) => debug!(
                channel = %channel,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Bridge call completed"
            ),
            Err(err) => warn!(channel = %channel, error = %err, "Bridge call failed"),
        }
        outcome
    }

    fn handler(&self, channel: Channel) -> Result<Handler, BridgeError> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .copied()
            .ok_or(BridgeError::NotRegistered(channel))
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("channels", &self.channels())
            .finish()
    }
}

fn handler_for(channel: Channel) -> Handler {
    match channel {
        Channel::AppGetVersion => |host, _| Ok(Value::String(host.app_version())),
        Channel::AppGetPlatform => |host, _| Ok(Value::String(host.platform())),
        Channel::AppGetVersions => |host, _| Ok(serde_json::to_value(host.versions())?),
        Channel::DialogShowMessageBox => show_message_box,
        Channel::DialogShowOpenDialog => show_open_dialog,
        Channel::DialogShowSaveDialog => show_save_dialog,
        Channel::WindowMinimize => |host, _| {
            host.minimize().map_err(host_error(Channel::WindowMinimize))?;
            Ok(Value::Null)
        },
        Channel::WindowMaximize => toggle_maximize,
        Channel::WindowClose => |host, _| {
            host.close().map_err(host_error(Channel::WindowClose))?;
            Ok(Value::Null)
        },
        Channel::WindowIsMaximized => |host, _| {
            let maximized = host
                .is_maximized()
                .map_err(host_error(Channel::WindowIsMaximized))?;
            Ok(Value::Bool(maximized))
        },
        Channel::ThemeUpdate => update_theme,
        Channel::FsWriteFile => write_file,
        Channel::ShellOpenExternal => open_external,
    }
}

fn host_error(channel: Channel) -> impl Fn(HostError) -> BridgeError {
    move |source| BridgeError::Host { channel, source }
}

fn arg<T: DeserializeOwned>(channel: Channel, args: &[Value], index: usize) -> Result<T, BridgeError> {
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| BridgeError::BadArguments {
        channel,
        reason: format!("argument {index}: {err}"),
    })
}

fn show_message_box(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::DialogShowMessageBox;
    let result = host
        .show_message_box(arg(channel, args, 0)?)
        .map_err(host_error(channel))?;
    Ok(serde_json::to_value(result)?)
}

fn show_open_dialog(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::DialogShowOpenDialog;
    let result = host
        .show_open_dialog(arg(channel, args, 0)?)
        .map_err(host_error(channel))?;
    Ok(serde_json::to_value(result)?)
}

fn show_save_dialog(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::DialogShowSaveDialog;
    let result = host
        .show_save_dialog(arg(channel, args, 0)?)
        .map_err(host_error(channel))?;
    Ok(serde_json::to_value(result)?)
}

/// Maximize is a toggle: a maximized window is restored instead.
fn toggle_maximize(host: &dyn Host, _args: &[Value]) -> Result<Value, BridgeError> {
    let to_host = host_error(Channel::WindowMaximize);
    if host.is_maximized().map_err(&to_host)? {
        host.unmaximize().map_err(&to_host)?;
    } else {
        host.maximize().map_err(&to_host)?;
    }
    Ok(Value::Null)
}

fn update_theme(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::ThemeUpdate;
    let requested: String = arg(channel, args, 0)?;
    let theme = NativeTheme::from_request(&requested).ok_or_else(|| BridgeError::BadArguments {
        channel,
        reason: format!("unknown theme '{requested}'"),
    })?;
    host.set_native_theme(theme).map_err(host_error(channel))?;
    Ok(Value::Null)
}

fn write_file(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::FsWriteFile;
    let outcome = match (
        arg::<String>(channel, args, 0),
        arg::<String>(channel, args, 1),
    ) {
        (Ok(path), Ok(content)) => match host.write_file(Path::new(&path), &content) {
            Ok(()) => OpResult::ok(),
            Err(err) => {
                error!(path = %path, error = %err, "Failed to write file");
                OpResult::failed(err.to_string())
            }
        },
        (Err(err), _) | (_, Err(err)) => OpResult::failed(err.to_string()),
    };
    Ok(serde_json::to_value(outcome)?)
}

fn open_external(host: &dyn Host, args: &[Value]) -> Result<Value, BridgeError> {
    let channel = Channel::ShellOpenExternal;
    let outcome = match arg::<String>(channel, args, 0) {
        Ok(raw) => match parse_external_url(&raw) {
            Ok(url) => match host.open_external(&url) {
                Ok(()) => OpResult::ok(),
                Err(err) => {
                    error!(url = %url, error = %err, "Failed to open external URL");
                    OpResult::failed(err.to_string())
                }
            },
            Err(reason) => OpResult::failed(reason),
        },
        Err(err) => OpResult::failed(err.to_string()),
    };
    Ok(serde_json::to_value(outcome)?)
}

/// Accepts only the URL schemes the shell hands to the system opener.
pub fn parse_external_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|err| format!("invalid URL '{raw}': {err}"))?;
    if !ALLOWED_URL_SCHEMES.contains(&url.scheme()) {
        return Err(format!("refusing to open '{}' URLs", url.scheme()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_urls_are_limited_to_web_and_mail() {
        assert!(parse_external_url("https://example.com/docs").is_ok());
        assert!(parse_external_url(" mailto:team@example.com ").is_ok());
        assert!(parse_external_url("file:///etc/passwd").is_err());
        assert!(parse_external_url("javascript:alert(1)").is_err());
        assert!(parse_external_url("not a url").is_err());
    }

    #[test]
    fn missing_argument_reports_its_position() {
        let err = arg::<String>(Channel::FsWriteFile, &[Value::from("a")], 1).unwrap_err();
        assert!(err.to_string().contains("argument 1"), "{err}");
    }

    #[test]
    fn op_result_omits_absent_error() {
        assert_eq!(
            serde_json::to_value(OpResult::ok()).unwrap(),
            serde_json::json!({ "success": true })
        );
        assert_eq!(
            serde_json::to_value(OpResult::failed("disk full")).unwrap(),
            serde_json::json!({ "success": false, "error": "disk full" })
        );
    }
}
