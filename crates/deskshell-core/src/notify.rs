//! Reporting outcomes to the user through native message boxes.

use std::fmt::Display;
use std::future::Future;

use tracing::{error, info, warn};

use crate::bridge::{BridgeClient, MessageBoxKind, MessageBoxOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHandlerOptions {
    pub show_user_notification: bool,
    pub log: bool,
    pub title: String,
    pub kind: MessageBoxKind,
}

impl Default for ErrorHandlerOptions {
    fn default() -> Self {
        Self {
            show_user_notification: true,
            log: true,
            title: "Error".to_string(),
            kind: MessageBoxKind::Error,
        }
    }
}

impl ErrorHandlerOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self {
            show_user_notification: false,
            ..Self::default()
        }
    }
}

/// Logs `error` and shows `"{message}: {error}"` unless told not to.
///
/// Returns the text that was (or would have been) shown.
pub async fn handle_error(
    client: &BridgeClient,
    error: &(dyn Display + Sync),
    message: &str,
    options: &ErrorHandlerOptions,
) -> String {
    let full_message = format!("{message}: {error}");
    if options.log {
        error!(error = %error, "{message}");
    }

    if options.show_user_notification && client.is_available() {
        let dialog = MessageBoxOptions::new(options.kind, &options.title, &full_message);
        if client.show_message_box(&dialog).await.is_none() {
            warn!(title = %options.title, "Failed to show error notification");
        }
    }
    full_message
}

pub async fn handle_success(client: &BridgeClient, message: &str, title: &str) {
    info!(title, "{message}");
    if !client.is_available() {
        return;
    }
    if client
        .show_message_box(&MessageBoxOptions::info(title, message))
        .await
        .is_none()
    {
        warn!(title, "Failed to show success notification");
    }
}

/// Awaits `operation`, reporting a failure through [`handle_error`].
pub async fn with_error_handling<T, E, F>(
    client: &BridgeClient,
    operation: F,
    message: &str,
    options: &ErrorHandlerOptions,
) -> Option<T>
where
    E: Display + Sync,
    F: Future<Output = Result<T, E>>,
{
    match operation.await {
        Ok(value) => Some(value),
        Err(err) => {
            handle_error(client, &err, message, options).await;
            None
        }
    }
}
