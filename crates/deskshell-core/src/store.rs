//! The settings store: current preferences, their persistence and the edits
//! the UI applies to them.
//!
//! A [`SettingsStore`] is an explicitly constructed context object. Clones
//! share state, so the window shell, the CLI and tests each build their own
//! and hand it to whatever needs it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::appearance::{self, AppearanceSink};
use crate::autosave::{AutosaveScheduler, DEFAULT_AUTOSAVE_DELAY};
use crate::bridge::{
    BridgeClient, FileFilter, MessageBoxKind, OpenDialogOptions, OpenDialogProperty,
    SaveDialogOptions,
};
use crate::notify::{self, ErrorHandlerOptions};
use crate::settings::{
    self, NotificationSettings, PerformanceSettings, PrivacySettings, Settings, SettingsError,
    TOP_LEVEL_KEYS, Theme, ValidationError,
};
use crate::storage::{KeyValueStorage, StorageError};

/// Storage key of the persisted settings blob.
pub const SETTINGS_KEY: &str = "app-settings";
/// Suggested file name for exports.
pub const EXPORT_FILE_NAME: &str = "app-settings.json";

const JSON_FILTER_NAME: &str = "JSON Files";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("settings are not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("rejected settings: {}", settings::join_violations(.0))]
    Invalid(Vec<ValidationError>),
    #[error("unknown setting '{0}'")]
    UnknownField(String),
}

impl From<SettingsError> for StoreError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Parse(source) => StoreError::Parse(source),
            SettingsError::Invalid(violations) => StoreError::Invalid(violations),
        }
    }
}

/// A typed edit of one top-level setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingUpdate {
    Theme(Theme),
    FontSize(u32),
    Notifications(NotificationSettings),
    Performance(PerformanceSettings),
    Privacy(PrivacySettings),
}

impl SettingUpdate {
    fn apply_to(self, settings: &mut Settings) -> Refresh {
        match self {
            SettingUpdate::Theme(theme) => {
                settings.theme = theme;
                Refresh::Theme
            }
            SettingUpdate::FontSize(px) => {
                settings.font_size = px;
                Refresh::FontSize
            }
            SettingUpdate::Notifications(group) => {
                settings.notifications = group;
                Refresh::Nothing
            }
            SettingUpdate::Performance(group) => {
                settings.performance = group;
                Refresh::Nothing
            }
            SettingUpdate::Privacy(group) => {
                settings.privacy = group;
                Refresh::Nothing
            }
        }
    }
}

/// Which document side effects a commit triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    Nothing,
    Theme,
    FontSize,
    Everything,
}

impl Refresh {
    fn for_key(key: &str) -> Self {
        match key {
            "theme" => Refresh::Theme,
            "fontSize" => Refresh::FontSize,
            _ => Refresh::Nothing,
        }
    }

    fn theme(self) -> bool {
        matches!(self, Refresh::Theme | Refresh::Everything)
    }

    fn font_size(self) -> bool {
        matches!(self, Refresh::FontSize | Refresh::Everything)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Default,
}

/// What [`SettingsStore::load`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub violations: Vec<ValidationError>,
    /// Read or parse failure that forced the defaults.
    pub error: Option<String>,
}

impl LoadReport {
    fn stored() -> Self {
        Self {
            source: LoadSource::Stored,
            violations: Vec::new(),
            error: None,
        }
    }

    fn defaults() -> Self {
        Self {
            source: LoadSource::Default,
            violations: Vec::new(),
            error: None,
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::defaults()
        }
    }

    fn rejected(violations: Vec<ValidationError>) -> Self {
        Self {
            violations,
            ..Self::defaults()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ImportOutcome {
    BridgeUnavailable,
    Canceled,
    /// A file was picked, but the bridge offers no way to read it.
    ReadUnavailable { path: String },
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key: String,
    pub autosave_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: SETTINGS_KEY.to_string(),
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
        }
    }
}

impl StoreOptions {
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct StoreState {
    settings: Settings,
    dirty: bool,
    loading: bool,
}

struct StoreInner {
    key: String,
    storage: Arc<dyn KeyValueStorage>,
    appearance: Option<Arc<dyn AppearanceSink>>,
    state: Mutex<StoreState>,
    /// Held from snapshot to dirty-flag update so writes land in commit order.
    write: Mutex<()>,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.state().settings.clone();
        let json = serde_json::to_string(&snapshot).map_err(StoreError::Serialize)?;
        self.storage.set(&self.key, &json)?;

        let mut state = self.state();
        // A mutation that landed during the write stays unsaved.
        if state.settings == snapshot {
            state.dirty = false;
        }
        debug!(key = %self.key, bytes = json.len(), "Settings persisted");
        Ok(())
    }

    fn refresh_appearance(&self, settings: &Settings, refresh: Refresh) {
        let Some(sink) = self.appearance.as_deref() else {
            return;
        };
        if refresh.theme() {
            let class = appearance::apply_theme(sink, settings.theme);
            debug!(theme = %settings.theme, class = class.as_str(), "Theme applied");
        }
        if refresh.font_size() {
            sink.apply_font_size(settings.font_size);
        }
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
    autosave: Arc<AutosaveScheduler>,
}

impl SettingsStore {
    /// Creates a store holding the defaults; call [`load`](Self::load) or
    /// [`initialize`](Self::initialize) to read persisted values.
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        options: StoreOptions,
        appearance: Option<Arc<dyn AppearanceSink>>,
    ) -> Self {
        let inner = Arc::new(StoreInner {
            key: options.key,
            storage,
            appearance,
            state: Mutex::new(StoreState::default()),
            write: Mutex::new(()),
        });

        let persisted = Arc::clone(&inner);
        let autosave = AutosaveScheduler::new(options.autosave_delay, move || {
            if let Err(err) = persisted.persist() {
                warn!(error = %err, "Autosave failed");
            }
        });

        Self {
            inner,
            autosave: Arc::new(autosave),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn settings(&self) -> Settings {
        self.inner.state().settings.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.state().dirty
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().loading
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Replaces the current state with what storage holds.
    ///
    /// Never fails: anything unreadable or invalid falls back to the defaults
    /// and is described in the returned report.
    pub fn load(&self) -> LoadReport {
        self.inner.state().loading = true;
        let (settings, report) = self.read_stored();

        let mut state = self.inner.state();
        state.settings = settings;
        state.dirty = false;
        state.loading = false;
        report
    }

    fn read_stored(&self) -> (Settings, LoadReport) {
        let key = &self.inner.key;
        let raw = match self.inner.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "No stored settings, using defaults");
                return (Settings::default(), LoadReport::defaults());
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read stored settings, using defaults");
                return (Settings::default(), LoadReport::failed(err));
            }
        };

        match settings::parse_settings(&raw) {
            Ok(settings) => {
                info!(key = %key, "Loaded stored settings");
                (settings, LoadReport::stored())
            }
            Err(SettingsError::Invalid(violations)) => {
                warn!(
                    key = %key,
                    count = violations.len(),
                    violations = %settings::join_violations(&violations),
                    "Stored settings failed validation, using defaults"
                );
                (Settings::default(), LoadReport::rejected(violations))
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to parse stored settings, using defaults");
                (Settings::default(), LoadReport::failed(err))
            }
        }
    }

    /// Loads, then reflects theme and font size onto the document.
    pub fn initialize(&self) -> LoadReport {
        let report = self.load();
        self.apply_appearance();
        report
    }

    /// Re-applies theme and font size, e.g. after the document was reloaded.
    pub fn apply_appearance(&self) {
        let settings = self.settings();
        self.inner.refresh_appearance(&settings, Refresh::Everything);
    }

    /// Writes the current state now, superseding any pending autosave.
    pub fn save(&self) -> Result<(), StoreError> {
        self.autosave.cancel();
        self.inner.persist().inspect_err(|err| {
            warn!(key = %self.inner.key, error = %err, "Failed to save settings");
        })
    }

    /// Writes a pending autosave immediately, if there is one.
    pub fn flush_pending(&self) {
        if self.autosave.is_pending() {
            self.autosave.flush();
        }
    }

    pub async fn save_and_notify(&self, client: &BridgeClient) -> bool {
        match self.save() {
            Ok(()) => {
                notify::handle_success(
                    client,
                    "Your settings have been saved successfully!",
                    "Settings Saved",
                )
                .await;
                true
            }
            Err(err) => {
                notify::handle_error(
                    client,
                    &err,
                    "Failed to save settings. Please try again.",
                    &ErrorHandlerOptions::titled("Save Failed"),
                )
                .await;
                false
            }
        }
    }

    pub fn reset(&self) {
        self.commit(Settings::default(), Refresh::Everything);
        info!("Settings reset to defaults");
    }

    pub fn update(&self, update: SettingUpdate) -> Result<(), StoreError> {
        let mut next = self.settings();
        let refresh = update.apply_to(&mut next);
        let violations = settings::validate(&next.to_value());
        if !violations.is_empty() {
            return Err(StoreError::Invalid(violations));
        }
        self.commit(next, refresh);
        Ok(())
    }

    /// Sets a top-level key from an untyped value, e.g. `("fontSize", 16)`.
    pub fn update_field(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if !TOP_LEVEL_KEYS.contains(&key) {
            return Err(StoreError::UnknownField(key.to_string()));
        }
        let mut candidate = self.settings().to_value();
        candidate[key] = value;
        let next = settings::parse_settings_value(&candidate)?;
        self.commit(next, Refresh::for_key(key));
        Ok(())
    }

    /// Sets one field of a nested group, e.g. `("privacy", "analytics", true)`.
    pub fn update_nested(&self, group: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let fields = settings::group_fields(group)
            .ok_or_else(|| StoreError::UnknownField(group.to_string()))?;
        if !fields.contains(&field) {
            return Err(StoreError::UnknownField(format!("{group}.{field}")));
        }
        let mut candidate = self.settings().to_value();
        candidate[group][field] = value;
        let next = settings::parse_settings_value(&candidate)?;
        self.commit(next, Refresh::Nothing);
        Ok(())
    }

    /// Replaces the whole state from JSON text, filling absent keys with
    /// defaults. Invalid input leaves the state untouched.
    pub fn import_json(&self, text: &str) -> Result<(), StoreError> {
        let next = settings::parse_settings(text).inspect_err(|err| {
            warn!(error = %err, "Rejected imported settings");
        })?;
        self.commit(next, Refresh::Everything);
        info!("Settings imported");
        Ok(())
    }

    /// Current state as 2-space indented JSON.
    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.settings()).map_err(StoreError::Serialize)
    }

    /// Asks for a destination and writes [`export_json`](Self::export_json)
    /// there. Returns whether a file was written.
    pub async fn export_to_file(&self, client: &BridgeClient) -> bool {
        if !client.is_available() {
            debug!("Export skipped, desktop bridge is not available");
            return false;
        }

        let options = SaveDialogOptions {
            default_path: Some(EXPORT_FILE_NAME.to_string()),
            filters: vec![FileFilter::new(JSON_FILTER_NAME, &["json"])],
            ..SaveDialogOptions::default()
        };
        let Some(choice) = client.show_save_dialog(&options).await else {
            notify::handle_error(
                client,
                &"the save dialog could not be shown",
                "An error occurred",
                &ErrorHandlerOptions::titled("Export Error"),
            )
            .await;
            return false;
        };
        let Some(path) = choice.chosen_path() else {
            debug!("Export canceled");
            return false;
        };

        let json = match self.export_json() {
            Ok(json) => json,
            Err(err) => {
                notify::handle_error(
                    client,
                    &err,
                    "An error occurred",
                    &ErrorHandlerOptions::titled("Export Error"),
                )
                .await;
                return false;
            }
        };

        let written = client.write_file(path, &json).await;
        if written.success {
            info!(path, "Settings exported");
            notify::handle_success(
                client,
                &format!("Settings successfully exported to: {path}"),
                "Export Complete",
            )
            .await;
            true
        } else {
            let reason = written.error.unwrap_or_else(|| "unknown error".to_string());
            notify::handle_error(
                client,
                &reason,
                "Failed to export settings",
                &ErrorHandlerOptions::titled("Export Failed"),
            )
            .await;
            false
        }
    }

    /// Lets the user pick a settings file. The bridge has no read channel,
    /// so the pick is reported back and the state is never changed; callers
    /// holding the file contents use [`import_json`](Self::import_json).
    pub async fn import_from_file(&self, client: &BridgeClient) -> ImportOutcome {
        if !client.is_available() {
            return ImportOutcome::BridgeUnavailable;
        }

        let options = OpenDialogOptions {
            filters: vec![FileFilter::new(JSON_FILTER_NAME, &["json"])],
            properties: vec![OpenDialogProperty::OpenFile],
            ..OpenDialogOptions::default()
        };
        let picked = client
            .show_open_dialog(&options)
            .await
            .filter(|result| !result.canceled)
            .and_then(|result| result.file_paths.into_iter().next());
        let Some(path) = picked else {
            debug!("Import canceled");
            return ImportOutcome::Canceled;
        };

        notify::handle_error(
            client,
            &"the desktop bridge cannot read files",
            &format!("Could not import {path}"),
            &ErrorHandlerOptions {
                title: "Import Unavailable".to_string(),
                kind: MessageBoxKind::Warning,
                ..ErrorHandlerOptions::default()
            },
        )
        .await;
        ImportOutcome::ReadUnavailable { path }
    }

    fn commit(&self, next: Settings, refresh: Refresh) {
        {
            let mut state = self.inner.state();
            state.settings = next.clone();
            state.dirty = true;
        }
        self.inner.refresh_appearance(&next, refresh);
        // The state lock is released: without a runtime the persist runs inline.
        self.autosave.schedule();
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("SettingsStore")
            .field("key", &self.inner.key)
            .field("settings", &state.settings)
            .field("dirty", &state.dirty)
            .field("loading", &state.loading)
            .field("autosave", &self.autosave)
            .finish()
    }
}
