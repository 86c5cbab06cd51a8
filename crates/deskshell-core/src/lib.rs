//! Core library for the deskshell desktop shell: settings, persistence and the
//! bridge between the front-end and the privileged host.

pub mod appearance;
pub mod autosave;
pub mod bridge;
pub mod config;
pub mod logging;
pub mod notify;
pub mod settings;
pub mod storage;
pub mod store;

pub use appearance::{
    AppearanceSink, DocumentAppearance, DocumentRoot, ThemeClass, apply_theme, font_size_style,
    resolve_theme,
};
pub use autosave::{AutosaveScheduler, DEFAULT_AUTOSAVE_DELAY};
pub use bridge::{Bridge, BridgeClient, BridgeError, Channel, EventHub, Host, HostError, OpResult};
pub use config::{
    ConfigError, ConfigLoadResult, ConfigSource, ShellConfig, config_directory, config_path,
    load_config, save_config,
};
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};
pub use notify::{ErrorHandlerOptions, handle_error, handle_success, with_error_handling};
pub use settings::{
    NotificationSettings, PerformanceSettings, PrivacySettings, Settings, SettingsError, Theme,
    ValidationError, merge_with_defaults, parse_settings, validate,
};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{
    ImportOutcome, LoadReport, LoadSource, SETTINGS_KEY, SettingUpdate, SettingsStore,
    StoreError, StoreOptions,
};
