use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "deskshell";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORAGE_DIR_NAME: &str = "storage";
/// Overrides the configuration directory, mostly for tests and scripted use.
pub const CONFIG_DIR_ENV: &str = "DESKSHELL_CONFIG_DIR";

pub const DEFAULT_WINDOW_TITLE: &str = "Deskshell";
pub const AUTOSAVE_DELAY_MIN_MS: u64 = 50;
pub const AUTOSAVE_DELAY_MAX_MS: u64 = 10_000;

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: ShellConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
}

/// Disk-backed shell configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
    #[serde(default = "WindowConfig::default_min_width")]
    pub min_width: u32,
    #[serde(default = "WindowConfig::default_min_height")]
    pub min_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            width: Self::default_width(),
            height: Self::default_height(),
            min_width: Self::default_min_width(),
            min_height: Self::default_min_height(),
        }
    }
}

impl WindowConfig {
    fn default_title() -> String {
        DEFAULT_WINDOW_TITLE.to_string()
    }

    const fn default_width() -> u32 {
        1200
    }

    const fn default_height() -> u32 {
        800
    }

    const fn default_min_width() -> u32 {
        800
    }

    const fn default_min_height() -> u32 {
        600
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "AutosaveConfig::default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: Self::default_delay_ms(),
        }
    }
}

impl AutosaveConfig {
    const fn default_delay_ms() -> u64 {
        500
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the settings blob lives; `~` is expanded.
    #[serde(default)]
    pub directory: Option<String>,
}

impl ShellConfig {
    /// Directory for the settings storage backend.
    pub fn storage_directory(&self) -> PathBuf {
        match self.storage.directory.as_deref() {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => config_directory().join(STORAGE_DIR_NAME),
        }
    }
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration, falling back to defaults when it is absent or unreadable.
pub fn load_config() -> ConfigLoadResult {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<ShellConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        path.display(),
                        err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    path.display(),
                    err
                ));
            }
        }
    }

    ConfigLoadResult {
        config: ShellConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration to disk.
pub fn save_config(config: &ShellConfig) -> Result<(), ConfigError> {
    save_config_to(&config_path(), config)
}

pub fn save_config_to(path: &Path, config: &ShellConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn sanitize_config(mut config: ShellConfig) -> (ShellConfig, Vec<String>) {
    let mut warnings = Vec::new();
    let defaults = WindowConfig::default();
    let window = &mut config.window;

    if window.title.trim().is_empty() {
        warnings.push(format!(
            "Window title is empty. Using '{}'.",
            DEFAULT_WINDOW_TITLE
        ));
        window.title = defaults.title.clone();
    }

    if window.min_width == 0 || window.min_height == 0 {
        warnings.push(format!(
            "Minimum window size {}x{} is invalid. Resetting to {}x{}.",
            window.min_width, window.min_height, defaults.min_width, defaults.min_height
        ));
        window.min_width = defaults.min_width;
        window.min_height = defaults.min_height;
    }

    if window.width < window.min_width {
        warnings.push(format!(
            "Window width {} is below the minimum {}. Using the minimum.",
            window.width, window.min_width
        ));
        window.width = window.min_width;
    }

    if window.height < window.min_height {
        warnings.push(format!(
            "Window height {} is below the minimum {}. Using the minimum.",
            window.height, window.min_height
        ));
        window.height = window.min_height;
    }

    let delay = config
        .autosave
        .delay_ms
        .clamp(AUTOSAVE_DELAY_MIN_MS, AUTOSAVE_DELAY_MAX_MS);
    if delay != config.autosave.delay_ms {
        warnings.push(format!(
            "Autosave delay {}ms is outside {}..={}ms. Using {}ms.",
            config.autosave.delay_ms, AUTOSAVE_DELAY_MIN_MS, AUTOSAVE_DELAY_MAX_MS, delay
        ));
        config.autosave.delay_ms = delay;
    }

    if config
        .storage
        .directory
        .as_deref()
        .is_some_and(|dir| dir.trim().is_empty())
    {
        warnings.push("Storage directory is empty. Using the default location.".to_string());
        config.storage.directory = None;
    }

    (config, warnings)
}
