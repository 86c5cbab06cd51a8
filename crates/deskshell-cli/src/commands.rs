use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use deskshell_core::bridge::Channel;
use deskshell_core::config::{
    ConfigLoadResult, config_path, load_config, load_config_from, save_config, save_config_to,
};
use deskshell_core::settings::validate;
use deskshell_core::storage::{FileStorage, KeyValueStorage};
use deskshell_core::store::{SETTINGS_KEY, SettingsStore, StoreOptions};
use serde_json::Value;
use tracing::info;

use crate::cli_args::{Cli, Command, SetArgs};

/// Runs one command, writing its output to `out`.
pub fn dispatch(cli: Cli, out: &mut dyn Write) -> Result<(), String> {
    let load = match cli.config.as_deref() {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    for warning in &load.warnings {
        eprintln!("Warning: {warning}");
    }
    let directory = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| load.config.storage_directory());
    let storage = FileStorage::new(directory);

    match cli.command {
        Command::Channels => {
            for channel in Channel::ALL {
                line(out, channel)?;
            }
            Ok(())
        }
        Command::Path => {
            let path = storage
                .path_for(SETTINGS_KEY)
                .map_err(|err| err.to_string())?;
            line(out, path.display())
        }
        Command::Validate { file } => validate_command(&storage, file.as_deref(), out),
        Command::Clear => {
            storage
                .remove(SETTINGS_KEY)
                .map_err(|err| err.to_string())?;
            info!(directory = %storage.directory().display(), "Stored settings removed");
            line(out, "Stored settings removed.")
        }
        Command::InitConfig { force } => {
            init_config_command(cli.config.as_deref(), &load, force, out)
        }
        command => {
            let options = StoreOptions::default().with_autosave_delay(load.config.autosave.delay());
            let store = SettingsStore::new(Arc::new(storage), options, None);
            let report = store.load();
            for violation in &report.violations {
                eprintln!("Warning: ignoring stored settings, {violation}");
            }
            if let Some(error) = &report.error {
                eprintln!("Warning: ignoring stored settings, {error}");
            }
            store_command(&store, command, out)
        }
    }
}

fn store_command(store: &SettingsStore, command: Command, out: &mut dyn Write) -> Result<(), String> {
    match command {
        Command::Show => line(out, store.export_json().map_err(|err| err.to_string())?),
        Command::Get { key, field } => {
            let settings = store.settings().to_value();
            let mut value = settings
                .get(&key)
                .ok_or_else(|| format!("Unknown setting '{key}'."))?;
            if let Some(field) = field {
                value = value
                    .get(&field)
                    .ok_or_else(|| format!("Unknown setting '{key}.{field}'."))?;
            }
            line(out, render(value))
        }
        Command::Set(args) => set_command(store, &args, out),
        Command::Reset => {
            store.reset();
            persist(store)?;
            line(out, "Settings reset to defaults.")
        }
        Command::Export { file } => {
            let json = store.export_json().map_err(|err| err.to_string())?;
            fs::write(&file, json)
                .map_err(|err| format!("Failed to write {}: {err}", file.display()))?;
            info!(path = %file.display(), "Settings exported");
            line(out, format!("Exported settings to {}", file.display()))
        }
        Command::Import { file } => {
            let raw = fs::read_to_string(&file)
                .map_err(|err| format!("Failed to read {}: {err}", file.display()))?;
            store.import_json(&raw).map_err(|err| err.to_string())?;
            persist(store)?;
            line(out, format!("Imported settings from {}", file.display()))
        }
        Command::Channels
        | Command::Path
        | Command::Validate { .. }
        | Command::Clear
        | Command::InitConfig { .. } => {
            Err("command does not operate on the settings store".to_string())
        }
    }
}

fn set_command(store: &SettingsStore, args: &SetArgs, out: &mut dyn Write) -> Result<(), String> {
    let value = args.value();
    let path = match args.target() {
        (Some(field), _) => {
            store
                .update_nested(&args.key, field, value.clone())
                .map_err(|err| err.to_string())?;
            format!("{}.{field}", args.key)
        }
        (None, _) => {
            store
                .update_field(&args.key, value.clone())
                .map_err(|err| err.to_string())?;
            args.key.clone()
        }
    };
    persist(store)?;
    info!(setting = %path, "Setting changed from the command line");
    line(out, format!("{path} = {}", render(&value)))
}

fn validate_command(
    storage: &FileStorage,
    file: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), String> {
    let (label, raw) = match file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            (path.display().to_string(), raw)
        }
        None => {
            let raw = storage
                .get(SETTINGS_KEY)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| "No stored settings to validate.".to_string())?;
            ("stored settings".to_string(), raw)
        }
    };

    let value: Value =
        serde_json::from_str(&raw).map_err(|err| format!("{label}: not valid JSON: {err}"))?;
    let violations = validate(&value);
    if violations.is_empty() {
        return line(out, format!("{label}: valid"));
    }

    line(out, format!("{label}: {} problem(s)", violations.len()))?;
    for violation in &violations {
        line(out, format!("  {violation}"))?;
    }
    Err(format!("{label} failed validation."))
}

fn init_config_command(
    target: Option<&Path>,
    load: &ConfigLoadResult,
    force: bool,
    out: &mut dyn Write,
) -> Result<(), String> {
    let path = target.map(Path::to_path_buf).unwrap_or_else(config_path);
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite it.",
            path.display()
        ));
    }
    let written = match target {
        Some(path) => save_config_to(path, &load.config),
        None => save_config(&load.config),
    };
    written.map_err(|err| format!("Failed to write {}: {err}", path.display()))?;
    line(out, format!("Wrote {}", path.display()))
}

/// Commits that ran without an async runtime were already written inline.
fn persist(store: &SettingsStore) -> Result<(), String> {
    if store.has_unsaved_changes() {
        store.save().map_err(|err| err.to_string())?;
    }
    Ok(())
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn line(out: &mut dyn Write, text: impl Display) -> Result<(), String> {
    writeln!(out, "{text}").map_err(|err| format!("Failed to write output: {err}"))
}
