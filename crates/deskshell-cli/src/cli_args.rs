use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use serde_json::Value;

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "deskshell", version, about, long_about = None)]
pub struct Cli {
    /// Settings storage directory (defaults to the configured location).
    #[arg(long, global = true, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,

    /// Shell config file (defaults to `config.toml` in the config directory).
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Mirror logs to stderr.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the current settings as JSON.
    Show,
    /// Print where the settings are stored.
    Path,
    /// Check a settings file (or the stored settings) against the schema.
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    /// Print one setting, or one field of a settings group.
    Get {
        key: String,
        field: Option<String>,
    },
    /// Change one setting.
    Set(SetArgs),
    /// Restore every setting to its default.
    Reset,
    /// Delete the stored settings so the next start uses the defaults.
    Clear,
    /// Write the current settings to a JSON file.
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Replace the settings with the contents of a JSON file.
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// List the bridge channels the desktop host answers.
    Channels,
    /// Write the effective shell config to the config file.
    InitConfig {
        /// Overwrite an existing config file.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

/// `set <KEY> [FIELD] <VALUE>`.
///
/// VALUE is read as JSON when it parses (`16`, `true`) and as a plain string
/// otherwise (`dark`).
#[derive(Debug, Clone, Args)]
pub struct SetArgs {
    pub key: String,
    #[arg(value_name = "FIELD|VALUE")]
    pub second: String,
    #[arg(value_name = "VALUE")]
    pub third: Option<String>,
}

impl SetArgs {
    /// Splits the positionals into an optional nested field and the raw value.
    pub fn target(&self) -> (Option<&str>, &str) {
        match self.third.as_deref() {
            Some(value) => (Some(self.second.as_str()), value),
            None => (None, self.second.as_str()),
        }
    }

    pub fn value(&self) -> Value {
        parse_value(self.target().1)
    }
}

pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
