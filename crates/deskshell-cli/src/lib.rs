//! Command-line access to the settings the desktop shell persists.

pub mod cli_args;
pub mod commands;

pub use cli_args::{Cli, Command};
pub use commands::dispatch;
