use std::io;

use clap::Parser;
use deskshell_cli::{Cli, dispatch};
use deskshell_core::logging::{LoggingDestination, init_logging};

fn main() {
    let cli = Cli::parse();
    let destination = if cli.verbose {
        LoggingDestination::FileAndStderr
    } else {
        LoggingDestination::FileOnly
    };
    if let Err(err) = init_logging(destination) {
        eprintln!("Warning: logging disabled: {err}");
    }

    let mut stdout = io::stdout().lock();
    if let Err(err) = dispatch(cli, &mut stdout) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
