// src/bin/crank.rs

use anyhow::Result;
use colored::*;
use crank::cli::dispatcher::{self, Session};
use std::env;

/// Sets up logging, runs the selected command and reports any failure in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli() {
        // Usage errors, `--help` and `--version` are rendered by clap itself.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }

        let headline = e.to_string();
        eprintln!("\n{}: {}", "Error".red().bold(), headline);
        for cause in e.chain().skip(1).map(ToString::to_string) {
            if !headline.contains(&cause) {
                eprintln!("  {} {}", "caused by:".dimmed(), cause);
            }
        }
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let session = Session::from_env()?;
    log::debug!(
        "Working in '{}', commands from '{}'",
        session.work_dir.display(),
        session.commands_root.display()
    );
    dispatcher::dispatch(env::args_os(), &session)
}
