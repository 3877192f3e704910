//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load registrar config, start logging, open and migrate the database.
//! - Print a deterministic health line for deployment checks.
//!
//! Usage: `registrar_cli [config.json]`

use log::error;
use registrar_core::db::migrations::latest_version;
use registrar_core::db::{open_db, open_db_in_memory};
use registrar_core::{core_version, init_logging_from_config, load_config, ping, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("registrar_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => load_config(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };

    if config.logging.log_dir.is_some() {
        init_logging_from_config(&config.logging).map_err(|err| err.to_string())?;
    }

    let (_conn, mode) = match config.database_path.as_ref() {
        Some(path) => (open_db(path).map_err(|err| err.to_string())?, "file"),
        None => (open_db_in_memory().map_err(|err| err.to_string())?, "memory"),
    };

    println!("registrar_core ping={}", ping());
    println!("registrar_core version={}", core_version());
    println!(
        "registrar_core schema_version={} db_mode={} max_attempts={}",
        latest_version(),
        mode,
        config.enrollment.max_attempts
    );
    Ok(())
}
