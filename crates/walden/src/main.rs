// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walden - a managed SQLite connection from the command line.
//!
//! This is the binary entry point. Every command opens one handle with the
//! configured connection behaviour, does its work, runs any checkpoints the
//! policy scheduled, and closes.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod session;

use clap::{Parser, Subcommand};
use tracing::error;
use walden_config::{ConfigError, WaldenConfig};
use walden_core::{CheckpointMode, WaldenError};
use walden_handle::{configure_engine, EngineOptions};

use crate::session::{render_value, Session};

/// Walden - a managed SQLite connection from the command line.
#[derive(Parser, Debug)]
#[command(name = "walden", version, about, long_about = None)]
struct Cli {
    /// Hex-encoded cipher key for encrypted databases.
    #[arg(long, global = true)]
    key_hex: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one SQL statement and print any rows it returns.
    Exec { db: String, sql: String },
    /// Report whether a table exists and list its columns.
    Probe { db: String, table: String },
    /// Checkpoint the write-ahead log.
    Checkpoint {
        db: String,
        /// passive, full, restart or truncate. Defaults to the configured mode.
        #[arg(long)]
        mode: Option<CheckpointMode>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match walden_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            walden_config::render_errors(&errors);
            eprintln!("walden: {}", config_failure(&errors));
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    if let Err(err) = configure_engine(&EngineOptions::from(&config.engine)) {
        error!(error = %err, "engine setup failed");
        std::process::exit(1);
    }

    let Some(command) = cli.command else {
        println!("walden: use --help for available commands");
        return;
    };

    let key = match cli.key_hex.as_deref().map(hex::decode).transpose() {
        Ok(key) => key,
        Err(err) => {
            eprintln!("walden: --key-hex is not valid hex: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(command, &config, key) {
        error!(error = %err, "command failed");
        eprintln!("walden: {err}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &WaldenConfig, key: Option<Vec<u8>>) -> Result<(), WaldenError> {
    match command {
        Commands::Exec { db, sql } => {
            let mut session = Session::open(&db, config, key)?;
            let output = session.execute(&sql)?;
            if !output.columns.is_empty() {
                println!("{}", output.columns.join("\t"));
                for row in &output.rows {
                    let cells: Vec<String> = row.iter().map(render_value).collect();
                    println!("{}", cells.join("\t"));
                }
            } else {
                println!("{} row(s) changed", output.changes);
            }
            session.close()?;
        }
        Commands::Probe { db, table } => {
            let mut session = Session::open(&db, config, key)?;
            match session.probe(&table)? {
                Some(columns) => {
                    println!("{table}: exists");
                    for column in columns {
                        println!("  {column}");
                    }
                }
                None => println!("{table}: missing"),
            }
            session.close()?;
        }
        Commands::Checkpoint { db, mode } => {
            let mut session = Session::open(&db, config, key)?;
            match session.checkpoint(mode)? {
                Some(outcome) => println!(
                    "checkpoint {}: {} of {} frames{}",
                    outcome.mode,
                    outcome.checkpointed_frames,
                    outcome.log_frames,
                    if outcome.busy { " (busy)" } else { "" }
                ),
                None => println!("checkpoint vetoed"),
            }
            session.close()?;
        }
    }
    Ok(())
}

/// Fold configuration diagnostics into the one error the command reports.
fn config_failure(errors: &[ConfigError]) -> WaldenError {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    WaldenError::Config(messages.join("; "))
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("walden={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_thread_names(false)
        .init();
}
