mod cli;
mod command;
mod config;
mod dispatcher;
mod output;
mod watcher;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::CommanderConfig;
use dispatcher::Dispatcher;
use watcher::event::WatchEvent;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Watch {
            root,
            command_file,
            debounce_ms,
        } => {
            let root = match root {
                Some(root) => root,
                None => config::default_root().context("cannot locate the executable directory")?,
            };
            let config = CommanderConfig::load(&root);
            let command_file = config.command_file(&root, command_file.as_deref());
            let debounce = config.debounce_ms(debounce_ms).map(Duration::from_millis);
            watch(command_file, debounce).await?;
        }
        Commands::Exec { words } => {
            let outcome = Dispatcher::new().dispatch(&words.join(" ")).await;
            output::report(&outcome);
            if outcome.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `--verbose` raises this crate (and its `watcher` target) to debug while
/// dependencies such as notify stay at info.
const VERBOSE_DIRECTIVES: &str = "info,file_commander=debug,watcher=debug";

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVES)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}

/// Watch `command_file` until Ctrl-C.
///
/// Each change event spawns its own dispatch cycle and the loop moves on
/// without waiting for it. Cycles are not queued or serialised, so a slow
/// operation can overlap with the next event's read of the command file.
async fn watch(command_file: PathBuf, debounce: Option<Duration>) -> Result<()> {
    let (handle, mut rx) = watcher::start_watcher(&command_file, debounce)
        .with_context(|| format!("failed to start watcher on {}", command_file.display()))?;
    let dispatcher = Arc::new(Dispatcher::new());

    info!("watching commands in {}", command_file.display());

    // Created once so a Ctrl-C between loop iterations is not lost.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(WatchEvent::Changed(_)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    let path = command_file.clone();
                    tokio::spawn(async move { run_cycle(&dispatcher, &path).await });
                }
                Some(WatchEvent::Gone(path)) => {
                    warn!("command file {} was moved or removed", path.display());
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("stopping watcher");
                break;
            }
        }
    }

    drop(handle);
    Ok(())
}

async fn run_cycle(dispatcher: &Dispatcher, command_file: &Path) {
    match dispatcher.handle_change(command_file).await {
        Ok(outcome) => output::report(&outcome),
        Err(err) => error!(
            "✖ failed to handle command from {}: {err}",
            command_file.display()
        ),
    }
}
