//! cleandeck - console front end for a cleaner backend
//!
//! # Overview
//!
//! Wires the library together the way a desktop shell would:
//! - Settings from `<config_dir>/cleandeck.yaml` ([`ConfigManager`])
//! - Logging (daily rotating file, optional stderr echo)
//! - A small tokio runtime for backend workers
//! - The [`OperationOrchestrator`] owned by the main thread, which acts as the UI thread
//!
//! The main thread never blocks on the backend. A reader thread forwards stdin lines over a
//! channel; the main loop waits at most one tick interval for a line, applies it, then
//! calls `tick()` so worker results are drained and timed status resets happen.
//!
//! # Usage
//!
//! ```text
//! cleandeck [config_dir] [--base-url URL] [--debug]   # config_dir defaults to "."
//! ```
//!
//! When stdin closes (piped input), the driver keeps ticking until the running operation
//! has finished and been applied, then shuts down.

use anyhow::{Context, Result};
use clap::Parser;
use cleandeck::console::{Cli, Command, ConsoleObserver, HELP, format_catalog};
use cleandeck::models::find_cleaner;
use cleandeck::{
    APP_NAME, ConfigManager, HttpCatalogClient, OperationOrchestrator, VERSION,
};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let mut settings = config_manager.load_settings()?;
    cli.apply_overrides(&mut settings);

    // Held until main returns so buffered log lines are flushed
    let _log_guard = cleandeck::logging::setup_logging(&settings.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Backend: {}", settings.backend.base_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("cleandeck-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let backend = Arc::new(HttpCatalogClient::new(&settings.backend)?);
    let mut orchestrator = OperationOrchestrator::new(
        backend,
        runtime.handle().clone(),
        Box::new(ConsoleObserver::new(std::io::stdout())),
    )
    .with_status_reset_delay(settings.ui.status_reset_delay());

    println!("{} v{} - type `help` for commands", APP_NAME, VERSION);
    orchestrator.load_catalog();

    let (line_tx, line_rx) = mpsc::channel::<String>();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    let tick_interval = settings.ui.tick_interval();
    let mut input_open = true;
    loop {
        if input_open {
            match line_rx.recv_timeout(tick_interval) {
                Ok(line) => match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&mut orchestrator, command),
                    Ok(None) => {}
                    Err(message) => println!("{}", message),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Input closed, finishing the running operation");
                    input_open = false;
                }
            }
        } else if orchestrator.is_quiescent() {
            break;
        } else {
            // Bounded by the backend request timeout
            std::thread::sleep(tick_interval);
        }
        orchestrator.tick();
    }

    tracing::info!("Shutting down");
    orchestrator.shutdown();
    // Apply whatever already arrived so the log reflects it
    orchestrator.tick();
    orchestrator.metrics().log_summary();

    runtime.shutdown_timeout(Duration::from_secs(2));
    tracing::info!("Shutdown complete");
    Ok(())
}

fn run_command(orchestrator: &mut OperationOrchestrator<HttpCatalogClient>, command: Command) {
    match command {
        Command::List => {
            let selection = orchestrator.selection();
            let text = format_catalog(orchestrator.catalog(), |c, o| selection.is_selected(c, o));
            println!("{}", text);
        }
        Command::Select {
            cleaner_id,
            option_id,
        } => {
            let known = find_cleaner(orchestrator.catalog(), &cleaner_id)
                .is_some_and(|c| c.option(&option_id).is_some());
            if !known {
                println!("Unknown option {}/{}", cleaner_id, option_id);
                return;
            }
            if orchestrator.toggle_option(&cleaner_id, &option_id, true) {
                println!("Selected {}/{}", cleaner_id, option_id);
            }
        }
        Command::Unselect {
            cleaner_id,
            option_id,
        } => {
            if orchestrator.toggle_option(&cleaner_id, &option_id, false) {
                println!("Unselected {}/{}", cleaner_id, option_id);
            }
        }
        Command::Selected => {
            let snapshot = orchestrator.selection().snapshot();
            if snapshot.is_empty() {
                println!("Nothing selected");
            }
            for entry in snapshot {
                println!("  {}/{}", entry.cleaner_id, entry.option_id);
            }
        }
        Command::Clear => orchestrator.clear_selection(),
        Command::Run(kind) => {
            // Refusals are printed by the observer
            let _ = orchestrator.dispatch(kind);
        }
        Command::Abort => {
            let _ = orchestrator.abort();
        }
        Command::Reload => orchestrator.load_catalog(),
        Command::Status => println!("{}", orchestrator.status_line()),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}
