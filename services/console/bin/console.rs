//! Main Entrypoint for the Live Console
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Opening the preference file and the media devices.
//! 3. Reading terminal input and turning it into controller commands.
//! 4. Running the controller until the user quits.

use anyhow::Context;
use clap::Parser;
use gemini_realtime::LiveClient;
use live_console::{
    backend::DeviceMediaBackend,
    config::{Cli, Config},
    terminal::{self, ConsoleInput, TerminalView},
};
use live_console_core::{
    ConsoleController, ControllerOptions, FilePreferenceStore, UiCommand,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{info, warn};

/// Forwards terminal lines to the controller until stdin closes or the user quits.
async fn read_terminal(commands: mpsc::Sender<UiCommand>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match terminal::parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let command = match input {
            ConsoleInput::Command(command) => command,
            ConsoleInput::Help => {
                println!("{}", terminal::HELP);
                continue;
            }
            ConsoleInput::Languages => {
                println!("{}", terminal::language_list());
                continue;
            }
            ConsoleInput::Reset => {
                println!("{}", terminal::RESET_PROMPT);
                let answer = lines.next_line().await?.unwrap_or_default();
                UiCommand::ResetConfig {
                    confirmed: terminal::is_confirmation(&answer),
                }
            }
        };

        let quit = command == UiCommand::Quit;
        if commands.send(command).await.is_err() || quit {
            return Ok(());
        }
    }
    let _ = commands.send(UiCommand::Quit).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let config = Config::from_env()
        .context("Failed to load configuration")?
        .with_cli(cli);

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        endpoint = %config.endpoint,
        prefs = %config.prefs_path.display(),
        "Configuration loaded."
    );

    // --- 3. Build Collaborators ---
    let prefs = FilePreferenceStore::open(&config.prefs_path)
        .context("Failed to open preference file")?;
    let (live_tx, live_rx) = mpsc::unbounded_channel();
    let (media_tx, media_rx) = mpsc::channel(64);
    let (command_tx, command_rx) = mpsc::channel(32);

    let controller = ConsoleController::new(
        Box::new(LiveClient::with_endpoint(config.endpoint.clone(), live_tx)),
        Box::new(DeviceMediaBackend::new(
            config.camera_source.clone(),
            config.screen_source.clone(),
        )),
        Box::new(TerminalView::new()),
        Box::new(prefs),
        media_tx,
        ControllerOptions {
            reconnect_delay: config.reconnect_delay,
        },
    );

    // --- 4. Wire Input ---
    let stdin_commands = command_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = read_terminal(stdin_commands).await {
            warn!(error = %e, "Terminal input failed");
        }
    });
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C. Shutting down...");
            let _ = command_tx.send(UiCommand::Quit).await;
        }
    });

    println!("Type /help for commands.");
    controller.run(command_rx, live_rx, media_rx).await;

    info!("Live console has shut down.");
    // A pending stdin read would otherwise hold the runtime open.
    std::process::exit(0)
}
