//! DongleControl presenter
//!
//! Headless presenter: loads a presentation, writes projector updates and
//! remote state as JSON lines on stdout, and reads remote commands as JSON
//! lines on stdin.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use dongle_presenter::assets::LibraryAssetResolver;
use dongle_presenter::config::Config;
use dongle_presenter::engine::{create_engine_channels, EngineCommand, EngineStatus, PresenterEngine};
use dongle_presenter::logging;
use dongle_presenter::presentation::PresentationController;
use dongle_presenter::projector::ChannelSurface;
use dongle_presenter::remote::{RemoteCommand, WatchRemoteChannel};
use dongle_presenter::worship::SongLibrary;

/// Commands accepted on stdin besides the remote set
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum ControlCommand {
    VideoEnded,
    Save,
    Shutdown,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StdinCommand {
    Remote(RemoteCommand),
    Control(ControlCommand),
}

impl From<StdinCommand> for EngineCommand {
    fn from(command: StdinCommand) -> Self {
        match command {
            StdinCommand::Remote(command) => EngineCommand::Remote(command),
            StdinCommand::Control(ControlCommand::VideoEnded) => EngineCommand::VideoEnded,
            StdinCommand::Control(ControlCommand::Save) => EngineCommand::SaveDocument(None),
            StdinCommand::Control(ControlCommand::Shutdown) => EngineCommand::Shutdown,
        }
    }
}

struct Args {
    config_path: Option<PathBuf>,
    document_path: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut args = Args {
        config_path: None,
        document_path: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return None,
            "-c" | "--config" => args.config_path = iter.next().map(PathBuf::from),
            other => args.document_path = Some(PathBuf::from(other)),
        }
    }
    Some(args)
}

fn main() -> Result<()> {
    let Some(args) = parse_args() else {
        print_help();
        return Ok(());
    };

    let _log_guard = logging::init_logging()?;
    info!("DongleControl presenter starting...");

    let config = match args.config_path.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path()?);

    let runtime = Arc::new(tokio::runtime::Runtime::new()?);

    let mut controller =
        PresentationController::new(config.timing(), config.worship.lines_per_section);
    let now = Instant::now();

    if let Some(songs_path) = config.worship.songs_path.as_deref() {
        match SongLibrary::load(songs_path) {
            Ok(songs) => controller.set_song_library(songs),
            Err(e) => warn!("Failed to load song library {:?}: {}", songs_path, e),
        }
    }

    controller.set_asset_resolver(Box::new(LibraryAssetResolver::new()));
    controller.set_library_root(config.presentation.library_root.clone(), now);
    controller.set_text_scale(config.presentation.text_scale, now);

    // Projector updates go to stdout, one JSON line each
    let (surface, mut projector_rx) = ChannelSurface::pair();
    controller.attach_projector(Box::new(surface), now);
    runtime.spawn(async move {
        while let Some(line) = projector_rx.recv().await {
            write_line(&line);
        }
    });

    if config.remote.enabled {
        let remote = WatchRemoteChannel::new();
        let mut summaries = WatchStream::new(remote.subscribe());
        controller.attach_remote(Box::new(remote));
        runtime.spawn(async move {
            while let Some(summary) = summaries.next().await {
                let Some(summary) = summary else {
                    continue;
                };
                match serde_json::to_string(&serde_json::json!({
                    "event": "remote-state",
                    "data": summary,
                })) {
                    Ok(line) => write_line(&line),
                    Err(e) => warn!("Failed to serialize remote state: {}", e),
                }
            }
        });
    }

    let (cmd_tx, cmd_rx, status_tx, status_rx) = create_engine_channels();

    runtime.spawn(async move {
        let mut statuses = BroadcastStream::new(status_rx);
        while let Some(status) = statuses.next().await {
            match status {
                Ok(EngineStatus::Error(message)) => error!("Engine error: {}", message),
                Ok(status) => info!("Engine status: {:?}", status),
                Err(e) => warn!("Status listener lagged: {}", e),
            }
        }
    });

    let document_path = args
        .document_path
        .or_else(|| config.presentation.document_path.clone());
    if document_path.is_none() {
        // a presentation always has at least one stack
        controller.add_stack("Welcome", now);
    }
    let mut engine = PresenterEngine::new(controller, cmd_rx, status_tx)
        .with_document_path(document_path)
        .with_songs_path(config.worship.songs_path.clone());

    let engine_runtime = runtime.clone();
    let engine_handle = std::thread::spawn(move || {
        engine_runtime.block_on(async move {
            if let Err(e) = engine.run().await {
                error!("Presenter engine error: {}", e);
            }
        });
    });

    // Set up Ctrl+C handler that sends shutdown command
    let ctrl_c_tx = cmd_tx.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let _ = ctrl_c_tx.try_send(EngineCommand::Shutdown);
    })
    .context("Failed to install Ctrl+C handler")?;

    if config.remote.stdin_commands {
        spawn_stdin_reader(cmd_tx.clone());
    } else {
        info!("Press Ctrl+C to exit...");
    }

    let _ = engine_handle.join();
    info!("Shutdown complete");
    Ok(())
}

/// Forward stdin JSON lines to the engine until stdin closes
fn spawn_stdin_reader(cmd_tx: mpsc::Sender<EngineCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StdinCommand>(&line) {
                Ok(command) => {
                    if cmd_tx.blocking_send(command.into()).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Ignoring unrecognised command {:?}: {}", line, e),
            }
        }
        info!("stdin closed");
    });
}

fn write_line(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", line);
    let _ = stdout.flush();
}

fn print_help() {
    println!("DongleControl presenter - staging/live projection controller");
    println!();
    println!("USAGE:");
    println!("    dongle-presenter [OPTIONS] [DOCUMENT]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help           Print this help message");
    println!("    -c, --config PATH    Use this config file instead of the default");
    println!();
    println!("STDIN (one JSON object per line):");
    println!("    {{\"event\":\"stage-next\"}}  stage-prev, go-live, clear, next-stack, prev-stack");
    println!("    {{\"event\":\"stage-slide\",\"stackIndex\":0,\"slideIndex\":1}}");
    println!("    {{\"event\":\"video-ended\"}}  save, shutdown");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                    Set log level (e.g., debug, info, warn)");
    println!("    DONGLE_PRESENTER_LOG_PATH   Override the log directory");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdin_commands_map_to_engine_commands() {
        let remote: StdinCommand = serde_json::from_str(r#"{"event":"next-stack"}"#).unwrap();
        assert!(matches!(
            EngineCommand::from(remote),
            EngineCommand::Remote(RemoteCommand::NextStack)
        ));

        let video: StdinCommand = serde_json::from_str(r#"{"event":"video-ended"}"#).unwrap();
        assert!(matches!(EngineCommand::from(video), EngineCommand::VideoEnded));

        assert!(serde_json::from_str::<StdinCommand>(r#"{"event":"format-disk"}"#).is_err());
    }
}
