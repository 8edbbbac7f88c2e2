//! voicecalc-daemon: Background daemon for a voice-driven calculator
//!
//! This daemon owns the calculator and provides:
//! - A calculator state machine driven by manual key presses
//! - A transcript interpreter turning "five plus two" into a calculation
//! - Single-shot voice sessions over a pluggable speech engine
//! - IPC server for front ends to send keys and transcripts and render
//!   the resulting display
//!
//! Out of scope:
//! - Speech-to-text itself (transcripts are relayed by the front end)
//! - Rendering, styling, calculation history

mod calculator;
mod config;
mod controller;
mod events;
mod interpreter;
mod ipc;
mod lifecycle;
mod summary;
mod voice;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::controller::{Controller, ControllerHandle};
use crate::events::CalcEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::voice::VoiceSession;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voicecalc-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.engine,
        ?config.microphone,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // IPC clients -> Controller
    let (action_tx, action_rx) = mpsc::channel(32);
    // Controller -> IPC subscribers
    let (event_tx, mut event_rx) = broadcast::channel::<CalcEvent>(64);

    // Create the voice session and the controller that owns the calculator
    let engine = config.engine.build();
    let engine_name = engine.name();
    let voice = VoiceSession::new(engine, config.microphone.build(), config.rearm_delay);
    if !voice.is_supported() {
        warn!("speech engine unavailable, continuing with manual entry only");
    }
    let mut controller = Controller::new(voice, event_tx.clone());

    // Create IPC server with event subscription
    let server = Server::with_events(
        &config.socket_path,
        ControllerHandle::new(action_tx),
        engine_name,
        shutdown.clone(),
        event_tx,
    )?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the controller (processes actions from IPC clients)
        _ = controller.run(action_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log controller events
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => info!(%event, "calculator event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event logger exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "shutdown signal handler failed"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("voicecalc-daemon stopped");

    Ok(())
}
