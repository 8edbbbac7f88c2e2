//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! controller events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::controller::{Action, ControllerHandle};
use crate::events::CalcEvent;
use crate::lifecycle::ShutdownSignal;

use super::protocol::{DaemonStatus, Notification, Request, Response, MAX_FRAME_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with every client handler
struct Shared {
    controller: ControllerHandle,
    engine: String,
    start_time: Instant,
    /// Source of event subscriptions, if events are published
    events: Option<broadcast::Sender<CalcEvent>>,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Create a new IPC server that forwards controller events to subscribers
    pub fn with_events(
        socket_path: &Path,
        controller: ControllerHandle,
        engine: &str,
        shutdown: ShutdownSignal,
        events: broadcast::Sender<CalcEvent>,
    ) -> Result<Self> {
        Self::bind(socket_path, controller, engine, shutdown, Some(events))
    }

    fn bind(
        socket_path: &Path,
        controller: ControllerHandle,
        engine: &str,
        shutdown: ShutdownSignal,
        events: Option<broadcast::Sender<CalcEvent>>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            shared: Arc::new(Shared {
                controller,
                engine: engine.to_string(),
                start_time: Instant::now(),
                events,
                shutdown,
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Frames are read on a separate task so a subscribed client can receive
    /// notifications while no request is in flight.
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(8);

        let read_task = tokio::spawn(async move {
            if let Err(e) = read_frames(&mut reader, frame_tx).await {
                debug!(?e, "client read error");
            }
        });

        let mut events: Option<broadcast::Receiver<CalcEvent>> = None;

        let result = loop {
            tokio::select! {
                frame = frame_rx.recv() => {
                    let Some(frame) = frame else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match serde_json::from_slice::<Request>(&frame) {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if request == Request::Subscribe {
                                events = shared.events.as_ref().map(|tx| tx.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &shared).await
                        }
                        Err(e) => {
                            warn!(?e, "malformed request");
                            Response::Error {
                                code: "bad_request".to_string(),
                                message: e.to_string(),
                            }
                        }
                    };

                    if let Err(e) = send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut events) => {
                    match event {
                        Ok(event) => {
                            if let Err(e) = send_message(&mut writer, &Notification::Event(event)).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged behind events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            events = None;
                        }
                    }
                }
            }
        };

        read_task.abort();
        result
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Subscribe => Response::Subscribed,

            Request::Shutdown => {
                info!("shutdown requested via IPC");
                shared.shutdown.trigger();
                Response::ShuttingDown
            }

            Request::GetStatus => match shared.controller.dispatch(Action::Snapshot).await {
                Ok(display) => Response::Status(DaemonStatus::new(
                    &shared.engine,
                    &display,
                    shared.start_time.elapsed().as_secs(),
                )),
                Err(e) => controller_unavailable(e),
            },

            other => {
                let Some(action) = other.action() else {
                    return Response::Error {
                        code: "unsupported".to_string(),
                        message: format!("{other:?} is not handled"),
                    };
                };
                match shared.controller.dispatch(action).await {
                    Ok(display) => Response::Display(display),
                    Err(e) => controller_unavailable(e),
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

fn controller_unavailable(e: anyhow::Error) -> Response {
    error!(?e, "controller unavailable");
    Response::Error {
        code: "controller_unavailable".to_string(),
        message: e.to_string(),
    }
}

/// Read length-prefixed frames until EOF or the receiver goes away
async fn read_frames<R>(reader: &mut R, frame_tx: mpsc::Sender<Vec<u8>>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];

    loop {
        // Read message length (4-byte little-endian)
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            warn!(len, "message too large, disconnecting");
            return Ok(());
        }

        // Read message body
        let mut msg_buf = vec![0u8; len];
        reader.read_exact(&mut msg_buf).await?;

        if frame_tx.send(msg_buf).await.is_err() {
            return Ok(());
        }
    }
}

/// Next event for a subscribed client; never resolves when not subscribed
async fn next_event(
    events: &mut Option<broadcast::Receiver<CalcEvent>>,
) -> Result<CalcEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
