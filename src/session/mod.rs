//! Reconnecting recognition session
//!
//! A single actor task owns the duplex connection to the recognition
//! service. It sends the session-configuration handshake on every
//! successful connect, streams raw audio chunks as binary messages, parses
//! inbound recognition results, and drives a fixed-delay bounded reconnect
//! policy. Results and lifecycle transitions surface over a bounded typed
//! notice channel, so ordering and backpressure are explicit.

pub mod protocol;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use protocol::{EndOfSpeech, Handshake, RecognitionEvent, Segment, SESSION_LABEL};
pub use transport::{Transport, TransportConn, TransportMessage, WsTransport};

use crate::config::SessionConfig;

/// Depth of the command queue feeding the session actor
const COMMAND_QUEUE_DEPTH: usize = 64;

/// Depth of the notice queue surfacing session events
pub const NOTICE_QUEUE_DEPTH: usize = 32;

/// Connection state, owned exclusively by the session actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; a reconnect may be scheduled
    Disconnected,
    /// Transport connect in progress
    Connecting,
    /// Handshake sent; audio may flow
    Open,
    /// Graceful close in progress
    Closing,
    /// Reconnect bound exceeded; terminal
    Failed,
}

/// Typed notifications surfaced to the orchestrator
#[derive(Debug, Clone)]
pub enum SessionNotice {
    /// Handshake sent, session open
    Connected,
    /// A recognition result that carries signal
    RecognitionComplete(RecognitionEvent),
    /// Terminal: reconnect attempts exhausted
    ConnectionFailed {
        /// Reconnect attempts made before giving up
        attempts: u32,
    },
}

enum SessionCommand {
    SendAudio(Vec<u8>),
    Close,
}

/// Handle for feeding audio into, and closing, a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Send one audio chunk as a binary message
    ///
    /// No-op with a warning when the session is not open; the chunk is
    /// dropped, never queued for a future connection.
    pub async fn send_audio(&self, chunk: Vec<u8>) {
        if *self.state.borrow() != ConnectionState::Open {
            tracing::warn!("recognition session not open, dropping audio chunk");
            return;
        }
        if self
            .commands
            .send(SessionCommand::SendAudio(chunk))
            .await
            .is_err()
        {
            tracing::warn!("recognition session actor gone, dropping audio chunk");
        }
    }

    /// Close the session gracefully and disable further reconnects
    pub async fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close).await;
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether audio sends would currently be attempted
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Watch connection-state transitions
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

enum LinkOutcome {
    /// Connection lost; the reconnect policy decides what happens next
    Lost,
    /// We closed deliberately; no reconnect
    ClosedByUs,
}

/// Reconnecting client session over a duplex transport
pub struct RecognitionSession {
    url: String,
    handshake: Handshake,
    policy: SessionConfig,
    transport: Arc<dyn Transport>,
    commands: mpsc::Receiver<SessionCommand>,
    notices: mpsc::Sender<SessionNotice>,
    state: watch::Sender<ConnectionState>,
    reconnect_attempts: u32,
}

impl RecognitionSession {
    /// Create a session actor and its handle
    ///
    /// The actor does nothing until [`run`](Self::run) is awaited (or the
    /// pair is created through [`spawn`](Self::spawn)).
    #[must_use]
    pub fn new(
        url: String,
        handshake: Handshake,
        policy: SessionConfig,
        transport: Arc<dyn Transport>,
        notices: mpsc::Sender<SessionNotice>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let session = Self {
            url,
            handshake,
            policy,
            transport,
            commands: command_rx,
            notices,
            state: state_tx,
            reconnect_attempts: 0,
        };
        let handle = SessionHandle {
            commands: command_tx,
            state: state_rx,
        };
        (session, handle)
    }

    /// Create and spawn a session actor on the current runtime
    #[must_use]
    pub fn spawn(
        url: String,
        handshake: Handshake,
        policy: SessionConfig,
        transport: Arc<dyn Transport>,
        notices: mpsc::Sender<SessionNotice>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(url, handshake, policy, transport, notices);
        (handle, tokio::spawn(session.run()))
    }

    /// Drive the session until it is closed or terminally failed
    pub async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            tracing::info!(url = %self.url, "connecting to recognition service");

            let timeout = Duration::from_millis(self.policy.connect_timeout_ms);
            let outcome = match self.transport.connect(&self.url, timeout).await {
                Ok(conn) => {
                    // Each successful transport-open restores the full
                    // reconnect budget, even if the handshake then fails.
                    self.reconnect_attempts = 0;
                    self.drive(conn).await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "connect failed");
                    LinkOutcome::Lost
                }
            };

            if matches!(outcome, LinkOutcome::ClosedByUs) {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            self.set_state(ConnectionState::Disconnected);
            self.reconnect_attempts += 1;
            if self.reconnect_attempts > self.policy.max_reconnect_attempts {
                tracing::error!(
                    attempts = self.policy.max_reconnect_attempts,
                    "reconnect bound exceeded, recognition session failed"
                );
                self.set_state(ConnectionState::Failed);
                self.notify(SessionNotice::ConnectionFailed {
                    attempts: self.policy.max_reconnect_attempts,
                })
                .await;
                return;
            }

            tracing::warn!(
                attempt = self.reconnect_attempts,
                max = self.policy.max_reconnect_attempts,
                delay_ms = self.policy.reconnect_delay_ms,
                "connection lost, reconnect scheduled"
            );
            if !self.wait_reconnect_delay().await {
                self.set_state(ConnectionState::Disconnected);
                return;
            }
        }
    }

    /// Run one established connection: handshake, then duplex traffic
    async fn drive(&mut self, mut conn: Box<dyn TransportConn>) -> LinkOutcome {
        // The handshake must precede any audio on this connection.
        let handshake = match serde_json::to_string(&self.handshake) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "handshake serialization failed");
                return LinkOutcome::Lost;
            }
        };
        if let Err(e) = conn.send_text(&handshake).await {
            tracing::warn!(error = %e, "handshake send failed");
            return LinkOutcome::Lost;
        }

        self.set_state(ConnectionState::Open);
        tracing::info!("recognition session open");
        self.notify(SessionNotice::Connected).await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::SendAudio(chunk)) => {
                        if let Err(e) = conn.send_binary(chunk).await {
                            tracing::warn!(error = %e, "audio send failed, treating as disconnect");
                            return LinkOutcome::Lost;
                        }
                    }
                    // A dropped handle closes the session like an explicit close.
                    Some(SessionCommand::Close) | None => {
                        self.set_state(ConnectionState::Closing);
                        if let Err(e) = Self::graceful_close(conn.as_mut()).await {
                            tracing::debug!(error = %e, "graceful close failed");
                        }
                        tracing::info!("recognition session closed");
                        return LinkOutcome::ClosedByUs;
                    }
                },
                message = conn.recv() => match message {
                    Some(Ok(TransportMessage::Text(text))) => {
                        self.handle_result(&text).await;
                    }
                    Some(Ok(TransportMessage::Binary(payload))) => {
                        tracing::debug!(bytes = payload.len(), "ignoring unexpected binary message");
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "transport error");
                        return LinkOutcome::Lost;
                    }
                    None => {
                        tracing::warn!("connection closed by peer");
                        return LinkOutcome::Lost;
                    }
                },
            }
        }
    }

    /// Parse an inbound message and surface it when it carries signal
    ///
    /// Malformed messages are logged and dropped without affecting the
    /// connection.
    async fn handle_result(&self, text: &str) {
        let event: RecognitionEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed recognition message dropped");
                return;
            }
        };

        if !event.should_dispatch() {
            tracing::trace!(mode = %event.mode, "result without signal dropped");
            return;
        }

        if event.is_offline() {
            tracing::info!(text = %event.text, "final recognition result");
        } else {
            tracing::debug!(text = %event.text, "interim recognition result");
        }
        self.notify(SessionNotice::RecognitionComplete(event)).await;
    }

    /// Send the end-of-speech notice, then the normal-closure handshake
    async fn graceful_close(conn: &mut dyn TransportConn) -> crate::Result<()> {
        let notice = serde_json::to_string(&EndOfSpeech::notice())?;
        conn.send_text(&notice).await?;
        conn.close().await
    }

    /// Wait out the fixed reconnect delay; returns `false` when a close
    /// request cancels the scheduled reconnect
    async fn wait_reconnect_delay(&mut self) -> bool {
        let delay = tokio::time::sleep(Duration::from_millis(self.policy.reconnect_delay_ms));
        tokio::pin!(delay);

        loop {
            tokio::select! {
                () = &mut delay => return true,
                command = self.commands.recv() => match command {
                    Some(SessionCommand::SendAudio(_)) => {
                        tracing::warn!("recognition session not open, dropping audio chunk");
                    }
                    Some(SessionCommand::Close) | None => {
                        tracing::info!("close requested, cancelling scheduled reconnect");
                        return false;
                    }
                },
            }
        }
    }

    async fn notify(&self, notice: SessionNotice) {
        if self.notices.send(notice).await.is_err() {
            tracing::debug!("notice receiver dropped");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::debug!(?state, "connection state");
        self.state.send_replace(state);
    }
}
