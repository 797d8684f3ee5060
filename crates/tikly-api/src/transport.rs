// Transport seam between the query engine and whatever talks to the device.
//
// Implementations own the socket, login, tagging and multiplexing. The core
// only ever hands over a finished sentence and waits on the rows that belong
// to it, so replies for unrelated requests may interleave freely underneath.

use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::sentence::RawRow;

/// Plain API port.
pub const DEFAULT_PORT: u16 = 8728;
/// API-SSL port.
pub const DEFAULT_TLS_PORT: u16 = 8729;

/// Buffer size transports should use for [`PacketStream::channel`].
pub const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Future returned by [`Transport::write`].
pub type WriteFuture<'a> = BoxFuture<'a, Result<Vec<RawRow>, Error>>;

/// A connection able to run RouterOS API sentences.
///
/// Object safe, so sessions can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Send one sentence and collect every `!re` row up to `!done`.
    ///
    /// A `!trap` or `!fatal` reply resolves to the matching [`Error`]
    /// variant; rows received before the trap are discarded.
    fn write(&self, sentence: Vec<String>) -> WriteFuture<'_>;

    /// Start a long-running command (`listen`, `follow`, `monitor`).
    ///
    /// Rows arrive on the returned stream until it is stopped or the device
    /// ends the command. A device error is sent as one `Err` packet and then
    /// the channel closes.
    fn stream(&self, sentence: Vec<String>) -> Result<PacketStream, Error>;
}

/// Future returned by [`Connector::connect`].
pub type ConnectFuture<'a> = BoxFuture<'a, Result<Arc<dyn Transport>, Error>>;

/// Opens a [`Transport`] from connection parameters.
///
/// This is where [`TransportConfig`] is consumed: host, port, TLS mode,
/// credentials and timeouts belong to the connector, never to the core.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, config: &'a TransportConfig) -> ConnectFuture<'a>;
}

// ── Packet channel ──────────────────────────────────────────────────

/// Receiving half of a streamed command.
///
/// Cancellation is explicit: call [`stop`](Self::stop) (or cancel a token from
/// [`cancel_token`](Self::cancel_token)). Dropping the stream also closes the
/// channel, which the sender observes on its next send.
#[derive(Debug)]
pub struct PacketStream {
    rx: mpsc::Receiver<Result<RawRow, Error>>,
    cancel: CancellationToken,
}

/// Sending half handed to the transport task feeding a [`PacketStream`].
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: mpsc::Sender<Result<RawRow, Error>>,
    cancel: CancellationToken,
}

impl PacketStream {
    /// Create a connected sender/stream pair.
    pub fn channel(capacity: usize) -> (PacketSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        (
            PacketSender {
                tx,
                cancel: cancel.clone(),
            },
            Self { rx, cancel },
        )
    }

    /// Wait for the next packet. `None` once stopped or the sender is gone.
    pub async fn next_packet(&mut self) -> Option<Result<RawRow, Error>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            packet = self.rx.recv() => packet,
        }
    }

    /// Poll-based variant of [`next_packet`](Self::next_packet).
    pub fn poll_packet(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<RawRow, Error>>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }

    /// Stop the command. Packets still buffered are dropped.
    pub fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("packet stream stopped");
        }
        self.cancel.cancel();
        self.rx.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that stops this stream when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl PacketSender {
    /// Deliver one packet. Returns `false` once the consumer has stopped or
    /// gone away; the transport should then cancel the command on the device.
    pub async fn send(&self, packet: Result<RawRow, Error>) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(packet) => sent.is_ok(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves when the consumer stops the stream.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

// ── Connection parameters ───────────────────────────────────────────

/// TLS mode for API-SSL connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain TCP (port 8728).
    #[default]
    Disabled,
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed router certificates).
    DangerAcceptInvalid,
}

impl TlsMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: SecretString::from(String::new()),
        }
    }
}

/// Everything a transport needs to open a session.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    /// `None` picks 8728, or 8729 when TLS is enabled.
    pub port: Option<u16>,
    pub credentials: Credentials,
    pub tls: TlsMode,
    pub timeout: Duration,
    pub keepalive: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "192.168.88.1".into(),
            port: None,
            credentials: Credentials::default(),
            tls: TlsMode::Disabled,
            timeout: Duration::from_secs(30),
            keepalive: true,
        }
    }
}

impl TransportConfig {
    /// Effective port, falling back to the API or API-SSL default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls.is_enabled() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        })
    }

    /// `host:port`, bracketing bare IPv6 addresses.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port())
        } else {
            format!("{}:{}", self.host, self.port())
        }
    }
}
