use thiserror::Error;

/// Top-level error type for the `tikly-api` crate.
///
/// Covers every failure a transport can report: session setup, socket I/O,
/// and the device's own `!trap` / `!fatal` replies. `tikly-core` passes these
/// through to callers untouched.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// Login rejected by the device.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply within the configured timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The connection is closed (or was never opened).
    #[error("Not connected to the device")]
    Disconnected,

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// `!trap` reply: the device refused the command.
    #[error("Device rejected the command: {message}")]
    Trap {
        message: String,
        /// RouterOS trap category (0 = missing item, 1 = argument value failure, ...).
        category: Option<u8>,
    },

    /// `!fatal` reply: the device is closing the session.
    #[error("Fatal device error: {message}")]
    Fatal { message: String },

    /// A reply that could not be decoded into sentences.
    #[error("Malformed reply: {message}")]
    Malformed { message: String },

    // ── Streaming ───────────────────────────────────────────────────
    /// The packet stream ended before it was stopped.
    #[error("Stream closed by the device")]
    StreamClosed,
}

impl Error {
    /// Shorthand for a `!trap` reply without a category.
    pub fn trap(message: impl Into<String>) -> Self {
        Self::Trap {
            message: message.into(),
            category: None,
        }
    }

    /// Returns `true` for failures where a fresh attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            Self::Timeout { .. } | Self::Disconnected => true,
            _ => false,
        }
    }

    /// Returns `true` if the device itself rejected the command.
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::Trap { .. })
    }

    /// The device-provided message for `!trap` and `!fatal` replies.
    pub fn device_message(&self) -> Option<&str> {
        match self {
            Self::Trap { message, .. } | Self::Fatal { message } => Some(message),
            _ => None,
        }
    }
}
