// tikly-api: Transport boundary for the RouterOS API sentence protocol
//
// The core never opens sockets itself. Anything that can push a sentence to a
// device and hand back reply rows implements `Transport`; this crate defines
// that seam plus the shared vocabulary (words, raw rows, errors, connection
// parameters) on both sides of it.

pub mod error;
pub mod sentence;
pub mod transport;

pub use error::Error;
pub use sentence::{Combinator, QueryWord, RawRow, Word};
pub use transport::{
    ConnectFuture, Connector, Credentials, DEFAULT_PORT, DEFAULT_TLS_PORT, PacketSender, PacketStream,
    STREAM_CHANNEL_CAPACITY, TlsMode, Transport, TransportConfig, WriteFuture,
};
