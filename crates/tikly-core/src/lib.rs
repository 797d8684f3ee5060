// tikly-core: Query building and row normalization on top of a RouterOS transport.
//
// Callers describe reads and mutations against a menu with a `Query`; the
// engine resolves row references to ids, sends the sentences through a
// `tikly_api::Transport` and hands back normalized rows re-read after every
// change.

pub mod config;
pub mod convert;
pub mod crud;
pub mod error;
pub mod item;
pub mod menu;
pub mod model;
pub mod normalize;
pub mod query;
mod resolve;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use convert::CaseConvention;
pub use crud::Affected;
pub use error::CoreError;
pub use item::Item;
pub use menu::{Menu, Session};
pub use model::{MenuPath, Reference, Row};
pub use query::{Comparison, Filter, Query};
pub use stream::{RowStream, StreamHandle};

pub use tikly_api::{Connector, RawRow, Transport, TransportConfig};
