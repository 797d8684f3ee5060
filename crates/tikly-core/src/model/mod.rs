// ── Caller-facing data model ──
//
// Menu paths, normalized rows and the symbolic references callers use to
// point at rows. None of these know about the transport.

pub mod menu_path;
pub mod reference;
pub mod row;

pub use menu_path::MenuPath;
pub use reference::Reference;
pub use row::Row;
