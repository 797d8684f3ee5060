// ── Core error types ──
//
// Errors raised by the query engine itself are few: a search object that
// matched nothing, or mutation data that is not a key/value object. Anything
// the transport reports passes through untouched in `Transport`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport (passed through) ───────────────────────────────────
    #[error(transparent)]
    Transport(#[from] tikly_api::Error),

    // ── Reference errors ─────────────────────────────────────────────
    /// A search object used as a target matched no rows.
    #[error("Reference not found for {key} in {menu}: {reference}")]
    ReferenceNotFound {
        /// Wire key the reference was given for (`.id`, `numbers`, `place-before`, ...).
        key: String,
        menu: String,
        /// The search object, rendered as compact JSON.
        reference: String,
    },

    // ── Caller input ─────────────────────────────────────────────────
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl CoreError {
    pub fn is_reference_not_found(&self) -> bool {
        matches!(self, Self::ReferenceNotFound { .. })
    }

    /// The wire key of an unresolved reference.
    pub fn reference_key(&self) -> Option<&str> {
        match self {
            Self::ReferenceNotFound { key, .. } => Some(key),
            _ => None,
        }
    }

    /// The underlying transport error, if this is one.
    pub fn as_transport(&self) -> Option<&tikly_api::Error> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}
