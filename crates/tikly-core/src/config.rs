// ── Runtime session configuration ──
//
// Describes how a session talks to the device and how rows are presented.
// Built by the caller (or by tikly-config from a profile) and handed in;
// core never reads config files.

use tikly_api::TransportConfig;

use crate::convert::CaseConvention;

/// Configuration for one device session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Connection parameters for the transport implementation.
    pub transport: TransportConfig,
    /// Field naming used for rows and accepted as input.
    pub case: CaseConvention,
}

impl SessionConfig {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            case: CaseConvention::default(),
        }
    }

    pub fn with_case(mut self, case: CaseConvention) -> Self {
        self.case = case;
        self
    }
}
