//! Error types for upwatch.
//!
//! Nothing in this crate is thrown through the caller: configuration
//! problems surface as [`crate::events::MonitorEvent::Error`] notifications
//! and probe failures are classified as down and re-surfaced through the
//! event channel.

use thiserror::Error;

/// Configuration problems detected while merging monitor options.
///
/// These are reported through the event channel rather than returned from
/// the constructor; a monitor with a configuration error completes
/// construction but stays inert (lifecycle calls are no-ops).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Both `website` and `address` were set after merging.
    #[error("you can only specify either a website or an address")]
    AmbiguousTarget,

    /// Neither `website` nor `address` was set after merging.
    #[error("a website or an address is required")]
    MissingTarget,

    /// The probe interval must be a positive number.
    #[error("probe interval must be greater than zero")]
    InvalidInterval,
}

/// Why a probe failed at the transport level.
///
/// A timeout is a distinguished transport failure so it can be surfaced as
/// a `timeout` notification instead of a generic `error`.
#[derive(Debug, Clone, Error)]
pub enum ProbeFailure {
    #[error("probe timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("probe transport error: {message}")]
    Transport { elapsed_ms: u64, message: String },
}

impl ProbeFailure {
    /// Elapsed time until the failure was observed.
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            ProbeFailure::Timeout { elapsed_ms } => *elapsed_ms,
            ProbeFailure::Transport { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeFailure::Timeout { .. })
    }
}
