//! Error types for the synchronization core.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are non-fatal to the in-memory protocol: callers log and
//! move on, and the next user action naturally re-attempts. Malformed inbound
//! payloads are dropped with a warning and never crash a state machine.

use reqwest::StatusCode;

/// Error produced by the synchronization core.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An inbound or outbound payload could not be (de)serialized.
    #[error("failed to decode room event: {0}")]
    Codec(#[from] serde_json::Error),

    /// The persistence API request failed at the transport level.
    #[error("store request failed: {0}")]
    Store(#[from] reqwest::Error),

    /// The persistence API answered with a non-success status.
    #[error("store returned status {0}")]
    StoreStatus(StatusCode),

    /// The session was already closed when an operation was attempted.
    #[error("session closed")]
    Closed,
}
