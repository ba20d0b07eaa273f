//! Error handling for the application

use thiserror::Error;

/// Failures surfaced by the RPC gateway.
///
/// A failed call rejects only the request it belongs to; the queue driver
/// keeps running. Rate-limit responses arrive here as `Rpc` and retry policy
/// stays with the caller.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("request dropped before execution")]
    Dropped,

    #[error("log subscription failed: {0}")]
    Subscribe(String),
}

/// Failures while reading a fixed binary layout.
///
/// A truncated or malformed buffer must fail closed, never read out of
/// bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("buffer too short for `{field}`: need {end} bytes, have {have}")]
    OutOfBounds {
        field: &'static str,
        end: usize,
        have: usize,
    },

    #[error("invalid option tag {tag} for `{field}`")]
    BadOptionTag { field: &'static str, tag: u32 },
}
