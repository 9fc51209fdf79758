//! Error types for pixel format negotiation.
//!
//! Every failure mode of the engine is a distinct, inspectable variant;
//! native call failures carry the driver's last-error code so callers can
//! log or branch on it.

use thiserror::Error;

use crate::caps::SurfaceCaps;
use crate::device::Protocol;

/// Errors produced while negotiating or applying a pixel format.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Caller-supplied argument was invalid (zero handle, non-positive
    /// format id, oversized attribute list, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested capability combination violates a native API
    /// invariant and cannot be expressed at all.
    #[error("unsupported capability combination: {0}")]
    UnsupportedCombination(String),

    /// Both selection strategies produced an empty candidate list.
    #[error("no acceptable pixel format on device '{device}' via {protocol} for {requested}")]
    NoAcceptableFormat {
        device: String,
        requested: SurfaceCaps,
        protocol: Protocol,
    },

    /// A native driver call returned failure.
    #[error("native call {call} failed, last error {code}")]
    NativeCallFailure { call: &'static str, code: u32 },

    /// Operation not permitted in the configuration's current state
    /// (commit on external/undetermined, re-resolve after commit).
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
}

/// Type alias for Results using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
