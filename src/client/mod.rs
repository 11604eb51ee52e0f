//! # Client-Side Dispatch Engine
//!
//! The client half of the protocol: a [`ServerHandle`] is a typed proxy for
//! one connected server, the [`ReadinessMultiplexer`] answers "which of these
//! handles has a response ready" without blocking on each in turn, and the
//! [`ServerPool`] composes both into the fan-out/fan-in primitive used to
//! pipeline asynchronous calls across many worker servers:
//!
//! ```text
//! reserve N handles -> issue one async call per handle
//!   -> repeat { wait_for_result() -> decode that handle's result } N times
//! -> release
//! ```

pub mod handle;
pub mod multiplexer;
pub mod pool;

pub use handle::ServerHandle;
pub use multiplexer::{MultiplexError, Pollable, ReadinessMultiplexer};
pub use pool::{HandleId, PoolConfig, PoolError, ServerPool};

use crate::protocol::ErrorKind;

/// Client-side errors for one server connection
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {address} timed out after {timeout_ms}ms")]
    ConnectTimeout { address: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode response value: {message}")]
    Decode { message: String },

    #[error("protocol desynchronization: {message}")]
    Desync { message: String },

    #[error("server answered {kind}: {message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("connection closed by server")]
    ConnectionClosed,
}

impl ClientError {
    /// Contract-violation error: the caller broke the
    /// one-outstanding-call-per-handle rule
    pub fn desync(message: impl Into<String>) -> Self {
        Self::Desync {
            message: message.into(),
        }
    }
}

impl From<crate::protocol::ProtocolError> for ClientError {
    fn from(e: crate::protocol::ProtocolError) -> Self {
        match e {
            crate::protocol::ProtocolError::Io(io) => Self::Io(io),
            crate::protocol::ProtocolError::Decode { error, .. } => Self::Decode { message: error },
        }
    }
}
