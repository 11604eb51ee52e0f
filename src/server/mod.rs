//! # Computation Server
//!
//! Server side of the remote-object protocol: the [`ConnectionListener`]
//! owns the listening socket (or the process's stdin/stdout) and runs one
//! [`ServerSession`] per connection, strictly sequentially. Each session
//! wraps a fresh [`crate::objects::ObjectRegistry`] and executes the command
//! loop until the peer disconnects or sends `close`/`stop`.

pub mod announce;
pub mod listener;
pub mod session;

pub use announce::{Announcement, ANNOUNCEMENT_TAG};
pub use listener::ConnectionListener;
pub use session::{ServerSession, SessionVerdict};

/// Server-side setup and transport errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("failed to publish announcement to {target}: {source}")]
    Announce {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
