//! Top-level error type aggregating the per-module errors

use thiserror::Error;

/// Any error the crate can surface to an embedding application
#[derive(Debug, Error)]
pub enum DroverError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Server(#[from] crate::server::ServerError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    Pool(#[from] crate::client::PoolError),

    #[error(transparent)]
    Multiplex(#[from] crate::client::MultiplexError),

    #[error(transparent)]
    Object(#[from] crate::objects::ObjectError),

    #[error(transparent)]
    Protocol(#[from] crate::protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, DroverError>;
