//! Shared helpers for the integration suites

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use drover_core::client::ServerHandle;
use drover_core::config::{ClientConfig, ServerConfig};
use drover_core::objects::ObjectFactory;
use drover_core::server::{ConnectionListener, ServerError};

/// Listener config bound to loopback with an OS-assigned port
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        bind_host: "127.0.0.1".to_string(),
        port: 0,
        single_use: false,
        announce_file: None,
    }
}

/// Bind a listener with the built-in factory and run its accept loop
pub async fn spawn_server(
    config: ServerConfig,
) -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let listener = ConnectionListener::bind(config, Arc::new(ObjectFactory::with_builtins()))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener local addr");
    let task = tokio::spawn(listener.serve());
    (addr, task)
}

/// Connect a client handle with default settings
pub async fn connect(addr: SocketAddr) -> ServerHandle {
    ServerHandle::connect(addr, &ClientConfig::default())
        .await
        .expect("connect test handle")
}
