//! Connection listener: TCP accept loop and stdio single-session mode
//!
//! Connections are served strictly sequentially: one session runs to
//! completion before the next `accept`. Parallelism in a deployment comes
//! from running many server processes, not from concurrent connections
//! within one process.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::objects::ObjectFactory;
use crate::protocol::CommandEndpoint;

use super::announce::Announcement;
use super::session::{ServerSession, SessionVerdict};
use super::ServerError;

// Minimal queuing: at most one connection may wait while a session runs.
const ACCEPT_BACKLOG: u32 = 1;

/// Bound TCP listener producing sequential server sessions
pub struct ConnectionListener {
    listener: TcpListener,
    factory: Arc<ObjectFactory>,
    config: ServerConfig,
}

impl ConnectionListener {
    /// Bind the configured address with address reuse enabled
    ///
    /// Port 0 requests an OS-assigned port; use [`local_addr`] or the
    /// announcement to learn where the listener actually ended up.
    ///
    /// [`local_addr`]: ConnectionListener::local_addr
    pub async fn bind(
        config: ServerConfig,
        factory: Arc<ObjectFactory>,
    ) -> Result<Self, ServerError> {
        let address = format!("{}:{}", config.bind_host, config.port);
        let addr: SocketAddr = address.parse().map_err(|e| ServerError::Bind {
            address: address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        let bind_error = |source| ServerError::Bind {
            address: address.clone(),
            source,
        };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;

        // allow immediate rebinding of the port after a shutdown
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;

        let listener = socket
            .listen(ACCEPT_BACKLOG)
            .map_err(|source| ServerError::Listen { address, source })?;

        let local_addr = listener.local_addr()?;
        info!(%local_addr, single_use = config.single_use, "Listener bound");

        Ok(Self {
            listener,
            factory,
            config,
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Publish the announcement to the configured file, or to stdout
    pub async fn announce(&self) -> Result<Announcement, ServerError> {
        let announcement = Announcement::local(self.local_addr()?.port())?;
        match &self.config.announce_file {
            Some(path) => announcement.write_to_file(path).await?,
            None => announcement.write_to_stdout(),
        }
        Ok(announcement)
    }

    /// Run the accept loop to completion
    ///
    /// Ends after the first session in single-use mode, or when a session
    /// returns [`SessionVerdict::Stop`]. Accept failures are fatal;
    /// mid-session transport failures are isolated to their connection.
    pub async fn serve(self) -> Result<(), ServerError> {
        let mut connections_served: u64 = 0;

        loop {
            let (stream, peer) = self.listener.accept().await.map_err(ServerError::Accept)?;
            connections_served += 1;
            info!(%peer, connections_served, "Accepted connection");

            let verdict = self.run_session(stream).await;

            if verdict == SessionVerdict::Stop {
                info!(connections_served, "Stop requested; shutting down listener");
                break;
            }
            if self.config.single_use {
                info!("Single-use mode; shutting down listener after first connection");
                break;
            }
        }

        Ok(())
    }

    /// Bind, announce and serve in one call
    pub async fn serve_tcp(
        config: ServerConfig,
        factory: Arc<ObjectFactory>,
    ) -> Result<(), ServerError> {
        let listener = Self::bind(config, factory).await?;
        listener.announce().await?;
        listener.serve().await
    }

    /// Run exactly one session over the process's stdin/stdout
    pub async fn serve_stdio(factory: Arc<ObjectFactory>) -> Result<(), ServerError> {
        info!("Serving one session on stdin/stdout");
        let endpoint = CommandEndpoint::new(tokio::io::stdin(), tokio::io::stdout());
        let mut session = ServerSession::new(endpoint, factory);
        session.run().await?;
        Ok(())
    }

    async fn run_session(&self, stream: TcpStream) -> SessionVerdict {
        let (read_half, write_half) = stream.into_split();
        let endpoint = CommandEndpoint::new(read_half, write_half);
        let mut session = ServerSession::new(endpoint, self.factory.clone());

        match session.run().await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, "Session failed; dropping connection");
                SessionVerdict::Continue
            }
        }
    }
}
