//! Typed proxy for one connected remote server
//!
//! Asynchronous operations are write-only: they put a command on the wire and
//! return without reading. The pending response is consumed by a later
//! `get_results` call. The wire protocol carries no interleaving of
//! responses, so a handle admits at most one outstanding un-consumed call at
//! a time; violations fail fast with [`ClientError::Desync`] before any bytes
//! are written rather than silently mispairing requests and responses.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::ClientConfig;
use crate::protocol::{Command, CommandEndpoint, ObjectId, ObjectSpec, Outcome, Request};

use super::multiplexer::Pollable;
use super::ClientError;

/// One in-flight asynchronous call awaiting `get_results`
#[derive(Debug, Clone, Copy)]
struct PendingCall {
    request_id: u64,
}

/// Client-side proxy for one remote server connection
pub struct ServerHandle {
    endpoint: CommandEndpoint<OwnedReadHalf, OwnedWriteHalf>,
    peer_addr: SocketAddr,
    next_request_id: u64,
    pending: Option<PendingCall>,
}

impl ServerHandle {
    /// Connect to a server, honoring the configured connect timeout
    pub async fn connect(addr: SocketAddr, config: &ClientConfig) -> Result<Self, ClientError> {
        let stream = match timeout(config.connect_timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ClientError::Connect {
                    address: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(ClientError::ConnectTimeout {
                    address: addr.to_string(),
                    timeout_ms: config.connect_timeout_ms,
                })
            }
        };

        debug!(peer = %addr, "Connected to remote server");
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            endpoint: CommandEndpoint::new(read_half, write_half),
            peer_addr: addr,
            next_request_id: 1,
            pending: None,
        })
    }

    /// Address of the remote server
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether an asynchronous call is awaiting `get_results`
    pub fn has_pending_call(&self) -> bool {
        self.pending.is_some()
    }

    /// Construct an object and block for its id
    pub async fn new_object(&mut self, spec: &ObjectSpec) -> Result<ObjectId, ClientError> {
        self.new_object_async(spec).await?;
        self.get_results().await
    }

    /// Construct an object without reading the id; retrieve it later with
    /// `get_results`
    pub async fn new_object_async(&mut self, spec: &ObjectSpec) -> Result<(), ClientError> {
        self.send_tracked(Command::NewObject { spec: spec.clone() })
            .await
    }

    /// Invoke a method; asynchronous by convention, never reads
    pub async fn call_method(
        &mut self,
        object_id: ObjectId,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<(), ClientError> {
        self.send_tracked(Command::CallMethod {
            object_id,
            method: method.into(),
            args,
        })
        .await
    }

    /// Await the pending response and decode its value into `T`
    ///
    /// Void results decode from `null`, so request `Option<T>` when the
    /// method may be void.
    pub async fn get_results<T: DeserializeOwned>(&mut self) -> Result<T, ClientError> {
        let value = self.get_raw_results().await?.unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ClientError::Decode {
            message: e.to_string(),
        })
    }

    /// Await the pending response; `None` is a void result
    pub async fn get_raw_results(&mut self) -> Result<Option<Value>, ClientError> {
        let pending = self.pending.take().ok_or_else(|| {
            ClientError::desync("get_results called with no outstanding asynchronous call")
        })?;

        let response = self
            .endpoint
            .read_response()
            .await?
            .ok_or(ClientError::ConnectionClosed)?;

        if response.request_id != pending.request_id {
            return Err(ClientError::desync(format!(
                "response correlates to request {} but request {} is outstanding",
                response.request_id, pending.request_id
            )));
        }

        match response.outcome {
            Outcome::Ok { value } => Ok(value),
            Outcome::Error { kind, message } => Err(ClientError::Remote { kind, message }),
        }
    }

    /// Remove a server-side object; fire-and-forget, no response
    pub async fn delete_object(&mut self, object_id: ObjectId) -> Result<(), ClientError> {
        self.send_untracked(Command::DeleteObject { object_id })
            .await
    }

    /// Round-trip liveness probe
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.send_tracked(Command::Ping).await?;
        let _: String = self.get_results().await?;
        Ok(())
    }

    /// Fetch the server's usage text
    pub async fn help(&mut self) -> Result<String, ClientError> {
        self.send_tracked(Command::Help).await?;
        self.get_results().await
    }

    /// End this session; the server keeps listening for new connections
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.send_untracked(Command::Close).await
    }

    /// End this session and stop the remote listener entirely
    pub async fn stop_server(&mut self) -> Result<(), ClientError> {
        self.send_untracked(Command::Stop).await
    }

    /// Write a response-bearing command, recording the pending response
    async fn send_tracked(&mut self, command: Command) -> Result<(), ClientError> {
        if let Some(pending) = self.pending {
            return Err(ClientError::desync(format!(
                "request {} is still outstanding; consume it with get_results before issuing {}",
                pending.request_id,
                command.name()
            )));
        }

        let request_id = self.take_request_id();
        self.endpoint
            .write_request(&Request::new(request_id, command))
            .await?;
        self.pending = Some(PendingCall { request_id });
        Ok(())
    }

    /// Write a fire-and-forget command
    async fn send_untracked(&mut self, command: Command) -> Result<(), ClientError> {
        let request_id = self.take_request_id();
        self.endpoint
            .write_request(&Request::new(request_id, command))
            .await?;
        Ok(())
    }

    fn take_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }
}

#[async_trait::async_trait]
impl Pollable for ServerHandle {
    fn has_buffered_input(&self) -> bool {
        self.endpoint.has_buffered_input()
    }

    async fn wait_readable(&self) -> std::io::Result<()> {
        self.endpoint.reader_ref().readable().await
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("peer_addr", &self.peer_addr)
            .field("next_request_id", &self.next_request_id)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
