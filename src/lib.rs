//! # Drover Core
//!
//! Remote-object computation serving for batch worker farms.
//!
//! ## Overview
//!
//! A drover server is a worker process that accepts TCP (or stdin/stdout)
//! connections and executes a remote command protocol against its own object
//! registry: clients create server-side objects by type name, configure and
//! build them, invoke methods on them, and tear them down. The client side
//! pools many such servers and pipelines asynchronous calls across them,
//! collecting results as servers become ready.
//!
//! Parallelism comes from running many single-threaded server processes, not
//! from concurrency within one: a server handles one connection at a time,
//! and the client multiplexes I/O readiness instead of spawning tasks.
//!
//! ## Module Organization
//!
//! - [`protocol`] - Wire envelopes and the line-framed endpoint codec
//! - [`objects`] - Capability traits, object factory and per-session registry
//! - [`server`] - Connection listener, session command loop, announcement
//! - [`client`] - Server handle proxy, readiness multiplexer, server pool
//! - [`config`] - Configuration with environment overrides
//! - [`error`] - Top-level error aggregation
//! - [`logging`] - Structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drover_core::client::ServerHandle;
//! use drover_core::config::ClientConfig;
//! use drover_core::protocol::ObjectSpec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let addr = "127.0.0.1:7700".parse()?;
//! let mut handle = ServerHandle::connect(addr, &ClientConfig::default()).await?;
//!
//! let id = handle.new_object(&ObjectSpec::new("running_stats")).await?;
//! handle.call_method(id, "observe", vec![serde_json::json!(0.5)]).await?;
//! let _: Option<f64> = handle.get_results().await?;
//!
//! handle.delete_object(id).await?;
//! handle.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving
//!
//! The `drover-server` binary listens on a TCP port (0 = OS-assigned) and
//! publishes a `PLEARN_SERVER_TCP <hostname> <port> <pid>` announcement line
//! for launch tooling, or serves a single session over stdin/stdout when no
//! port is given.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod objects;
pub mod protocol;
pub mod server;

pub use client::{
    ClientError, HandleId, MultiplexError, Pollable, PoolConfig, PoolError, ReadinessMultiplexer,
    ServerHandle, ServerPool,
};
pub use config::{ClientConfig, DroverConfig, ServerConfig};
pub use error::{DroverError, Result};
pub use objects::{
    Configurable, Invokable, ObjectError, ObjectFactory, ObjectRegistry, RemoteObject,
    FIRST_OBJECT_ID,
};
pub use protocol::{Command, ErrorKind, ObjectId, ObjectSpec, Outcome, Request, Response};
pub use server::{Announcement, ConnectionListener, ServerError, SessionVerdict, ANNOUNCEMENT_TAG};
