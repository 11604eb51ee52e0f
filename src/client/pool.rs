//! Pool of remote server handles with reserve/release semantics
//!
//! The pool owns every handle for the lifetime of the client and partitions
//! them into available and reserved sets. Reservations are disjoint: a
//! handle belongs to at most one live reservation. `wait_for_result` is the
//! fan-in primitive: it drives the readiness multiplexer over the currently
//! reserved handles and names whichever finished first.

use std::collections::{BTreeSet, VecDeque};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;

use super::handle::ServerHandle;
use super::multiplexer::{MultiplexError, Pollable, ReadinessMultiplexer};
use super::ClientError;

/// Stable identifier of one handle within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub usize);

/// Pool behavior knobs
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Yield simultaneously-ready handles in random order to avoid
    /// systematically favoring low-indexed servers
    pub shuffle_ready_order: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            shuffle_ready_order: true,
        }
    }
}

/// Pool-level errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("requested {requested} server(s) but only {available} available")]
    InsufficientServers { requested: usize, available: usize },

    #[error("unknown handle id {0:?}")]
    UnknownHandle(HandleId),

    #[error("no reserved handles to wait on")]
    NoReservedHandles,

    #[error("no reserved handle became ready within the timeout")]
    WaitTimeout,

    #[error(transparent)]
    Multiplex(#[from] MultiplexError),

    #[error(transparent)]
    Handle(#[from] ClientError),
}

/// Client-side manager of a set of remote server handles
pub struct ServerPool {
    handles: Vec<ServerHandle>,
    available: VecDeque<usize>,
    reserved: BTreeSet<usize>,
    multiplexer: ReadinessMultiplexer,
    config: PoolConfig,
}

impl ServerPool {
    /// Build a pool over already-connected handles
    pub fn new(handles: Vec<ServerHandle>, config: PoolConfig) -> Self {
        let available = (0..handles.len()).collect();
        info!(size = handles.len(), "Server pool created");
        Self {
            handles,
            available,
            reserved: BTreeSet::new(),
            multiplexer: ReadinessMultiplexer::new(),
            config,
        }
    }

    /// Connect one handle per address
    pub async fn connect(
        addrs: &[SocketAddr],
        client_config: &ClientConfig,
        pool_config: PoolConfig,
    ) -> Result<Self, PoolError> {
        let mut handles = Vec::with_capacity(addrs.len());
        for addr in addrs {
            handles.push(ServerHandle::connect(*addr, client_config).await?);
        }
        Ok(Self::new(handles, pool_config))
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    /// Reserve `count` handles from the front of the available set
    pub fn reserve(&mut self, count: usize) -> Result<Vec<HandleId>, PoolError> {
        if count > self.available.len() {
            return Err(PoolError::InsufficientServers {
                requested: count,
                available: self.available.len(),
            });
        }

        let reservation: Vec<HandleId> = self
            .available
            .drain(..count)
            .map(|index| {
                self.reserved.insert(index);
                HandleId(index)
            })
            .collect();

        debug!(
            reserved = ?reservation,
            available = self.available.len(),
            "Reserved handles"
        );
        Ok(reservation)
    }

    /// Return reserved handles to the available set
    pub fn release(&mut self, ids: &[HandleId]) {
        for id in ids {
            if self.reserved.remove(&id.0) {
                self.available.push_back(id.0);
            } else {
                warn!(handle = ?id, "Releasing a handle that was not reserved");
            }
        }
        debug!(available = self.available.len(), "Released handles");
    }

    /// Access a handle for issuing calls or reading results
    pub fn handle_mut(&mut self, id: HandleId) -> Result<&mut ServerHandle, PoolError> {
        self.handles
            .get_mut(id.0)
            .ok_or(PoolError::UnknownHandle(id))
    }

    /// Block until any reserved handle has a response ready, and return it
    ///
    /// The readiness set is recomputed on every call, so results consumed
    /// between calls never leave stale state behind. With several handles
    /// ready simultaneously the winner is drawn in shuffled order when the
    /// pool is configured for it.
    pub async fn wait_for_result(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<HandleId, PoolError> {
        let reserved: Vec<usize> = self.reserved.iter().copied().collect();
        if reserved.is_empty() {
            return Err(PoolError::NoReservedHandles);
        }

        let endpoints: Vec<&dyn Pollable> = reserved
            .iter()
            .map(|&index| &self.handles[index] as &dyn Pollable)
            .collect();

        let ready = self
            .multiplexer
            .wait_for_events(&endpoints, timeout, self.config.shuffle_ready_order)
            .await?;
        if ready == 0 {
            return Err(PoolError::WaitTimeout);
        }

        let position = self.multiplexer.next_pending_event()?;
        Ok(HandleId(reserved[position]))
    }
}

impl std::fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerPool")
            .field("size", &self.handles.len())
            .field("available", &self.available.len())
            .field("reserved", &self.reserved.len())
            .finish()
    }
}
