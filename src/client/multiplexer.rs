//! Readiness multiplexing across many server endpoints
//!
//! Separates "detect which endpoints have a response ready" from "consume one
//! ready endpoint", so a caller can drive the standard fan-in loop: wait for
//! any of N outstanding calls, process the one that finished, repeat.
//!
//! Readiness is recomputed from scratch on every [`wait_for_events`] call;
//! nothing carries over from a previous wait. Bytes already sitting in an
//! endpoint's read buffer count as ready without any OS-level wait.
//!
//! [`wait_for_events`]: ReadinessMultiplexer::wait_for_events

use async_trait::async_trait;
use futures::future::select_all;
use futures::FutureExt;
use std::time::Duration;
use tracing::trace;

/// Anything the multiplexer can watch for incoming data
///
/// The two probes mirror the two ways data can be "ready": already buffered
/// by the endpoint itself, or readable at the OS level. Keeping the interface
/// this small lets the multiplexer run over any readiness facility.
#[async_trait]
pub trait Pollable {
    /// Whether the endpoint's own read buffer holds unconsumed bytes
    fn has_buffered_input(&self) -> bool;

    /// Resolve once the underlying stream is readable
    async fn wait_readable(&self) -> std::io::Result<()>;
}

/// Errors from the readiness machinery
#[derive(Debug, thiserror::Error)]
pub enum MultiplexError {
    #[error("readiness wait requires a non-empty watch set")]
    EmptyWatchSet,

    #[error("OS-level readiness wait failed: {0}")]
    Poll(#[source] std::io::Error),

    #[error("no more pending events from the last wait")]
    NoMoreEvents,
}

/// Multiplexed readiness detector with a consume-one-at-a-time cursor
pub struct ReadinessMultiplexer {
    ready: Vec<usize>,
    cursor: usize,
}

impl ReadinessMultiplexer {
    pub fn new() -> Self {
        Self {
            ready: Vec::new(),
            cursor: 0,
        }
    }

    /// Block until at least one endpoint is ready, or the timeout elapses
    ///
    /// Returns the number of endpoints ready right now (0 on timeout). When
    /// any endpoint already has buffered input the OS-level wait degenerates
    /// to a non-blocking sweep, so already-available work is never delayed.
    /// With `shuffle`, ready endpoints are later yielded in a fresh random
    /// order instead of positional order, so low-indexed servers get no
    /// systematic preference.
    pub async fn wait_for_events(
        &mut self,
        endpoints: &[&dyn Pollable],
        timeout: Option<Duration>,
        shuffle: bool,
    ) -> Result<usize, MultiplexError> {
        self.ready.clear();
        self.cursor = 0;

        if endpoints.is_empty() {
            return Err(MultiplexError::EmptyWatchSet);
        }

        let mut ready_flags: Vec<bool> =
            endpoints.iter().map(|e| e.has_buffered_input()).collect();
        let any_buffered = ready_flags.iter().any(|&flag| flag);

        if !any_buffered {
            // Nothing buffered anywhere: one real multiplexed wait.
            let waits: Vec<_> = endpoints.iter().map(|e| e.wait_readable()).collect();
            let first_ready = select_all(waits);

            match timeout {
                Some(duration) => match tokio::time::timeout(duration, first_ready).await {
                    Ok((result, index, _remaining)) => {
                        result.map_err(MultiplexError::Poll)?;
                        ready_flags[index] = true;
                    }
                    Err(_) => {
                        trace!(watched = endpoints.len(), "Readiness wait timed out");
                        return Ok(0);
                    }
                },
                None => {
                    let (result, index, _remaining) = first_ready.await;
                    result.map_err(MultiplexError::Poll)?;
                    ready_flags[index] = true;
                }
            }
        }

        // Non-blocking sweep: collect everything ready at this instant.
        for (index, endpoint) in endpoints.iter().enumerate() {
            if !ready_flags[index] && poll_now(*endpoint)? {
                ready_flags[index] = true;
            }
        }

        self.ready = ready_flags
            .iter()
            .enumerate()
            .filter_map(|(index, &flag)| flag.then_some(index))
            .collect();

        if shuffle {
            fastrand::shuffle(&mut self.ready);
        }

        trace!(
            watched = endpoints.len(),
            ready = self.ready.len(),
            shuffle,
            "Readiness computed"
        );
        Ok(self.ready.len())
    }

    /// Consume the next ready endpoint index from the last wait
    pub fn next_pending_event(&mut self) -> Result<usize, MultiplexError> {
        match self.ready.get(self.cursor) {
            Some(&index) => {
                self.cursor += 1;
                Ok(index)
            }
            None => Err(MultiplexError::NoMoreEvents),
        }
    }

    /// Ready endpoints not yet consumed since the last wait
    pub fn pending_remaining(&self) -> usize {
        self.ready.len() - self.cursor
    }
}

impl Default for ReadinessMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll an endpoint's readiness exactly once, without blocking
fn poll_now(endpoint: &dyn Pollable) -> Result<bool, MultiplexError> {
    match endpoint.wait_readable().now_or_never() {
        Some(Ok(())) => Ok(true),
        Some(Err(e)) => Err(MultiplexError::Poll(e)),
        None => Ok(false),
    }
}
