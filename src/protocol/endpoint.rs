//! Buffered line-framed endpoint over any byte stream
//!
//! One `CommandEndpoint` wraps the two halves of a connection (TCP split
//! halves, or the process's own stdin/stdout) and speaks the framed JSON
//! protocol in both directions. Framing is strictly line-oriented: a message
//! is never acted on before its terminating newline has been read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use super::command::{Request, Response};
use super::ProtocolError;

/// Bidirectional framed endpoint with a buffered read side
pub struct CommandEndpoint<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> CommandEndpoint<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a read/write pair
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Whether the read buffer already holds unconsumed bytes
    ///
    /// Used by the readiness multiplexer: buffered input counts as ready
    /// without an OS-level wait.
    pub fn has_buffered_input(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Access the underlying reader (for OS-level readiness checks)
    pub fn reader_ref(&self) -> &R {
        self.reader.get_ref()
    }

    /// Read the next request line; `None` on a cleanly closed stream
    pub async fn read_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        self.read_frame().await
    }

    /// Read the next response line; `None` on a cleanly closed stream
    pub async fn read_response(&mut self) -> Result<Option<Response>, ProtocolError> {
        self.read_frame().await
    }

    /// Write one request line and flush
    pub async fn write_request(&mut self, request: &Request) -> Result<(), ProtocolError> {
        self.write_frame(request).await
    }

    /// Write one response line and flush
    pub async fn write_response(&mut self, response: &Response) -> Result<(), ProtocolError> {
        self.write_frame(response).await
    }

    async fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Ok(None);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            trace!(frame = %trimmed, "Read protocol frame");
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| ProtocolError::Decode {
                    line: trimmed.to_string(),
                    error: e.to_string(),
                });
        }
    }

    async fn write_frame<T: Serialize>(&mut self, frame: &T) -> Result<(), ProtocolError> {
        let json = serde_json::to_string(frame).map_err(|e| ProtocolError::Decode {
            line: String::new(),
            error: e.to_string(),
        })?;

        trace!(frame = %json, "Writing protocol frame");
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
