//! # Remote Command Protocol
//!
//! Wire protocol shared by the server session loop and the client proxy.
//!
//! ## Framing
//!
//! Every message is a single line of JSON terminated by `\n`. Blank lines are
//! ignored. Requests and responses are never interleaved within one
//! direction of a connection: the server answers response-bearing commands in
//! the exact order it received them.
//!
//! ## Requests
//!
//! ```json
//! {"request_id":3,"issued_at":"2025-11-04T16:02:11Z","command":"new_object","spec":{"type_name":"counter","options":{"start":10}}}
//! ```
//!
//! Commands:
//!
//! | command | fields | response |
//! |---|---|---|
//! | `new_object` | `spec` (type name + options) | `ok` with the fresh object id |
//! | `delete_object` | `object_id` | none (fire-and-forget) |
//! | `call_method` | `object_id`, `method`, `args` | `ok` with the return value (`null` for void methods) |
//! | `ping` | | `ok` with `"pong"` |
//! | `help` | | `ok` with the usage text |
//! | `close` | | none; ends this session |
//! | `stop` | | none; ends this session and stops the listener |
//!
//! ## Responses
//!
//! ```json
//! {"request_id":3,"status":"ok","value":1}
//! {"request_id":4,"status":"error","kind":"unknown_object_id","message":"no object with id 7"}
//! ```
//!
//! `request_id` is assigned by the client, monotonically per connection, and
//! echoed verbatim so either side can detect a desynchronized stream instead
//! of silently misparsing it.

pub mod command;
pub mod endpoint;

pub use command::{Command, ErrorKind, ObjectId, ObjectSpec, Outcome, Request, Response};
pub use endpoint::CommandEndpoint;

/// Protocol-level errors for reading and writing framed messages
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error on command stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode protocol line: {error} (line: {line:?})")]
    Decode { line: String, error: String },
}
