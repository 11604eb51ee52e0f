//! Command and response envelopes for the remote-object protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a server-side object within one session's registry
///
/// Ids are assigned monotonically by the registry and are never reused while
/// the registry is alive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constructor expression for a remote object: a registered type name plus
/// option assignments applied before `build()`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectSpec {
    /// Type name as registered with the server's object factory
    pub type_name: String,

    /// Option assignments applied to the fresh instance
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

impl ObjectSpec {
    /// Create a spec with no options
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            options: HashMap::new(),
        }
    }

    /// Add an option assignment
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Commands understood by a server session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Construct, configure and build a new object; answers its fresh id
    NewObject { spec: ObjectSpec },

    /// Remove an object from the registry; fire-and-forget
    DeleteObject { object_id: ObjectId },

    /// Invoke a method on an object by name; always answers (void methods
    /// answer a null value)
    CallMethod {
        object_id: ObjectId,
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Liveness probe
    Ping,

    /// Usage text for the command set
    Help,

    /// End this session; the listener keeps accepting
    Close,

    /// End this session and stop the whole listener
    Stop,
}

impl Command {
    /// Whether the server answers this command with a response envelope
    pub fn expects_response(&self) -> bool {
        matches!(
            self,
            Command::NewObject { .. } | Command::CallMethod { .. } | Command::Ping | Command::Help
        )
    }

    /// Wire spelling of the command, for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::NewObject { .. } => "new_object",
            Command::DeleteObject { .. } => "delete_object",
            Command::CallMethod { .. } => "call_method",
            Command::Ping => "ping",
            Command::Help => "help",
            Command::Close => "close",
            Command::Stop => "stop",
        }
    }
}

/// One framed request line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Client-assigned id, monotonic per connection, echoed by responses
    pub request_id: u64,

    /// When the client issued the request
    pub issued_at: DateTime<Utc>,

    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Create a request stamped with the current time
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            issued_at: Utc::now(),
            command,
        }
    }
}

/// Error classification carried on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownType,
    UnknownObjectId,
    UnknownMethod,
    UnknownOption,
    InvalidArgument,
    NotBuilt,
    BuildFailed,
    MalformedCommand,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnknownType => "unknown_type",
            ErrorKind::UnknownObjectId => "unknown_object_id",
            ErrorKind::UnknownMethod => "unknown_method",
            ErrorKind::UnknownOption => "unknown_option",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotBuilt => "not_built",
            ErrorKind::BuildFailed => "build_failed",
            ErrorKind::MalformedCommand => "malformed_command",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Result of executing one response-bearing command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok {
        #[serde(default)]
        value: Option<Value>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// One framed response line, correlated to its request by `request_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub request_id: u64,

    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Successful response carrying an optional value
    pub fn ok(request_id: u64, value: Option<Value>) -> Self {
        Self {
            request_id,
            outcome: Outcome::Ok { value },
        }
    }

    /// Error response for the violating request
    pub fn error(request_id: u64, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: Outcome::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error { .. })
    }
}
