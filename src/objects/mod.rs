//! # Remote Object Model
//!
//! Server-side objects live behind two capability traits: [`Configurable`]
//! (option assignment and `build()`) and [`Invokable`] (method invocation by
//! name through a per-type registration table). The [`ObjectFactory`] maps
//! type-name strings to constructors and is injected into each server
//! session; the [`ObjectRegistry`] owns the constructed instances of one
//! connection under monotonically assigned ids.
//!
//! The crate ships a few small built-in types (`echo`, `counter`,
//! `running_stats`) so a server is usable end to end; deployments register
//! their own payload types on the factory.

pub mod builtin;
pub mod factory;
pub mod object;
pub mod registry;

pub use factory::ObjectFactory;
pub use object::{Configurable, Invokable, MethodTable, RemoteObject};
pub use registry::{ObjectRegistry, FIRST_OBJECT_ID};

use crate::protocol::{ErrorKind, ObjectId};

/// Errors raised by object construction, configuration and invocation
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ObjectError {
    #[error("unknown object type: {type_name}")]
    UnknownType { type_name: String },

    #[error("no object with id {object_id}")]
    UnknownObjectId { object_id: ObjectId },

    #[error("type {type_name} has no method {method}")]
    UnknownMethod { type_name: String, method: String },

    #[error("type {type_name} has no option {option}")]
    UnknownOption { type_name: String, option: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("object of type {type_name} used before build()")]
    NotBuilt { type_name: String },

    #[error("build failed for {type_name}: {message}")]
    BuildFailed { type_name: String, message: String },
}

impl ObjectError {
    /// Convenience constructor for argument validation failures
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wire-level classification of this error
    pub fn wire_kind(&self) -> ErrorKind {
        match self {
            ObjectError::UnknownType { .. } => ErrorKind::UnknownType,
            ObjectError::UnknownObjectId { .. } => ErrorKind::UnknownObjectId,
            ObjectError::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            ObjectError::UnknownOption { .. } => ErrorKind::UnknownOption,
            ObjectError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ObjectError::NotBuilt { .. } => ErrorKind::NotBuilt,
            ObjectError::BuildFailed { .. } => ErrorKind::BuildFailed,
        }
    }
}
