//! Error types for the Kubernetes datastore
//!
//! Native API failures are translated into the datastore taxonomy at the
//! adapter boundary by [`Error::from_kube`], so callers only ever match on
//! datastore-level conditions plus a transport catch-all.

use crate::model::{Key, ListQuery};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Identifier
// =============================================================================

/// What an error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Key(Key),
    List(ListQuery),
    Name(String),
    None,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Key(k) => write!(f, "{}", k),
            Identifier::List(l) => write!(f, "{}", l),
            Identifier::Name(n) => f.write_str(n),
            Identifier::None => f.write_str("<unknown>"),
        }
    }
}

impl From<Key> for Identifier {
    fn from(k: Key) -> Self {
        Identifier::Key(k)
    }
}

impl From<&Key> for Identifier {
    fn from(k: &Key) -> Self {
        Identifier::Key(k.clone())
    }
}

impl From<ListQuery> for Identifier {
    fn from(l: ListQuery) -> Self {
        Identifier::List(l)
    }
}

impl From<&ListQuery> for Identifier {
    fn from(l: &ListQuery) -> Self {
        Identifier::List(l.clone())
    }
}

// =============================================================================
// Error
// =============================================================================

/// Unified error type for the datastore
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Datastore Taxonomy
    // =========================================================================
    #[error("resource does not exist: {identifier}")]
    ResourceDoesNotExist { identifier: Identifier },

    #[error("resource already exists: {identifier}")]
    ResourceAlreadyExists { identifier: Identifier },

    #[error("update conflict: {identifier}")]
    ResourceUpdateConflict { identifier: Identifier },

    #[error("operation {operation} is not supported on {identifier}")]
    OperationNotSupported {
        identifier: Identifier,
        operation: &'static str,
    },

    // =========================================================================
    // Translation Errors
    // =========================================================================
    #[error("decode error: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error on {identifier}: {source}")]
    Kube {
        identifier: Identifier,
        #[source]
        source: kube::Error,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("timed out waiting for {operation}")]
    Timeout { operation: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Translate a native API error into the datastore taxonomy.
    pub fn from_kube(err: kube::Error, identifier: impl Into<Identifier>) -> Self {
        let identifier = identifier.into();
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Error::ResourceDoesNotExist { identifier },
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
                Error::ResourceAlreadyExists { identifier }
            }
            kube::Error::Api(resp) if resp.code == 409 => {
                Error::ResourceUpdateConflict { identifier }
            }
            _ => Error::Kube {
                identifier,
                source: err,
            },
        }
    }

    pub fn does_not_exist(identifier: impl Into<Identifier>) -> Self {
        Error::ResourceDoesNotExist {
            identifier: identifier.into(),
        }
    }

    pub fn not_supported(identifier: impl Into<Identifier>, operation: &'static str) -> Self {
        Error::OperationNotSupported {
            identifier: identifier.into(),
            operation,
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Wrap with a human readable context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::ResourceDoesNotExist { .. })
    }

    /// Check if retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            Error::Kube { .. } | Error::ResourceUpdateConflict { .. } | Error::Timeout { .. }
        )
    }
}

/// Result type alias for the datastore
pub type Result<T> = std::result::Result<T, Error>;
