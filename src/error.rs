//! Error taxonomy shared by naming, routing, context and dispatch.
//!
//! # Design Decisions
//! - One enum for the whole request path so handlers, routers and the
//!   transport adapter exchange a single failure type
//! - Each variant knows its status code; the adapter never guesses
//! - Routing errors are deterministic and never retried

use thiserror::Error;

/// Errors that can occur while addressing, routing or dispatching a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// Resource name text violates percent-encoding or segment rules.
    #[error("malformed resource name: {0}")]
    MalformedName(String),

    /// No route binding matched the resource name.
    #[error("no route matched resource '{0}'")]
    RouteNotFound(String),

    /// Two or more route bindings tied under every tie-break rule.
    #[error("ambiguous routes for resource '{resource}': {patterns:?}")]
    RouteAmbiguous {
        resource: String,
        patterns: Vec<String>,
    },

    /// A handler asked for a context kind that is absent from the chain.
    #[error("no context of kind '{0}' in chain")]
    ContextNotFound(String),

    /// A persisted context could not be reconstructed.
    #[error("cannot restore context: {0}")]
    ContextRestore(String),

    /// Advice name or value rejected at the call site.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request itself is invalid for the addressed resource.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The addressed resource does not support the operation.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A revision precondition did not hold.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The operation conflicts with the resource's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected server-side failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResourceError {
    /// HTTP-equivalent status code for the transport adapter.
    pub fn status(&self) -> u16 {
        match self {
            ResourceError::MalformedName(_)
            | ResourceError::InvalidArgument(_)
            | ResourceError::BadRequest(_) => 400,
            ResourceError::RouteNotFound(_) | ResourceError::NotFound(_) => 404,
            ResourceError::PreconditionFailed(_) => 412,
            ResourceError::Conflict(_) => 409,
            ResourceError::NotSupported(_) => 501,
            ResourceError::RouteAmbiguous { .. }
            | ResourceError::ContextNotFound(_)
            | ResourceError::ContextRestore(_)
            | ResourceError::Internal(_) => 500,
        }
    }

    /// Short reason phrase paired with [`ResourceError::status`].
    pub fn reason(&self) -> &'static str {
        match self.status() {
            400 => "Bad Request",
            404 => "Not Found",
            409 => "Conflict",
            412 => "Precondition Failed",
            501 => "Not Implemented",
            _ => "Internal Server Error",
        }
    }

    /// True for failures caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
