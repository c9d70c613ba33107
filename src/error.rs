//! Crate-wide error type.
//!
//! Internal storage and traversal code favors `anyhow::Result` with
//! `.context(...)` the way the rest of this crate's ancestry does; the
//! client facade is the single boundary where every error gets normalized
//! down to [`GraphError`], preserving the underlying cause.

use thiserror::Error;

/// Result alias returned from the client facade.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors returned across the client facade boundary (see spec §7).
#[derive(Debug, Error)]
pub enum GraphError {
    /// An identifier did not resolve to any node.
    #[error("not found: {0}")]
    NotFound(String),

    /// A null/empty key, unsupported direction string, or similarly
    /// malformed argument was supplied. Out-of-range limits are clamped,
    /// not rejected, so they never produce this variant.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempted insert of a duplicate unique key. Not fatal: the caller
    /// gets back the existing node.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// An edge or NPE referenced an endpoint that does not exist.
    #[error("dangling edge: {0}")]
    DanglingEdge(String),

    /// The underlying graph kernel failed a write transaction.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] anyhow::Error),

    /// The viewer is not authorized to see any version of the object.
    /// Client-facing operations represent this by returning `None`
    /// rather than raising; this variant exists for internal plumbing
    /// that cannot return `Option` directly (e.g. `query`).
    #[error("unauthorized")]
    Unauthorized,
}

impl GraphError {
    /// Wrap an arbitrary storage-layer error as a [`GraphError::StorageFailure`],
    /// preserving the original cause.
    pub fn storage(err: anyhow::Error) -> Self {
        GraphError::StorageFailure(err)
    }
}
