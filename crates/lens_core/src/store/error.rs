use crate::backend::{BackendError, CollectionKey};
use crate::model::artifact::{ArtifactId, ArtifactValidationError};
use crate::schema::SchemaError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced to callers of a collection handle.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Loading the collection failed; the caller may retry with `refresh`.
    #[error("failed to load `{key}`: {source}")]
    Fetch {
        key: CollectionKey,
        #[source]
        source: BackendError,
    },
    /// One create/update/remove/action call failed. The cache is unchanged.
    #[error("{op} failed: {source}")]
    Request {
        op: &'static str,
        #[source]
        source: BackendError,
    },
    /// The target no longer exists (e.g. deleted elsewhere).
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),
    #[error(transparent)]
    Validation(#[from] ArtifactValidationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub(crate) fn request(op: &'static str, source: BackendError) -> Self {
        match source {
            BackendError::NotFound(id) => Self::NotFound(id),
            BackendError::Validation(err) => Self::Validation(err),
            source => Self::Request { op, source },
        }
    }

    /// Stable machine code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Request { .. } => "request",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Schema(_) => "schema",
        }
    }

    /// Whether the same call may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { source, .. } | Self::Request { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
