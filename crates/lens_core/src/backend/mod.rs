//! Backend seam for the lens-data resource.
//!
//! # Responsibility
//! - Define the CRUD + run-action contract every backing store implements.
//! - Name collections by `(domain, type)` exactly as the REST paths do.
//!
//! # Invariants
//! - Backends are the source of truth; they assign ids and timestamps.
//! - `update`/`remove` of an unknown id reports `BackendError::NotFound`;
//!   idempotent delete semantics are layered on top by the store client.
//! - Backends are shareable across threads (`Send + Sync`).

use crate::db::DbError;
use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId, ArtifactPatch, ArtifactValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub mod actions;
pub mod http;
pub mod local;

pub use actions::{ActionHandler, ActionOutcome, ActionRegistry, ActionRegistryError};
pub use http::HttpBackend;
pub use local::LocalBackend;

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid segment regex"));

pub type BackendResult<T> = Result<T, BackendError>;

/// Identifies one artifact collection: `/lens-data/{domain}/{type}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    domain: String,
    artifact_type: String,
}

impl CollectionKey {
    pub fn new(domain: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            artifact_type: artifact_type.into(),
        }
    }

    /// Parses the `domain/Type` shorthand used by seed files and the CLI.
    pub fn parse(value: &str) -> BackendResult<Self> {
        let (domain, artifact_type) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| BackendError::InvalidKey(value.to_string()))?;
        let key = Self::new(domain, artifact_type);
        key.validate()?;
        Ok(key)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    /// Both segments must be URL-path safe identifiers.
    pub fn validate(&self) -> BackendResult<()> {
        validate_segment(&self.domain)?;
        validate_segment(&self.artifact_type)
    }
}

impl Display for CollectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.domain, self.artifact_type)
    }
}

pub(crate) fn validate_segment(value: &str) -> BackendResult<()> {
    if SEGMENT_RE.is_match(value) {
        Ok(())
    } else {
        Err(BackendError::InvalidKey(value.to_string()))
    }
}

/// Failures reported by a backing store.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid collection segment `{0}`")]
    InvalidKey(String),
    #[error("artifact not found: {0}")]
    NotFound(ArtifactId),
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("action `{action}` failed: {message}")]
    ActionFailed { action: String, message: String },
    #[error("invalid stored artifact: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Validation(#[from] ArtifactValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl BackendError {
    /// Stable machine code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "invalid_key",
            Self::NotFound(_) => "not_found",
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::UnknownAction(_) => "unknown_action",
            Self::ActionFailed { .. } => "action_failed",
            Self::InvalidData(_) => "invalid_data",
            Self::Validation(_) => "validation",
            Self::Db(_) => "db",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same call can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Db(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Contract of the lens-data resource, per domain namespace and type.
pub trait LensBackend: Send + Sync {
    /// Short backend label for log lines.
    fn name(&self) -> &'static str;

    fn list(&self, key: &CollectionKey) -> BackendResult<Vec<Artifact>>;

    fn create(&self, key: &CollectionKey, draft: &ArtifactDraft) -> BackendResult<Artifact>;

    fn update(
        &self,
        key: &CollectionKey,
        id: &ArtifactId,
        patch: &ArtifactPatch,
    ) -> BackendResult<Artifact>;

    fn remove(&self, key: &CollectionKey, id: &ArtifactId) -> BackendResult<()>;

    /// Invokes a named domain side-effect and returns its opaque result.
    fn run_action(
        &self,
        domain: &str,
        id: &ArtifactId,
        action: &str,
        params: &Value,
    ) -> BackendResult<Value>;
}
