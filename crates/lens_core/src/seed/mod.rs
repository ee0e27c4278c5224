//! Demo rows injected into empty collections.
//!
//! # Responsibility
//! - Load seed drafts from a JSON catalog keyed by `domain/Type`.
//! - Hand drafts to collections; the store decides when to apply them.
//!
//! # Invariants
//! - Every key parses as a `CollectionKey`, every draft has a title, and
//!   statuses of known kinds belong to their status set.
//! - Drafts keep catalog order.

use crate::backend::{BackendError, CollectionKey};
use crate::model::artifact::{ArtifactDraft, ArtifactValidationError};
use crate::schema::validate_status;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid seed catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid seed collection key: {0}")]
    Key(#[from] BackendError),
    #[error("invalid seed for `{key}` at index {index}: {source}")]
    Draft {
        key: String,
        index: usize,
        #[source]
        source: ArtifactValidationError,
    },
}

/// Seed drafts per collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedCatalog {
    entries: BTreeMap<CollectionKey, Vec<ArtifactDraft>>,
}

impl SeedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{ "<domain>/<Type>": [ {title, data, meta}, ... ] }`.
    pub fn from_json_str(text: &str) -> Result<Self, SeedError> {
        let raw: BTreeMap<String, Vec<ArtifactDraft>> = serde_json::from_str(text)?;
        let mut catalog = Self::new();
        for (raw_key, drafts) in raw {
            let key = CollectionKey::parse(&raw_key)?;
            for (index, draft) in drafts.iter().enumerate() {
                draft
                    .validate()
                    .and_then(|()| validate_status(&key, draft.meta.status.as_deref()))
                    .map_err(|source| SeedError::Draft {
                        key: raw_key.clone(),
                        index,
                        source,
                    })?;
            }
            catalog.entries.entry(key).or_default().extend(drafts);
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn insert(&mut self, key: CollectionKey, drafts: Vec<ArtifactDraft>) {
        self.entries.entry(key).or_default().extend(drafts);
    }

    /// Drafts for one collection; empty when the catalog has none.
    pub fn seeds_for(&self, key: &CollectionKey) -> Vec<ArtifactDraft> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CollectionKey> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
