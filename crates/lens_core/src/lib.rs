//! Core of the lens dashboard client.
//! Single source of truth for the artifact envelope, typed lens schemas and
//! the cached store over the lens-data resource.

pub mod backend;
pub mod config;
pub mod db;
pub mod derive;
pub mod logging;
pub mod model;
pub mod schema;
pub mod seed;
pub mod store;

pub use backend::{
    ActionHandler, ActionOutcome, ActionRegistry, ActionRegistryError, BackendError,
    BackendResult, CollectionKey, HttpBackend, LensBackend, LocalBackend,
};
pub use config::{BackendConfig, ConfigError, LensConfig};
pub use derive::{ArtifactFilter, StatusHistogram};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::artifact::{
    Artifact, ArtifactDraft, ArtifactId, ArtifactMeta, ArtifactPatch, ArtifactValidationError,
    DataMap, MetaPatch,
};
pub use model::status::{LensStatus, StatusSet};
pub use schema::{catalog, find_kind, ArtifactKind, KindInfo, LensData, SchemaError, TypedArtifact};
pub use seed::{SeedCatalog, SeedError};
pub use store::{
    ArtifactCollection, CollectionOptions, CollectionPhase, CollectionSnapshot, RefreshHandle,
    StoreError, StoreResult, TypedCollection,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
