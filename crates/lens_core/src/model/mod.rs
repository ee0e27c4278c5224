//! Artifact envelope and status model shared by every lens.
//!
//! # Responsibility
//! - Define the generic envelope (`id/title/type/data/meta`) the store moves.
//! - Keep per-type field interpretation out of this layer (see `schema`).
//!
//! # Invariants
//! - Every record is identified by a store-assigned `ArtifactId`.
//! - Deletion is a hard delete; ids are never reused.

pub mod artifact;
pub mod status;
