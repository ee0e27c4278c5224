//! Client-side store over a lens-data backend.
//!
//! # Responsibility
//! - Give each lens a cached handle on its `(domain, type)` collection.
//! - Translate backend failures into the fetch/request error split callers
//!   render (full error state vs. inline notice).

mod collection;
mod error;
mod typed;

pub use collection::{
    ArtifactCollection, CollectionOptions, CollectionPhase, CollectionSnapshot, RefreshHandle,
    DEFAULT_REFRESH_INTERVAL,
};
pub use error::{StoreError, StoreResult};
pub use typed::TypedCollection;
