//! Strongly-typed wrapper over one kind's collection.
//!
//! Statuses and data go through the kind's own types, so a typed caller
//! cannot write a status outside the kind's enumeration.

use super::collection::{ArtifactCollection, CollectionOptions, CollectionSnapshot};
use super::error::StoreResult;
use crate::backend::LensBackend;
use crate::model::artifact::{ArtifactDraft, ArtifactId, ArtifactMeta, ArtifactPatch};
use crate::model::status::LensStatus;
use crate::schema::{encode_data, ArtifactKind, SchemaError, TypedArtifact};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct TypedCollection<K: ArtifactKind, B: LensBackend + ?Sized = dyn LensBackend> {
    inner: ArtifactCollection<B>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ArtifactKind, B: LensBackend + ?Sized> Clone for TypedCollection<K, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ArtifactKind, B: LensBackend + ?Sized + 'static> TypedCollection<K, B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::from_collection(ArtifactCollection::new(backend, K::key()))
    }

    pub fn with_options(
        backend: Arc<B>,
        options: CollectionOptions,
        seeds: Vec<ArtifactDraft>,
    ) -> Self {
        Self::from_collection(ArtifactCollection::with_options(
            backend,
            K::key(),
            options,
            seeds,
        ))
    }

    /// Wraps an existing handle. The handle must address `K`'s collection.
    pub fn try_from_collection(inner: ArtifactCollection<B>) -> Result<Self, SchemaError> {
        if inner.key() != &K::key() {
            return Err(SchemaError::TypeMismatch {
                expected: K::key().to_string(),
                actual: inner.key().to_string(),
            });
        }
        Ok(Self::from_collection(inner))
    }

    fn from_collection(inner: ArtifactCollection<B>) -> Self {
        Self {
            inner,
            _kind: PhantomData,
        }
    }

    pub fn collection(&self) -> &ArtifactCollection<B> {
        &self.inner
    }

    /// Decodes the current snapshot (see `ArtifactCollection::list`).
    pub fn items(&self) -> Result<Vec<TypedArtifact<K>>, SchemaError> {
        decode_all(self.inner.list())
    }

    pub fn refresh(&self) -> StoreResult<Vec<TypedArtifact<K>>> {
        Ok(decode_all(self.inner.refresh()?)?)
    }

    pub fn create(
        &self,
        title: impl Into<String>,
        data: &K::Data,
        status: Option<K::Status>,
    ) -> StoreResult<TypedArtifact<K>> {
        let draft = ArtifactDraft {
            title: title.into(),
            data: encode_data::<K>(data)?,
            meta: ArtifactMeta {
                status: status.map(|status| status.as_str().to_string()),
                ..ArtifactMeta::default()
            },
        };
        let created = self.inner.create(draft)?;
        Ok(TypedArtifact::decode(created)?)
    }

    pub fn set_status(&self, id: &ArtifactId, status: K::Status) -> StoreResult<TypedArtifact<K>> {
        let updated = self.inner.update(id, ArtifactPatch::status(status.as_str()))?;
        Ok(TypedArtifact::decode(updated)?)
    }

    /// Writes every field of `data` over the stored row.
    pub fn update_data(&self, id: &ArtifactId, data: &K::Data) -> StoreResult<TypedArtifact<K>> {
        let patch = ArtifactPatch::data(encode_data::<K>(data)?);
        let updated = self.inner.update(id, patch)?;
        Ok(TypedArtifact::decode(updated)?)
    }

    pub fn remove(&self, id: &ArtifactId) -> StoreResult<()> {
        self.inner.remove(id)
    }
}

fn decode_all<K: ArtifactKind>(
    snapshot: CollectionSnapshot,
) -> Result<Vec<TypedArtifact<K>>, SchemaError> {
    snapshot
        .items
        .into_iter()
        .map(TypedArtifact::decode)
        .collect()
}
