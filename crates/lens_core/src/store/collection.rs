//! Cached, shareable handle on one `(domain, type)` collection.
//!
//! # Responsibility
//! - Serve the latest known rows without blocking, refreshing in the
//!   background when the cache is unloaded or stale.
//! - Write every successful mutation through to the cache.
//! - Seed an empty collection once from caller-supplied drafts.
//!
//! # Invariants
//! - Phases move `Unloaded -> Loading -> Ready | Failed`. A failed refresh
//!   while `Ready` keeps the stale rows and records `last_error`.
//! - `revision` grows by one for every response applied to the cache, so the
//!   last response to arrive wins and is observable.
//! - A failed mutation leaves the cache unchanged.
//! - Seeding is attempted at most once per collection, and only when the
//!   first successful fetch is empty.

use super::error::{StoreError, StoreResult};
use crate::backend::{BackendError, BackendResult, CollectionKey, LensBackend};
use crate::model::artifact::{Artifact, ArtifactDraft, ArtifactId, ArtifactPatch};
use crate::schema::validate_status;
use log::{error, info, warn};
use serde_json::Value;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const MIN_REFRESHER_INTERVAL: Duration = Duration::from_millis(10);

/// Freshness policy of one collection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Cache age after which `list` refetches. `None` never expires.
    pub refresh_interval: Option<Duration>,
    /// Whether `list` may start a background refresh thread.
    pub background: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Some(DEFAULT_REFRESH_INTERVAL),
            background: true,
        }
    }
}

impl CollectionOptions {
    /// No background work; the caller drives `refresh` explicitly.
    pub fn manual() -> Self {
        Self {
            refresh_interval: None,
            background: false,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionPhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl CollectionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time copy of a collection's cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub key: CollectionKey,
    pub phase: CollectionPhase,
    pub items: Vec<Artifact>,
    /// Mutations sent but not yet answered.
    pub pending: usize,
    pub refreshing: bool,
    pub last_error: Option<String>,
    pub revision: u64,
}

impl CollectionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.phase == CollectionPhase::Ready
    }

    pub fn is_mutating(&self) -> bool {
        self.pending > 0
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.items.iter().find(|artifact| &artifact.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
struct CollectionState {
    phase: CollectionPhase,
    items: Vec<Artifact>,
    pending: usize,
    refreshing: bool,
    last_error: Option<String>,
    revision: u64,
    loaded_at: Option<Instant>,
    seeding: SeedProgress,
}

/// Seed bookkeeping; `created` counts seeds already written, in order.
#[derive(Debug, Default)]
struct SeedProgress {
    created: usize,
    running: bool,
    done: bool,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            phase: CollectionPhase::Unloaded,
            items: Vec::new(),
            pending: 0,
            refreshing: false,
            last_error: None,
            revision: 0,
            loaded_at: None,
            seeding: SeedProgress::default(),
        }
    }

    fn snapshot(&self, key: &CollectionKey) -> CollectionSnapshot {
        CollectionSnapshot {
            key: key.clone(),
            phase: self.phase,
            items: self.items.clone(),
            pending: self.pending,
            refreshing: self.refreshing,
            last_error: self.last_error.clone(),
            revision: self.revision,
        }
    }

    fn is_stale(&self, interval: Option<Duration>) -> bool {
        match self.phase {
            CollectionPhase::Unloaded => true,
            CollectionPhase::Ready => match (self.loaded_at, interval) {
                (None, _) => true,
                (Some(loaded_at), Some(interval)) => loaded_at.elapsed() >= interval,
                (Some(_), None) => false,
            },
            CollectionPhase::Loading | CollectionPhase::Failed => false,
        }
    }

    fn begin_refresh(&mut self) {
        self.refreshing = true;
        if self.phase != CollectionPhase::Ready {
            self.phase = CollectionPhase::Loading;
        }
    }

    fn upsert(&mut self, artifact: Artifact) {
        match self.items.iter_mut().find(|item| item.id == artifact.id) {
            Some(slot) => *slot = artifact,
            None => self.items.push(artifact),
        }
        self.revision += 1;
    }

    fn evict(&mut self, id: &ArtifactId) {
        self.items.retain(|item| &item.id != id);
        self.revision += 1;
    }

    /// Forces the next `list` to refetch.
    fn invalidate(&mut self) {
        self.loaded_at = None;
        self.revision += 1;
    }
}

struct Shared<B: ?Sized> {
    backend: Arc<B>,
    key: CollectionKey,
    seeds: Vec<ArtifactDraft>,
    options: CollectionOptions,
    state: Mutex<CollectionState>,
}

impl<B: LensBackend + ?Sized> Shared<B> {
    fn state(&self) -> MutexGuard<'_, CollectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) -> StoreResult<CollectionSnapshot> {
        self.state().begin_refresh();
        self.run_refresh()
    }

    /// Marks a refresh as started unless one is already running.
    fn try_begin_refresh(&self) -> bool {
        let mut state = self.state();
        if state.refreshing {
            return false;
        }
        state.begin_refresh();
        true
    }

    fn run_refresh(&self) -> StoreResult<CollectionSnapshot> {
        let started_at = Instant::now();
        info!(
            "event=collection_refresh module=store status=start domain={} type={}",
            self.key.domain(),
            self.key.artifact_type()
        );

        let result = self.fetch();

        let mut state = self.state();
        state.refreshing = false;
        state.revision += 1;
        match result {
            Ok(items) => {
                state.phase = CollectionPhase::Ready;
                state.items = items;
                state.last_error = None;
                state.loaded_at = Some(Instant::now());
                info!(
                    "event=collection_refresh module=store status=ok domain={} type={} count={} duration_ms={}",
                    self.key.domain(),
                    self.key.artifact_type(),
                    state.items.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(state.snapshot(&self.key))
            }
            Err(source) => {
                state.last_error = Some(source.to_string());
                if state.phase != CollectionPhase::Ready {
                    state.phase = CollectionPhase::Failed;
                }
                error!(
                    "event=collection_refresh module=store status=error domain={} type={} phase={} duration_ms={} error_code={}",
                    self.key.domain(),
                    self.key.artifact_type(),
                    state.phase.as_str(),
                    started_at.elapsed().as_millis(),
                    source.code()
                );
                Err(StoreError::Fetch {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }

    fn fetch(&self) -> BackendResult<Vec<Artifact>> {
        let items = self.backend.list(&self.key)?;
        match self.claim_seeding(items.is_empty()) {
            Some(start) => self.seed(start, items),
            None => Ok(items),
        }
    }

    /// Index of the next seed to create, or `None` when seeding is settled
    /// or already running on another thread.
    ///
    /// The first successful fetch decides whether seeding happens at all. A
    /// seeding run that failed partway resumes on the next fetch even though
    /// the collection is no longer empty.
    fn claim_seeding(&self, observed_empty: bool) -> Option<usize> {
        let mut state = self.state();
        if state.seeding.done || state.seeding.running {
            return None;
        }
        let resuming = state.seeding.created > 0;
        if self.seeds.is_empty() || !(observed_empty || resuming) {
            state.seeding.done = true;
            return None;
        }
        state.seeding.running = true;
        Some(state.seeding.created)
    }

    fn seed(&self, start: usize, mut items: Vec<Artifact>) -> BackendResult<Vec<Artifact>> {
        let result = self.create_seeds(start, &mut items);
        let mut state = self.state();
        state.seeding.running = false;
        // Invalid drafts never become valid; report once and stop trying.
        if matches!(result, Ok(()) | Err(BackendError::Validation(_))) {
            state.seeding.done = true;
        }
        result.map(|()| items)
    }

    fn create_seeds(&self, start: usize, items: &mut Vec<Artifact>) -> BackendResult<()> {
        let pending = self.seeds.get(start..).unwrap_or_default();
        info!(
            "event=collection_seed module=store status=start domain={} type={} count={} resume_at={start}",
            self.key.domain(),
            self.key.artifact_type(),
            pending.len()
        );
        for draft in pending {
            draft.validate()?;
            validate_status(&self.key, draft.meta.status.as_deref())?;
        }
        for draft in pending {
            match self.backend.create(&self.key, draft) {
                Ok(artifact) => {
                    items.push(artifact);
                    self.state().seeding.created += 1;
                }
                Err(err) => {
                    warn!(
                        "event=collection_seed module=store status=error domain={} type={} created={} error_code={}",
                        self.key.domain(),
                        self.key.artifact_type(),
                        self.state().seeding.created,
                        err.code()
                    );
                    return Err(err);
                }
            }
        }
        info!(
            "event=collection_seed module=store status=ok domain={} type={} count={}",
            self.key.domain(),
            self.key.artifact_type(),
            pending.len()
        );
        Ok(())
    }

    /// Runs one backend call as a pending mutation and applies its result to
    /// the cache in the same critical section that clears the pending mark.
    fn mutate<T>(
        &self,
        op: &'static str,
        call: impl FnOnce(&B, &CollectionKey) -> BackendResult<T>,
        apply: impl FnOnce(&mut CollectionState, &T),
    ) -> StoreResult<T> {
        self.state().pending += 1;
        let started_at = Instant::now();
        info!(
            "event=collection_{op} module=store status=start domain={} type={}",
            self.key.domain(),
            self.key.artifact_type()
        );

        let result = call(self.backend.as_ref(), &self.key);

        let mut state = self.state();
        state.pending = state.pending.saturating_sub(1);
        match &result {
            Ok(value) => {
                apply(&mut state, value);
                info!(
                    "event=collection_{op} module=store status=ok domain={} type={} duration_ms={}",
                    self.key.domain(),
                    self.key.artifact_type(),
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => error!(
                "event=collection_{op} module=store status=error domain={} type={} duration_ms={} error_code={}",
                self.key.domain(),
                self.key.artifact_type(),
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result.map_err(|source| StoreError::request(op, source))
    }
}

/// Client-side handle on one artifact collection.
///
/// Clones share one cache. The backend stays the source of truth; the cache
/// is a read-through/write-through convenience.
pub struct ArtifactCollection<B: LensBackend + ?Sized = dyn LensBackend> {
    shared: Arc<Shared<B>>,
}

impl<B: LensBackend + ?Sized> Clone for ArtifactCollection<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: LensBackend + ?Sized + 'static> ArtifactCollection<B> {
    pub fn new(backend: Arc<B>, key: CollectionKey) -> Self {
        Self::with_options(backend, key, CollectionOptions::default(), Vec::new())
    }

    /// Collection that creates `seeds` if its first fetch comes back empty.
    pub fn with_seeds(backend: Arc<B>, key: CollectionKey, seeds: Vec<ArtifactDraft>) -> Self {
        Self::with_options(backend, key, CollectionOptions::default(), seeds)
    }

    pub fn with_options(
        backend: Arc<B>,
        key: CollectionKey,
        options: CollectionOptions,
        seeds: Vec<ArtifactDraft>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                key,
                seeds,
                options,
                state: Mutex::new(CollectionState::new()),
            }),
        }
    }

    pub fn key(&self) -> &CollectionKey {
        &self.shared.key
    }

    pub fn options(&self) -> CollectionOptions {
        self.shared.options
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.shared.backend
    }

    /// Current cache without triggering any refresh.
    pub fn snapshot(&self) -> CollectionSnapshot {
        self.shared.state().snapshot(&self.shared.key)
    }

    /// Returns the cached snapshot immediately. Starts a background refresh
    /// when the cache is unloaded or stale and background work is enabled.
    pub fn list(&self) -> CollectionSnapshot {
        let should_refresh = {
            let state = self.shared.state();
            self.shared.options.background
                && !state.refreshing
                && state.is_stale(self.shared.options.refresh_interval)
        };
        if should_refresh && self.shared.try_begin_refresh() {
            self.spawn_background_refresh();
        }
        self.snapshot()
    }

    /// Refetches synchronously. Also the retry path out of `Failed`.
    pub fn refresh(&self) -> StoreResult<CollectionSnapshot> {
        self.shared.refresh()
    }

    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        self.shared
            .state()
            .items
            .iter()
            .find(|artifact| &artifact.id == id)
            .cloned()
    }

    /// Creates a row remotely and inserts the stored result into the cache.
    pub fn create(&self, draft: ArtifactDraft) -> StoreResult<Artifact> {
        draft.validate()?;
        validate_status(&self.shared.key, draft.meta.status.as_deref())?;
        self.shared.mutate(
            "create",
            |backend, key| backend.create(key, &draft),
            |state, artifact| state.upsert(artifact.clone()),
        )
    }

    /// Merges `patch` remotely; the server's record replaces the cached one.
    pub fn update(&self, id: &ArtifactId, patch: ArtifactPatch) -> StoreResult<Artifact> {
        patch.validate()?;
        let status = patch.meta.as_ref().and_then(|meta| meta.status.as_deref());
        validate_status(&self.shared.key, status)?;
        self.shared.mutate(
            "update",
            |backend, key| backend.update(key, id, &patch),
            |state, artifact| state.upsert(artifact.clone()),
        )
    }

    /// Deletes remotely and locally. Removing an unknown id succeeds.
    pub fn remove(&self, id: &ArtifactId) -> StoreResult<()> {
        self.shared.mutate(
            "remove",
            |backend, key| match backend.remove(key, id) {
                Err(BackendError::NotFound(_)) => Ok(()),
                other => other,
            },
            |state, _| state.evict(id),
        )
    }

    /// Runs a named domain action and returns its opaque result.
    ///
    /// The action may change the row server-side, so the cache is marked
    /// stale rather than patched.
    pub fn run_action(&self, id: &ArtifactId, action: &str, params: Value) -> StoreResult<Value> {
        self.shared.mutate(
            "run_action",
            |backend, key| backend.run_action(key.domain(), id, action, &params),
            |state, _| state.invalidate(),
        )
    }

    /// Refreshes every `interval` on a worker thread until the handle drops.
    pub fn spawn_refresher(&self, interval: Duration) -> io::Result<RefreshHandle> {
        let interval = interval.max(MIN_REFRESHER_INTERVAL);
        let shared = Arc::clone(&self.shared);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = thread::Builder::new()
            .name(format!("lens-refresher-{}", self.shared.key))
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if shared.try_begin_refresh() {
                            // Outcome is recorded in the shared state.
                            let _ = shared.run_refresh();
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(RefreshHandle {
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    fn spawn_background_refresh(&self) {
        let worker = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("lens-refresh-{}", self.shared.key))
            .spawn(move || {
                // Outcome is recorded in the shared state.
                let _ = worker.run_refresh();
            });
        if let Err(err) = spawned {
            let mut state = self.shared.state();
            state.refreshing = false;
            if state.phase == CollectionPhase::Loading {
                state.phase = CollectionPhase::Unloaded;
            }
            error!(
                "event=collection_refresh module=store status=error domain={} type={} error_code=spawn error={err}",
                self.shared.key.domain(),
                self.shared.key.artifact_type()
            );
        }
    }
}

/// Keeps a periodic refresher alive. Dropping it stops further refreshes;
/// a refresh already in flight still completes and updates the cache.
#[derive(Debug)]
pub struct RefreshHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stops the refresher and waits for an in-flight refresh to finish.
    pub fn stop(mut self) {
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=collection_refresher module=store status=error error_code=panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        // Closing the channel wakes the worker, which then exits.
        self.stop.take();
    }
}
