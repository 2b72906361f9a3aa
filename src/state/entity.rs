//! Stateful entities: typed snapshots with debounced persistence
//!
//! A concrete flow model implements [`StatefulEntity`] (one unique state
//! key per type) and is handled through an [`Entity`], which owns the
//! in-memory value, a dirty marker, and at most one pending delayed save.
//!
//! # Saving
//!
//! - [`Entity::update`] mutates the value and (re)schedules a debounced
//!   save. A burst of updates collapses into one store write carrying the
//!   final values: each new mutation aborts the pending timer and starts a
//!   fresh one.
//! - [`Entity::save`] writes immediately and bypasses the timer.
//! - [`Entity::flush`] cancels the timer and writes now if anything is
//!   unsaved. Handlers call it on exit so the write is deterministic.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::storage::{ConversationId, SessionStore, StoreResult};

/// A serializable record persisted under its own state key
///
/// Two types must never share a `STATE_KEY`, or a load would deserialize
/// one flow's snapshot into another flow's shape.
pub trait StatefulEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const STATE_KEY: &'static str;
}

/// Store handle bound to one conversation identity
#[derive(Clone)]
pub struct SessionScope {
    store: Arc<dyn SessionStore>,
    id: ConversationId,
    debounce: Duration,
}

impl fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionScope")
            .field("id", &self.id)
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl SessionScope {
    pub fn new(store: Arc<dyn SessionStore>, id: ConversationId, debounce: Duration) -> Self {
        Self { store, id, debounce }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Loads a snapshot; an absent or corrupt payload yields `None`.
    pub async fn load<T: StatefulEntity>(&self) -> StoreResult<Option<Entity<T>>> {
        let Some(raw) = self.store.get(&self.id, T::STATE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<T>(&raw) {
            Ok(value) => Ok(Some(Entity::hydrated(self.clone(), value))),
            Err(e) => {
                log::warn!(
                    "Discarding corrupt '{}' snapshot for {}: {}",
                    T::STATE_KEY,
                    self.id,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Loads a snapshot or starts from `T::default()` (unsaved until mutated or flushed)
    pub async fn load_or_default<T: StatefulEntity + Default>(&self) -> StoreResult<Entity<T>> {
        Ok(match self.load::<T>().await? {
            Some(entity) => entity,
            None => Entity::hydrated(self.clone(), T::default()),
        })
    }

    /// Wraps a fresh in-memory value; nothing is written until a save.
    pub fn create<T: StatefulEntity>(&self, value: T) -> Entity<T> {
        let mut entity = Entity::hydrated(self.clone(), value);
        entity.generation = 1;
        entity
    }

    /// Removes an entity's snapshot. Idempotent.
    pub async fn clear<T: StatefulEntity>(&self) -> StoreResult<()> {
        self.store.delete(&self.id, T::STATE_KEY).await
    }
}

/// An in-memory flow model bound to its snapshot slot
pub struct Entity<T: StatefulEntity> {
    scope: SessionScope,
    value: T,
    /// Bumped on every mutation
    generation: u64,
    /// Last generation known to be in the store, shared with the timer task
    persisted: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl<T: StatefulEntity> Entity<T> {
    fn hydrated(scope: SessionScope, value: T) -> Self {
        Self {
            scope,
            value,
            generation: 0,
            persisted: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    pub fn is_dirty(&self) -> bool {
        self.persisted.load(Ordering::SeqCst) != self.generation
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Mutates the value and schedules a debounced save
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value);
        self.generation += 1;
        self.schedule_save();
        result
    }

    /// Cancels any pending save and starts a new delayed one with the current value
    pub fn schedule_save(&mut self) {
        self.cancel_pending();

        let payload = match serde_json::to_vec(&self.value) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to serialize '{}' snapshot: {}", T::STATE_KEY, e);
                return;
            }
        };

        let store = Arc::clone(&self.scope.store);
        let id = self.scope.id;
        let delay = self.scope.debounce;
        let generation = self.generation;
        let persisted = Arc::clone(&self.persisted);

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.put(&id, T::STATE_KEY, payload).await {
                Ok(()) => {
                    persisted.fetch_max(generation, Ordering::SeqCst);
                }
                Err(e) => log::warn!("Debounced save of '{}' for {} failed: {}", T::STATE_KEY, id, e),
            }
        }));
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Writes immediately, bypassing the debounce timer
    pub async fn save(&mut self) -> StoreResult<()> {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            let _ = handle.await;
        }
        let payload = serde_json::to_vec(&self.value)?;
        self.scope.store.put(&self.scope.id, T::STATE_KEY, payload).await?;
        self.persisted.store(self.generation, Ordering::SeqCst);
        Ok(())
    }

    /// Forces any unsaved change to the store now
    pub async fn flush(&mut self) -> StoreResult<()> {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            let _ = handle.await;
        }
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Cancels pending writes and deletes the snapshot
    pub async fn clear(mut self) -> StoreResult<()> {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.scope.clear::<T>().await
    }

    pub fn into_inner(mut self) -> T {
        self.cancel_pending();
        self.value
    }
}

impl<T: StatefulEntity> Deref for Entity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: StatefulEntity + fmt::Debug> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("key", &T::STATE_KEY)
            .field("value", &self.value)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
