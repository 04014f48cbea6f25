//! Generic in-memory collection behind every domain cache.
//!
//! Entries change only after the service confirmed a write, and a
//! confirmation older than what is already cached is dropped.
//!
//! [`EntityCache::clear`] starts a new epoch. A response to a request made in
//! an earlier epoch (for instance under the previous session) is discarded by
//! [`load_with`](EntityCache::load_with) and the `*_in` writers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use taskhub_shared::protocol::{Category, Project, Task, User};
use taskhub_shared::types::{CategoryId, ProjectId, TaskId, UserId};
use tracing::{debug, warn};

use crate::error::ClientError;

/// A server-owned record with a stable id.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + fmt::Debug + Send + Sync;

    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    /// Server timestamp of the last write, when the resource carries one.
    fn revision(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl Entity for Project {
    type Id = ProjectId;
    const KIND: &'static str = "project";

    fn id(&self) -> ProjectId {
        self.id
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Task {
    type Id = TaskId;
    const KIND: &'static str = "task";

    fn id(&self) -> TaskId {
        self.id
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> UserId {
        self.id
    }
}

impl Entity for Category {
    type Id = CategoryId;
    const KIND: &'static str = "category";

    fn id(&self) -> CategoryId {
        self.id
    }
}

/// What [`EntityCache::update`] did with an incoming entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The cached entry is newer; nothing changed.
    Stale,
}

fn is_stale<T: Entity>(incoming: &T, cached: &T) -> bool {
    matches!(
        (incoming.revision(), cached.revision()),
        (Some(new), Some(old)) if new < old
    )
}

/// Counts one fetch in flight for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Epoch a request was issued in. See [`EntityCache::epoch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEpoch(u64);

/// Ordered, id-unique collection of one entity kind.
pub struct EntityCache<T: Entity> {
    items: RwLock<Vec<T>>,
    /// Fetches currently in flight.
    loading: AtomicUsize,
    /// Bumped by `clear`, always while holding the `items` write lock.
    epoch: AtomicU64,
}

impl<T: Entity> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityCache<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            loading: AtomicUsize::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    /// True while at least one [`load_with`](Self::load_with) is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire) > 0
    }

    /// Current epoch. Take it before sending a request whose answer will be
    /// written back with one of the `*_in` methods.
    pub fn epoch(&self) -> CacheEpoch {
        CacheEpoch(self.epoch.load(Ordering::Acquire))
    }

    /// Drop every entry and start a new epoch.
    pub fn clear(&self) {
        let mut items = self.write();
        items.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Write guard, but only if no `clear` happened since `epoch`.
    fn write_in(&self, epoch: CacheEpoch) -> Option<RwLockWriteGuard<'_, Vec<T>>> {
        let items = self.write();
        if self.epoch() == epoch {
            Some(items)
        } else {
            debug!(kind = T::KIND, "discarding response from a cleared epoch");
            None
        }
    }

    /// Replace the whole collection with the result of `fetch`.
    ///
    /// On failure the previous collection is kept (empty on a first load) and
    /// the error is returned as is. Returns the number of entries loaded, or 0
    /// when the cache was cleared while the fetch was running and the result
    /// was discarded.
    pub async fn load_with<F, Fut>(&self, fetch: F) -> Result<usize, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        let epoch = self.epoch();
        let _guard = LoadingGuard::start(&self.loading);

        match fetch().await {
            Ok(items) => {
                let Some(mut slot) = self.write_in(epoch) else {
                    return Ok(0);
                };
                let count = items.len();
                *slot = items;
                debug!(kind = T::KIND, count, "cache loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(kind = T::KIND, error = %e, "cache load failed, keeping previous entries");
                Err(e)
            }
        }
    }

    /// Append `entity`, or replace the entry that already has its id.
    pub fn add(&self, entity: T) {
        let mut items = self.write();
        match items.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => *slot = entity,
            None => items.push(entity),
        }
    }

    /// Replace the entry with the same id. Fails with `NotFound` when the id
    /// is not cached.
    pub fn update(&self, entity: T) -> Result<UpdateOutcome, ClientError> {
        let mut items = self.write();
        let Some(slot) = items.iter_mut().find(|e| e.id() == entity.id()) else {
            return Err(ClientError::NotFound);
        };
        if is_stale(&entity, slot) {
            debug!(kind = T::KIND, id = ?entity.id(), "ignoring stale update");
            return Ok(UpdateOutcome::Stale);
        }
        *slot = entity;
        Ok(UpdateOutcome::Applied)
    }

    /// [`add`](Self::add) for unknown ids, [`update`](Self::update) for known ones.
    pub fn upsert(&self, entity: T) -> UpdateOutcome {
        upsert_into(&mut self.write(), entity)
    }

    /// [`add`](Self::add) unless the cache was cleared since `epoch`.
    /// Returns whether the entity was stored.
    pub fn add_in(&self, epoch: CacheEpoch, entity: T) -> bool {
        let Some(mut items) = self.write_in(epoch) else {
            return false;
        };
        match items.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => *slot = entity,
            None => items.push(entity),
        }
        true
    }

    /// [`upsert`](Self::upsert) unless the cache was cleared since `epoch`.
    /// `None` means the entity was discarded.
    pub fn upsert_in(&self, epoch: CacheEpoch, entity: T) -> Option<UpdateOutcome> {
        self.write_in(epoch).map(|mut items| upsert_into(&mut items, entity))
    }

    /// Drop the entry with `id`. Absent ids are a no-op.
    pub fn remove(&self, id: T::Id) -> Option<T> {
        let mut items = self.write();
        let pos = items.iter().position(|e| e.id() == id)?;
        Some(items.remove(pos))
    }

    /// Keep only the entries matching `keep`. Returns how many were dropped.
    pub fn retain<F: FnMut(&T) -> bool>(&self, keep: F) -> usize {
        let mut items = self.write();
        let before = items.len();
        items.retain(keep);
        before - items.len()
    }

    /// [`retain`](Self::retain) unless the cache was cleared since `epoch`.
    pub fn retain_in<F: FnMut(&T) -> bool>(&self, epoch: CacheEpoch, keep: F) -> Option<usize> {
        let mut items = self.write_in(epoch)?;
        let before = items.len();
        items.retain(keep);
        Some(before - items.len())
    }

    pub fn get_all(&self) -> Vec<T> {
        self.read().clone()
    }

    pub fn get_by_id(&self, id: T::Id) -> Option<T> {
        self.read().iter().find(|e| e.id() == id).cloned()
    }

    /// Run `f` over the cached slice without cloning it.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.read())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn upsert_into<T: Entity>(items: &mut Vec<T>, entity: T) -> UpdateOutcome {
    match items.iter_mut().find(|e| e.id() == entity.id()) {
        Some(slot) if is_stale(&entity, slot) => UpdateOutcome::Stale,
        Some(slot) => {
            *slot = entity;
            UpdateOutcome::Applied
        }
        None => {
            items.push(entity);
            UpdateOutcome::Applied
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use taskhub_shared::types::{TaskPriority, TaskStatus};

    use super::*;

    fn task(id: TaskId, title: &str, updated_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: title.into(),
            description: None,
            project_id: 1,
            priority: TaskPriority::Medium,
            status: TaskStatus::New,
            assigned_to: 2,
            deadline: None,
            updated_at,
        }
    }

    #[test]
    fn add_twice_keeps_one_entry_with_latest_fields() {
        let cache = EntityCache::new();
        let now = Utc::now();
        cache.add(task(1, "draft", now));
        cache.add(task(1, "final", now));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_by_id(1).unwrap().title, "final");
    }

    #[test]
    fn delete_then_get_is_absent_until_re_added() {
        let cache = EntityCache::new();
        let now = Utc::now();
        cache.add(task(1, "a", now));
        cache.add(task(2, "b", now));

        assert!(cache.remove(1).is_some());
        assert!(cache.get_by_id(1).is_none());
        assert!(cache.remove(1).is_none());
        assert_eq!(cache.len(), 1);

        cache.add(task(1, "a again", now));
        assert_eq!(cache.get_by_id(1).unwrap().title, "a again");
    }

    #[test]
    fn update_requires_a_cached_entry_and_skips_stale_ones() {
        let cache = EntityCache::new();
        let now = Utc::now();
        assert!(matches!(
            cache.update(task(1, "ghost", now)),
            Err(ClientError::NotFound)
        ));

        cache.add(task(1, "v2", now));
        let older = task(1, "v1", now - Duration::seconds(5));
        assert_eq!(cache.update(older).unwrap(), UpdateOutcome::Stale);
        assert_eq!(cache.get_by_id(1).unwrap().title, "v2");

        let newer = task(1, "v3", now + Duration::seconds(5));
        assert_eq!(cache.update(newer).unwrap(), UpdateOutcome::Applied);
        assert_eq!(cache.get_by_id(1).unwrap().title, "v3");
    }

    #[test]
    fn entities_without_revision_always_apply() {
        let cache = EntityCache::new();
        cache.add(Category { id: 1, title: "Web".into() });
        let outcome = cache.update(Category { id: 1, title: "Mobile".into() }).unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_entries() {
        let cache = EntityCache::new();
        let now = Utc::now();

        let loaded = cache
            .load_with(|| async { Ok(vec![task(1, "a", now), task(2, "b", now)]) })
            .await
            .unwrap();
        assert_eq!(loaded, 2);
        assert!(!cache.is_loading());

        let err = cache
            .load_with(|| async { Err(ClientError::Transport("offline".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn first_failed_load_leaves_cache_empty() {
        let cache: EntityCache<Task> = EntityCache::new();
        let result = cache
            .load_with(|| async { Err(ClientError::Server { status: 500, message: "boom".into() }) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn loading_flag_is_set_during_fetch() {
        let cache: EntityCache<Task> = EntityCache::new();
        cache
            .load_with(|| {
                assert!(cache.is_loading());
                async { Ok(Vec::new()) }
            })
            .await
            .unwrap();
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn overlapping_loads_keep_the_flag_until_the_last_ends() {
        let cache: EntityCache<Task> = EntityCache::new();
        let shared = &cache;
        cache
            .load_with(|| async move {
                shared.load_with(|| async { Ok(Vec::new()) }).await.unwrap();
                assert!(shared.is_loading());
                Ok(Vec::new())
            })
            .await
            .unwrap();
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn load_finishing_after_clear_is_discarded() {
        let cache = EntityCache::new();
        let shared = &cache;
        let now = Utc::now();
        let loaded = cache
            .load_with(|| async move {
                shared.clear();
                Ok(vec![task(1, "previous session", now)])
            })
            .await
            .unwrap();
        assert_eq!(loaded, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn writes_from_a_cleared_epoch_are_refused() {
        let cache = EntityCache::new();
        let now = Utc::now();
        let before = cache.epoch();
        assert!(cache.add_in(before, task(1, "a", now)));

        cache.clear();
        assert!(!cache.add_in(before, task(2, "b", now)));
        assert_eq!(cache.upsert_in(before, task(1, "a2", now)), None);
        assert!(cache.is_empty());

        let current = cache.epoch();
        assert_eq!(cache.upsert_in(current, task(3, "c", now)), Some(UpdateOutcome::Applied));
        assert_eq!(cache.len(), 1);
    }
}
