//! Keyed query store: staleness, invalidation, generation stamps, and
//! targeted cross-query patching.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::entry::{CacheEntry, Cacheable, Cursor, FeedSnapshot, FetchStatus};
use crate::error::QueryResult;
use crate::key::QueryKey;

/// Freshness window after which entries are served stale and revalidated.
const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Page size requested from the backend when the caller does not override it.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Tuning knobs shared by every cache instance an engine creates.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Entries older than this are stale (served immediately, revalidated in
    /// the background).
    pub stale_time: Duration,
    /// Items requested per page; a shorter page terminates pagination.
    pub page_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What a fetch reservation is allowed to do once granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchKind {
    /// Append the next page (or the first, when nothing is cached).
    Next,
    /// Restart from page one under a fresh generation, replacing pages.
    Restart,
}

/// Outcome of trying to claim the per-key fetch slot.
#[derive(Debug)]
pub(crate) enum Reservation<Id> {
    /// Slot claimed; fetch with this cursor and report under this generation.
    Started {
        generation: u64,
        cursor: Option<Id>,
    },
    /// Another fetch already holds the slot.
    Busy,
    /// The cursor is terminal; nothing left to fetch.
    Exhausted,
}

/// Whether a landed page was stored or thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Stored,
    Discarded,
}

struct StoreInner<T: Cacheable> {
    entries: HashMap<QueryKey, CacheEntry<T>>,
    /// Reverse index: item id to every key whose pages contain it. Keeps
    /// patch propagation proportional to affected entries instead of a
    /// full scan.
    index: HashMap<T::Id, HashSet<QueryKey>>,
    next_generation: u64,
}

/// One resource family's cache: a keyed store of paginated results.
///
/// Cheap to clone and share; the interior mutex is only held for synchronous
/// bookkeeping, never across an await. Lock poisoning panics, as it would
/// mean a bookkeeping step itself panicked.
#[derive(Clone)]
pub struct QueryCache<T: Cacheable> {
    resource: &'static str,
    config: CacheConfig,
    inner: Arc<Mutex<StoreInner<T>>>,
}

impl<T: Cacheable> QueryCache<T> {
    /// An empty cache for one resource family.
    #[must_use]
    pub fn new(resource: &'static str, config: CacheConfig) -> Self {
        Self {
            resource,
            config,
            inner: Arc::new(Mutex::new(StoreInner {
                entries: HashMap::new(),
                index: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    /// Resource family this cache serves.
    #[must_use]
    pub const fn resource(&self) -> &'static str {
        self.resource
    }

    /// Page size fetches should request.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.config.page_size
    }

    /// Derive the cache key for a filter under this cache's resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::QueryError::Key`] when the params cannot be encoded.
    pub fn key_for<P: Serialize>(&self, params: &P) -> QueryResult<QueryKey> {
        QueryKey::new(self.resource, params)
    }

    /// Current view of one key, if it was ever fetched or seeded.
    #[must_use]
    pub fn snapshot(&self, key: &QueryKey) -> Option<FeedSnapshot<T>> {
        let inner = self.locked();
        inner.entries.get(key).map(|entry| FeedSnapshot {
            pages: entry.pages.clone(),
            status: entry.status,
            has_next: entry.cursor.has_next(),
            stale: entry.invalidated || entry.fetched_at.elapsed() >= self.config.stale_time,
            last_error: entry.last_error.clone(),
        })
    }

    /// Rewrite every cached occurrence of one item, across all entries and
    /// pages (duplicates included), strictly in place. Returns how many
    /// entries were touched; a miss is a no-op, not an error. Completes
    /// synchronously and never talks to the network.
    pub fn patch_item<F: FnMut(&mut T)>(&self, id: &T::Id, mut transform: F) -> usize {
        let mut inner = self.locked();
        let Some(keys) = inner.index.get(id).cloned() else {
            return 0;
        };

        let mut touched = 0;
        for key in &keys {
            let Some(entry) = inner.entries.get_mut(key) else {
                continue;
            };
            let mut entry_touched = false;
            for page in &mut entry.pages {
                if page.iter().any(|item| item.cache_id() == id) {
                    // Copy-on-write: only a page that really holds the item
                    // loses sharing with outstanding snapshots.
                    for item in Arc::make_mut(page)
                        .iter_mut()
                        .filter(|item| item.cache_id() == id)
                    {
                        transform(item);
                        entry_touched = true;
                    }
                }
            }
            if entry_touched {
                touched += 1;
            }
        }
        tracing::trace!(resource = self.resource, id = ?id, entries = touched, "patched item");
        touched
    }

    /// Mark every entry stale and retire their generations so in-flight
    /// responses land dead. Returns the number of entries affected.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    /// Mark entries whose key matches the predicate stale, retiring their
    /// generations. Returns the number of entries affected.
    pub fn invalidate_where<P: Fn(&QueryKey) -> bool>(&self, predicate: P) -> usize {
        let mut inner = self.locked();
        let StoreInner {
            entries,
            next_generation,
            ..
        } = &mut *inner;
        let mut affected = 0;
        for (key, entry) in entries.iter_mut() {
            if predicate(key) {
                entry.invalidated = true;
                *next_generation += 1;
                entry.generation = *next_generation;
                affected += 1;
            }
        }
        if affected > 0 {
            tracing::debug!(resource = self.resource, affected, "invalidated entries");
        }
        affected
    }

    /// Drop one entry (and its index records) entirely. In-flight fetches
    /// for the key land dead. Returns whether an entry existed.
    pub fn remove(&self, key: &QueryKey) -> bool {
        let mut inner = self.locked();
        let Some(entry) = inner.entries.remove(key) else {
            return false;
        };
        for page in &entry.pages {
            for item in page.iter() {
                unindex(&mut inner.index, item.cache_id(), key);
            }
        }
        true
    }

    /// Replace (or create) an entry with a single terminal page of known
    /// data, bypassing the fetch path. Used for entity reads where the
    /// caller already holds the authoritative value.
    pub fn seed(&self, key: &QueryKey, items: Vec<T>) {
        let mut inner = self.locked();
        let inner = &mut *inner;
        if let Some(old) = inner.entries.remove(key) {
            for page in &old.pages {
                for item in page.iter() {
                    unindex(&mut inner.index, item.cache_id(), key);
                }
            }
        }
        inner.next_generation += 1;
        let mut entry = CacheEntry::new(inner.next_generation);
        for item in &items {
            inner
                .index
                .entry(item.cache_id().clone())
                .or_default()
                .insert(key.clone());
        }
        entry.pages = vec![Arc::new(items)];
        entry.cursor = Cursor::Terminal;
        inner.entries.insert(key.clone(), entry);
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locked().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locked().entries.is_empty()
    }

    /// Claim the per-key fetch slot. Runs entirely under the lock: by the
    /// time this returns `Started`, concurrent callers already see the slot
    /// as busy, so the flag is set before any suspension point.
    pub(crate) fn reserve(&self, key: &QueryKey, kind: FetchKind) -> Reservation<T::Id> {
        let mut inner = self.locked();
        let StoreInner {
            entries,
            next_generation,
            ..
        } = &mut *inner;
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            *next_generation += 1;
            CacheEntry::new(*next_generation)
        });

        if entry.flight.is_some() {
            return Reservation::Busy;
        }

        match kind {
            FetchKind::Next => {
                let cursor = match &entry.cursor {
                    Cursor::Terminal => return Reservation::Exhausted,
                    Cursor::Start => None,
                    Cursor::After(id) => Some(id.clone()),
                };
                entry.status = if entry.pages.is_empty() {
                    FetchStatus::Fetching
                } else {
                    FetchStatus::FetchingNext
                };
                entry.flight = Some(entry.generation);
                Reservation::Started {
                    generation: entry.generation,
                    cursor,
                }
            }
            FetchKind::Restart => {
                *next_generation += 1;
                entry.generation = *next_generation;
                entry.status = FetchStatus::Fetching;
                entry.flight = Some(entry.generation);
                Reservation::Started {
                    generation: entry.generation,
                    cursor: None,
                }
            }
        }
    }

    /// Land a fetched page. Pages are appended (or replace everything, for
    /// restarts) only when the reservation's generation still matches;
    /// otherwise the response is discarded and last-known-good data stands.
    /// The caller decides the next cursor; pagination policy lives with the
    /// paginator, not the store.
    pub(crate) fn apply_page(
        &self,
        key: &QueryKey,
        generation: u64,
        kind: FetchKind,
        page: Vec<T>,
        next_cursor: Cursor<T::Id>,
    ) -> Applied {
        let mut inner = self.locked();
        let StoreInner { entries, index, .. } = &mut *inner;
        let Some(entry) = entries.get_mut(key) else {
            return Applied::Discarded;
        };

        if entry.flight == Some(generation) {
            entry.flight = None;
        }
        if entry.generation != generation {
            // A stale response; only tidy the status when no newer fetch
            // owns the slot.
            if entry.flight.is_none()
                && matches!(entry.status, FetchStatus::Fetching | FetchStatus::FetchingNext)
            {
                entry.status = FetchStatus::Idle;
            }
            return Applied::Discarded;
        }

        if kind == FetchKind::Restart {
            for old_page in &entry.pages {
                for item in old_page.iter() {
                    unindex(index, item.cache_id(), key);
                }
            }
            entry.pages.clear();
        }

        entry.cursor = next_cursor;
        for item in &page {
            index
                .entry(item.cache_id().clone())
                .or_default()
                .insert(key.clone());
        }
        entry.pages.push(Arc::new(page));
        entry.status = FetchStatus::Idle;
        entry.invalidated = false;
        entry.fetched_at = Instant::now();
        entry.last_error = None;
        Applied::Stored
    }

    /// Record a failed fetch: the slot is released, the error is kept for
    /// snapshots, and cached pages stay as they were.
    pub(crate) fn fail_fetch(&self, key: &QueryKey, generation: u64, message: String) {
        let mut inner = self.locked();
        let Some(entry) = inner.entries.get_mut(key) else {
            return;
        };
        if entry.flight == Some(generation) {
            entry.flight = None;
        }
        if entry.generation == generation {
            entry.status = FetchStatus::Failed;
            entry.last_error = Some(message);
        } else if entry.flight.is_none()
            && matches!(entry.status, FetchStatus::Fetching | FetchStatus::FetchingNext)
        {
            entry.status = FetchStatus::Idle;
        }
    }

    /// Force the next read of every entry to observe staleness without
    /// retiring generations. Test-only time travel.
    #[cfg(test)]
    pub(crate) fn age_all_entries(&self, by: Duration) {
        let mut inner = self.locked();
        for entry in inner.entries.values_mut() {
            if let Some(past) = entry.fetched_at.checked_sub(by) {
                entry.fetched_at = past;
            }
        }
    }

    fn locked(&self) -> MutexGuard<'_, StoreInner<T>> {
        self.inner.lock().expect("query cache mutex poisoned")
    }
}

fn unindex<Id: Eq + Hash>(index: &mut HashMap<Id, HashSet<QueryKey>>, id: &Id, key: &QueryKey) {
    if let Some(keys) = index.get_mut(id) {
        keys.remove(key);
        if keys.is_empty() {
            index.remove(id);
        }
    }
}
