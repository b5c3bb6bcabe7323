//! Cache entry state: cursors, fetch status, and read-side snapshots.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use scout_api_models::{ListedDetection, Profile, SubredditSettings};

/// Items the cache can hold: cloneable rows with a stable identity.
///
/// The id drives the reverse index used for cross-query patch propagation,
/// so it must be the same value the backend uses to identify the row.
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Stable row identity.
    type Id: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    /// The row's identity.
    fn cache_id(&self) -> &Self::Id;
}

impl Cacheable for ListedDetection {
    type Id = i64;

    fn cache_id(&self) -> &i64 {
        &self.detection.id
    }
}

impl Cacheable for Profile {
    type Id = i64;

    fn cache_id(&self) -> &i64 {
        &self.id
    }
}

impl Cacheable for SubredditSettings {
    type Id = String;

    fn cache_id(&self) -> &String {
        &self.subreddit
    }
}

/// Where the next page fetch would resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor<Id> {
    /// Nothing fetched yet; the first request carries no last-seen id.
    Start,
    /// Resume after this item id (the last item of the last page).
    After(Id),
    /// The feed is exhausted; further fetches are no-ops.
    Terminal,
}

impl<Id> Cursor<Id> {
    /// Whether more pages may exist.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

/// Fetch activity recorded on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// No fetch running.
    Idle,
    /// First page (or a restart) in flight.
    Fetching,
    /// A follow-up page in flight.
    FetchingNext,
    /// The most recent fetch failed; cached pages are last-known-good.
    Failed,
}

/// Internal per-key state. Pages are `Arc`-shared with snapshots and only
/// lose sharing when a patch actually rewrites them.
#[derive(Debug)]
pub(crate) struct CacheEntry<T: Cacheable> {
    pub(crate) pages: Vec<Arc<Vec<T>>>,
    pub(crate) status: FetchStatus,
    pub(crate) cursor: Cursor<T::Id>,
    pub(crate) fetched_at: Instant,
    pub(crate) invalidated: bool,
    /// Version stamp; fetches that started under an older stamp are
    /// discarded when they land.
    pub(crate) generation: u64,
    /// Generation that owns the outstanding fetch, when one is in flight.
    pub(crate) flight: Option<u64>,
    pub(crate) last_error: Option<String>,
}

impl<T: Cacheable> CacheEntry<T> {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            pages: Vec::new(),
            status: FetchStatus::Idle,
            cursor: Cursor::Start,
            fetched_at: Instant::now(),
            invalidated: false,
            generation,
            flight: None,
            last_error: None,
        }
    }
}

/// Read-side view of one cached query.
///
/// Cloning pages is cheap (`Arc` per page); the snapshot stays stable even
/// while later patches rewrite the cache.
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    /// Pages in arrival order.
    pub pages: Vec<Arc<Vec<T>>>,
    /// Fetch activity at snapshot time.
    pub status: FetchStatus,
    /// Whether the feed may have more pages.
    pub has_next: bool,
    /// Whether the entry is past its freshness window or was invalidated.
    pub stale: bool,
    /// Message from the most recent failed fetch, if any.
    pub last_error: Option<String>,
}

impl<T> FeedSnapshot<T> {
    /// An empty view for keys that have never been fetched.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            pages: Vec::new(),
            status: FetchStatus::Idle,
            has_next: true,
            stale: true,
            last_error: None,
        }
    }

    /// Items across all pages, in feed order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.iter())
    }

    /// Total item count across pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    /// Whether no items are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|page| page.is_empty())
    }
}

impl<T: Cacheable> FeedSnapshot<T> {
    /// First cached item with the given id.
    #[must_use]
    pub fn find(&self, id: &T::Id) -> Option<&T> {
        self.items().find(|item| item.cache_id() == id)
    }
}
