//! Cursor pagination over cached queries: one fetch slot per key,
//! stale-while-revalidate reads, and generation-checked page landing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use scout_client::ClientResult;

use crate::entry::{Cacheable, Cursor, FeedSnapshot};
use crate::error::QueryResult;
use crate::key::QueryKey;
use crate::store::{Applied, FetchKind, QueryCache, Reservation};

/// A backend listing the paginator can pull pages from.
///
/// Implementations translate `(params, cursor, limit)` into one API call and
/// return the raw page. The paginator owns cursor advancement and
/// termination; sources never see cache state.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Row type the listing returns.
    type Item: Cacheable;
    /// Filter parameters that select one feed out of the family. Their
    /// serialized form becomes part of the cache key, so two params values
    /// that encode identically share an entry.
    type Params: Serialize + Clone + Send + Sync + 'static;

    /// Resource family name, the first component of every cache key.
    const RESOURCE: &'static str;

    /// Whether the backend pages this listing. Sources that return the
    /// whole collection in one response set this to `false`, making every
    /// fetched page terminal regardless of its length.
    const PAGINATES: bool = true;

    /// Fetch one page: items strictly after `cursor` (all from the start
    /// when `None`), at most `limit` of them.
    async fn fetch_page(
        &self,
        params: &Self::Params,
        cursor: Option<<Self::Item as Cacheable>::Id>,
        limit: u32,
    ) -> ClientResult<Vec<Self::Item>>;
}

/// What a page fetch accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page landed; this many items were appended (or replaced the feed,
    /// on a refetch).
    Fetched {
        /// Items in the landed page.
        appended: usize,
    },
    /// Another task already holds this key's fetch slot; nothing was sent.
    AlreadyInFlight,
    /// The cursor is terminal; nothing was sent.
    Exhausted,
    /// The response landed under a retired generation and was dropped.
    Discarded,
}

/// One paginated feed: a source, a cache, and the params selecting the feed.
///
/// Cloneable; clones share the cache entry and the per-key fetch slot, so a
/// clone observing `AlreadyInFlight` is seeing its sibling's fetch.
pub struct FeedQuery<S: PageSource> {
    source: Arc<S>,
    cache: QueryCache<S::Item>,
    params: S::Params,
    key: QueryKey,
}

impl<S: PageSource> Clone for FeedQuery<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            params: self.params.clone(),
            key: self.key.clone(),
        }
    }
}

impl<S: PageSource> FeedQuery<S> {
    /// Bind a source and cache to one set of params.
    ///
    /// # Errors
    ///
    /// Returns [`crate::QueryError::Key`] when the params cannot be encoded
    /// into a cache key.
    pub fn new(source: Arc<S>, cache: QueryCache<S::Item>, params: S::Params) -> QueryResult<Self> {
        let key = cache.key_for(&params)?;
        Ok(Self {
            source,
            cache,
            params,
            key,
        })
    }

    /// Cache key this feed reads and writes.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current cached view; empty (and stale) when never fetched.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot<S::Item> {
        self.cache
            .snapshot(&self.key)
            .unwrap_or_else(FeedSnapshot::empty)
    }

    /// Read the feed's first page, fetching only when the cache cannot
    /// serve.
    ///
    /// Nothing cached: awaits the first page. Cached but stale: returns the
    /// cached view immediately and revalidates in the background. Cached and
    /// fresh: returns the cached view.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when nothing was cached and the first page
    /// fetch failed; cached pages are never torn down by a failure.
    pub async fn first_page(&self) -> QueryResult<FeedSnapshot<S::Item>> {
        let snap = self.snapshot();
        if snap.pages.is_empty() {
            self.drive(FetchKind::Next).await?;
            return Ok(self.snapshot());
        }
        if snap.stale {
            self.spawn_revalidation();
        }
        Ok(snap)
    }

    /// Fetch the page after the current cursor and append it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the slot is released and cached pages stand.
    pub async fn fetch_next_page(&self) -> QueryResult<FetchOutcome> {
        self.drive(FetchKind::Next).await
    }

    /// Drop the cursor and refetch from the start, replacing cached pages
    /// when the response lands current.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the slot is released and cached pages stand.
    pub async fn refetch(&self) -> QueryResult<FetchOutcome> {
        self.drive(FetchKind::Restart).await
    }

    /// Kick a background refetch; failures are logged, not surfaced.
    pub fn spawn_revalidation(&self) {
        let feed = self.clone();
        tokio::spawn(async move {
            match feed.drive(FetchKind::Restart).await {
                Ok(outcome) => {
                    tracing::debug!(key = %feed.key, ?outcome, "feed revalidated");
                }
                Err(error) => {
                    tracing::warn!(key = %feed.key, %error, "feed revalidation failed");
                }
            }
        });
    }

    async fn drive(&self, kind: FetchKind) -> QueryResult<FetchOutcome> {
        // The slot is claimed synchronously, before the first await: by the
        // time anything suspends, concurrent callers already see Busy.
        let (generation, cursor) = match self.cache.reserve(&self.key, kind) {
            Reservation::Started { generation, cursor } => (generation, cursor),
            Reservation::Busy => return Ok(FetchOutcome::AlreadyInFlight),
            Reservation::Exhausted => return Ok(FetchOutcome::Exhausted),
        };

        let limit = self.cache.page_size();
        match self.source.fetch_page(&self.params, cursor, limit).await {
            Ok(page) => {
                let next_cursor = if S::PAGINATES && page.len() >= limit as usize {
                    page.last().map_or(Cursor::Terminal, |item| {
                        Cursor::After(item.cache_id().clone())
                    })
                } else {
                    Cursor::Terminal
                };
                let appended = page.len();
                match self.cache.apply_page(&self.key, generation, kind, page, next_cursor) {
                    Applied::Stored => Ok(FetchOutcome::Fetched { appended }),
                    Applied::Discarded => Ok(FetchOutcome::Discarded),
                }
            }
            Err(error) => {
                self.cache
                    .fail_fetch(&self.key, generation, error.to_string());
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use scout_client::ClientError;
    use tokio::sync::Notify;
    use tokio::task::yield_now;

    use super::*;
    use crate::store::CacheConfig;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: i64,
        label: String,
    }

    impl Cacheable for Row {
        type Id = i64;

        fn cache_id(&self) -> &i64 {
            &self.id
        }
    }

    fn rows(ids: std::ops::RangeInclusive<i64>) -> Vec<Row> {
        ids.map(|id| Row {
            id,
            label: format!("row-{id}"),
        })
        .collect()
    }

    struct ScriptedSource {
        responses: Mutex<VecDeque<ClientResult<Vec<Row>>>>,
        cursors: Mutex<Vec<Option<i64>>>,
        gate: Option<Arc<Notify>>,
        completed: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<ClientResult<Vec<Row>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                cursors: Mutex::new(Vec::new()),
                gate: None,
                completed: AtomicUsize::new(0),
            })
        }

        fn gated(responses: Vec<ClientResult<Vec<Row>>>) -> (Arc<Self>, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            let source = Arc::new(Self {
                responses: Mutex::new(responses.into()),
                cursors: Mutex::new(Vec::new()),
                gate: Some(Arc::clone(&gate)),
                completed: AtomicUsize::new(0),
            });
            (source, gate)
        }

        fn push(&self, response: ClientResult<Vec<Row>>) {
            self.responses
                .lock()
                .expect("script mutex poisoned")
                .push_back(response);
        }

        fn cursors(&self) -> Vec<Option<i64>> {
            self.cursors.lock().expect("cursor log mutex poisoned").clone()
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        type Item = Row;
        type Params = String;

        const RESOURCE: &'static str = "rows";

        async fn fetch_page(
            &self,
            _params: &String,
            cursor: Option<i64>,
            _limit: u32,
        ) -> ClientResult<Vec<Row>> {
            self.cursors
                .lock()
                .expect("cursor log mutex poisoned")
                .push(cursor);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("script mutex poisoned")
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            stale_time: Duration::from_secs(300),
            page_size: 10,
        }
    }

    fn feed(source: Arc<ScriptedSource>, config: CacheConfig) -> FeedQuery<ScriptedSource> {
        let cache = QueryCache::new(ScriptedSource::RESOURCE, config);
        FeedQuery::new(source, cache, "all".to_string()).unwrap()
    }

    #[tokio::test]
    async fn cursor_follows_the_last_item_of_each_full_page() {
        let source = ScriptedSource::new(vec![Ok(rows(101..=110)), Ok(rows(111..=114))]);
        let feed = feed(Arc::clone(&source), config());

        let snap = feed.first_page().await.unwrap();
        assert_eq!(snap.len(), 10);
        assert!(snap.has_next);

        let outcome = feed.fetch_next_page().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched { appended: 4 });
        assert_eq!(source.cursors(), vec![None, Some(110)]);

        // A short page terminates the feed; further calls never hit the
        // source.
        let snap = feed.snapshot();
        assert!(!snap.has_next);
        assert_eq!(snap.len(), 14);
        assert_eq!(feed.fetch_next_page().await.unwrap(), FetchOutcome::Exhausted);
        assert_eq!(source.cursors().len(), 2);
    }

    #[tokio::test]
    async fn items_stay_in_arrival_order_across_pages() {
        let source = ScriptedSource::new(vec![Ok(rows(1..=10)), Ok(rows(11..=13))]);
        let feed = feed(Arc::clone(&source), config());

        feed.first_page().await.unwrap();
        feed.fetch_next_page().await.unwrap();

        let snap = feed.snapshot();
        let ids: Vec<i64> = snap.items().map(|row| row.id).collect();
        assert_eq!(ids, (1..=13).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn empty_first_page_is_a_terminal_empty_feed() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let feed = feed(Arc::clone(&source), config());

        let snap = feed.first_page().await.unwrap();
        assert!(snap.is_empty());
        assert!(!snap.has_next);

        // The empty result is cached; neither read below fetches again.
        assert_eq!(feed.fetch_next_page().await.unwrap(), FetchOutcome::Exhausted);
        feed.first_page().await.unwrap();
        assert_eq!(source.cursors().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_fetches_collapse_into_one_request() {
        let (source, gate) = ScriptedSource::gated(vec![Ok(rows(1..=10))]);
        let feed = feed(Arc::clone(&source), config());

        let sibling = feed.clone();
        let fetcher = tokio::spawn(async move { sibling.first_page().await });

        // Wait until the fetch is parked inside the source.
        while source.cursors().is_empty() {
            yield_now().await;
        }

        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            FetchOutcome::AlreadyInFlight
        );

        gate.notify_one();
        let snap = fetcher.await.unwrap().unwrap();
        assert_eq!(snap.len(), 10);
        assert_eq!(source.cursors().len(), 1);
    }

    #[tokio::test]
    async fn stale_reads_serve_cached_data_and_revalidate_in_background() {
        let source = ScriptedSource::new(vec![Ok(rows(1..=3)), Ok(rows(4..=6))]);
        let feed = feed(
            Arc::clone(&source),
            CacheConfig {
                stale_time: Duration::ZERO,
                page_size: 10,
            },
        );

        feed.first_page().await.unwrap();

        // Everything is instantly stale; the read returns the cached rows.
        let snap = feed.first_page().await.unwrap();
        let ids: Vec<i64> = snap.items().map(|row| row.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // The background revalidation replaces the feed.
        while source.completed() < 2 {
            yield_now().await;
        }
        yield_now().await;
        let ids: Vec<i64> = feed.snapshot().items().map(|row| row.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn refetch_replaces_pages_and_clears_the_old_index() {
        let source = ScriptedSource::new(vec![
            Ok(rows(1..=10)),
            Ok(rows(11..=12)),
            Ok(rows(21..=22)),
        ]);
        let cache = QueryCache::new(ScriptedSource::RESOURCE, config());
        let feed = FeedQuery::new(Arc::clone(&source), cache.clone(), "all".to_string()).unwrap();

        feed.first_page().await.unwrap();
        feed.fetch_next_page().await.unwrap();
        assert_eq!(feed.snapshot().len(), 12);

        let outcome = feed.refetch().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched { appended: 2 });
        assert_eq!(source.cursors(), vec![None, Some(10), None]);

        let snap = feed.snapshot();
        let ids: Vec<i64> = snap.items().map(|row| row.id).collect();
        assert_eq!(ids, vec![21, 22]);
        // Replaced rows fell out of the patch index.
        assert_eq!(cache.patch_item(&1, |row| row.label = "x".into()), 0);
        assert_eq!(cache.patch_item(&21, |row| row.label = "x".into()), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_last_known_good_pages() {
        let source = ScriptedSource::new(vec![
            Ok(rows(1..=10)),
            Err(ClientError::Config {
                message: "wire broke".into(),
            }),
        ]);
        let feed = feed(Arc::clone(&source), config());

        feed.first_page().await.unwrap();
        let error = feed.fetch_next_page().await.unwrap_err();
        assert!(error.to_string().contains("wire broke"));

        let snap = feed.snapshot();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap.status, crate::FetchStatus::Failed);
        assert!(snap.last_error.is_some());

        // The slot was released; the next attempt goes through.
        source.push(Ok(rows(11..=13)));
        assert_eq!(
            feed.fetch_next_page().await.unwrap(),
            FetchOutcome::Fetched { appended: 3 }
        );
        assert_eq!(feed.snapshot().len(), 13);
    }

    #[tokio::test]
    async fn responses_landing_after_invalidation_are_discarded() {
        let (source, gate) = ScriptedSource::gated(vec![Ok(rows(1..=10))]);
        let cache = QueryCache::new(ScriptedSource::RESOURCE, config());
        let feed = FeedQuery::new(Arc::clone(&source), cache.clone(), "all".to_string()).unwrap();

        let sibling = feed.clone();
        let fetcher = tokio::spawn(async move { sibling.fetch_next_page().await });
        while source.cursors().is_empty() {
            yield_now().await;
        }

        cache.invalidate_all();
        gate.notify_one();

        assert_eq!(fetcher.await.unwrap().unwrap(), FetchOutcome::Discarded);
        let snap = feed.snapshot();
        assert!(snap.is_empty());
        assert!(snap.stale);
    }

    #[tokio::test]
    async fn different_params_keep_independent_pages_and_cursors() {
        let source = ScriptedSource::new(vec![Ok(rows(1..=10)), Ok(rows(51..=53))]);
        let cache = QueryCache::new(ScriptedSource::RESOURCE, config());
        let all = FeedQuery::new(Arc::clone(&source), cache.clone(), "all".to_string()).unwrap();
        let relevant =
            FeedQuery::new(Arc::clone(&source), cache.clone(), "relevant".to_string()).unwrap();

        all.first_page().await.unwrap();
        relevant.first_page().await.unwrap();

        assert_eq!(all.snapshot().len(), 10);
        assert!(all.snapshot().has_next);
        assert_eq!(relevant.snapshot().len(), 3);
        assert!(!relevant.snapshot().has_next);
        assert_ne!(all.key(), relevant.key());
    }

    #[tokio::test]
    async fn non_paginating_sources_are_terminal_after_one_full_page() {
        struct WholeListing;

        #[async_trait]
        impl PageSource for WholeListing {
            type Item = Row;
            type Params = String;

            const RESOURCE: &'static str = "listing";
            const PAGINATES: bool = false;

            async fn fetch_page(
                &self,
                _params: &String,
                _cursor: Option<i64>,
                _limit: u32,
            ) -> ClientResult<Vec<Row>> {
                Ok(rows(1..=10))
            }
        }

        let cache = QueryCache::new(WholeListing::RESOURCE, config());
        let feed = FeedQuery::new(Arc::new(WholeListing), cache, "all".to_string()).unwrap();

        // Ten rows is exactly one page width, but the listing does not
        // paginate, so the feed must not dangle a cursor.
        let snap = feed.first_page().await.unwrap();
        assert_eq!(snap.len(), 10);
        assert!(!snap.has_next);
        assert_eq!(feed.fetch_next_page().await.unwrap(), FetchOutcome::Exhausted);
    }
}
