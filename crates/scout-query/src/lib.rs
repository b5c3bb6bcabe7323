#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Client-side query engine for the Scout API.
//!
//! The engine keeps one cache per resource family (detections, profiles,
//! subreddits), each a keyed store of paginated results. Reads go through
//! [`FeedQuery`]: cursor pagination with one fetch slot per key, cached
//! pages served stale-while-revalidate, and responses that land under a
//! retired generation discarded rather than applied. Writes go through
//! [`QueryEngine`], where every mutation has an explicit cache effect:
//! a targeted cross-query patch when the server returns the authoritative
//! fragment, an invalidation when it does not, and nothing at all when the
//! call failed.
//!
//! Caches are plain values owned by the engine; there is no process-global
//! registry. Construct one engine per backend and clone it freely.

pub mod engine;
pub mod entry;
pub mod error;
pub mod feed;
pub mod key;
pub mod source;
pub mod store;

pub use engine::{AnalysisOutcome, QueryEngine, SubredditSyncReport, SyncFailure, SyncOp};
pub use entry::{Cacheable, Cursor, FeedSnapshot, FetchStatus};
pub use error::{QueryError, QueryResult};
pub use feed::{FeedQuery, FetchOutcome, PageSource};
pub use key::QueryKey;
pub use source::{DetectionSource, ProfileSource, SubredditScope, SubredditSource};
pub use store::{CacheConfig, QueryCache};
