//! The query engine: one shared client, one cache per resource family, and
//! the write operations that keep those caches truthful.
//!
//! Every mutation states its cache effect explicitly: a targeted patch when
//! the server returns the authoritative row fragment, an invalidation when
//! it does not. Nothing here mutates a cache on the strength of a request
//! that has not succeeded.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;

use scout_api_models::{
    AnalyzeRequest, CreatedProfile, Detection, DetectionFilter, DetectionTags, DetectionTagsUpdate,
    JumpstartRequest, ListedDetection, Profile, ProfileUpdate, Reaction, SubredditSettings,
    TagUpdate,
};
use scout_client::ScoutClient;

use crate::error::{QueryError, QueryResult};
use crate::feed::{FeedQuery, PageSource};
use crate::key::QueryKey;
use crate::source::{DetectionSource, ProfileSource, SubredditScope, SubredditSource};
use crate::store::{CacheConfig, QueryCache};

/// Which direction a subreddit membership change went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    /// The profile was being attached.
    Add,
    /// The profile was being detached.
    Remove,
}

/// One membership change that failed during a combined profile update.
#[derive(Debug, Clone)]
pub struct SyncFailure {
    /// Subreddit the change targeted.
    pub subreddit: String,
    /// Direction of the change.
    pub op: SyncOp,
    /// Failure message from the underlying call.
    pub message: String,
}

/// What a combined profile update did to subreddit memberships.
#[derive(Debug, Clone, Default)]
pub struct SubredditSyncReport {
    /// Subreddits the profile was attached to.
    pub added: usize,
    /// Subreddits the profile was detached from.
    pub removed: usize,
    /// Changes that failed; the successful ones above still stand.
    pub failed: Vec<SyncFailure>,
}

impl SubredditSyncReport {
    /// Whether every membership change went through.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of one post's detached analysis.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Source-native id of the analyzed post.
    pub source_id: String,
    /// The detection produced, or this post's failure. One post failing
    /// never disturbs its batch siblings.
    pub result: QueryResult<Detection>,
}

/// Shared client plus one cache per resource family.
///
/// Cheap to clone; clones share the caches, so a patch or invalidation
/// issued through one clone is observed by all of them.
#[derive(Clone)]
pub struct QueryEngine {
    client: Arc<ScoutClient>,
    detections: QueryCache<ListedDetection>,
    profiles: QueryCache<Profile>,
    subreddits: QueryCache<SubredditSettings>,
}

impl QueryEngine {
    /// Build an engine over a client with the given cache tuning.
    #[must_use]
    pub fn new(client: ScoutClient, config: CacheConfig) -> Self {
        Self {
            client: Arc::new(client),
            detections: QueryCache::new(DetectionSource::RESOURCE, config),
            profiles: QueryCache::new(ProfileSource::RESOURCE, config),
            subreddits: QueryCache::new(SubredditSource::RESOURCE, config),
        }
    }

    /// The underlying API client.
    #[must_use]
    pub fn client(&self) -> &ScoutClient {
        &self.client
    }

    /// Detection cache, for snapshots and targeted patches.
    #[must_use]
    pub const fn detections(&self) -> &QueryCache<ListedDetection> {
        &self.detections
    }

    /// Profile cache.
    #[must_use]
    pub const fn profiles(&self) -> &QueryCache<Profile> {
        &self.profiles
    }

    /// Subreddit cache.
    #[must_use]
    pub const fn subreddits(&self) -> &QueryCache<SubredditSettings> {
        &self.subreddits
    }

    /// A paginated detection feed for one filter.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] when the filter cannot be encoded.
    pub fn detections_feed(
        &self,
        filter: DetectionFilter,
    ) -> QueryResult<FeedQuery<DetectionSource>> {
        FeedQuery::new(
            Arc::new(DetectionSource::new(Arc::clone(&self.client))),
            self.detections.clone(),
            filter,
        )
    }

    /// The profile listing feed.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] when the (empty) params cannot be encoded.
    pub fn profiles_feed(&self) -> QueryResult<FeedQuery<ProfileSource>> {
        FeedQuery::new(
            Arc::new(ProfileSource::new(Arc::clone(&self.client))),
            self.profiles.clone(),
            (),
        )
    }

    /// A subreddit listing feed for one scope.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Key`] when the scope cannot be encoded.
    pub fn subreddits_feed(
        &self,
        scope: SubredditScope,
    ) -> QueryResult<FeedQuery<SubredditSource>> {
        FeedQuery::new(
            Arc::new(SubredditSource::new(Arc::clone(&self.client))),
            self.subreddits.clone(),
            scope,
        )
    }

    /// Read one profile, serving from a fresh cached listing when possible.
    ///
    /// Rows fetched from the API are seeded back under an entity key so
    /// repeated reads stay local until the cache goes stale.
    ///
    /// # Errors
    ///
    /// Propagates the fetch failure when the cache cannot serve.
    pub async fn profile(&self, profile_id: i64) -> QueryResult<Profile> {
        let listing_key = self.profiles.key_for(&())?;
        if let Some(profile) = self.fresh_profile(&listing_key, profile_id) {
            return Ok(profile);
        }
        let entity_key = self.profiles.key_for(&profile_id)?;
        if let Some(profile) = self.fresh_profile(&entity_key, profile_id) {
            return Ok(profile);
        }
        let profile = self.client.get_profile(profile_id).await?;
        self.profiles.seed(&entity_key, vec![profile.clone()]);
        Ok(profile)
    }

    /// Record (or clear) relevancy feedback on a detection, then patch every
    /// cached occurrence with the tags the server actually stored.
    ///
    /// The patch is synchronous and strictly in place: no feed moves, no
    /// entry is refetched, and a detection cached nowhere is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn update_detection_tags(
        &self,
        detection_id: i64,
        reaction: Reaction,
    ) -> QueryResult<DetectionTags> {
        let update = DetectionTagsUpdate {
            detection_id,
            tags: TagUpdate::from(reaction),
        };
        let stored = self.client.update_detection_tags(&update).await?;
        let tags = if stored.is_empty() { None } else { Some(stored) };
        let patched = self
            .detections
            .patch_item(&detection_id, |listed| listed.tags = tags);
        tracing::debug!(detection_id, patched, "detection feedback stored");
        Ok(stored)
    }

    /// Create a profile; the listing is refetched on next read.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn create_profile(&self, profile: &Profile) -> QueryResult<CreatedProfile> {
        let created = self.client.create_profile(profile).await?;
        self.profiles.invalidate_all();
        Ok(created)
    }

    /// Update a profile; cached profile rows are stale afterwards.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn update_profile(&self, profile_id: i64, update: &ProfileUpdate) -> QueryResult<()> {
        self.client.update_profile(profile_id, update).await?;
        self.profiles.invalidate_all();
        Ok(())
    }

    /// Delete a profile. The profile's own entity entry is evicted outright;
    /// profile rows, subreddit attachments, and the profile's detections all
    /// refer to it, so all three families are invalidated.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn delete_profile(&self, profile_id: i64) -> QueryResult<()> {
        let entity_key = self.profiles.key_for(&profile_id)?;
        self.client.delete_profile(profile_id).await?;
        self.profiles.remove(&entity_key);
        self.profiles.invalidate_all();
        self.subreddits.invalidate_all();
        self.detections.invalidate_all();
        tracing::info!(profile_id, "profile deleted");
        Ok(())
    }

    /// Kick off historical analysis for a profile; new detections will
    /// appear, so detection feeds are stale afterwards.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn jumpstart_profile(
        &self,
        profile_id: i64,
        request: &JumpstartRequest,
    ) -> QueryResult<()> {
        self.client.jumpstart_profile(profile_id, request).await?;
        self.detections.invalidate_all();
        Ok(())
    }

    /// Attach profiles to a subreddit.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn add_profiles_to_subreddit(
        &self,
        subreddit: &str,
        profile_ids: &[i64],
    ) -> QueryResult<()> {
        self.client
            .add_profiles_to_subreddit(subreddit, profile_ids)
            .await?;
        self.subreddits.invalidate_all();
        Ok(())
    }

    /// Detach profiles from a subreddit.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; no cache is touched on failure.
    pub async fn remove_profiles_from_subreddit(
        &self,
        subreddit: &str,
        profile_ids: &[i64],
    ) -> QueryResult<()> {
        self.client
            .remove_profiles_from_subreddit(subreddit, profile_ids)
            .await?;
        self.subreddits.invalidate_all();
        Ok(())
    }

    /// Update a profile and reconcile its subreddit memberships against a
    /// desired set, in one operation.
    ///
    /// The update lands first; only then are current memberships listed,
    /// diffed against `desired_subreddits`, and the additions and removals
    /// issued concurrently. Individual membership failures do not abort the
    /// rest; they come back in the report, and the affected caches are
    /// invalidated either way so the next read shows the server's truth.
    ///
    /// # Errors
    ///
    /// Returns the profile update failure (nothing changed, nothing
    /// invalidated), or the membership listing failure (the update stuck,
    /// so profile and subreddit caches are already invalidated).
    pub async fn combined_update_profile(
        &self,
        profile_id: i64,
        update: &ProfileUpdate,
        desired_subreddits: &BTreeSet<String>,
    ) -> QueryResult<SubredditSyncReport> {
        self.client.update_profile(profile_id, update).await?;
        self.profiles.invalidate_all();

        let current = match self.client.subreddits_with_profile(profile_id).await {
            Ok(rows) => rows
                .into_iter()
                .map(|row| row.subreddit)
                .collect::<BTreeSet<String>>(),
            Err(error) => {
                // Memberships are unknown; force both views to refetch.
                self.subreddits.invalidate_all();
                return Err(error.into());
            }
        };

        let to_add: Vec<&String> = desired_subreddits.difference(&current).collect();
        let to_remove: Vec<&String> = current.difference(desired_subreddits).collect();
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(SubredditSyncReport::default());
        }

        let ids = [profile_id];
        let additions = to_add.iter().map(|subreddit| async move {
            self.client
                .add_profiles_to_subreddit(subreddit, &ids)
                .await
                .map_err(|error| SyncFailure {
                    subreddit: (*subreddit).clone(),
                    op: SyncOp::Add,
                    message: error.to_string(),
                })
        });
        let removals = to_remove.iter().map(|subreddit| async move {
            self.client
                .remove_profiles_from_subreddit(subreddit, &ids)
                .await
                .map_err(|error| SyncFailure {
                    subreddit: (*subreddit).clone(),
                    op: SyncOp::Remove,
                    message: error.to_string(),
                })
        });
        let (add_results, remove_results) = tokio::join!(join_all(additions), join_all(removals));

        let mut report = SubredditSyncReport::default();
        for result in add_results {
            match result {
                Ok(()) => report.added += 1,
                Err(failure) => report.failed.push(failure),
            }
        }
        for result in remove_results {
            match result {
                Ok(()) => report.removed += 1,
                Err(failure) => report.failed.push(failure),
            }
        }

        self.subreddits.invalidate_all();
        tracing::info!(
            profile_id,
            added = report.added,
            removed = report.removed,
            failed = report.failed.len(),
            "combined profile update finished"
        );
        Ok(report)
    }

    /// Run a detached analysis of one post against ad-hoc settings. No
    /// cache effect: the result is a dry run, not a stored detection row
    /// in any feed.
    ///
    /// # Errors
    ///
    /// Propagates the API failure.
    pub async fn analyze_post(&self, request: &AnalyzeRequest) -> QueryResult<Detection> {
        Ok(self.client.analyze_post(request).await?)
    }

    /// Analyze a batch of posts concurrently. Each post is independent;
    /// outcomes come back in the order the requests were given.
    pub async fn analyze_posts(&self, requests: Vec<AnalyzeRequest>) -> Vec<AnalysisOutcome> {
        let tasks = requests.into_iter().map(|request| async move {
            let source_id = request.source_id.clone();
            let result = self
                .client
                .analyze_post(&request)
                .await
                .map_err(QueryError::from);
            AnalysisOutcome { source_id, result }
        });
        join_all(tasks).await
    }

    fn fresh_profile(&self, key: &QueryKey, profile_id: i64) -> Option<Profile> {
        self.profiles
            .snapshot(key)
            .filter(|snap| !snap.stale)
            .and_then(|snap| snap.find(&profile_id).cloned())
    }
}
