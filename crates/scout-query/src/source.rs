//! Client-backed page sources for the cached resource families.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use scout_api_models::{DetectionFilter, DetectionQuery, ListedDetection, Profile, SubredditSettings};
use scout_client::{ClientResult, ScoutClient};

use crate::feed::PageSource;

/// Detection feed pages, filtered server-side.
#[derive(Clone)]
pub struct DetectionSource {
    client: Arc<ScoutClient>,
}

impl DetectionSource {
    /// Bind a client.
    #[must_use]
    pub fn new(client: Arc<ScoutClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for DetectionSource {
    type Item = ListedDetection;
    type Params = DetectionFilter;

    const RESOURCE: &'static str = "detections";

    async fn fetch_page(
        &self,
        params: &DetectionFilter,
        cursor: Option<i64>,
        limit: u32,
    ) -> ClientResult<Vec<ListedDetection>> {
        let query = DetectionQuery {
            last_seen_id: cursor,
            limit: Some(i64::from(limit)),
            filter: Some(params.clone()),
        };
        self.client.list_detections(&query).await
    }
}

/// The profile listing; the server returns the whole collection at once.
#[derive(Clone)]
pub struct ProfileSource {
    client: Arc<ScoutClient>,
}

impl ProfileSource {
    /// Bind a client.
    #[must_use]
    pub fn new(client: Arc<ScoutClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for ProfileSource {
    type Item = Profile;
    type Params = ();

    const RESOURCE: &'static str = "profiles";
    const PAGINATES: bool = false;

    async fn fetch_page(
        &self,
        _params: &(),
        _cursor: Option<i64>,
        _limit: u32,
    ) -> ClientResult<Vec<Profile>> {
        self.client.list_profiles().await
    }
}

/// Which slice of the subreddit collection a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubredditScope {
    /// Every subreddit the backend knows about.
    All,
    /// Only subreddits the given profile is attached to.
    WithProfile(i64),
}

/// Subreddit listings, whole-collection per scope.
#[derive(Clone)]
pub struct SubredditSource {
    client: Arc<ScoutClient>,
}

impl SubredditSource {
    /// Bind a client.
    #[must_use]
    pub fn new(client: Arc<ScoutClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for SubredditSource {
    type Item = SubredditSettings;
    type Params = SubredditScope;

    const RESOURCE: &'static str = "subreddits";
    const PAGINATES: bool = false;

    async fn fetch_page(
        &self,
        params: &SubredditScope,
        _cursor: Option<String>,
        _limit: u32,
    ) -> ClientResult<Vec<SubredditSettings>> {
        match params {
            SubredditScope::All => self.client.list_subreddits().await,
            SubredditScope::WithProfile(profile_id) => {
                self.client.subreddits_with_profile(*profile_id).await
            }
        }
    }
}
