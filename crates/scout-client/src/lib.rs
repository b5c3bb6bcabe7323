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
//! Typed async client for the Scout REST API.
//!
//! One [`ScoutClient`] serves the whole process: the bearer credential is
//! installed as a default header at construction time (before any call goes
//! out), the per-call timeout is pinned on the underlying pool, and every
//! request carries an `x-request-id` for correlation. All endpoints return
//! typed DTOs from `scout-api-models` behind a uniform [`ClientError`]
//! taxonomy, including the deliberately distinct "no data returned" class
//! for empty success payloads.

mod error;

pub use error::{ClientError, ClientResult};

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use scout_api_models::{
    AnalyzeRequest, CreatedProfile, Detection, DetectionQuery, DetectionTags,
    DetectionTagsUpdate, ErrorBody, JumpstartRequest, ListedDetection, Profile, ProfileUpdate,
    SubredditProfilesRequest, SubredditSettings,
};

/// Header carrying the per-request correlation id.
const HEADER_REQUEST_ID: &str = "x-request-id";

/// Per-call budget applied when the caller does not pick one.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Construction-time settings for a [`ScoutClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the API server.
    pub base_url: Url,
    /// Bearer token attached to every call; `None` for unauthenticated servers.
    pub bearer_token: Option<String>,
    /// Per-call timeout covering connect through body.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings pointing at `base_url` with the default timeout and no
    /// credential.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            bearer_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Attach the process-wide bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Override the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Typed client covering every Scout endpoint.
#[derive(Debug, Clone)]
pub struct ScoutClient {
    http: Client,
    base_url: Url,
}

impl ScoutClient {
    /// Build the client: installs the credential as a default header and
    /// normalizes the base URL so endpoint paths join cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the token cannot be encoded as a
    /// header value or the HTTP pool cannot be constructed.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ClientError::Config {
                        message: "bearer token contains invalid header characters".into(),
                    }
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ClientError::Config {
                message: format!("failed to build HTTP client: {err}"),
            })?;

        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    /// List every profile.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn list_profiles(&self) -> ClientResult<Vec<Profile>> {
        let response = self.send::<()>(Method::GET, "api/profiles", None).await?;
        Self::decode("api/profiles", response).await
    }

    /// Fetch one profile by id.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn get_profile(&self, profile_id: i64) -> ClientResult<Profile> {
        let path = format!("api/profiles/{profile_id}");
        let response = self.send::<()>(Method::GET, &path, None).await?;
        Self::decode(&path, response).await
    }

    /// Create a profile; the server assigns and returns the id.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn create_profile(&self, profile: &Profile) -> ClientResult<CreatedProfile> {
        let response = self
            .send(Method::POST, "api/profiles", Some(profile))
            .await?;
        Self::decode("api/profiles", response).await
    }

    /// Apply a partial update to a profile.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn update_profile(&self, profile_id: i64, update: &ProfileUpdate) -> ClientResult<()> {
        let path = format!("api/profiles/{profile_id}");
        let response = self.send(Method::PUT, &path, Some(update)).await?;
        Self::expect_success(&path, response).await
    }

    /// Delete a profile; the backend cascades detections and subreddit links.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn delete_profile(&self, profile_id: i64) -> ClientResult<()> {
        let path = format!("api/profiles/{profile_id}");
        let response = self.send::<()>(Method::DELETE, &path, None).await?;
        Self::expect_success(&path, response).await
    }

    /// Schedule backfill analysis of historical posts for a profile.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn jumpstart_profile(
        &self,
        profile_id: i64,
        request: &JumpstartRequest,
    ) -> ClientResult<()> {
        let path = format!("api/profiles/{profile_id}/jumpstart");
        let response = self.send(Method::POST, &path, Some(request)).await?;
        Self::expect_success(&path, response).await
    }

    /// Fetch one page of the detection feed.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy; an empty page is a
    /// valid response, an absent body is [`ClientError::EmptyBody`].
    pub async fn list_detections(
        &self,
        query: &DetectionQuery,
    ) -> ClientResult<Vec<ListedDetection>> {
        let response = self
            .send(Method::POST, "api/detections/list", Some(query))
            .await?;
        Self::decode("api/detections/list", response).await
    }

    /// Record (or clear) feedback on a detection; returns the authoritative
    /// stored tags.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn update_detection_tags(
        &self,
        update: &DetectionTagsUpdate,
    ) -> ClientResult<DetectionTags> {
        let response = self
            .send(Method::PUT, "api/detections/tags", Some(update))
            .await?;
        Self::decode("api/detections/tags", response).await
    }

    /// Run a detached analysis of one post against ad-hoc settings.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn analyze_post(&self, request: &AnalyzeRequest) -> ClientResult<Detection> {
        let response = self.send(Method::POST, "api/analyze", Some(request)).await?;
        Self::decode("api/analyze", response).await
    }

    /// List every known subreddit with its attached profiles.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn list_subreddits(&self) -> ClientResult<Vec<SubredditSettings>> {
        let response = self
            .send::<()>(Method::GET, "api/sources/reddit/subreddits", None)
            .await?;
        Self::decode("api/sources/reddit/subreddits", response).await
    }

    /// List the subreddits a profile is attached to.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn subreddits_with_profile(
        &self,
        profile_id: i64,
    ) -> ClientResult<Vec<SubredditSettings>> {
        let path = "api/sources/reddit/subreddits_with_profile";
        let url = self.endpoint(path)?;
        tracing::debug!(path, profile_id, "scout api request");
        let response = self
            .http
            .get(url)
            .header(HEADER_REQUEST_ID, Uuid::new_v4().to_string())
            .query(&[("profile_id", profile_id)])
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;
        Self::decode(path, response).await
    }

    /// Attach profiles to a subreddit.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn add_profiles_to_subreddit(
        &self,
        subreddit: &str,
        profile_ids: &[i64],
    ) -> ClientResult<()> {
        let path = format!("api/sources/reddit/subreddits/{subreddit}/add_profiles");
        let body = SubredditProfilesRequest {
            profile_ids: profile_ids.to_vec(),
        };
        let response = self.send(Method::POST, &path, Some(&body)).await?;
        Self::expect_success(&path, response).await
    }

    /// Detach profiles from a subreddit.
    ///
    /// # Errors
    ///
    /// Propagates the standard [`ClientError`] taxonomy.
    pub async fn remove_profiles_from_subreddit(
        &self,
        subreddit: &str,
        profile_ids: &[i64],
    ) -> ClientResult<()> {
        let path = format!("api/sources/reddit/subreddits/{subreddit}/remove_profiles");
        let body = SubredditProfilesRequest {
            profile_ids: profile_ids.to_vec(),
        };
        let response = self.send(Method::POST, &path, Some(&body)).await?;
        Self::expect_success(&path, response).await
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url.join(path).map_err(|err| ClientError::Config {
            message: format!("invalid endpoint path '{path}': {err}"),
        })
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, path, "scout api request");
        let mut request = self
            .http
            .request(method, url)
            .header(HEADER_REQUEST_ID, Uuid::new_v4().to_string());
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify(path, status, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(ClientError::EmptyBody {
                path: path.to_string(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn expect_success(path: &str, response: Response) -> ClientResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::classify(path, status, response).await)
        }
    }

    async fn classify(path: &str, status: StatusCode, response: Response) -> ClientError {
        let bytes = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&bytes).map_or_else(
            |_| String::from_utf8_lossy(&bytes).trim().to_string(),
            |body| body.error,
        );
        let message = if message.is_empty() {
            format!("request failed with status {status}")
        } else {
            message
        };
        ClientError::Api {
            path: path.to_string(),
            status,
            message,
        }
    }
}
