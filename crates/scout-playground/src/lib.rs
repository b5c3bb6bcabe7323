//! Prompt benchmarking sessions over already-labeled detection history.
//!
//! A [`PlaygroundSession`] takes rows out of a detection feed, re-analyzes
//! them under draft profile settings, and compares the fresh verdicts
//! against the feedback users recorded on the originals. Everything is
//! ephemeral: the session never writes into the query caches and nothing it
//! does is persisted. The analyzer is a seam so tests can drive sessions
//! with a scripted fake instead of a live backend.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::future::join_all;
use thiserror::Error;

use scout_api_models::{
    AnalyzeRequest, Detection, ListedDetection, ProfileSettingsUpdate, Reaction,
};
use scout_query::QueryEngine;

/// Convenience alias for playground results.
pub type PlaygroundResult<T> = Result<T, PlaygroundError>;

/// Failures surfaced by playground flows.
#[derive(Debug, Error)]
pub enum PlaygroundError {
    /// The requested post was never absorbed into the session.
    #[error("post '{source_id}' is not part of this session")]
    UnknownPost {
        /// Source-native id that missed.
        source_id: String,
    },
    /// The analyzer failed for one post.
    #[error("analysis of '{source_id}' failed: {message}")]
    Analysis {
        /// Source-native id of the post.
        source_id: String,
        /// Failure message from the analyzer.
        message: String,
    },
}

/// Something that can produce a fresh verdict for one post.
#[async_trait]
pub trait PostAnalyzer: Send + Sync {
    /// Analyze one post against the given draft settings.
    async fn analyze(&self, request: &AnalyzeRequest) -> PlaygroundResult<Detection>;
}

#[async_trait]
impl PostAnalyzer for QueryEngine {
    async fn analyze(&self, request: &AnalyzeRequest) -> PlaygroundResult<Detection> {
        self.analyze_post(request)
            .await
            .map_err(|error| PlaygroundError::Analysis {
                source_id: request.source_id.clone(),
                message: error.to_string(),
            })
    }
}

/// One post under benchmark: the stored row plus any fresh re-analysis.
#[derive(Debug, Clone)]
pub struct PlaygroundPost {
    /// The detection row the post was absorbed from.
    pub original: ListedDetection,
    /// Verdict from the most recent run under the draft settings.
    pub fresh: Option<Detection>,
}

impl PlaygroundPost {
    /// Source-native id the session keys this post by.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.original.detection.source_id
    }

    /// Relevancy the post really has according to the recorded feedback.
    ///
    /// Feedback saying the stored verdict was correct confirms it; feedback
    /// saying it was wrong flips it. `None` without feedback.
    #[must_use]
    pub fn expected_relevancy(&self) -> Option<bool> {
        match self.original.reaction() {
            Reaction::Unset => None,
            Reaction::Relevant => Some(self.original.detection.is_relevant),
            Reaction::Irrelevant => Some(!self.original.detection.is_relevant),
        }
    }

    /// The verdict currently standing for this post: the fresh one once a
    /// run has landed, the stored one before that.
    #[must_use]
    pub fn latest_verdict(&self) -> &Detection {
        self.fresh.as_ref().unwrap_or(&self.original.detection)
    }

    /// Whether the fresh verdict agrees with the recorded feedback.
    ///
    /// `None` until the post has both feedback and a fresh verdict.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        let fresh = self.fresh.as_ref()?;
        Some(fresh.is_relevant == self.expected_relevancy()?)
    }

    /// Like [`Self::is_correct`], but judged on the latest verdict, so a
    /// post that was never re-run is judged on its stored one. A row whose
    /// feedback contradicts the stored verdict counts as incorrect before
    /// any run. `None` without feedback.
    #[must_use]
    pub fn latest_is_correct(&self) -> Option<bool> {
        Some(self.latest_verdict().is_relevant == self.expected_relevancy()?)
    }
}

/// Which posts a view of the session shows. Judged on the latest verdict,
/// so rows that were never re-run still land in a bucket once they carry
/// feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrectnessFilter {
    /// Every absorbed post.
    #[default]
    All,
    /// Posts whose latest verdict agrees with the feedback.
    Correct,
    /// Posts whose latest verdict contradicts the feedback.
    Incorrect,
}

impl CorrectnessFilter {
    fn admits(self, post: &PlaygroundPost) -> bool {
        match self {
            Self::All => true,
            Self::Correct => post.latest_is_correct() == Some(true),
            Self::Incorrect => post.latest_is_correct() == Some(false),
        }
    }
}

/// Tally of a session's benchmark so far. Posts with a run in flight are
/// counted in `total` but excluded from the other fields until they land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BenchmarkStats {
    /// Posts absorbed into the session.
    pub total: usize,
    /// Posts judged so far; always `correct + wrong`. A fresh verdict on a
    /// row without feedback does not count.
    pub analyzed: usize,
    /// Fresh verdicts that agree with the feedback.
    pub correct: usize,
    /// Fresh verdicts that contradict the feedback.
    pub wrong: usize,
}

/// What a single-post run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    /// A fresh verdict was stored.
    Completed,
    /// The post already had a run in flight; nothing was started.
    AlreadyRunning,
}

/// Outcome of a bulk run. Failed posts keep their previous state and can be
/// re-run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Posts that got a fresh verdict.
    pub succeeded: usize,
    /// Posts skipped because a run was already in flight.
    pub skipped: usize,
    /// Per-post failures; one failure never disturbs its batch siblings.
    pub failures: Vec<PlaygroundError>,
}

impl AnalysisReport {
    /// Whether every requested run succeeded or was safely skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct SessionState {
    settings: ProfileSettingsUpdate,
    posts: Vec<PlaygroundPost>,
    in_flight: HashSet<String>,
}

/// An ephemeral benchmark of draft settings over labeled posts.
///
/// Interior mutability lets concurrent runs land their verdicts; the mutex
/// is only held for bookkeeping, never across an await.
pub struct PlaygroundSession {
    state: Mutex<SessionState>,
}

impl PlaygroundSession {
    /// Start an empty session.
    #[must_use]
    pub fn new(settings: ProfileSettingsUpdate) -> Self {
        Self {
            state: Mutex::new(SessionState {
                settings,
                posts: Vec::new(),
                in_flight: HashSet::new(),
            }),
        }
    }

    /// Replace the draft settings for subsequent runs. Verdicts already
    /// stored are untouched.
    pub fn set_settings(&self, settings: ProfileSettingsUpdate) {
        self.locked().settings = settings;
    }

    /// Current draft settings.
    #[must_use]
    pub fn settings(&self) -> ProfileSettingsUpdate {
        self.locked().settings.clone()
    }

    /// Merge a feed snapshot into the session: existing posts get their
    /// original row refreshed (fresh verdicts are kept), unseen posts are
    /// appended in feed order. Returns how many posts were appended.
    pub fn absorb_feed(&self, rows: &[ListedDetection]) -> usize {
        let mut state = self.locked();
        let mut appended = 0;
        for row in rows {
            if let Some(post) = state
                .posts
                .iter_mut()
                .find(|post| post.source_id() == row.detection.source_id)
            {
                post.original = row.clone();
            } else {
                state.posts.push(PlaygroundPost {
                    original: row.clone(),
                    fresh: None,
                });
                appended += 1;
            }
        }
        tracing::debug!(appended, total = state.posts.len(), "absorbed feed rows");
        appended
    }

    /// Posts admitted by the filter, in feed order.
    #[must_use]
    pub fn posts(&self, filter: CorrectnessFilter) -> Vec<PlaygroundPost> {
        self.locked()
            .posts
            .iter()
            .filter(|post| filter.admits(post))
            .cloned()
            .collect()
    }

    /// Ids of every absorbed post, in feed order.
    #[must_use]
    pub fn all_ids(&self) -> Vec<String> {
        self.locked()
            .posts
            .iter()
            .map(|post| post.source_id().to_string())
            .collect()
    }

    /// Ids of posts whose latest verdict contradicts the feedback. Rows
    /// never re-run are judged on their stored verdict, so posts flagged as
    /// misclassified qualify before the first run.
    #[must_use]
    pub fn incorrect_ids(&self) -> Vec<String> {
        self.locked()
            .posts
            .iter()
            .filter(|post| post.latest_is_correct() == Some(false))
            .map(|post| post.source_id().to_string())
            .collect()
    }

    /// Benchmark tally at this moment.
    #[must_use]
    pub fn stats(&self) -> BenchmarkStats {
        let state = self.locked();
        let mut stats = BenchmarkStats {
            total: state.posts.len(),
            ..BenchmarkStats::default()
        };
        for post in &state.posts {
            if state.in_flight.contains(post.source_id()) {
                continue;
            }
            match post.is_correct() {
                Some(true) => {
                    stats.analyzed += 1;
                    stats.correct += 1;
                }
                Some(false) => {
                    stats.analyzed += 1;
                    stats.wrong += 1;
                }
                None => {}
            }
        }
        stats
    }

    /// Run one post through the analyzer under the current draft settings.
    ///
    /// The post is marked in flight before the analyzer is called and the
    /// mark is cleared when the run lands, success or failure. A post whose
    /// run is still out is skipped, not queued.
    ///
    /// # Errors
    ///
    /// [`PlaygroundError::UnknownPost`] when the id was never absorbed;
    /// otherwise the analyzer's failure. Either way the post stays
    /// re-runnable.
    pub async fn analyze<A>(&self, analyzer: &A, source_id: &str) -> PlaygroundResult<AnalysisStatus>
    where
        A: PostAnalyzer + ?Sized,
    {
        let request = {
            let mut state = self.locked();
            let Some(source) = state
                .posts
                .iter()
                .find(|post| post.source_id() == source_id)
                .map(|post| post.original.detection.source.clone())
            else {
                return Err(PlaygroundError::UnknownPost {
                    source_id: source_id.to_string(),
                });
            };
            if !state.in_flight.insert(source_id.to_string()) {
                return Ok(AnalysisStatus::AlreadyRunning);
            }
            AnalyzeRequest {
                source,
                source_id: source_id.to_string(),
                relevancy_filter: state.settings.relevancy_filter.clone(),
                extracted_properties: state.settings.extracted_properties.clone(),
            }
        };

        let result = analyzer.analyze(&request).await;

        let mut state = self.locked();
        state.in_flight.remove(source_id);
        let detection = result?;
        if let Some(post) = state
            .posts
            .iter_mut()
            .find(|post| post.source_id() == source_id)
        {
            tracing::debug!(source_id, is_relevant = detection.is_relevant, "fresh verdict landed");
            post.fresh = Some(detection);
        }
        Ok(AnalysisStatus::Completed)
    }

    /// Run a batch of posts concurrently. Each post is independent; failures
    /// and skips are collected into the report rather than aborting the
    /// batch.
    pub async fn analyze_many<A>(&self, analyzer: &A, source_ids: &[String]) -> AnalysisReport
    where
        A: PostAnalyzer + ?Sized,
    {
        let runs = source_ids
            .iter()
            .map(|source_id| self.analyze(analyzer, source_id));
        let mut report = AnalysisReport::default();
        for result in join_all(runs).await {
            match result {
                Ok(AnalysisStatus::Completed) => report.succeeded += 1,
                Ok(AnalysisStatus::AlreadyRunning) => report.skipped += 1,
                Err(error) => report.failures.push(error),
            }
        }
        report
    }

    fn locked(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("playground session mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    use chrono::Utc;
    use scout_api_models::DetectionTags;
    use tokio::sync::Notify;
    use tokio::task::yield_now;

    use super::*;

    fn detection(id: i64, source_id: &str, is_relevant: bool) -> Detection {
        Detection {
            id,
            source: "reddit".to_string(),
            source_id: source_id.to_string(),
            profile_id: 1,
            settings_version: 1,
            is_relevant,
            properties: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn labeled(
        id: i64,
        source_id: &str,
        is_relevant: bool,
        feedback: Option<bool>,
    ) -> ListedDetection {
        ListedDetection {
            detection: detection(id, source_id, is_relevant),
            source_post: None,
            tags: feedback.map(|correct| DetectionTags {
                relevancy_detected_correctly: Some(correct),
            }),
        }
    }

    fn draft() -> ProfileSettingsUpdate {
        ProfileSettingsUpdate {
            relevancy_filter: "is it about rust?".to_string(),
            extracted_properties: BTreeMap::new(),
        }
    }

    #[derive(Clone)]
    enum Script {
        Verdict(bool),
        Fail(&'static str),
    }

    struct ScriptedAnalyzer {
        script: Mutex<HashMap<String, Script>>,
        gate: Option<Arc<Notify>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAnalyzer {
        fn new(script: impl IntoIterator<Item = (&'static str, Script)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(id, entry)| (id.to_string(), entry))
                        .collect(),
                ),
                gate: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn gated(
            script: impl IntoIterator<Item = (&'static str, Script)>,
        ) -> (Arc<Self>, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            let analyzer = Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(id, entry)| (id.to_string(), entry))
                        .collect(),
                ),
                gate: Some(Arc::clone(&gate)),
                calls: Mutex::new(Vec::new()),
            });
            (analyzer, gate)
        }

        fn reprogram(&self, source_id: &str, entry: Script) {
            self.script
                .lock()
                .expect("script mutex poisoned")
                .insert(source_id.to_string(), entry);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("call log mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl PostAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, request: &AnalyzeRequest) -> PlaygroundResult<Detection> {
            self.calls
                .lock()
                .expect("call log mutex poisoned")
                .push(request.source_id.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let entry = self
                .script
                .lock()
                .expect("script mutex poisoned")
                .get(&request.source_id)
                .cloned();
            match entry {
                Some(Script::Verdict(is_relevant)) => {
                    Ok(detection(0, &request.source_id, is_relevant))
                }
                Some(Script::Fail(message)) => Err(PlaygroundError::Analysis {
                    source_id: request.source_id.clone(),
                    message: message.to_string(),
                }),
                None => Ok(detection(0, &request.source_id, false)),
            }
        }
    }

    #[test]
    fn correctness_requires_feedback_and_a_fresh_verdict() {
        // No feedback: never judged, fresh verdict or not.
        let mut post = PlaygroundPost {
            original: labeled(1, "t3_a", true, None),
            fresh: None,
        };
        assert_eq!(post.is_correct(), None);
        post.fresh = Some(detection(0, "t3_a", true));
        assert_eq!(post.is_correct(), None);

        // Feedback without a fresh verdict: still unjudged.
        let post = PlaygroundPost {
            original: labeled(2, "t3_b", true, Some(true)),
            fresh: None,
        };
        assert_eq!(post.is_correct(), None);

        // Confirmed-correct original: the fresh run must reproduce it.
        let mut post = PlaygroundPost {
            original: labeled(3, "t3_c", true, Some(true)),
            fresh: Some(detection(0, "t3_c", true)),
        };
        assert_eq!(post.is_correct(), Some(true));
        post.fresh = Some(detection(0, "t3_c", false));
        assert_eq!(post.is_correct(), Some(false));

        // Confirmed-wrong original: the fresh run must flip it.
        let mut post = PlaygroundPost {
            original: labeled(4, "t3_d", true, Some(false)),
            fresh: Some(detection(0, "t3_d", false)),
        };
        assert_eq!(post.is_correct(), Some(true));
        post.fresh = Some(detection(0, "t3_d", true));
        assert_eq!(post.is_correct(), Some(false));
    }

    #[tokio::test]
    async fn absorb_refreshes_originals_but_keeps_fresh_verdicts() {
        let session = PlaygroundSession::new(draft());
        let analyzer = ScriptedAnalyzer::new([("t3_a", Script::Verdict(true))]);

        assert_eq!(
            session.absorb_feed(&[labeled(1, "t3_a", true, None), labeled(2, "t3_b", false, None)]),
            2
        );
        session
            .analyze(analyzer.as_ref(), "t3_a")
            .await
            .expect("analysis");

        // The row comes back around with feedback attached and a new sibling.
        let appended = session.absorb_feed(&[
            labeled(1, "t3_a", true, Some(true)),
            labeled(3, "t3_c", true, None),
        ]);
        assert_eq!(appended, 1);

        let posts = session.posts(CorrectnessFilter::All);
        let ids: Vec<&str> = posts.iter().map(PlaygroundPost::source_id).collect();
        assert_eq!(ids, vec!["t3_a", "t3_b", "t3_c"]);
        assert!(posts[0].fresh.is_some());
        assert_eq!(posts[0].original.reaction(), Reaction::Relevant);
        // Feedback arrived after the run, so the post is now judged.
        assert_eq!(posts[0].is_correct(), Some(true));
    }

    #[tokio::test]
    async fn bulk_runs_are_independent_and_failures_stay_rerunnable() {
        let session = PlaygroundSession::new(draft());
        session.absorb_feed(&[
            labeled(1, "t3_a", true, Some(true)),
            labeled(2, "t3_b", false, Some(true)),
        ]);
        let analyzer = ScriptedAnalyzer::new([
            ("t3_a", Script::Verdict(true)),
            ("t3_b", Script::Fail("llm timeout")),
        ]);

        let report = session
            .analyze_many(
                analyzer.as_ref(),
                &["t3_a".to_string(), "t3_b".to_string()],
            )
            .await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 0);
        assert!(!report.is_clean());
        assert!(report.failures[0].to_string().contains("llm timeout"));

        // The failed post kept its state and reruns cleanly.
        let stats = session.stats();
        assert_eq!(stats.analyzed, 1);
        analyzer.reprogram("t3_b", Script::Verdict(false));
        let status = session
            .analyze(analyzer.as_ref(), "t3_b")
            .await
            .expect("rerun");
        assert_eq!(status, AnalysisStatus::Completed);
        assert_eq!(session.stats().analyzed, 2);
    }

    #[tokio::test]
    async fn in_flight_posts_are_skipped_and_left_out_of_stats() {
        let session = Arc::new(PlaygroundSession::new(draft()));
        session.absorb_feed(&[
            labeled(1, "t3_a", true, Some(true)),
            labeled(2, "t3_b", true, Some(true)),
        ]);
        let (analyzer, gate) = ScriptedAnalyzer::gated([("t3_a", Script::Verdict(true))]);

        let running_session = Arc::clone(&session);
        let running_analyzer = Arc::clone(&analyzer);
        let run = tokio::spawn(async move {
            running_session
                .analyze(running_analyzer.as_ref(), "t3_a")
                .await
        });
        while analyzer.calls().is_empty() {
            yield_now().await;
        }

        // The airborne post is skipped by both entry points and excluded
        // from tallies.
        assert_eq!(
            session
                .analyze(analyzer.as_ref(), "t3_a")
                .await
                .expect("skip"),
            AnalysisStatus::AlreadyRunning
        );
        let report = session
            .analyze_many(analyzer.as_ref(), &["t3_a".to_string()])
            .await;
        assert_eq!(report.skipped, 1);
        let stats = session.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.analyzed, 0);

        gate.notify_one();
        let status = run.await.expect("join").expect("analysis");
        assert_eq!(status, AnalysisStatus::Completed);
        let stats = session.stats();
        assert_eq!(stats.analyzed, 1);
        assert_eq!(stats.correct, 1);
        assert_eq!(analyzer.calls(), vec!["t3_a".to_string()]);
    }

    #[tokio::test]
    async fn unknown_posts_surface_as_errors_not_panics() {
        let session = PlaygroundSession::new(draft());
        session.absorb_feed(&[labeled(1, "t3_a", true, None)]);
        let analyzer = ScriptedAnalyzer::new([]);

        let error = session
            .analyze(analyzer.as_ref(), "t3_ghost")
            .await
            .expect_err("unknown post");
        assert!(matches!(error, PlaygroundError::UnknownPost { .. }));

        let report = session
            .analyze_many(
                analyzer.as_ref(),
                &["t3_a".to_string(), "t3_ghost".to_string()],
            )
            .await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(analyzer.calls().contains(&"t3_a".to_string()));
    }

    #[tokio::test]
    async fn stored_verdicts_stand_in_until_a_run_lands() {
        let session = PlaygroundSession::new(draft());
        session.absorb_feed(&[
            labeled(1, "t3_a", true, Some(false)),
            labeled(2, "t3_b", true, Some(true)),
        ]);

        // Before any run the flagged post is already misclassified by its
        // standing verdict, while stats only count landed runs.
        assert_eq!(session.incorrect_ids(), vec!["t3_a".to_string()]);
        assert_eq!(session.posts(CorrectnessFilter::Incorrect).len(), 1);
        assert_eq!(session.posts(CorrectnessFilter::Correct).len(), 1);
        let stats = session.stats();
        assert_eq!(stats.analyzed, 0);
        assert_eq!(stats.wrong, 0);

        // A fresh run that flips the verdict clears the post.
        let analyzer = ScriptedAnalyzer::new([("t3_a", Script::Verdict(false))]);
        session
            .analyze(analyzer.as_ref(), "t3_a")
            .await
            .expect("analysis");
        assert!(session.incorrect_ids().is_empty());
        let stats = session.stats();
        assert_eq!(stats.analyzed, 1);
        assert_eq!(stats.correct, 1);
    }

    #[tokio::test]
    async fn selectors_and_filters_track_wrong_posts() {
        let session = PlaygroundSession::new(draft());
        session.absorb_feed(&[
            labeled(1, "t3_a", true, Some(true)),
            labeled(2, "t3_b", true, Some(true)),
            labeled(3, "t3_c", false, None),
        ]);
        let analyzer = ScriptedAnalyzer::new([
            ("t3_a", Script::Verdict(true)),
            ("t3_b", Script::Verdict(false)),
            ("t3_c", Script::Verdict(true)),
        ]);

        let ids = session.all_ids();
        assert_eq!(ids.len(), 3);
        let report = session.analyze_many(analyzer.as_ref(), &ids).await;
        assert!(report.is_clean());
        assert_eq!(report.succeeded, 3);

        assert_eq!(session.incorrect_ids(), vec!["t3_b".to_string()]);
        assert_eq!(session.posts(CorrectnessFilter::Correct).len(), 1);
        assert_eq!(session.posts(CorrectnessFilter::Incorrect).len(), 1);
        assert_eq!(session.posts(CorrectnessFilter::All).len(), 3);

        // The unlabeled row got a fresh verdict but joins no bucket.
        let stats = session.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.analyzed, 2);
        assert_eq!(stats.correct, 1);
        assert_eq!(stats.wrong, 1);
    }

    #[tokio::test]
    async fn draft_settings_flow_into_analyzer_requests() {
        use httpmock::MockServer;
        use httpmock::prelude::*;
        use scout_client::{ClientConfig, ScoutClient};
        use scout_query::CacheConfig;

        let server = MockServer::start_async().await;
        let analyze_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/analyze")
                .json_body(serde_json::json!({
                    "source": "reddit",
                    "source_id": "t3_a",
                    "relevancy_filter": "sharper prompt",
                    "extracted_properties": {"summary": "one line"}
                }));
            then.status(200).json_body(serde_json::json!({
                "id": 0,
                "source": "reddit",
                "source_id": "t3_a",
                "profile_id": 0,
                "settings_version": 0,
                "is_relevant": true,
                "properties": {},
                "created_at": "2025-05-01T12:00:00Z"
            }));
        });
        let config = ClientConfig::new(server.base_url().parse().expect("mock server url"));
        let client = ScoutClient::new(config).expect("client construction");
        let engine = QueryEngine::new(client, CacheConfig::default());

        let session = PlaygroundSession::new(draft());
        session.absorb_feed(&[labeled(1, "t3_a", true, Some(true))]);
        session.set_settings(ProfileSettingsUpdate {
            relevancy_filter: "sharper prompt".to_string(),
            extracted_properties: [("summary".to_string(), "one line".to_string())]
                .into_iter()
                .collect(),
        });

        let status = session.analyze(&engine, "t3_a").await.expect("analysis");
        assert_eq!(status, AnalysisStatus::Completed);
        analyze_mock.assert();
        assert_eq!(session.stats().correct, 1);
    }
}
