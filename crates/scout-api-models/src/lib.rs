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
//! Wire DTOs for the Scout REST API.
//!
//! These types are shared by the HTTP client, the query engine, and the CLI
//! so the contract stays deterministic in one place. Maps are `BTreeMap` on
//! purpose: serialization order is then canonical, which the query layer
//! relies on when it derives cache keys from filter payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tri-state relevancy feedback attached to a detection.
///
/// The wire encodes this as `true` / `false` / `null`; the explicit sum type
/// keeps "no feedback" distinguishable from the two verdicts without leaning
/// on nested options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reaction {
    /// No feedback recorded (or feedback cleared).
    #[default]
    Unset,
    /// The detection verdict was confirmed as correct.
    Relevant,
    /// The detection verdict was flagged as wrong.
    Irrelevant,
}

impl Reaction {
    /// Wire value for this reaction (`None` encodes as JSON `null`).
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Relevant => Some(true),
            Self::Irrelevant => Some(false),
        }
    }

    /// Whether any feedback is recorded.
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Resolve the toggle rule for reaction buttons: pressing the reaction
    /// already in force clears it, anything else replaces it.
    #[must_use]
    pub fn toggled_against(self, current: Self) -> Self {
        if self == current { Self::Unset } else { self }
    }
}

impl From<Option<bool>> for Reaction {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::Relevant,
            Some(false) => Self::Irrelevant,
        }
    }
}

impl From<Reaction> for Option<bool> {
    fn from(value: Reaction) -> Self {
        value.as_bool()
    }
}

impl Serialize for Reaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_bool().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Reaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(Self::from)
    }
}

/// Tri-state update field: leave untouched, clear, or replace.
///
/// Serialized as an absent field (`Unset`, via `skip_serializing_if`), JSON
/// `null` (`Clear`), or the value itself (`Set`). The distinction matters for
/// profile updates where `null` deletes server-side state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field absent from the payload; the server leaves the value alone.
    Unset,
    /// Field present as `null`; the server clears the value.
    Clear,
    /// Field present with a replacement value.
    Set(T),
}

// Unset regardless of `T`; the derive would demand `T: Default`.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Patch<T> {
    /// True when the field should be omitted from the payload entirely.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The replacement value, when one is carried.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset | Self::Clear => None,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // An `Unset` that reaches the serializer (e.g. inside a map
            // value) degrades to `null` rather than inventing a value.
            Self::Unset | Self::Clear => serializer.serialize_none(),
            Self::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer)
            .map(|value| value.map_or(Self::Clear, Self::Set))
    }
}

/// One analysis verdict produced by running a post through profile settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Monotonic primary key; doubles as the feed pagination cursor.
    pub id: i64,
    /// Source system the post came from (currently `"reddit"`).
    pub source: String,
    /// Source-native post identifier.
    pub source_id: String,
    /// Profile whose settings produced this verdict.
    pub profile_id: i64,
    /// Version of the profile settings in force at analysis time.
    pub settings_version: i64,
    /// Whether the relevancy filter matched the post.
    pub is_relevant: bool,
    /// Extraction prompt name to extracted text.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// When the analysis ran.
    pub created_at: DateTime<Utc>,
}

/// User feedback recorded against a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionTags {
    /// Whether the verdict was judged correct; `None` means cleared.
    pub relevancy_detected_correctly: Option<bool>,
}

impl DetectionTags {
    /// Feedback as the explicit tri-state.
    #[must_use]
    pub const fn reaction(self) -> Reaction {
        match self.relevancy_detected_correctly {
            None => Reaction::Unset,
            Some(true) => Reaction::Relevant,
            Some(false) => Reaction::Irrelevant,
        }
    }

    /// True when no feedback survives in the record.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.relevancy_detected_correctly.is_none()
    }
}

/// Raw source payload attached to a listed detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePost {
    /// Source-native post identifier.
    pub source_id: String,
    /// Source-specific post body; the schema belongs to the backend.
    #[serde(default)]
    pub post: serde_json::Value,
}

/// Feed row: a detection joined with its source post and feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedDetection {
    /// The analysis verdict.
    pub detection: Detection,
    /// Raw post payload, when the backend still holds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_post: Option<SourcePost>,
    /// Feedback, when any was ever recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<DetectionTags>,
}

impl ListedDetection {
    /// Current feedback as the tri-state, treating absent tags as unset.
    #[must_use]
    pub fn reaction(&self) -> Reaction {
        self.tags.map_or(Reaction::Unset, DetectionTags::reaction)
    }
}

/// Analysis settings attached to a profile (default or per-source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Monotonic settings revision; detections record the version that
    /// produced them.
    pub version: i64,
    /// LLM prompt deciding whether a post is relevant.
    pub relevancy_filter: String,
    /// Property name to extraction prompt.
    #[serde(default)]
    pub extracted_properties: BTreeMap<String, String>,
    /// When this revision was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When this revision was last touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A curation profile: prompts plus activation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Primary key (ignored by the server on create).
    #[serde(default)]
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Inactive profiles are skipped by the analysis pipeline.
    pub active: bool,
    /// Settings used when no source-specific override exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_settings: Option<ProfileSettings>,
    /// Source name to settings override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_settings: Option<BTreeMap<String, ProfileSettings>>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last-update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Replacement prompts for a settings revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettingsUpdate {
    /// LLM prompt deciding whether a post is relevant.
    pub relevancy_filter: String,
    /// Property name to extraction prompt.
    #[serde(default)]
    pub extracted_properties: BTreeMap<String, String>,
}

impl From<&ProfileSettings> for ProfileSettingsUpdate {
    fn from(settings: &ProfileSettings) -> Self {
        Self {
            relevancy_filter: settings.relevancy_filter.clone(),
            extracted_properties: settings.extracted_properties.clone(),
        }
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New activation state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Default settings: untouched, cleared, or replaced.
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub default_settings: Patch<ProfileSettingsUpdate>,
    /// Per-source settings; a `null` map value deletes that override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_settings: Option<BTreeMap<String, Option<ProfileSettingsUpdate>>>,
}

/// Response to profile creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProfile {
    /// Identifier assigned to the new profile.
    pub id: i64,
}

/// Request to backfill-analyze historical posts for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JumpstartRequest {
    /// Skip posts the profile has already analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_already_analyzed: Option<bool>,
    /// How many days of history to cover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jumpstart_period: Option<i64>,
    /// Cap on the number of posts scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Body of `POST /api/detections/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DetectionQuery {
    /// Exclusive upper bound: return detections with ids below this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_id: Option<i64>,
    /// Page size; the server defaults to 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Optional row filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DetectionFilter>,
}

/// Row filter for detection listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DetectionFilter {
    /// Restrict to these profiles (optionally pinned to settings versions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<ProfileFilter>>,
    /// Restrict to these source systems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Restrict to one relevancy verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_relevant: Option<bool>,
    /// Restrict by recorded feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<DetectionTagsFilter>,
}

impl DetectionFilter {
    /// Filter pinned to a single profile, the common feed shape.
    #[must_use]
    pub fn for_profile(profile_id: i64) -> Self {
        Self {
            profiles: Some(vec![ProfileFilter {
                profile_id,
                source_settings_versions: None,
            }]),
            ..Self::default()
        }
    }

    /// One profile's rows that carry feedback either way, the shape
    /// benchmark sessions feed on.
    #[must_use]
    pub fn labeled_for_profile(profile_id: i64) -> Self {
        Self {
            tags: Some(DetectionTagsFilter {
                relevancy_detected_correctly: Some(vec![
                    Reaction::Relevant,
                    Reaction::Irrelevant,
                ]),
            }),
            ..Self::for_profile(profile_id)
        }
    }
}

/// Per-profile clause of a [`DetectionFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFilter {
    /// Profile the clause applies to.
    pub profile_id: i64,
    /// Optional pin to specific settings versions per source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_settings_versions: Option<Vec<SourceVersionsFilter>>,
}

/// Settings-version pin for one source within a profile clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersionsFilter {
    /// Source the versions belong to; `None` means any source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Acceptable settings versions.
    pub versions: Vec<i64>,
}

/// Feedback clause of a [`DetectionFilter`].
///
/// Members are tri-state so "never tagged / cleared" (`null`) is a matchable
/// state alongside the two verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DetectionTagsFilter {
    /// Acceptable feedback states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevancy_detected_correctly: Option<Vec<Reaction>>,
}

/// Body of `PUT /api/detections/tags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionTagsUpdate {
    /// Detection being tagged.
    pub detection_id: i64,
    /// Replacement feedback.
    pub tags: TagUpdate,
}

/// Write-side feedback payload; `Unset` serializes as `null` to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TagUpdate {
    /// Feedback to record, always present on the wire.
    pub relevancy_detected_correctly: Reaction,
}

impl From<Reaction> for TagUpdate {
    fn from(reaction: Reaction) -> Self {
        Self {
            relevancy_detected_correctly: reaction,
        }
    }
}

/// Body of `POST /api/analyze`: a detached dry-run against ad-hoc settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Source system of the post.
    pub source: String,
    /// Source-native post identifier.
    pub source_id: String,
    /// Relevancy prompt to evaluate.
    pub relevancy_filter: String,
    /// Extraction prompts to evaluate.
    #[serde(default)]
    pub extracted_properties: BTreeMap<String, String>,
}

/// Subreddit row with its attached profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditSettings {
    /// Subreddit name without the `r/` prefix.
    pub subreddit: String,
    /// Profiles whose prompts run against this subreddit.
    #[serde(default)]
    pub profiles: Vec<i64>,
}

/// Body for attaching or detaching profiles on a subreddit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditProfilesRequest {
    /// Profiles to add or remove.
    pub profile_ids: Vec<i64>,
}

/// Error envelope the backend returns on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}
