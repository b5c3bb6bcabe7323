//! Output renderers and formatting helpers for CLI commands.

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Serialize;
use serde_json::json;

use scout_api_models::{
    Detection, ListedDetection, Profile, ProfileSettings, Reaction, SubredditSettings,
};
use scout_playground::{AnalysisReport, CorrectnessFilter, PlaygroundSession};
use scout_query::{FeedSnapshot, SubredditSyncReport, SyncOp};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_feed(
    snapshot: &FeedSnapshot<ListedDetection>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<&ListedDetection> = snapshot.items().collect();
            print_json(&rows)
        }
        OutputFormat::Table => {
            println!(
                "{:<10} {:<8} {:<9} {:<9} TITLE",
                "ID", "PROFILE", "RELEVANT", "FEEDBACK"
            );
            for row in snapshot.items() {
                println!(
                    "{:<10} {:<8} {:<9} {:<9} {}",
                    row.detection.id,
                    row.detection.profile_id,
                    relevance_to_str(row.detection.is_relevant),
                    reaction_to_str(row.reaction()),
                    post_title(row),
                );
            }
            if snapshot.has_next {
                println!("more pages available (pass --pages or --all)");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_profile_list(profiles: &[Profile], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(profiles),
        OutputFormat::Table => {
            println!("{:<8} {:<8} {:<9} NAME", "ID", "ACTIVE", "SOURCES");
            for profile in profiles {
                let overrides = profile.sources_settings.as_ref().map_or(0, BTreeMap::len);
                println!(
                    "{:<8} {:<8} {:<9} {}",
                    profile.id, profile.active, overrides, profile.name
                );
            }
            Ok(())
        }
    }
}

pub(crate) fn render_profile_detail(profile: &Profile, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(profile),
        OutputFormat::Table => {
            println!("id: {}", profile.id);
            println!("name: {}", profile.name);
            println!("active: {}", profile.active);
            if let Some(settings) = &profile.default_settings {
                print_settings("default", settings);
            }
            if let Some(sources) = &profile.sources_settings {
                for (source, settings) in sources {
                    print_settings(source, settings);
                }
            }
            if let Some(created) = profile.created_at {
                println!("created: {created}");
            }
            if let Some(updated) = profile.updated_at {
                println!("updated: {updated}");
            }
            Ok(())
        }
    }
}

fn print_settings(owner: &str, settings: &ProfileSettings) {
    println!("{owner} settings (version {}):", settings.version);
    println!("  relevancy: {}", settings.relevancy_filter);
    for (name, prompt) in &settings.extracted_properties {
        println!("  property {name}: {prompt}");
    }
}

pub(crate) fn render_subreddit_list(
    rows: &[SubredditSettings],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            println!("{:<24} PROFILES", "SUBREDDIT");
            for row in rows {
                println!("{:<24} {}", row.subreddit, join_ids(&row.profiles));
            }
            Ok(())
        }
    }
}

pub(crate) fn render_sync_report(
    report: &SubredditSyncReport,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "added": report.added,
            "removed": report.removed,
            "failed": report
                .failed
                .iter()
                .map(|failure| {
                    json!({
                        "subreddit": failure.subreddit,
                        "op": sync_op_to_str(failure.op),
                        "message": failure.message,
                    })
                })
                .collect::<Vec<_>>(),
        })),
        OutputFormat::Table => {
            println!("added: {}", report.added);
            println!("removed: {}", report.removed);
            for failure in &report.failed {
                println!(
                    "failed: {} r/{}: {}",
                    sync_op_to_str(failure.op),
                    failure.subreddit,
                    failure.message
                );
            }
            Ok(())
        }
    }
}

pub(crate) fn render_detection(detection: &Detection, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(detection),
        OutputFormat::Table => {
            println!("source: {} post {}", detection.source, detection.source_id);
            println!("relevant: {}", detection.is_relevant);
            for (name, value) in &detection.properties {
                println!("{name}: {value}");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_playground(
    session: &PlaygroundSession,
    report: &AnalysisReport,
    rerun: Option<&AnalysisReport>,
    format: OutputFormat,
) -> CliResult<()> {
    let stats = session.stats();
    let posts = session.posts(CorrectnessFilter::All);
    match format {
        OutputFormat::Json => print_json(&json!({
            "stats": {
                "total": stats.total,
                "analyzed": stats.analyzed,
                "correct": stats.correct,
                "wrong": stats.wrong,
            },
            "posts": posts
                .iter()
                .map(|post| {
                    json!({
                        "source_id": post.source_id(),
                        "feedback": reaction_to_str(post.original.reaction()),
                        "original_relevant": post.original.detection.is_relevant,
                        "fresh_relevant": post.fresh.as_ref().map(|fresh| fresh.is_relevant),
                        "correct": post.is_correct(),
                    })
                })
                .collect::<Vec<_>>(),
            "failures": collect_failures(report, rerun),
        })),
        OutputFormat::Table => {
            println!(
                "{:<24} {:<9} {:<9} {:<9} VERDICT",
                "SOURCE_ID", "FEEDBACK", "ORIGINAL", "FRESH"
            );
            for post in &posts {
                println!(
                    "{:<24} {:<9} {:<9} {:<9} {}",
                    post.source_id(),
                    reaction_to_str(post.original.reaction()),
                    relevance_to_str(post.original.detection.is_relevant),
                    post.fresh
                        .as_ref()
                        .map_or("-", |fresh| relevance_to_str(fresh.is_relevant)),
                    verdict_to_str(post.is_correct()),
                );
            }
            println!(
                "benchmark: {} posts, {} analyzed, {} correct, {} wrong",
                stats.total, stats.analyzed, stats.correct, stats.wrong
            );
            for failure in collect_failures(report, rerun) {
                println!("failed: {failure}");
            }
            Ok(())
        }
    }
}

fn collect_failures(report: &AnalysisReport, rerun: Option<&AnalysisReport>) -> Vec<String> {
    let mut failures: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
    if let Some(rerun) = rerun {
        failures.extend(rerun.failures.iter().map(ToString::to_string));
    }
    failures
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn post_title(row: &ListedDetection) -> String {
    row.source_post
        .as_ref()
        .and_then(|post| post.post.get("title"))
        .and_then(|title| title.as_str())
        .map_or_else(|| row.detection.source_id.clone(), str::to_string)
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[must_use]
pub(crate) const fn reaction_to_str(reaction: Reaction) -> &'static str {
    match reaction {
        Reaction::Unset => "-",
        Reaction::Relevant => "up",
        Reaction::Irrelevant => "down",
    }
}

#[must_use]
pub(crate) const fn relevance_to_str(relevant: bool) -> &'static str {
    if relevant { "relevant" } else { "ignored" }
}

const fn verdict_to_str(correct: Option<bool>) -> &'static str {
    match correct {
        None => "-",
        Some(true) => "correct",
        Some(false) => "wrong",
    }
}

const fn sync_op_to_str(op: SyncOp) -> &'static str {
    match op {
        SyncOp::Add => "add",
        SyncOp::Remove => "remove",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reaction_labels_cover_the_tri_state() {
        assert_eq!(reaction_to_str(Reaction::Unset), "-");
        assert_eq!(reaction_to_str(Reaction::Relevant), "up");
        assert_eq!(reaction_to_str(Reaction::Irrelevant), "down");
    }

    #[test]
    fn relevance_and_verdict_labels_read_naturally() {
        assert_eq!(relevance_to_str(true), "relevant");
        assert_eq!(relevance_to_str(false), "ignored");
        assert_eq!(verdict_to_str(None), "-");
        assert_eq!(verdict_to_str(Some(true)), "correct");
        assert_eq!(verdict_to_str(Some(false)), "wrong");
    }

    #[test]
    fn post_title_prefers_the_source_post_title() {
        let row: ListedDetection = serde_json::from_value(json!({
            "detection": {
                "id": 7,
                "source": "reddit",
                "source_id": "t3_7",
                "profile_id": 5,
                "settings_version": 1,
                "is_relevant": true,
                "properties": {},
                "created_at": "2025-05-01T12:00:00Z"
            },
            "source_post": {
                "source_id": "t3_7",
                "post": {"title": "Hiring: Rust engineer"}
            }
        }))
        .expect("row decodes");
        assert_eq!(post_title(&row), "Hiring: Rust engineer");
    }

    #[test]
    fn post_title_falls_back_to_the_source_id() {
        let row: ListedDetection = serde_json::from_value(json!({
            "detection": {
                "id": 8,
                "source": "reddit",
                "source_id": "t3_8",
                "profile_id": 5,
                "settings_version": 1,
                "is_relevant": false,
                "properties": {},
                "created_at": "2025-05-01T12:00:00Z"
            }
        }))
        .expect("row decodes");
        assert_eq!(post_title(&row), "t3_8");
    }

    #[test]
    fn profile_ids_join_with_commas() {
        assert_eq!(join_ids(&[]), "");
        assert_eq!(join_ids(&[4]), "4");
        assert_eq!(join_ids(&[1, 2, 9]), "1, 2, 9");
    }
}
