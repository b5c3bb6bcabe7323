//! Subreddit membership commands, including the combined profile sync.

use std::collections::BTreeSet;

use anyhow::anyhow;
use scout_api_models::{ProfileUpdate, SubredditSettings};
use scout_query::SubredditScope;

use crate::cli::{OutputFormat, SubredditListArgs, SubredditProfilesArgs, SubredditSyncArgs};
use crate::client::{AppContext, CliError, CliResult, classify_query, read_json_file};
use crate::output::{render_subreddit_list, render_sync_report};

pub(crate) async fn handle_subreddit_list(
    ctx: &AppContext,
    args: SubredditListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let scope = args
        .profile
        .map_or(SubredditScope::All, SubredditScope::WithProfile);
    let feed = ctx.engine.subreddits_feed(scope).map_err(CliError::failure)?;
    let snapshot = feed.first_page().await.map_err(classify_query)?;
    let rows: Vec<SubredditSettings> = snapshot.items().cloned().collect();
    render_subreddit_list(&rows, format)
}

pub(crate) async fn handle_subreddit_link(
    ctx: &AppContext,
    args: SubredditProfilesArgs,
) -> CliResult<()> {
    ctx.engine
        .add_profiles_to_subreddit(&args.subreddit, &args.profiles)
        .await
        .map_err(classify_query)?;
    println!(
        "Linked {} profile(s) to r/{}",
        args.profiles.len(),
        args.subreddit
    );
    Ok(())
}

pub(crate) async fn handle_subreddit_unlink(
    ctx: &AppContext,
    args: SubredditProfilesArgs,
) -> CliResult<()> {
    ctx.engine
        .remove_profiles_from_subreddit(&args.subreddit, &args.profiles)
        .await
        .map_err(classify_query)?;
    println!(
        "Unlinked {} profile(s) from r/{}",
        args.profiles.len(),
        args.subreddit
    );
    Ok(())
}

pub(crate) async fn handle_subreddit_sync(
    ctx: &AppContext,
    args: SubredditSyncArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let update: ProfileUpdate = read_json_file(&args.file, "profile update")?;
    let desired: BTreeSet<String> = args.subreddits.iter().cloned().collect();
    let report = ctx
        .engine
        .combined_update_profile(args.profile, &update, &desired)
        .await
        .map_err(classify_query)?;
    render_sync_report(&report, format)?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "{} membership change(s) failed",
            report.failed.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{context, temp_json};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_scopes_to_a_profile_when_asked() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/sources/reddit/subreddits_with_profile")
                .query_param("profile_id", "3");
            then.status(200)
                .json_body(json!([{"subreddit": "rust", "profiles": [3]}]));
        });

        let ctx = context(&server);
        handle_subreddit_list(
            &ctx,
            SubredditListArgs { profile: Some(3) },
            OutputFormat::Json,
        )
        .await
        .expect("list should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn link_sends_the_profile_ids() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/sources/reddit/subreddits/python/add_profiles")
                .json_body(json!({"profile_ids": [1, 2]}));
            then.status(204);
        });

        let ctx = context(&server);
        handle_subreddit_link(
            &ctx,
            SubredditProfilesArgs {
                subreddit: "python".to_string(),
                profiles: vec![1, 2],
            },
        )
        .await
        .expect("link should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn sync_renders_the_report_and_fails_on_partial_errors() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT)
                .path("/api/profiles/5")
                .json_body(json!({"name": "sharper"}));
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/sources/reddit/subreddits_with_profile")
                .query_param("profile_id", "5");
            then.status(200)
                .json_body(json!([{"subreddit": "golang", "profiles": [5]}]));
        });
        let add_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/sources/reddit/subreddits/python/add_profiles");
            then.status(204);
        });
        let remove_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/sources/reddit/subreddits/golang/remove_profiles");
            then.status(500).json_body(json!({"error": "subreddit is locked"}));
        });

        let file = temp_json("update.json", r#"{"name": "sharper"}"#);
        let ctx = context(&server);
        let err = handle_subreddit_sync(
            &ctx,
            SubredditSyncArgs {
                profile: 5,
                file: file.clone(),
                subreddits: vec!["python".to_string()],
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("partial failure should exit nonzero");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("membership change"));
        add_mock.assert();
        remove_mock.assert();
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn sync_with_no_changes_reports_cleanly() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT).path("/api/profiles/5");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/sources/reddit/subreddits_with_profile")
                .query_param("profile_id", "5");
            then.status(200)
                .json_body(json!([{"subreddit": "python", "profiles": [5]}]));
        });

        let file = temp_json("noop.json", r#"{"active": true}"#);
        let ctx = context(&server);
        handle_subreddit_sync(
            &ctx,
            SubredditSyncArgs {
                profile: 5,
                file: file.clone(),
                subreddits: vec!["python".to_string()],
            },
            OutputFormat::Json,
        )
        .await
        .expect("no-op sync should succeed");
        let _ = std::fs::remove_file(file);
    }
}
