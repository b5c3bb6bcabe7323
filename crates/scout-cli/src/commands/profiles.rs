//! Profile management commands.

use scout_api_models::{JumpstartRequest, Profile, ProfileUpdate};

use crate::cli::{JumpstartArgs, OutputFormat, ProfileFileArgs, ProfileIdArgs, ProfileUpdateArgs};
use crate::client::{AppContext, CliError, CliResult, classify_query, read_json_file};
use crate::output::{render_profile_detail, render_profile_list};

pub(crate) async fn handle_profile_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let feed = ctx.engine.profiles_feed().map_err(CliError::failure)?;
    let snapshot = feed.first_page().await.map_err(classify_query)?;
    let profiles: Vec<Profile> = snapshot.items().cloned().collect();
    render_profile_list(&profiles, format)
}

pub(crate) async fn handle_profile_show(
    ctx: &AppContext,
    args: ProfileIdArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let profile = ctx.engine.profile(args.id).await.map_err(classify_query)?;
    render_profile_detail(&profile, format)
}

pub(crate) async fn handle_profile_create(
    ctx: &AppContext,
    args: ProfileFileArgs,
) -> CliResult<()> {
    let profile: Profile = read_json_file(&args.file, "profile")?;
    let created = ctx
        .engine
        .create_profile(&profile)
        .await
        .map_err(classify_query)?;
    println!("Profile created (id: {})", created.id);
    Ok(())
}

pub(crate) async fn handle_profile_update(
    ctx: &AppContext,
    args: ProfileUpdateArgs,
) -> CliResult<()> {
    let update: ProfileUpdate = read_json_file(&args.file, "profile update")?;
    ctx.engine
        .update_profile(args.id, &update)
        .await
        .map_err(classify_query)?;
    println!("Profile {} updated", args.id);
    Ok(())
}

pub(crate) async fn handle_profile_delete(ctx: &AppContext, args: ProfileIdArgs) -> CliResult<()> {
    ctx.engine
        .delete_profile(args.id)
        .await
        .map_err(classify_query)?;
    println!("Profile {} deleted", args.id);
    Ok(())
}

pub(crate) async fn handle_profile_jumpstart(
    ctx: &AppContext,
    args: JumpstartArgs,
) -> CliResult<()> {
    let request = JumpstartRequest {
        exclude_already_analyzed: args.include_analyzed.then_some(false),
        jumpstart_period: args.period_days,
        limit: args.limit,
    };
    ctx.engine
        .jumpstart_profile(args.id, &request)
        .await
        .map_err(classify_query)?;
    println!("Jumpstart scheduled for profile {}", args.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{context, temp_json};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn profile_list_renders_the_listing() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/profiles");
            then.status(200).json_body(json!([
                {"id": 1, "name": "rust jobs", "active": true},
                {"id": 2, "name": "homelab deals", "active": false}
            ]));
        });

        let ctx = context(&server);
        handle_profile_list(&ctx, OutputFormat::Json)
            .await
            .expect("list should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn profile_create_posts_the_file_payload() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/profiles").json_body(json!({
                "id": 0,
                "name": "rust hiring",
                "active": true
            }));
            then.status(200).json_body(json!({"id": 12}));
        });

        let file = temp_json(
            "profile.json",
            r#"{"name": "rust hiring", "active": true}"#,
        );
        let ctx = context(&server);
        handle_profile_create(&ctx, ProfileFileArgs { file: file.clone() })
            .await
            .expect("create should succeed");
        mock.assert();
        let _ = std::fs::remove_file(file);
    }

    #[tokio::test]
    async fn profile_jumpstart_sends_only_chosen_knobs() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/profiles/4/jumpstart")
                .json_body(json!({"jumpstart_period": 30, "limit": 200}));
            then.status(204);
        });

        let ctx = context(&server);
        handle_profile_jumpstart(
            &ctx,
            JumpstartArgs {
                id: 4,
                period_days: Some(30),
                limit: Some(200),
                include_analyzed: false,
            },
        )
        .await
        .expect("jumpstart should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn server_rejections_exit_as_validation_problems() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/api/profiles/9");
            then.status(422)
                .json_body(json!({"error": "profile has linked subreddits"}));
        });

        let ctx = context(&server);
        let err = handle_profile_delete(&ctx, ProfileIdArgs { id: 9 })
            .await
            .expect_err("delete should fail");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("profile has linked subreddits"));
    }

    #[tokio::test]
    async fn unreachable_servers_exit_as_failures() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/profiles");
            then.status(500).json_body(json!({"error": "database is down"}));
        });

        let ctx = context(&server);
        let err = handle_profile_list(&ctx, OutputFormat::Table)
            .await
            .expect_err("list should fail");
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn malformed_payload_files_are_reported_with_the_path() {
        let server = MockServer::start_async().await;
        let file = temp_json("broken.json", "{ not json");
        let ctx = context(&server);

        let err = handle_profile_update(
            &ctx,
            ProfileUpdateArgs {
                id: 3,
                file: file.clone(),
            },
        )
        .await
        .expect_err("broken file should fail");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("not valid JSON"));
        let _ = std::fs::remove_file(file);
    }
}
