//! Prompt benchmarking over a profile's recorded feed.

use std::collections::BTreeSet;

use anyhow::anyhow;
use scout_api_models::{DetectionFilter, ListedDetection, ProfileSettingsUpdate};
use scout_playground::PlaygroundSession;

use crate::cli::{OutputFormat, PlaygroundArgs, RerunArg};
use crate::client::{AppContext, CliError, CliResult, drain_feed, read_json_file};
use crate::output::render_playground;

pub(crate) async fn handle_playground(
    ctx: &AppContext,
    args: PlaygroundArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let settings: ProfileSettingsUpdate = read_json_file(&args.file, "draft settings")?;
    let session = PlaygroundSession::new(settings);

    let feed = ctx
        .engine
        .detections_feed(DetectionFilter::labeled_for_profile(args.profile))
        .map_err(CliError::failure)?;
    let snapshot = drain_feed(&feed, None).await?;
    let rows: Vec<ListedDetection> = snapshot.items().cloned().collect();
    if session.absorb_feed(&rows) == 0 {
        return Err(CliError::validation(format!(
            "profile {} has no feedback-labeled detections to benchmark",
            args.profile
        )));
    }

    let targets = if args.posts.is_empty() {
        session.all_ids()
    } else {
        selected_ids(&session, &args.posts)?
    };

    let report = session.analyze_many(&ctx.engine, &targets).await;
    let rerun_report = match args.rerun {
        Some(RerunArg::Incorrect) => {
            Some(session.analyze_many(&ctx.engine, &session.incorrect_ids()).await)
        }
        Some(RerunArg::All) => Some(session.analyze_many(&ctx.engine, &targets).await),
        None => None,
    };

    render_playground(&session, &report, rerun_report.as_ref(), format)?;

    if report.succeeded == 0 && !report.is_clean() {
        return Err(CliError::failure(anyhow!("every analysis failed")));
    }
    Ok(())
}

fn selected_ids(session: &PlaygroundSession, requested: &[String]) -> CliResult<Vec<String>> {
    let known: BTreeSet<String> = session.all_ids().into_iter().collect();
    let mut ids = Vec::with_capacity(requested.len());
    for id in requested {
        if !known.contains(id) {
            return Err(CliError::validation(format!(
                "post '{id}' is not in the profile's feed"
            )));
        }
        ids.push(id.clone());
    }
    Ok(ids)
}
