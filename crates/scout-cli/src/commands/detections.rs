//! Feed, feedback, and detached analysis commands.

use scout_api_models::{AnalyzeRequest, DetectionFilter, DetectionTagsFilter, Reaction};

use crate::cli::{AnalyzeArgs, FeedArgs, OutputFormat, ReactArgs};
use crate::client::{AppContext, CliError, CliResult, classify_query, drain_feed};
use crate::output::{render_detection, render_feed};

pub(crate) async fn handle_feed(
    ctx: &AppContext,
    args: FeedArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let budget = if args.all { None } else { Some(args.pages) };
    let feed = ctx
        .engine
        .detections_feed(build_filter(&args))
        .map_err(CliError::failure)?;
    let snapshot = drain_feed(&feed, budget).await?;
    render_feed(&snapshot, format)
}

pub(crate) async fn handle_react(ctx: &AppContext, args: ReactArgs) -> CliResult<()> {
    let reaction = args.reaction.reaction();
    let stored = ctx
        .engine
        .update_detection_tags(args.detection_id, reaction)
        .await
        .map_err(classify_query)?;
    match stored.reaction() {
        Reaction::Unset => println!("Feedback cleared for detection {}", args.detection_id),
        Reaction::Relevant => println!("Detection {} confirmed correct", args.detection_id),
        Reaction::Irrelevant => println!("Detection {} flagged wrong", args.detection_id),
    }
    Ok(())
}

pub(crate) async fn handle_analyze(
    ctx: &AppContext,
    args: AnalyzeArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = build_analyze_request(args);
    let detection = ctx
        .engine
        .analyze_post(&request)
        .await
        .map_err(classify_query)?;
    render_detection(&detection, format)
}

fn build_filter(args: &FeedArgs) -> DetectionFilter {
    let mut filter = args
        .profile
        .map_or_else(DetectionFilter::default, DetectionFilter::for_profile);
    filter.is_relevant = args.relevant;
    if !args.feedback.is_empty() {
        filter.tags = Some(DetectionTagsFilter {
            relevancy_detected_correctly: Some(
                args.feedback.iter().map(|arg| arg.reaction()).collect(),
            ),
        });
    }
    filter
}

fn build_analyze_request(args: AnalyzeArgs) -> AnalyzeRequest {
    AnalyzeRequest {
        source: args.source,
        source_id: args.source_id,
        relevancy_filter: args.relevancy_filter,
        extracted_properties: args
            .props
            .into_iter()
            .map(|prop| (prop.name, prop.prompt))
            .collect(),
    }
}
