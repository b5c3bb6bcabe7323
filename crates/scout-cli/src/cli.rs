//! Argument parsing and command dispatch for the Scout CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use scout_api_models::Reaction;
use scout_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};

use crate::client::{CliResult, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, build_context, parse_url};
use crate::commands::{detections, playground, profiles, subreddits};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);

    let command_name = command_label(&cli.command);
    tracing::debug!(command = command_name, "dispatching command");

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn install_logging(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::Pretty,
        ..LoggingConfig::default()
    };
    if init_logging(&config).is_err() {
        eprintln!("warning: could not install the log subscriber");
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let format = cli.format;
    let ctx = build_context(&cli)?;

    match cli.command {
        Command::Profile(profile) => match profile {
            ProfileCommand::List => profiles::handle_profile_list(&ctx, format).await,
            ProfileCommand::Show(args) => profiles::handle_profile_show(&ctx, args, format).await,
            ProfileCommand::Create(args) => profiles::handle_profile_create(&ctx, args).await,
            ProfileCommand::Update(args) => profiles::handle_profile_update(&ctx, args).await,
            ProfileCommand::Delete(args) => profiles::handle_profile_delete(&ctx, args).await,
            ProfileCommand::Jumpstart(args) => {
                profiles::handle_profile_jumpstart(&ctx, args).await
            }
        },
        Command::Subreddits(subreddit) => match subreddit {
            SubredditsCommand::List(args) => {
                subreddits::handle_subreddit_list(&ctx, args, format).await
            }
            SubredditsCommand::Link(args) => subreddits::handle_subreddit_link(&ctx, args).await,
            SubredditsCommand::Unlink(args) => {
                subreddits::handle_subreddit_unlink(&ctx, args).await
            }
            SubredditsCommand::Sync(args) => {
                subreddits::handle_subreddit_sync(&ctx, args, format).await
            }
        },
        Command::Feed(args) => detections::handle_feed(&ctx, args, format).await,
        Command::React(args) => detections::handle_react(&ctx, args).await,
        Command::Analyze(args) => detections::handle_analyze(&ctx, args, format).await,
        Command::Playground(args) => playground::handle_playground(&ctx, args, format).await,
    }
}

#[derive(Parser)]
#[command(name = "scout", about = "Command-line client for a Scout curation server")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "SCOUT_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(long, global = true, env = "SCOUT_API_TOKEN")]
    pub(crate) token: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SCOUT_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout_secs: u64,
    #[arg(
        long = "format",
        alias = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) format: OutputFormat,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level for diagnostic output"
    )]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Subreddits(SubredditsCommand),
    Feed(FeedArgs),
    React(ReactArgs),
    Analyze(AnalyzeArgs),
    Playground(PlaygroundArgs),
}

#[derive(Subcommand)]
pub(crate) enum ProfileCommand {
    List,
    Show(ProfileIdArgs),
    Create(ProfileFileArgs),
    Update(ProfileUpdateArgs),
    Delete(ProfileIdArgs),
    Jumpstart(JumpstartArgs),
}

#[derive(Args)]
pub(crate) struct ProfileIdArgs {
    #[arg(help = "Profile identifier")]
    pub(crate) id: i64,
}

#[derive(Args)]
pub(crate) struct ProfileFileArgs {
    #[arg(short = 'f', long = "file", help = "Path to a JSON profile definition")]
    pub(crate) file: PathBuf,
}

#[derive(Args)]
pub(crate) struct ProfileUpdateArgs {
    #[arg(help = "Profile identifier")]
    pub(crate) id: i64,
    #[arg(short = 'f', long = "file", help = "Path to a JSON profile update")]
    pub(crate) file: PathBuf,
}

#[derive(Args)]
pub(crate) struct JumpstartArgs {
    #[arg(help = "Profile identifier")]
    pub(crate) id: i64,
    #[arg(long, help = "Days of history to backfill")]
    pub(crate) period_days: Option<i64>,
    #[arg(long, help = "Cap on the number of posts scheduled")]
    pub(crate) limit: Option<i64>,
    #[arg(long, help = "Also re-analyze posts the profile has seen")]
    pub(crate) include_analyzed: bool,
}

#[derive(Subcommand)]
pub(crate) enum SubredditsCommand {
    List(SubredditListArgs),
    Link(SubredditProfilesArgs),
    Unlink(SubredditProfilesArgs),
    Sync(SubredditSyncArgs),
}

#[derive(Args)]
pub(crate) struct SubredditListArgs {
    #[arg(long, help = "Only subreddits feeding this profile")]
    pub(crate) profile: Option<i64>,
}

#[derive(Args)]
pub(crate) struct SubredditProfilesArgs {
    #[arg(help = "Subreddit name without the r/ prefix")]
    pub(crate) subreddit: String,
    #[arg(
        long,
        value_delimiter = ',',
        required = true,
        help = "Profile identifiers"
    )]
    pub(crate) profiles: Vec<i64>,
}

#[derive(Args)]
pub(crate) struct SubredditSyncArgs {
    #[arg(help = "Profile identifier")]
    pub(crate) profile: i64,
    #[arg(short = 'f', long = "file", help = "Path to a JSON profile update")]
    pub(crate) file: PathBuf,
    #[arg(
        long = "subreddits",
        value_delimiter = ',',
        help = "Full set of subreddits the profile should watch"
    )]
    pub(crate) subreddits: Vec<String>,
}

#[derive(Args)]
pub(crate) struct FeedArgs {
    #[arg(long, help = "Restrict to one profile")]
    pub(crate) profile: Option<i64>,
    #[arg(long, help = "Restrict to one relevancy verdict (true or false)")]
    pub(crate) relevant: Option<bool>,
    #[arg(
        long,
        value_delimiter = ',',
        value_enum,
        help = "Restrict by recorded feedback"
    )]
    pub(crate) feedback: Vec<FeedbackArg>,
    #[arg(long, default_value_t = 1, help = "Pages to fetch")]
    pub(crate) pages: usize,
    #[arg(long, conflicts_with = "pages", help = "Fetch until the feed is exhausted")]
    pub(crate) all: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum FeedbackArg {
    Correct,
    Incorrect,
    Unset,
}

impl FeedbackArg {
    pub(crate) const fn reaction(self) -> Reaction {
        match self {
            Self::Correct => Reaction::Relevant,
            Self::Incorrect => Reaction::Irrelevant,
            Self::Unset => Reaction::Unset,
        }
    }
}

#[derive(Args)]
pub(crate) struct ReactArgs {
    #[arg(help = "Detection identifier")]
    pub(crate) detection_id: i64,
    #[arg(value_enum, help = "Feedback to record")]
    pub(crate) reaction: ReactionArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReactionArg {
    Up,
    Down,
    Clear,
}

impl ReactionArg {
    pub(crate) const fn reaction(self) -> Reaction {
        match self {
            Self::Up => Reaction::Relevant,
            Self::Down => Reaction::Irrelevant,
            Self::Clear => Reaction::Unset,
        }
    }
}

#[derive(Args)]
pub(crate) struct AnalyzeArgs {
    #[arg(long, default_value = "reddit", help = "Source system of the post")]
    pub(crate) source: String,
    #[arg(long, help = "Source-native post identifier")]
    pub(crate) source_id: String,
    #[arg(long, help = "Relevancy prompt to evaluate")]
    pub(crate) relevancy_filter: String,
    #[arg(
        long = "prop",
        value_parser = parse_prop,
        help = "Extraction prompt as name=prompt"
    )]
    pub(crate) props: Vec<PropArg>,
}

#[derive(Clone, Debug)]
pub(crate) struct PropArg {
    pub(crate) name: String,
    pub(crate) prompt: String,
}

fn parse_prop(input: &str) -> Result<PropArg, String> {
    let (name, prompt) = input
        .split_once('=')
        .ok_or_else(|| format!("invalid property '{input}': expected name=prompt"))?;
    if name.trim().is_empty() {
        return Err(format!("invalid property '{input}': name must not be empty"));
    }
    Ok(PropArg {
        name: name.trim().to_string(),
        prompt: prompt.to_string(),
    })
}

#[derive(Args)]
pub(crate) struct PlaygroundArgs {
    #[arg(long, help = "Profile whose feed seeds the session")]
    pub(crate) profile: i64,
    #[arg(short = 'f', long = "file", help = "Path to JSON draft settings")]
    pub(crate) file: PathBuf,
    #[arg(long, value_enum, help = "Re-run a subset after the first pass")]
    pub(crate) rerun: Option<RerunArg>,
    #[arg(
        long = "posts",
        value_delimiter = ',',
        help = "Only benchmark these source ids"
    )]
    pub(crate) posts: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum RerunArg {
    Incorrect,
    All,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Profile(ProfileCommand::List) => "profile_list",
        Command::Profile(ProfileCommand::Show(_)) => "profile_show",
        Command::Profile(ProfileCommand::Create(_)) => "profile_create",
        Command::Profile(ProfileCommand::Update(_)) => "profile_update",
        Command::Profile(ProfileCommand::Delete(_)) => "profile_delete",
        Command::Profile(ProfileCommand::Jumpstart(_)) => "profile_jumpstart",
        Command::Subreddits(SubredditsCommand::List(_)) => "subreddits_list",
        Command::Subreddits(SubredditsCommand::Link(_)) => "subreddits_link",
        Command::Subreddits(SubredditsCommand::Unlink(_)) => "subreddits_unlink",
        Command::Subreddits(SubredditsCommand::Sync(_)) => "subreddits_sync",
        Command::Feed(_) => "feed",
        Command::React(_) => "react",
        Command::Analyze(_) => "analyze",
        Command::Playground(_) => "playground",
    }
}
