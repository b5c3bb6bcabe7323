//! Shared engine context, error types, and helpers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use url::Url;

use scout_client::{ClientConfig, ClientError, ScoutClient};
use scout_query::{
    CacheConfig, FeedQuery, FeedSnapshot, FetchOutcome, PageSource, QueryEngine, QueryError,
};

use crate::cli::Cli;

pub(crate) const DEFAULT_API_URL: &str = "http://127.0.0.1:5601";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) engine: QueryEngine,
}

/// Construct the query engine from the global CLI options.
pub(crate) fn build_context(cli: &Cli) -> CliResult<AppContext> {
    let mut config = ClientConfig::new(cli.api_url.clone())
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(token) = parse_token(cli.token.as_deref())? {
        config = config.with_token(token);
    }
    let client = ScoutClient::new(config).map_err(CliError::failure)?;
    Ok(AppContext {
        engine: QueryEngine::new(client, CacheConfig::default()),
    })
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_token(input: Option<&str>) -> CliResult<Option<String>> {
    let Some(raw) = input else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation("API token must not be an empty string"));
    }

    Ok(Some(trimmed.to_string()))
}

/// Classify an engine failure into a CLI error. Statuses the user can fix by
/// changing their input count as validation.
pub(crate) fn classify_query(error: QueryError) -> CliError {
    let status = error
        .as_client()
        .and_then(ClientError::status)
        .map(|status| status.as_u16());
    match status {
        Some(400 | 409 | 422) => CliError::validation(error.to_string()),
        _ => CliError::failure(error),
    }
}

/// Read and decode a JSON payload file named on the command line.
pub(crate) fn read_json_file<T>(path: &Path, what: &str) -> CliResult<T>
where
    T: DeserializeOwned,
{
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .map_err(CliError::failure)?;
    serde_json::from_str(&payload)
        .map_err(|err| CliError::failure(anyhow!("{what} file is not valid JSON: {err}")))
}

/// Fetch up to `pages` pages of a feed (every page when `None`) and return
/// the final snapshot.
pub(crate) async fn drain_feed<S: PageSource>(
    feed: &FeedQuery<S>,
    pages: Option<usize>,
) -> CliResult<FeedSnapshot<S::Item>> {
    let mut snapshot = feed.first_page().await.map_err(classify_query)?;
    while snapshot.has_next && pages.is_none_or(|budget| snapshot.pages.len() < budget) {
        match feed.fetch_next_page().await.map_err(classify_query)? {
            FetchOutcome::Fetched { .. } => snapshot = feed.snapshot(),
            FetchOutcome::AlreadyInFlight | FetchOutcome::Exhausted | FetchOutcome::Discarded => {
                break;
            }
        }
    }
    Ok(snapshot)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_rejects_invalid_input() {
        let err = parse_url("not-a-url").expect_err("invalid URL should fail");
        assert!(err.contains("invalid URL"));
    }

    #[test]
    fn parse_token_rejects_blank_values() {
        let err = parse_token(Some("   ")).expect_err("blank token should fail");
        assert!(matches!(err, CliError::Validation(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn parse_token_trims_surrounding_whitespace() {
        let token = parse_token(Some("  secret  ")).expect("token should parse");
        assert_eq!(token.as_deref(), Some("secret"));
        assert_eq!(parse_token(None).expect("absent token is fine"), None);
    }

    #[test]
    fn exit_codes_distinguish_validation_from_failure() {
        assert_eq!(CliError::validation("bad flag").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::validation("bad flag").display_message(), "bad flag");
    }
}
