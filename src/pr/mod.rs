pub mod diff;
pub mod types;

pub use types::{DiffFetch, DiffPayload, PullRequestContext};

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GitHubSettings;
use crate::generation::AiReport;

/// Fixed header that opens every PR comment posted by the agent.
pub const COMMENT_HEADER: &str = "## 🤖 AI Documentation Agent Report";

const USER_AGENT: &str = "pr-doc-agent";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch PR diff (status {status}): {body}")]
    UpstreamFetch { status: u16, body: String },

    #[error("Failed to post PR comment (status {status}): {body}")]
    CommentPublish { status: u16, body: String },
}

/// The two hosting API calls the pipeline depends on.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Raw unified diff of the pull request.
    async fn fetch_diff(&self, ctx: &PullRequestContext) -> Result<String, PrError>;

    /// Post a markdown comment on the pull request conversation.
    async fn post_comment(&self, ctx: &PullRequestContext, body: &str) -> Result<(), PrError>;
}

/// GitHub REST client.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> Result<Self, PrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn fetch_diff(&self, ctx: &PullRequestContext) -> Result<String, PrError> {
        let url = format!(
            "{}/repos/{}/pulls/{}",
            self.api_base, ctx.repository, ctx.pr_number
        );
        debug!(%url, "fetching PR diff from GitHub API");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&ctx.hosting_token)
            .header("Accept", "application/vnd.github.v3.diff")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "GitHub diff endpoint returned non-success status");
            return Err(PrError::UpstreamFetch {
                status: status.as_u16(),
                body,
            });
        }
        debug!(diff_bytes = body.len(), "received PR diff");
        Ok(body)
    }

    async fn post_comment(&self, ctx: &PullRequestContext, body: &str) -> Result<(), PrError> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, ctx.repository, ctx.pr_number
        );
        debug!(%url, body_chars = body.chars().count(), "posting PR comment");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&ctx.hosting_token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "GitHub comment endpoint returned non-201 status");
            return Err(PrError::CommentPublish {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(())
    }
}

/// Fetch the PR diff and bound it to `max_chars` characters.
#[instrument(skip(api, ctx), fields(repo = %ctx.repository, pr = ctx.pr_number))]
pub async fn fetch_diff(
    api: &dyn HostingApi,
    ctx: &PullRequestContext,
    max_chars: usize,
) -> Result<DiffFetch, PrError> {
    let raw = api.fetch_diff(ctx).await?;
    let fetched = diff::bound_diff(&raw, max_chars);
    match &fetched {
        DiffFetch::NoChanges => info!("diff is empty, nothing to document"),
        DiffFetch::Changes(payload) if payload.truncated => warn!(
            original_chars = raw.chars().count(),
            kept_chars = max_chars,
            "diff truncated to character budget"
        ),
        DiffFetch::Changes(payload) => {
            debug!(diff_chars = payload.raw_text.chars().count(), "diff within budget")
        }
    }
    Ok(fetched)
}

/// Render the comment body for a PR analysis report.
pub fn comment_body(report: &AiReport) -> String {
    format!("{}\n\n{}", COMMENT_HEADER, report.result_text)
}

/// Post the PR analysis as a comment. A non-201 answer fails the run.
#[instrument(skip(api, ctx, report), fields(repo = %ctx.repository, pr = ctx.pr_number))]
pub async fn publish_comment(
    api: &dyn HostingApi,
    ctx: &PullRequestContext,
    report: &AiReport,
) -> Result<(), PrError> {
    api.post_comment(ctx, &comment_body(report)).await?;
    info!("posted AI report comment");
    Ok(())
}
