//! Commit and push regenerated documentation back to the PR branch.
//!
//! Sequence: checkout, configure identity, stage the docs dir, commit, push.
//! A commit that finds nothing staged ends the sequence successfully without
//! pushing. Push failures are reported as a `CommitResult` so the caller
//! decides how the run ends.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, instrument};

use crate::config::GitSettings;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git checkout failed: {0}")]
    Checkout(String),

    #[error("git config failed: {0}")]
    Configure(String),

    #[error("git add failed: {0}")]
    Stage(String),

    #[error("git commit failed: {0}")]
    Commit(String),
}

/// Captured result of one git invocation.
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }

    fn reports_nothing_to_commit(&self) -> bool {
        [&self.stdout, &self.stderr].iter().any(|s| {
            s.contains("nothing to commit")
                || s.contains("nothing added to commit")
                || s.contains("no changes added to commit")
        })
    }
}

/// Runs git subcommands against one working tree.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<GitOutput, GitError>;
}

/// The `git` executable, run inside `repo_root`.
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .await?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Outcome of the commit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// A commit was created and pushed
    Created,
    /// Nothing was staged; push skipped
    NoOpNothingToCommit,
    /// A commit was created locally but the push was rejected
    PushFailed(String),
}

impl fmt::Display for CommitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitResult::Created => write!(f, "documentation committed and pushed"),
            CommitResult::NoOpNothingToCommit => write!(f, "documentation unchanged, nothing to commit"),
            CommitResult::PushFailed(detail) => write!(f, "push failed: {detail}"),
        }
    }
}

/// Stage `docs_dir` on `branch`, commit it, and push when a commit was made.
#[instrument(skip(git, settings), fields(branch = %branch, docs_dir = %docs_dir))]
pub async fn publish(
    git: &dyn GitRunner,
    settings: &GitSettings,
    branch: &str,
    docs_dir: &str,
) -> Result<CommitResult, GitError> {
    // Triggers may leave the checkout on a detached HEAD.
    let out = git.run(&["checkout", branch]).await?;
    if !out.success {
        error!(detail = %out.detail(), "checkout failed");
        return Err(GitError::Checkout(out.detail()));
    }

    for (key, value) in [
        ("user.name", settings.bot_name.as_str()),
        ("user.email", settings.bot_email.as_str()),
    ] {
        let out = git.run(&["config", key, value]).await?;
        if !out.success {
            return Err(GitError::Configure(out.detail()));
        }
    }

    let out = git.run(&["add", "--", docs_dir]).await?;
    if !out.success {
        return Err(GitError::Stage(out.detail()));
    }

    let out = git.run(&["commit", "-m", &settings.commit_message]).await?;
    if !out.success {
        if out.reports_nothing_to_commit() {
            info!("no documentation changes to commit");
            return Ok(CommitResult::NoOpNothingToCommit);
        }
        return Err(GitError::Commit(out.detail()));
    }
    debug!("documentation commit created");

    let out = git.run(&["push", &settings.remote, branch]).await?;
    if !out.success {
        error!(detail = %out.detail(), "push failed");
        return Ok(CommitResult::PushFailed(out.detail()));
    }
    info!(remote = %settings.remote, "documentation pushed");
    Ok(CommitResult::Created)
}
