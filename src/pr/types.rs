use std::fmt;

/// Identifiers and credentials for a single pipeline run.
/// Built once by `PullRequestContext::load` and never mutated afterwards.
#[derive(Clone)]
pub struct PullRequestContext {
    /// Repository in owner/repo form (e.g., "org/repo")
    pub repository: String,
    /// PR number (e.g., 42)
    pub pr_number: u64,
    /// Head branch of the PR, where regenerated docs are pushed
    pub branch: String,
    /// GitHub API token
    pub hosting_token: String,
    /// Generation service API key
    pub ai_credential: String,
}

// Credentials stay out of logs.
impl fmt::Debug for PullRequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullRequestContext")
            .field("repository", &self.repository)
            .field("pr_number", &self.pr_number)
            .field("branch", &self.branch)
            .field("hosting_token", &"<redacted>")
            .field("ai_credential", &"<redacted>")
            .finish()
    }
}

/// PR diff text bounded to the configured character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPayload {
    /// Diff text, at most `max_diff_chars` characters
    pub raw_text: String,
    /// Whether the fetched diff reached the budget and was cut
    pub truncated: bool,
}

/// Result of the diff fetch stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffFetch {
    /// Empty or whitespace-only diff; the run ends successfully
    NoChanges,
    Changes(DiffPayload),
}
